//! Persistent state kept across sessions

pub mod quota;

pub use quota::{current_month, month_key, storage_key, LimitCheck, QuotaStore};
