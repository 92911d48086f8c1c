//! # Page translation
//!
//! ## Module layout
//!
//! - `pipeline` - text filter, collector and the batch orchestrator
//! - `registry` - which text nodes currently have a mirror
//! - `inject` - building and removing mirror elements
//! - `session` - per-document state and the page, selection and toggle paths
//! - `hover` - the Ctrl-hover state machine
//! - `background` - the single owner of quota state
//! - `storage` - the persisted monthly usage counter
//! - `provider` - the remote translation interface
//! - `progress` - progress reporting
//! - `config` / `error` - settings and error types
//!
//! ## Flow
//!
//! A page run collects eligible text nodes, checks the credential and the
//! monthly quota, translates the texts in ordered batches, records the
//! characters used and injects one mirror per translated node.

pub mod background;
pub mod config;
pub mod error;
pub mod hover;
pub mod inject;
pub mod pipeline;
pub mod progress;
pub mod provider;
pub mod registry;
pub mod session;
pub mod storage;

pub use background::{Background, BackgroundHandle, BackgroundRequest, BackgroundResponse};
pub use config::{ConfigManager, TranslationConfig};
pub use error::{TranslationError, TranslationResult};
pub use hover::{HoverController, HoverEvent, HoverState, KeyEvent, Modifiers};
pub use inject::{inject_translation, revert_translation, InjectOptions};
pub use pipeline::{BatchOrchestrator, BatchOutcome, BatchSettings, TextCollector, TextFilter, TextItem};
pub use progress::{NoProgress, ProgressIndicator, ProgressReporter};
pub use provider::{GoogleTranslator, Translator};
pub use registry::{NodeId, TranslatedRegistry};
pub use session::{PageOutcome, PageReport, PageSession, SessionControl, TextOutcome, ToggleOutcome};
pub use storage::{LimitCheck, QuotaStore};
