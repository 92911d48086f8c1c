//! Progress reporting for page translation

/// Receives progress from a page translation run
pub trait ProgressReporter {
    fn begin(&mut self, total: usize);

    /// Called after each chunk with the number of texts translated so far
    fn update(&mut self, processed: usize, total: usize);

    /// Called on every exit path, success or not
    fn finish(&mut self);
}

/// State of the on-page progress bar
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressIndicator {
    visible: bool,
    processed: usize,
    total: usize,
}

impl ProgressIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Rounded to the nearest whole percent
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.processed as f64 / self.total as f64) * 100.0).round() as u32
    }

    pub fn label(&self) -> String {
        format!(
            "Translation progress: {}% ({}/{})",
            self.percentage(),
            self.processed,
            self.total
        )
    }
}

impl ProgressReporter for ProgressIndicator {
    fn begin(&mut self, total: usize) {
        self.visible = true;
        self.processed = 0;
        self.total = total;
    }

    fn update(&mut self, processed: usize, total: usize) {
        self.processed = processed;
        self.total = total;
        tracing::info!("{}", self.label());
    }

    fn finish(&mut self) {
        self.visible = false;
    }
}

/// Discards all progress
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn begin(&mut self, _total: usize) {}

    fn update(&mut self, _processed: usize, _total: usize) {}

    fn finish(&mut self) {}
}
