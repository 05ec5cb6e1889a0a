//! Reporter trait for dependency injection
//!
//! Downloads report progress through this trait so the core stays
//! independent of any terminal UI. Keys are the download keys
//! (`{package}-{arch}`, `{package}-{arch}-add{n}`).

/// Sink for download progress and status messages.
pub trait Reporter: Send + Sync {
    /// Updates the progress of a download.
    fn downloading(&self, key: &str, current: u64, total: Option<u64>);

    /// Marks a download as successfully completed.
    fn done(&self, key: &str, detail: &str, size: Option<u64>);

    /// Marks a download as failed with a specific reason.
    fn failed(&self, key: &str, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn downloading(&self, key: &str, current: u64, total: Option<u64>) {
        (**self).downloading(key, current, total);
    }
    fn done(&self, key: &str, detail: &str, size: Option<u64>) {
        (**self).done(key, detail, size);
    }
    fn failed(&self, key: &str, reason: &str) {
        (**self).failed(key, reason);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn downloading(&self, _: &str, _: u64, _: Option<u64>) {}
    fn done(&self, _: &str, _: &str, _: Option<u64>) {}
    fn failed(&self, _: &str, _: &str) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
}
