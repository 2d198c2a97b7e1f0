/// Trait for reporting scan progress.
///
/// The CLI implements it with indicatif progress bars. All methods have default
/// no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self) {}
    fn on_scan_complete(&self, _total_files: usize, _duration_secs: f64) {}
    fn on_read_start(&self, _total_files: usize) {}
    fn on_read_progress(&self, _files_read: usize, _total_files: usize) {}
    fn on_read_complete(&self, _failed_files: usize, _duration_secs: f64) {}
    fn on_group_start(&self) {}
    fn on_group_complete(&self, _groups: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
