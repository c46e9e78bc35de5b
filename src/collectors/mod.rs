/// Follows the alerts file and yields appended lines
pub mod file_tailer;

pub use file_tailer::{FileTailer, DEFAULT_POLL_INTERVAL};
