//! Terminal output.

pub mod reporter;

pub use reporter::{ConsoleReporter, format_progress_status, format_size};
