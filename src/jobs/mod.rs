// Background jobs

pub mod scanner;

pub use scanner::{spawn_scanner, ScannerHandle};
