/// Error types for the alert forwarder
pub mod error;

/// Line, alert and outcome types
pub mod events;

/// File tailing
pub mod collectors;

/// Alert delivery to the collector
pub mod forward;

/// The tail-and-forward loop
pub mod pump;

/// Configuration management
pub mod config;

// Re-export commonly used types
pub use error::{ConfigError, DeliveryError, TailError};
pub use events::{Alert, DeliveryOutcome, FailureReason, LogLine};
pub use pump::{AlertPump, PumpSummary};
