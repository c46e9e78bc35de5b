/// Alert forwarding and delivery sinks
pub mod forwarder;
pub mod sinks;

pub use forwarder::Forwarder;
pub use sinks::{AlertSink, HttpSink, MockSink, API_KEY_HEADER};
