// Port Layer - Interfaces for external dependencies

pub mod http_transport;
pub mod queue_store;
pub mod response_store;

// Re-exports
pub use http_transport::{HttpResponse, HttpTransport, OutboundRequest, TransportError};
pub use queue_store::{QueueEntry, QueueStore, Removal};
pub use response_store::ResponseStore;
