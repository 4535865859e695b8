//! Local stream transport for the VVSP streaming protocol.
//!
//! Provides the lowest layer of the client:
//! - Deterministic endpoint naming (one endpoint per output index)
//! - A connected byte stream ([`IpcStream`]) over a Unix domain socket
//! - Connect-with-timeout ([`Connect`], [`EndpointConnector`])
//! - A host-side listener ([`EndpointListener`])
//! - A cooperative cancellation flag ([`CancelToken`])

pub mod cancel;
pub mod connect;
pub mod endpoint;
pub mod error;
pub mod stream;

#[cfg(unix)]
pub mod uds;

pub use cancel::CancelToken;
pub use connect::Connect;
pub use endpoint::{endpoint_letter, endpoint_name, EndpointConfig, DEFAULT_PREFIX};
pub use error::{Result, TransportError};
pub use stream::IpcStream;

#[cfg(unix)]
pub use connect::EndpointConnector;
#[cfg(unix)]
pub use uds::EndpointListener;
