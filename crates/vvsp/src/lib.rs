//! Client for the VVSP local streaming protocol.
//!
//! A rendering host publishes each of its outputs as a local endpoint and
//! streams encoded video and audio frames over it. This crate connects to
//! one output, delivers the frames as events and sends input commands back.
//!
//! # Crate Structure
//!
//! - [`transport`]: endpoint naming, local sockets, cancellation
//! - [`chunk`]: FourCC chunk framing, wire layout, command codec
//! - [`client`]: the reconnecting stream client and its event channel
//!
//! ```no_run
//! use vvsp::client::{ClientConfig, StreamClient, StreamEvent};
//! use vvsp::transport::EndpointConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (client, events) =
//!     StreamClient::for_output(&EndpointConfig::from_env(), 0, ClientConfig::default())?;
//! let handle = client.handle();
//! let worker = client.spawn()?;
//!
//! for event in events {
//!     if let StreamEvent::VideoFrame(frame) = event {
//!         println!("frame {} ({} bytes)", frame.index, frame.payload.len());
//!         handle.cancel();
//!     }
//! }
//! worker.join().ok();
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use vvsp_transport::*;
}

/// Re-export chunk and codec types.
pub mod chunk {
    pub use vvsp_chunk::*;
}

/// Re-export client types.
pub mod client {
    pub use vvsp_client::*;
}
