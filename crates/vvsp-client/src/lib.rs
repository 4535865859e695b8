//! Reconnecting client for the VVSP streaming protocol.
//!
//! A [`StreamClient`] owns one connection to a host output. Its loop performs
//! the handshake, then reads frames and forwards them as [`StreamEvent`]s over
//! a channel. Any thread can push [`Command`](vvsp_chunk::Command)s back to
//! the host through a [`ClientHandle`]; they are written between frames.
//!
//! Clean disconnects are retried. Protocol violations are terminal: the
//! client reports an error event and must be recreated.

pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod handle;
pub mod queue;
pub mod state;

pub use client::{RunOutcome, StreamClient};
pub use config::ClientConfig;
pub use error::{ClientError, Disposition, Result};
pub use event::{AudioFrame, StreamEvent, VideoFrame};
pub use handle::ClientHandle;
pub use queue::CommandQueue;
pub use state::ConnectionState;
