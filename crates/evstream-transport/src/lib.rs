//! Transport collaborator interface for event-stream sessions.
//!
//! A session never opens sockets or signs URLs itself. It talks to a
//! [`Transport`], which sends one opaque byte buffer per outbound unit and
//! yields already-delimited inbound units plus open/error/close lifecycle
//! notifications as [`TransportEvent`]s.
//!
//! Two transports live here:
//! - [`MemoryTransport`], an in-process duplex pair
//! - [`IpcStream`] endpoints over Unix domain sockets (delimited into units
//!   by the frame layer)

pub mod error;
pub mod memory;
pub mod traits;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use memory::MemoryTransport;
pub use traits::{IpcStream, Transport, TransportEvent};

#[cfg(unix)]
pub use uds::{connect_unix, UnixSocketListener};
