//! Turning a successful upstream answer into the client response.

pub mod headers;
pub mod stream;

pub use headers::translate_headers;
pub use stream::{RelayStream, RELAY_CHUNK_SIZE};
