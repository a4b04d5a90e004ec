mod utils;
mod amf;
mod protocol;
mod handshake;
mod chunk;
mod message;
mod session;
mod server;

// Re-export commonly used types at crate root
pub use utils::*;
pub use amf::*;
pub use protocol::*;
pub use chunk::*;
pub use message::*;
pub use session::*;
pub use handshake::*;

// Server exports
pub use server::{MediaFrame, RtmpServer, ServerConfig, StreamRegistry};
