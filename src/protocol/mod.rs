pub mod constants;
mod command;
mod control;
mod message;

pub use command::*;
pub use constants::*;
pub use control::*;
pub use message::*;
