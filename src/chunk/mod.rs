mod header;
mod reader;
mod stream;
mod writer;

pub use header::*;
pub use reader::*;
pub use stream::*;
pub use writer::*;
