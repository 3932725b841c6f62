mod entry;
pub use entry::*;
mod feed;
pub use feed::*;
