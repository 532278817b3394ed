mod cache;
mod entry;
mod pending;
mod writeback;

pub use cache::*;
pub use entry::*;
pub use pending::*;
pub(crate) use writeback::*;
