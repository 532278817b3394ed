mod cache;
mod caps;
mod config;
mod dispatch;
mod engine;
mod errors;

pub use cache::*;
pub use caps::*;
pub use config::*;
pub use dispatch::*;
pub use engine::*;
pub use errors::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
