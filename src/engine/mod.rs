mod collaborators;
mod engine;

pub use collaborators::*;
pub use engine::*;
