mod key;
mod presence;

pub use key::*;
pub use presence::*;

#[cfg(test)]
mod presence_test;
