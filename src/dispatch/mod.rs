mod dispatcher;
mod listener;
mod token;

pub use dispatcher::*;
pub use listener::*;
pub use token::*;

#[cfg(test)]
mod dispatcher_test;
