//! Protocol messages the router reads.

pub mod bind;
pub mod error;

pub use bind::Bind;
pub use error::Error;
