//! Platform-neutral messaging abstractions (Discord is the only adapter today).

pub mod port;
pub mod types;
