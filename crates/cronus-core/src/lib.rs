//! Core domain + application logic for the Cronus support bot.
//!
//! This crate is framework-agnostic. Discord, MongoDB and Sentry live behind
//! ports (traits) implemented in adapter crates.

pub mod bot;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod issues;
pub mod logging;
pub mod messaging;
pub mod moderation;
pub mod pagination;
pub mod tags;

#[cfg(test)]
mod testing;

pub use errors::{Error, Result};
