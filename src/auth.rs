//! Credential types and storing-label resolution.

pub mod strategy;
pub mod token;

pub use strategy::*;
pub use token::*;
