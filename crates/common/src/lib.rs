//! Shared types for the token manager workspace

mod secret;
mod error;

pub use secret::Secret;
pub use error::{Error, Result};
