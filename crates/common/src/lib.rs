//! Shared error plumbing and delivery outcome types used across the pixelpost crates.

pub mod error;
pub mod types;

pub use {
    error::FromMessage,
    types::{FailureReason, SendOutcome},
};
