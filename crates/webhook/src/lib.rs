//! Callback delivery: each image is posted as base64 PNG inside a JSON body to
//! a caller-supplied URL.

pub mod config;
pub mod error;
pub mod sender;

pub use {
    config::WebhookConfig,
    error::{Error, Result},
    sender::WebhookSender,
};
