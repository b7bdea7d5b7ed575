//! Telegram media delivery.
//!
//! Encoded images are pushed to the Bot API one by one (`sendPhoto` /
//! `sendDocument`) or in media groups of up to ten (`sendMediaGroup`).
//! Rate-limit replies carrying `retry_after` are honored by waiting and
//! re-sending the same request; every other failure is contained to the unit
//! that hit it.

pub mod api;
pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod retry;
pub mod send;

pub use {
    api::ApiResponse,
    batch::{SendUnit, plan_units},
    client::{MediaDelivery, TelegramClient},
    config::{Grouping, MEDIA_GROUP_LIMIT, SendAs, TelegramDeliveryConfig},
    error::{Error, Result},
    send::{SendReport, SendRequest, UnitDelivery, send_images},
};
