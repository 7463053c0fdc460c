//! `herald-core` — configuration and shared types for the Herald scheduler bot.
//!
//! Everything here is consumed by both the scheduling engine
//! (`herald-scheduler`) and the Telegram adapter (`herald-telegram`):
//! the figment-backed [`config::HeraldConfig`], the rendered outbound
//! message shape in [`outbound`], and the top-level error type.

pub mod config;
pub mod error;
pub mod outbound;

pub use config::HeraldConfig;
pub use error::{HeraldError, Result};
