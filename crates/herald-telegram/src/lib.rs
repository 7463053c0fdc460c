//! `herald-telegram` — Telegram adapter for the Herald scheduler.
//!
//! Wraps a teloxide `Bot`: inbound, the command handlers and the
//! `/schedule` conversation flow that feed the engine; outbound, the
//! [`send::TelegramTransport`] implementation of `ChatTransport` the
//! engine delivers through.

pub mod adapter;
pub mod admin;
pub mod flow;
pub mod handler;
pub mod send;

pub use adapter::{AppContext, TelegramAdapter};
pub use send::TelegramTransport;
