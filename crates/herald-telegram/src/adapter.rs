//! Telegram channel adapter.
//!
//! Wraps a teloxide `Bot` + `Dispatcher` and drives the long-polling
//! event loop until the process exits. Long polling — no public URL
//! required.

use std::sync::Arc;

use teloxide::prelude::*;
use tracing::info;

use herald_scheduler::Engine;

use crate::flow::FlowMap;
use crate::handler::handle_message;
use crate::send::TelegramTransport;

/// Shared state injected into every handler invocation.
pub struct AppContext {
    pub engine: Arc<Engine<TelegramTransport>>,
    pub flows: FlowMap,
}

/// Telegram channel adapter.
pub struct TelegramAdapter {
    bot: Bot,
    ctx: Arc<AppContext>,
}

impl TelegramAdapter {
    pub fn new(bot: Bot, engine: Arc<Engine<TelegramTransport>>, flow_ttl_secs: u64) -> Self {
        let ctx = Arc::new(AppContext {
            engine,
            flows: FlowMap::new(flow_ttl_secs),
        });
        Self { bot, ctx }
    }

    /// Connect to Telegram and drive the long-polling loop.
    ///
    /// Returns when the dispatcher is stopped (ctrl-c).
    pub async fn run(self) {
        info!("Telegram: starting long-polling dispatcher");

        let handler = Update::filter_message().endpoint(handle_message);

        Dispatcher::builder(self.bot, handler)
            .dependencies(dptree::deps![self.ctx])
            .default_handler(|_upd| async {})
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }
}
