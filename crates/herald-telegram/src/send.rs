//! Outbound rendering and the engine-facing transport implementation.
//!
//! Media is re-sent by its stored `file_id` — the bot never downloads or
//! re-uploads bytes. Buttons become one inline-keyboard row each.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile};
use tracing::warn;
use url::Url;

use herald_core::outbound::{Button, MediaKind, Outbound};
use herald_scheduler::transport::{ChatTransport, TransportError};

/// `ChatTransport` backed by the Telegram Bot API.
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn resolve(&self, destination: i64) -> bool {
        self.bot.get_chat(ChatId(destination)).await.is_ok()
    }

    async fn send(&self, outbound: &Outbound) -> Result<(), TransportError> {
        send_outbound(&self.bot, outbound).await
    }
}

/// Render and send one outbound message.
pub async fn send_outbound(bot: &Bot, outbound: &Outbound) -> Result<(), TransportError> {
    let chat = ChatId(outbound.destination);
    let markup = keyboard(&outbound.buttons);

    let result = match &outbound.media {
        Some(media) => {
            let file = InputFile::file_id(media.file_ref.clone());
            match media.kind {
                MediaKind::Photo => {
                    let mut req = bot.send_photo(chat, file).caption(outbound.body.clone());
                    if let Some(kb) = markup {
                        req = req.reply_markup(kb);
                    }
                    req.await.map(|_| ())
                }
                MediaKind::Video => {
                    let mut req = bot.send_video(chat, file).caption(outbound.body.clone());
                    if let Some(kb) = markup {
                        req = req.reply_markup(kb);
                    }
                    req.await.map(|_| ())
                }
            }
        }
        None => {
            let mut req = bot.send_message(chat, outbound.body.clone());
            if let Some(kb) = markup {
                req = req.reply_markup(kb);
            }
            req.await.map(|_| ())
        }
    };

    result.map_err(|e| TransportError::Send(e.to_string()))
}

/// Build an inline keyboard from stored buttons, one button per row.
///
/// Buttons whose URL no longer parses are skipped with a warning rather
/// than failing the whole send.
pub fn keyboard(buttons: &[Button]) -> Option<InlineKeyboardMarkup> {
    if buttons.is_empty() {
        return None;
    }
    let rows: Vec<Vec<InlineKeyboardButton>> = buttons
        .iter()
        .filter_map(|b| match Url::parse(&b.url) {
            Ok(url) => Some(vec![InlineKeyboardButton::url(b.text.clone(), url)]),
            Err(e) => {
                warn!(text = %b.text, url = %b.url, error = %e, "skipping button with invalid URL");
                None
            }
        })
        .collect();
    if rows.is_empty() {
        None
    } else {
        Some(InlineKeyboardMarkup::new(rows))
    }
}
