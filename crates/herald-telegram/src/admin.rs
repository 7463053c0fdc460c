//! Admin gate for the mutating commands.
//!
//! Deny-by-default: any failure to query membership counts as "not an
//! admin". Anonymous admins never appear in `get_chat_member` — Telegram
//! delivers their messages with `sender_chat` set to the chat itself, so
//! that is checked first.

use teloxide::prelude::*;
use tracing::warn;

/// Whether the sender of `msg` may create or delete schedules in its chat.
pub async fn is_admin(bot: &Bot, msg: &Message) -> bool {
    if msg
        .sender_chat
        .as_ref()
        .is_some_and(|c| c.id == msg.chat.id)
    {
        return true;
    }

    let Some(from) = msg.from.as_ref() else {
        return false;
    };

    match bot.get_chat_member(msg.chat.id, from.id).await {
        Ok(member) => member.is_privileged(),
        Err(e) => {
            warn!(
                user_id = from.id.0,
                chat_id = msg.chat.id.0,
                error = %e,
                "admin check failed; denying"
            );
            false
        }
    }
}
