//! Telegram message handler registered in the teloxide Dispatcher.
//!
//! Runs for every incoming `Message`: filters out non-operators, routes
//! slash commands, and otherwise advances the sender's `/schedule` flow
//! if one is live.

use std::sync::Arc;

use chrono::Utc;
use teloxide::prelude::*;
use tracing::error;

use herald_core::outbound::{MediaKind, MediaRef};
use herald_scheduler::types::{MessageDraft, Trigger};
use herald_scheduler::SchedulerError;

use crate::adapter::AppContext;
use crate::admin;
use crate::flow::{self, FlowStep};

const WELCOME_TEXT: &str = "Welcome to the Herald scheduler bot!\n\
    Group admins (including anonymous) can schedule messages here.\n\
    - Schedule messages with a name, text, optional media, and buttons.\n\
    - Set repeating intervals or specific times.\n\
    - A new message with an existing schedule name replaces the old one (sent or unsent).\n\
    - Schedules persist across restarts.\n\
    Commands:\n\
    /schedule - set up a message\n\
    /list - view scheduled messages\n\
    /delete <id> - delete a scheduled message\n\
    /cancel - abort the scheduling process\n\
    /help - detailed instructions";

const HELP_TEXT: &str = "Herald scheduler - help\n\
    Steps to schedule a message:\n\
    1. Use /schedule to start (admins only).\n\
    2. Provide, one reply at a time:\n\
       - Schedule name (e.g. 'Weekly Update'; replaces an existing schedule with the same name).\n\
       - Message text (e.g. 'Team meeting at 2 PM').\n\
       - A photo or video, or 'skip'.\n\
       - Buttons as text|url (e.g. 'Join|https://example.com'), repeatable, or 'skip'.\n\
       - Interval in seconds (e.g. '300') or a one-time UTC timestamp (YYYY-MM-DD HH:MM:SS).\n\
    Commands:\n\
    /schedule - start scheduling\n\
    /list - show scheduled messages for this chat\n\
    /delete <id> - delete a schedule (admins only)\n\
    /cancel - abort an in-progress /schedule";

/// Main dispatcher endpoint.
pub async fn handle_message(bot: Bot, msg: Message, ctx: Arc<AppContext>) -> ResponseResult<()> {
    // Anonymous admins post through the chat itself and arrive flagged
    // as a bot account; every other bot message is dropped.
    let anonymous = msg
        .sender_chat
        .as_ref()
        .is_some_and(|c| c.id == msg.chat.id);
    if !anonymous && msg.from.as_ref().map(|u| u.is_bot).unwrap_or(true) {
        return Ok(());
    }
    let Some(operator) = msg.from.as_ref().map(|u| u.id.0) else {
        return Ok(());
    };

    let text = msg.text().or(msg.caption()).unwrap_or("").trim();

    if let Some((command, args)) = parse_command(text) {
        match command {
            "start" => {
                bot.send_message(msg.chat.id, WELCOME_TEXT).await?;
                return Ok(());
            }
            "help" => {
                bot.send_message(msg.chat.id, HELP_TEXT).await?;
                return Ok(());
            }
            "schedule" => return handle_schedule_start(&bot, &msg, &ctx, operator).await,
            "list" => return handle_list(&bot, &msg, &ctx).await,
            "delete" => return handle_delete(&bot, &msg, &ctx, args).await,
            "cancel" => {
                let reply = if ctx.flows.cancel(operator) {
                    "Scheduling cancelled."
                } else {
                    "No active scheduling process to cancel."
                };
                bot.send_message(msg.chat.id, reply).await?;
                return Ok(());
            }
            // Unknown commands fall through: a live flow may legitimately
            // consume them as ordinary input.
            _ => {}
        }
    }

    advance_flow(&bot, &msg, &ctx, operator).await
}

/// Split `/cmd@bot arg...` into the bare command and its argument tail.
fn parse_command(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix('/')?;
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    let command = head.split('@').next().unwrap_or(head);
    if command.is_empty() {
        return None;
    }
    Some((command, args))
}

async fn handle_schedule_start(
    bot: &Bot,
    msg: &Message,
    ctx: &AppContext,
    operator: u64,
) -> ResponseResult<()> {
    if !admin::is_admin(bot, msg).await {
        bot.send_message(msg.chat.id, "Only group admins can schedule messages!")
            .await?;
        return Ok(());
    }

    ctx.flows.begin(operator, msg.chat.id.0, Utc::now());
    bot.send_message(
        msg.chat.id,
        "Please provide the schedule name (e.g. 'Daily Reminder').",
    )
    .await?;
    Ok(())
}

async fn handle_list(bot: &Bot, msg: &Message, ctx: &AppContext) -> ResponseResult<()> {
    let pending = match ctx.engine.store().list_pending(msg.chat.id.0) {
        Ok(pending) => pending,
        Err(e) => {
            error!(chat_id = msg.chat.id.0, error = %e, "listing schedules failed");
            bot.send_message(msg.chat.id, "An error occurred.").await?;
            return Ok(());
        }
    };

    if pending.is_empty() {
        bot.send_message(msg.chat.id, "No scheduled messages.")
            .await?;
        return Ok(());
    }

    let mut response = String::from("Scheduled messages:\n");
    for m in &pending {
        let timing = match (m.interval_seconds, &m.fire_at) {
            (Some(seconds), _) => format!("Every {seconds} seconds"),
            (None, Some(time)) => format!("Time: {time}"),
            (None, None) => "No trigger".to_string(),
        };
        response.push_str(&format!(
            "ID: {} | Name: {} | {} | Message: {}",
            m.id, m.schedule_name, timing, m.body
        ));
        if let Some(media) = &m.media {
            response.push_str(&format!(" | Media: {}", media.kind));
        }
        if !m.buttons.is_empty() {
            let labels: Vec<&str> = m.buttons.iter().map(|b| b.text.as_str()).collect();
            response.push_str(&format!(" | Buttons: {}", labels.join(", ")));
        }
        response.push('\n');
    }
    bot.send_message(msg.chat.id, response).await?;
    Ok(())
}

async fn handle_delete(bot: &Bot, msg: &Message, ctx: &AppContext, args: &str) -> ResponseResult<()> {
    if !admin::is_admin(bot, msg).await {
        bot.send_message(msg.chat.id, "Only group admins can delete messages!")
            .await?;
        return Ok(());
    }

    let id = args.split_whitespace().next().unwrap_or("");
    if id.is_empty() {
        bot.send_message(msg.chat.id, "Usage: /delete <id>").await?;
        return Ok(());
    }

    match ctx.engine.cancel(id, msg.chat.id.0) {
        Ok(()) => {
            bot.send_message(msg.chat.id, format!("Scheduled message {id} deleted."))
                .await?;
        }
        Err(SchedulerError::NotFound { .. }) => {
            bot.send_message(msg.chat.id, "Message ID not found or already sent!")
                .await?;
        }
        Err(e) => {
            error!(job_id = id, error = %e, "deleting schedule failed");
            bot.send_message(msg.chat.id, "An error occurred.").await?;
        }
    }
    Ok(())
}

/// Advance the operator's live flow by one step, if any.
async fn advance_flow(
    bot: &Bot,
    msg: &Message,
    ctx: &AppContext,
    operator: u64,
) -> ResponseResult<()> {
    let Some(mut state) = ctx.flows.get(operator, msg.chat.id.0, Utc::now()) else {
        return Ok(());
    };
    let text = msg.text().map(str::trim).unwrap_or("");

    let reply: String = match state.step {
        FlowStep::Name => {
            if text.is_empty() {
                "Schedule name cannot be empty!".to_string()
            } else {
                state.schedule_name = text.to_string();
                state.step = FlowStep::Body;
                ctx.flows.put(operator, state);
                "Please provide the message text (e.g. 'Team meeting at 2 PM').".to_string()
            }
        }

        FlowStep::Body => {
            if text.is_empty() {
                "Message text cannot be empty!".to_string()
            } else {
                state.body = text.to_string();
                state.step = FlowStep::Media;
                ctx.flows.put(operator, state);
                "Send a photo or video (optional), or type 'skip' to proceed.".to_string()
            }
        }

        FlowStep::Media => {
            if text.eq_ignore_ascii_case("skip") {
                state.step = FlowStep::Buttons;
                ctx.flows.put(operator, state);
                "Provide an inline button (text|url, e.g. 'Join|https://example.com'), \
                 or type 'skip' to proceed."
                    .to_string()
            } else if let Some(media) = extract_media(msg) {
                let received = match media.kind {
                    MediaKind::Photo => "Photo received!",
                    MediaKind::Video => "Video received!",
                };
                state.media = Some(media);
                state.step = FlowStep::Buttons;
                ctx.flows.put(operator, state);
                format!("{received} Provide an inline button (text|url), or type 'skip' to proceed.")
            } else {
                "Please send a photo/video or type 'skip'.".to_string()
            }
        }

        FlowStep::Buttons => {
            if text.eq_ignore_ascii_case("skip") {
                state.step = FlowStep::Trigger;
                ctx.flows.put(operator, state);
                "Enter the time interval in seconds (e.g. '300' for every 300 seconds) \
                 or a specific UTC time (YYYY-MM-DD HH:MM:SS, e.g. '2026-06-05 14:00:00')."
                    .to_string()
            } else if let Some(button) = flow::parse_button_line(text) {
                state.buttons.push(button);
                ctx.flows.put(operator, state);
                "Button added! Add another button (text|url) or type 'skip' to proceed."
                    .to_string()
            } else {
                "Invalid button format! Use text|url (e.g. 'Join|https://example.com') \
                 or type 'skip'."
                    .to_string()
            }
        }

        FlowStep::Trigger => match Trigger::parse(text, Utc::now()) {
            Err(e) => e.to_string(),
            Ok(trigger) => {
                let draft = MessageDraft {
                    destination: msg.chat.id.0,
                    schedule_name: state.schedule_name.clone(),
                    body: state.body.clone(),
                    media: state.media.clone(),
                    buttons: state.buttons.clone(),
                    trigger: trigger.clone(),
                };
                let name = state.schedule_name.clone();
                match ctx.engine.create(draft) {
                    Ok(outcome) => {
                        ctx.flows.cancel(operator);
                        match trigger {
                            Trigger::Every { seconds } => format!(
                                "Message '{name}' (ID: {}) scheduled to repeat every {seconds} seconds.",
                                outcome.id
                            ),
                            Trigger::At { when } => format!(
                                "Message '{name}' (ID: {}) scheduled for {}.",
                                outcome.id,
                                when.format("%Y-%m-%d %H:%M:%S")
                            ),
                        }
                    }
                    Err(e) => {
                        error!(name = %name, error = %e, "creating schedule failed");
                        "An error occurred.".to_string()
                    }
                }
            }
        },
    };

    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

/// Pull a photo or video reference out of the operator's message.
fn extract_media(msg: &Message) -> Option<MediaRef> {
    if let Some(photos) = msg.photo() {
        // Highest resolution is the last element.
        let photo = photos.last()?;
        return Some(MediaRef {
            kind: MediaKind::Photo,
            file_ref: photo.file.id.clone(),
            access_token: Some(photo.file.unique_id.clone()),
        });
    }
    if let Some(video) = msg.video() {
        return Some(MediaRef {
            kind: MediaKind::Video,
            file_ref: video.file.id.clone(),
            access_token: Some(video.file.unique_id.clone()),
        });
    }
    None
}
