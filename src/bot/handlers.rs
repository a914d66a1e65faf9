//! Command and callback handlers.

use super::views::{main_menu, render_reply, MENU_PROMPT};
use crate::inventory::InventoryService;
use anyhow::Result;
use std::sync::Arc;
use teloxide::{
    prelude::*,
    types::{InlineKeyboardMarkup, MaybeInaccessibleMessage},
    utils::command::BotCommands,
    ApiError, RequestError,
};
use tracing::{debug, info};

/// Supported commands for the bot
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Show the section menu
    #[command(description = "Show the stock menu.")]
    Start,
}

/// Text and keyboard answering one interaction
#[derive(Debug, Clone)]
pub struct MenuReply {
    /// Message text
    pub text: String,
    /// Menu attached to the message
    pub keyboard: InlineKeyboardMarkup,
}

/// Runs a button press through the service and renders the result.
///
/// Every reply carries the full menu, whatever the outcome.
pub async fn menu_reply(service: &InventoryService, action: &str) -> MenuReply {
    let reply = service.handle(action).await;
    MenuReply {
        text: render_reply(&reply),
        keyboard: main_menu(service.sections()),
    }
}

/// Start handler
///
/// # Errors
///
/// Returns an error if the menu cannot be sent.
pub async fn start(bot: Bot, msg: Message, service: Arc<InventoryService>) -> Result<()> {
    info!(chat_id = %msg.chat.id, "Received /start");
    bot.send_message(msg.chat.id, MENU_PROMPT)
        .reply_markup(main_menu(service.sections()))
        .await?;
    Ok(())
}

/// Handles a menu button press.
///
/// The query is answered first so the client stops its spinner while the
/// spreadsheet loads. The originating message is then edited in place.
///
/// # Errors
///
/// Returns an error if answering the query or delivering the reply fails.
pub async fn handle_menu_callback(
    bot: Bot,
    q: CallbackQuery,
    service: Arc<InventoryService>,
) -> Result<()> {
    bot.answer_callback_query(q.id.clone()).await?;

    let action = q.data.as_deref().unwrap_or_default();
    info!(user_id = %q.from.id, action, "Menu button pressed");

    let reply = menu_reply(&service, action).await;

    match q.message.as_ref().and_then(MaybeInaccessibleMessage::regular_message) {
        Some(msg) => edit_menu_message(&bot, msg, reply).await,
        None => {
            // Message is too old to edit, answer with a fresh one
            bot.send_message(ChatId::from(q.from.id), reply.text)
                .reply_markup(reply.keyboard)
                .await?;
            Ok(())
        }
    }
}

async fn edit_menu_message(bot: &Bot, msg: &Message, reply: MenuReply) -> Result<()> {
    match bot
        .edit_message_text(msg.chat.id, msg.id, reply.text)
        .reply_markup(reply.keyboard)
        .await
    {
        Ok(_) => Ok(()),
        // Same section pressed twice within the freshness window
        Err(RequestError::Api(ApiError::MessageNotModified)) => {
            debug!(chat_id = %msg.chat.id, "Message update skipped: not modified");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
