use std::error::Error;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, ChatId, InputFile, MessageId};
use teloxide::RequestError;
use teloxide::utils::command::BotCommands;
use tracing::{debug, info, warn};

use super::ChatActionKeepalive;
use crate::config::{require_bot_token, Config};
use crate::conversation::{
    Conversation, Converted, FileFetcher, INVALID_INPUT_TEXT, PHOTO_ERROR_TEXT, PROCESSING_TEXT,
    WELCOME_TEXT,
};
use crate::sessions::{SessionStore, UserId};

type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

/// Slash commands registered with Telegram at startup.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    #[command(description = "show the welcome message")]
    Start,
    #[command(description = "show usage instructions")]
    Help,
}

/// Downloads through the Bot API: `getFile` for the path, then the file itself.
#[async_trait]
impl FileFetcher for Bot {
    async fn fetch(&self, file_id: &str) -> Result<Vec<u8>> {
        let file = self
            .get_file(file_id)
            .await
            .context("getFile request failed")?;
        let mut bytes = Vec::with_capacity(file.meta.size as usize);
        self.download_file(&file.path, &mut bytes)
            .await
            .with_context(|| format!("downloading '{}' failed", file.path))?;
        debug!(file_id, len = bytes.len(), "Downloaded file");
        Ok(bytes)
    }
}

/// Runs the bot with long polling until Ctrl-C.
pub async fn run(config: &Config) -> Result<()> {
    let token = require_bot_token(config)?;
    info!(
        "Telegram bot starting (token ends ...{})",
        &token[token.len().saturating_sub(4)..]
    );

    let bot = Bot::new(token);
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!(error = %e, "Failed to register bot commands");
    }

    let conversation = Arc::new(Conversation::new(config, Arc::new(SessionStore::new())));
    let handler = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(dptree::endpoint(handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![conversation])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Telegram bot stopped");
    Ok(())
}

async fn handle_command(bot: Bot, msg: Message, cmd: Command) -> HandlerResult {
    debug!(chat = msg.chat.id.0, ?cmd, "Command received");
    bot.send_message(msg.chat.id, WELCOME_TEXT).await?;
    Ok(())
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    conversation: Arc<Conversation>,
) -> HandlerResult {
    let Some(user) = msg.from.as_ref().map(|u| u.id.0) else {
        debug!(chat = msg.chat.id.0, "Ignoring message without sender");
        return Ok(());
    };

    if let Some(photos) = msg.photo() {
        let reply = match photos.last() {
            Some(largest) => {
                conversation.on_photo(user, &largest.file.id, largest.file.size as u64)
            }
            None => PHOTO_ERROR_TEXT.to_string(),
        };
        bot.send_message(msg.chat.id, reply).await?;
        return Ok(());
    }

    if let Some(doc) = msg.document() {
        let is_image = doc
            .mime_type
            .as_ref()
            .is_some_and(|m| m.type_() == mime::IMAGE);
        if is_image {
            let reply =
                conversation.on_photo(user, &doc.file.id, doc.file.size as u64);
            bot.send_message(msg.chat.id, reply).await?;
            return Ok(());
        }
    }

    match msg.text() {
        Some(text) if conversation.is_awaiting_spec(user) => {
            handle_conversion(&bot, &msg, &conversation, user, text).await
        }
        _ => {
            bot.send_message(msg.chat.id, INVALID_INPUT_TEXT).await?;
            Ok(())
        }
    }
}

async fn handle_conversion(
    bot: &Bot,
    msg: &Message,
    conversation: &Conversation,
    user: UserId,
    text: &str,
) -> HandlerResult {
    let prepared = match conversation.prepare(user, text) {
        Ok(prepared) => prepared,
        Err(e) => {
            bot.send_message(msg.chat.id, conversation.report(user, &e))
                .await?;
            return Ok(());
        }
    };

    let status = bot.send_message(msg.chat.id, PROCESSING_TEXT).await?;

    let keepalive = ChatActionKeepalive::default();
    let action_bot = bot.clone();
    let chat_id = msg.chat.id;
    let ticker = keepalive.start(move || {
        let bot = action_bot.clone();
        async move {
            if let Err(e) = bot.send_chat_action(chat_id, ChatAction::UploadDocument).await {
                debug!(error = %e, "Chat action failed");
            }
        }
    });

    let result = conversation.convert(prepared, bot).await;
    keepalive.stop();
    ticker.abort();

    match result {
        Ok(converted) => {
            if let Err(e) = deliver(bot, msg.chat.id, status.id, converted).await {
                let reply = conversation.delivery_failed(user, e.into());
                bot.send_message(msg.chat.id, reply).await?;
            }
        }
        Err(e) => {
            bot.edit_message_text(msg.chat.id, status.id, conversation.report(user, &e))
                .await?;
        }
    }
    Ok(())
}

/// Replaces the status message with the converted document.
async fn deliver(
    bot: &Bot,
    chat: ChatId,
    status: MessageId,
    converted: Converted,
) -> Result<(), RequestError> {
    if let Err(e) = bot.delete_message(chat, status).await {
        warn!(error = %e, "Failed to delete status message");
    }
    bot.send_document(
        chat,
        InputFile::memory(converted.bytes).file_name(converted.filename),
    )
    .caption(converted.caption)
    .await?;
    Ok(())
}
