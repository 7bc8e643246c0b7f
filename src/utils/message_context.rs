use std::{fmt::Display, sync::Arc};

use serenity::{
    builder::{CreateEmbed, CreateMessage},
    http::Http,
    model::prelude::{ChannelId, Message},
    Result as SerenityResult,
};
use tracing::warn;

use crate::{media::media_info::MediaInfo, Context};

use super::responses::{embed_error, embed_info};

/// The text channel a player was started from. Track announcements go there.
#[derive(Clone)]
pub struct MessageContext {
    pub channel: ChannelId,
    pub http: Arc<Http>,
}

impl MessageContext {
    pub fn new(ctx: Context<'_>) -> MessageContext {
        MessageContext {
            channel: ctx.channel_id(),
            http: Arc::clone(&ctx.discord().http),
        }
    }

    pub async fn send_message<'a, F>(&self, build: F)
    where
        for<'b> F: FnOnce(&'b mut CreateMessage<'a>) -> &'b mut CreateMessage<'a>,
    {
        self.log_failure(self.channel.send_message(&self.http, build).await);
    }

    pub async fn send_info(&self, message: impl Display) {
        self.send_message(|m| m.embed(|e| embed_info(e, message)))
            .await;
    }

    pub async fn send_error(&self, message: impl Display) {
        self.send_message(|m| m.embed(|e| embed_error(e, message)))
            .await;
    }

    /// Links the embed to the track page and thumbnail, when they are known.
    pub fn format_embed_links<'b>(e: &'b mut CreateEmbed, info: &MediaInfo) -> &'b mut CreateEmbed {
        if info.url.starts_with("http") {
            e.url(&info.url);
        }
        if info.thumbnail.starts_with("http") {
            e.thumbnail(&info.thumbnail);
        }

        e
    }

    fn log_failure(&self, result: SerenityResult<Message>) {
        if let Err(err) = result {
            warn!("Unable to announce in channel {}: {:?}", self.channel, err);
        }
    }
}
