use std::sync::Arc;

use poise::serenity_prelude::{self as serenity, ChannelId, GuildId, UserId};
use tracing::error;

use crate::{
    media::{global_media_player::GlobalMediaPlayer, plugin::get_media_player},
    Context,
};

use self::responses::Responses;

pub mod config;
pub mod message_context;
pub mod responses;
pub mod strings;

// Util
pub async fn validate_page(ctx: Context<'_>, page: Option<i64>) -> Option<usize> {
    let page = page.unwrap_or(1);

    if page <= 0 {
        ctx.warn("Page no must be atleast 1").await;
        return None;
    }

    Some(page as usize - 1)
}

/// Turns a 1-based position from a command into a queue index.
pub async fn validate_position(ctx: Context<'_>, position: i64) -> Option<usize> {
    if position < 1 {
        ctx.warn("Position must be atleast 1").await;
        return None;
    }

    Some(position as usize - 1)
}

pub fn ceil(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}

pub async fn require_guild(ctx: Context<'_>) -> Option<GuildId> {
    let guild_id = ctx.guild_id();

    if guild_id.is_none() {
        ctx.error("This command only works in a server!").await;
    }

    guild_id
}

/// The voice channel `user_id` sits in, read from the cache.
pub fn user_voice_channel(
    ctx: &serenity::Context,
    guild_id: GuildId,
    user_id: UserId,
) -> Option<ChannelId> {
    ctx.cache.guild(guild_id).and_then(|guild| {
        guild
            .voice_states
            .get(&user_id)
            .and_then(|voice_state| voice_state.channel_id)
    })
}

/// The voice channel the author is connected to.
pub async fn require_voice_channel(ctx: Context<'_>) -> Option<(GuildId, ChannelId)> {
    let Some(guild_id) = require_guild(ctx).await else {
        return None;
    };

    match user_voice_channel(ctx.discord(), guild_id, ctx.author().id) {
        Some(channel) => Some((guild_id, channel)),
        None => {
            ctx.error("You need to be in a voice channel to use this command!")
                .await;
            None
        }
    }
}

pub async fn require_media_player(ctx: Context<'_>) -> Option<Arc<GlobalMediaPlayer>> {
    let media_player = get_media_player(ctx.discord()).await;

    if media_player.is_none() {
        error!("Media player is not registered in the client data");
        ctx.error("The music player is unavailable right now.").await;
    }

    media_player
}

/// The guild's player, for commands that need the author listening along.
pub async fn require_listener(ctx: Context<'_>) -> Option<(Arc<GlobalMediaPlayer>, GuildId)> {
    let (guild_id, _) = require_voice_channel(ctx).await?;
    let media_player = require_media_player(ctx).await?;

    Some((media_player, guild_id))
}
