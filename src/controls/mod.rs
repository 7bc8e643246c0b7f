pub mod buttons;
pub mod commands;

use std::sync::Arc;

use poise::serenity_prelude::{self as serenity, ChannelId, GuildId, Mentionable};
use songbird::Songbird;
use tracing::{error, info, warn};

use crate::{
    media::global_media_player::GlobalMediaPlayer, utils::message_context::MessageContext,
    Context,
};

pub async fn voice_manager(ctx: &serenity::Context) -> Result<Arc<Songbird>, String> {
    songbird::get(ctx).await.ok_or_else(|| {
        error!("Songbird voice client was not registered at initialisation");
        "The voice client is unavailable right now.".to_string()
    })
}

/// Joins `voice_channel` and starts a player announcing in the command's channel.
pub async fn join_channel(
    ctx: Context<'_>,
    media_player: &GlobalMediaPlayer,
    guild_id: GuildId,
    voice_channel: ChannelId,
) -> Result<(), String> {
    let manager = voice_manager(ctx.discord()).await?;

    let (call, joined) = manager.join(guild_id, voice_channel).await;
    if let Err(err) = joined {
        error!("Unable to join {} in guild {}: {:?}", voice_channel, guild_id, err);

        if let Err(err) = manager.remove(guild_id).await {
            warn!("Unable to clean up voice call: {:?}", err);
        }

        return Err(format!("I can't join {}... try again ? ❌", voice_channel.mention()));
    }

    info!("Joined {} in guild {}", voice_channel, guild_id);

    if media_player.settings().await.self_deaf {
        if let Err(err) = call.lock().await.deafen(true).await {
            warn!("Unable to deafen in guild {}: {:?}", guild_id, err);
        }
    }

    media_player
        .start(guild_id, voice_channel, call, MessageContext::new(ctx))
        .await
}

/// Joins the author's channel unless a player already runs in the guild.
pub async fn ensure_joined(
    ctx: Context<'_>,
    media_player: &GlobalMediaPlayer,
    guild_id: GuildId,
    voice_channel: ChannelId,
) -> Result<(), String> {
    if media_player.is_connected(guild_id).await {
        return Ok(());
    }

    join_channel(ctx, media_player, guild_id, voice_channel).await
}

/// Stops the guild's player and hangs up the voice call.
pub async fn leave_channel(
    ctx: &serenity::Context,
    media_player: &GlobalMediaPlayer,
    guild_id: GuildId,
) -> Result<(), String> {
    let manager = voice_manager(ctx).await?;

    if manager.get(guild_id).is_none() {
        return Err("Not in a voice channel".to_string());
    }

    if let Err(err) = media_player.quit(guild_id).await {
        warn!("Leaving guild {} without a player: {}", guild_id, err);
    }

    manager.remove(guild_id).await.map_err(|err| {
        error!("Unable to leave voice channel: {:?}", err);
        format!("Failed: {:?}", err)
    })
}
