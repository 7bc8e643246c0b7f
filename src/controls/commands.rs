use std::time::Duration;

use poise::command;
use tracing::{debug, info};

use crate::{
    utils, utils::message_context::MessageContext, utils::responses::Responses, CommandResult,
    Context,
};

/// Join your VC
#[command(slash_command, prefix_command, category = "controls")]
pub async fn join(ctx: Context<'_>) -> CommandResult {
    let Some((guild_id, voice_channel)) = utils::require_voice_channel(ctx).await else {
        return Ok(());
    };
    let Some(media_player) = utils::require_media_player(ctx).await else {
        return Ok(());
    };

    if media_player.is_connected(guild_id).await {
        ctx.warn("Already connected to a voice channel in this server!")
            .await;
        return Ok(());
    }

    match super::join_channel(ctx, &media_player, guild_id, voice_channel).await {
        Ok(_) => ctx.info("Joined voice channel ✅").await,
        Err(err) => ctx.error(err).await,
    }

    Ok(())
}

/// Leave the VC
#[command(slash_command, prefix_command, aliases("stop"), category = "controls")]
pub async fn leave(ctx: Context<'_>) -> CommandResult {
    let Some(guild_id) = utils::require_guild(ctx).await else {
        return Ok(());
    };
    let Some(media_player) = utils::require_media_player(ctx).await else {
        return Ok(());
    };

    match super::leave_channel(ctx.discord(), &media_player, guild_id).await {
        Ok(_) => ctx.info("Left voice channel").await,
        Err(err) => ctx.warn(err).await,
    }

    Ok(())
}

/// Rejoin your VC and pick the queue back up
#[command(slash_command, prefix_command, category = "controls")]
pub async fn restart(ctx: Context<'_>) -> CommandResult {
    let Some((guild_id, voice_channel)) = utils::require_voice_channel(ctx).await else {
        return Ok(());
    };
    let Some(media_player) = utils::require_media_player(ctx).await else {
        return Ok(());
    };

    if media_player.is_importing(guild_id) {
        ctx.error("Please wait for spotify playlist to finish... try again ? ❌")
            .await;
        return Ok(());
    }

    ctx.defer().await?;

    let tracks = media_player.snapshot(guild_id).await.unwrap_or_default();
    info!(
        "Restarting player in guild {} with {} tracks",
        guild_id,
        tracks.len()
    );

    if let Err(err) = media_player.quit(guild_id).await {
        debug!("Restarting guild {} without a player: {}", guild_id, err);
    }

    // let the old playback loop wind down
    tokio::time::sleep(Duration::from_secs(1)).await;

    if let Err(err) = super::join_channel(ctx, &media_player, guild_id, voice_channel).await {
        ctx.error(err).await;
        return Ok(());
    }

    if !tracks.is_empty() {
        let requeued = media_player
            .enqueue_batch(guild_id, tracks, MessageContext::new(ctx))
            .await;
        if let Err(err) = requeued {
            ctx.error(err).await;
            return Ok(());
        }
    }

    ctx.info("Bot is successfully restarted ✅").await;

    Ok(())
}
