use poise::serenity_prelude::{self as serenity, ChannelId, GuildId, Interaction, UserId, VoiceState};
use tracing::{debug, info, warn};

use crate::{controls, controls::buttons, media::plugin::get_media_player, Error};

pub async fn handle_event(ctx: &serenity::Context, event: &poise::Event<'_>) -> Result<(), Error> {
    match event {
        poise::Event::Ready { data_about_bot } => {
            info!("{} is connected!", data_about_bot.user.name);
        }
        poise::Event::InteractionCreate {
            interaction: Interaction::MessageComponent(mci),
        } => buttons::handle_interaction(ctx, mci).await?,
        poise::Event::VoiceStateUpdate { new, .. } => voice_state_update(ctx, new).await?,
        _ => {}
    }

    Ok(())
}

async fn voice_state_update(ctx: &serenity::Context, new: &VoiceState) -> Result<(), Error> {
    let Some(guild_id) = new.guild_id else {
        return Ok(());
    };
    let Some(media_player) = get_media_player(ctx).await else {
        return Ok(());
    };

    let bot_id = ctx.cache.current_user_id();

    if new.user_id == bot_id && new.channel_id.is_none() {
        if media_player.disconnected(guild_id).await {
            info!("Disconnected from voice in guild {}", guild_id);
        }

        let manager = controls::voice_manager(ctx).await?;
        if manager.get(guild_id).is_some() {
            if let Err(err) = manager.remove(guild_id).await {
                warn!("Unable to clean up voice call: {:?}", err);
            }
        }

        return Ok(());
    }

    if !media_player.is_connected(guild_id).await {
        return Ok(());
    }

    let Some(listeners) = count_listeners(ctx, guild_id, bot_id) else {
        return Ok(());
    };

    if let Err(err) = media_player.listeners_changed(guild_id, listeners).await {
        debug!("Unable to follow listeners in guild {}: {}", guild_id, err);
    }

    Ok(())
}

/// Users other than bots sharing the bot's voice channel, read from the cache.
fn count_listeners(ctx: &serenity::Context, guild_id: GuildId, bot_id: UserId) -> Option<usize> {
    let guild = ctx.cache.guild(guild_id)?;
    let channel: ChannelId = guild.voice_states.get(&bot_id)?.channel_id?;

    Some(
        guild
            .voice_states
            .values()
            .filter(|voice_state| voice_state.channel_id == Some(channel))
            .filter(|voice_state| voice_state.user_id != bot_id)
            .filter(|voice_state| {
                !voice_state
                    .member
                    .as_ref()
                    .map(|member| member.user.bot)
                    .unwrap_or(false)
            })
            .count(),
    )
}
