use poise::{
    command,
    serenity_prelude::{self as serenity, CreateEmbed, GuildId, Timestamp, User},
};
use tracing::{error, warn};

use crate::{
    media::global_media_player::GlobalMediaPlayer,
    utils::{self, config, responses::Responses, strings},
    CommandResult, Context,
};

use super::{find_lyrics, plugin::get_lyrics_plugin, Lyrics};

/// Get the lyrics of the current track
#[command(slash_command, prefix_command, category = "media")]
pub async fn lyrics(ctx: Context<'_>) -> CommandResult {
    let Some((media_player, guild_id)) = utils::require_listener(ctx).await else {
        return Ok(());
    };

    ctx.defer().await?;

    match lyrics_embed(ctx.discord(), &media_player, guild_id, ctx.author()).await {
        Ok(embed) => {
            ctx.send(|m| {
                m.embeds.push(embed);
                m
            })
            .await?;
        }
        Err(err) => ctx.error(err).await,
    }

    Ok(())
}

/// Looks up the lyrics of the track playing in the guild.
pub async fn lyrics_embed(
    ctx: &serenity::Context,
    media_player: &GlobalMediaPlayer,
    guild_id: GuildId,
    user: &User,
) -> Result<CreateEmbed, String> {
    let (info, _) = media_player
        .now_playing(guild_id)
        .await?
        .ok_or_else(|| "No music currently playing!".to_string())?;

    let catalog = get_lyrics_plugin(ctx).await.ok_or_else(|| {
        error!("Lyrics client is not registered in the client data");
        "Lyrics are unavailable right now.".to_string()
    })?;

    match find_lyrics(&*catalog, &info.title, &info.uploader).await {
        Ok(lyrics) => {
            let mut e = CreateEmbed::default();
            format_lyrics_embed(&mut e, &lyrics, user);
            Ok(e)
        }
        Err(err) => {
            warn!("[lyrics] lookup for '{}' failed: {}", info.title, err);
            Err(format!("No lyrics found for {}... try again ? ❌", info.title))
        }
    }
}

pub fn format_lyrics_embed<'b>(
    e: &'b mut CreateEmbed,
    lyrics: &Lyrics,
    user: &User,
) -> &'b mut CreateEmbed {
    e.title(format!("Lyrics for {}", lyrics.title))
        .description(strings::truncate_chars(
            &lyrics.text,
            config::lyrics::text_length(),
        ))
        .color(config::colors::lyrics())
        .timestamp(Timestamp::now())
        .footer(|f| f.text("Lyrics provided by Genius.com").icon_url(user.face()));

    if lyrics.url.starts_with("http") {
        e.url(&lyrics.url);
    }
    if lyrics.thumbnail.starts_with("http") {
        e.thumbnail(&lyrics.thumbnail);
    }

    e
}
