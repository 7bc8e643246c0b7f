use poise::command;
use tracing::{info, warn};

use crate::{
    controls,
    media::metadata,
    utils::{self, config, message_context::MessageContext, responses::Responses},
    CommandResult, Context,
};

use super::{plugin::get_spotify_plugin, playlist_id, SpotifyError};

fn fetch_error_message(err: &SpotifyError) -> &'static str {
    match err {
        SpotifyError::Status(404) => "Playlist not found... try again ? ❌",
        _ => "Sorry, something went wrong... try again ? ❌",
    }
}

fn import_summary(queued: usize, total: usize) -> Result<String, String> {
    if queued == 0 {
        return Err("I couldn't find any track of this playlist... try again ? ❌".to_string());
    }

    Ok(format!(
        "Queued {} of {} tracks from the playlist ✅",
        queued, total
    ))
}

/// Queue a Spotify playlist
#[command(slash_command, prefix_command, category = "media")]
pub async fn playlist(
    ctx: Context<'_>,
    #[description = "Spotify playlist url"] url: String,
) -> CommandResult {
    let Some((guild_id, voice_channel)) = utils::require_voice_channel(ctx).await else {
        return Ok(());
    };
    let Some(media_player) = utils::require_media_player(ctx).await else {
        return Ok(());
    };

    let Some(id) = playlist_id(&url) else {
        ctx.error("Please provide a valid spotify playlist... try again ? ❌")
            .await;
        return Ok(());
    };

    let Some(spotify) = get_spotify_plugin(ctx.discord()).await else {
        ctx.error("Spotify playlists are not set up on this bot ❌")
            .await;
        return Ok(());
    };

    let Some(_import) = media_player.begin_import(guild_id) else {
        ctx.error("I'm currently searching for a spotify playlist... try again ? ❌")
            .await;
        return Ok(());
    };

    ctx.defer().await?;

    let tracks = match spotify
        .playlist_tracks(id, config::spotify::max_tracks())
        .await
    {
        Ok(tracks) if !tracks.is_empty() => tracks,
        Ok(_) => {
            ctx.error("Playlist contains 0 tracks... try again ? ❌")
                .await;
            return Ok(());
        }
        Err(err) => {
            warn!("[spotify] unable to read playlist {}: {}", id, err);
            ctx.error(fetch_error_message(&err)).await;
            return Ok(());
        }
    };

    if let Err(err) = controls::ensure_joined(ctx, &media_player, guild_id, voice_channel).await {
        ctx.error(err).await;
        return Ok(());
    }

    ctx.info("Loading your spotify playlist... ✅").await;

    let message_ctx = MessageContext::new(ctx);
    let total = tracks.len();
    let mut queued = 0;

    for track in tracks {
        let query = track.search_query();

        let info = match metadata::get_search(&query).await {
            Ok(info) => info,
            Err(err) => {
                warn!("[spotify] no match for '{}': {}", query, err);
                continue;
            }
        };

        // the player is gone once the bot left voice
        if let Err(err) = media_player
            .enqueue_batch(guild_id, vec![info], message_ctx.clone())
            .await
        {
            info!("[spotify] stopped import in guild {}: {}", guild_id, err);
            break;
        }

        queued += 1;
    }

    match import_summary(queued, total) {
        Ok(message) => ctx.info(message).await,
        Err(err) => ctx.error(err).await,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_playlist() {
        assert_eq!(
            fetch_error_message(&SpotifyError::Status(404)),
            "Playlist not found... try again ? ❌"
        );
        assert_eq!(
            fetch_error_message(&SpotifyError::Status(500)),
            "Sorry, something went wrong... try again ? ❌"
        );
    }

    #[test]
    fn summary() {
        assert_eq!(
            import_summary(3, 5),
            Ok("Queued 3 of 5 tracks from the playlist ✅".to_string())
        );
        assert!(import_summary(0, 5).is_err());
    }
}
