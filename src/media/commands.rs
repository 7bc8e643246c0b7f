use std::cmp;

use poise::{
    command,
    serenity_prelude::{CreateEmbed, GuildId},
};
use tracing::{info, warn};

use crate::{
    controls,
    utils::{
        self, config,
        message_context::MessageContext,
        responses::{self, Responses},
        strings,
    },
    CommandResult, Context,
};

use super::{
    global_media_player::GlobalMediaPlayer, media_info::MediaInfo, metadata,
    plugin::get_media_player, settings::Setting, track_queue::RepeatMode,
};

pub const PAUSED: &str = "Music paused ⏸️";
pub const RESUMED: &str = "Music resumed ▶️";

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum QueuePosition {
    Back,
    Next,
}

#[derive(poise::ChoiceParameter, Clone, Copy, PartialEq, Eq, Debug)]
pub enum LoopChoice {
    #[name = "off"]
    Off,
    #[name = "track"]
    Track,
    #[name = "queue"]
    Queue,
}

impl From<LoopChoice> for RepeatMode {
    fn from(choice: LoopChoice) -> Self {
        match choice {
            LoopChoice::Off => RepeatMode::Off,
            LoopChoice::Track => RepeatMode::Track,
            LoopChoice::Queue => RepeatMode::Queue,
        }
    }
}

// Write commands

/// Play a track or a playlist
#[command(slash_command, prefix_command, aliases("p"), category = "media")]
pub async fn play(
    ctx: Context<'_>,
    #[description = "Query or url"]
    #[rest]
    song: String,
) -> CommandResult {
    play_command(ctx, &song, QueuePosition::Back).await
}

/// Play a track right after the current one
#[command(
    slash_command,
    prefix_command,
    rename = "play-next",
    aliases("pn"),
    category = "media"
)]
pub async fn play_next(
    ctx: Context<'_>,
    #[description = "Query or url"]
    #[rest]
    song: String,
) -> CommandResult {
    play_command(ctx, &song, QueuePosition::Next).await
}

async fn play_command(ctx: Context<'_>, query: &str, position: QueuePosition) -> CommandResult {
    let Some((guild_id, voice_channel)) = utils::require_voice_channel(ctx).await else {
        return Ok(());
    };
    let Some(media_player) = utils::require_media_player(ctx).await else {
        return Ok(());
    };

    let query = query.trim();
    if query.is_empty() {
        ctx.error("Please provide a track to play... try again ? ❌")
            .await;
        return Ok(());
    }

    // yt-dlp can take a few seconds
    ctx.defer().await?;

    if let Err(err) = controls::ensure_joined(ctx, &media_player, guild_id, voice_channel).await {
        ctx.error(err).await;
        return Ok(());
    }

    let infos = match metadata::resolve(query, position == QueuePosition::Back).await {
        Ok(infos) => infos,
        Err(err) => {
            warn!("[play] unable to resolve '{}': {}", query, err);
            ctx.error(err).await;
            return Ok(());
        }
    };

    let message_ctx = MessageContext::new(ctx);

    let queued = match position {
        QueuePosition::Back => {
            media_player
                .enqueue_batch(guild_id, infos.clone(), message_ctx)
                .await
        }
        QueuePosition::Next => match infos.first() {
            Some(info) => {
                media_player
                    .enqueue_next(guild_id, info.clone(), message_ctx)
                    .await
            }
            None => Err("Nothing found for this query".to_string()),
        },
    };

    if let Err(err) = queued {
        ctx.error(err).await;
        return Ok(());
    }

    info!(
        "[play] {} queued {} track(s) in guild {}",
        ctx.author().name,
        infos.len(),
        guild_id
    );

    match infos.as_slice() {
        [info] => {
            ctx.send(|m| {
                m.embed(|e| {
                    e.title(&info.title)
                        .description(format!("**{}**", info.uploader_or_unknown()))
                        .author(|a| {
                            a.name(match position {
                                QueuePosition::Back => "Queued song",
                                QueuePosition::Next => "Playing next",
                            })
                        })
                        .color(config::colors::play());
                    MessageContext::format_embed_links(e, info)
                })
            })
            .await?;
        }
        [first, ..] => {
            let (title, uploader) = match &first.playlist {
                Some(playlist) => (playlist.title.clone(), playlist.uploader.clone()),
                None => (first.title.clone(), first.uploader.clone()),
            };

            ctx.send(|m| {
                m.embed(|e| {
                    e.title(title)
                        .description(format!(
                            "Uploader: **{}**\nTracks: **{}**",
                            if uploader.is_empty() {
                                "unknown"
                            } else {
                                uploader.as_str()
                            },
                            infos.len()
                        ))
                        .author(|a| a.name("Queued playlist"))
                        .color(config::colors::play());
                    if first.thumbnail.starts_with("http") {
                        e.thumbnail(&first.thumbnail);
                    }
                    if query.starts_with("http") {
                        e.url(query);
                    }
                    e
                })
            })
            .await?;
        }
        [] => ctx.error("Nothing found for this query").await,
    }

    Ok(())
}

/// Skip the current track
#[command(slash_command, prefix_command, aliases("s"), category = "media")]
pub async fn skip(ctx: Context<'_>) -> CommandResult {
    let Some((media_player, guild_id)) = utils::require_listener(ctx).await else {
        return Ok(());
    };

    match media_player.skip(guild_id).await {
        Ok(_) => ctx.info("Skipped current track ⏭️").await,
        Err(err) => ctx.error(err).await,
    }

    Ok(())
}

/// Play the previous track
#[command(slash_command, prefix_command, category = "media")]
pub async fn back(ctx: Context<'_>) -> CommandResult {
    let Some((media_player, guild_id)) = utils::require_listener(ctx).await else {
        return Ok(());
    };

    match media_player.back(guild_id).await {
        Ok(_) => ctx.info("Playing the previous track ⏮️").await,
        Err(err) => ctx.error(err).await,
    }

    Ok(())
}

/// Pause the music
#[command(slash_command, prefix_command, category = "media")]
pub async fn pause(ctx: Context<'_>) -> CommandResult {
    let Some((media_player, guild_id)) = utils::require_listener(ctx).await else {
        return Ok(());
    };

    match media_player.pause(guild_id).await {
        Ok(_) => ctx.info(PAUSED).await,
        Err(err) => ctx.error(err).await,
    }

    Ok(())
}

/// Resume the music
#[command(slash_command, prefix_command, category = "media")]
pub async fn resume(ctx: Context<'_>) -> CommandResult {
    let Some((media_player, guild_id)) = utils::require_listener(ctx).await else {
        return Ok(());
    };

    match media_player.resume(guild_id).await {
        Ok(_) => ctx.info(RESUMED).await,
        Err(err) => ctx.error(err).await,
    }

    Ok(())
}

/// Adjust the volume of the music player
#[command(slash_command, prefix_command, aliases("vol"), category = "media")]
pub async fn volume(
    ctx: Context<'_>,
    #[description = "The volume to set"]
    #[min = 1]
    #[max = 100]
    volume: i64,
) -> CommandResult {
    let Some((media_player, guild_id)) = utils::require_listener(ctx).await else {
        return Ok(());
    };

    let max_volume = config::player::max_volume(guild_id);
    if volume < 1 || volume > max_volume as i64 {
        ctx.error(format!(
            "Volume must be between 1 and {}... try again ? ❌",
            max_volume
        ))
        .await;
        return Ok(());
    }

    match media_player.set_volume(guild_id, volume as u8).await {
        Ok(_) => ctx.info(format!("Volume set to {} ✅", volume)).await,
        Err(err) => ctx.error(err).await,
    }

    Ok(())
}

/// Seek to a time in the current track
#[command(slash_command, prefix_command, category = "media")]
pub async fn seek(
    ctx: Context<'_>,
    #[description = "Seconds or timestamp, like 1:30"] to: String,
) -> CommandResult {
    let Some((media_player, guild_id)) = utils::require_listener(ctx).await else {
        return Ok(());
    };

    let time = match strings::parse_seek_target(&to) {
        Some(time) => time,
        None => {
            ctx.error(format!("{} isn't a valid timestamp.", to)).await;
            return Ok(());
        }
    };

    if time < 0 {
        ctx.error("Cannot seek to negative time.").await;
        return Ok(());
    }

    match media_player.seek(guild_id, time).await {
        Ok(_) => {
            ctx.info(format!("Seeking to {}", strings::format_timestamp(time)))
                .await
        }
        Err(err) => {
            warn!("Seek error: {}", &err);
            ctx.error(err).await;
        }
    }

    Ok(())
}

/// Shuffle the queue
#[command(slash_command, prefix_command, category = "media")]
pub async fn shuffle(ctx: Context<'_>) -> CommandResult {
    let Some((media_player, guild_id)) = utils::require_listener(ctx).await else {
        return Ok(());
    };

    match media_player.shuffle(guild_id).await {
        Ok(count) => ctx.info(format!("Shuffled {} track(s) 🔀", count)).await,
        Err(err) => ctx.error(err).await,
    }

    Ok(())
}

/// Repeat the current track or the whole queue
#[command(
    slash_command,
    prefix_command,
    rename = "loop",
    aliases("repeat"),
    category = "media"
)]
pub async fn repeat(
    ctx: Context<'_>,
    #[description = "Repeat mode"] mode: LoopChoice,
) -> CommandResult {
    let Some((media_player, guild_id)) = utils::require_listener(ctx).await else {
        return Ok(());
    };

    let mode = RepeatMode::from(mode);

    match media_player.set_repeat_mode(guild_id, mode).await {
        Ok(_) => {
            ctx.info(match mode {
                RepeatMode::Off => "Repeat mode disabled ✅",
                RepeatMode::Track => "Repeating the current track 🔂",
                RepeatMode::Queue => "Repeating the whole queue 🔁",
            })
            .await
        }
        Err(err) => ctx.error(err).await,
    }

    Ok(())
}

/// Remove every upcoming track
#[command(slash_command, prefix_command, category = "media")]
pub async fn clear(ctx: Context<'_>) -> CommandResult {
    let Some((media_player, guild_id)) = utils::require_listener(ctx).await else {
        return Ok(());
    };

    match media_player.clear(guild_id).await {
        Ok(_) => ctx.info("Queue cleared 🗑️").await,
        Err(err) => ctx.error(err).await,
    }

    Ok(())
}

/// Remove a track from the queue
#[command(slash_command, prefix_command, aliases("rm"), category = "media")]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Position in the queue"]
    #[min = 1]
    position: i64,
) -> CommandResult {
    let Some(position) = utils::validate_position(ctx, position).await else {
        return Ok(());
    };
    let Some((media_player, guild_id)) = utils::require_listener(ctx).await else {
        return Ok(());
    };

    match media_player.remove(guild_id, position).await {
        Ok(info) => {
            ctx.info(format!(
                "Removed **{}** from the queue ✅",
                strings::escape_string(&info.title)
            ))
            .await
        }
        Err(err) => ctx.error(err).await,
    }

    Ok(())
}

/// Jump to a specific track in the queue
#[command(slash_command, prefix_command, category = "media")]
pub async fn jump(
    ctx: Context<'_>,
    #[description = "Position in the queue"]
    #[min = 1]
    position: i64,
) -> CommandResult {
    let Some(position) = utils::validate_position(ctx, position).await else {
        return Ok(());
    };
    let Some((media_player, guild_id)) = utils::require_listener(ctx).await else {
        return Ok(());
    };

    match media_player.jump(guild_id, position).await {
        Ok(info) => {
            ctx.info(format!(
                "Jumped to **{}** ✅",
                strings::escape_string(&info.title)
            ))
            .await
        }
        Err(err) => ctx.error(err).await,
    }

    Ok(())
}

// Read commands

/// Show the upcoming tracks
#[command(slash_command, prefix_command, aliases("q"), category = "media")]
pub async fn queue(
    ctx: Context<'_>,
    #[description = "Page #"]
    #[min = 1]
    page: Option<i64>,
) -> CommandResult {
    let Some(page) = utils::validate_page(ctx, page).await else {
        return Ok(());
    };
    let Some(guild_id) = utils::require_guild(ctx).await else {
        return Ok(());
    };
    let Some(media_player) = utils::require_media_player(ctx).await else {
        return Ok(());
    };

    responses::create_pagination(ctx, page, |page| {
        let media_player = media_player.clone();
        async move { queue_embed(&media_player, guild_id, page).await }
    })
    .await
}

/// Builds one page of the queue, clamped to the last page.
pub async fn queue_embed(
    media_player: &GlobalMediaPlayer,
    guild_id: GuildId,
    page: usize,
) -> Result<(CreateEmbed, usize, usize), String> {
    let page_size = config::queue::page_size(guild_id);

    let mut queue = media_player
        .read_queue(guild_id, page.saturating_mul(page_size), page_size)
        .await?;

    if queue.now_playing.is_none() && queue.total == 0 {
        return Err("The queue is empty!".to_string());
    }

    let total_pages = cmp::max(utils::ceil(queue.total, page_size), 1);
    let page = cmp::min(page, total_pages - 1);

    if queue.tracks.is_empty() && queue.total > 0 {
        queue = media_player
            .read_queue(guild_id, page * page_size, page_size)
            .await?;
    }

    let mut e = CreateEmbed::default();
    responses::format_embed_playlist(&mut e, &queue, guild_id, page)
        .title("Queue")
        .color(config::colors::queue());

    Ok((e, page, total_pages))
}

/// Show the current track
#[command(
    slash_command,
    prefix_command,
    rename = "now-playing",
    aliases("np"),
    category = "media"
)]
pub async fn now_playing(ctx: Context<'_>) -> CommandResult {
    let Some(guild_id) = utils::require_guild(ctx).await else {
        return Ok(());
    };
    let Some(media_player) = utils::require_media_player(ctx).await else {
        return Ok(());
    };

    match media_player.now_playing(guild_id).await {
        Ok(Some((info, time))) => {
            let percent = if info.duration > 0 {
                time as f32 / info.duration as f32
            } else {
                0.0
            };

            ctx.send(|m| {
                m.embed(|e| {
                    e.title(&info.title)
                        .description(format!(
                            "`{} ({}/{})`",
                            strings::create_progress_bar(guild_id, percent),
                            strings::format_timestamp(time),
                            strings::format_timestamp(info.duration)
                        ))
                        .author(|a| a.name("Now playing:"))
                        .color(config::colors::now_playing());
                    MessageContext::format_embed_links(e, &info)
                })
            })
            .await?;
        }
        Ok(None) => ctx.error("No songs playing!").await,
        Err(err) => ctx.error(err).await,
    }

    Ok(())
}

/// Save the current track to your DMs
#[command(slash_command, prefix_command, category = "media")]
pub async fn save(ctx: Context<'_>) -> CommandResult {
    let Some((media_player, guild_id)) = utils::require_listener(ctx).await else {
        return Ok(());
    };

    let info = match media_player.now_playing(guild_id).await {
        Ok(Some((info, _))) => info,
        Ok(None) => {
            ctx.error("No music currently playing!").await;
            return Ok(());
        }
        Err(err) => {
            ctx.error(err).await;
            return Ok(());
        }
    };

    let (guild_name, guild_icon) = match ctx.guild() {
        Some(guild) => {
            let icon = guild.icon_url();
            (guild.name, icon)
        }
        None => (String::new(), None),
    };

    let sent = ctx
        .author()
        .direct_message(ctx.discord(), |m| {
            m.embed(|e| format_saved_embed(e, &info, &guild_name, guild_icon.as_deref()))
        })
        .await;

    match sent {
        Ok(_) => ctx.info("Track saved to your DMs ✅").await,
        Err(err) => {
            warn!("Unable to DM {}: {:?}", ctx.author().name, err);
            ctx.error("I can't send you a DM... try again ? ❌").await;
        }
    }

    Ok(())
}

fn format_saved_embed<'b>(
    e: &'b mut CreateEmbed,
    info: &MediaInfo,
    guild_name: &str,
    guild_icon: Option<&str>,
) -> &'b mut CreateEmbed {
    let duration = if info.duration > 0 {
        strings::format_timestamp(info.duration)
    } else {
        "∞".to_string()
    };
    let views = info
        .view_count
        .map(strings::format_count)
        .unwrap_or_else(|| "unknown".to_string());

    e.title(format!(":arrow_forward: {}", info.title))
        .color(config::colors::saved())
        .field(":hourglass: Duration:", format!("`{}`", duration), true)
        .field("Track by:", format!("`{}`", info.uploader_or_unknown()), true)
        .field("Views :eyes:", format!("`{}`", views), true)
        .field("Track URL:", format!("`{}`", info.url), false)
        .footer(|f| {
            f.text(format!("From the server {}", guild_name));
            if let Some(icon) = guild_icon {
                f.icon_url(icon);
            }
            f
        });

    MessageContext::format_embed_links(e, info)
}

async fn autocomplete_setting(
    ctx: Context<'_>,
    partial: &str,
) -> impl Iterator<Item = poise::AutocompleteChoice<String>> {
    let settings = match get_media_player(ctx.discord()).await {
        Some(media_player) => media_player.settings().await,
        None => Default::default(),
    };

    settings
        .choices(partial)
        .into_iter()
        .map(|(name, value)| poise::AutocompleteChoice {
            name,
            value: value.to_string(),
        })
}

/// Toggle a player setting
#[command(slash_command, prefix_command, category = "media")]
pub async fn settings(
    ctx: Context<'_>,
    #[description = "Setting to toggle"]
    #[autocomplete = "autocomplete_setting"]
    setting: String,
) -> CommandResult {
    let Some(media_player) = utils::require_media_player(ctx).await else {
        return Ok(());
    };

    let Some(setting) = Setting::parse(&setting) else {
        let names: Vec<&str> = Setting::ALL.iter().map(|setting| setting.name()).collect();
        ctx.error(format!(
            "Unknown setting, pick one of `{}`... try again ? ❌",
            names.join("`, `")
        ))
        .await;
        return Ok(());
    };

    let value = media_player.toggle_setting(setting).await;
    info!("{} set {} to {}", ctx.author().name, setting.name(), value);

    ctx.info(format!(
        "Setting `{}` to `{}` ✅\nIt applies the next time I join a voice channel or after `/restart`",
        setting.name(),
        value
    ))
    .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    mod queue_embed {
        use super::*;

        #[tokio::test]
        async fn far_page_without_player() {
            let media_player = GlobalMediaPlayer::new();

            let rendered = queue_embed(&media_player, GuildId(1), usize::MAX / 2).await;

            assert!(matches!(rendered, Err(err) if err == "Not connected to a voice channel!"));
        }
    }
}
