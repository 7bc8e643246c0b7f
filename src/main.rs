mod controls;
mod events;
mod logging;
mod lyrics;
mod media;
mod spotify;
mod utils;

use std::{env, process, sync::Arc};

use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use songbird::SerenityInit;
use tracing::{error, info};

use crate::{
    lyrics::{genius::GeniusClient, plugin::LyricsPluginInit},
    media::{global_media_player::GlobalMediaPlayer, plugin::MediaPlayerInit},
    spotify::{plugin::SpotifyPluginInit, SpotifyClient},
    utils::{config, responses::Responses},
};

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type CommandResult = Result<(), Error>;
pub type Context<'a> = poise::Context<'a, UserData, Error>;
pub struct UserData {}

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() {
    dotenv().ok();

    // Logging
    let _log_guard = match logging::init() {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    };

    if let Err(err) = config::env::validate() {
        error!("{}", err);
        process::exit(1);
    }

    // Plugins
    let media_player = Arc::new(GlobalMediaPlayer::new());
    let genius = Arc::new(GeniusClient::new(config::env::get(
        config::env::GENIUS_ACCESS_TOKEN,
    )));
    let spotify = SpotifyClient::from_env().map(Arc::new);
    if spotify.is_none() {
        info!("Spotify credentials are not set, playlists are disabled");
    }

    // Framework
    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::MESSAGE_CONTENT;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                media::commands::play(),
                media::commands::play_next(),
                media::commands::skip(),
                media::commands::back(),
                media::commands::pause(),
                media::commands::resume(),
                media::commands::volume(),
                media::commands::seek(),
                media::commands::shuffle(),
                media::commands::repeat(),
                media::commands::clear(),
                media::commands::remove(),
                media::commands::jump(),
                media::commands::queue(),
                media::commands::now_playing(),
                media::commands::save(),
                media::commands::settings(),
                media::search::search(),
                spotify::commands::playlist(),
                lyrics::commands::lyrics(),
                controls::commands::join(),
                controls::commands::leave(),
                controls::commands::restart(),
                help(),
                version(),
                register(),
            ],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: env::var("BOT_PREFIX").ok(),
                ..Default::default()
            },
            listener: |ctx, event, _framework, _data| {
                Box::pin(events::handle_event(ctx, event))
            },
            ..Default::default()
        })
        .user_data_setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                // Debug Guild
                if let Ok(guild_id) = env::var("DEBUG_GUILD_ID") {
                    if let Err(err) =
                        register_in_guild(ctx, &framework.options().commands, &guild_id).await
                    {
                        error!("Unable to register commands in DEBUG_GUILD_ID: {}", err);
                    }
                }

                Ok(UserData {})
            })
        })
        .client_settings(move |c| {
            c.register_songbird()
                .register_media_player(media_player)
                .register_lyrics_plugin(genius)
                .register_spotify_plugin(spotify)
        })
        .token(config::env::get(config::env::DISCORD_TOKEN))
        .intents(intents);

    if let Err(err) = framework.run().await {
        error!("Client error: {:?}", err);
        process::exit(1);
    }
}

async fn register_in_guild(
    ctx: &serenity::Context,
    commands: &[poise::Command<UserData, Error>],
    guild_id: &str,
) -> Result<(), Error> {
    let guild = ctx.http.get_guild(guild_id.parse()?).await?;

    let commands_builder = poise::builtins::create_application_commands(commands);
    let num_commands = commands_builder.0.len();

    guild
        .set_application_commands(&ctx.http, |b| {
            *b = commands_builder;
            b
        })
        .await?;

    info!(
        "Set {} application commands for {}",
        num_commands, &guild.name
    );

    Ok(())
}

// Help
#[poise::command(slash_command, prefix_command, aliases("v"), category = "debug")]
async fn version(ctx: Context<'_>) -> Result<(), Error> {
    ctx.info(format!("Version: {}", env!("CARGO_PKG_VERSION")))
        .await;

    Ok(())
}

/// Registers or unregisters application commands in this guild or globally
#[poise::command(prefix_command, hide_in_help)]
async fn register(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx).await?;

    Ok(())
}

#[poise::command(prefix_command, track_edits, slash_command)]
async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> Result<(), Error> {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            extra_text_at_bottom: "Play something with /play, then use the buttons under the \"Started playing\" message.",
            ..Default::default()
        },
    )
    .await?;
    Ok(())
}
