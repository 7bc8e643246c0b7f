use poise::serenity_prelude::{
    self as serenity, ButtonStyle, CreateComponents, CreateEmbed, GuildId,
    InteractionResponseType, MessageComponentInteraction,
};
use tracing::{debug, info};

use crate::{
    lyrics, media,
    media::plugin::get_media_player,
    utils,
    utils::responses::{embed_error, embed_info},
    Error,
};

/// What a button under a "Started playing" message does.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ControlAction {
    Back,
    Lyrics,
    TogglePause,
    Queue,
    Skip,
}

impl ControlAction {
    /// In display order.
    pub const ALL: [ControlAction; 5] = [
        ControlAction::Back,
        ControlAction::Lyrics,
        ControlAction::TogglePause,
        ControlAction::Queue,
        ControlAction::Skip,
    ];

    fn id(self) -> &'static str {
        match self {
            ControlAction::Back => "back",
            ControlAction::Lyrics => "lyrics",
            ControlAction::TogglePause => "pause",
            ControlAction::Queue => "queue",
            ControlAction::Skip => "skip",
        }
    }

    fn label(self) -> &'static str {
        match self {
            ControlAction::Back => "Back",
            ControlAction::Lyrics => "Lyrics",
            ControlAction::TogglePause => "Resume & Pause",
            ControlAction::Queue => "Queue",
            ControlAction::Skip => "Skip",
        }
    }

    fn style(self) -> ButtonStyle {
        match self {
            ControlAction::Back | ControlAction::Skip => ButtonStyle::Primary,
            ControlAction::Lyrics | ControlAction::Queue => ButtonStyle::Secondary,
            ControlAction::TogglePause => ButtonStyle::Danger,
        }
    }

    /// Button id carrying the serial of the track the button belongs to.
    pub fn custom_id(self, serial: u64) -> String {
        format!("{}:{}", self.id(), serial)
    }

    pub fn parse(custom_id: &str) -> Option<(ControlAction, u64)> {
        let (id, serial) = custom_id.split_once(':')?;
        let action = Self::ALL.into_iter().find(|action| action.id() == id)?;

        Some((action, serial.parse().ok()?))
    }
}

pub fn create_control_buttons(c: &mut CreateComponents, serial: u64) -> &mut CreateComponents {
    c.create_action_row(|r| {
        for action in ControlAction::ALL {
            r.create_button(|b| {
                b.label(action.label())
                    .custom_id(action.custom_id(serial))
                    .style(action.style())
            });
        }
        r
    })
}

/// Answers a click on one of the player buttons. Other components are ignored.
pub async fn handle_interaction(
    ctx: &serenity::Context,
    mci: &MessageComponentInteraction,
) -> Result<(), Error> {
    let Some((action, serial)) = ControlAction::parse(&mci.data.custom_id) else {
        return Ok(());
    };
    let Some(guild_id) = mci.guild_id else {
        return Ok(());
    };

    debug!(
        "[buttons] {} pressed {:?} for track {} in guild {}",
        mci.user.name, action, serial, guild_id
    );

    mci.create_interaction_response(&ctx.http, |ir| {
        ir.kind(InteractionResponseType::DeferredChannelMessageWithSource)
    })
    .await?;

    let embed = match run_action(ctx, mci, guild_id, action, serial).await {
        Ok(embed) => embed,
        Err(err) => {
            let mut e = CreateEmbed::default();
            embed_error(&mut e, err);
            e
        }
    };

    mci.edit_original_interaction_response(&ctx.http, |r| r.set_embed(embed))
        .await?;

    Ok(())
}

async fn run_action(
    ctx: &serenity::Context,
    mci: &MessageComponentInteraction,
    guild_id: GuildId,
    action: ControlAction,
    serial: u64,
) -> Result<CreateEmbed, String> {
    let media_player = get_media_player(ctx)
        .await
        .ok_or_else(|| "The music player is unavailable right now.".to_string())?;

    if !media_player.is_current(guild_id, serial).await {
        return Err("This track is no longer playing ❌".to_string());
    }

    if utils::user_voice_channel(ctx, guild_id, mci.user.id).is_none() {
        return Err("You need to be in a voice channel to use this command!".to_string());
    }

    let mut e = CreateEmbed::default();

    match action {
        ControlAction::Back => {
            media_player.back(guild_id).await?;
            embed_info(&mut e, "Playing the previous track ⏮️");
        }
        ControlAction::Lyrics => {
            return lyrics::commands::lyrics_embed(ctx, &media_player, guild_id, &mci.user).await
        }
        ControlAction::TogglePause => {
            if media_player.toggle_pause(guild_id).await? {
                embed_info(&mut e, media::commands::PAUSED);
            } else {
                embed_info(&mut e, media::commands::RESUMED);
            }
        }
        ControlAction::Queue => {
            return media::commands::queue_embed(&media_player, guild_id, 0)
                .await
                .map(|(embed, _, _)| embed)
        }
        ControlAction::Skip => {
            media_player.skip(guild_id).await?;
            info!("[buttons] {} skipped a track in guild {}", mci.user.name, guild_id);
            embed_info(&mut e, format!("{} skipped the track ⏭️", mci.user.name));
        }
    }

    Ok(e)
}

#[cfg(test)]
mod tests {
    mod custom_id {
        use super::super::ControlAction;

        #[test]
        fn reads_back_every_action() {
            for action in ControlAction::ALL {
                assert_eq!(
                    ControlAction::parse(&action.custom_id(42)),
                    Some((action, 42))
                );
            }
        }

        #[test]
        fn ids_are_distinct() {
            assert_eq!(ControlAction::TogglePause.custom_id(7), "pause:7");
            assert_eq!(ControlAction::Skip.custom_id(7), "skip:7");
        }

        #[test]
        fn ignores_pagination_buttons() {
            assert_eq!(ControlAction::parse("1045123456789__next"), None);
        }

        #[test]
        fn rejects_unknown_action() {
            assert_eq!(ControlAction::parse("stop:3"), None);
        }

        #[test]
        fn rejects_bad_serial() {
            assert_eq!(ControlAction::parse("skip:"), None);
            assert_eq!(ControlAction::parse("skip:-1"), None);
        }
    }
}
