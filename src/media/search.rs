use poise::{
    command,
    serenity_prelude::{
        CollectComponentInteraction, CreateComponents, CreateEmbed, InteractionResponseType,
    },
};
use tracing::{info, warn};

use crate::{
    controls,
    utils::{
        self, config,
        message_context::MessageContext,
        responses::{embed_info, Responses},
        strings,
    },
    CommandResult, Context,
};

use super::{media_info::MediaInfo, metadata};

const CANCEL: &str = "cancel";

/// What was picked from the result menu.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum SearchChoice {
    /// 0-based index into the results.
    Track(usize),
    Cancel,
}

impl SearchChoice {
    fn parse(value: &str, count: usize) -> Option<SearchChoice> {
        if value == CANCEL {
            return Some(SearchChoice::Cancel);
        }

        let index: usize = value.parse().ok()?;
        (index < count).then_some(SearchChoice::Track(index))
    }
}

fn menu_id(reply_id: u64) -> String {
    format!("{}__search", reply_id)
}

fn option_label(index: usize, info: &MediaInfo) -> String {
    strings::truncate_chars(
        &format!("{}. {}", index + 1, info.title),
        config::search::option_length(),
    )
}

fn format_results(results: &[MediaInfo], text_len: usize) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, info)| {
            format!(
                "**{}**. {} | {}",
                i + 1,
                strings::escape_string(&strings::limit_string_length(&info.title, text_len)),
                strings::escape_string(info.uploader_or_unknown())
            )
        })
        .collect::<Vec<String>>()
        .join("\n")
}

fn create_result_menu<'a>(
    c: &'a mut CreateComponents,
    reply_id: u64,
    results: &[MediaInfo],
) -> &'a mut CreateComponents {
    c.create_action_row(|r| {
        r.create_select_menu(|menu| {
            menu.custom_id(menu_id(reply_id))
                .placeholder("Choose a track")
                .options(|o| {
                    for (index, info) in results.iter().enumerate() {
                        o.create_option(|opt| {
                            opt.label(option_label(index, info))
                                .value(index.to_string())
                        });
                    }
                    o.create_option(|opt| opt.label("Cancel").value(CANCEL))
                })
        })
    })
}

/// Search YouTube and pick a track to queue
#[command(slash_command, prefix_command, category = "media")]
pub async fn search(
    ctx: Context<'_>,
    #[description = "What to look for"]
    #[rest]
    query: String,
) -> CommandResult {
    let Some((guild_id, _)) = utils::require_voice_channel(ctx).await else {
        return Ok(());
    };
    let Some(media_player) = utils::require_media_player(ctx).await else {
        return Ok(());
    };

    let query = query.trim();
    if query.is_empty() {
        ctx.error("Please provide something to search for... try again ? ❌")
            .await;
        return Ok(());
    }

    ctx.defer().await?;

    let results = match metadata::search(query, config::search::result_count()).await {
        Ok(results) if !results.is_empty() => results,
        Ok(_) => {
            ctx.error("No results found... try again ? ❌").await;
            return Ok(());
        }
        Err(err) => {
            warn!("[search] unable to search '{}': {}", query, err);
            ctx.error(err).await;
            return Ok(());
        }
    };

    let reply_id = ctx.id();
    let custom_id = menu_id(reply_id);
    let text_len = config::queue::text_length(guild_id);

    let handle = ctx
        .send(|m| {
            m.embed(|e| {
                e.author(|a| a.name(format!("Results for {}", query)))
                    .description(format_results(&results, text_len))
                    .footer(|f| {
                        f.text(format!(
                            "Pick a track below within {} seconds",
                            config::search::timeout().as_secs()
                        ))
                    })
                    .color(config::colors::search())
            })
            .components(|c| create_result_menu(c, reply_id, &results))
        })
        .await?;

    let mci = CollectComponentInteraction::new(ctx.discord())
        .author_id(ctx.author().id)
        .channel_id(ctx.channel_id())
        .timeout(config::search::timeout())
        .filter(move |mci| mci.data.custom_id == custom_id)
        .await;

    let Some(mci) = mci else {
        handle
            .edit(ctx, |m| {
                m.embed(|e| {
                    e.title("Error")
                        .description("You didn't select a track... try again ? ❌")
                        .color(config::colors::error())
                })
                .components(|c| c)
            })
            .await?;
        return Ok(());
    };

    let choice = mci
        .data
        .values
        .first()
        .and_then(|value| SearchChoice::parse(value, results.len()));

    let (message, picked) = match choice {
        Some(SearchChoice::Track(index)) => ("Loading your track... 🎧", results.get(index)),
        _ => ("Cancelled ❌", None),
    };

    let mut embed = CreateEmbed::default();
    embed_info(&mut embed, message);

    mci.create_interaction_response(ctx.discord(), |ir| {
        ir.kind(InteractionResponseType::UpdateMessage)
            .interaction_response_data(|d| d.set_embed(embed).components(|c| c))
    })
    .await?;

    let Some(picked) = picked else {
        return Ok(());
    };

    // the author may have left voice while picking
    let Some(voice_channel) = utils::user_voice_channel(ctx.discord(), guild_id, ctx.author().id)
    else {
        ctx.error("You need to be in a voice channel to use this command!")
            .await;
        return Ok(());
    };

    if let Err(err) = controls::ensure_joined(ctx, &media_player, guild_id, voice_channel).await {
        ctx.error(err).await;
        return Ok(());
    }

    let info = match metadata::get_info(&picked.url).await {
        Ok(info) => info,
        Err(err) => {
            warn!("[search] using flat metadata for {}: {}", picked.url, err);
            picked.clone()
        }
    };

    info!("[search] {} picked {}", ctx.author().name, info.title);

    let title = strings::escape_string(&info.title);
    match media_player
        .enqueue_batch(guild_id, vec![info], MessageContext::new(ctx))
        .await
    {
        Ok(_) => ctx.info(format!("Queued **{}** ✅", title)).await,
        Err(err) => ctx.error(err).await,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(title: &str, uploader: &str) -> MediaInfo {
        MediaInfo {
            title: title.to_string(),
            uploader: uploader.to_string(),
            ..Default::default()
        }
    }

    mod choice {
        use super::*;

        #[test]
        fn picks_listed_track() {
            assert_eq!(SearchChoice::parse("0", 10), Some(SearchChoice::Track(0)));
            assert_eq!(SearchChoice::parse("9", 10), Some(SearchChoice::Track(9)));
        }

        #[test]
        fn cancel() {
            assert_eq!(SearchChoice::parse(CANCEL, 10), Some(SearchChoice::Cancel));
        }

        #[test]
        fn rejects_unknown_values() {
            assert_eq!(SearchChoice::parse("10", 10), None);
            assert_eq!(SearchChoice::parse("-1", 10), None);
            assert_eq!(SearchChoice::parse("", 10), None);
        }
    }

    #[test]
    fn menu_belongs_to_reply() {
        assert_eq!(menu_id(42), "42__search");
    }

    #[test]
    fn labels_fit_select_options() {
        let long = info(&"a".repeat(300), "me");

        assert_eq!(option_label(0, &info("Believer", "me")), "1. Believer");
        assert_eq!(option_label(4, &long).chars().count(), 100);
        assert!(option_label(4, &long).starts_with("5. aaa"));
    }

    #[test]
    fn result_lines() {
        let results = [info("Believer", "ImagineDragons"), info("Thunder", "")];

        assert_eq!(
            format_results(&results, 60),
            "**1**. Believer | ImagineDragons\n**2**. Thunder | unknown"
        );
    }
}
