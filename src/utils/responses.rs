use std::{fmt::Display, future::Future, time::Duration};

use poise::{
    async_trait,
    serenity_prelude::{
        ButtonStyle, CollectComponentInteraction, CreateComponents, CreateEmbed, GuildId,
        InteractionResponseType,
    },
    CreateReply, ReplyHandle,
};
use tracing::error;

use crate::{media::global_media_player::QueuePage, CommandResult, Context};

use super::{config, strings};

#[async_trait]
pub trait Responses {
    async fn info(self, message: impl Display + std::marker::Send);
    async fn warn(self, message: impl Display + std::marker::Send);
    async fn error(self, message: impl Display + std::marker::Send);
}

#[async_trait]
impl Responses for Context<'_> {
    async fn info(self, message: impl Display + std::marker::Send) {
        check_msg(self.send(|m| format_info(m, message)).await);
    }

    async fn warn(self, message: impl Display + std::marker::Send) {
        check_msg(self.send(|m| format_warn(m, message)).await);
    }

    async fn error(self, message: impl Display + std::marker::Send) {
        check_msg(self.send(|m| format_error(m, message)).await);
    }
}

fn check_msg(response_result: Result<ReplyHandle<'_>, serenity::Error>) {
    if let Err(err) = response_result {
        error!("Failed to send message: {}", err);
    }
}

pub fn format_info<'a, 'b>(
    m: &'b mut CreateReply<'a>,
    message: impl Display,
) -> &'b mut CreateReply<'a> {
    m.content("").embed(|e| embed_info(e, message))
}

pub fn format_error<'a, 'b>(
    m: &'b mut CreateReply<'a>,
    message: impl Display,
) -> &'b mut CreateReply<'a> {
    m.content("").embed(|e| embed_error(e, message))
}

pub fn format_warn<'a, 'b>(
    m: &'b mut CreateReply<'a>,
    message: impl Display,
) -> &'b mut CreateReply<'a> {
    m.content("").embed(|e| {
        e.title("Warning")
            .description(message)
            .color(config::colors::warn())
    })
}

pub fn embed_info(e: &mut CreateEmbed, message: impl Display) -> &mut CreateEmbed {
    e.title("Info")
        .description(message)
        .color(config::colors::info())
}

pub fn embed_error(e: &mut CreateEmbed, message: impl Display) -> &mut CreateEmbed {
    e.title("Error")
        .description(message)
        .color(config::colors::error())
}

pub fn format_embed_playlist<'b>(
    e: &'b mut CreateEmbed,
    queue: &QueuePage,
    guild_id: GuildId,
    page: usize,
) -> &'b mut CreateEmbed {
    let page_size = config::queue::page_size(guild_id);
    let text_len = config::queue::text_length(guild_id);

    if let Some(info) = &queue.now_playing {
        e.author(|a| {
            a.name(format!(
                "Now playing: {}",
                strings::limit_string_length(&info.title, text_len)
            ))
        });
    }

    let description = if queue.tracks.is_empty() {
        "No upcoming tracks".to_string()
    } else {
        queue
            .tracks
            .iter()
            .enumerate()
            .map(|(i, info)| {
                format!(
                    "**{}) [{}]({})** ({})",
                    i + 1 + page * page_size,
                    strings::escape_string(&strings::limit_string_length(&info.title, text_len)),
                    info.url,
                    strings::format_timestamp(info.duration)
                )
            })
            .collect::<Vec<String>>()
            .join("\n")
    };

    e.description(description).footer(|f| {
        f.text(strings::page_display(
            page + 1,
            queue.total,
            page_size,
            "track",
        ))
    })
}

/// A Back or Next click on a paginated reply.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum PageTurn {
    Back,
    Next,
}

impl PageTurn {
    fn custom_id(self, reply_id: u64) -> String {
        match self {
            PageTurn::Back => format!("{}__back", reply_id),
            PageTurn::Next => format!("{}__next", reply_id),
        }
    }

    fn parse(custom_id: &str, reply_id: u64) -> Option<PageTurn> {
        match custom_id.strip_prefix(&reply_id.to_string())? {
            "__back" => Some(PageTurn::Back),
            "__next" => Some(PageTurn::Next),
            _ => None,
        }
    }

    fn apply(self, page: usize) -> usize {
        match self {
            PageTurn::Back => page.saturating_sub(1),
            PageTurn::Next => page.saturating_add(1),
        }
    }
}

/// The embed a page turn shows, plus the page and page count for its buttons.
/// A failed render shows the error and drops the buttons.
fn turned_page(
    rendered: Result<(CreateEmbed, usize, usize), String>,
) -> (CreateEmbed, Option<(usize, usize)>) {
    match rendered {
        Ok((embed, page, total_pages)) => (embed, Some((page, total_pages))),
        Err(err) => {
            let mut embed = CreateEmbed::default();
            embed_error(&mut embed, err);
            (embed, None)
        }
    }
}

fn create_page_buttons(
    c: &mut CreateComponents,
    reply_id: u64,
    page: usize,
    total_pages: usize,
) -> &mut CreateComponents {
    let turns: Vec<(PageTurn, &str)> = [
        (page > 0, (PageTurn::Back, "Back")),
        (page + 1 < total_pages, (PageTurn::Next, "Next")),
    ]
    .into_iter()
    .filter_map(|(shown, turn)| shown.then_some(turn))
    .collect();

    if !turns.is_empty() {
        c.create_action_row(|r| {
            for (turn, label) in turns {
                r.create_button(|b| {
                    b.label(label)
                        .custom_id(turn.custom_id(reply_id))
                        .style(ButtonStyle::Primary)
                });
            }
            r
        });
    }

    c
}

/// Replies with the first page from `render` and keeps turning pages for the
/// command author until the buttons go quiet for two minutes. `render` returns
/// the embed, the page it actually showed and the page count.
pub async fn create_pagination<F, Fut>(
    ctx: Context<'_>,
    initial_page: usize,
    render: F,
) -> CommandResult
where
    F: Fn(usize) -> Fut,
    Fut: Future<Output = Result<(CreateEmbed, usize, usize), String>>,
{
    let reply_id = ctx.id();

    let (embed, mut page, total_pages) = match render(initial_page).await {
        Ok(rendered) => rendered,
        Err(err) => {
            ctx.error(err).await;
            return Ok(());
        }
    };

    ctx.send(|m| {
        m.embeds.push(embed);
        m.components(|c| create_page_buttons(c, reply_id, page, total_pages))
    })
    .await?;

    while let Some(mci) = CollectComponentInteraction::new(ctx.discord())
        .author_id(ctx.author().id)
        .channel_id(ctx.channel_id())
        .timeout(Duration::from_secs(120))
        .filter(move |mci| PageTurn::parse(&mci.data.custom_id, reply_id).is_some())
        .await
    {
        let Some(turn) = PageTurn::parse(&mci.data.custom_id, reply_id) else {
            continue;
        };

        let (embed, turned) = turned_page(render(turn.apply(page)).await);

        mci.create_interaction_response(ctx.discord(), |ir| {
            ir.kind(InteractionResponseType::UpdateMessage)
                .interaction_response_data(|d| {
                    d.set_embed(embed).components(|c| match turned {
                        Some((shown, total_pages)) => {
                            create_page_buttons(c, reply_id, shown, total_pages)
                        }
                        None => c,
                    })
                })
        })
        .await?;

        match turned {
            Some((shown, _)) => page = shown,
            None => break,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    mod page_turn {
        use super::super::PageTurn;

        #[test]
        fn reads_own_buttons() {
            assert_eq!(
                PageTurn::parse(&PageTurn::Next.custom_id(99), 99),
                Some(PageTurn::Next)
            );
            assert_eq!(PageTurn::parse("99__back", 99), Some(PageTurn::Back));
        }

        #[test]
        fn ignores_other_replies() {
            assert_eq!(PageTurn::parse("199__next", 99), None);
            assert_eq!(PageTurn::parse("skip:3", 99), None);
        }

        #[test]
        fn back_stops_at_first_page() {
            assert_eq!(PageTurn::Back.apply(0), 0);
            assert_eq!(PageTurn::Back.apply(3), 2);
            assert_eq!(PageTurn::Next.apply(3), 4);
            assert_eq!(PageTurn::Next.apply(usize::MAX), usize::MAX);
        }
    }

    mod turned_page {
        use poise::serenity_prelude::CreateEmbed;
        use serde_json::Value;

        use super::super::turned_page;

        #[test]
        fn keeps_rendered_page() {
            let mut embed = CreateEmbed::default();
            embed.title("Queue");

            let (shown, turned) = turned_page(Ok((embed, 2, 5)));

            assert_eq!(turned, Some((2, 5)));
            assert_eq!(shown.0.get("title"), Some(&Value::from("Queue")));
        }

        #[test]
        fn failed_render_answers_with_error() {
            let (shown, turned) = turned_page(Err("The queue is empty!".to_string()));

            assert_eq!(turned, None);
            assert_eq!(shown.0.get("title"), Some(&Value::from("Error")));
            assert_eq!(
                shown.0.get("description"),
                Some(&Value::from("The queue is empty!"))
            );
        }
    }
}
