use std::cmp;

use regex::Regex;
use serenity::model::prelude::GuildId;

use super::config;

static SENSITIVE_CHARACTERS: [&str; 7] = ["\\", "*", "_", "~", "`", "|", ">"];

/// Escapes all sensitize Discord characters
/* @see: https://github.com/discord-net/Discord.Net/blob/265da99619a775d23b24326648fe4220bc6beeae/src/Discord.Net.Core/Format.cs#L36 */
pub fn escape_string(text: &str) -> String {
    SENSITIVE_CHARACTERS
        .iter()
        .fold(text.to_string(), |sanitized, c| {
            sanitized.replace(c, &format!("\\{}", c))
        })
}

/// Slices the string from zero to width, and rounds to the nearest code point
/// Does not account for unicode size, as unicode characters tend to be larger.
pub fn limit_string_length(text: &str, width: usize) -> String {
    if text.len() <= width {
        return text.to_string();
    }

    let mut previous_code_point = 0;
    let mut previous_previous_code_point = 0;

    for code_point in text.char_indices().map(|(i, _)| i) {
        if code_point > width {
            return text[0..previous_previous_code_point].to_string() + "…";
        }

        previous_previous_code_point = previous_code_point;
        previous_code_point = code_point;
    }

    text.to_string()
}

/// Keeps at most `count` characters.
pub fn truncate_chars(text: &str, count: usize) -> String {
    text.chars().take(count).collect()
}

pub fn create_progress_bar(guild_id: GuildId, percent: f32) -> String {
    let length = config::progress_bar::length(guild_id);
    let marker = config::progress_bar::marker(guild_id);
    let track = config::progress_bar::track(guild_id);

    generate_marker_progress_bar(length, percent, &marker, &track)
}

fn generate_marker_progress_bar(length: usize, percent: f32, marker: &str, track: &str) -> String {
    let total_count = length as i32;
    let display_count = (length as f32 * percent) as i32;

    track.repeat(cmp::max(cmp::min(display_count, total_count - 1), 0) as usize)
        + marker
        + &track.repeat(cmp::max(total_count - display_count - 1, 0) as usize)
}

pub fn format_timestamp(duration: i64) -> String {
    let seconds = duration % 60;
    let minutes = duration / 60 % 60;
    let hours = duration / 3600;

    if hours <= 0 {
        format!("{}:{:02}", minutes, seconds)
    } else {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    }
}

pub fn parse_timestamp(timestamp: &str) -> i64 {
    timestamp.split(':').fold(0, |accum, x| {
        accum * 60 + x.parse::<i64>().unwrap_or_default()
    })
}

pub fn is_timestamp(string: &str) -> bool {
    match Regex::new("^-?[0-9]*:?[0-9]?[0-9]:[0-9][0-9]$") {
        Ok(reg) => reg.is_match(string),
        Err(_) => false,
    }
}

/// Reads a seek target given either in seconds or as `[h:]m:ss`.
pub fn parse_seek_target(text: &str) -> Option<i64> {
    let text = text.trim();

    if let Ok(seconds) = text.parse::<i64>() {
        Some(seconds)
    } else if is_timestamp(text) {
        match text.strip_prefix('-') {
            Some(positive) => Some(-parse_timestamp(positive)),
            None => Some(parse_timestamp(text)),
        }
    } else {
        None
    }
}

/// Groups digits by thousands, `1234567` becomes `1,234,567`.
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    grouped
}

pub fn page_display(page: usize, total: usize, page_size: usize, unit: &str) -> String {
    format!(
        "Page {} of {} ({} {}(s))",
        page,
        cmp::max(super::ceil(total, page_size), 1),
        total,
        unit
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    mod progress_bar {
        use super::generate_marker_progress_bar;

        #[test]
        fn start() {
            let bar = generate_marker_progress_bar(10, 0.0, "x", "-");

            assert_eq!(bar, "x---------")
        }

        #[test]
        fn end() {
            let bar = generate_marker_progress_bar(10, 1.0, "x", "-");

            assert_eq!(bar, "---------x")
        }

        #[test]
        fn middle() {
            let bar = generate_marker_progress_bar(10, 0.5, "x", "-");

            assert_eq!(bar, "-----x----")
        }
    }

    mod escape_string {
        use super::escape_string;

        #[test]
        fn escaping_string() {
            let escaped_string = escape_string("I \\ have * a _ very ~ bad ` string | here >");

            assert_eq!(
                escaped_string,
                "I \\\\ have \\* a \\_ very \\~ bad \\` string \\| here \\>"
            );
        }
    }

    mod slice_string {
        use super::{limit_string_length, truncate_chars};

        #[test]
        fn string_exact() {
            assert_eq!(
                limit_string_length("Never gonna give", 16),
                "Never gonna give"
            );
        }

        #[test]
        fn string_longer() {
            assert_eq!(limit_string_length("Never gonna give", 12), "Never gonna…");
        }

        #[test]
        fn string_unicode() {
            assert_eq!(limit_string_length("人生は意味がない", 7), "人…");
        }

        #[test]
        fn string_unicode_longer() {
            assert_eq!(limit_string_length("人生は意味がない", 25), "人生は意味がない");
        }

        #[test]
        fn truncate_counts_characters() {
            assert_eq!(truncate_chars("人生は意味がない", 3), "人生は");
            assert_eq!(truncate_chars("abc", 10), "abc");
        }
    }

    mod format_timestamp {
        use super::format_timestamp;

        #[test]
        fn seconds() {
            assert_eq!(format_timestamp(30), "0:30")
        }

        #[test]
        fn minute_seconds() {
            assert_eq!(format_timestamp(90), "1:30")
        }

        #[test]
        fn minute_near_hour() {
            assert_eq!(format_timestamp(60 * 59 + 59), "59:59")
        }

        #[test]
        fn hour() {
            assert_eq!(format_timestamp(60 * 60), "1:00:00")
        }

        #[test]
        fn hour_minutes_seconds() {
            assert_eq!(format_timestamp(60 * 60 + 60 + 59), "1:01:59")
        }
    }

    mod parse_timestamp {
        use super::*;

        #[test]
        fn parses_minutes() {
            assert_eq!(parse_timestamp("1:30"), 90);
        }

        #[test]
        fn parses_hour() {
            assert_eq!(parse_timestamp("1:01:30"), 3690);
        }

        #[test]
        fn parses_bad_string() {
            assert_eq!(parse_timestamp("hello"), 0);
        }
    }

    mod seek_target {
        use super::parse_seek_target;

        #[test]
        fn seconds() {
            assert_eq!(parse_seek_target("75"), Some(75));
        }

        #[test]
        fn timestamp() {
            assert_eq!(parse_seek_target("1:15"), Some(75));
            assert_eq!(parse_seek_target("1:00:05"), Some(3605));
        }

        #[test]
        fn negative() {
            assert_eq!(parse_seek_target("-5"), Some(-5));
            assert_eq!(parse_seek_target("-0:05"), Some(-5));
        }

        #[test]
        fn garbage() {
            assert_eq!(parse_seek_target("soon"), None);
            assert_eq!(parse_seek_target("1:5"), None);
        }
    }

    mod format_count {
        use super::format_count;

        #[test]
        fn small() {
            assert_eq!(format_count(0), "0");
            assert_eq!(format_count(999), "999");
        }

        #[test]
        fn grouped() {
            assert_eq!(format_count(1000), "1,000");
            assert_eq!(format_count(2400000000), "2,400,000,000");
        }
    }

    mod page_display {
        use super::page_display;

        #[test]
        fn rounds_up() {
            assert_eq!(page_display(1, 11, 10, "track"), "Page 1 of 2 (11 track(s))");
        }

        #[test]
        fn empty_has_one_page() {
            assert_eq!(page_display(1, 0, 10, "track"), "Page 1 of 1 (0 track(s))");
        }
    }
}
