use serenity::model::prelude::GuildId;

pub mod env {
    use std::env;

    pub const DISCORD_TOKEN: &str = "DISCORD_TOKEN";
    pub const GENIUS_ACCESS_TOKEN: &str = "GENIUS_ACCESS_TOKEN";
    pub const SPOTIFY_CLIENT_ID: &str = "SPOTIFY_CLIENT_ID";
    pub const SPOTIFY_CLIENT_SECRET: &str = "SPOTIFY_CLIENT_SECRET";

    const REQUIRED: [&str; 2] = [DISCORD_TOKEN, GENIUS_ACCESS_TOKEN];

    fn is_set(value: Option<String>) -> bool {
        value.map(|v| !v.trim().is_empty()).unwrap_or(false)
    }

    /// Lists the required variables that `lookup` cannot find.
    pub fn missing_variables<F>(lookup: F) -> Vec<&'static str>
    where
        F: Fn(&str) -> Option<String>,
    {
        REQUIRED
            .into_iter()
            .filter(|key| !is_set(lookup(key)))
            .collect()
    }

    pub fn validate() -> Result<(), String> {
        let missing = missing_variables(|key| env::var(key).ok());

        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!(
                "Environment variables are not set correctly, missing {}. Exiting...",
                missing.join(", ")
            ))
        }
    }

    pub fn get(key: &str) -> String {
        env::var(key).unwrap_or_default()
    }

    /// A variable the bot can run without, `None` when unset or blank.
    pub fn optional(key: &str) -> Option<String> {
        env::var(key).ok().filter(|value| !value.trim().is_empty())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn all_set() {
            assert!(missing_variables(|_| Some("token".to_string())).is_empty());
        }

        #[test]
        fn reports_missing_and_blank() {
            let missing = missing_variables(|key| match key {
                DISCORD_TOKEN => Some("  ".to_string()),
                _ => None,
            });

            assert_eq!(missing, vec![DISCORD_TOKEN, GENIUS_ACCESS_TOKEN]);
        }
    }
}

pub mod queue {
    use super::*;

    pub fn text_length(_guild_id: GuildId) -> usize {
        60
    }

    pub fn page_size(_guild_id: GuildId) -> usize {
        10
    }
}

pub mod player {
    use super::*;

    pub fn max_volume(_guild_id: GuildId) -> u8 {
        100
    }

    pub fn default_volume(guild_id: GuildId) -> u8 {
        max_volume(guild_id)
    }

    pub fn history_length(_guild_id: GuildId) -> usize {
        50
    }
}

pub mod search {
    use std::time::Duration;

    pub fn result_count() -> usize {
        10
    }

    /// How long a result menu waits for a pick
    pub fn timeout() -> Duration {
        Duration::from_secs(15)
    }

    pub fn option_length() -> usize {
        100
    }
}

pub mod spotify {
    pub fn max_tracks() -> usize {
        200
    }
}

pub mod lyrics {
    pub fn text_length() -> usize {
        1997
    }
}

pub mod progress_bar {
    use super::*;

    pub fn length(_guild_id: GuildId) -> usize {
        40
    }

    pub fn marker(_guild_id: GuildId) -> String {
        "🔘".to_string()
    }

    pub fn track(_guild_id: GuildId) -> String {
        "─".to_string()
    }
}

pub mod colors {
    use serenity::utils::Colour;

    pub fn play() -> Colour {
        Colour::DARK_GREEN
    }

    pub fn queue() -> Colour {
        Colour::DARK_GREEN
    }

    pub fn now_playing() -> Colour {
        Colour::DARK_GREEN
    }

    pub fn track_start() -> Colour {
        Colour::from_rgb(0x13, 0xf8, 0x57)
    }

    pub fn lyrics() -> Colour {
        Colour::from_rgb(0xeb, 0x74, 0x34)
    }

    pub fn saved() -> Colour {
        Colour::RED
    }

    pub fn search() -> Colour {
        Colour::RED
    }

    pub fn error() -> Colour {
        Colour::RED
    }

    pub fn warn() -> Colour {
        Colour::ORANGE
    }

    pub fn info() -> Colour {
        Colour::BLUE
    }
}
