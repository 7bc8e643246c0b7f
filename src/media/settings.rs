/// A boolean switch of the music player, changed with `/settings`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Setting {
    AnnounceRepeats,
    LeaveOnEnd,
    LeaveOnEmpty,
    SelfDeaf,
}

impl Setting {
    pub const ALL: [Setting; 4] = [
        Setting::AnnounceRepeats,
        Setting::LeaveOnEnd,
        Setting::LeaveOnEmpty,
        Setting::SelfDeaf,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Setting::AnnounceRepeats => "announce_repeats",
            Setting::LeaveOnEnd => "leave_on_end",
            Setting::LeaveOnEmpty => "leave_on_empty",
            Setting::SelfDeaf => "self_deaf",
        }
    }

    pub fn parse(name: &str) -> Option<Setting> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|setting| setting.name().eq_ignore_ascii_case(name))
    }
}

/// Read by a guild's player when it starts, so changes apply from the next
/// join or `/restart`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PlayerSettings {
    /// Post "Started playing" again for every repeat of a looped track.
    pub announce_repeats: bool,
    /// Leave voice once the queue has played out.
    pub leave_on_end: bool,
    /// Leave voice instead of pausing when everyone else left the channel.
    pub leave_on_empty: bool,
    pub self_deaf: bool,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        PlayerSettings {
            announce_repeats: false,
            leave_on_end: false,
            leave_on_empty: false,
            self_deaf: true,
        }
    }
}

impl PlayerSettings {
    pub fn get(&self, setting: Setting) -> bool {
        match setting {
            Setting::AnnounceRepeats => self.announce_repeats,
            Setting::LeaveOnEnd => self.leave_on_end,
            Setting::LeaveOnEmpty => self.leave_on_empty,
            Setting::SelfDeaf => self.self_deaf,
        }
    }

    /// Flips `setting` and returns its new value.
    pub fn toggle(&mut self, setting: Setting) -> bool {
        let value = match setting {
            Setting::AnnounceRepeats => &mut self.announce_repeats,
            Setting::LeaveOnEnd => &mut self.leave_on_end,
            Setting::LeaveOnEmpty => &mut self.leave_on_empty,
            Setting::SelfDeaf => &mut self.self_deaf,
        };
        *value = !*value;

        *value
    }

    /// Autocomplete entries for the settings whose name starts with `partial`.
    pub fn choices(&self, partial: &str) -> Vec<(String, &'static str)> {
        let partial = partial.trim().to_lowercase();

        Setting::ALL
            .into_iter()
            .filter(|setting| setting.name().starts_with(&partial))
            .map(|setting| {
                (
                    format!("{} - currently {}", setting.name(), self.get(setting)),
                    setting.name(),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = PlayerSettings::default();

        assert!(!settings.announce_repeats);
        assert!(!settings.leave_on_end);
        assert!(!settings.leave_on_empty);
        assert!(settings.self_deaf);
    }

    #[test]
    fn toggle_flips_one_setting() {
        let mut settings = PlayerSettings::default();

        assert!(settings.toggle(Setting::LeaveOnEnd));
        assert!(settings.get(Setting::LeaveOnEnd));
        assert!(!settings.toggle(Setting::LeaveOnEnd));
        assert_eq!(settings, PlayerSettings::default());

        assert!(!settings.toggle(Setting::SelfDeaf));
        assert!(!settings.self_deaf);
    }

    #[test]
    fn parse_names() {
        for setting in Setting::ALL {
            assert_eq!(Setting::parse(setting.name()), Some(setting));
        }
        assert_eq!(Setting::parse(" LEAVE_ON_EMPTY "), Some(Setting::LeaveOnEmpty));
        assert_eq!(Setting::parse("volume"), None);
    }

    #[test]
    fn choices_show_current_value() {
        let mut settings = PlayerSettings::default();
        settings.toggle(Setting::LeaveOnEmpty);

        assert_eq!(
            settings.choices("leave"),
            vec![
                ("leave_on_end - currently false".to_string(), "leave_on_end"),
                ("leave_on_empty - currently true".to_string(), "leave_on_empty"),
            ]
        );
        assert_eq!(settings.choices("").len(), Setting::ALL.len());
        assert!(settings.choices("xyz").is_empty());
    }
}
