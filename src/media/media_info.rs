use serde::{Deserialize, Serialize};

#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub title: String,

    /// Seconds
    #[serde(default)]
    pub duration: i64,

    #[serde(default)]
    pub thumbnail: String,

    #[serde(default)]
    pub uploader: String,

    #[serde(default)]
    pub view_count: Option<u64>,

    #[serde(default)]
    pub playlist: Option<PlaylistInfo>,
}

impl MediaInfo {
    pub fn uploader_or_unknown(&self) -> &str {
        if self.uploader.is_empty() {
            "unknown"
        } else {
            &self.uploader
        }
    }
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct PlaylistInfo {
    pub title: String,
    pub uploader: String,
}
