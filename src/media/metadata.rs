use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::error;

use super::media_info::{MediaInfo, PlaylistInfo};

const YT_DLP: &str = "yt-dlp";

#[derive(Serialize, Deserialize)]
struct YoutubeDLJson {
    title: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    webpage_url: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    view_count: Option<u64>,
    // playlist
    playlist_title: Option<String>,
    playlist_uploader: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct YoutubeDLFlatJson {
    ie_key: Option<String>,
    id: Option<String>,
    url: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
    channel: Option<String>,
    view_count: Option<u64>,
}

impl From<YoutubeDLJson> for MediaInfo {
    fn from(json: YoutubeDLJson) -> Self {
        MediaInfo {
            url: json.webpage_url.unwrap_or_default(),
            title: json.title.unwrap_or_default(),
            duration: json.duration.unwrap_or_default() as i64,
            thumbnail: json.thumbnail.unwrap_or_default(),
            uploader: json.uploader.or(json.channel).unwrap_or_default(),
            view_count: json.view_count,
            playlist: json.playlist_title.map(|title| PlaylistInfo {
                title,
                uploader: json.playlist_uploader.unwrap_or_default(),
            }),
        }
    }
}

impl From<YoutubeDLFlatJson> for MediaInfo {
    fn from(json: YoutubeDLFlatJson) -> Self {
        let url = match (json.ie_key.as_deref(), json.id) {
            (Some("Youtube"), Some(id)) => format!("https://www.youtube.com/watch?v={}", id),
            _ => json.url.unwrap_or_default(),
        };

        MediaInfo {
            url,
            title: json.title.unwrap_or_default(),
            duration: json.duration.unwrap_or_default() as i64,
            uploader: json.uploader.or(json.channel).unwrap_or_default(),
            view_count: json.view_count,
            ..MediaInfo::default()
        }
    }
}

async fn run_yt_dlp(args: &[&str]) -> Result<String, String> {
    let output = match Command::new(YT_DLP).args(args).output().await {
        Ok(output) => output,
        Err(err) => {
            error!("[metadata] unable to run {}: {}", YT_DLP, err);
            return Err("Failed to run yt-dlp".to_string());
        }
    };

    let err_str = String::from_utf8_lossy(&output.stderr);
    if !err_str.is_empty() {
        error!("[metadata] [yt-dlp] {}", err_str);
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn parse_info(line: &str) -> Result<MediaInfo, String> {
    match serde_json::from_str::<YoutubeDLJson>(line) {
        Ok(json) => {
            if json.webpage_url.is_none() {
                return Err("yt-dlp returned no URL".to_string());
            }

            Ok(MediaInfo::from(json))
        }
        Err(err) => {
            error!("[metadata] [yt-dlp] {}", err);
            Err("Unable to parse json".to_string())
        }
    }
}

fn parse_flat_playlist(output: &str) -> Vec<MediaInfo> {
    output
        .lines()
        .filter(|line| !line.is_empty())
        .filter_map(
            |line| match serde_json::from_str::<YoutubeDLFlatJson>(line) {
                Ok(json) => Some(MediaInfo::from(json)),
                Err(err) => {
                    error!("[playlist] {}", err);
                    None
                }
            },
        )
        .collect()
}

pub async fn get_info(url: &str) -> Result<MediaInfo, String> {
    let output = run_yt_dlp(&["-j", "--no-playlist", url]).await?;

    parse_info(output.lines().next().unwrap_or_default())
}

pub async fn get_search(query: &str) -> Result<MediaInfo, String> {
    get_info(&format!("ytsearch:{}", query)).await
}

fn search_query(query: &str, limit: usize) -> String {
    format!("ytsearch{}:{}", limit, query.trim())
}

/// Flat metadata for the first `limit` search hits.
pub async fn search(query: &str, limit: usize) -> Result<Vec<MediaInfo>, String> {
    let output = run_yt_dlp(&["-j", "--flat-playlist", &search_query(query, limit)]).await?;

    Ok(parse_flat_playlist(&output)
        .into_iter()
        .filter(|info| !info.url.is_empty())
        .take(limit)
        .collect())
}

/// Full metadata for the first entry, flat metadata for the rest.
pub async fn get_playlist(url: &str) -> Result<Vec<MediaInfo>, String> {
    let first = get_info_in_playlist(url).await?;
    let output = run_yt_dlp(&["-j", "--flat-playlist", url]).await?;

    let mut infos = vec![first];
    infos.extend(parse_flat_playlist(&output).into_iter().skip(1));

    Ok(infos)
}

async fn get_info_in_playlist(url: &str) -> Result<MediaInfo, String> {
    let output = run_yt_dlp(&["-j", "--playlist-end=1", url]).await?;

    parse_info(output.lines().next().unwrap_or_default())
}

pub fn is_playlist(url: &str) -> bool {
    url.contains("youtube.com") && (url.contains("/playlist?list=") || url.contains("&list="))
}

/// Turns a query, url or playlist url into the tracks to queue.
pub async fn resolve(query: &str, allow_playlists: bool) -> Result<Vec<MediaInfo>, String> {
    if allow_playlists && is_playlist(query) {
        let infos = get_playlist(query).await?;

        if infos.is_empty() {
            return Err("Playlist is empty!".to_string());
        }

        Ok(infos)
    } else if query.starts_with("http") {
        Ok(vec![get_info(query).await?])
    } else {
        Ok(vec![get_search(query).await?])
    }
}
