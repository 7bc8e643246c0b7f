use poise::async_trait;
use regex::Regex;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use tracing::{info, warn};

use super::{Candidate, Lyrics, LyricsCatalog, LyricsError};

const API_URL: &str = "https://api.genius.com";
const USER_AGENT: &str = concat!("canto/", env!("CARGO_PKG_VERSION"));
const CONTAINER_MARKER: &str = "data-lyrics-container=\"true\"";

#[derive(Deserialize)]
struct GeniusSearchJson {
    response: GeniusHitsJson,
}

#[derive(Deserialize)]
struct GeniusHitsJson {
    #[serde(default)]
    hits: Vec<GeniusHitJson>,
}

#[derive(Deserialize)]
struct GeniusHitJson {
    result: GeniusSongJson,
}

#[derive(Clone, Deserialize)]
struct GeniusSongJson {
    id: u64,
    #[serde(default)]
    full_title: String,
    #[serde(default)]
    artist_names: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    song_art_image_thumbnail_url: String,
}

impl From<GeniusSongJson> for Candidate {
    fn from(json: GeniusSongJson) -> Self {
        Candidate {
            id: json.id,
            title: json.full_title,
            artists: json.artist_names,
        }
    }
}

pub struct GeniusClient {
    access_token: String,
    http: Client,
}

impl GeniusClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        GeniusClient {
            access_token: access_token.into(),
            http: Client::new(),
        }
    }

    async fn search_songs(&self, query: &str) -> Result<Vec<GeniusSongJson>, LyricsError> {
        let response = self
            .http
            .get(format!("{}/search", API_URL))
            .query(&[("q", query)])
            .bearer_auth(&self.access_token)
            .header(header::USER_AGENT, USER_AGENT)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(LyricsError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;

        parse_search(&body)
    }

    async fn download_page(&self, url: &str) -> Result<String, LyricsError> {
        let response = self
            .http
            .get(url)
            .header(header::USER_AGENT, USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LyricsError::Status(response.status().as_u16()));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl LyricsCatalog for GeniusClient {
    async fn search(&self, word: &str) -> Result<Vec<Candidate>, LyricsError> {
        Ok(self
            .search_songs(word)
            .await?
            .into_iter()
            .map(Candidate::from)
            .collect())
    }

    async fn lyrics(&self, title: &str) -> Result<Lyrics, LyricsError> {
        let song = match self.search_songs(title).await?.into_iter().next() {
            Some(song) => song,
            None => return Err(LyricsError::NotFound(title.to_string())),
        };

        info!("[genius] fetching lyrics page {}", song.url);

        let page = self.download_page(&song.url).await?;

        match extract_lyrics(&page) {
            Some(text) => Ok(Lyrics {
                title: song.full_title,
                url: song.url,
                thumbnail: song.song_art_image_thumbnail_url,
                text,
            }),
            None => {
                warn!("[genius] no lyrics container on {}", song.url);
                Err(LyricsError::NotFound(title.to_string()))
            }
        }
    }
}

fn parse_search(body: &str) -> Result<Vec<GeniusSongJson>, LyricsError> {
    match serde_json::from_str::<GeniusSearchJson>(body) {
        Ok(json) => Ok(json.response.hits.into_iter().map(|h| h.result).collect()),
        Err(err) => Err(LyricsError::Parse(err.to_string())),
    }
}

/// Offset of the first `tag` in `html` that is not the prefix of a longer
/// tag name, so `<div` skips `<divider>`.
fn find_tag(html: &str, tag: &str) -> Option<usize> {
    html.match_indices(tag)
        .map(|(index, _)| index)
        .find(|index| {
            html[index + tag.len()..]
                .chars()
                .next()
                .map(|c| c.is_whitespace() || c == '>' || c == '/')
                .unwrap_or(false)
        })
}

/// Inner html of the `<div>` whose opening tag ends right before `start`.
fn div_contents(html: &str, start: usize) -> &str {
    let mut depth = 1;
    let mut cursor = start;

    while depth > 0 {
        let rest = &html[cursor..];
        let open = find_tag(rest, "<div");
        let close = match find_tag(rest, "</div") {
            Some(close) => close,
            None => return &html[start..],
        };

        match open {
            Some(open) if open < close => {
                depth += 1;
                cursor += open + "<div".len();
            }
            _ => {
                depth -= 1;
                if depth == 0 {
                    return &html[start..cursor + close];
                }
                cursor += close + "</div".len();
            }
        }
    }

    &html[start..cursor]
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Pulls the lyrics text out of a Genius song page.
pub fn extract_lyrics(html: &str) -> Option<String> {
    let line_break = Regex::new(r"<br\s*/?>").ok()?;
    let tag = Regex::new(r"<[^>]*>").ok()?;

    let mut blocks = Vec::new();
    let mut cursor = 0;

    while let Some(marker) = html[cursor..].find(CONTAINER_MARKER) {
        let marker = cursor + marker;
        let start = match html[marker..].find('>') {
            Some(end_of_tag) => marker + end_of_tag + 1,
            None => break,
        };

        let inner = div_contents(html, start);
        cursor = start + inner.len();

        let text = line_break.replace_all(inner, "\n");
        let text = tag.replace_all(&text, "");
        blocks.push(decode_entities(&text));
    }

    let lyrics = blocks.join("\n").trim().to_string();

    if lyrics.is_empty() {
        None
    } else {
        Some(lyrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod search {
        use super::*;

        #[test]
        fn parses_hits() {
            let body = r#"{
                "meta": { "status": 200 },
                "response": {
                    "hits": [
                        {
                            "type": "song",
                            "result": {
                                "id": 2925288,
                                "full_title": "Believer by Imagine Dragons",
                                "artist_names": "Imagine Dragons",
                                "url": "https://genius.com/Imagine-dragons-believer-lyrics",
                                "song_art_image_thumbnail_url": "https://images.genius.com/a.jpg"
                            }
                        },
                        {
                            "type": "song",
                            "result": { "id": 7, "full_title": "Believer (Romanization)" }
                        }
                    ]
                }
            }"#;

            let songs = parse_search(body).unwrap();
            let candidates: Vec<Candidate> = songs.into_iter().map(Candidate::from).collect();

            assert_eq!(candidates.len(), 2);
            assert_eq!(candidates[0].id, 2925288);
            assert_eq!(candidates[0].title, "Believer by Imagine Dragons");
            assert_eq!(candidates[0].artists, "Imagine Dragons");
            assert_eq!(candidates[1].artists, "");
        }

        #[test]
        fn no_hits() {
            let songs = parse_search(r#"{ "response": { "hits": [] } }"#).unwrap();

            assert!(songs.is_empty());
        }

        #[test]
        fn rejects_garbage() {
            assert!(matches!(
                parse_search("<html>rate limited</html>"),
                Err(LyricsError::Parse(_))
            ));
        }
    }

    mod extract {
        use super::extract_lyrics;

        #[test]
        fn single_container() {
            let html = r#"<html><body><div id="x"><div data-lyrics-container="true" class="Lyrics">[Verse 1]<br/>First things first<br>I&#x27;ma say all the words</div></div></body></html>"#;

            assert_eq!(
                extract_lyrics(html).unwrap(),
                "[Verse 1]\nFirst things first\nI'ma say all the words"
            );
        }

        #[test]
        fn nested_tags() {
            let html = r#"<div data-lyrics-container="true"><a href="/x"><span>Second thing second</span></a><br/><div class="ad"><i>Don&#x27;t</i> you</div> tell me</div><div>footer</div>"#;

            assert_eq!(
                extract_lyrics(html).unwrap(),
                "Second thing second\nDon't you tell me"
            );
        }

        #[test]
        fn longer_tag_names() {
            let html = r#"<div data-lyrics-container="true">Hold on<divider/><br/>let go</div><div>footer</div>"#;

            assert_eq!(extract_lyrics(html).unwrap(), "Hold on\nlet go");
        }

        #[test]
        fn joins_containers() {
            let html = r#"<div data-lyrics-container="true">one &amp; two</div><p>ad</p><div data-lyrics-container="true">three</div>"#;

            assert_eq!(extract_lyrics(html).unwrap(), "one & two\nthree");
        }

        #[test]
        fn missing_container() {
            assert_eq!(extract_lyrics("<html><div>no lyrics</div></html>"), None);
        }

        #[test]
        fn empty_container() {
            assert_eq!(
                extract_lyrics(r#"<div data-lyrics-container="true"> </div>"#),
                None
            );
        }
    }
}
