pub mod commands;
pub mod genius;
pub mod plugin;

use std::fmt::Display;

use poise::async_trait;
use tracing::{debug, error};

/// Symbols removed from the query before it is split into search words.
const SEARCH_SYMBOLS: &str = "!\"#$%&'()*+,-./:;<=>?@[]^_`{|}~";

/// Symbols removed from the query before scoring. Unlike [`SEARCH_SYMBOLS`]
/// this keeps `-`, so hyphenated words must match as a whole.
const SCORE_SYMBOLS: &str = "!\"#$%&'()*+,./:;<=>?@[]^_`{|}~";

/// Only the best ratings get the source bonuses.
const BONUS_POOL: usize = 10;
const SOURCE_BONUS: i64 = 100;
const BONUS_SOURCES: [&str; 2] = ["Genius", "Romanization"];

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Candidate {
    pub id: u64,
    pub title: String,
    pub artists: String,
}

#[derive(Clone, PartialEq, Debug)]
pub struct MatchRating {
    pub candidate: Candidate,
    pub match_point: i64,
}

#[derive(Clone, PartialEq, Debug)]
pub struct Lyrics {
    pub title: String,
    pub url: String,
    pub thumbnail: String,
    pub text: String,
}

#[derive(Debug)]
pub enum LyricsError {
    Request(reqwest::Error),
    Status(u16),
    Parse(String),
    NoMatch,
    NotFound(String),
}

impl Display for LyricsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LyricsError::Request(err) => write!(f, "lyrics request failed: {}", err),
            LyricsError::Status(status) => write!(f, "lyrics catalog returned status {}", status),
            LyricsError::Parse(message) => write!(f, "unable to parse lyrics response: {}", message),
            LyricsError::NoMatch => write!(f, "no lyrics found"),
            LyricsError::NotFound(title) => write!(f, "no lyrics found for {}", title),
        }
    }
}

impl std::error::Error for LyricsError {}

impl From<reqwest::Error> for LyricsError {
    fn from(err: reqwest::Error) -> Self {
        LyricsError::Request(err)
    }
}

/// An external catalog of songs with lyrics.
#[async_trait]
pub trait LyricsCatalog: Send + Sync {
    /// Every hit the catalog returns for a single search word.
    async fn search(&self, word: &str) -> Result<Vec<Candidate>, LyricsError>;

    /// The full lyrics of the song best matching `title`.
    async fn lyrics(&self, title: &str) -> Result<Lyrics, LyricsError>;
}

fn split_words(query: &str, symbols: &str) -> Vec<String> {
    query
        .chars()
        .filter(|c| !symbols.contains(*c))
        .collect::<String>()
        .to_lowercase()
        .split(' ')
        .filter(|word| !word.is_empty())
        .map(|word| word.to_string())
        .collect()
}

pub fn search_words(query: &str) -> Vec<String> {
    split_words(query, SEARCH_SYMBOLS)
}

pub fn score_words(query: &str) -> Vec<String> {
    split_words(query, SCORE_SYMBOLS)
}

/// Searches every word of the query, one request at a time.
///
/// A failed request drops everything collected so far, the lookup then
/// reports no match instead of an error.
pub async fn collect_candidates<C>(catalog: &C, query: &str) -> Vec<Candidate>
where
    C: LyricsCatalog + ?Sized,
{
    let mut candidates = Vec::new();

    for word in search_words(query) {
        match catalog.search(&word).await {
            Ok(hits) => candidates.extend(hits),
            Err(err) => {
                error!("[lyrics] search for '{}' failed: {}", word, err);
                return Vec::new();
            }
        }
    }

    candidates
}

/// +1 for every query word found in the title, -1 for every one missing,
/// then the same against the artists.
pub fn score(candidate: &Candidate, query: &str) -> i64 {
    let words = score_words(query);
    let title = candidate.title.to_lowercase();
    let artists = candidate.artists.to_lowercase();

    [title, artists]
        .iter()
        .flat_map(|field| {
            words
                .iter()
                .map(move |word| if field.contains(word.as_str()) { 1 } else { -1 })
        })
        .sum()
}

/// One rating per candidate id, in order of first appearance. Repeated
/// appearances add up.
pub fn aggregate(candidates: Vec<Candidate>, query: &str) -> Vec<MatchRating> {
    let mut ratings: Vec<MatchRating> = Vec::new();

    for candidate in candidates {
        let point = score(&candidate, query);

        match ratings.iter_mut().find(|r| r.candidate.id == candidate.id) {
            Some(rating) => rating.match_point += point,
            None => ratings.push(MatchRating {
                candidate,
                match_point: point,
            }),
        }
    }

    ratings
}

fn sort_descending(ratings: &mut [MatchRating]) {
    ratings.sort_by(|a, b| b.match_point.cmp(&a.match_point));
}

/// Picks the best rating, favouring Genius transcriptions and romanizations
/// among the top of the list.
pub fn rank(mut ratings: Vec<MatchRating>) -> Option<Candidate> {
    sort_descending(&mut ratings);
    ratings.truncate(BONUS_POOL);

    for rating in ratings.iter_mut() {
        for source in BONUS_SOURCES {
            if rating.candidate.artists.contains(source) {
                rating.match_point += SOURCE_BONUS;
            }
        }
    }

    sort_descending(&mut ratings);

    ratings.into_iter().next().map(|rating| rating.candidate)
}

pub fn rank_candidates(candidates: Vec<Candidate>, query: &str) -> Option<Candidate> {
    rank(aggregate(candidates, query))
}

pub async fn rank_best_match<C>(catalog: &C, query: &str) -> Option<Candidate>
where
    C: LyricsCatalog + ?Sized,
{
    let candidates = collect_candidates(catalog, query).await;

    debug!(
        "[lyrics] {} candidate(s) collected for '{}'",
        candidates.len(),
        query
    );

    rank_candidates(candidates, query)
}

/// Looks up the lyrics of a track from its title and author.
pub async fn find_lyrics<C>(catalog: &C, title: &str, author: &str) -> Result<Lyrics, LyricsError>
where
    C: LyricsCatalog + ?Sized,
{
    let query = format!("{} {}", title, author);

    let best_match = rank_best_match(catalog, &query)
        .await
        .ok_or(LyricsError::NoMatch)?;

    catalog.lyrics(&best_match.title).await
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;

    fn candidate(id: u64, title: &str, artists: &str) -> Candidate {
        Candidate {
            id,
            title: title.to_string(),
            artists: artists.to_string(),
        }
    }

    /// In-memory catalog keyed by search word.
    #[derive(Default)]
    struct FakeCatalog {
        hits: HashMap<String, Vec<Candidate>>,
        failing: Option<String>,
        searched: Mutex<Vec<String>>,
    }

    impl FakeCatalog {
        fn with(mut self, word: &str, hits: Vec<Candidate>) -> Self {
            self.hits.insert(word.to_string(), hits);
            self
        }

        fn failing_on(mut self, word: &str) -> Self {
            self.failing = Some(word.to_string());
            self
        }
    }

    #[async_trait]
    impl LyricsCatalog for FakeCatalog {
        async fn search(&self, word: &str) -> Result<Vec<Candidate>, LyricsError> {
            self.searched.lock().unwrap().push(word.to_string());

            if self.failing.as_deref() == Some(word) {
                return Err(LyricsError::Status(500));
            }

            Ok(self.hits.get(word).cloned().unwrap_or_default())
        }

        async fn lyrics(&self, title: &str) -> Result<Lyrics, LyricsError> {
            Ok(Lyrics {
                title: title.to_string(),
                url: String::new(),
                thumbnail: String::new(),
                text: format!("lyrics of {}", title),
            })
        }
    }

    mod words {
        use super::*;

        #[test]
        fn strips_symbols_and_lowercases() {
            assert_eq!(
                search_words("Don't Stop (Me Now) - Queen!"),
                vec!["dont", "stop", "me", "now", "queen"]
            );
        }

        #[test]
        fn scoring_keeps_hyphens() {
            assert_eq!(
                score_words("Anti-Hero - Taylor Swift"),
                vec!["anti-hero", "-", "taylor", "swift"]
            );
            assert_eq!(
                search_words("Anti-Hero - Taylor Swift"),
                vec!["antihero", "taylor", "swift"]
            );
        }

        #[test]
        fn drops_empty_tokens() {
            assert_eq!(search_words("  a   b  "), vec!["a", "b"]);
            assert!(search_words("!!! ???").is_empty());
        }

        #[test]
        fn splits_only_on_spaces() {
            assert_eq!(search_words("a\tb c"), vec!["a\tb", "c"]);
        }

        #[test]
        fn keeps_unicode() {
            assert_eq!(search_words("夜に駆ける YOASOBI"), vec!["夜に駆ける", "yoasobi"]);
        }
    }

    mod scoring {
        use super::*;

        #[test]
        fn counts_hits_and_misses_per_field() {
            let c = candidate(1, "Believer by Imagine Dragons", "Imagine Dragons");

            // title: imagine +1, dragons +1, believer +1
            // artists: imagine +1, dragons +1, believer -1
            assert_eq!(score(&c, "Imagine Dragons Believer"), 4);
        }

        #[test]
        fn all_misses_go_negative() {
            let c = candidate(1, "Something Else", "Nobody");

            assert_eq!(score(&c, "Imagine Dragons Believer"), -6);
        }

        #[test]
        fn is_case_insensitive() {
            let c = candidate(1, "BELIEVER IMAGINE", "IMAGINE DRAGONS");

            assert_eq!(score(&c, "believer imagine"), 2);
        }

        #[test]
        fn ignores_word_order() {
            let c = candidate(7, "Bohemian Rhapsody by Queen", "Queen");
            let forward = score(&c, "Bohemian Rhapsody Queen live");
            let backward = score(&c, "live Queen Rhapsody Bohemian");
            let shuffled = score(&c, "Queen live Bohemian Rhapsody");

            assert_eq!(forward, backward);
            assert_eq!(forward, shuffled);
        }

        #[test]
        fn empty_query_scores_zero() {
            assert_eq!(score(&candidate(1, "a", "b"), "   "), 0);
        }
    }

    mod aggregation {
        use super::*;

        #[test]
        fn duplicates_accumulate() {
            let c = candidate(1, "Believer", "Imagine Dragons");
            let query = "Imagine Dragons Believer";
            let single = score(&c, query);

            let ratings = aggregate(vec![c.clone(), candidate(2, "x", "y"), c], query);

            assert_eq!(ratings.len(), 2);
            assert_eq!(ratings[0].candidate.id, 1);
            assert_eq!(ratings[0].match_point, single * 2);
        }

        #[test]
        fn keeps_first_appearance_order() {
            let ratings = aggregate(
                vec![candidate(3, "", ""), candidate(1, "", ""), candidate(3, "", "")],
                "q",
            );

            let ids: Vec<u64> = ratings.iter().map(|r| r.candidate.id).collect();
            assert_eq!(ids, vec![3, 1]);
        }
    }

    mod ranking {
        use super::*;

        #[test]
        fn romanization_wins() {
            let best = rank_candidates(
                vec![
                    candidate(1, "Believer", "Imagine Dragons"),
                    candidate(2, "Believer (Romanization)", "Imagine Dragons, Romanization"),
                ],
                "Imagine Dragons Believer",
            );

            assert_eq!(best.map(|c| c.id), Some(2));
        }

        #[test]
        fn genius_outranks_identical_candidate() {
            let best = rank_candidates(
                vec![
                    candidate(1, "Believer", "Imagine Dragons"),
                    candidate(2, "Believer", "Imagine Dragons Genius"),
                ],
                "Believer",
            );

            assert_eq!(best.map(|c| c.id), Some(2));
        }

        #[test]
        fn bonus_is_case_sensitive() {
            let best = rank_candidates(
                vec![
                    candidate(1, "Believer", "Imagine Dragons"),
                    candidate(2, "Believer", "genius"),
                ],
                "Believer",
            );

            assert_eq!(best.map(|c| c.id), Some(1));
        }

        #[test]
        fn both_bonuses_stack() {
            let ratings = vec![
                MatchRating {
                    candidate: candidate(1, "", ""),
                    match_point: 150,
                },
                MatchRating {
                    candidate: candidate(2, "", "Genius Romanization"),
                    match_point: 0,
                },
            ];

            assert_eq!(rank(ratings).map(|c| c.id), Some(2));
        }

        #[test]
        fn bonus_only_within_top_ten() {
            let mut ratings: Vec<MatchRating> = (0..10)
                .map(|id| MatchRating {
                    candidate: candidate(id, "", ""),
                    match_point: 10,
                })
                .collect();
            ratings.push(MatchRating {
                candidate: candidate(99, "", "Genius Romanization"),
                match_point: 9,
            });

            assert_eq!(rank(ratings).map(|c| c.id), Some(0));
        }

        #[test]
        fn ties_keep_insertion_order() {
            let best = rank_candidates(
                vec![candidate(5, "same", "same"), candidate(4, "same", "same")],
                "same",
            );

            assert_eq!(best.map(|c| c.id), Some(5));
        }

        #[test]
        fn empty_is_no_match() {
            assert_eq!(rank_candidates(Vec::new(), "anything"), None);
            assert_eq!(rank(Vec::new()), None);
        }

        #[test]
        fn selection_comes_from_input() {
            let input = vec![
                candidate(1, "Numb", "Linkin Park"),
                candidate(2, "Numb (Romanization)", "Genius Romanization"),
                candidate(3, "In the End", "Linkin Park"),
            ];

            let best = rank_candidates(input.clone(), "Numb Linkin Park");

            assert!(best.map(|c| input.contains(&c)).unwrap_or(false));
        }
    }

    mod lookup {
        use super::*;

        #[tokio::test]
        async fn searches_words_in_order() {
            let catalog = FakeCatalog::default();

            rank_best_match(&catalog, "Imagine Dragons - Believer").await;

            assert_eq!(
                *catalog.searched.lock().unwrap(),
                vec!["imagine", "dragons", "believer"]
            );
        }

        #[tokio::test]
        async fn accumulates_across_words() {
            let catalog = FakeCatalog::default()
                .with("believer", vec![candidate(1, "Believer", "Imagine Dragons")])
                .with(
                    "imagine",
                    vec![
                        candidate(1, "Believer", "Imagine Dragons"),
                        candidate(2, "Imagine", "John Lennon"),
                    ],
                );

            let best = rank_best_match(&catalog, "Imagine Dragons Believer").await;

            assert_eq!(best.map(|c| c.id), Some(1));
        }

        #[tokio::test]
        async fn failure_yields_no_match() {
            let catalog = FakeCatalog::default()
                .with("believer", vec![candidate(1, "Believer", "Imagine Dragons")])
                .failing_on("dragons");

            assert!(collect_candidates(&catalog, "Believer Dragons").await.is_empty());
            assert_eq!(rank_best_match(&catalog, "Believer Dragons").await, None);
        }

        #[tokio::test]
        async fn failure_stops_searching() {
            let catalog = FakeCatalog::default().failing_on("a");

            collect_candidates(&catalog, "a b c").await;

            assert_eq!(*catalog.searched.lock().unwrap(), vec!["a"]);
        }

        #[tokio::test]
        async fn finds_lyrics_of_best_match() {
            let catalog = FakeCatalog::default().with(
                "believer",
                vec![
                    candidate(1, "Believer by Imagine Dragons", "Imagine Dragons"),
                    candidate(2, "Believer (Romanization)", "Genius Romanization"),
                ],
            );

            let lyrics = find_lyrics(&catalog, "Believer", "").await.unwrap();

            assert_eq!(lyrics.title, "Believer (Romanization)");
        }

        #[tokio::test]
        async fn no_candidates_is_no_match() {
            let catalog = FakeCatalog::default();

            let result = find_lyrics(&catalog, "Believer", "Imagine Dragons").await;

            assert!(matches!(result, Err(LyricsError::NoMatch)));
        }
    }
}
