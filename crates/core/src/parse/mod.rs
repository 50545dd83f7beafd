//! Topic title parsing.
//!
//! Tracker topic titles are free text of the approximate shape
//! `Title / Alternate / <season marker> N [<episode marker> M[-K]] / Quality`,
//! with Latin (`s05e14`) or localized (`Сезон 5 / Серии 14-14`) markers.
//! Parsing is a single anchored pattern match per title; a title that fits
//! none of the patterns is a [`ParseError`] the caller skips, never a
//! stop-the-world failure.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use thiserror::Error;

/// A raw topic title did not match any recognized shape.
#[derive(Debug, Error)]
#[error("title `{0}` has invalid format")]
pub struct ParseError(pub String);

/// One anchored title pattern with named capture groups.
///
/// Recognized groups: `title`, `alt`, `season` (required), `begin`, `end`
/// and `quality`. A missing `begin` group marks a whole-season release.
#[derive(Debug, Clone)]
pub struct TitlePattern {
    regex: Regex,
}

impl TitlePattern {
    /// Compile a pattern. Panics on an invalid expression, which is a
    /// programming error in an adapter, not an input condition.
    pub fn new(pattern: &str) -> Self {
        Self {
            regex: Regex::new(pattern).expect("invalid title pattern"),
        }
    }

    /// Try this pattern against a raw title.
    pub fn parse(&self, raw: &str) -> Option<ParsedTitle> {
        let caps = self.regex.captures(raw)?;

        let group = |name: &str| {
            caps.name(name)
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let number = |name: &str| {
            caps.name(name)
                .and_then(|m| m.as_str().parse::<u32>().ok())
        };

        let season = number("season")?;
        let begin_episode = number("begin").unwrap_or(0);
        let end_episode = number("end").unwrap_or(begin_episode);

        let title = group("title").unwrap_or_else(|| raw.trim().to_string());
        let alt_titles: Vec<String> = group("alt").into_iter().collect();

        Some(ParsedTitle::new(
            title,
            alt_titles,
            season,
            begin_episode,
            end_episode,
            group("quality"),
        ))
    }
}

/// A topic title reduced to its structured parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTitle {
    pub title: String,
    pub alt_titles: Vec<String>,
    pub season: u32,
    /// `0` marks a whole-season release with no episode marker.
    pub begin_episode: u32,
    /// Always `>= begin_episode`.
    pub end_episode: u32,
    pub quality: Option<String>,
}

impl ParsedTitle {
    pub fn new(
        title: String,
        alt_titles: Vec<String>,
        season: u32,
        begin_episode: u32,
        end_episode: u32,
        quality: Option<String>,
    ) -> Self {
        Self {
            title,
            alt_titles,
            season,
            begin_episode,
            end_episode: end_episode.max(begin_episode),
            quality,
        }
    }

    /// Whether this release covers the given episode.
    pub fn contains_episode(&self, episode: u32) -> bool {
        episode >= self.begin_episode && episode <= self.end_episode
    }

    /// Render the episode id: `s05` for a whole season, `s05e14` for a
    /// single episode, `s01e03-10` for a range.
    pub fn episode_id(&self) -> String {
        if self.begin_episode == 0 {
            format!("s{:02}", self.season)
        } else if self.end_episode <= self.begin_episode {
            format!("s{:02}e{:02}", self.season, self.begin_episode)
        } else {
            format!(
                "s{:02}e{:02}-{:02}",
                self.season, self.begin_episode, self.end_episode
            )
        }
    }
}

/// Try each pattern in order; the first match wins.
pub fn parse_title(patterns: &[TitlePattern], raw: &str) -> Result<ParsedTitle, ParseError> {
    patterns
        .iter()
        .find_map(|p| p.parse(raw))
        .ok_or_else(|| ParseError(raw.to_string()))
}

/// Built-in patterns covering the title shapes the supported sites use.
pub fn default_patterns() -> &'static [TitlePattern] {
    static PATTERNS: Lazy<Vec<TitlePattern>> = Lazy::new(|| {
        vec![
            // Slash-delimited with Latin markers:
            // `Title / Original / s02e01-02 / WEB-DLRip [note]`
            TitlePattern::new(
                r"(?i)^\s*(?P<title>[^/]*?)\s*/\s*(?P<alt>[^/]*?)\s*/\s*s(?P<season>\d+)(?:\s*e(?P<begin>\d+)(?:-(?P<end>\d+))?)?\s*/\s*(?P<quality>[^/|]*?)\s*(?:[/|].*)?$",
            ),
            // Slash-delimited with localized markers:
            // `Title / Original / Сезон 5 / Серии 14-14, HD`
            TitlePattern::new(
                r"^\s*(?P<title>[^/]*?)\s*/\s*(?P<alt>[^/]*?)\s*/\s*[Сс]езон\s*(?P<season>\d+)\s*(?:/\s*[Сс]ери[ия]\s*(?P<begin>\d+)(?:-(?P<end>\d+))?)?\s*(?:,\s*(?P<quality>[^,\]]+?)\s*)?\]?\s*$",
            ),
            // Parenthesized localized markers with trailing quality:
            // `Title (Сезон 4, Серия 1) WEBDLRip | Studio`
            TitlePattern::new(
                r"^\s*(?P<title>.*?)\s*\([Сс]езон\s+(?P<season>\d+)(?:\W+[Сс]ери[ия]\s+(?P<begin>\d+)(?:-(?P<end>\d+))?)?\)\s*(?P<quality>[^|]*?)\s*(?:\|.*)?$",
            ),
        ]
    });
    &PATTERNS
}
