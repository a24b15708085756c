//! Parsing of a single guide source file: the publish date and slug encoded
//! in its file name, the YAML front matter at the top of the file, the
//! excerpt, and the summary before the truncate marker. Nothing in here
//! touches the filesystem; see [`crate::indexer`] for that.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use pulldown_cmark::{Event, Parser as MarkdownParser};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::post::TagRef;

/// `YYYY-M-D-{slug}.md` or `.mdx`; date segments need not be zero-padded.
static FILENAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})-?(.*?)\.mdx?$").expect("valid file name pattern")
});

static SOURCE_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.mdx?$").expect("valid extension pattern"));

const FENCE: &str = "---";

/// The recognized front-matter fields. Unknown fields are ignored.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Frontmatter {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub date: Option<String>,

    #[serde(default)]
    pub tags: Vec<TagRef>,
}

/// Everything that can be learned about a guide from its file name and
/// contents alone.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedGuide {
    /// The front-matter date if present, else the file-name date. `None`
    /// means the caller must fall back to the file's creation time.
    pub date: Option<DateTime<Utc>>,

    /// The slug from the file name, or the file stem if the name doesn't
    /// carry a date.
    pub slug: String,

    /// The front-matter title, or the slug.
    pub title: String,

    /// The explicit front-matter id, if any.
    pub explicit_id: Option<String>,

    /// The front-matter description, or the excerpt.
    pub description: String,

    pub tags: Vec<TagRef>,

    /// The body before the truncate marker.
    pub summary: String,

    /// Whether a truncate marker was found.
    pub truncated: bool,
}

impl ParsedGuide {
    /// The post identifier: the explicit `id`, or else the title.
    pub fn id(&self) -> &str {
        self.explicit_id.as_deref().unwrap_or(&self.title)
    }
}

/// Extracts the date and slug from a file name of the form
/// `YYYY-M-D-{slug}.md`. Returns `None` if the name doesn't match or the
/// date isn't a real calendar date.
pub fn parse_file_name(file_name: &str) -> Option<(DateTime<Utc>, &str)> {
    let captures = FILENAME_PATTERN.captures(file_name)?;
    let year: i32 = captures[1].parse().ok()?;
    let month: u32 = captures[2].parse().ok()?;
    let day: u32 = captures[3].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)?;
    let slug = captures.get(4).map_or("", |m| m.as_str());
    Some((Utc.from_utc_datetime(&date), slug))
}

/// Parses a front-matter date. Accepts RFC 3339 timestamps, date-times
/// without an offset (taken as UTC), and bare dates (midnight UTC).
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(input) {
        return Some(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(date) = NaiveDateTime::parse_from_str(input, format) {
            return Some(Utc.from_utc_datetime(&date));
        }
    }
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

/// Splits `input` into its front matter and body. A file that doesn't start
/// with a `---` fence has no front matter; a fence that is never closed is an
/// error.
pub fn split_frontmatter(input: &str) -> Result<(Frontmatter, &str)> {
    let input = input.trim_start_matches('\u{feff}');
    if !input.starts_with(FENCE) {
        return Ok((Frontmatter::default(), input));
    }

    let yaml_start = FENCE.len();
    let offset = input[yaml_start..]
        .find(&format!("\n{}", FENCE))
        .ok_or(Error::FrontmatterMissingEndFence)?;
    let yaml_stop = yaml_start + offset;
    let body_start = yaml_stop + 1 + FENCE.len();

    let yaml = &input[yaml_start..yaml_stop];
    let frontmatter = if yaml.trim().is_empty() {
        Frontmatter::default()
    } else {
        serde_yaml::from_str(yaml)?
    };
    Ok((frontmatter, &input[body_start..]))
}

/// The first line of the trimmed body, with markdown syntax stripped.
pub fn excerpt(body: &str) -> String {
    let line = body.trim().lines().next().unwrap_or_default();
    let mut text = String::new();
    for event in MarkdownParser::new(line) {
        match event {
            Event::Text(s) | Event::Code(s) => text.push_str(&s),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

/// Returns the part of `body` before the first match of `marker`, and
/// whether there was a match.
pub fn truncate<'a>(body: &'a str, marker: &Regex) -> (&'a str, bool) {
    match marker.find(body) {
        Some(m) => (&body[..m.start()], true),
        None => (body, false),
    }
}

/// Parses a guide from its file name and contents. See [`ParsedGuide`] for
/// the precedence of each field.
pub fn parse_guide(file_name: &str, contents: &str, truncate_marker: &Regex) -> Result<ParsedGuide> {
    let (frontmatter, body) = split_frontmatter(contents)?;

    let (mut date, slug) = match parse_file_name(file_name) {
        Some((date, slug)) => (Some(date), slug.to_owned()),
        None => (None, SOURCE_EXTENSION.replace(file_name, "").into_owned()),
    };
    if let Some(raw) = &frontmatter.date {
        date = Some(parse_date(raw).ok_or_else(|| Error::InvalidDate(raw.clone()))?);
    }

    let (summary, truncated) = truncate(body, truncate_marker);
    Ok(ParsedGuide {
        date,
        title: frontmatter.title.unwrap_or_else(|| slug.clone()),
        slug,
        explicit_id: frontmatter.id,
        description: frontmatter.description.unwrap_or_else(|| excerpt(body)),
        tags: frontmatter.tags,
        summary: summary.to_owned(),
        truncated,
    })
}

/// Represents the result of a guide-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a guide.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the starting fence (`---`) was found but the ending one
    /// was missing.
    #[error("missing closing `---`")]
    FrontmatterMissingEndFence,

    #[error(transparent)]
    DeserializeYaml(#[from] serde_yaml::Error),

    #[error("invalid date `{0}`")]
    InvalidDate(String),
}
