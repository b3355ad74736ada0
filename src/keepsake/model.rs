use crate::error::{Result, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Image reference substituted when a record would otherwise be saved without photos.
pub const PLACEHOLDER_SRC: &str = "/projects/placeholder.jpg";
pub const PLACEHOLDER_ALT: &str = "Memory";

const DEFAULT_TITLE: &str = "New memory";
const DEFAULT_SUMMARY: &str = "A page for our precious memories";

/// Gradient themes offered for new records, in presentation order.
pub const THEMES: [&str; 4] = ["rose-pink", "pink-violet", "violet-fuchsia", "amber-rose"];

/// The shared secret two people use to see the same album.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Trims the input; an empty code is rejected.
    pub fn parse(input: &str) -> Result<Self> {
        let code = input.trim();
        if code.is_empty() {
            return Err(ValidationError::EmptyRoomCode.into());
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One photo on a memory page. Its sort position is its index in [`Record::photos`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub src: String,
    pub alt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl Photo {
    pub fn new(src: impl Into<String>, alt: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            alt: alt.into(),
            caption: None,
            date: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER_SRC, PLACEHOLDER_ALT)
    }

    pub fn is_inline(&self) -> bool {
        is_inline_uri(&self.src)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub date: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A memory page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub slug: String,
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub theme: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story: Option<String>,
    // Never sent to the backend; only local and default records carry a timeline.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub timeline: Vec<Milestone>,
    #[serde(default)]
    pub photos: Vec<Photo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Record {
    pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
            summary: String::new(),
            tags: Vec::new(),
            theme: THEMES[0].to_string(),
            hero_image: None,
            note: None,
            story: None,
            timeline: Vec::new(),
            photos: Vec::new(),
            updated_at: None,
        }
    }

    /// Cleans user input the way a save expects it: trimmed text, no empty tags,
    /// no photos without a source, and at least one photo.
    pub fn normalized(mut self) -> Self {
        self.title = non_empty(&self.title).unwrap_or_else(|| DEFAULT_TITLE.to_string());
        self.summary = non_empty(&self.summary).unwrap_or_else(|| DEFAULT_SUMMARY.to_string());
        self.tags = self.tags.iter().filter_map(|t| non_empty(t)).collect();
        self.hero_image = self.hero_image.as_deref().and_then(non_empty);
        self.note = self.note.as_deref().and_then(non_empty);
        self.story = self.story.as_deref().and_then(non_empty);

        self.photos = self
            .photos
            .into_iter()
            .enumerate()
            .map(|(i, p)| Photo {
                src: p.src.trim().to_string(),
                alt: non_empty(&p.alt).unwrap_or_else(|| format!("{} {}", PLACEHOLDER_ALT, i + 1)),
                caption: p.caption.as_deref().and_then(non_empty),
                date: p.date.as_deref().and_then(non_empty),
            })
            .filter(|p| !p.src.is_empty())
            .collect();

        if self.photos.is_empty() {
            self.photos.push(Photo::placeholder());
        }
        self
    }
}

/// True for `data:` URIs, whose payload lives inside the reference itself.
pub fn is_inline_uri(src: &str) -> bool {
    src.starts_with("data:")
}

/// Splits a comma-separated tag list.
pub fn parse_tags(input: &str) -> Vec<String> {
    input.split(',').filter_map(non_empty).collect()
}

/// Derives a URL-friendly slug from a title. Characters outside `[a-z0-9]` are
/// dropped, so titles in other scripts fall back to a timestamped slug.
pub fn slugify(input: &str) -> String {
    let lowered: String = input
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| *c != '\'' && *c != '"')
        .collect();

    let mut slug = String::with_capacity(lowered.len());
    for ch in lowered.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            slug.push(ch);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');

    if slug.is_empty() {
        format!("memory-{}", Utc::now().timestamp_millis())
    } else {
        slug.to_string()
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_code_is_trimmed() {
        let code = RoomCode::parse("  abc-2026 ").unwrap();
        assert_eq!(code.as_str(), "abc-2026");
    }

    #[test]
    fn room_code_rejects_blank() {
        assert!(RoomCode::parse("   ").is_err());
    }

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Our First Trip!"), "our-first-trip");
        assert_eq!(slugify("  Jeju -- 2026  "), "jeju-2026");
        assert_eq!(slugify("Bob's \"Place\""), "bobs-place");
    }

    #[test]
    fn slugify_falls_back_for_non_ascii() {
        let slug = slugify("우리의 여행");
        assert!(slug.starts_with("memory-"), "got {}", slug);
    }

    #[test]
    fn parse_tags_trims_and_drops_empty() {
        assert_eq!(parse_tags(" trip, , date ,"), vec!["trip", "date"]);
    }

    #[test]
    fn normalized_substitutes_placeholder() {
        let record = Record::new("trip", "Trip").normalized();
        assert_eq!(record.photos, vec![Photo::placeholder()]);
        assert_eq!(record.summary, DEFAULT_SUMMARY);
    }

    #[test]
    fn normalized_cleans_photos() {
        let mut record = Record::new("trip", "  ");
        record.photos = vec![
            Photo::new("  ", "skip me"),
            Photo::new(" https://cdn/a.jpg ", "").with_caption("  "),
            Photo::new("https://cdn/b.jpg", "B").with_date("2026-01-15"),
        ];

        let record = record.normalized();
        assert_eq!(record.title, DEFAULT_TITLE);
        assert_eq!(record.photos.len(), 2);
        assert_eq!(record.photos[0].src, "https://cdn/a.jpg");
        assert_eq!(record.photos[0].alt, "Memory 2");
        assert_eq!(record.photos[0].caption, None);
        assert_eq!(record.photos[1].date.as_deref(), Some("2026-01-15"));
    }

    #[test]
    fn inline_detection() {
        assert!(is_inline_uri("data:image/png;base64,AAAA"));
        assert!(!is_inline_uri("https://cdn/a.jpg"));
        assert!(!is_inline_uri("/projects/a.jpg"));
    }
}
