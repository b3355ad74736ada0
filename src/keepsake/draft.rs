//! Edit sessions over a record.
//!
//! A [`Draft`] holds an untouched copy of the record it started from, so a cancelled
//! edit costs nothing and nothing is persisted until the caller saves the result of
//! [`Draft::finish`].

use crate::error::{Result, ValidationError};
use crate::model::{Photo, Record, PLACEHOLDER_ALT};
use chrono::Local;

/// Caption given to freshly added photos.
pub const NEW_PHOTO_CAPTION: &str = "New memory";

#[derive(Debug, Clone)]
pub struct Draft {
    original: Record,
    current: Record,
}

impl Draft {
    pub fn begin(record: &Record) -> Self {
        Self {
            original: record.clone(),
            current: record.clone(),
        }
    }

    pub fn record(&self) -> &Record {
        &self.current
    }

    pub fn is_dirty(&self) -> bool {
        self.original != self.current
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.current.title = title.into();
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.current.summary = summary.into();
    }

    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.current.tags = tags;
    }

    pub fn set_note(&mut self, note: Option<String>) {
        self.current.note = note;
    }

    pub fn set_story(&mut self, story: Option<String>) {
        self.current.story = story;
    }

    pub fn set_theme(&mut self, theme: impl Into<String>) {
        self.current.theme = theme.into();
    }

    pub fn set_hero_image(&mut self, hero: Option<String>) {
        self.current.hero_image = hero;
    }

    /// Prepend photos, newest batch first, dated today.
    pub fn add_photos(&mut self, sources: Vec<String>) {
        let today = Local::now().format("%Y-%m-%d").to_string();
        let added: Vec<Photo> = sources
            .into_iter()
            .map(|src| {
                Photo::new(src, PLACEHOLDER_ALT)
                    .with_caption(NEW_PHOTO_CAPTION)
                    .with_date(today.clone())
            })
            .collect();
        self.current.photos.splice(0..0, added);
    }

    pub fn remove_photo(&mut self, index: usize) -> Result<Photo> {
        self.check_index(index)?;
        Ok(self.current.photos.remove(index))
    }

    /// Move the photo at `from` so it ends up at position `to`.
    pub fn move_photo(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        let photo = self.current.photos.remove(from);
        self.current.photos.insert(to, photo);
        Ok(())
    }

    pub fn set_caption(&mut self, index: usize, caption: Option<String>) -> Result<()> {
        self.check_index(index)?;
        self.current.photos[index].caption = caption;
        Ok(())
    }

    pub fn set_date(&mut self, index: usize, date: Option<String>) -> Result<()> {
        self.check_index(index)?;
        self.current.photos[index].date = date;
        Ok(())
    }

    /// The edited record, normalized for saving.
    pub fn finish(self) -> Record {
        self.current.normalized()
    }

    /// Discard the edits and return the record as it was.
    pub fn cancel(self) -> Record {
        self.original
    }

    fn check_index(&self, index: usize) -> Result<()> {
        let len = self.current.photos.len();
        if index >= len {
            return Err(ValidationError::PhotoIndex { index, len }.into());
        }
        Ok(())
    }
}
