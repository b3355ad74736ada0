//! The built-in sample page shown before a room has any records of its own.
//!
//! Photos point at site-relative paths (`/projects/<slug>/NN.jpg`); replace them with
//! real pictures by saving a record with the same slug.

use crate::model::{Milestone, Photo, Record};
use once_cell::sync::Lazy;

pub const DEFAULT_SLUG: &str = "project-1";

static DEFAULT_RECORDS: Lazy<Vec<Record>> = Lazy::new(|| {
    vec![Record {
        slug: DEFAULT_SLUG.to_string(),
        title: "Project 1".to_string(),
        summary: "A short description of this page goes here. Two or three lines about \
                  where you went, what happened, and why it mattered."
            .to_string(),
        tags: vec!["React".to_string(), "Next.js".to_string()],
        theme: "ocean-blue".to_string(),
        hero_image: None,
        note: Some(
            "A small album for our moments. Thank you for today, and for all the days ahead."
                .to_string(),
        ),
        story: Some(
            "Write down the air, the faces and the conversations of the day, even briefly. \
             It will feel warmer when you come back to it."
                .to_string(),
        ),
        timeline: vec![
            Milestone {
                date: "2025-08-26".to_string(),
                title: "Where we began".to_string(),
                note: Some("A connection like a small miracle".to_string()),
            },
            Milestone {
                date: "2025-12-24".to_string(),
                title: "A winter memory".to_string(),
                note: Some("A warm day".to_string()),
            },
        ],
        photos: vec![
            Photo::new("/projects/project-1/01.jpg", "Memory 1")
                .with_caption("The first place we went together")
                .with_date("2025-05-12"),
            Photo::new("/projects/project-1/02.jpg", "Memory 2")
                .with_caption("The day we could not stop laughing")
                .with_date("2025-08-03"),
            Photo::new("/projects/project-1/03.jpg", "Memory 3")
                .with_caption("A small happiness only we know")
                .with_date("2025-12-24"),
        ],
        updated_at: None,
    }]
});

/// The default dataset, lowest precedence in every merge.
pub fn default_records() -> Vec<Record> {
    DEFAULT_RECORDS.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_sample_record() {
        let records = default_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].slug, DEFAULT_SLUG);
        assert_eq!(records[0].photos.len(), 3);
        assert!(records[0].photos.iter().all(|p| !p.is_inline()));
    }
}
