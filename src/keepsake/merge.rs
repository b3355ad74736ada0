//! # Merge Resolver
//!
//! Combines the three record sources into the collection a UI shows.
//!
//! ## Precedence
//!
//! 1. Local cache records, in stored order.
//! 2. Remote records, in fetch order, for slugs not already present.
//! 3. Default records, only when the remote side is unavailable or has nothing yet.
//!
//! A slug is never merged field-by-field: the first source that has it wins outright.
//! There is no timestamp comparison, so a local edit shadows a newer remote copy until
//! the local entry is replaced.

use crate::error::Result;
use crate::model::Record;
use indexmap::IndexMap;

pub fn merge(local: &[Record], remote: Option<&[Record]>, defaults: &[Record]) -> Vec<Record> {
    let mut by_slug: IndexMap<&str, &Record> = IndexMap::new();

    for record in local {
        by_slug.entry(record.slug.as_str()).or_insert(record);
    }

    let base = match remote {
        Some(records) if !records.is_empty() => records,
        _ => defaults,
    };
    for record in base {
        by_slug.entry(record.slug.as_str()).or_insert(record);
    }

    by_slug.into_values().cloned().collect()
}

/// Merge with a remote fetch that may have failed. The failure is logged, not returned.
pub fn resolve(local: &[Record], remote: Result<Vec<Record>>, defaults: &[Record]) -> Vec<Record> {
    match remote {
        Ok(records) => merge(local, Some(records.as_slice()), defaults),
        Err(e) => {
            tracing::warn!(error = %e, "remote records unavailable, using defaults");
            merge(local, None, defaults)
        }
    }
}
