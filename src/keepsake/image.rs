//! Image intake: validation before any network call, inline encoding for offline
//! drafts, and collision-resistant object names for uploads.

use crate::error::{KeepsakeError, Result, ValidationError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use rand::Rng;
use std::fs;
use std::path::Path;

/// Largest image accepted from a user, in bytes.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 2_500_000;

const DEFAULT_EXT: &str = "jpg";

/// An image picked by the user, not yet validated.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(KeepsakeError::Io)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("image.{}", DEFAULT_EXT));
        Ok(Self::new(name, bytes))
    }

    /// MIME type sniffed from the content, if it is an image.
    pub fn mime_type(&self) -> Option<&'static str> {
        infer::get(&self.bytes)
            .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
            .map(|kind| kind.mime_type())
    }

    /// Rejects non-images and files over `max_bytes`.
    pub fn validate(&self, max_bytes: usize) -> Result<&'static str> {
        let Some(mime) = self.mime_type() else {
            return Err(ValidationError::NotAnImage {
                name: self.name.clone(),
            }
            .into());
        };
        if self.bytes.len() > max_bytes {
            return Err(ValidationError::TooLarge {
                name: self.name.clone(),
                size: self.bytes.len(),
                max: max_bytes,
            }
            .into());
        }
        Ok(mime)
    }

    /// Extension taken from the original name, `jpg` when there is none.
    pub fn extension(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext,
            _ => DEFAULT_EXT,
        }
    }

    /// `data:<mime>;base64,<payload>` for drafts that cannot be uploaded.
    pub fn to_data_uri(&self, mime: &str) -> String {
        format!("data:{};base64,{}", mime, STANDARD.encode(&self.bytes))
    }
}

/// `<unix millis>-<random hex>.<ext>`
pub fn object_name(ext: &str) -> String {
    let suffix: u64 = rand::thread_rng().gen();
    format!("{}-{:x}.{}", Utc::now().timestamp_millis(), suffix, ext)
}
