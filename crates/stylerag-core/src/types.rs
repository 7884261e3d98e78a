//! Domain types shared by the index, prompt, generation and pipeline crates.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};

pub type Meta = HashMap<String, String>;

/// Response style chosen per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleKey {
    Email,
    Normal,
    Report,
    Feedback,
}

impl StyleKey {
    pub const ALL: [StyleKey; 4] = [StyleKey::Email, StyleKey::Normal, StyleKey::Report, StyleKey::Feedback];

    pub fn name(self) -> &'static str {
        match self {
            StyleKey::Email => "email",
            StyleKey::Normal => "normal",
            StyleKey::Report => "report",
            StyleKey::Feedback => "feedback",
        }
    }

    /// Label shown to users, e.g. "Email Style".
    pub fn label(self) -> &'static str {
        match self {
            StyleKey::Email => "Email Style",
            StyleKey::Normal => "Normal Style",
            StyleKey::Report => "Report Style",
            StyleKey::Feedback => "Feedback Style",
        }
    }
}

impl fmt::Display for StyleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

/// Token naming one per-style index (`mail`, `normal`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexId(String);

impl IndexId {
    pub fn new<S: Into<String>>(token: S) -> Self { Self(token.into()) }
    pub fn as_str(&self) -> &str { &self.0 }

    /// Artifact file name: `<prefix>_<token>.<ext>`.
    pub fn artifact_name(&self, prefix: &str, ext: &str) -> String {
        format!("{}_{}.{}", prefix, self.0, ext)
    }
}

impl fmt::Display for IndexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// How far the model may stray from the retrieved context, 1 (minimal) to 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeLevel(u8);

impl KnowledgeLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    pub fn new(level: u8) -> Result<Self> {
        if !(Self::MIN..=Self::MAX).contains(&level) {
            return Err(Error::Configuration(format!(
                "external knowledge level must be between {} and {}, got {}",
                Self::MIN, Self::MAX, level
            )));
        }
        Ok(Self(level))
    }

    pub fn get(self) -> u8 { self.0 }
}

/// Approximate answer length in words, passed to the model as an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordLimit(u32);

impl WordLimit {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 5000;

    pub fn new(words: u32) -> Result<Self> {
        if !(Self::MIN..=Self::MAX).contains(&words) {
            return Err(Error::Configuration(format!(
                "word limit must be between {} and {}, got {}",
                Self::MIN, Self::MAX, words
            )));
        }
        Ok(Self(words))
    }

    pub fn get(self) -> u32 { self.0 }
}

/// One fragment returned by a similarity search.
///
/// `rank` is 0 for the closest fragment; `distance` is the squared L2
/// distance to the query embedding, so lower is better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedFragment {
    pub id: String,
    pub content: String,
    pub metadata: Meta,
    pub rank: usize,
    pub distance: f32,
}

/// A rendered prompt ready for the generation backend.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn new(prompt: String, temperature: f32) -> Result<Self> {
        validate_temperature(temperature)?;
        Ok(Self { prompt, temperature })
    }
}

pub fn validate_temperature(temperature: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&temperature) {
        return Err(Error::Configuration(format!("temperature must be within [0, 1], got {}", temperature)));
    }
    Ok(())
}
