use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

mod assets;
pub use assets::*;
mod loader;
pub use loader::*;
mod options;
pub use options::*;
mod projection;
pub use projection::*;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid asset base: {0}")]
    InvalidAssetBase(String),
}

/// Identifier used to locate a record's media, e.g. `0012_Sakura`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileKey(String);

impl FileKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// `pad4(id) + "_" + name`. Returns `None` when both parts are blank.
    pub fn derive(id: &str, name: &str) -> Option<Self> {
        let id = blank_to_none(id);
        let name = blank_to_none(name);
        match (id, name) {
            (Some(id), Some(name)) => Some(Self(format!("{}_{}", zero_pad(id, 4), name))),
            (Some(id), None) => Some(Self(zero_pad(id, 4))),
            (None, Some(name)) => Some(Self(name.to_string())),
            (None, None) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Left-pads an all-digit id with zeros. Other ids pass through untouched.
pub fn zero_pad(id: &str, width: usize) -> String {
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        format!("{:0>width$}", id, width = width)
    } else {
        id.to_string()
    }
}

/// Empty cells and the `-` filler both count as blank.
pub(crate) fn blank_to_none(value: &str) -> Option<&str> {
    let value = value.trim();
    if value.is_empty() || value == "-" {
        None
    } else {
        Some(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Motif,
    Transition,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub height: Option<f64>,
    pub width: Option<f64>,
    pub depth: Option<f64>,
    pub duration_seconds: Option<f64>,
}

impl Dimensions {
    pub fn is_empty(&self) -> bool {
        self.height.is_none()
            && self.width.is_none()
            && self.depth.is_none()
            && self.duration_seconds.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub kind: RecordKind,
    /// Zero-padded id, or `-` when the row had none.
    pub id: String,
    pub name: String,
    pub plane_count: Option<u32>,
    pub comment: String,
    pub file_key: FileKey,
    #[serde(default)]
    pub dimensions: Dimensions,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub popularity: Option<String>,
}

impl CatalogRecord {
    /// Caption shown under a grid card: `name / N planes / comment`.
    pub fn caption(&self) -> String {
        let planes = self
            .plane_count
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        format!("{} / {} planes / {}", self.name, planes, self.comment)
    }

    pub fn info_text(&self) -> String {
        fn show(v: Option<f64>) -> String {
            v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
        }
        let d = &self.dimensions;
        format!(
            "H:{} / W:{} / D:{} / Duration:{}",
            show(d.height),
            show(d.width),
            show(d.depth),
            show(d.duration_seconds)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_key_pads_numeric_ids() {
        assert_eq!(FileKey::derive("12", "Sakura").unwrap().as_str(), "0012_Sakura");
        assert_eq!(FileKey::derive("0231", "Fuji").unwrap().as_str(), "0231_Fuji");
        assert_eq!(FileKey::derive("A7", "Star").unwrap().as_str(), "A7_Star");
    }

    #[test]
    fn file_key_with_one_part() {
        assert_eq!(FileKey::derive("7", "").unwrap().as_str(), "0007");
        assert_eq!(FileKey::derive("-", "Wave").unwrap().as_str(), "Wave");
        assert!(FileKey::derive("", "-").is_none());
    }

    #[test]
    fn info_text_uses_dash_for_missing() {
        let record = CatalogRecord {
            kind: RecordKind::Motif,
            id: "0001".into(),
            name: "Heart".into(),
            plane_count: Some(100),
            comment: "-".into(),
            file_key: FileKey::new("0001_Heart"),
            dimensions: Dimensions {
                height: Some(120.0),
                width: None,
                depth: None,
                duration_seconds: Some(30.0),
            },
            date: None,
            season: None,
            category: None,
            popularity: None,
        };
        assert_eq!(record.info_text(), "H:120 / W:- / D:- / Duration:30");
        assert_eq!(record.caption(), "Heart / 100 planes / -");
    }
}
