use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::{CatalogError, FileKey, RecordKind};

/// Characters escaped when a file key becomes a URL path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'?')
    .add(b'<')
    .add(b'>')
    .add(b'`');

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    MotifIcon,
    MotifVideo,
    TransitionIcon,
    TransitionVideo,
    EndpointIcon,
}

impl AssetKind {
    pub fn icon_for(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Motif => AssetKind::MotifIcon,
            RecordKind::Transition => AssetKind::TransitionIcon,
        }
    }

    pub fn video_for(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Motif => AssetKind::MotifVideo,
            RecordKind::Transition => AssetKind::TransitionVideo,
        }
    }

    fn directory(self) -> &'static str {
        match self {
            AssetKind::MotifIcon => "image/motif/icon",
            AssetKind::MotifVideo => "image/motif/video",
            AssetKind::TransitionIcon => "image/transition/icon",
            AssetKind::TransitionVideo => "image/transition/video",
            AssetKind::EndpointIcon => "image/takeoff_landing/icon",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            AssetKind::MotifVideo | AssetKind::TransitionVideo => "mp4",
            _ => "jpg",
        }
    }
}

/// Root that every media path is resolved against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "root", rename_all = "snake_case")]
pub enum AssetBase {
    Local(PathBuf),
    Remote(String),
}

impl AssetBase {
    /// `http://` and `https://` roots become remote, anything else a directory.
    pub fn parse(raw: &str) -> Result<Self, CatalogError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(CatalogError::InvalidAssetBase("empty".to_string()));
        }
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Ok(AssetBase::Remote(raw.trim_end_matches('/').to_string()))
        } else {
            Ok(AssetBase::Local(PathBuf::from(raw)))
        }
    }
}

impl Default for AssetBase {
    fn default() -> Self {
        AssetBase::Local(PathBuf::from("./assets"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "location", rename_all = "snake_case")]
pub enum AssetLocation {
    Path(PathBuf),
    Url(String),
}

impl AssetLocation {
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            AssetLocation::Path(p) => Some(p),
            AssetLocation::Url(_) => None,
        }
    }
}

impl fmt::Display for AssetLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetLocation::Path(p) => write!(f, "{}", p.display()),
            AssetLocation::Url(u) => f.write_str(u),
        }
    }
}

/// The one place media locations are derived from file keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetResolver {
    base: AssetBase,
}

impl AssetResolver {
    pub fn new(base: AssetBase) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &AssetBase {
        &self.base
    }

    pub fn resolve(&self, kind: AssetKind, key: &FileKey) -> AssetLocation {
        let file = format!("{}.{}", key.as_str(), kind.extension());
        match &self.base {
            AssetBase::Local(root) => {
                let mut path = root.clone();
                path.extend(kind.directory().split('/'));
                path.push(file);
                AssetLocation::Path(path)
            }
            AssetBase::Remote(root) => AssetLocation::Url(format!(
                "{}/{}/{}",
                root,
                kind.directory(),
                utf8_percent_encode(&file, SEGMENT)
            )),
        }
    }

    pub fn icon(&self, kind: RecordKind, key: &FileKey) -> AssetLocation {
        self.resolve(AssetKind::icon_for(kind), key)
    }

    pub fn video(&self, kind: RecordKind, key: &FileKey) -> AssetLocation {
        self.resolve(AssetKind::video_for(kind), key)
    }
}
