use catalog::{AssetResolver, CatalogState};
use chrono::{DateTime, Utc};
use composer::{render, Composer, ComposerError, ExportSnapshot, ViewNode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{info, warn};

pub mod layout;
pub mod pdf;

pub use layout::{ExportLayout, Geometry, LayoutEntry, LayoutRow};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),
    #[error("PDF error: {0}")]
    Pdf(String),
    #[error("footer has no motifs to export")]
    Empty,
    #[error(transparent)]
    Composer(#[from] ComposerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Pdf,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSize {
    A4,
    Letter,
}

impl PageSize {
    /// Portrait width and height in millimetres.
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (210.0, 297.0),
            PageSize::Letter => (215.9, 279.4),
        }
    }
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub format: ExportFormat,
    pub output_path: PathBuf,
    pub title: String,
    pub max_entries_per_column: usize,
    pub page_size: PageSize,
    pub jpeg_quality: u8,
    /// TrueType font for PDF labels. Without one, labels use builtin
    /// Helvetica, which cannot show non-Latin names.
    pub font_path: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Pdf,
            output_path: PathBuf::from("stockcontents.pdf"),
            title: "Stock Contents".to_string(),
            max_entries_per_column: 8,
            page_size: PageSize::A4,
            jpeg_quality: 90,
            font_path: None,
        }
    }
}

pub struct Exporter {
    config: ExportConfig,
    resolver: AssetResolver,
}

impl Exporter {
    pub fn new(config: ExportConfig, resolver: AssetResolver) -> Self {
        Self { config, resolver }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Writes the snapshot in the configured format. Output is staged in a
    /// temporary file next to the target and only moved into place once
    /// complete, so a failed export leaves nothing behind.
    pub fn export_snapshot(
        &self,
        snapshot: &ExportSnapshot,
        catalog: &CatalogState,
    ) -> Result<PathBuf, ExportError> {
        let layout = ExportLayout::build(
            &self.config.title,
            snapshot,
            catalog,
            &self.resolver,
            self.config.max_entries_per_column,
        )?;

        let rows = layout.row_count();
        let target = &self.config.output_path;
        let dir = staging_dir(target);
        fs::create_dir_all(dir)?;
        let mut staged = NamedTempFile::new_in(dir)?;
        match self.config.format {
            ExportFormat::Pdf => pdf::write_pdf(&layout, &self.config, staged.as_file_mut())?,
            ExportFormat::Json => self.write_json(snapshot, catalog, layout, staged.as_file_mut())?,
        }
        staged.as_file_mut().flush()?;
        staged.persist(target).map_err(|e| ExportError::Io(e.error))?;
        info!(path = %target.display(), rows, "export written");
        Ok(target.clone())
    }

    fn write_json<W: Write>(
        &self,
        snapshot: &ExportSnapshot,
        catalog: &CatalogState,
        layout: ExportLayout,
        out: W,
    ) -> Result<(), ExportError> {
        let export_data = ExportData {
            sequence: render(&snapshot.slots, catalog, &self.resolver),
            layout,
            metadata: ExportMetadata {
                exported_at: Utc::now(),
                exporter_version: env!("CARGO_PKG_VERSION").to_string(),
                config: self.config.clone(),
            },
        };
        serde_json::to_writer_pretty(out, &export_data)?;
        Ok(())
    }

    /// Runs a full export against a live composer: freezes edits, writes the
    /// document and re-enables edits whether or not the write succeeded.
    pub fn export(&self, composer: &mut Composer) -> Result<PathBuf, ExportError> {
        let snapshot = composer.begin_export()?;
        let result = self.export_snapshot(&snapshot, composer.catalog());
        composer.finish_export();
        if let Err(e) = &result {
            warn!(error = %e, "export failed");
        }
        result
    }
}

fn staging_dir(target: &Path) -> &Path {
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportData {
    pub sequence: Vec<ViewNode>,
    pub layout: ExportLayout,
    pub metadata: ExportMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub exported_at: DateTime<Utc>,
    pub exporter_version: String,
    pub config: ExportConfig,
}
