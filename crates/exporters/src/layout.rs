use catalog::{AssetLocation, AssetResolver, CatalogState, Endpoint, FileKey, RecordKind};
use composer::{ExportSnapshot, SlotKind};
use serde::{Deserialize, Serialize};

use crate::{ExportError, PageSize};

const MARGIN_MM: f32 = 12.0;
const BAND_MM: f32 = 22.0;
const ICON_MM: f32 = 32.0;
const ARROW_MM: f32 = 12.0;
const CAPTION_MM: f32 = 9.0;
const ROW_GAP_MM: f32 = 5.0;
const COLUMN_GAP_MM: f32 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutEntry {
    pub kind: RecordKind,
    pub file_key: FileKey,
    pub label: String,
    pub image: AssetLocation,
}

/// A motif, optionally followed by the transition placed right after it.
/// A transition left dangling by a motif cancel gets a row of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutRow {
    pub entries: Vec<LayoutEntry>,
}

/// Takeoff or landing label shown above or below the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointBand {
    pub endpoint: Endpoint,
    pub text: String,
    pub image: Option<AssetLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportLayout {
    pub title: String,
    pub header: Option<EndpointBand>,
    pub footer: Option<EndpointBand>,
    /// Rows split into columns of at most `max_entries_per_column`; extra
    /// columns continue to the right on the same page.
    pub columns: Vec<Vec<LayoutRow>>,
}

fn record_label(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Motif => "Motif",
        RecordKind::Transition => "Transition",
    }
}

fn entry(
    kind: RecordKind,
    file_key: &FileKey,
    catalog: &CatalogState,
    resolver: &AssetResolver,
) -> LayoutEntry {
    let label = match catalog.lookup(kind, file_key) {
        Some(record) => format!("{} {}", record_label(kind), record.name),
        None => record_label(kind).to_string(),
    };
    LayoutEntry {
        kind,
        file_key: file_key.clone(),
        label,
        image: resolver.icon(kind, file_key),
    }
}

impl ExportLayout {
    /// Walks the snapshot in order. Placeholders are skipped, sentinels turn
    /// into header and footer bands.
    pub fn build(
        title: &str,
        snapshot: &ExportSnapshot,
        catalog: &CatalogState,
        resolver: &AssetResolver,
        max_entries_per_column: usize,
    ) -> Result<Self, ExportError> {
        let mut header = None;
        let mut footer = None;
        let mut rows: Vec<LayoutRow> = Vec::new();
        let mut open_motif = false;

        for slot in &snapshot.slots {
            match &slot.kind {
                SlotKind::Takeoff { selection } | SlotKind::Landing { selection } => {
                    let endpoint = slot.endpoint_kind().unwrap_or(Endpoint::Takeoff);
                    let band = EndpointBand {
                        endpoint,
                        text: match selection {
                            Some(option) => format!("{}: {}", endpoint.label(), option.name),
                            None => format!("{}: not selected", endpoint.label()),
                        },
                        image: selection
                            .as_ref()
                            .and_then(|o| o.file_key.as_ref())
                            .map(|key| resolver.resolve(catalog::AssetKind::EndpointIcon, key)),
                    };
                    match endpoint {
                        Endpoint::Takeoff => header = Some(band),
                        Endpoint::Landing => footer = Some(band),
                    }
                    open_motif = false;
                }
                SlotKind::Motif { file_key } => {
                    rows.push(LayoutRow {
                        entries: vec![entry(RecordKind::Motif, file_key, catalog, resolver)],
                    });
                    open_motif = true;
                }
                SlotKind::Transition { file_key } => {
                    let item = entry(RecordKind::Transition, file_key, catalog, resolver);
                    match rows.last_mut() {
                        Some(row) if open_motif => row.entries.push(item),
                        _ => rows.push(LayoutRow {
                            entries: vec![item],
                        }),
                    }
                    open_motif = false;
                }
                SlotKind::InsertionPlaceholder => {
                    open_motif = false;
                }
            }
        }

        if !rows.iter().flat_map(|r| &r.entries).any(|e| e.kind == RecordKind::Motif) {
            return Err(ExportError::Empty);
        }
        let per_column = max_entries_per_column.max(1);
        let columns = rows.chunks(per_column).map(|c| c.to_vec()).collect();
        Ok(Self {
            title: title.to_string(),
            header,
            footer,
            columns,
        })
    }

    pub fn row_count(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    pub fn geometry(&self, page: PageSize) -> Geometry {
        let (page_w, page_h) = page.dimensions_mm();
        let columns = self.columns.len().max(1) as f32;
        let rows = self.columns.iter().map(Vec::len).max().unwrap_or(0).max(1) as f32;

        let column_w = 2.0 * ICON_MM + ARROW_MM;
        let row_h = ICON_MM + CAPTION_MM + ROW_GAP_MM;
        let natural_w = columns * column_w + (columns - 1.0) * COLUMN_GAP_MM;
        let natural_h = rows * row_h;

        let avail_w = page_w - 2.0 * MARGIN_MM;
        let avail_h = page_h - 2.0 * MARGIN_MM - 2.0 * BAND_MM;
        let scale = (avail_w / natural_w).min(avail_h / natural_h).min(1.0);

        Geometry {
            scale,
            page_w,
            page_h,
            left: MARGIN_MM + (avail_w - natural_w * scale) / 2.0,
            top: page_h - MARGIN_MM - BAND_MM,
        }
    }
}

/// Placement of the grid on one page, in millimetres from the bottom-left
/// corner. Everything is scaled by the same factor so the grid fits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub scale: f32,
    pub page_w: f32,
    pub page_h: f32,
    left: f32,
    top: f32,
}

impl Geometry {
    pub fn icon_size(&self) -> f32 {
        ICON_MM * self.scale
    }

    fn column_x(&self, column: usize) -> f32 {
        self.left + column as f32 * (2.0 * ICON_MM + ARROW_MM + COLUMN_GAP_MM) * self.scale
    }

    fn row_y(&self, row: usize) -> f32 {
        self.top - (row as f32 + 1.0) * (ICON_MM + CAPTION_MM + ROW_GAP_MM) * self.scale
    }

    /// Bottom-left corner of the icon; `second` is the entry after the arrow.
    pub fn cell(&self, column: usize, row: usize, second: bool) -> (f32, f32) {
        let offset = if second { (ICON_MM + ARROW_MM) * self.scale } else { 0.0 };
        (
            self.column_x(column) + offset,
            self.row_y(row) + (CAPTION_MM + ROW_GAP_MM) * self.scale,
        )
    }

    /// Baseline of the caption under a cell.
    pub fn caption(&self, column: usize, row: usize, second: bool) -> (f32, f32) {
        let (x, y) = self.cell(column, row, second);
        (x, y - 0.6 * CAPTION_MM * self.scale)
    }

    pub fn arrow(&self, column: usize, row: usize) -> (f32, f32) {
        let (x, y) = self.cell(column, row, false);
        (x + (ICON_MM + 0.25 * ARROW_MM) * self.scale, y + 0.5 * ICON_MM * self.scale)
    }

    pub fn header_origin(&self) -> (f32, f32) {
        (MARGIN_MM, self.page_h - MARGIN_MM - BAND_MM + 4.0)
    }

    pub fn footer_origin(&self) -> (f32, f32) {
        (MARGIN_MM, MARGIN_MM + 4.0)
    }

    pub fn band_icon_size(&self) -> f32 {
        BAND_MM - 6.0
    }
}
