use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::{blank_to_none, zero_pad, CatalogError, CatalogRecord, Dimensions, FileKey, RecordKind};

/// Header width at which a motif sheet is read as the extended layout.
pub const EXTENDED_COLUMNS: usize = 13;

/// Column layout of one catalog sheet, resolved once from its header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowShape {
    /// `id, name, planes, comment, file, -, width, height, depth, duration`
    Legacy,
    /// `id, name, planes, droneType, -, width, height, depth, duration,
    /// date, season, category, popularity`. The file key is derived.
    Extended,
    /// `id, name, comment, file`
    Transition,
}

impl RowShape {
    pub fn for_motif_header(header: &[String]) -> Self {
        if header.len() >= EXTENDED_COLUMNS {
            RowShape::Extended
        } else {
            RowShape::Legacy
        }
    }

    fn kind(self) -> RecordKind {
        match self {
            RowShape::Legacy | RowShape::Extended => RecordKind::Motif,
            RowShape::Transition => RecordKind::Transition,
        }
    }
}

/// One non-blank CSV line with its 1-based position in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    pub line: usize,
    pub cells: Vec<String>,
}

/// Splits comma separated text into trimmed cells. Blank lines are skipped
/// but still counted.
pub fn parse_csv(text: &str) -> Vec<CsvRow> {
    text.lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .map(|(line, text)| CsvRow {
            line,
            cells: text.split(',').map(clean_cell).collect(),
        })
        .collect()
}

fn clean_cell(cell: &str) -> String {
    let cell = cell.trim();
    let cell = cell
        .strip_prefix('"')
        .and_then(|c| c.strip_suffix('"'))
        .unwrap_or(cell);
    cell.trim().to_string()
}

pub fn parse_motif_catalog(text: &str) -> Vec<CatalogRecord> {
    let rows = parse_csv(text);
    let Some((header, body)) = rows.split_first() else {
        return Vec::new();
    };
    parse_rows(RowShape::for_motif_header(&header.cells), body)
}

pub fn parse_transition_catalog(text: &str) -> Vec<CatalogRecord> {
    let rows = parse_csv(text);
    let Some((_header, body)) = rows.split_first() else {
        return Vec::new();
    };
    parse_rows(RowShape::Transition, body)
}

/// Converts header-less rows into records, dropping blank and malformed rows.
pub fn parse_rows(shape: RowShape, rows: &[CsvRow]) -> Vec<CatalogRecord> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match parse_row(shape, &row.cells) {
            Some(record) => out.push(record),
            None => debug!(line = row.line, ?shape, "dropping catalog row"),
        }
    }
    out
}

pub fn load_catalog(path: &Path, kind: RecordKind) -> Result<Vec<CatalogRecord>, CatalogError> {
    let text = std::fs::read_to_string(path)?;
    let records = match kind {
        RecordKind::Motif => parse_motif_catalog(&text),
        RecordKind::Transition => parse_transition_catalog(&text),
    };
    info!(path = %path.display(), count = records.len(), ?kind, "catalog loaded");
    Ok(records)
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

fn parse_row(shape: RowShape, row: &[String]) -> Option<CatalogRecord> {
    let used = match shape {
        RowShape::Legacy => 10,
        RowShape::Extended => EXTENDED_COLUMNS,
        RowShape::Transition => 4,
    };
    let id = blank_to_none(cell(row, 0));
    let rest_blank = (1..used).all(|i| blank_to_none(cell(row, i)).is_none());
    if rest_blank {
        // Covers both the all-blank row and the row where only the id survived.
        return None;
    }
    if shape == RowShape::Transition && id.is_none() {
        return None;
    }

    let name = cell(row, 1);
    let explicit_key = match shape {
        RowShape::Legacy => blank_to_none(cell(row, 4)),
        RowShape::Transition => blank_to_none(cell(row, 3)),
        RowShape::Extended => None,
    };
    let file_key = explicit_key
        .map(FileKey::new)
        .or_else(|| FileKey::derive(id.unwrap_or(""), name))?;

    let text = |idx: usize| blank_to_none(cell(row, idx)).unwrap_or("-").to_string();
    let opt_text = |idx: usize| blank_to_none(cell(row, idx)).map(str::to_string);
    let number = |idx: usize| blank_to_none(cell(row, idx)).and_then(|v| v.parse::<f64>().ok());

    let record = match shape {
        RowShape::Transition => CatalogRecord {
            kind: shape.kind(),
            id: id.map(|id| zero_pad(id, 4)).unwrap_or_else(|| "-".into()),
            name: text(1),
            plane_count: None,
            comment: text(2),
            file_key,
            dimensions: Dimensions::default(),
            date: None,
            season: None,
            category: None,
            popularity: None,
        },
        RowShape::Legacy | RowShape::Extended => {
            let extended = shape == RowShape::Extended;
            CatalogRecord {
                kind: shape.kind(),
                id: id.map(|id| zero_pad(id, 4)).unwrap_or_else(|| "-".into()),
                name: text(1),
                plane_count: parse_plane_count(cell(row, 2)),
                comment: text(3),
                file_key,
                dimensions: Dimensions {
                    width: number(5 + usize::from(!extended)),
                    height: number(6 + usize::from(!extended)),
                    depth: number(7 + usize::from(!extended)),
                    duration_seconds: number(8 + usize::from(!extended)),
                },
                date: if extended { parse_date(cell(row, 9)) } else { None },
                season: if extended { opt_text(10) } else { None },
                category: if extended { opt_text(11) } else { None },
                popularity: if extended { opt_text(12) } else { None },
            }
        }
    };
    Some(record)
}

pub fn parse_plane_count(value: &str) -> Option<u32> {
    blank_to_none(value).and_then(|v| v.parse::<u32>().ok())
}

/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD` and `YYYYMMDD`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = blank_to_none(value)?;
    ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}
