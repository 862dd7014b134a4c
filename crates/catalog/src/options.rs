use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::{blank_to_none, parse_csv, FileKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Takeoff,
    Landing,
}

impl Endpoint {
    pub fn label(self) -> &'static str {
        match self {
            Endpoint::Takeoff => "Takeoff",
            Endpoint::Landing => "Landing",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "takeoff" => Some(Endpoint::Takeoff),
            "landing" => Some(Endpoint::Landing),
            _ => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One choice offered by the takeoff or landing picker. Options without a
/// file key render as text only (e.g. "Unlit").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointOption {
    pub name: String,
    pub file_key: Option<FileKey>,
}

impl EndpointOption {
    pub fn new(name: impl Into<String>, file_key: Option<&str>) -> Self {
        Self {
            name: name.into(),
            file_key: file_key.and_then(blank_to_none).map(FileKey::new),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointOptions {
    pub takeoff: Vec<EndpointOption>,
    pub landing: Vec<EndpointOption>,
}

impl Default for EndpointOptions {
    fn default() -> Self {
        Self {
            takeoff: vec![
                EndpointOption::new("Rainbow", Some("0231_takeoff")),
                EndpointOption::new("Unlit", None),
            ],
            landing: vec![
                EndpointOption::new("Rainbow", Some("0232_landing")),
                EndpointOption::new("Unlit", None),
            ],
        }
    }
}

impl EndpointOptions {
    pub fn for_endpoint(&self, endpoint: Endpoint) -> &[EndpointOption] {
        match endpoint {
            Endpoint::Takeoff => &self.takeoff,
            Endpoint::Landing => &self.landing,
        }
    }

    pub fn find(&self, endpoint: Endpoint, name: &str) -> Option<&EndpointOption> {
        self.for_endpoint(endpoint).iter().find(|o| o.name == name)
    }
}

/// Reads `kind, name, file` rows. Rows with an unknown kind or no name are
/// skipped. An endpoint with no rows keeps the built-in choices.
pub fn parse_endpoint_options(text: &str) -> EndpointOptions {
    let mut takeoff = Vec::new();
    let mut landing = Vec::new();
    for row in parse_csv(text).iter().skip(1) {
        let cells = &row.cells;
        let kind = cells.first().and_then(|k| Endpoint::parse(k));
        let name = cells.get(1).and_then(|n| blank_to_none(n));
        let (Some(kind), Some(name)) = (kind, name) else {
            debug!(line = row.line, "dropping takeoff/landing row");
            continue;
        };
        let option = EndpointOption::new(name, cells.get(2).map(String::as_str));
        match kind {
            Endpoint::Takeoff => takeoff.push(option),
            Endpoint::Landing => landing.push(option),
        }
    }
    let defaults = EndpointOptions::default();
    EndpointOptions {
        takeoff: if takeoff.is_empty() { defaults.takeoff } else { takeoff },
        landing: if landing.is_empty() { defaults.landing } else { landing },
    }
}
