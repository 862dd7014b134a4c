use anyhow::{bail, Context, Result};
use catalog::{
    load_catalog, parse_endpoint_options, AssetResolver, CatalogState, EndpointOptions, RecordKind,
};
use composer::{apply_script, render, Composer, ComposerCommand, ComposerEvent, ViewNode};
use probe::{probe_catalog, FsProber, ProbeRuntime};
use serde::Serialize;
use session::{Session, UserStore};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::StockConfig;

pub fn load_state(config: &StockConfig) -> Result<CatalogState> {
    let motifs = load_catalog(&config.motif_csv, RecordKind::Motif)
        .with_context(|| format!("load motif catalog {}", config.motif_csv.display()))?;
    let transitions = match load_catalog(&config.transition_csv, RecordKind::Transition) {
        Ok(records) => records,
        Err(e) => {
            warn!(path = %config.transition_csv.display(), error = %e, "no transition catalog");
            Vec::new()
        }
    };
    Ok(CatalogState::new(motifs, transitions))
}

pub fn load_options(config: &StockConfig) -> Result<EndpointOptions> {
    match &config.takeoff_landing_csv {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read takeoff/landing options {}", path.display()))?;
            Ok(parse_endpoint_options(&text))
        }
        None => Ok(EndpointOptions::default()),
    }
}

/// Loads both catalogs, probes motif icons and places the sentinels.
pub fn build_composer(config: &StockConfig) -> Result<(Composer, AssetResolver)> {
    let resolver = AssetResolver::new(config.asset_base()?);
    let mut state = load_state(config)?;
    if config.probe_workers > 0 {
        let handle = ProbeRuntime::start(config.probe_workers, Arc::new(FsProber));
        let summary = probe_catalog(&mut state, &resolver, &handle)?;
        if !summary.missing.is_empty() {
            warn!(count = summary.missing.len(), "motifs hidden for missing icons");
        }
    }
    let mut composer = Composer::new(state);
    composer.initialize(load_options(config)?);
    Ok((composer, resolver))
}

pub fn read_script(path: &Path) -> Result<Vec<ComposerCommand>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read script {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse script {}", path.display()))
}

#[derive(Debug, Serialize)]
pub struct RejectedCommand {
    pub index: usize,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct ComposeOutput {
    pub pattern: String,
    pub nodes: Vec<ViewNode>,
    pub rejected: Vec<RejectedCommand>,
    pub events: Vec<ComposerEvent>,
}

/// Replays a script; refused commands are reported, not fatal.
pub fn run_script(
    composer: &mut Composer,
    resolver: &AssetResolver,
    commands: Vec<ComposerCommand>,
) -> ComposeOutput {
    let report = apply_script(composer, commands);
    info!(
        applied = report.applied,
        rejected = report.rejected.len(),
        "script replayed"
    );
    ComposeOutput {
        pattern: composer.state().pattern(),
        nodes: render(composer.slots(), composer.catalog(), resolver),
        rejected: report
            .rejected
            .into_iter()
            .map(|(index, err)| RejectedCommand {
                index,
                error: err.to_string(),
            })
            .collect(),
        events: composer.drain_events(),
    }
}

/// Anonymous when no users file is configured; otherwise a login is required.
pub fn authenticate(
    config: &StockConfig,
    user: Option<&str>,
    password: Option<&str>,
) -> Result<Session> {
    let Some(users_file) = &config.users_file else {
        return Ok(Session::anonymous());
    };
    let store = UserStore::load(users_file)?;
    let (Some(user), Some(password)) = (user, password) else {
        bail!("login required: pass --user and set STOCK_PASSWORD");
    };
    Ok(store.login(user, password)?)
}
