use catalog::{AssetLocation, AssetResolver, CatalogState, FileKey, RecordKind};
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe workers stopped")]
    Stopped,
}

/// Answers whether a media file can be fetched.
pub trait AssetProber: Send + Sync + 'static {
    fn exists(&self, location: &AssetLocation) -> bool;
}

/// Checks local files on disk. Remote locations are assumed reachable; the
/// viewer reports a broken URL when it loads the image.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProber;

impl AssetProber for FsProber {
    fn exists(&self, location: &AssetLocation) -> bool {
        match location {
            AssetLocation::Path(path) => path.is_file(),
            AssetLocation::Url(url) => {
                debug!(%url, "remote asset not probed");
                true
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeRequest {
    /// Position of the record in the canonical catalog order.
    pub index: usize,
    pub file_key: FileKey,
    pub location: AssetLocation,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProbeStatus {
    Found,
    Missing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeEvent {
    pub id: Uuid,
    pub index: usize,
    pub file_key: FileKey,
    pub status: ProbeStatus,
}

#[derive(Clone)]
pub struct ProbeHandle {
    tx_submit: Sender<(Uuid, ProbeRequest)>,
    pub rx_events: Receiver<ProbeEvent>,
}

pub struct ProbeRuntime;

impl ProbeRuntime {
    /// Spawns `num_workers` threads that drain a shared queue. Workers exit
    /// once every handle has been dropped and the queue is empty.
    pub fn start(num_workers: usize, prober: Arc<dyn AssetProber>) -> ProbeHandle {
        let (tx_submit, rx_submit) = unbounded::<(Uuid, ProbeRequest)>();
        let (tx_events, rx_events) = unbounded::<ProbeEvent>();

        for worker in 0..num_workers.max(1) {
            let rx = rx_submit.clone();
            let tx_e = tx_events.clone();
            let prober = prober.clone();
            thread::spawn(move || {
                while let Ok((id, request)) = rx.recv() {
                    let status = if prober.exists(&request.location) {
                        ProbeStatus::Found
                    } else {
                        ProbeStatus::Missing
                    };
                    let event = ProbeEvent {
                        id,
                        index: request.index,
                        file_key: request.file_key,
                        status,
                    };
                    if tx_e.send(event).is_err() {
                        break;
                    }
                }
                debug!(worker, "probe worker exiting");
            });
        }

        ProbeHandle {
            tx_submit,
            rx_events,
        }
    }
}

impl ProbeHandle {
    pub fn enqueue(&self, request: ProbeRequest) -> Result<Uuid, ProbeError> {
        let id = Uuid::new_v4();
        self.tx_submit
            .send((id, request))
            .map_err(|_| ProbeError::Stopped)?;
        Ok(id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeSummary {
    pub found: usize,
    pub missing: Vec<FileKey>,
}

/// Probes every motif icon and feeds the results into the catalog's
/// existence barrier, blocking until the last one arrives.
pub fn probe_catalog(
    catalog: &mut CatalogState,
    resolver: &AssetResolver,
    handle: &ProbeHandle,
) -> Result<ProbeSummary, ProbeError> {
    catalog.begin_probe();
    let requests: Vec<ProbeRequest> = catalog
        .motifs()
        .iter()
        .enumerate()
        .map(|(index, record)| ProbeRequest {
            index,
            file_key: record.file_key.clone(),
            location: resolver.icon(RecordKind::Motif, &record.file_key),
        })
        .collect();
    let mut pending = HashSet::with_capacity(requests.len());
    for request in requests {
        pending.insert(handle.enqueue(request)?);
    }

    let mut summary = ProbeSummary::default();
    while !pending.is_empty() {
        let event = handle.rx_events.recv().map_err(|_| ProbeError::Stopped)?;
        if !pending.remove(&event.id) {
            debug!(id = %event.id, file_key = %event.file_key, "ignoring result for another caller");
            continue;
        }
        let found = event.status == ProbeStatus::Found;
        if found {
            summary.found += 1;
        } else {
            summary.missing.push(event.file_key);
        }
        catalog.record_probe(event.index, found);
    }
    info!(
        found = summary.found,
        missing = summary.missing.len(),
        "asset probe complete"
    );
    Ok(summary)
}
