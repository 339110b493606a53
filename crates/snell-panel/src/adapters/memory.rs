//! In-memory adapters for tests and local experiments.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::entry::{Entry, EntryPatch, GeoInfo};
use crate::domain::error::{GeoError, StoreError};
use crate::ports::outbound::{EntryStore, GeoLocator, NodeIdGenerator};

/// Vec-backed store with the same contract as the SQLite one.
#[derive(Default)]
pub struct InMemoryEntryStore {
    inner: Mutex<MemoryTable>,
}

#[derive(Default)]
struct MemoryTable {
    rows: Vec<Entry>,
    last_id: i64,
}

impl InMemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EntryStore for InMemoryEntryStore {
    fn insert(&self, mut entry: Entry) -> Result<Entry, StoreError> {
        let mut table = self.inner.lock();
        if table.rows.iter().any(|e| e.node_id == entry.node_id) {
            return Err(StoreError::Conflict(format!(
                "UNIQUE constraint failed: entries.node_id ({})",
                entry.node_id
            )));
        }
        table.last_id += 1;
        entry.id = table.last_id;
        table.rows.push(entry.clone());
        Ok(entry)
    }

    fn list(&self) -> Result<Vec<Entry>, StoreError> {
        Ok(self.inner.lock().rows.clone())
    }

    fn find_by_node_id(&self, node_id: &str) -> Result<Option<Entry>, StoreError> {
        Ok(self
            .inner
            .lock()
            .rows
            .iter()
            .find(|e| e.node_id == node_id)
            .cloned())
    }

    fn delete_by_ip(&self, ip: &str) -> Result<usize, StoreError> {
        let mut table = self.inner.lock();
        let before = table.rows.len();
        table.rows.retain(|e| e.ip != ip);
        Ok(before - table.rows.len())
    }

    fn delete_by_node_id(&self, node_id: &str) -> Result<usize, StoreError> {
        let mut table = self.inner.lock();
        let before = table.rows.len();
        table.rows.retain(|e| e.node_id != node_id);
        Ok(before - table.rows.len())
    }

    fn update_by_node_id(&self, node_id: &str, patch: &EntryPatch) -> Result<usize, StoreError> {
        if patch.is_empty() {
            return Err(StoreError::EmptyUpdate);
        }
        let mut table = self.inner.lock();
        let Some(entry) = table.rows.iter_mut().find(|e| e.node_id == node_id) else {
            return Ok(0);
        };

        if let Some(name) = &patch.node_name {
            entry.node_name = Some(name.clone());
        }
        if let Some(ip) = &patch.ip {
            entry.ip = ip.clone();
        }
        if let Some(geo) = &patch.geo {
            entry.country_code = geo.country_code.clone();
            entry.isp = geo.isp.clone();
            entry.asn = geo.asn;
        }
        if let Some(port) = patch.port {
            entry.port = port;
        }
        if let Some(psk) = &patch.psk {
            entry.psk = psk.clone();
        }
        if let Some(version) = patch.version {
            entry.version = version;
        }
        Ok(1)
    }
}

/// Locator answering from a fixed table. Unknown hosts get `fallback` when
/// set, otherwise [`GeoError::NoAddress`].
#[derive(Default)]
pub struct StaticLocator {
    answers: HashMap<String, GeoInfo>,
    fallback: Option<GeoInfo>,
    lookups: AtomicU64,
}

impl StaticLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every host with `geo`.
    pub fn always(geo: GeoInfo) -> Self {
        Self {
            fallback: Some(geo),
            ..Self::default()
        }
    }

    pub fn with_answer(mut self, host: impl Into<String>, geo: GeoInfo) -> Self {
        self.answers.insert(host.into(), geo);
        self
    }

    /// Number of lookups served so far, failures included.
    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl GeoLocator for StaticLocator {
    async fn locate(&self, host: &str) -> Result<GeoInfo, GeoError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.answers
            .get(host)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| GeoError::NoAddress(host.to_string()))
    }
}

/// Deterministic ids: `node-1`, `node-2`, ...
#[derive(Default)]
pub struct SequentialNodeIds {
    next: AtomicU64,
}

impl SequentialNodeIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NodeIdGenerator for SequentialNodeIds {
    fn generate(&self) -> String {
        format!("node-{}", self.next.fetch_add(1, Ordering::Relaxed) + 1)
    }
}
