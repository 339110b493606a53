//! Panel service - the operations behind every HTTP endpoint.

use std::sync::Arc;

use tracing::{info, warn};

use crate::adapters::{IpSbLocator, SqliteEntryStore, UuidNodeIds};
use crate::config::Config;
use crate::domain::entry::{Entry, EntryPatch, ModifyRequest, NewEntry, DEFAULT_VERSION};
use crate::domain::error::{PanelError, PanelResult, StartupError, StoreError};
use crate::domain::subscription;
use crate::ports::outbound::{EntryStore, GeoLocator, NodeIdGenerator};

pub struct PanelService {
    store: Arc<dyn EntryStore>,
    locator: Arc<dyn GeoLocator>,
    node_ids: Arc<dyn NodeIdGenerator>,
}

impl PanelService {
    pub fn new(
        store: Arc<dyn EntryStore>,
        locator: Arc<dyn GeoLocator>,
        node_ids: Arc<dyn NodeIdGenerator>,
    ) -> Self {
        Self {
            store,
            locator,
            node_ids,
        }
    }

    /// Wire the production adapters described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, StartupError> {
        let store =
            SqliteEntryStore::open(config.database_path()).map_err(|source| StartupError::Store {
                location: config.database_path().to_string(),
                source,
            })?;
        let locator = IpSbLocator::new(config.geoip_endpoint.clone(), config.geoip_timeout())
            .map_err(StartupError::GeoClient)?;
        info!(
            database = config.database_path(),
            geoip = %config.geoip_endpoint,
            "Panel service initialized"
        );
        Ok(Self::new(
            Arc::new(store),
            Arc::new(locator),
            Arc::new(UuidNodeIds),
        ))
    }

    /// Geolocate the address, assign a node id and store the entry.
    pub async fn insert_entry(&self, request: NewEntry) -> PanelResult<Entry> {
        let request = request.normalized();
        request.validate()?;

        let geo = self.locator.locate(&request.ip).await.map_err(|e| {
            warn!(ip = %request.ip, error = %e, "Geo lookup failed");
            PanelError::from(e)
        })?;

        let entry = Entry {
            id: 0,
            ip: request.ip,
            port: request.port,
            psk: request.psk,
            country_code: geo.country_code,
            isp: geo.isp,
            asn: geo.asn,
            node_id: self.node_ids.generate(),
            node_name: request.node_name,
            version: request.version.unwrap_or(DEFAULT_VERSION),
        };

        let stored = self.with_store(move |store| store.insert(entry)).await?;
        info!(
            id = stored.id,
            node_id = %stored.node_id,
            ip = %stored.ip,
            country = %stored.country_code,
            "Entry created"
        );
        Ok(stored)
    }

    pub async fn list_entries(&self) -> PanelResult<Vec<Entry>> {
        Ok(self.with_store(|store| store.list()).await?)
    }

    /// Delete every entry stored under `ip`. Returns how many were removed.
    pub async fn delete_by_ip(&self, ip: &str) -> PanelResult<usize> {
        let key = ip.to_string();
        let removed = self.with_store(move |store| store.delete_by_ip(&key)).await?;
        if removed == 0 {
            return Err(PanelError::entry_not_found());
        }
        info!(ip, removed, "Entries deleted by address");
        Ok(removed)
    }

    pub async fn delete_by_node_id(&self, node_id: &str) -> PanelResult<()> {
        let key = node_id.to_string();
        let removed = self
            .with_store(move |store| store.delete_by_node_id(&key))
            .await?;
        if removed == 0 {
            return Err(PanelError::entry_not_found());
        }
        info!(node_id, "Entry deleted");
        Ok(())
    }

    /// Apply the fields present in `request`. A new address is geolocated
    /// before anything is written; if that fails the entry is left untouched.
    pub async fn modify_by_node_id(&self, node_id: &str, request: ModifyRequest) -> PanelResult<()> {
        let request = request.normalized();
        if request.is_empty() {
            return Err(PanelError::NoFieldsToUpdate);
        }
        request.validate()?;

        let geo = match &request.ip {
            Some(ip) => Some(self.locator.locate(ip).await.map_err(|e| {
                warn!(node_id, ip = %ip, error = %e, "Geo lookup failed");
                PanelError::from(e)
            })?),
            None => None,
        };

        let patch = EntryPatch {
            node_name: request.node_name,
            ip: request.ip,
            port: request.port,
            psk: request.psk,
            version: request.version,
            geo,
        };

        let key = node_id.to_string();
        let updated = self
            .with_store(move |store| store.update_by_node_id(&key, &patch))
            .await?;
        if updated == 0 {
            return Err(PanelError::node_not_found());
        }
        info!(node_id, "Entry updated");
        Ok(())
    }

    pub async fn subscription(&self) -> PanelResult<String> {
        let entries = self.with_store(|store| store.list()).await?;
        subscription::render_document(&entries).ok_or(PanelError::EmptySubscription)
    }

    /// Run a blocking store call on the blocking pool.
    async fn with_store<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn EntryStore) -> Result<T, StoreError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|e| StoreError::Database(format!("storage task failed: {e}")))?
    }
}
