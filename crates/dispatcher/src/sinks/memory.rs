//! MemorySink - keeps the latest value of every state in memory
//!
//! The store is shared: clones of a [`StateStore`] observe the same map, so a
//! caller can read what the sink worker wrote.

use contracts::{
    all_state_definitions, state_definitions, ChannelGroup, ContractError, PublicationBatch,
    RegistryConfig, StateDefinition, StateSink,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, instrument};

/// Last written value of one state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoredState {
    pub value: f64,
    pub timestamp_ms: u64,
    pub is_average: bool,
}

/// Shared state tree keyed by state id
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    inner: Arc<RwLock<HashMap<String, StoredState>>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, StoredState>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, StoredState>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Latest value of a state
    pub fn get(&self, state_id: &str) -> Option<StoredState> {
        self.read().get(state_id).copied()
    }

    /// Sorted copy of every state written so far
    pub fn snapshot(&self) -> BTreeMap<String, StoredState> {
        self.read()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Metadata for a known state id
    pub fn definition(state_id: &str) -> Option<StateDefinition> {
        all_state_definitions()
            .into_iter()
            .find(|d| d.id == state_id)
    }

    /// Delete the value and average states of every disabled group
    ///
    /// Returns how many states were removed.
    pub fn remove_disabled_groups(&self, config: &RegistryConfig) -> usize {
        let mut map = self.write();
        let before = map.len();
        for group in ChannelGroup::ALL {
            if config.group(group).enabled {
                continue;
            }
            for definition in state_definitions(group) {
                map.remove(&definition.id);
            }
        }
        let removed = before - map.len();
        if removed > 0 {
            info!(removed, "Removed states of disabled channel groups");
        }
        removed
    }

    fn apply(&self, batch: &PublicationBatch) {
        let mut map = self.write();
        for publication in &batch.publications {
            map.insert(
                publication.state_id.clone(),
                StoredState {
                    value: publication.value,
                    timestamp_ms: publication.timestamp_ms,
                    is_average: publication.is_average,
                },
            );
        }
    }
}

/// Sink that writes into a [`StateStore`]
pub struct MemorySink {
    name: String,
    store: StateStore,
}

impl MemorySink {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_store(name, StateStore::new())
    }

    pub fn with_store(name: impl Into<String>, store: StateStore) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }
}

impl StateSink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "memory_sink_write",
        skip(self, batch),
        fields(sink = %self.name, publications = batch.len())
    )]
    async fn write(&mut self, batch: &PublicationBatch) -> Result<(), ContractError> {
        self.store.apply(batch);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(sink = %self.name, states = self.store.len(), "MemorySink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Axis, ChannelGroup, ChannelId, Publication};

    #[tokio::test]
    async fn test_latest_value_wins() {
        let mut sink = MemorySink::new("state");
        let channel = ChannelId::new(ChannelGroup::Acceleration, Axis::X);

        sink.write(&PublicationBatch::new(
            "mock",
            1,
            vec![Publication::value(channel, 0.5, 1)],
        ))
        .await
        .unwrap();
        sink.write(&PublicationBatch::new(
            "mock",
            2,
            vec![
                Publication::average(channel, 0.75, 2),
                Publication::value(channel, 1.0, 2),
            ],
        ))
        .await
        .unwrap();

        let store = sink.store();
        assert_eq!(store.len(), 2);
        let value = store.get("acceleration.x").unwrap();
        assert_eq!(value.value, 1.0);
        assert_eq!(value.timestamp_ms, 2);
        assert!(store.get("acceleration.xAvg").unwrap().is_average);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = StateStore::new();
        let mut sink = MemorySink::with_store("state", store.clone());
        assert!(store.is_empty());

        sink.write(&PublicationBatch::new(
            "mock",
            5,
            vec![Publication::connection(true, 5)],
        ))
        .await
        .unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.keys().collect::<Vec<_>>(), vec!["info.connection"]);
    }

    #[test]
    fn test_definition_lookup() {
        let def = StateStore::definition("gyroscope.zAvg").unwrap();
        assert_eq!(def.unit, "°/s");
        assert!(StateStore::definition("gyroscope.w").is_none());
    }

    #[tokio::test]
    async fn test_disabled_group_states_are_removed() {
        let store = StateStore::new();
        let mut sink = MemorySink::with_store("state", store.clone());
        let ax = ChannelId::new(ChannelGroup::Acceleration, Axis::X);
        let gz = ChannelId::new(ChannelGroup::Gyroscope, Axis::Z);

        sink.write(&PublicationBatch::new(
            "mock",
            1,
            vec![
                Publication::value(ax, 0.5, 1),
                Publication::average(ax, 0.4, 1),
                Publication::value(gz, 3.0, 1),
                Publication::connection(true, 1),
            ],
        ))
        .await
        .unwrap();

        let mut config = RegistryConfig::default();
        config.acceleration.enabled = false;

        assert_eq!(store.remove_disabled_groups(&config), 2);
        assert!(store.get("acceleration.x").is_none());
        assert!(store.get("acceleration.xAvg").is_none());
        assert!(store.get("gyroscope.z").is_some());
        assert!(store.get("info.connection").is_some());
        assert_eq!(store.remove_disabled_groups(&config), 0);
    }
}
