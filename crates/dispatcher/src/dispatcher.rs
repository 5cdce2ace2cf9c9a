//! Dispatcher - main loop for fan-out to sinks

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{PublicationBatch, RegistryConfig, SinkConfig, SinkType};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::SinkMetrics;
use crate::sinks::{FileSink, LogSink, MemorySink, NetworkSink, StateStore};

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Sink configurations
    pub sinks: Vec<SinkConfig>,
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    input_rx: mpsc::Receiver<PublicationBatch>,
    store: StateStore,
    registry: Option<RegistryConfig>,
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder
    pub fn new(config: DispatcherConfig, input_rx: mpsc::Receiver<PublicationBatch>) -> Self {
        Self {
            config,
            input_rx,
            store: StateStore::new(),
            registry: None,
        }
    }

    /// Share an existing store with every memory sink
    pub fn with_state_store(mut self, store: StateStore) -> Self {
        self.store = store;
        self
    }

    /// Channel groups in effect; states of disabled groups are removed
    /// from the store when the dispatcher is built
    pub fn with_registry(mut self, registry: RegistryConfig) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build and start the dispatcher
    #[instrument(name = "dispatcher_builder_build", skip(self))]
    pub async fn build(self) -> Result<Dispatcher, DispatcherError> {
        let handles = Self::initialize_handles(&self.config, &self.store).await?;
        if let Some(registry) = &self.registry {
            self.store.remove_disabled_groups(registry);
        }

        Ok(Dispatcher {
            handles,
            input_rx: self.input_rx,
            store: self.store,
        })
    }

    #[instrument(
        name = "dispatcher_initialize_handles",
        skip(config, store),
        fields(sink_count = config.sinks.len())
    )]
    async fn initialize_handles(
        config: &DispatcherConfig,
        store: &StateStore,
    ) -> Result<Vec<SinkHandle>, DispatcherError> {
        let mut handles = Vec::with_capacity(config.sinks.len());
        for sink_config in &config.sinks {
            handles.push(create_sink_handle(sink_config, store).await?);
        }
        Ok(handles)
    }
}

/// Create a SinkHandle from configuration
#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config, store),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
async fn create_sink_handle(
    config: &SinkConfig,
    store: &StateStore,
) -> Result<SinkHandle, DispatcherError> {
    match config.sink_type {
        SinkType::Log => {
            let sink = LogSink::new(&config.name);
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .map_err(|e| {
                    DispatcherError::sink_creation(&config.name, config.sink_type, e.to_string())
                })?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::Network => {
            let sink = NetworkSink::from_params(&config.name, &config.params)
                .await
                .map_err(|e| {
                    DispatcherError::sink_creation(&config.name, config.sink_type, e.to_string())
                })?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::Memory => {
            let sink = MemorySink::with_store(&config.name, store.clone());
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
    }
}

/// The main Dispatcher that fans out publication batches to sinks
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    input_rx: mpsc::Receiver<PublicationBatch>,
    store: StateStore,
}

impl Dispatcher {
    /// Create a dispatcher with custom sink handles (for testing)
    pub fn with_handles(
        handles: Vec<SinkHandle>,
        input_rx: mpsc::Receiver<PublicationBatch>,
    ) -> Self {
        Self {
            handles,
            input_rx,
            store: StateStore::new(),
        }
    }

    /// Store shared by the memory sinks
    pub fn state_store(&self) -> &StateStore {
        &self.store
    }

    /// Number of attached sinks
    pub fn sink_count(&self) -> usize {
        self.handles.len()
    }

    /// Live counters of every sink; stay readable after the dispatcher is spawned
    pub fn sink_metrics(&self) -> Vec<Arc<SinkMetrics>> {
        self.handles.iter().map(|h| h.metrics().clone()).collect()
    }

    /// Run the dispatcher main loop
    ///
    /// Consumes batches from input and fans out to all sinks.
    /// Returns when input channel is closed.
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) {
        info!(sinks = self.handles.len(), "Dispatcher started");

        let mut batch_count: u64 = 0;

        while let Some(batch) = self.input_rx.recv().await {
            if batch.is_empty() {
                continue;
            }
            batch_count += 1;
            self.dispatch_batch(&batch);

            if batch_count % 100 == 0 {
                debug!(batches = batch_count, "Dispatcher progress");
            }
        }

        info!(
            batches = batch_count,
            "Dispatcher input closed, shutting down"
        );

        Self::shutdown_handles(self.handles).await;

        info!("Dispatcher shutdown complete");
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    fn dispatch_batch(&self, batch: &PublicationBatch) {
        for handle in &self.handles {
            handle.try_send(batch.clone());
        }
    }

    async fn shutdown_handles(handles: Vec<SinkHandle>) {
        for handle in handles {
            handle.shutdown().await;
        }
    }
}

/// Convenience function to create a dispatcher from sink configs
#[instrument(name = "dispatcher_create", skip(sink_configs, input_rx))]
pub async fn create_dispatcher(
    sink_configs: Vec<SinkConfig>,
    input_rx: mpsc::Receiver<PublicationBatch>,
) -> Result<Dispatcher, DispatcherError> {
    let config = DispatcherConfig {
        sinks: sink_configs,
    };
    DispatcherBuilder::new(config, input_rx).build().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Publication, StateSink};
    use std::collections::HashMap;

    fn sink_config(name: &str, sink_type: SinkType) -> SinkConfig {
        SinkConfig {
            name: name.to_string(),
            sink_type,
            queue_capacity: 50,
            params: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_dispatcher_fanout() {
        let (input_tx, input_rx) = mpsc::channel(10);

        let store = StateStore::new();
        let handles = vec![
            SinkHandle::spawn(LogSink::new("sink1"), 10),
            SinkHandle::spawn(MemorySink::with_store("sink2", store.clone()), 10),
        ];

        let dispatcher = Dispatcher::with_handles(handles, input_rx);
        let handle = dispatcher.spawn();

        for i in 0..5 {
            let batch = PublicationBatch::new(
                "mock",
                i,
                vec![Publication::connection(i % 2 == 0, i)],
            );
            input_tx.send(batch).await.unwrap();
        }

        drop(input_tx);
        handle.await.unwrap();

        let state = store.get("info.connection").unwrap();
        assert_eq!(state.value, 1.0);
        assert_eq!(state.timestamp_ms, 4);
    }

    #[tokio::test]
    async fn test_create_dispatcher_from_config() {
        let (input_tx, input_rx) = mpsc::channel(10);

        let configs = vec![
            sink_config("test_log", SinkType::Log),
            sink_config("state", SinkType::Memory),
        ];

        let dispatcher = create_dispatcher(configs, input_rx).await.unwrap();
        assert_eq!(dispatcher.sink_count(), 2);
        let store = dispatcher.state_store().clone();
        let sink_metrics = dispatcher.sink_metrics();
        let handle = dispatcher.spawn();

        let batch = PublicationBatch::new("mock", 1, vec![Publication::connection(true, 1)]);
        input_tx.send(batch).await.unwrap();

        drop(input_tx);
        handle.await.unwrap();

        assert_eq!(store.len(), 1);
        for metrics in &sink_metrics {
            let stats = metrics.stats();
            assert_eq!(stats.batches_written, 1, "sink {}", stats.sink);
            assert_eq!(stats.publications_written, 1);
        }
        assert_eq!(sink_metrics[0].sink(), "test_log");
    }

    #[tokio::test]
    async fn test_builder_shares_state_store() {
        let (input_tx, input_rx) = mpsc::channel(10);
        let store = StateStore::new();

        let config = DispatcherConfig {
            sinks: vec![sink_config("a", SinkType::Memory), sink_config("b", SinkType::Memory)],
        };
        let dispatcher = DispatcherBuilder::new(config, input_rx)
            .with_state_store(store.clone())
            .build()
            .await
            .unwrap();
        let handle = dispatcher.spawn();

        input_tx
            .send(PublicationBatch::new("mock", 7, vec![Publication::connection(false, 7)]))
            .await
            .unwrap();
        drop(input_tx);
        handle.await.unwrap();

        assert_eq!(store.get("info.connection").unwrap().value, 0.0);
    }

    #[tokio::test]
    async fn test_builder_removes_disabled_group_states() {
        use contracts::{Axis, ChannelGroup, ChannelId};

        let store = StateStore::new();
        let gyro_x = ChannelId::new(ChannelGroup::Gyroscope, Axis::X);
        let mut seed = MemorySink::with_store("seed", store.clone());
        seed.write(&PublicationBatch::new(
            "previous-run",
            1,
            vec![
                Publication::value(gyro_x, 12.0, 1),
                Publication::average(gyro_x, 11.0, 1),
            ],
        ))
        .await
        .unwrap();

        let mut registry = RegistryConfig::default();
        registry.gyroscope.enabled = false;

        let (_input_tx, input_rx) = mpsc::channel(10);
        let dispatcher = DispatcherBuilder::new(
            DispatcherConfig {
                sinks: vec![sink_config("state", SinkType::Memory)],
            },
            input_rx,
        )
        .with_state_store(store.clone())
        .with_registry(registry)
        .build()
        .await
        .unwrap();

        assert!(dispatcher.state_store().is_empty());
    }

    #[tokio::test]
    async fn test_file_sink_without_path_fails() {
        let (_input_tx, input_rx) = mpsc::channel(10);
        let result = create_dispatcher(vec![sink_config("disk", SinkType::File)], input_rx).await;
        assert!(matches!(result, Err(DispatcherError::SinkCreation { .. })));
    }
}
