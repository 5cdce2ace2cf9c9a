//! Mock Bridge Example
//!
//! Runs the full decode → policy → dispatch path against a canned byte
//! stream and prints the resulting state tree. No hardware required.
//!
//! Run with: cargo run -p demos --bin mock_bridge -- [config.toml]

use std::sync::Arc;
use std::time::Duration;

use config_loader::ConfigLoader;
use contracts::{BridgeBlueprint, Publication, PublicationBatch, SinkConfig, SinkType, TransportEvent};
use dispatcher::{DispatcherBuilder, DispatcherConfig, StateStore};
use ingestion::{encode_raw, DecodeSession, IngestionPipeline, MockByteConfig, MockByteSource};
use publish_engine::{ChannelRegistry, PublishEngine};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init_with_config(observability::ObservabilityConfig {
        log_format: observability::LogFormat::Compact,
        metrics_port: None,
        default_log_level: "info".to_string(),
    })?;

    tracing::info!("Starting Mock Bridge Demo");

    // ==== Stage 1: Use default config or load from file ====
    let blueprint = match std::env::args().nth(1) {
        Some(path) => {
            tracing::info!(path = %path, "Loading bridge config");
            ConfigLoader::load_from_path(std::path::Path::new(&path))?
        }
        None => BridgeBlueprint::default(),
    };

    // ==== Stage 2: Mock byte source ====
    // Angle z sweeps through negative values; noise and odd chunking
    // exercise resynchronization.
    let frames = (0..40)
        .map(|i| encode_raw([0, 0, 2048, 0, 0, 0, 0, 2905, -1000 * (i % 8)]))
        .collect();
    let source = MockByteSource::new(MockByteConfig {
        source_id: "mock".to_string(),
        frames,
        noise_prefix: vec![0x01, 0x55, 0x02],
        chunk_size: 13,
        interval: Duration::from_millis(50),
        repeat: false,
    });

    let mut ingestion = IngestionPipeline::new(256);
    ingestion.register_source(Arc::new(source));
    let events = ingestion
        .take_receiver()
        .ok_or_else(|| anyhow::anyhow!("event receiver already taken"))?;

    // ==== Stage 3: Dispatcher with a shared state store ====
    let mut sinks = blueprint.sinks.clone();
    sinks.push(SinkConfig {
        name: "demo_state".to_string(),
        sink_type: SinkType::Memory,
        queue_capacity: 64,
        params: Default::default(),
    });

    let store = StateStore::new();
    let (batch_tx, batch_rx) = mpsc::channel::<PublicationBatch>(64);
    let dispatcher = DispatcherBuilder::new(DispatcherConfig { sinks }, batch_rx)
        .with_state_store(store.clone())
        .with_registry(blueprint.to_registry_config())
        .build()
        .await?;
    let dispatcher_handle = dispatcher.spawn();

    // ==== Stage 4: Decode and evaluate ====
    let mut session = DecodeSession::with_metrics("mock", ingestion.metrics());
    let mut engine = PublishEngine::new(ChannelRegistry::new(blueprint.to_registry_config()));
    let started = std::time::Instant::now();

    ingestion.start_all();

    while let Ok(event) = events.recv().await {
        let now_ms = started.elapsed().as_millis() as u64;
        let update = session.handle(&event);

        let mut publications = Vec::new();
        if let Some(connected) = update.connection {
            publications.push(Publication::connection(connected, now_ms));
        }
        for sample in &update.samples {
            publications.extend(engine.process(sample, now_ms));
        }
        if !publications.is_empty() {
            batch_tx
                .send(PublicationBatch::new("mock", now_ms, publications))
                .await?;
        }

        if matches!(event.event, TransportEvent::Closed) {
            break;
        }
    }

    // ==== Stage 5: Shutdown and report ====
    ingestion.stop_all();
    drop(batch_tx);
    dispatcher_handle.await?;

    println!("\n=== State Tree ===");
    for (id, state) in store.snapshot() {
        let unit = StateStore::definition(&id).map(|d| d.unit).unwrap_or_default();
        println!("{:<20} {:>12.5} {}", id, state.value, unit);
    }

    let stats = engine.stats();
    println!(
        "\nsamples={} values={} averages={} suppressed={}",
        stats.samples,
        stats.values_published,
        stats.averages_published,
        stats.suppressed_unchanged + stats.suppressed_rate_limited
    );

    Ok(())
}
