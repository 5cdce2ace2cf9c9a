//! # Integration Tests
//!
//! Integration and end-to-end tests.
//!
//! Covers:
//! - Config file → registry wiring
//! - Mock e2e runs without hardware
//! - UDP loopback through the ingestion pipeline

#[cfg(test)]
mod contract_tests {
    use contracts::{all_state_definitions, ChannelId};

    #[test]
    fn test_every_channel_has_value_and_average_definition() {
        let defs = all_state_definitions();
        for channel in ChannelId::ALL {
            assert!(defs.iter().any(|d| d.id == channel.state_id()));
            assert!(defs.iter().any(|d| d.id == channel.average_state_id()));
        }
    }
}

#[cfg(test)]
mod config_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{Axis, ChannelGroup, ChannelId};
    use publish_engine::{ChannelRegistry, PublishEngine};
    use std::io::Write;

    const BRIDGE_TOML: &str = r#"
        [connection]
        serial_port = "/dev/ttyUSB0"
        baud_rate = 115200

        [gyroscope]
        enabled = false

        [angle]
        update_interval_ms = 0
        average_window_ms = 0
        normalize_360 = { z = true }

        [[sinks]]
        name = "state"
        sink_type = "memory"
    "#;

    #[test]
    fn test_config_file_drives_registry() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(BRIDGE_TOML.as_bytes()).unwrap();

        let blueprint = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(blueprint.connection.baud_rate, 115200);

        let registry = ChannelRegistry::new(blueprint.to_registry_config());
        assert!(!registry.is_enabled(ChannelGroup::Gyroscope));
        assert_eq!(registry.active_channels().count(), 6);

        let angle_z = ChannelId::new(ChannelGroup::Angle, Axis::Z);
        assert!(registry.settings(angle_z).normalize_360);
    }

    #[test]
    fn test_zero_interval_publishes_every_change() {
        let blueprint = ConfigLoader::load_from_str(BRIDGE_TOML, ConfigFormat::Toml).unwrap();
        let mut engine = PublishEngine::new(ChannelRegistry::new(blueprint.to_registry_config()));

        let mut sample = contracts::DecodedSample::default();
        sample.angle.z = -5.0;
        let first = engine.process(&sample, 0);
        let angle_z = first.iter().find(|p| p.state_id == "angle.z").unwrap();
        assert_eq!(angle_z.value, 355.0);

        sample.angle.z = -10.0;
        let second = engine.process(&sample, 1);
        let avg = second.iter().find(|p| p.state_id == "angle.zAvg").unwrap();
        // Zero-length window keeps only the entry at `now`
        assert_eq!(avg.value, 350.0);
        assert!(second.iter().any(|p| p.state_id == "angle.z" && p.value == 350.0));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{
        Axis, ByteSource, ChannelGroup, ChannelId, Publication, PublicationBatch, SinkConfig,
        SinkType, TransportEvent,
    };
    use dispatcher::{DispatcherBuilder, DispatcherConfig, StateStore};
    use ingestion::{
        decode_frame, encode_raw, DecodeSession, IngestionPipeline, MockByteConfig,
        MockByteSource, UdpSource,
    };
    use publish_engine::{ChannelRegistry, PublishEngine};
    use tokio::sync::mpsc;

    const ANGLE_Y_RAW: i16 = 2905;

    fn angle_y() -> ChannelId {
        ChannelId::new(ChannelGroup::Angle, Axis::Y)
    }

    fn expected_angle_y() -> f64 {
        ANGLE_Y_RAW as f64 / 32768.0 * 180.0
    }

    fn canonical_frame() -> contracts::Frame {
        encode_raw([-102, 0, 2048, 0, 0, 0, 0, ANGLE_Y_RAW, 0])
    }

    fn memory_sink(name: &str) -> SinkConfig {
        SinkConfig {
            name: name.to_string(),
            sink_type: SinkType::Memory,
            queue_capacity: 64,
            params: HashMap::new(),
        }
    }

    /// End-to-end test: MockByteSource -> DecodeSession -> PublishEngine -> Dispatcher
    ///
    /// The mock stream starts with noise and is cut into 7-byte chunks, so
    /// the resynchronizer has to find the marker and stitch frames together.
    #[tokio::test]
    async fn test_e2e_mock_pipeline() {
        let source = MockByteSource::new(MockByteConfig {
            source_id: "mock".to_string(),
            frames: vec![canonical_frame(); 5],
            noise_prefix: vec![0x00, 0x55, 0x13, 0x61],
            chunk_size: 7,
            interval: Duration::from_millis(1),
            repeat: false,
        });

        let mut ingestion = IngestionPipeline::new(256);
        ingestion.register_source(Arc::new(source));
        let events = ingestion.take_receiver().unwrap();

        let store = StateStore::new();
        let (batch_tx, batch_rx) = mpsc::channel::<PublicationBatch>(64);
        let dispatcher = DispatcherBuilder::new(
            DispatcherConfig {
                sinks: vec![memory_sink("state")],
            },
            batch_rx,
        )
        .with_state_store(store.clone())
        .build()
        .await
        .unwrap();
        let dispatcher_handle = dispatcher.spawn();

        let mut session = DecodeSession::with_metrics("mock", ingestion.metrics());
        let mut engine = PublishEngine::new(ChannelRegistry::default());
        let mut samples = 0u64;
        let mut first_batch_with_values: Option<PublicationBatch> = None;

        ingestion.start_all();

        let run = async {
            let now_ms = 1_000;
            while let Ok(event) = events.recv().await {
                let closed = matches!(event.event, TransportEvent::Closed);
                let update = session.handle(&event);

                let mut publications = Vec::new();
                if let Some(connected) = update.connection {
                    publications.push(Publication::connection(connected, now_ms));
                }
                for sample in &update.samples {
                    samples += 1;
                    publications.extend(engine.process(sample, now_ms));
                }

                if !publications.is_empty() {
                    let batch = PublicationBatch::new("mock", now_ms, publications);
                    if first_batch_with_values.is_none() && batch.len() > 1 {
                        first_batch_with_values = Some(batch.clone());
                    }
                    batch_tx.send(batch).await.unwrap();
                }

                if closed {
                    break;
                }
            }
        };

        tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .expect("mock stream did not close in time");

        ingestion.stop_all();
        drop(batch_tx);
        tokio::time::timeout(Duration::from_secs(2), dispatcher_handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(samples, 5);

        // First publish carries the value but no average
        let first = first_batch_with_values.unwrap();
        assert!(first
            .publications
            .iter()
            .all(|p| p.state_id != angle_y().average_state_id()));

        let value = store.get(&angle_y().state_id()).unwrap();
        assert!((value.value - expected_angle_y()).abs() < 1e-9);
        assert!(store.get(&angle_y().average_state_id()).is_none());

        let ax = store.get("acceleration.x").unwrap();
        assert!((ax.value - (-102.0 / 32768.0 * 16.0)).abs() < 1e-12);

        // Stream closed at the end
        assert_eq!(store.get("info.connection").unwrap().value, 0.0);

        let metrics = ingestion.metrics().snapshot();
        assert_eq!(metrics.frames_decoded, 5);
        assert!(metrics.bytes_discarded >= 4);
    }

    /// UDP test transport: datagrams flow through the pipeline and decode
    #[tokio::test]
    async fn test_udp_loopback() {
        let source = Arc::new(UdpSource::new("127.0.0.1:0"));
        let source_id = source.source_id().to_string();

        let mut ingestion = IngestionPipeline::new(64);
        ingestion.register_source(source.clone());
        let events = ingestion.take_receiver().unwrap();
        ingestion.start_source(&source_id).unwrap();

        let mut addr = None;
        for _ in 0..100 {
            addr = source.local_addr();
            if addr.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let addr = addr.expect("udp source did not bind");

        let sender = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let bytes = canonical_frame().to_bytes();
        // Split across two datagrams
        sender.send_to(&bytes[..9], addr).await.unwrap();
        sender.send_to(&bytes[9..], addr).await.unwrap();

        let mut session = DecodeSession::new(source_id.clone());
        let mut engine = PublishEngine::new(ChannelRegistry::default());
        let mut connected = None;
        let mut publications = Vec::new();

        let run = async {
            while publications.is_empty() {
                let event = events.recv().await.unwrap();
                assert_eq!(event.source_id.as_ref(), source_id.as_str());
                let update = session.handle(&event);
                if update.connection.is_some() {
                    connected = update.connection;
                }
                for sample in &update.samples {
                    publications.extend(engine.process(sample, 0));
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .expect("no frame received over udp");

        ingestion.stop_all();

        // First datagram marks the connection live
        assert_eq!(connected, Some(true));
        let value = publications
            .iter()
            .find(|p| p.state_id == angle_y().state_id())
            .unwrap();
        assert!((value.value - expected_angle_y()).abs() < 1e-9);
    }

    /// A consumer that falls behind loses whole chunks, never frame integrity
    #[test]
    fn test_backpressure_never_splices_frames() {
        let positive = encode_raw([100; 9]);
        let negative = encode_raw([-200; 9]);
        let frames = (0..60)
            .map(|i| if i % 2 == 0 { positive } else { negative })
            .collect();

        let source = MockByteSource::new(MockByteConfig {
            source_id: "mock".to_string(),
            frames,
            noise_prefix: Vec::new(),
            chunk_size: 7,
            interval: Duration::ZERO,
            repeat: false,
        });

        let mut ingestion = IngestionPipeline::new(2);
        ingestion.register_source(Arc::new(source));
        let events = ingestion.take_receiver().unwrap();
        ingestion.start_all();

        // Let the queue overflow before draining it
        std::thread::sleep(Duration::from_millis(100));

        let mut session = DecodeSession::with_metrics("mock", ingestion.metrics());
        let mut samples = Vec::new();
        loop {
            let event = events.recv_blocking().unwrap();
            let closed = matches!(event.event, TransportEvent::Closed);
            samples.extend(session.handle(&event).samples);
            if closed {
                break;
            }
        }

        let genuine = [decode_frame(&positive), decode_frame(&negative)];
        for sample in &samples {
            assert!(genuine.contains(sample), "spliced frame decoded: {sample:?}");
        }
        assert!(ingestion.metrics().snapshot().events_dropped > 0);
        assert!(!session.is_connected());
    }

    /// Policy timeline for one channel through the whole engine
    #[test]
    fn test_policy_timeline() {
        let mut engine = PublishEngine::new(ChannelRegistry::default());
        let mut sample = contracts::DecodedSample::default();
        let find = |pubs: &[Publication], id: &str| {
            pubs.iter().find(|p| p.state_id == id).map(|p| p.value)
        };

        sample.angle.y = 10.0;
        let t0 = engine.process(&sample, 0);
        assert_eq!(find(&t0, "angle.y"), Some(10.0));
        assert_eq!(find(&t0, "angle.yAvg"), None);

        // Changed before the interval: recorded, not published
        sample.angle.y = 20.0;
        let t1 = engine.process(&sample, 500);
        assert_eq!(find(&t1, "angle.y"), None);

        // Interval elapsed: the rate-limited sample is in the average
        sample.angle.y = 30.0;
        let t2 = engine.process(&sample, 1_000);
        assert_eq!(find(&t2, "angle.y"), Some(30.0));
        assert_eq!(find(&t2, "angle.yAvg"), Some(25.0));

        // Unchanged within the heartbeat: nothing at all
        let t3 = engine.process(&sample, 30_000);
        assert!(t3.is_empty());

        // Heartbeat: unchanged but republished after 60 s
        let t4 = engine.process(&sample, 61_000);
        assert_eq!(find(&t4, "angle.y"), Some(30.0));
        assert_eq!(find(&t4, "angle.yAvg"), Some(30.0));
    }
}
