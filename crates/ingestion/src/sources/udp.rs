//! UDP test-mode byte source
//!
//! Each datagram is delivered as one `Data` chunk. No `Opened` event is
//! emitted on bind: the first datagram marks the connection live.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use contracts::{ByteSource, SourceKind, TransportCallback, TransportEvent};
use tokio::net::UdpSocket;
use tracing::{debug, error, trace};

use super::ListenState;

const DATAGRAM_BUFFER_LEN: usize = 2048;
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// UDP byte source
pub struct UdpSource {
    source_id: String,
    bind_addr: String,
    local_addr: Arc<Mutex<Option<SocketAddr>>>,
    state: Arc<ListenState>,
}

impl UdpSource {
    pub fn new(bind_addr: impl Into<String>) -> Self {
        let bind_addr = bind_addr.into();
        Self {
            source_id: format!("udp://{bind_addr}"),
            bind_addr,
            local_addr: Arc::new(Mutex::new(None)),
            state: Arc::new(ListenState::default()),
        }
    }

    /// Address actually bound, once listening
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.lock().ok().and_then(|addr| *addr)
    }
}

impl ByteSource for UdpSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Udp
    }

    fn listen(&self, callback: TransportCallback) {
        let Some(generation) = self.state.begin() else {
            return;
        };

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                error!(addr = %self.bind_addr, error = %e, "UDP source needs a tokio runtime");
                callback(TransportEvent::Error(e.to_string()));
                callback(TransportEvent::Closed);
                self.state.finish(generation);
                return;
            }
        };

        let bind_addr = self.bind_addr.clone();
        let local_addr = self.local_addr.clone();
        let state = self.state.clone();

        handle.spawn(async move {
            run_socket(&bind_addr, &local_addr, &state, generation, &callback).await;
            if let Ok(mut addr) = local_addr.lock() {
                *addr = None;
            }
            state.finish(generation);
        });
    }

    fn stop(&self) {
        if self.state.stop() {
            debug!(addr = %self.bind_addr, "stopping UDP source");
        }
    }

    fn is_listening(&self) -> bool {
        self.state.is_listening()
    }
}

async fn run_socket(
    bind_addr: &str,
    local_addr: &Mutex<Option<SocketAddr>>,
    state: &ListenState,
    generation: u64,
    callback: &TransportCallback,
) {
    let socket = match UdpSocket::bind(bind_addr).await {
        Ok(socket) => socket,
        Err(e) => {
            error!(addr = %bind_addr, error = %e, "failed to start UDP server");
            callback(TransportEvent::Error(format!(
                "failed to bind UDP {bind_addr}: {e}"
            )));
            callback(TransportEvent::Closed);
            return;
        }
    };

    let bound = socket.local_addr().ok();
    if let Ok(mut addr) = local_addr.lock() {
        *addr = bound;
    }
    debug!(addr = ?bound, "UDP server listening");

    let mut buf = vec![0u8; DATAGRAM_BUFFER_LEN];
    while state.is_current(generation) {
        match tokio::time::timeout(STOP_POLL_INTERVAL, socket.recv_from(&mut buf)).await {
            Err(_) => continue,
            Ok(Ok((n, peer))) => {
                trace!(%peer, bytes = n, "UDP datagram");
                callback(TransportEvent::Data(Bytes::copy_from_slice(&buf[..n])));
            }
            Ok(Err(e)) => {
                error!(addr = %bind_addr, error = %e, "UDP server error");
                callback(TransportEvent::Error(e.to_string()));
                break;
            }
        }
    }

    debug!(addr = %bind_addr, "UDP server closed");
    callback(TransportEvent::Closed);
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn wait_for_addr(source: &UdpSource) -> SocketAddr {
        for _ in 0..100 {
            if let Some(addr) = source.local_addr() {
                return addr;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("UDP source never bound");
    }

    #[tokio::test]
    async fn test_datagrams_become_data_events() {
        let source = UdpSource::new("127.0.0.1:0");
        let (tx, rx) = async_channel::unbounded();
        source.listen(Arc::new(move |event| {
            let _ = tx.try_send(event);
        }));

        let addr = wait_for_addr(&source).await;
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(&[0x55, 0x61, 0x01], addr).await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, TransportEvent::Data(Bytes::from_static(&[0x55, 0x61, 0x01])));

        source.stop();
        let closed = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(closed, TransportEvent::Closed);
        assert!(!source.is_listening());
    }

    #[test]
    fn test_listen_without_runtime_reports_error() {
        let source = UdpSource::new("127.0.0.1:0");
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        source.listen(Arc::new(move |event| sink.lock().unwrap().push(event)));

        assert!(!source.is_listening());
        let events = events.lock().unwrap();
        assert!(matches!(events[0], TransportEvent::Error(_)));
        assert_eq!(events[1], TransportEvent::Closed);
    }
}
