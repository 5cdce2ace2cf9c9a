//! Serial port byte source
//!
//! A blocking reader thread per open port. Open and read failures are
//! reported as `Error` followed by `Closed`; reopening is left to the
//! reconnect supervisor.

use std::io::{ErrorKind, Read};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use contracts::{ByteSource, SourceKind, TransportCallback, TransportEvent};
use serialport::SerialPortType;
use tracing::{debug, error, info, trace};

use super::ListenState;
use crate::config::DEFAULT_READ_TIMEOUT;
use crate::error::{IngestionError, Result};

const READ_BUFFER_LEN: usize = 256;

/// Serial port byte source
pub struct SerialSource {
    path: String,
    baud_rate: u32,
    read_timeout: Duration,
    state: Arc<ListenState>,
}

impl SerialSource {
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            read_timeout: DEFAULT_READ_TIMEOUT,
            state: Arc::new(ListenState::default()),
        }
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}

impl ByteSource for SerialSource {
    fn source_id(&self) -> &str {
        &self.path
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Serial
    }

    fn listen(&self, callback: TransportCallback) {
        let Some(generation) = self.state.begin() else {
            return;
        };

        let path = self.path.clone();
        let baud_rate = self.baud_rate;
        let read_timeout = self.read_timeout;
        let state = self.state.clone();

        let spawned = std::thread::Builder::new()
            .name(format!("serial-reader-{generation}"))
            .spawn(move || {
                run_reader(&path, baud_rate, read_timeout, &state, generation, &callback);
                state.finish(generation);
            });

        if let Err(e) = spawned {
            error!(port = %self.path, error = %e, "failed to spawn serial reader");
            self.state.finish(generation);
        }
    }

    fn stop(&self) {
        if self.state.stop() {
            debug!(port = %self.path, "stopping serial source");
        }
    }

    fn is_listening(&self) -> bool {
        self.state.is_listening()
    }
}

fn run_reader(
    path: &str,
    baud_rate: u32,
    read_timeout: Duration,
    state: &ListenState,
    generation: u64,
    callback: &TransportCallback,
) {
    let mut port = match serialport::new(path, baud_rate)
        .timeout(read_timeout)
        .open()
    {
        Ok(port) => port,
        Err(e) => {
            error!(port = %path, baud_rate, error = %e, "failed to open serial port");
            callback(TransportEvent::Error(format!(
                "failed to open serial port {path} at {baud_rate}: {e}"
            )));
            callback(TransportEvent::Closed);
            return;
        }
    };

    debug!(port = %path, baud_rate, "serial port opened");
    callback(TransportEvent::Opened);

    let mut buf = [0u8; READ_BUFFER_LEN];
    while state.is_current(generation) {
        match port.read(&mut buf) {
            Ok(0) => continue,
            Ok(n) => {
                trace!(port = %path, bytes = n, "serial read");
                callback(TransportEvent::Data(Bytes::copy_from_slice(&buf[..n])));
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => continue,
            Err(e) => {
                error!(port = %path, error = %e, "serial port error");
                callback(TransportEvent::Error(e.to_string()));
                break;
            }
        }
    }

    drop(port);
    info!(port = %path, "serial port closed");
    callback(TransportEvent::Closed);
}

/// Serial port listing entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Device path (e.g. `/dev/ttyUSB0`, `COM3`)
    pub path: String,

    /// Human-readable description
    pub description: String,
}

/// Enumerate available serial ports
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports().map_err(|e| IngestionError::PortEnumeration {
        message: e.to_string(),
    })?;

    Ok(ports
        .into_iter()
        .map(|p| PortInfo {
            description: describe(&p.port_type),
            path: p.port_name,
        })
        .collect())
}

fn describe(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => {
            let name = [usb.manufacturer.as_deref(), usb.product.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            if name.is_empty() {
                format!("USB {:04x}:{:04x}", usb.vid, usb.pid)
            } else {
                format!("USB {name} ({:04x}:{:04x})", usb.vid, usb.pid)
            }
        }
        SerialPortType::PciPort => "PCI".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        SerialPortType::Unknown => "serial".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_open_failure_reports_error_then_closed() {
        let source = SerialSource::new("/dev/definitely-not-a-witmotion-port", 9600);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();

        source.listen(Arc::new(move |event| sink.lock().unwrap().push(event)));

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while source.is_listening() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(!source.is_listening());

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], TransportEvent::Error(_)));
        assert_eq!(events[1], TransportEvent::Closed);
    }

    #[test]
    fn test_describe_usb() {
        let usb = SerialPortType::UsbPort(serialport::UsbPortInfo {
            vid: 0x1a86,
            pid: 0x7523,
            serial_number: None,
            manufacturer: Some("QinHeng".into()),
            product: None,
        });
        assert_eq!(describe(&usb), "USB QinHeng (1a86:7523)");
        assert_eq!(describe(&SerialPortType::Unknown), "serial");
    }
}
