//! Serial port link (USB-UART bridge to the board)

use std::io::{Read, Write};
use std::time::Duration;

use async_trait::async_trait;
use serialport::{SerialPort, SerialPortType};
use tracing::debug;

use crate::error::TransportError;
use crate::link::ByteLink;

/// Default baud rate of the board firmware
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// How long a single byte read may wait before the board counts as gone
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Serial port link
///
/// Port calls block for up to [`READ_TIMEOUT`], so each one runs on tokio's
/// blocking pool and the session task keeps serving the socket meanwhile.
pub struct SerialLink {
    port: Option<Box<dyn SerialPort>>,
    path: String,
}

impl SerialLink {
    /// Open `path` at `baud_rate`
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, TransportError> {
        let port = serialport::new(path, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| TransportError::Link(format!("open {path}: {e}")))?;
        debug!("Opened serial link {} at {} baud", path, baud_rate);
        Ok(Self {
            port: Some(port),
            path: path.to_string(),
        })
    }

    /// Wrap an already configured port
    pub fn from_port(port: Box<dyn SerialPort>) -> Self {
        let path = port.name().unwrap_or_else(|| "serial".to_string());
        Self {
            port: Some(port),
            path,
        }
    }

    /// Run `op` against the port on the blocking pool
    async fn blocking<R, E, F>(&mut self, op: F) -> Result<R, TransportError>
    where
        R: Send + 'static,
        E: Send + 'static,
        TransportError: From<E>,
        F: FnOnce(&mut dyn SerialPort) -> Result<R, E> + Send + 'static,
    {
        let mut port = self
            .port
            .take()
            .ok_or_else(|| TransportError::Link(format!("{} lost", self.path)))?;
        let (port, result) = tokio::task::spawn_blocking(move || {
            let result = op(port.as_mut());
            (port, result)
        })
        .await
        .map_err(|e| TransportError::Link(format!("serial task failed: {e}")))?;
        self.port = Some(port);
        Ok(result?)
    }
}

#[async_trait]
impl ByteLink for SerialLink {
    async fn write_byte(&mut self, byte: u8) -> Result<(), TransportError> {
        self.blocking(move |port| {
            port.write_all(&[byte])?;
            port.flush()
        })
        .await
    }

    async fn read_byte(&mut self) -> Result<u8, TransportError> {
        self.blocking(|port| {
            let mut buf = [0u8; 1];
            port.read_exact(&mut buf).map(|()| buf[0])
        })
        .await
    }

    async fn discard_input(&mut self) -> Result<(), TransportError> {
        self.blocking(|port| port.clear(serialport::ClearBuffer::Input))
            .await
    }

    fn describe(&self) -> String {
        self.path.clone()
    }
}

/// A serial port candidate found on this machine
#[derive(Debug, Clone)]
pub struct PortCandidate {
    /// Device path (e.g. `/dev/ttyUSB0`)
    pub path: String,
    /// USB vendor/product id if the port is a USB bridge
    pub usb_ids: Option<(u16, u16)>,
    /// Product string reported by the bridge
    pub product: Option<String>,
}

/// List serial ports, USB bridges first
pub fn list_ports() -> Result<Vec<PortCandidate>, TransportError> {
    let mut ports: Vec<PortCandidate> = serialport::available_ports()?
        .into_iter()
        .map(|p| match p.port_type {
            SerialPortType::UsbPort(info) => PortCandidate {
                path: p.port_name,
                usb_ids: Some((info.vid, info.pid)),
                product: info.product,
            },
            _ => PortCandidate {
                path: p.port_name,
                usb_ids: None,
                product: None,
            },
        })
        .collect();
    ports.sort_by_key(|p| p.usb_ids.is_none());
    Ok(ports)
}
