pub mod serialport;

#[cfg(test)]
pub(crate) mod mock;

use std::fmt;

use tracing::debug;

use crate::error::{KmError, KmResult};

/// Full-duplex byte stream to the firmware. Dropping the value closes it.
pub trait DeviceInterface: Send {
    /// Device path or name the interface was opened on
    fn name(&self) -> &str;

    /// Number of inbound bytes that can be read without waiting
    fn bytes_available(&mut self) -> KmResult<usize>;

    /// Read up to `max` bytes. A timeout reads as an empty buffer.
    fn receive(&mut self, max: usize) -> KmResult<Vec<u8>>;

    /// Write every byte of `bytes`
    fn send(&mut self, bytes: &[u8]) -> KmResult<()>;
}

/// A serial interface offered by the OS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescriptor {
    pub name: String,
    pub description: Option<String>,
}

impl PortDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        PortDescriptor {
            name: name.into(),
            description: None,
        }
    }
}

impl fmt::Display for PortDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{} - {}", self.name, description),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Enumerate serial ports. Finding none is not an error.
pub fn list_ports() -> KmResult<Vec<PortDescriptor>> {
    let ports = ::serialport::available_ports().map_err(|e| {
        KmError::Configuration(format!("Could not get available ports. Err {:?}", e))
    })?;

    let ports: Vec<PortDescriptor> = ports
        .into_iter()
        .map(|port| PortDescriptor {
            description: describe_port_type(&port.port_type),
            name: port.port_name,
        })
        .collect();

    debug!("Found {} serial port(s)", ports.len());
    Ok(ports)
}

fn describe_port_type(port_type: &::serialport::SerialPortType) -> Option<String> {
    match port_type {
        ::serialport::SerialPortType::UsbPort(info) => Some(match &info.product {
            Some(product) => format!("{} ({:04x}:{:04x})", product, info.vid, info.pid),
            None => format!("USB {:04x}:{:04x}", info.vid, info.pid),
        }),
        ::serialport::SerialPortType::BluetoothPort => Some("Bluetooth".to_owned()),
        ::serialport::SerialPortType::PciPort => Some("PCI".to_owned()),
        ::serialport::SerialPortType::Unknown => None,
    }
}
