use tracing::trace;

use super::DeviceInterface;

use crate::error::{KmError, KmResult};
use std::io::{Read, Write};
use std::time::Duration;

pub type ComPort = String;
pub type BaudRate = u32;

/// OS serial driver backed interface
pub(crate) struct SerialPortDevice {
    name: ComPort,
    serial_port: Box<dyn serialport::SerialPort>,
}

impl SerialPortDevice {
    pub fn new(port: ComPort, baud: BaudRate, timeout: Duration) -> KmResult<SerialPortDevice> {
        let serial_port = serialport::new(port.as_str(), baud)
            .timeout(timeout)
            .open()
            .map_err(|e| KmError::Communication(format!("{}: {}", port, e)))?;

        Ok(SerialPortDevice {
            name: port,
            serial_port,
        })
    }
}

fn is_timeout(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
    )
}

impl DeviceInterface for SerialPortDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn bytes_available(&mut self) -> KmResult<usize> {
        let count = self
            .serial_port
            .bytes_to_read()
            .map_err(|e| KmError::Communication(format!("{:?}", e)))?;
        Ok(count as usize)
    }

    fn receive(&mut self, max: usize) -> KmResult<Vec<u8>> {
        let mut buffer = vec![0; max];

        let size = self
            .serial_port
            .read(&mut buffer)
            // Timeout error is fine, just continue
            .or_else(|e| if is_timeout(&e) { Ok(0) } else { Err(e) })
            .map_err(|e| KmError::Communication(format!("{:?}", e)))?;

        buffer.truncate(size);
        trace!("Received bytes {:?}", buffer);
        Ok(buffer)
    }

    fn send(&mut self, bytes: &[u8]) -> KmResult<()> {
        self.serial_port
            .write_all(bytes)
            .map_err(|e| KmError::Communication(format!("{:?}", e)))?;
        self.serial_port
            .flush()
            .map_err(|e| KmError::Communication(format!("Failed to flush: {:?}", e)))?;
        trace!("Sent bytes {:?}", bytes);
        Ok(())
    }
}
