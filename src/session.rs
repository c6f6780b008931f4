use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info};

use crate::command::{Command, wire_bytes};
use crate::constants::MAX_READ_SIZE;
use crate::error::{KmError, KmResult};
use crate::interface::DeviceInterface;
use crate::interface::serialport::{BaudRate, ComPort, SerialPortDevice};

#[derive(Debug, Clone)]
pub struct PortParams {
    pub port: ComPort,
    pub baud: BaudRate,
    pub timeout: Duration,
}

/// Exclusive ownership of one open serial connection.
///
/// The reader and writer threads share a session through an `Arc`; every
/// transport call goes through the internal mutex, so reads and writes never
/// interleave on the device. The device is released exactly once, by the
/// first call to [`PortSession::close`] or on drop.
pub struct PortSession {
    name: String,
    baud: BaudRate,
    device: Mutex<Option<Box<dyn DeviceInterface>>>,
}

impl PortSession {
    pub fn open(params: &PortParams) -> KmResult<Self> {
        let device = SerialPortDevice::new(params.port.clone(), params.baud, params.timeout)?;
        info!(
            "Opened {} at {} baud (timeout {:?})",
            params.port, params.baud, params.timeout
        );
        Ok(Self::from_device(Box::new(device), params.baud))
    }

    /// Wrap an already open device
    pub fn from_device(device: Box<dyn DeviceInterface>, baud: BaudRate) -> Self {
        PortSession {
            name: device.name().to_owned(),
            baud,
            device: Mutex::new(Some(device)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn baud(&self) -> BaudRate {
        self.baud
    }

    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Box<dyn DeviceInterface>>> {
        // A panic on another thread does not leave the device half-written
        self.device.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_device<T>(
        &self,
        f: impl FnOnce(&mut dyn DeviceInterface) -> KmResult<T>,
    ) -> KmResult<T> {
        let mut guard = self.lock();
        match guard.as_mut() {
            Some(device) => f(device.as_mut()),
            None => Err(KmError::PortClosed(self.name.clone())),
        }
    }

    fn send_bytes(&self, bytes: &[u8]) -> KmResult<usize> {
        self.with_device(|device| device.send(bytes))?;
        debug!("Sent {:?} to {}", String::from_utf8_lossy(bytes), self.name);
        Ok(bytes.len())
    }

    /// Send `text` as one newline-terminated line. Returns the bytes written.
    pub fn send_line(&self, text: &str) -> KmResult<usize> {
        self.send_bytes(&wire_bytes(text))
    }

    pub fn send_command(&self, command: &Command) -> KmResult<()> {
        self.send_bytes(&command.to_wire()).map(|_| ())
    }

    /// Read whatever is waiting, without blocking when nothing is.
    pub fn poll(&self) -> KmResult<Vec<u8>> {
        self.with_device(|device| match device.bytes_available()? {
            0 => Ok(Vec::new()),
            available => device.receive(available.min(MAX_READ_SIZE)),
        })
    }

    /// Release the device. Returns `true` only for the call that closed it.
    pub fn close(&self) -> bool {
        match self.lock().take() {
            Some(device) => {
                drop(device);
                info!("Closed {}", self.name);
                true
            }
            None => false,
        }
    }
}

impl Drop for PortSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::command::MouseButton;
    use crate::interface::mock::MockDevice;

    #[test]
    fn writes_are_newline_terminated() {
        let mock = MockDevice::default();
        let session = PortSession::from_device(mock.handle(), 115200);

        assert_eq!(session.send_line("km.getpos()").unwrap(), 12);
        session
            .send_command(&Command::Button {
                button: MouseButton::Middle,
                pressed: true,
            })
            .unwrap();

        assert_eq!(mock.written(), "km.getpos()\nkm.middle(1)\n");
    }

    #[test]
    fn poll_returns_nothing_when_idle() {
        let mock = MockDevice::default();
        let session = PortSession::from_device(mock.handle(), 115200);

        assert!(session.poll().unwrap().is_empty());
        mock.feed(b"hello\n");
        assert_eq!(session.poll().unwrap(), b"hello\n");
        assert!(session.poll().unwrap().is_empty());
    }

    #[test]
    fn close_releases_the_device_exactly_once() {
        let mock = MockDevice::default();
        let session = Arc::new(PortSession::from_device(mock.handle(), 115200));

        let closers: Vec<_> = (0..4)
            .map(|_| {
                let session = Arc::clone(&session);
                std::thread::spawn(move || session.close())
            })
            .collect();
        let closed: usize = closers
            .into_iter()
            .map(|handle| usize::from(handle.join().unwrap()))
            .sum();

        assert_eq!(closed, 1);
        assert!(!session.is_open());
        drop(session);
        assert_eq!(mock.drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn io_after_close_reports_port_closed() {
        let mock = MockDevice::default();
        let session = PortSession::from_device(mock.handle(), 115200);
        session.close();

        assert!(matches!(
            session.send_line("km.left(1)"),
            Err(KmError::PortClosed(name)) if name == "mock0"
        ));
        assert!(matches!(session.poll(), Err(KmError::PortClosed(_))));
    }
}
