#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use kmbench::interface::DeviceInterface;
use kmbench::{KmResult, PortSession};

/// Firmware stand-in: tests push what the device "prints" and inspect what
/// the host wrote.
#[derive(Clone, Default)]
pub struct Loopback {
    inbound: Arc<Mutex<VecDeque<u8>>>,
    outbound: Arc<Mutex<Vec<u8>>>,
    closes: Arc<AtomicUsize>,
}

impl Loopback {
    pub fn session(&self) -> Arc<PortSession> {
        Arc::new(PortSession::from_device(
            Box::new(LoopbackHandle(self.clone())),
            115200,
        ))
    }

    pub fn device_prints(&self, bytes: &[u8]) {
        self.inbound.lock().unwrap().extend(bytes);
    }

    pub fn host_wrote(&self) -> String {
        String::from_utf8(self.outbound.lock().unwrap().clone()).unwrap()
    }

    pub fn drained(&self) -> bool {
        self.inbound.lock().unwrap().is_empty()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

struct LoopbackHandle(Loopback);

impl Drop for LoopbackHandle {
    fn drop(&mut self) {
        self.0.closes.fetch_add(1, Ordering::SeqCst);
    }
}

impl DeviceInterface for LoopbackHandle {
    fn name(&self) -> &str {
        "loop0"
    }

    fn bytes_available(&mut self) -> KmResult<usize> {
        Ok(self.0.inbound.lock().unwrap().len())
    }

    fn receive(&mut self, max: usize) -> KmResult<Vec<u8>> {
        let mut inbound = self.0.inbound.lock().unwrap();
        let take = max.min(inbound.len());
        Ok(inbound.drain(..take).collect())
    }

    fn send(&mut self, bytes: &[u8]) -> KmResult<()> {
        self.0.outbound.lock().unwrap().extend_from_slice(bytes);
        Ok(())
    }
}

/// Cloneable in-memory console
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn wait_until(mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting");
        std::thread::sleep(Duration::from_millis(1));
    }
}
