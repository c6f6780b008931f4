use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::DeviceInterface;
use crate::error::{KmError, KmResult};

/// In-memory device; clones share the same buffers.
#[derive(Clone, Default)]
pub(crate) struct MockDevice {
    pub inbound: Arc<Mutex<VecDeque<u8>>>,
    pub outbound: Arc<Mutex<Vec<u8>>>,
    pub fail_io: Arc<AtomicBool>,
    pub drops: Arc<AtomicUsize>,
}

impl MockDevice {
    pub fn feed(&self, bytes: &[u8]) {
        self.inbound.lock().unwrap().extend(bytes);
    }

    pub fn written(&self) -> String {
        String::from_utf8(self.outbound.lock().unwrap().clone()).unwrap()
    }

    pub fn handle(&self) -> Box<dyn DeviceInterface> {
        Box::new(MockHandle(self.clone()))
    }
}

pub(crate) struct MockHandle(MockDevice);

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.0.drops.fetch_add(1, Ordering::SeqCst);
    }
}

impl MockHandle {
    fn check(&self) -> KmResult<()> {
        if self.0.fail_io.load(Ordering::SeqCst) {
            return Err(KmError::Communication("device unplugged".to_owned()));
        }
        Ok(())
    }
}

impl DeviceInterface for MockHandle {
    fn name(&self) -> &str {
        "mock0"
    }

    fn bytes_available(&mut self) -> KmResult<usize> {
        self.check()?;
        Ok(self.0.inbound.lock().unwrap().len())
    }

    fn receive(&mut self, max: usize) -> KmResult<Vec<u8>> {
        self.check()?;
        let mut inbound = self.0.inbound.lock().unwrap();
        let take = max.min(inbound.len());
        Ok(inbound.drain(..take).collect())
    }

    fn send(&mut self, bytes: &[u8]) -> KmResult<()> {
        self.check()?;
        self.0.outbound.lock().unwrap().extend_from_slice(bytes);
        Ok(())
    }
}
