use crate::config::PortRange;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

const RANDOM_ATTEMPTS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("no free port left in range {start}..{end}")]
    Exhausted { start: u16, end: u16 },
    #[error("failed to draw a random port: {0}")]
    Entropy(String),
}

/// Hands out ports from a fixed range, never the same port twice until released.
#[derive(Debug, Clone)]
pub struct PortAllocator {
    range: PortRange,
    reserved: Arc<Mutex<BTreeSet<u16>>>,
}

impl PortAllocator {
    pub fn new(range: PortRange) -> Self {
        Self {
            range,
            reserved: Arc::new(Mutex::new(BTreeSet::new())),
        }
    }

    pub fn range(&self) -> PortRange {
        self.range
    }

    pub fn allocate(&self) -> Result<u16, PortError> {
        let mut reserved = self
            .reserved
            .lock()
            .unwrap_or_else(|err| err.into_inner());
        if reserved.len() >= self.range.len() {
            return Err(self.exhausted());
        }

        for _ in 0..RANDOM_ATTEMPTS {
            let candidate = random_port(self.range)?;
            if reserved.insert(candidate) {
                return Ok(candidate);
            }
        }

        let fallback = (self.range.start..self.range.end).find(|port| !reserved.contains(port));
        match fallback {
            Some(port) => {
                reserved.insert(port);
                Ok(port)
            }
            None => Err(self.exhausted()),
        }
    }

    pub fn release(&self, port: u16) {
        self.reserved
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .remove(&port);
    }

    pub fn is_reserved(&self, port: u16) -> bool {
        self.reserved
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .contains(&port)
    }

    pub fn reserved_count(&self) -> usize {
        self.reserved
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .len()
    }

    fn exhausted(&self) -> PortError {
        PortError::Exhausted {
            start: self.range.start,
            end: self.range.end,
        }
    }
}

fn random_port(range: PortRange) -> Result<u16, PortError> {
    let span = range.len() as u32;
    if span == 0 {
        return Err(PortError::Exhausted {
            start: range.start,
            end: range.end,
        });
    }
    let mut bytes = [0_u8; 4];
    getrandom::getrandom(&mut bytes).map_err(|err| PortError::Entropy(err.to_string()))?;
    let offset = u32::from_le_bytes(bytes) % span;
    Ok(range.start + offset as u16)
}
