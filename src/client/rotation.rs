//! Round-robin selection of ping endpoints

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{KeepAliveError, Result};

/// Hands out ping endpoints in round-robin order
///
/// One cursor is shared by every caller, so concurrent ping loops
/// interleave on the same rotation. There is no health awareness: a
/// failing endpoint stays in rotation.
#[derive(Debug)]
pub struct EndpointRotator {
    endpoints: Vec<String>,
    index: AtomicUsize,
}

impl EndpointRotator {
    pub fn new(endpoints: Vec<String>) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(KeepAliveError::InvalidConfig(
                "ping endpoint list must not be empty".into(),
            ));
        }

        Ok(Self {
            endpoints,
            index: AtomicUsize::new(0),
        })
    }

    /// Return the endpoint under the cursor and advance it
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> &str {
        let len = self.endpoints.len();
        // The closure always returns Some, so both arms carry the previous value
        let idx = match self
            .index
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| Some((i + 1) % len))
        {
            Ok(prev) | Err(prev) => prev,
        };

        &self.endpoints[idx]
    }

    /// Index the next call to `next` will return
    pub fn cursor(&self) -> usize {
        self.index.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
