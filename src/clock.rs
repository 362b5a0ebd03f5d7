//! Time source for token issuance and expiry checks.
//!
//! Code crash if there is a physical inconsistency (unrecoverable state).

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Get the current Unix timestamp in seconds.
    fn now(&self) -> i64;
}

/// System clock using the OS time.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        let secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time before Unix epoch")
            .as_secs();

        i64::try_from(secs).expect("system time beyond year 292 billion")
    }
}

/// Manually driven clock.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct FixedClock {
    timestamp: std::sync::atomic::AtomicI64,
}

#[cfg(test)]
impl FixedClock {
    pub fn new(timestamp: i64) -> Self {
        Self {
            timestamp: std::sync::atomic::AtomicI64::new(timestamp),
        }
    }

    /// Move time forward by `secs` seconds.
    pub fn advance(&self, secs: i64) {
        self.timestamp
            .fetch_add(secs, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.timestamp.load(std::sync::atomic::Ordering::SeqCst)
    }
}
