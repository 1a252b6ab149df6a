use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::clock::{Clock, SystemClock};

/// A rendered prompt and the instant it stops being served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPrompt {
    pub prompt: String,
    pub expires_at: DateTime<Utc>,
}

/// Single-slot prompt cache shared by every request in the process.
///
/// Last writer wins. Concurrent misses may each rebuild; rebuilds are
/// idempotent so the duplicate work is harmless.
pub struct PromptCache {
    slot: RwLock<Option<CachedPrompt>>,
    clock: Arc<dyn Clock>,
}

impl PromptCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            slot: RwLock::new(None),
            clock,
        }
    }

    pub fn with_system_clock() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The cached prompt, if one exists and has not yet expired.
    pub fn get(&self) -> Option<String> {
        let now = self.clock.now();
        let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
        match slot.as_ref() {
            Some(entry) if entry.expires_at > now => Some(entry.prompt.clone()),
            Some(entry) => {
                debug!(expired_at = %entry.expires_at, "Cached prompt expired");
                None
            }
            None => None,
        }
    }

    /// Replace the slot with `prompt`, valid for `ttl` from now.
    pub fn store(&self, prompt: String, ttl: Duration) -> CachedPrompt {
        let entry = CachedPrompt {
            prompt,
            expires_at: self.clock.now() + ttl,
        };
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = Some(entry.clone());
        entry
    }
}

impl Default for PromptCache {
    fn default() -> Self {
        Self::with_system_clock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn setup() -> (Arc<ManualClock>, PromptCache) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let cache = PromptCache::new(clock.clone());
        (clock, cache)
    }

    #[test]
    fn empty_cache_misses() {
        let (_, cache) = setup();
        assert!(cache.get().is_none());
    }

    #[test]
    fn serves_until_expiry() {
        let (clock, cache) = setup();
        let entry = cache.store("prompt".to_string(), Duration::minutes(30));
        assert_eq!(entry.expires_at, clock.now() + Duration::minutes(30));

        clock.advance(Duration::minutes(29));
        assert_eq!(cache.get().as_deref(), Some("prompt"));

        clock.advance(Duration::minutes(1));
        assert!(cache.get().is_none());
    }

    #[test]
    fn store_replaces_previous_entry() {
        let (_, cache) = setup();
        cache.store("first".to_string(), Duration::minutes(30));
        cache.store("second".to_string(), Duration::minutes(30));
        assert_eq!(cache.get().as_deref(), Some("second"));
    }
}
