//! Identifier types for DECK.
//!
//! Instance identifiers are UUID-based so they stay unique across
//! execution contexts. Request identifiers are deliberately *not* UUIDs:
//! they are a counter + timestamp pair scoped to one channel, which keeps
//! them cheap to mint, human-readable in traces, and ordered enough to
//! debug a wire log by eye.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Container name used when a caller does not pick one.
///
/// Single-instance embedders never name their mount point; they all share
/// this slot.
pub const DEFAULT_CONTAINER: &str = "default";

/// Identifier for one live engine instance.
///
/// Assigned when the instance is created and unique for the process
/// lifetime. Carried by every save/ready/loading notification so that
/// concurrent instances can tell their own events apart.
///
/// # Example
///
/// ```
/// use deck_types::InstanceId;
///
/// let a = InstanceId::new();
/// let b = InstanceId::new();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub Uuid);

impl InstanceId {
    /// Creates a new [`InstanceId`] with a random UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "instance:{}", self.0)
    }
}

/// Caller-chosen name for the mount point an instance renders into.
///
/// At most one live instance exists per container at any time; creating
/// a second instance for an occupied container first retires the previous
/// one. Callers that never name a container all share
/// [`DEFAULT_CONTAINER`].
///
/// # Example
///
/// ```
/// use deck_types::ContainerId;
///
/// let named = ContainerId::new("sidebar");
/// let fallback = ContainerId::default();
///
/// assert_eq!(named.as_str(), "sidebar");
/// assert!(fallback.is_default());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a container identifier from a caller-chosen name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the container name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this is the shared default container.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_CONTAINER
    }
}

impl Default for ContainerId {
    fn default() -> Self {
        Self(DEFAULT_CONTAINER.to_string())
    }
}

impl From<&str> for ContainerId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Correlates one cross-context request with its response.
///
/// A `RequestId` combines a per-channel monotonic sequence number with the
/// epoch-millisecond timestamp at mint time. Uniqueness is guaranteed for
/// the lifetime of one channel (the sequence number alone ensures that);
/// the timestamp exists so a wire log can be read chronologically.
///
/// Mint ids through a [`RequestIdSource`]; two ids from the same source
/// never collide.
///
/// # Example
///
/// ```
/// use deck_types::RequestIdSource;
///
/// let ids = RequestIdSource::new();
/// let a = ids.next();
/// let b = ids.next();
///
/// assert_ne!(a, b);
/// assert!(a.to_string().starts_with("req-"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId {
    /// Monotonic sequence number within one channel.
    pub seq: u64,
    /// Milliseconds since the Unix epoch at mint time.
    pub epoch_ms: u64,
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}-{}", self.epoch_ms, self.seq)
    }
}

/// Mints [`RequestId`]s for one channel.
///
/// The sequence counter is atomic so a channel shared across tasks can
/// mint ids without locking.
#[derive(Debug, Default)]
pub struct RequestIdSource {
    counter: AtomicU64,
}

impl RequestIdSource {
    /// Creates a fresh source starting at sequence 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints the next request id.
    pub fn next(&self) -> RequestId {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        RequestId { seq, epoch_ms }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_id_uniqueness() {
        let a = InstanceId::new();
        let b = InstanceId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn instance_id_display() {
        let id = InstanceId::new();
        assert!(format!("{id}").starts_with("instance:"));
    }

    #[test]
    fn container_id_default() {
        let id = ContainerId::default();
        assert!(id.is_default());
        assert_eq!(id.as_str(), DEFAULT_CONTAINER);
    }

    #[test]
    fn container_id_named() {
        let id = ContainerId::new("main-view");
        assert!(!id.is_default());
        assert_eq!(format!("{id}"), "main-view");
    }

    #[test]
    fn container_id_from_str() {
        let id: ContainerId = "panel".into();
        assert_eq!(id.as_str(), "panel");
    }

    #[test]
    fn request_ids_are_sequential() {
        let ids = RequestIdSource::new();
        let a = ids.next();
        let b = ids.next();
        let c = ids.next();

        assert_eq!(a.seq, 1);
        assert_eq!(b.seq, 2);
        assert_eq!(c.seq, 3);
    }

    #[test]
    fn request_ids_unique_within_source() {
        let ids = RequestIdSource::new();
        let minted: Vec<_> = (0..100).map(|_| ids.next()).collect();
        for (i, a) in minted.iter().enumerate() {
            for b in &minted[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn request_id_display_format() {
        let id = RequestId {
            seq: 7,
            epoch_ms: 1000,
        };
        assert_eq!(format!("{id}"), "req-1000-7");
    }

    #[test]
    fn request_id_serde_roundtrip() {
        let ids = RequestIdSource::new();
        let id = ids.next();
        let json = serde_json::to_string(&id).unwrap();
        let back: RequestId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
