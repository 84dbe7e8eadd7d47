//! Event payload types emitted by torrent sessions.

use chrono::{DateTime, Utc};

/// Identifier assigned to each broadcast event, monotonic per multicaster.
pub type EventId = u64;

/// Lifecycle events surfaced by a torrent session.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TorrentEvent {
    /// The session was handed to the engine.
    Started {
        /// Hex info hash of the session.
        info_hash: String,
    },
    /// The session was cancelled.
    Stopped {
        /// Hex info hash of the session.
        info_hash: String,
    },
    /// A new status snapshot replaced the previous one.
    StatusChanged {
        /// Hex info hash of the session.
        info_hash: String,
    },
    /// The first snapshot reporting full completion arrived.
    Completed {
        /// Hex info hash of the session.
        info_hash: String,
    },
    /// Metadata became known after the session was created.
    MetadataUpdated {
        /// Hex info hash of the session.
        info_hash: String,
    },
    /// The engine persisted fast-resume data.
    FastResumeFileSaved {
        /// Hex info hash of the session.
        info_hash: String,
    },
}

impl TorrentEvent {
    /// Machine-friendly discriminator for log filtering.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::Stopped { .. } => "stopped",
            Self::StatusChanged { .. } => "status_changed",
            Self::Completed { .. } => "completed",
            Self::MetadataUpdated { .. } => "metadata_updated",
            Self::FastResumeFileSaved { .. } => "fast_resume_file_saved",
        }
    }

    /// Info hash of the originating session.
    #[must_use]
    pub fn info_hash(&self) -> &str {
        match self {
            Self::Started { info_hash }
            | Self::Stopped { info_hash }
            | Self::StatusChanged { info_hash }
            | Self::Completed { info_hash }
            | Self::MetadataUpdated { info_hash }
            | Self::FastResumeFileSaved { info_hash } => info_hash,
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Monotonic identifier assigned to the wrapped event.
    pub id: EventId,
    /// Timestamp recording when the envelope was produced.
    pub timestamp: DateTime<Utc>,
    /// Wrapped event payload.
    pub event: TorrentEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_and_hashes_map_every_variant() {
        let hash = String::from("ab");
        let cases = [
            (TorrentEvent::Started { info_hash: hash.clone() }, "started"),
            (TorrentEvent::Stopped { info_hash: hash.clone() }, "stopped"),
            (
                TorrentEvent::StatusChanged { info_hash: hash.clone() },
                "status_changed",
            ),
            (TorrentEvent::Completed { info_hash: hash.clone() }, "completed"),
            (
                TorrentEvent::MetadataUpdated { info_hash: hash.clone() },
                "metadata_updated",
            ),
            (
                TorrentEvent::FastResumeFileSaved { info_hash: hash.clone() },
                "fast_resume_file_saved",
            ),
        ];
        for (event, kind) in cases {
            assert_eq!(event.kind(), kind);
            assert_eq!(event.info_hash(), hash);
        }
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = TorrentEvent::Completed {
            info_hash: "ff".into(),
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["type"], "completed");
        assert_eq!(json["info_hash"], "ff");
    }
}
