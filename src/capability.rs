//! Collaborator capabilities
//!
//! The frame-processing engine (depacketizers, the fan-in frame listener,
//! RTP receivers) lives outside this crate. The aggregate only talks to it
//! through the narrow traits below, so any engine binding can be plugged in.

use std::collections::HashMap;
use std::sync::Arc;

use crate::event::SubscriptionId;
use crate::stats::EncodingStats;
use crate::track::Encoding;

/// Media kind of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    /// Audio track
    Audio,
    /// Video track
    Video,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Video => write!(f, "video"),
        }
    }
}

/// Opaque identifier of an incoming media source (the RTP SSRC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub u32);

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Fan-in frame listener owned by the aggregate
///
/// Every mirrored encoding's depacketizer feeds this sink.
pub trait FrameSink: Send + Sync {
    /// Tell the sink how many encodings feed it
    fn set_layer_count(&self, count: usize);

    /// Stop the sink; no frames are delivered afterwards
    fn stop(&self);
}

/// Per-encoding frame producer (the depacketizer)
pub trait FrameSource: Send + Sync {
    /// Start delivering frames to `sink`
    fn register_listener(&self, sink: &Arc<dyn FrameSink>);

    /// Stop delivering frames to `sink`
    fn unregister_listener(&self, sink: &Arc<dyn FrameSink>);
}

/// RTP receiver used to ask the sender for a refresh (key) frame
pub trait RtpReceiver: Send + Sync {
    /// Request a key frame for `source`
    fn request_refresh(&self, source: SourceId);
}

/// Callback invoked when a member track stops
pub type StoppedHandler = Box<dyn Fn() + Send + Sync>;

/// A negotiated track contributing encodings to a simulcast aggregate
pub trait MemberTrack: Send + Sync {
    /// Track id, unique among the aggregate's members
    fn id(&self) -> &str;

    /// Encodings negotiated on this track, keyed by their original ids
    fn encodings(&self) -> Vec<Encoding>;

    /// Current statistics keyed by original encoding id
    fn stats(&self) -> HashMap<String, EncodingStats>;

    /// Signal that a consumer attached
    fn attached(&self);

    /// Signal that a consumer detached
    fn detached(&self);

    /// Subscribe to the track's "stopped" notification
    fn on_stopped(&self, handler: StoppedHandler) -> SubscriptionId;

    /// Remove a "stopped" subscription
    fn off_stopped(&self, id: SubscriptionId);
}
