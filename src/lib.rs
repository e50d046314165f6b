//! # simulcast-rs
//!
//! Presents a set of independently negotiated simulcast video tracks as a
//! single logical video track with multiple encodings.
//!
//! Packet handling (depacketization, jitter buffers, bitrate measurement)
//! stays in the media engine. This crate only orchestrates it through the
//! narrow traits in [`capability`]:
//!
//! - [`track`]: the aggregate, its encoding registry and the attach/detach/stop
//!   lifecycle shared with member tracks
//! - [`stats`]: per-layer statistics and simulcast ranking
//! - [`event`]: typed synchronous notifications
//! - [`monitor`]: optional tokio task publishing ranking changes
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use simulcast_rs::{FrameSink, MemberTrack, SimulcastTrack, TrackEvent};
//!
//! # fn example(sink: Arc<dyn FrameSink>, low: Arc<dyn MemberTrack>, high: Arc<dyn MemberTrack>)
//! # -> simulcast_rs::Result<()> {
//! let track = SimulcastTrack::new("video-0", sink);
//! track.events().on(|event| {
//!     if let TrackEvent::Encoding(encoding) = event {
//!         println!("new encoding {}", encoding.id);
//!     }
//! });
//!
//! track.add_track("cam", low)?;
//! track.add_track("screen", high)?;
//! track.attached()?;
//!
//! let layers = track.active_layers();
//! println!("active: {:?}, inactive: {:?}", layers.active_ids(), layers.inactive);
//! # Ok(())
//! # }
//! ```

pub mod capability;
pub mod error;
pub mod event;
pub mod monitor;
pub mod stats;
pub mod track;

#[cfg(test)]
pub(crate) mod testing;

pub use capability::{
    FrameSink, FrameSource, MemberTrack, RtpReceiver, SourceId, StoppedHandler, TrackKind,
};
pub use error::{Result, SimulcastError};
pub use event::{EventEmitter, SubscriptionId, TrackEvent, TrackEventKind};
pub use monitor::LayerMonitor;
pub use stats::{ActiveLayers, EncodingStats, EncodingSummary, LayerInfo, LayerStats, LayerSummary};
pub use track::{Encoding, SimulcastConfig, SimulcastTrack};
