//! Simulcast track aggregation
//!
//! Several independently negotiated tracks, each carrying one or more
//! simulcast encodings, are presented as one video track with all of their
//! encodings. Encoding ids are remapped under a caller-supplied label so
//! members never collide.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<SimulcastTrack>
//!              ┌────────────────────────────────────┐
//!              │ registry: EncodingRegistry {       │
//!              │   "cam#lo", "cam#hi", "sim", ...   │
//!              │ }                                  │
//!              │ members: IndexMap<TrackId,         │
//!              │   MemberEntry { original -> id }   │
//!              │ >                                  │
//!              │ sink: Arc<dyn FrameSink>           │
//!              └───────┬──────────────────┬─────────┘
//!                      │                  │
//!          register_listener()      stats() / attached()
//!                      │                  │
//!                      ▼                  ▼
//!      [FrameSource per encoding]   [MemberTrack]  [MemberTrack]
//!                                        │
//!                                 on_stopped() ──► remove_track()
//! ```
//!
//! # Layer ranking
//!
//! [`SimulcastTrack::stats`] pulls per-encoding statistics from every member,
//! translates them to remapped ids and ranks them by bitrate (see
//! [`crate::stats`]).

pub mod config;
pub mod encoding;
pub mod simulcast;

pub use config::{SimulcastConfig, DEFAULT_SEPARATOR, MAX_LAYER_ID};
pub use encoding::{Encoding, EncodingRegistry};
pub use simulcast::SimulcastTrack;
