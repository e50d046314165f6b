//! Simulcast track implementation
//!
//! The aggregate that merges member tracks into one multi-encoding video
//! track and coordinates their attach/detach/stop lifecycle.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::capability::{FrameSink, MemberTrack, TrackKind};
use crate::error::{Result, SimulcastError};
use crate::event::{EventEmitter, SubscriptionId, TrackEvent};
use crate::stats::{self, ActiveLayers, EncodingStats};

use super::config::SimulcastConfig;
use super::encoding::{Encoding, EncodingRegistry};

/// Reverse-index entry for one member track
struct MemberEntry {
    track: Arc<dyn MemberTrack>,
    /// Label the member was added under
    label: String,
    /// Original encoding id -> remapped id
    encodings: IndexMap<String, String>,
    /// Subscription to the member's "stopped" notification
    stopped_subscription: Option<SubscriptionId>,
    /// attached() calls forwarded and not yet balanced by detached()
    attach_count: u32,
}

struct TrackState {
    media_id: Option<String>,
    registry: EncodingRegistry,
    members: IndexMap<String, MemberEntry>,
    attach_count: u32,
    stopped: bool,
}

/// A single logical video track backed by several simulcast member tracks
///
/// All operations run to completion on the calling thread. Internal state is
/// never locked while collaborators or observers run, so they may call back
/// into the track (a member stopping from inside `attached()` is fine).
pub struct SimulcastTrack {
    id: String,
    config: SimulcastConfig,
    sink: Arc<dyn FrameSink>,
    events: EventEmitter<TrackEvent>,
    state: Mutex<TrackState>,
    weak_self: Weak<SimulcastTrack>,
}

impl SimulcastTrack {
    /// Create a new simulcast track with default configuration
    pub fn new(id: impl Into<String>, sink: Arc<dyn FrameSink>) -> Arc<Self> {
        Self::with_config(id, sink, SimulcastConfig::default())
    }

    /// Create a new simulcast track with custom configuration
    pub fn with_config(
        id: impl Into<String>,
        sink: Arc<dyn FrameSink>,
        config: SimulcastConfig,
    ) -> Arc<Self> {
        let id = id.into();
        tracing::debug!(track = %id, "Simulcast track created");

        Arc::new_cyclic(|weak_self| Self {
            id,
            config,
            sink,
            events: EventEmitter::new(),
            state: Mutex::new(TrackState {
                media_id: None,
                registry: EncodingRegistry::new(),
                members: IndexMap::new(),
                attach_count: 0,
                stopped: false,
            }),
            weak_self: weak_self.clone(),
        })
    }

    /// Get the track id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Media kind, always video
    pub fn kind(&self) -> TrackKind {
        TrackKind::Video
    }

    /// Get the media id (SDP mid), if negotiated
    pub fn media_id(&self) -> Option<String> {
        self.state.lock().media_id.clone()
    }

    /// Set the media id (SDP mid)
    pub fn set_media_id(&self, media_id: impl Into<String>) {
        self.state.lock().media_id = Some(media_id.into());
    }

    /// Get the track configuration
    pub fn config(&self) -> &SimulcastConfig {
        &self.config
    }

    /// Event surface of this track
    pub fn events(&self) -> &EventEmitter<TrackEvent> {
        &self.events
    }

    /// Add a member track, mirroring its encodings under `label`
    ///
    /// Each encoding is registered as `label#id`, or `label` alone when the
    /// member's encoding id is empty. Returns the remapped ids.
    ///
    /// On a duplicate id the call stops there: encodings already mirrored by
    /// this call stay registered, and the member keeps them until it is
    /// removed or stops.
    pub fn add_track(&self, label: &str, track: Arc<dyn MemberTrack>) -> Result<Vec<String>> {
        let track_id = track.id().to_string();
        let source_encodings = track.encodings();

        let mut added = Vec::with_capacity(source_encodings.len());
        let mut failure = None;

        let recorded = {
            let mut state = self.state.lock();

            if state.stopped {
                return Err(SimulcastError::Stopped {
                    track_id: self.id.clone(),
                });
            }
            if state.members.contains_key(&track_id) {
                return Err(SimulcastError::DuplicateTrack { track_id });
            }

            let mut mapping = IndexMap::with_capacity(source_encodings.len());
            for source in &source_encodings {
                let mirrored = source.with_id(self.config.remap_id(label, &source.id));
                if let Err(e) = state.registry.insert(mirrored.clone()) {
                    failure = Some(e);
                    break;
                }
                mapping.insert(source.id.clone(), mirrored.id.clone());
                added.push(mirrored);
            }

            // Nothing of the member made it in: forget it entirely
            let recorded = !(added.is_empty() && failure.is_some());
            if recorded {
                state.members.insert(
                    track_id.clone(),
                    MemberEntry {
                        track: Arc::clone(&track),
                        label: label.to_string(),
                        encodings: mapping,
                        stopped_subscription: None,
                        attach_count: 0,
                    },
                );
            }
            recorded
        };

        // Every listener is in place before observers run, so a stop() or
        // remove_track() issued from an observer unregisters all of them
        for encoding in &added {
            encoding.depacketizer.register_listener(&self.sink);
        }
        for encoding in &added {
            tracing::debug!(
                track = %self.id,
                member = %track_id,
                encoding = %encoding.id,
                source = %encoding.source,
                "Encoding mirrored"
            );
            self.events.emit(&TrackEvent::Encoding(encoding.clone()));
        }

        // Observers may have changed the track; decide from current state
        let (layer_count, present, attach) = {
            let mut state = self.state.lock();
            if state.stopped {
                drop(state);
                tracing::debug!(track = %self.id, member = %track_id, "Track stopped while adding member");
                return Err(SimulcastError::Stopped {
                    track_id: self.id.clone(),
                });
            }

            let attached = state.attach_count > 0;
            let layer_count = state.registry.len();
            match state.members.get_mut(&track_id) {
                Some(entry) if recorded => {
                    // An observer's attached() may already have reached this member
                    let attach = failure.is_none() && attached && entry.attach_count == 0;
                    if attach {
                        entry.attach_count = 1;
                    }
                    (layer_count, true, attach)
                }
                _ => (layer_count, false, false),
            }
        };
        self.sink.set_layer_count(layer_count);

        if present {
            self.watch_member(&track_id, &track);
        } else if recorded {
            tracing::debug!(track = %self.id, member = %track_id, "Member removed while being added");
        }

        if let Some(e) = failure {
            tracing::warn!(
                track = %self.id,
                member = %track_id,
                label = label,
                error = %e,
                mirrored = added.len(),
                "Member track only partially added"
            );
            return Err(e);
        }

        if attach {
            track.attached();
        }

        tracing::info!(
            track = %self.id,
            member = %track_id,
            label = label,
            encodings = added.len(),
            layers = layer_count,
            "Member track added"
        );

        Ok(added.into_iter().map(|e| e.id).collect())
    }

    /// Subscribe to a member's "stopped" notification for automatic removal
    fn watch_member(&self, track_id: &str, track: &Arc<dyn MemberTrack>) {
        let weak = self.weak_self.clone();
        let member = track_id.to_string();
        let subscription = track.on_stopped(Box::new(move || {
            if let Some(aggregate) = weak.upgrade() {
                tracing::debug!(track = %aggregate.id, member = %member, "Member track stopped");
                aggregate.remove_track(&member);
            }
        }));

        let registered = match self.state.lock().members.get_mut(track_id) {
            Some(entry) => {
                entry.stopped_subscription = Some(subscription);
                true
            }
            None => false,
        };

        // Member stopped (or was removed) while subscribing
        if !registered {
            track.off_stopped(subscription);
        }
    }

    /// Remove a member track and every encoding it contributed
    ///
    /// Returns false if the member is unknown.
    pub fn remove_track(&self, track_id: &str) -> bool {
        let (entry, removed, layer_count) = {
            let mut state = self.state.lock();

            let Some(entry) = state.members.shift_remove(track_id) else {
                tracing::debug!(track = %self.id, member = track_id, "Remove of unknown member track");
                return false;
            };

            let removed: Vec<Encoding> = entry
                .encodings
                .values()
                .filter_map(|id| state.registry.remove(id))
                .collect();

            (entry, removed, state.registry.len())
        };

        for encoding in &removed {
            encoding.depacketizer.unregister_listener(&self.sink);
        }
        self.sink.set_layer_count(layer_count);

        if let Some(subscription) = entry.stopped_subscription {
            entry.track.off_stopped(subscription);
        }
        for _ in 0..entry.attach_count {
            entry.track.detached();
        }

        tracing::info!(
            track = %self.id,
            member = track_id,
            label = %entry.label,
            encodings = removed.len(),
            layers = layer_count,
            "Member track removed"
        );

        true
    }

    /// Signal that a consumer attached
    ///
    /// Forwarded to every member. `Attached` is emitted on the 0 -> 1
    /// transition only. No-op once stopped.
    pub fn attached(&self) -> Result<()> {
        let (members, first) = {
            let mut state = self.state.lock();
            if state.stopped {
                return Ok(());
            }

            let members: Vec<Arc<dyn MemberTrack>> = state
                .members
                .values_mut()
                .map(|entry| {
                    entry.attach_count += 1;
                    Arc::clone(&entry.track)
                })
                .collect();

            state.attach_count += 1;
            (members, state.attach_count == 1)
        };

        for member in &members {
            member.attached();
        }

        if first {
            tracing::info!(track = %self.id, members = members.len(), "Simulcast track attached");
            self.events.emit(&TrackEvent::Attached);
        }
        Ok(())
    }

    /// Signal that a consumer detached
    ///
    /// `Detached` is emitted on the 1 -> 0 transition only. A detach with no
    /// outstanding attach is ignored, or rejected when the config is strict.
    pub fn detached(&self) -> Result<()> {
        let (members, last) = {
            let mut state = self.state.lock();
            if state.stopped {
                return Ok(());
            }

            if state.attach_count == 0 {
                tracing::warn!(track = %self.id, "Detach without matching attach");
                if self.config.strict {
                    return Err(SimulcastError::AttachUnderflow {
                        track_id: self.id.clone(),
                    });
                }
                return Ok(());
            }

            let members: Vec<Arc<dyn MemberTrack>> = state
                .members
                .values_mut()
                .filter(|entry| entry.attach_count > 0)
                .map(|entry| {
                    entry.attach_count -= 1;
                    Arc::clone(&entry.track)
                })
                .collect();

            state.attach_count -= 1;
            (members, state.attach_count == 0)
        };

        for member in &members {
            member.detached();
        }

        if last {
            tracing::info!(track = %self.id, "Simulcast track detached");
            self.events.emit(&TrackEvent::Detached);
        }
        Ok(())
    }

    /// Request a refresh (key) frame on every encoding
    pub fn refresh(&self) {
        let encodings: Vec<Encoding> = {
            let state = self.state.lock();
            if state.stopped {
                return;
            }
            state.registry.iter().cloned().collect()
        };

        tracing::debug!(track = %self.id, encodings = encodings.len(), "Refresh requested");

        for encoding in &encodings {
            encoding.request_refresh();
        }
    }

    /// Stop the track, releasing every member and encoding
    ///
    /// Terminal. Returns false if the track was already stopped.
    pub fn stop(&self) -> bool {
        let (members, encodings) = {
            let mut state = self.state.lock();
            if state.stopped {
                return false;
            }
            state.stopped = true;
            state.attach_count = 0;

            let members: Vec<MemberEntry> = state.members.drain(..).map(|(_, e)| e).collect();
            let encodings: Vec<Encoding> = state.registry.iter().cloned().collect();
            (members, encodings)
        };

        for encoding in &encodings {
            encoding.depacketizer.unregister_listener(&self.sink);
        }
        for member in &members {
            if let Some(subscription) = member.stopped_subscription {
                member.track.off_stopped(subscription);
            }
        }

        self.sink.stop();

        tracing::info!(
            track = %self.id,
            members = members.len(),
            encodings = encodings.len(),
            "Simulcast track stopped"
        );

        // Stopped observers still see the encodings; the registry is cleared after
        self.events.emit(&TrackEvent::Stopped);
        self.state.lock().registry.drain();
        self.events.teardown();
        true
    }

    /// Check whether the track was stopped
    pub fn is_stopped(&self) -> bool {
        self.state.lock().stopped
    }

    /// Check whether at least one consumer is attached
    pub fn is_attached(&self) -> bool {
        self.state.lock().attach_count > 0
    }

    /// Outstanding attach count
    pub fn attach_count(&self) -> u32 {
        self.state.lock().attach_count
    }

    /// Mirrored encodings in insertion order
    pub fn encodings(&self) -> Vec<Encoding> {
        self.state.lock().registry.iter().cloned().collect()
    }

    /// Look up a mirrored encoding by its remapped id
    pub fn encoding(&self, id: &str) -> Option<Encoding> {
        self.state.lock().registry.get(id).cloned()
    }

    /// First mirrored encoding still present, if any
    pub fn default_encoding(&self) -> Option<Encoding> {
        self.state.lock().registry.first().cloned()
    }

    /// Remapped encoding ids in insertion order
    pub fn encoding_ids(&self) -> Vec<String> {
        self.state.lock().registry.ids()
    }

    /// Number of mirrored encodings (the sink's layer count)
    pub fn encoding_count(&self) -> usize {
        self.state.lock().registry.len()
    }

    /// Ids of the member tracks
    pub fn track_ids(&self) -> Vec<String> {
        self.state.lock().members.keys().cloned().collect()
    }

    /// Check whether a member track is part of the aggregate
    pub fn has_track(&self, track_id: &str) -> bool {
        self.state.lock().members.contains_key(track_id)
    }

    /// Remapped ids contributed by a member track
    pub fn member_encodings(&self, track_id: &str) -> Option<Vec<String>> {
        self.state
            .lock()
            .members
            .get(track_id)
            .map(|entry| entry.encodings.values().cloned().collect())
    }

    /// Ranked statistics keyed by remapped encoding id
    ///
    /// Pulled from every member on each call and ordered like the registry.
    pub fn stats(&self) -> IndexMap<String, EncodingStats> {
        let (members, order) = {
            let state = self.state.lock();
            let members: Vec<(Arc<dyn MemberTrack>, IndexMap<String, String>)> = state
                .members
                .values()
                .map(|entry| (Arc::clone(&entry.track), entry.encodings.clone()))
                .collect();
            (members, state.registry.ids())
        };

        let mut collected: HashMap<String, EncodingStats> = HashMap::new();
        for (member, mapping) in &members {
            for (original, stats) in member.stats() {
                match mapping.get(&original) {
                    Some(remapped) => {
                        collected.insert(remapped.clone(), stats);
                    }
                    None => {
                        tracing::debug!(
                            track = %self.id,
                            member = member.id(),
                            encoding = %original,
                            "Stats for unknown encoding dropped"
                        );
                    }
                }
            }
        }

        let mut ranked: IndexMap<String, EncodingStats> = order
            .into_iter()
            .filter_map(|id| collected.remove(&id).map(|stats| (id, stats)))
            .collect();
        stats::rank(&mut ranked);
        ranked
    }

    /// Active/inactive encodings and all layers, by descending bitrate
    pub fn active_layers(&self) -> ActiveLayers {
        stats::active_layers(&self.stats(), self.config.max_layer_id)
    }
}

impl std::fmt::Debug for SimulcastTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SimulcastTrack")
            .field("id", &self.id)
            .field("media_id", &state.media_id)
            .field("encodings", &state.registry.ids())
            .field("members", &state.members.len())
            .field("attach_count", &state.attach_count)
            .field("stopped", &state.stopped)
            .finish()
    }
}
