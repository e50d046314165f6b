//! Mock collaborators shared by unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::capability::{FrameSink, FrameSource, MemberTrack, RtpReceiver, SourceId, StoppedHandler};
use crate::event::{EventEmitter, SubscriptionId};
use crate::stats::EncodingStats;
use crate::track::Encoding;

#[derive(Debug, Default)]
pub struct MockSink {
    layer_count: AtomicUsize,
    stopped: AtomicBool,
    /// set_layer_count() calls received after stop()
    late_updates: AtomicUsize,
}

impl MockSink {
    pub fn layer_count(&self) -> usize {
        self.layer_count.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn late_updates(&self) -> usize {
        self.late_updates.load(Ordering::SeqCst)
    }
}

impl FrameSink for MockSink {
    fn set_layer_count(&self, count: usize) {
        if self.is_stopped() {
            self.late_updates.fetch_add(1, Ordering::SeqCst);
        }
        self.layer_count.store(count, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub struct MockSource {
    listeners: AtomicI64,
}

impl MockSource {
    pub fn listener_count(&self) -> i64 {
        self.listeners.load(Ordering::SeqCst)
    }
}

impl FrameSource for MockSource {
    fn register_listener(&self, _sink: &Arc<dyn FrameSink>) {
        self.listeners.fetch_add(1, Ordering::SeqCst);
    }

    fn unregister_listener(&self, _sink: &Arc<dyn FrameSink>) {
        self.listeners.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub struct MockReceiver {
    refreshes: Mutex<Vec<SourceId>>,
}

impl MockReceiver {
    pub fn refreshes(&self) -> Vec<SourceId> {
        self.refreshes.lock().clone()
    }
}

impl RtpReceiver for MockReceiver {
    fn request_refresh(&self, source: SourceId) {
        self.refreshes.lock().push(source);
    }
}

/// Member track whose encodings share one receiver and one source each
pub struct MockMember {
    id: String,
    encodings: Vec<Encoding>,
    sources: Vec<Arc<MockSource>>,
    receiver: Arc<MockReceiver>,
    stats: Mutex<HashMap<String, EncodingStats>>,
    attach_balance: AtomicI64,
    stop_on_attach: AtomicBool,
    stopped: EventEmitter<()>,
}

impl MockMember {
    pub fn new(id: &str, encoding_ids: &[&str]) -> Arc<Self> {
        let sources: Vec<(&str, u32)> = encoding_ids
            .iter()
            .enumerate()
            .map(|(i, encoding)| (*encoding, i as u32 + 1))
            .collect();
        Self::with_sources(id, &sources)
    }

    pub fn with_sources(id: &str, encodings: &[(&str, u32)]) -> Arc<Self> {
        let receiver = Arc::new(MockReceiver::default());
        let sources: Vec<Arc<MockSource>> = encodings
            .iter()
            .map(|_| Arc::new(MockSource::default()))
            .collect();
        let encodings = encodings
            .iter()
            .zip(&sources)
            .map(|((encoding, ssrc), source)| {
                Encoding::new(*encoding, SourceId(*ssrc), receiver.clone(), source.clone())
            })
            .collect();

        Arc::new(Self {
            id: id.to_string(),
            encodings,
            sources,
            receiver,
            stats: Mutex::new(HashMap::new()),
            attach_balance: AtomicI64::new(0),
            stop_on_attach: AtomicBool::new(false),
            stopped: EventEmitter::new(),
        })
    }

    /// Total listeners registered across this member's sources
    pub fn listener_count(&self) -> i64 {
        self.sources.iter().map(|s| s.listener_count()).sum()
    }

    pub fn refreshes(&self) -> Vec<SourceId> {
        self.receiver.refreshes()
    }

    pub fn attach_balance(&self) -> i64 {
        self.attach_balance.load(Ordering::SeqCst)
    }

    pub fn set_stats(&self, encoding_id: &str, stats: EncodingStats) {
        self.stats.lock().insert(encoding_id.to_string(), stats);
    }

    pub fn stop_on_attach(&self) {
        self.stop_on_attach.store(true, Ordering::SeqCst);
    }

    pub fn stopped_subscribers(&self) -> usize {
        self.stopped.listener_count()
    }

    pub fn stop(&self) {
        self.stopped.emit(&());
    }
}

impl MemberTrack for MockMember {
    fn id(&self) -> &str {
        &self.id
    }

    fn encodings(&self) -> Vec<Encoding> {
        self.encodings.clone()
    }

    fn stats(&self) -> HashMap<String, EncodingStats> {
        self.stats.lock().clone()
    }

    fn attached(&self) {
        self.attach_balance.fetch_add(1, Ordering::SeqCst);
        if self.stop_on_attach.load(Ordering::SeqCst) {
            self.stop();
        }
    }

    fn detached(&self) {
        self.attach_balance.fetch_sub(1, Ordering::SeqCst);
    }

    fn on_stopped(&self, handler: StoppedHandler) -> SubscriptionId {
        self.stopped.on(move |_| handler())
    }

    fn off_stopped(&self, id: SubscriptionId) {
        self.stopped.off(id);
    }
}
