//! Simulcast aggregation demo
//!
//! Run with: cargo run --example simulcast_demo
//!
//! Builds an aggregate from two fake member tracks (a two-encoding camera
//! track and a single-encoding screen track), feeds it changing bitrates
//! and prints the ranking the layer monitor publishes.
//!
//! Set `RUST_LOG=simulcast_rs=debug` to see the registry and lifecycle logs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use simulcast_rs::{
    Encoding, EncodingStats, EventEmitter, FrameSink, FrameSource, LayerMonitor, MemberTrack,
    RtpReceiver, SimulcastConfig, SimulcastTrack, SourceId, StoppedHandler, SubscriptionId,
    TrackEvent,
};

struct PrintSink;

impl FrameSink for PrintSink {
    fn set_layer_count(&self, count: usize) {
        println!("  sink: {} layers", count);
    }

    fn stop(&self) {
        println!("  sink: stopped");
    }
}

struct NullDepacketizer;

impl FrameSource for NullDepacketizer {
    fn register_listener(&self, _sink: &Arc<dyn FrameSink>) {}
    fn unregister_listener(&self, _sink: &Arc<dyn FrameSink>) {}
}

struct PrintReceiver;

impl RtpReceiver for PrintReceiver {
    fn request_refresh(&self, source: SourceId) {
        println!("  PLI -> {}", source);
    }
}

struct FakeTrack {
    id: String,
    encodings: Vec<Encoding>,
    stats: Mutex<HashMap<String, EncodingStats>>,
    stopped: EventEmitter<()>,
}

impl FakeTrack {
    fn new(id: &str, encodings: &[(&str, u32)]) -> Arc<Self> {
        let encodings = encodings
            .iter()
            .map(|(rid, ssrc)| {
                Encoding::new(
                    *rid,
                    SourceId(*ssrc),
                    Arc::new(PrintReceiver),
                    Arc::new(NullDepacketizer),
                )
            })
            .collect();

        Arc::new(Self {
            id: id.to_string(),
            encodings,
            stats: Mutex::new(HashMap::new()),
            stopped: EventEmitter::new(),
        })
    }

    fn set_stats(&self, rid: &str, stats: EncodingStats) {
        self.stats.lock().insert(rid.to_string(), stats);
    }
}

impl MemberTrack for FakeTrack {
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
        println!("  {}: attached", self.id);
    }

    fn detached(&self) {
        println!("  {}: detached", self.id);
    }

    fn on_stopped(&self, handler: StoppedHandler) -> SubscriptionId {
        self.stopped.on(move |_| handler())
    }

    fn off_stopped(&self, id: SubscriptionId) {
        self.stopped.off(id);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = SimulcastConfig::default().monitor_interval(Duration::from_millis(100));
    let track = SimulcastTrack::with_config("video-0", Arc::new(PrintSink), config);

    track.events().on(|event| match event {
        TrackEvent::Encoding(encoding) => println!("event: encoding {}", encoding.id),
        other => println!("event: {:?}", other.kind()),
    });

    let camera = FakeTrack::new("camera", &[("l", 0x1001), ("h", 0x1002)]);
    let screen = FakeTrack::new("screen", &[("", 0x2001)]);

    camera.set_stats("l", EncodingStats::new(150_000).with_layer(0, 0, 80_000).with_layer(0, 1, 150_000));
    camera.set_stats("h", EncodingStats::new(0));
    screen.set_stats("", EncodingStats::new(600_000));

    println!("adding member tracks");
    track.add_track("cam", camera.clone())?;
    track.add_track("scr", screen.clone())?;
    track.attached()?;
    track.refresh();

    let monitor = LayerMonitor::spawn(&track);
    let mut changes = monitor.subscribe();
    println!("initial ranking: {:?}", monitor.current().active_ids());

    // High encoding starts sending
    camera.set_stats("h", EncodingStats::new(1_200_000));
    changes.changed().await?;
    {
        let view = changes.borrow();
        for encoding in &view.active {
            println!(
                "  {} idx={} bitrate={} layers={}",
                encoding.id,
                encoding.simulcast_idx,
                encoding.bitrate,
                encoding.layers.len()
            );
        }
    }

    println!("screen track stops");
    screen.stopped.emit(&());
    println!("encodings now: {:?}", track.encoding_ids());

    let stats = stats_summary(&track);
    println!("stats: {}", stats);

    track.detached()?;
    track.stop();

    Ok(())
}

fn stats_summary(track: &SimulcastTrack) -> String {
    track
        .stats()
        .iter()
        .map(|(id, stats)| format!("{}={}@{}", id, stats.bitrate, stats.simulcast_idx))
        .collect::<Vec<_>>()
        .join(", ")
}
