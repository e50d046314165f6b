//! Per-encoding layer statistics and simulcast ranking
//!
//! Ranking assigns `simulcast_idx` by ascending bitrate over the encodings
//! that carry media (bitrate > 0). Silent encodings get `-1`. Views built
//! from ranked stats list encodings and layers by descending bitrate.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Rank value of an encoding that is not currently sending
pub const INACTIVE_SIMULCAST_IDX: i32 = -1;

fn inactive_idx() -> i32 {
    INACTIVE_SIMULCAST_IDX
}

/// Statistics for one spatial/temporal layer of an encoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerStats {
    /// Rank of the owning encoding
    #[serde(default = "inactive_idx")]
    pub simulcast_idx: i32,
    /// Spatial layer id
    pub spatial_layer_id: u8,
    /// Temporal layer id
    pub temporal_layer_id: u8,
    /// Bitrate in bits/sec
    pub bitrate: u64,
}

impl LayerStats {
    /// Create unranked layer statistics
    pub fn new(spatial_layer_id: u8, temporal_layer_id: u8, bitrate: u64) -> Self {
        Self {
            simulcast_idx: INACTIVE_SIMULCAST_IDX,
            spatial_layer_id,
            temporal_layer_id,
            bitrate,
        }
    }
}

/// Statistics for one encoding, as reported by the media engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodingStats {
    /// Rank among the aggregate's encodings
    #[serde(default = "inactive_idx")]
    pub simulcast_idx: i32,
    /// Total bitrate in bits/sec
    pub bitrate: u64,
    /// Scalable layers; empty for single-layer codecs
    #[serde(default)]
    pub layers: Vec<LayerStats>,
}

impl EncodingStats {
    /// Create unranked stats with no explicit layers
    pub fn new(bitrate: u64) -> Self {
        Self {
            simulcast_idx: INACTIVE_SIMULCAST_IDX,
            bitrate,
            layers: Vec::new(),
        }
    }

    /// Add a layer
    pub fn with_layer(mut self, spatial_layer_id: u8, temporal_layer_id: u8, bitrate: u64) -> Self {
        self.layers
            .push(LayerStats::new(spatial_layer_id, temporal_layer_id, bitrate));
        self
    }

    /// Whether the encoding is currently carrying media
    pub fn is_active(&self) -> bool {
        self.bitrate > 0
    }
}

/// Layer entry inside an [`EncodingSummary`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerInfo {
    pub simulcast_idx: i32,
    pub spatial_layer_id: u8,
    pub temporal_layer_id: u8,
    pub bitrate: u64,
}

/// Active encoding with its layers by descending bitrate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodingSummary {
    pub id: String,
    pub simulcast_idx: i32,
    pub bitrate: u64,
    pub layers: Vec<LayerInfo>,
}

/// Flat layer entry tagged with its owning encoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSummary {
    pub encoding_id: String,
    pub simulcast_idx: i32,
    pub spatial_layer_id: u8,
    pub temporal_layer_id: u8,
    pub bitrate: u64,
}

/// Ordered view of active and inactive encodings and all their layers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveLayers {
    /// Active encodings, descending bitrate
    pub active: Vec<EncodingSummary>,
    /// Ids of encodings with zero bitrate
    pub inactive: Vec<String>,
    /// Every layer of every active encoding, descending bitrate
    pub layers: Vec<LayerSummary>,
}

impl ActiveLayers {
    /// Ids of active encodings, highest bitrate first
    pub fn active_ids(&self) -> Vec<&str> {
        self.active.iter().map(|e| e.id.as_str()).collect()
    }

    /// Compare the ranking (not the bitrates) of two views
    ///
    /// Bitrates fluctuate on every sample, while the set of active encodings
    /// and their order only change on real layer switches.
    pub fn same_ranking(&self, other: &ActiveLayers) -> bool {
        self.inactive == other.inactive
            && self.active.len() == other.active.len()
            && self
                .active
                .iter()
                .zip(&other.active)
                .all(|(a, b)| a.id == b.id && a.simulcast_idx == b.simulcast_idx)
    }
}

/// Assign `simulcast_idx` to every encoding and to each of its layers
///
/// Ties keep the map's order.
pub fn rank(stats: &mut IndexMap<String, EncodingStats>) {
    let mut order: Vec<usize> = (0..stats.len()).collect();
    order.sort_by_key(|&i| stats[i].bitrate);

    let mut next_idx = 0;
    for i in order {
        let encoding = &mut stats[i];
        let idx = if encoding.is_active() {
            next_idx += 1;
            next_idx - 1
        } else {
            INACTIVE_SIMULCAST_IDX
        };

        encoding.simulcast_idx = idx;
        for layer in &mut encoding.layers {
            layer.simulcast_idx = idx;
        }
    }
}

/// Build the active/inactive/layers view from ranked stats
///
/// Encodings without explicit layers are reported as a single layer with
/// both ids set to `max_layer_id`.
pub fn active_layers(stats: &IndexMap<String, EncodingStats>, max_layer_id: u8) -> ActiveLayers {
    let mut view = ActiveLayers::default();

    for (id, stats) in stats {
        if !stats.is_active() {
            view.inactive.push(id.clone());
            continue;
        }

        let mut encoding = EncodingSummary {
            id: id.clone(),
            simulcast_idx: stats.simulcast_idx,
            bitrate: stats.bitrate,
            layers: Vec::with_capacity(stats.layers.len()),
        };

        for layer in &stats.layers {
            encoding.layers.push(LayerInfo {
                simulcast_idx: stats.simulcast_idx,
                spatial_layer_id: layer.spatial_layer_id,
                temporal_layer_id: layer.temporal_layer_id,
                bitrate: layer.bitrate,
            });
            view.layers.push(LayerSummary {
                encoding_id: id.clone(),
                simulcast_idx: stats.simulcast_idx,
                spatial_layer_id: layer.spatial_layer_id,
                temporal_layer_id: layer.temporal_layer_id,
                bitrate: layer.bitrate,
            });
        }

        if stats.layers.is_empty() {
            view.layers.push(LayerSummary {
                encoding_id: id.clone(),
                simulcast_idx: stats.simulcast_idx,
                spatial_layer_id: max_layer_id,
                temporal_layer_id: max_layer_id,
                bitrate: stats.bitrate,
            });
        }

        encoding.layers.sort_by(|a, b| b.bitrate.cmp(&a.bitrate));
        view.active.push(encoding);
    }

    view.active.sort_by(|a, b| b.bitrate.cmp(&a.bitrate));
    view.layers.sort_by(|a, b| b.bitrate.cmp(&a.bitrate));
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::MAX_LAYER_ID;

    fn ranked(entries: Vec<(&str, EncodingStats)>) -> IndexMap<String, EncodingStats> {
        let mut stats: IndexMap<String, EncodingStats> = entries
            .into_iter()
            .map(|(id, s)| (id.to_string(), s))
            .collect();
        rank(&mut stats);
        stats
    }

    #[test]
    fn test_rank_skips_inactive() {
        let stats = ranked(vec![
            ("mid", EncodingStats::new(500)),
            ("off", EncodingStats::new(0)),
            ("hi", EncodingStats::new(1500)),
            ("lo", EncodingStats::new(100)),
        ]);

        assert_eq!(stats["off"].simulcast_idx, -1);
        assert_eq!(stats["lo"].simulcast_idx, 0);
        assert_eq!(stats["mid"].simulcast_idx, 1);
        assert_eq!(stats["hi"].simulcast_idx, 2);
    }

    #[test]
    fn test_rank_propagates_to_layers() {
        let stats = ranked(vec![
            ("a", EncodingStats::new(900).with_layer(0, 0, 300).with_layer(0, 1, 600)),
            ("b", EncodingStats::new(200).with_layer(0, 0, 200)),
        ]);

        assert!(stats["a"].layers.iter().all(|l| l.simulcast_idx == 1));
        assert!(stats["b"].layers.iter().all(|l| l.simulcast_idx == 0));
    }

    #[test]
    fn test_rank_ties_keep_order() {
        let stats = ranked(vec![
            ("first", EncodingStats::new(300)),
            ("second", EncodingStats::new(300)),
        ]);

        assert_eq!(stats["first"].simulcast_idx, 0);
        assert_eq!(stats["second"].simulcast_idx, 1);
    }

    #[test]
    fn test_active_layers_ordering() {
        let stats = ranked(vec![
            ("zero", EncodingStats::new(0)),
            ("low", EncodingStats::new(500)),
            ("high", EncodingStats::new(1500)),
        ]);

        let view = active_layers(&stats, MAX_LAYER_ID);

        assert_eq!(view.inactive, vec!["zero"]);
        assert_eq!(view.active_ids(), vec!["high", "low"]);
        assert_eq!(view.active[0].simulcast_idx, 1);
        assert_eq!(view.active[1].simulcast_idx, 0);
    }

    #[test]
    fn test_single_layer_sentinel() {
        let stats = ranked(vec![("solo", EncodingStats::new(800))]);

        let view = active_layers(&stats, MAX_LAYER_ID);

        assert!(view.active[0].layers.is_empty());
        assert_eq!(view.layers.len(), 1);
        assert_eq!(view.layers[0].encoding_id, "solo");
        assert_eq!(view.layers[0].spatial_layer_id, 0xFF);
        assert_eq!(view.layers[0].temporal_layer_id, 0xFF);
        assert_eq!(view.layers[0].bitrate, 800);
    }

    #[test]
    fn test_layers_sorted_descending() {
        let stats = ranked(vec![
            ("a", EncodingStats::new(700).with_layer(0, 0, 100).with_layer(0, 2, 700).with_layer(0, 1, 400)),
            ("b", EncodingStats::new(250).with_layer(0, 0, 250)),
        ]);

        let view = active_layers(&stats, MAX_LAYER_ID);

        let per_encoding: Vec<u64> = view.active[0].layers.iter().map(|l| l.bitrate).collect();
        assert_eq!(per_encoding, vec![700, 400, 100]);

        let flat: Vec<(&str, u64)> = view
            .layers
            .iter()
            .map(|l| (l.encoding_id.as_str(), l.bitrate))
            .collect();
        assert_eq!(flat, vec![("a", 700), ("a", 400), ("b", 250), ("a", 100)]);
    }

    #[test]
    fn test_active_layers_is_pure() {
        let stats = ranked(vec![
            ("a", EncodingStats::new(300)),
            ("b", EncodingStats::new(0)),
        ]);

        assert_eq!(active_layers(&stats, 0xFF), active_layers(&stats, 0xFF));
    }

    #[test]
    fn test_same_ranking_ignores_bitrate() {
        let before = active_layers(&ranked(vec![("a", EncodingStats::new(300))]), 0xFF);
        let after = active_layers(&ranked(vec![("a", EncodingStats::new(320))]), 0xFF);
        let switched = active_layers(
            &ranked(vec![("a", EncodingStats::new(320)), ("b", EncodingStats::new(900))]),
            0xFF,
        );

        assert!(before.same_ranking(&after));
        assert!(!before.same_ranking(&switched));
    }

    #[test]
    fn test_serializes_camel_case() {
        let stats = ranked(vec![("a", EncodingStats::new(300).with_layer(1, 2, 300))]);
        let view = active_layers(&stats, MAX_LAYER_ID);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["active"][0]["simulcastIdx"], 0);
        assert_eq!(json["layers"][0]["encodingId"], "a");
        assert_eq!(json["layers"][0]["spatialLayerId"], 1);
        assert_eq!(json["layers"][0]["temporalLayerId"], 2);
    }

    #[test]
    fn test_deserialize_engine_stats() {
        let stats: EncodingStats =
            serde_json::from_str(r#"{"bitrate":1200,"layers":[{"spatialLayerId":0,"temporalLayerId":1,"bitrate":1200}]}"#)
                .unwrap();

        assert_eq!(stats.simulcast_idx, -1);
        assert_eq!(stats.layers[0].temporal_layer_id, 1);
        assert_eq!(stats.layers[0].simulcast_idx, -1);
    }
}
