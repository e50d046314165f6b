//! Layer statistics and simulcast ranking

pub mod layers;

pub use layers::{
    active_layers, rank, ActiveLayers, EncodingStats, EncodingSummary, LayerInfo, LayerStats,
    LayerSummary, INACTIVE_SIMULCAST_IDX,
};
