// src/processing/mod.rs
pub mod bands;
pub mod buffer;
pub mod detector;
pub mod error;
pub mod features;
pub mod filter;
pub mod normalize;
pub mod session;
pub mod signal;
pub mod source;
pub mod spectrum;
pub mod transition;
pub use bands::{BandTable, FrequencyBand};
pub use buffer::FrameRing;
pub use detector::{Estimate, OnlineStateDetector};
pub use error::{PipelineError, Result};
pub use features::{
    extract_all_channels, extract_channel_features, extract_window_features, WindowFeatures,
    WindowSpec,
};
pub use filter::{notch, BandFilter, FilterChain, Preprocessor};
pub use normalize::{normalize_to_baseline, BaselineStats, NormalizedPair};
pub use session::{StreamingSession, TimedEstimate};
pub use signal::{ChannelLayout, LabeledSignal, MultiChannelSignal, Phase, PhaseSegment};
pub use source::{ManualSource, ReplaySource, SampleSource};
pub use spectrum::{FrequencySpectrum, SpectrumBuilder};
pub use transition::{
    find_boundaries, summarize, Onset, TransitionAnalyzer, TransitionDirection, TransitionRecord,
    TransitionSummary,
};
