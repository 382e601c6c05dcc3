use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid config value for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Frame count mismatch: {frames} video frames, {tracks} tracked frames")]
    FrameCountMismatch { frames: usize, tracks: usize },

    #[error("Need at least 2 distinct colour samples to cluster, found {found}")]
    InsufficientColorSamples { found: usize },
}
