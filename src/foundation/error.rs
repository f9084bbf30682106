pub type DashflowResult<T> = Result<T, DashflowError>;

/// Boxed error raised by an external capability (rasterizer or encoder).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(thiserror::Error, Debug)]
pub enum DashflowError {
    #[error("invalid scene: {0}")]
    InvalidScene(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("raster context error: {0}")]
    RasterContext(String),

    /// The rasterizer's own error is kept as `source` so callers can downcast it.
    #[error("rasterizer error: {0}")]
    Rasterizer(#[source] BoxError),

    #[error("no frames to encode")]
    NoFrames,

    #[error("encoding aborted")]
    EncodingAborted,

    #[error("encoder error: {0}")]
    Encoder(#[source] BoxError),

    #[error("generation cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DashflowError {
    pub fn invalid_scene(msg: impl Into<String>) -> Self {
        Self::InvalidScene(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn raster_context(msg: impl Into<String>) -> Self {
        Self::RasterContext(msg.into())
    }

    pub fn encoder(msg: impl Into<String>) -> Self {
        let msg: String = msg.into();
        Self::Encoder(msg.into())
    }
}
