use std::path::Path;
use std::sync::Arc;

/// Errors raised by a media conversion tool.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("conversion produced no output")]
    EmptyOutput,
}

/// Converts HEIC still images to JPEG.
///
/// A pure transform over bytes; the caller reads the source and writes the
/// result under the derived filename.
#[async_trait::async_trait]
pub trait HeicConverter: Send + Sync {
    async fn to_jpeg(&self, heic: Vec<u8>) -> Result<Vec<u8>, ConvertError>;
}

/// Converts MOV videos to animated GIFs, file to file.
#[async_trait::async_trait]
pub trait MovConverter: Send + Sync {
    async fn to_gif(&self, input: &Path, output: &Path) -> Result<(), ConvertError>;
}

#[async_trait::async_trait]
impl<T: HeicConverter + ?Sized> HeicConverter for Arc<T> {
    async fn to_jpeg(&self, heic: Vec<u8>) -> Result<Vec<u8>, ConvertError> {
        (**self).to_jpeg(heic).await
    }
}

#[async_trait::async_trait]
impl<T: MovConverter + ?Sized> MovConverter for Arc<T> {
    async fn to_gif(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
        (**self).to_gif(input, output).await
    }
}

/// The pair of converters the reconciler runs after downloading.
#[derive(Clone)]
pub struct Converters {
    pub heic: Arc<dyn HeicConverter>,
    pub mov: Arc<dyn MovConverter>,
}

impl Converters {
    pub fn new(heic: Arc<dyn HeicConverter>, mov: Arc<dyn MovConverter>) -> Self {
        Self { heic, mov }
    }
}
