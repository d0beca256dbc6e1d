use std::ffi::OsString;
use std::path::Path;

use hyperdrive::{ConvertError, MovConverter};

use crate::tool::Tool;

pub const DEFAULT_FFMPEG: &str = "ffmpeg";

/// MOV to animated GIF through ffmpeg.
///
/// The output format is forced with `-f gif` since the caller usually
/// hands over a temporary path without a `.gif` extension.
#[derive(Debug, Clone)]
pub struct FfmpegGifConverter {
    tool: Tool,
}

impl FfmpegGifConverter {
    pub fn new(tool: Tool) -> Self {
        Self { tool }
    }

    fn args(input: &Path, output: &Path) -> Vec<OsString> {
        vec![
            "-y".into(),
            "-loglevel".into(),
            "error".into(),
            "-i".into(),
            input.as_os_str().to_owned(),
            "-f".into(),
            "gif".into(),
            output.as_os_str().to_owned(),
        ]
    }
}

impl Default for FfmpegGifConverter {
    fn default() -> Self {
        Self::new(Tool::new(DEFAULT_FFMPEG))
    }
}

#[async_trait::async_trait]
impl MovConverter for FfmpegGifConverter {
    async fn to_gif(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
        self.tool.run(Self::args(input, output), None).await?;

        let written = tokio::fs::metadata(output).await.map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            return Err(ConvertError::EmptyOutput);
        }
        Ok(())
    }
}
