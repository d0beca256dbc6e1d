use std::ffi::OsString;

use hyperdrive::{ConvertError, HeicConverter};

use crate::tool::Tool;

pub const DEFAULT_MAGICK: &str = "magick";

/// HEIC to JPEG through ImageMagick, piping bytes over stdin and stdout.
#[derive(Debug, Clone)]
pub struct MagickHeicConverter {
    tool: Tool,
}

impl MagickHeicConverter {
    pub fn new(tool: Tool) -> Self {
        Self { tool }
    }

    fn args() -> Vec<OsString> {
        ["heic:-", "-quality", "100", "jpeg:-"]
            .into_iter()
            .map(OsString::from)
            .collect()
    }
}

impl Default for MagickHeicConverter {
    fn default() -> Self {
        Self::new(Tool::new(DEFAULT_MAGICK))
    }
}

#[async_trait::async_trait]
impl HeicConverter for MagickHeicConverter {
    async fn to_jpeg(&self, heic: Vec<u8>) -> Result<Vec<u8>, ConvertError> {
        let output = self.tool.run(Self::args(), Some(heic)).await?;
        if output.stdout.is_empty() {
            return Err(ConvertError::EmptyOutput);
        }
        Ok(output.stdout)
    }
}
