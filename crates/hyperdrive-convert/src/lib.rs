//! Media converters backed by external command-line tools.

pub mod ffmpeg;
pub mod magick;
pub mod tool;

use std::sync::Arc;

use hyperdrive::Converters;

pub use ffmpeg::FfmpegGifConverter;
pub use magick::MagickHeicConverter;
pub use tool::Tool;

/// Converters that shell out to `magick` and `ffmpeg`.
pub fn command_line(magick: Tool, ffmpeg: Tool) -> Converters {
    Converters::new(
        Arc::new(MagickHeicConverter::new(magick)),
        Arc::new(FfmpegGifConverter::new(ffmpeg)),
    )
}
