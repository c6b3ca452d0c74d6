mod encode;
mod frames;
mod recolor;

use anyhow::{bail, Result};

pub use encode::{optimize_palette, quantize, FaviconAnimation};
pub use frames::{AnimatedSource, SourceFrame, SourceFrames, DEFAULT_DURATION_MS};
pub use recolor::{
    brightness, classify, downscale, recolor_frame, recolor_pixel, FrameRecolorer, PixelClass,
    TARGET_SIZE,
};

/// Turn every frame of `source` into a black background favicon frame, keeping the declared
/// display durations in playback order.
pub fn convert(source: &AnimatedSource, recolorer: &FrameRecolorer) -> Result<FaviconAnimation> {
    let mut animation = FaviconAnimation::new(recolorer.target_size())?;

    for frame in source.frames()? {
        let frame = frame?;

        // Duration is taken before touching any pixels so both lists stay aligned
        let duration_ms = frame.duration_ms;
        let favicon_frame = recolorer.process(&frame.image);
        animation.push(&favicon_frame, duration_ms)?;
    }

    if animation.is_empty() {
        bail!("source contains no frames");
    }

    Ok(animation)
}
