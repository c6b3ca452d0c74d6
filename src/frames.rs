use std::fs;
use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result};
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, Frames, RgbaImage};

/// Display duration used for frames which do not declare one.
pub const DEFAULT_DURATION_MS: u32 = 100;

/// Encoded animated GIF kept in memory. Frames are only decoded while iterating over them.
#[derive(Debug, Clone)]
pub struct AnimatedSource {
    data: Vec<u8>,
}

impl AnimatedSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data =
            fs::read(path).with_context(|| format!("Failed reading {}", path.display()))?;
        Ok(Self::from_bytes(data))
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Start a new pass over all frames, beginning at index 0. Can be called any number of
    /// times, every call decodes the animation from scratch.
    pub fn frames(&self) -> Result<SourceFrames<'_>> {
        let decoder = GifDecoder::new(Cursor::new(self.data.as_slice()))
            .context("Failed decoding animated image")?;

        Ok(SourceFrames {
            frames: decoder.into_frames(),
            index: 0,
        })
    }
}

/// Single decoded frame of the source animation.
#[derive(Debug, Clone)]
pub struct SourceFrame {
    pub index: usize,
    pub duration_ms: u32,

    /// Composited RGBA pixels covering the whole logical screen.
    pub image: RgbaImage,
}

/// Lazy sequence of source frames. Ends with `None` once the last frame was read.
pub struct SourceFrames<'a> {
    frames: Frames<'a>,
    index: usize,
}

impl<'a> Iterator for SourceFrames<'a> {
    type Item = Result<SourceFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        let frame = match self.frames.next()? {
            Ok(frame) => frame,
            Err(err) => {
                return Some(Err(err).with_context(|| {
                    format!("Failed decoding frame {}", self.index)
                }))
            }
        };

        let (numer, denom) = frame.delay().numer_denom_ms();
        let declared_ms = if denom == 0 { 0 } else { numer / denom };

        // GIF has no way to tell "no delay" apart from a delay of zero
        let duration_ms = if declared_ms == 0 {
            DEFAULT_DURATION_MS
        } else {
            declared_ms
        };

        let source_frame = SourceFrame {
            index: self.index,
            duration_ms,
            image: frame.into_buffer(),
        };
        self.index += 1;

        Some(Ok(source_frame))
    }
}
