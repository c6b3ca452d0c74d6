use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use gif::{Encoder, Frame, Repeat};
use image::RgbaImage;

/// NeuQuant sampling factor, 1 is best quality and 30 is fastest.
const QUANTIZER_SPEED: i32 = 10;

/// GIF delays are stored in hundredths of a second.
fn to_centiseconds(duration_ms: u32) -> u16 {
    let centiseconds = duration_ms.saturating_add(5) / 10;
    centiseconds.min(u16::MAX as u32) as u16
}

/// Reduce an RGBA frame to an indexed frame with a local palette of at most 256 colors.
///
/// Frames with 256 distinct colors or less keep their exact colors, anything above that is
/// reduced with NeuQuant. Palette entries no pixel refers to are dropped afterwards.
pub fn quantize(image: &RgbaImage, duration_ms: u32) -> Result<Frame<'static>> {
    let width = u16::try_from(image.width()).context("Frame too wide for GIF")?;
    let height = u16::try_from(image.height()).context("Frame too high for GIF")?;

    let mut pixels = image.as_raw().clone();
    let mut frame = Frame::from_rgba_speed(width, height, &mut pixels, QUANTIZER_SPEED);
    frame.delay = to_centiseconds(duration_ms);
    optimize_palette(&mut frame);

    Ok(frame)
}

/// Remove unused palette entries and remap the frame's indices accordingly.
pub fn optimize_palette(frame: &mut Frame<'_>) {
    let palette = match frame.palette.take() {
        Some(palette) => palette,
        None => return,
    };

    let mut used = [false; 256];
    for &index in frame.buffer.iter() {
        used[index as usize] = true;
    }

    let mut remap = [0_u8; 256];
    let mut compacted: Vec<u8> = Vec::with_capacity(palette.len());
    for (index, rgb) in palette.chunks_exact(3).enumerate() {
        if used[index] {
            remap[index] = (compacted.len() / 3) as u8;
            compacted.extend_from_slice(rgb);
        }
    }

    let buffer: Vec<u8> = frame.buffer.iter().map(|&index| remap[index as usize]).collect();
    frame.buffer = buffer.into();
    frame.transparent = frame
        .transparent
        .filter(|&index| used[index as usize])
        .map(|index| remap[index as usize]);
    frame.palette = Some(compacted);
}

/// Square favicon animation, looping forever, made out of palette-indexed frames.
pub struct FaviconAnimation {
    size: u16,
    frames: Vec<Frame<'static>>,
    durations: Vec<u32>,
}

impl FaviconAnimation {
    pub fn new(size: u32) -> Result<Self> {
        let size = u16::try_from(size).context("Favicon size does not fit into GIF")?;

        Ok(Self {
            size,
            frames: Vec::new(),
            durations: Vec::new(),
        })
    }

    /// Quantize and append the next frame.
    pub fn push(&mut self, image: &RgbaImage, duration_ms: u32) -> Result<()> {
        let size = self.size as u32;
        ensure!(
            image.dimensions() == (size, size),
            "Frame is {}x{} but favicon is {}x{}",
            image.width(),
            image.height(),
            size,
            size
        );

        self.frames.push(quantize(image, duration_ms)?);
        self.durations.push(duration_ms);
        Ok(())
    }

    pub fn size(&self) -> u32 {
        self.size as u32
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Frame<'static>] {
        &self.frames
    }

    /// Display duration in milliseconds of every frame, in playback order.
    pub fn durations(&self) -> &[u32] {
        &self.durations
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        ensure!(!self.is_empty(), "Can not write animation without frames");

        let mut encoder = Encoder::new(writer, self.size, self.size, &[])?;
        encoder.set_repeat(Repeat::Infinite)?;
        for frame in &self.frames {
            encoder.write_frame(frame)?;
        }

        // Trailer gets written when the encoder is dropped
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut data = Vec::new();
        self.write_to(&mut data)?;
        fs::write(path, data).with_context(|| format!("Failed writing {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use gif::Frame;
    use image::{Rgba, RgbaImage};

    use super::{optimize_palette, quantize, to_centiseconds, FaviconAnimation};

    fn gradient(size: u32) -> RgbaImage {
        RgbaImage::from_fn(size, size, |x, y| {
            Rgba([(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8, 255])
        })
    }

    #[test]
    fn centiseconds_are_rounded() {
        assert_eq!(to_centiseconds(100), 10);
        assert_eq!(to_centiseconds(44), 4);
        assert_eq!(to_centiseconds(45), 5);
        assert_eq!(to_centiseconds(0), 0);
        assert_eq!(to_centiseconds(u32::MAX), u16::MAX);
    }

    #[test]
    fn few_colors_keep_exact_palette() {
        let image = RgbaImage::from_fn(64, 64, |x, _| {
            if x < 32 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([212, 175, 55, 255])
            }
        });
        let frame = quantize(&image, 80).unwrap();

        assert_eq!((frame.width, frame.height), (64, 64));
        assert_eq!(frame.delay, 8);
        assert_eq!(frame.transparent, None);

        let palette = frame.palette.clone().unwrap();
        assert_eq!(palette.len(), 6);
        let colors: HashSet<&[u8]> = palette.chunks_exact(3).collect();
        assert!(colors.contains(&[0_u8, 0, 0][..]));
        assert!(colors.contains(&[212_u8, 175, 55][..]));
    }

    #[test]
    fn many_colors_are_reduced_to_256() {
        let frame = quantize(&gradient(64), 100).unwrap();
        let palette = frame.palette.clone().unwrap();

        assert!(palette.len() <= 256 * 3);
        assert_eq!(frame.buffer.len(), 64 * 64);
        assert!(frame.buffer.iter().all(|&index| (index as usize) < palette.len() / 3));
    }

    #[test]
    fn unused_palette_entries_are_dropped() {
        let mut frame = Frame {
            width: 2,
            height: 2,
            buffer: vec![3, 1, 3, 1].into(),
            palette: Some(vec![
                0, 0, 0, // 0
                10, 10, 10, // 1
                20, 20, 20, // 2
                30, 30, 30, // 3
            ]),
            transparent: Some(2),
            ..Frame::default()
        };
        optimize_palette(&mut frame);

        assert_eq!(frame.palette, Some(vec![10, 10, 10, 30, 30, 30]));
        assert_eq!(&frame.buffer[..], &[1, 0, 1, 0]);
        assert_eq!(frame.transparent, None);
    }

    #[test]
    fn frames_and_durations_stay_aligned() {
        let mut animation = FaviconAnimation::new(64).unwrap();
        for duration in [40, 250, 90] {
            animation.push(&gradient(64), duration).unwrap();
        }

        assert_eq!(animation.len(), 3);
        assert_eq!(animation.durations(), &[40, 250, 90]);
        let delays: Vec<u16> = animation.frames().iter().map(|frame| frame.delay).collect();
        assert_eq!(delays, vec![4, 25, 9]);
    }

    #[test]
    fn wrong_frame_size_is_rejected() {
        let mut animation = FaviconAnimation::new(64).unwrap();
        assert!(animation.push(&gradient(32), 100).is_err());
        assert!(animation.is_empty());
    }

    #[test]
    fn empty_animation_can_not_be_written() {
        let animation = FaviconAnimation::new(64).unwrap();
        let mut data = Vec::new();
        assert!(animation.write_to(&mut data).is_err());
    }

    #[test]
    fn written_animation_loops_forever() {
        let mut animation = FaviconAnimation::new(64).unwrap();
        animation.push(&gradient(64), 100).unwrap();
        animation.push(&gradient(64), 100).unwrap();

        let mut data = Vec::new();
        animation.write_to(&mut data).unwrap();

        assert_eq!(&data[..6], b"GIF89a");
        assert_eq!(u16::from_le_bytes([data[6], data[7]]), 64);
        assert_eq!(u16::from_le_bytes([data[8], data[9]]), 64);

        // NETSCAPE2.0 application extension with a loop count of 0
        let netscape = data
            .windows(11)
            .position(|window| window == b"NETSCAPE2.0")
            .unwrap();
        assert_eq!(&data[netscape + 11..netscape + 15], &[3, 1, 0, 0]);
        assert_eq!(data.last(), Some(&0x3b));
    }
}
