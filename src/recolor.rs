use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

/// Width and height of the generated favicon.
pub const TARGET_SIZE: u32 = 64;

const OPAQUE_BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Pixels brighter than this are the white backdrop when opaque.
const BACKGROUND_BRIGHTNESS: f32 = 240.0;

/// Pixels brighter than this are anti-aliasing against the white backdrop.
const EDGE_BRIGHTNESS: f32 = 200.0;

/// Alpha above which a pixel counts as opaque.
const OPAQUE_ALPHA: u8 = 200;

/// Alpha below which a pixel counts as transparent.
const TRANSPARENT_ALPHA: u8 = 128;

/// What a single source pixel belongs to. Variants are listed in the order they are checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelClass {
    /// Opaque white or near-white backdrop.
    NearWhite,

    /// Transparent or semi-transparent backdrop.
    Transparent,

    /// Light anti-aliased edge blending into the backdrop.
    LightEdge,

    /// Part of the logo itself.
    Foreground,
}

impl PixelClass {
    pub fn is_background(self) -> bool {
        !matches!(self, PixelClass::Foreground)
    }
}

/// Arithmetic mean of the red, green and blue channels.
pub fn brightness(pixel: &Rgba<u8>) -> f32 {
    let [red, green, blue, _] = pixel.0;
    (red as f32 + green as f32 + blue as f32) / 3.0
}

pub fn classify(pixel: &Rgba<u8>) -> PixelClass {
    let alpha = pixel.0[3];
    let brightness = brightness(pixel);

    // Comparisons are strict, a pixel with alpha of exactly 200 is never considered opaque
    if brightness > BACKGROUND_BRIGHTNESS && alpha > OPAQUE_ALPHA {
        PixelClass::NearWhite
    } else if alpha < TRANSPARENT_ALPHA {
        PixelClass::Transparent
    } else if brightness > EDGE_BRIGHTNESS && alpha > OPAQUE_ALPHA {
        PixelClass::LightEdge
    } else {
        PixelClass::Foreground
    }
}

/// Background turns opaque black, everything else keeps its color and becomes fully opaque.
pub fn recolor_pixel(pixel: &Rgba<u8>) -> Rgba<u8> {
    if classify(pixel).is_background() {
        OPAQUE_BLACK
    } else {
        let [red, green, blue, _] = pixel.0;
        Rgba([red, green, blue, 255])
    }
}

pub fn recolor_frame(frame: &RgbaImage) -> RgbaImage {
    let (width, height) = frame.dimensions();
    RgbaImage::from_fn(width, height, |x, y| recolor_pixel(frame.get_pixel(x, y)))
}

pub fn downscale(frame: &RgbaImage, size: u32) -> RgbaImage {
    imageops::resize(frame, size, size, FilterType::Lanczos3)
}

/// Converts decoded frames of a logo on a light background into square favicon frames on
/// black.
#[derive(Debug, Clone, Copy)]
pub struct FrameRecolorer {
    target_size: u32,
}

impl FrameRecolorer {
    pub fn new(target_size: u32) -> Self {
        Self { target_size }
    }

    pub fn target_size(&self) -> u32 {
        self.target_size
    }

    /// Recolor first, then resize. Resampling has to see the black background already,
    /// otherwise the white backdrop bleeds into the logo edges.
    pub fn process(&self, frame: &RgbaImage) -> RgbaImage {
        let recolored = recolor_frame(frame);
        downscale(&recolored, self.target_size)
    }
}

impl Default for FrameRecolorer {
    fn default() -> Self {
        Self::new(TARGET_SIZE)
    }
}
