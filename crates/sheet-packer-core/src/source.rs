use crate::model::{Frame, Rect};
use image::RgbaImage;
use std::collections::HashMap;

/// Pixel-side collaborator of the orchestrator.
///
/// The packers only see sizes; trimming and identical detection go through
/// this seam so layout-only callers can pack without any pixels.
pub trait SpriteSource {
    /// Shrinks `frame` to its visible region. Leaves the frame untouched
    /// when nothing can be trimmed.
    fn trim(&self, frame: &mut Frame, alpha_threshold: u8);

    /// Bytes compared by identical detection, `None` when the sprite has no
    /// comparable content.
    fn content(&self, frame: &Frame) -> Option<Vec<u8>>;
}

/// Computes the opaque bounds of `rgba`: pixels with alpha greater than
/// `threshold` count as opaque.
///
/// Returns `(None, full)` for a fully transparent image, otherwise the
/// trimmed size at the origin and the visible region within the image.
pub fn compute_trim_rect(rgba: &RgbaImage, threshold: u8) -> (Option<Rect>, Rect) {
    let (w, h) = rgba.dimensions();
    let opaque = |x: u32, y: u32| rgba.get_pixel(x, y)[3] > threshold;
    let column_clear = |x: u32, y1: u32, y2: u32| (y1..=y2).all(|y| !opaque(x, y));
    let row_clear = |y: u32, x1: u32, x2: u32| (x1..=x2).all(|x| !opaque(x, y));

    if w == 0 || h == 0 {
        return (None, Rect::new(0, 0, w, h));
    }
    let mut x1 = 0;
    while x1 < w && column_clear(x1, 0, h - 1) {
        x1 += 1;
    }
    if x1 >= w {
        return (None, Rect::new(0, 0, w, h));
    }
    let mut x2 = w - 1;
    while x2 > x1 && column_clear(x2, 0, h - 1) {
        x2 -= 1;
    }
    let mut y1 = 0;
    while y1 < h && row_clear(y1, x1, x2) {
        y1 += 1;
    }
    let mut y2 = h - 1;
    while y2 > y1 && row_clear(y2, x1, x2) {
        y2 -= 1;
    }
    let tw = x2 - x1 + 1;
    let th = y2 - y1 + 1;
    (Some(Rect::new(0, 0, tw, th)), Rect::new(x1, y1, tw, th))
}

/// Decoded sprites keyed by frame name.
#[derive(Debug, Default, Clone)]
pub struct ImageSource {
    images: HashMap<String, RgbaImage>,
}

impl ImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, rgba: RgbaImage) {
        self.images.insert(name.into(), rgba);
    }

    pub fn get(&self, name: &str) -> Option<&RgbaImage> {
        self.images.get(name)
    }
}

impl SpriteSource for ImageSource {
    fn trim(&self, frame: &mut Frame, alpha_threshold: u8) {
        let Some(rgba) = self.images.get(&frame.name) else {
            return;
        };
        let (Some(trimmed), visible) = compute_trim_rect(rgba, alpha_threshold) else {
            return;
        };
        if (trimmed.w, trimmed.h) == rgba.dimensions() {
            return;
        }
        frame.frame.w = trimmed.w;
        frame.frame.h = trimmed.h;
        frame.sprite_source_size = visible;
        frame.trimmed = true;
    }

    /// Raw RGBA rows of the visible region, so trimmed duplicates compare
    /// equal even when their transparent margins differ.
    fn content(&self, frame: &Frame) -> Option<Vec<u8>> {
        let rgba = self.images.get(&frame.name)?;
        let r = frame.sprite_source_size;
        if r.right() > rgba.width() || r.bottom() > rgba.height() {
            return None;
        }
        let stride = rgba.width() as usize * 4;
        let raw = rgba.as_raw();
        let mut out = Vec::with_capacity(r.area() as usize * 4);
        for y in r.y..r.bottom() {
            let start = y as usize * stride + r.x as usize * 4;
            out.extend_from_slice(&raw[start..start + r.w as usize * 4]);
        }
        Some(out)
    }
}

/// Content handles for layout-only packing. Sprites arrive already trimmed.
#[derive(Debug, Default, Clone)]
pub struct LayoutSource {
    contents: HashMap<String, Vec<u8>>,
}

impl LayoutSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, content: Vec<u8>) {
        self.contents.insert(name.into(), content);
    }
}

impl SpriteSource for LayoutSource {
    fn trim(&self, _frame: &mut Frame, _alpha_threshold: u8) {}

    fn content(&self, frame: &Frame) -> Option<Vec<u8>> {
        self.contents.get(&frame.name).cloned()
    }
}
