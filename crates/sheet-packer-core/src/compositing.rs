use crate::model::Sheet;
use crate::source::ImageSource;
use image::RgbaImage;

/// Blit a sub-rectangle from `src` into `canvas` at destination (dx, dy),
/// optionally rotated 90° clockwise.
///
/// - (sx, sy, sw, sh): source rectangle within `src`
/// - (dx, dy): destination top-left in `canvas`
/// - rotated: if true, the destination footprint is `sh x sw`
#[allow(clippy::too_many_arguments)]
pub fn blit_rgba(
    src: &RgbaImage,
    canvas: &mut RgbaImage,
    dx: u32,
    dy: u32,
    sx: u32,
    sy: u32,
    sw: u32,
    sh: u32,
    rotated: bool,
) {
    let (cw, ch) = canvas.dimensions();
    let (iw, ih) = src.dimensions();
    let (rw, rh) = if rotated { (sh, sw) } else { (sw, sh) };

    for yy in 0..rh {
        for xx in 0..rw {
            let (ix, iy) = if rotated {
                (sx + yy, sy + (sh - 1 - xx))
            } else {
                (sx + xx, sy + yy)
            };
            if dx + xx < cw && dy + yy < ch && ix < iw && iy < ih {
                let px = *src.get_pixel(ix, iy);
                canvas.put_pixel(dx + xx, dy + yy, px);
            }
        }
    }
}

/// Composites the rendered frames of `sheet` onto a transparent canvas of
/// the sheet's size. Clones flagged `skip_render` and frames without pixels
/// in `source` are left out.
pub fn render_sheet(sheet: &Sheet, source: &ImageSource) -> RgbaImage {
    let mut canvas = RgbaImage::new(sheet.width, sheet.height);
    for f in sheet.frames.iter().filter(|f| !f.skip_render) {
        let Some(src) = source.get(&f.name) else {
            continue;
        };
        let visible = f.sprite_source_size;
        blit_rgba(
            src,
            &mut canvas,
            f.frame.x,
            f.frame.y,
            visible.x,
            visible.y,
            f.frame.w,
            f.frame.h,
            f.rotated,
        );
    }
    canvas
}
