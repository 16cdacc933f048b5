use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Exclusive right edge (`x + w`).
    pub fn right(&self) -> u32 {
        self.x + self.w
    }
    /// Exclusive bottom edge (`y + h`).
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }
    /// Returns true if `r` is fully inside `self`.
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x && r.y >= self.y && r.right() <= self.right() && r.bottom() <= self.bottom()
    }
    /// Returns true if the interiors of `self` and `r` overlap.
    pub fn intersects(&self, r: &Rect) -> bool {
        !(self.x >= r.right() || r.x >= self.right() || self.y >= r.bottom() || r.y >= self.bottom())
    }
}

/// Original (untrimmed) size of a sprite.
///
/// `mw`/`mh` hold the largest source size among the frames of the same
/// animation strip so exporters can keep the strip uniformly sized.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceSize {
    pub w: u32,
    pub h: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mw: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mh: Option<u32>,
}

/// One sprite candidate for placement.
///
/// `frame.w/h` are the packed (possibly trimmed) dimensions in the sprite's
/// natural orientation; when `rotated` is set the footprint on the sheet is
/// `frame.h x frame.w`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Frame {
    /// Stable identifier, unique within a run except for identical clones.
    pub name: String,
    /// Placement on the sheet plus packed size.
    pub frame: Rect,
    /// Visible region within the original image.
    pub sprite_source_size: Rect,
    pub source_size: SourceSize,
    /// Placed turned by 90 degrees.
    pub rotated: bool,
    pub trimmed: bool,
    /// Name of the canonical frame this one duplicates (set during identical detection).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identical: Option<String>,
    /// Shares pixel data with another frame.
    #[serde(default)]
    pub cloned: bool,
    #[serde(default)]
    pub skip_render: bool,
}

impl Frame {
    /// Creates an unplaced, untrimmed frame for a `w x h` image.
    pub fn new(name: impl Into<String>, w: u32, h: u32) -> Self {
        Self {
            name: name.into(),
            frame: Rect::new(0, 0, w, h),
            sprite_source_size: Rect::new(0, 0, w, h),
            source_size: SourceSize {
                w,
                h,
                mw: None,
                mh: None,
            },
            rotated: false,
            trimmed: false,
            identical: None,
            cloned: false,
            skip_render: false,
        }
    }

    /// Width/height occupied on the sheet (swapped when rotated).
    pub fn placed_size(&self) -> (u32, u32) {
        if self.rotated {
            (self.frame.h, self.frame.w)
        } else {
            (self.frame.w, self.frame.h)
        }
    }

    /// Footprint on the sheet.
    pub fn placed_rect(&self) -> Rect {
        let (w, h) = self.placed_size();
        Rect::new(self.frame.x, self.frame.y, w, h)
    }
}

/// One bin's worth of placed frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sheet {
    pub id: usize,
    pub width: u32,
    pub height: u32,
    pub frames: Vec<Frame>,
}

/// Statistics about packing efficiency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PackStats {
    pub num_sheets: usize,
    /// Rendered frames (clones excluded).
    pub num_frames: usize,
    /// Frames sharing pixels with a canonical frame.
    pub num_clones: usize,
    /// Sum of width * height over all sheets.
    pub total_sheet_area: u64,
    /// Sum of packed frame areas (clones excluded).
    pub used_frame_area: u64,
    /// used_frame_area / total_sheet_area (0.0 to 1.0).
    pub occupancy: f64,
    pub max_sheet_width: u32,
    pub max_sheet_height: u32,
    pub num_rotated: usize,
    pub num_trimmed: usize,
}

impl PackStats {
    pub fn from_sheets(sheets: &[Sheet]) -> Self {
        let mut stats = PackStats {
            num_sheets: sheets.len(),
            num_frames: 0,
            num_clones: 0,
            total_sheet_area: 0,
            used_frame_area: 0,
            occupancy: 0.0,
            max_sheet_width: 0,
            max_sheet_height: 0,
            num_rotated: 0,
            num_trimmed: 0,
        };
        for sheet in sheets {
            stats.total_sheet_area += sheet.width as u64 * sheet.height as u64;
            stats.max_sheet_width = stats.max_sheet_width.max(sheet.width);
            stats.max_sheet_height = stats.max_sheet_height.max(sheet.height);
            for f in &sheet.frames {
                if f.skip_render {
                    stats.num_clones += 1;
                    continue;
                }
                stats.num_frames += 1;
                stats.used_frame_area += f.frame.area();
                if f.rotated {
                    stats.num_rotated += 1;
                }
                if f.trimmed {
                    stats.num_trimmed += 1;
                }
            }
        }
        if stats.total_sheet_area > 0 {
            stats.occupancy = stats.used_frame_area as f64 / stats.total_sheet_area as f64;
        }
        stats
    }

    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Sheets: {}, Frames: {} (+{} clones), Occupancy: {:.2}%, Sheet Area: {} px², Used Area: {} px², Rotated: {}, Trimmed: {}",
            self.num_sheets,
            self.num_frames,
            self.num_clones,
            self.occupancy * 100.0,
            self.total_sheet_area,
            self.used_frame_area,
            self.num_rotated,
            self.num_trimmed,
        )
    }

    /// Returns wasted space in pixels.
    pub fn wasted_area(&self) -> u64 {
        self.total_sheet_area.saturating_sub(self.used_frame_area)
    }
}
