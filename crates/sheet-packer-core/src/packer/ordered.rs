use super::{Block, PackMethod, Packer, bounding_area, extract};
use crate::error::{Result, SheetPackerError};
use crate::model::Frame;

/// Input orderings for the row packers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderedMethod {
    Unsorted,
    SortedAreaDesc,
    SortedAreaAsc,
}

impl OrderedMethod {
    pub(crate) fn sort(self, blocks: &mut [Block]) {
        match self {
            OrderedMethod::Unsorted => {}
            OrderedMethod::SortedAreaDesc => blocks.sort_by_key(|b| std::cmp::Reverse(b.area())),
            OrderedMethod::SortedAreaAsc => blocks.sort_by_key(|b| b.area()),
        }
    }
}

impl PackMethod for OrderedMethod {
    const PACKER: &'static str = "Ordered";
    const ALL: &'static [Self] = &[
        OrderedMethod::Unsorted,
        OrderedMethod::SortedAreaDesc,
        OrderedMethod::SortedAreaAsc,
    ];

    fn name(self) -> &'static str {
        match self {
            OrderedMethod::Unsorted => "Unsorted",
            OrderedMethod::SortedAreaDesc => "SortedAreaDesc",
            OrderedMethod::SortedAreaAsc => "SortedAreaAsc",
        }
    }

    fn description(self) -> &'static str {
        match self {
            OrderedMethod::Unsorted => "Rows in input (name) order.",
            OrderedMethod::SortedAreaDesc => "Rows with the largest sprites first.",
            OrderedMethod::SortedAreaAsc => "Rows with the smallest sprites first.",
        }
    }
}

/// Result of one row pass.
#[derive(Debug, Clone)]
pub(crate) struct RowLayout {
    pub blocks: Vec<Block>,
}

impl RowLayout {
    pub fn len(&self) -> usize {
        self.blocks.len()
    }
    pub fn area(&self) -> u64 {
        bounding_area(&self.blocks)
    }
}

/// Target row width: enough average-width sprites per row to approach a
/// square of the total area, never narrower than the widest sprite.
fn ideal_row_width(blocks: &[Block], bin_w: u32) -> u32 {
    let n = blocks.len() as f64;
    let total_area: u64 = blocks.iter().map(Block::area).sum();
    let total_w: u64 = blocks.iter().map(|b| b.w as u64).sum();
    let max_w = blocks.iter().map(|b| b.w).max().unwrap_or(0);
    let side = (total_area as f64).sqrt();
    let avg_w = total_w as f64 / n;
    let per_row = if avg_w > 0.0 {
        (side / avg_w).round().max(1.0)
    } else {
        1.0
    };
    ((per_row * avg_w).ceil() as u32).max(max_w).min(bin_w)
}

/// Left-to-right, top-to-bottom row placement.
///
/// With `rotate`, a wide-and-short block lies sideways when that fits under
/// the current row's height. Returns `None` when a block overflows the bin,
/// unless `stop_when_full` is set, in which case the prefix that fit is kept.
pub(crate) fn shelf_pass(
    blocks: &[Block],
    bin_w: u32,
    bin_h: u32,
    rotate: bool,
    stop_when_full: bool,
) -> Option<RowLayout> {
    if blocks.is_empty() {
        return Some(RowLayout { blocks: Vec::new() });
    }
    let row_width = ideal_row_width(blocks, bin_w);
    let (mut x, mut y, mut row_h) = (0u32, 0u32, 0u32);
    let mut out = Vec::with_capacity(blocks.len());

    for b in blocks {
        let mut blk = *b;
        blk.rotated = rotate && row_h > 0 && b.w > b.h && b.w <= row_h;
        let (mut w, mut h) = blk.placed_size();
        if x > 0 && (x + w > row_width || x + w > bin_w) {
            x = 0;
            y += row_h;
            row_h = 0;
            // a fresh row has no height to lean on
            blk.rotated = false;
            (w, h) = (b.w, b.h);
        }
        if x + w > bin_w || y + h > bin_h {
            if stop_when_full {
                break;
            }
            return None;
        }
        blk.x = x;
        blk.y = y;
        x += w;
        row_h = row_h.max(h);
        out.push(blk);
    }
    Some(RowLayout { blocks: out })
}

/// Picks the smaller of two complete layouts.
pub(crate) fn smaller_full(a: Option<RowLayout>, b: Option<RowLayout>) -> Option<RowLayout> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if b.area() < a.area() { b } else { a }),
        (a, b) => a.or(b),
    }
}

pub struct OrderedPacker {
    bin_width: u32,
    bin_height: u32,
    allow_rotate: bool,
    padding: u32,
}

impl OrderedPacker {
    pub fn new(bin_width: u32, bin_height: u32, allow_rotate: bool, padding: u32) -> Self {
        Self {
            bin_width,
            bin_height,
            allow_rotate,
            padding,
        }
    }

    fn layout(&self, blocks: &[Block]) -> RowLayout {
        let (w, h) = (self.bin_width, self.bin_height);
        let plain = shelf_pass(blocks, w, h, false, false);
        let turned = if self.allow_rotate {
            shelf_pass(blocks, w, h, true, false)
        } else {
            None
        };
        if let Some(full) = smaller_full(plain, turned) {
            return full;
        }

        // nothing fits completely: keep the pass that places more
        let plain = shelf_pass(blocks, w, h, false, true).unwrap_or(RowLayout { blocks: vec![] });
        if !self.allow_rotate {
            return plain;
        }
        let turned = shelf_pass(blocks, w, h, true, true).unwrap_or(RowLayout { blocks: vec![] });
        if turned.len() > plain.len() || (turned.len() == plain.len() && turned.area() < plain.area())
        {
            turned
        } else {
            plain
        }
    }
}

impl Packer for OrderedPacker {
    fn pack(&mut self, frames: &[Frame], method: &str) -> Result<Vec<Frame>> {
        let method = OrderedMethod::parse(method)?;
        if frames.is_empty() {
            return Ok(Vec::new());
        }
        let mut blocks = Block::from_frames(frames, self.padding);
        method.sort(&mut blocks);

        let layout = self.layout(&blocks);
        if layout.blocks.is_empty() {
            return Err(SheetPackerError::Exhausted {
                packer: OrderedMethod::PACKER,
                method: method.name().to_string(),
                remaining: frames.len(),
            });
        }
        Ok(extract(frames, &layout.blocks))
    }
}
