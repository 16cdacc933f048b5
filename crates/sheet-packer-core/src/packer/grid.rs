use super::ordered::{OrderedMethod, RowLayout, shelf_pass, smaller_full};
use super::{Block, PackMethod, Packer, extract};
use crate::error::{Result, SheetPackerError};
use crate::model::Frame;
use tracing::trace;

/// Candidate sheet sizes advance in steps of this many pixels on each axis.
pub const GRID_STEP: u32 = 128;

/// Grid search methods: an input ordering plus the row placer to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridMethod {
    Unsorted,
    SortedAreaDesc,
    SortedAreaAsc,
    AltUnsorted,
    AltSortedAreaDesc,
    AltSortedAreaAsc,
}

impl GridMethod {
    fn order(self) -> OrderedMethod {
        match self {
            GridMethod::Unsorted | GridMethod::AltUnsorted => OrderedMethod::Unsorted,
            GridMethod::SortedAreaDesc | GridMethod::AltSortedAreaDesc => {
                OrderedMethod::SortedAreaDesc
            }
            GridMethod::SortedAreaAsc | GridMethod::AltSortedAreaAsc => OrderedMethod::SortedAreaAsc,
        }
    }

    fn alt(self) -> bool {
        matches!(
            self,
            GridMethod::AltUnsorted | GridMethod::AltSortedAreaDesc | GridMethod::AltSortedAreaAsc
        )
    }
}

impl PackMethod for GridMethod {
    const PACKER: &'static str = "GridSearch";
    const ALL: &'static [Self] = &[
        GridMethod::Unsorted,
        GridMethod::SortedAreaDesc,
        GridMethod::SortedAreaAsc,
        GridMethod::AltUnsorted,
        GridMethod::AltSortedAreaDesc,
        GridMethod::AltSortedAreaAsc,
    ];

    fn name(self) -> &'static str {
        match self {
            GridMethod::Unsorted => "Unsorted",
            GridMethod::SortedAreaDesc => "SortedAreaDesc",
            GridMethod::SortedAreaAsc => "SortedAreaAsc",
            GridMethod::AltUnsorted => "AltUnsorted",
            GridMethod::AltSortedAreaDesc => "AltSortedAreaDesc",
            GridMethod::AltSortedAreaAsc => "AltSortedAreaAsc",
        }
    }

    fn description(self) -> &'static str {
        match self {
            GridMethod::Unsorted => "Smallest sheet found by grid search, balanced rows, input order.",
            GridMethod::SortedAreaDesc => {
                "Smallest sheet found by grid search, balanced rows, largest first."
            }
            GridMethod::SortedAreaAsc => {
                "Smallest sheet found by grid search, balanced rows, smallest first."
            }
            GridMethod::AltUnsorted => {
                "Smallest sheet found by grid search, fill rows to the edge, input order."
            }
            GridMethod::AltSortedAreaDesc => {
                "Smallest sheet found by grid search, fill rows to the edge, largest first."
            }
            GridMethod::AltSortedAreaAsc => {
                "Smallest sheet found by grid search, fill rows to the edge, smallest first."
            }
        }
    }
}

/// Row placer that fills each row up to the bin edge, taking whichever
/// orientation fits, and wraps only when neither does.
fn edge_row_pass(
    blocks: &[Block],
    bin_w: u32,
    bin_h: u32,
    rotate: bool,
    stop_when_full: bool,
) -> Option<RowLayout> {
    let fits = |x: u32, y: u32, w: u32, h: u32| x + w <= bin_w && y + h <= bin_h;
    let (mut x, mut y, mut row_h) = (0u32, 0u32, 0u32);
    let mut out = Vec::with_capacity(blocks.len());

    for b in blocks {
        let mut rotated = None;
        loop {
            if fits(x, y, b.w, b.h) {
                rotated = Some(false);
            } else if rotate && fits(x, y, b.h, b.w) {
                rotated = Some(true);
            }
            if rotated.is_some() || x == 0 {
                break;
            }
            x = 0;
            y += row_h;
            row_h = 0;
        }
        let Some(rotated) = rotated else {
            if stop_when_full {
                break;
            }
            return None;
        };
        let mut blk = *b;
        blk.rotated = rotated;
        blk.x = x;
        blk.y = y;
        let (w, h) = blk.placed_size();
        x += w;
        row_h = row_h.max(h);
        out.push(blk);
    }
    Some(RowLayout { blocks: out })
}

/// `min, min + GRID_STEP, ...` capped by and always ending at `max`.
fn candidate_sizes(min: u32, max: u32) -> Vec<u32> {
    let mut sizes = Vec::new();
    let mut s = min.min(max);
    while s < max {
        sizes.push(s);
        s += GRID_STEP;
    }
    sizes.push(max);
    sizes
}

pub struct GridSearchPacker {
    bin_width: u32,
    bin_height: u32,
    allow_rotate: bool,
    padding: u32,
}

impl GridSearchPacker {
    pub fn new(bin_width: u32, bin_height: u32, allow_rotate: bool, padding: u32) -> Self {
        Self {
            bin_width,
            bin_height,
            allow_rotate,
            padding,
        }
    }

    fn pass(
        &self,
        alt: bool,
        blocks: &[Block],
        w: u32,
        h: u32,
        rotate: bool,
        stop: bool,
    ) -> Option<RowLayout> {
        if alt {
            edge_row_pass(blocks, w, h, rotate, stop)
        } else {
            shelf_pass(blocks, w, h, rotate, stop)
        }
    }

    /// Smallest-area candidate size at which every block fits.
    fn search(&self, alt: bool, blocks: &[Block]) -> Option<RowLayout> {
        let total_area: u64 = blocks.iter().map(Block::area).sum();
        let min_w = blocks.iter().map(|b| b.w).max().unwrap_or(0);
        let min_h = blocks.iter().map(|b| b.h).max().unwrap_or(0);
        let heights = candidate_sizes(min_h, self.bin_height);
        let mut best: Option<(u64, RowLayout)> = None;

        for w in candidate_sizes(min_w, self.bin_width) {
            for &h in &heights {
                let area = w as u64 * h as u64;
                if area < total_area {
                    continue;
                }
                if best.as_ref().is_some_and(|(best_area, _)| area >= *best_area) {
                    break;
                }
                let plain = self.pass(alt, blocks, w, h, false, false);
                let turned = if self.allow_rotate {
                    self.pass(alt, blocks, w, h, true, false)
                } else {
                    None
                };
                if let Some(layout) = smaller_full(plain, turned) {
                    trace!(w, h, "grid search fit");
                    best = Some((area, layout));
                    break;
                }
            }
        }
        best.map(|(_, layout)| layout)
    }
}

impl Packer for GridSearchPacker {
    fn pack(&mut self, frames: &[Frame], method: &str) -> Result<Vec<Frame>> {
        let method = GridMethod::parse(method)?;
        if frames.is_empty() {
            return Ok(Vec::new());
        }
        let mut blocks = Block::from_frames(frames, self.padding);
        method.order().sort(&mut blocks);
        let alt = method.alt();

        if let Some(layout) = self.search(alt, &blocks) {
            return Ok(extract(frames, &layout.blocks));
        }

        // no full fit anywhere: partial fill of the configured bin
        let (w, h) = (self.bin_width, self.bin_height);
        let plain = self
            .pass(alt, &blocks, w, h, false, true)
            .unwrap_or(RowLayout { blocks: vec![] });
        let layout = if self.allow_rotate {
            let turned = self
                .pass(alt, &blocks, w, h, true, true)
                .unwrap_or(RowLayout { blocks: vec![] });
            let more = turned.len() > plain.len();
            if more && (plain.blocks.is_empty() || turned.area() <= plain.area()) {
                turned
            } else {
                plain
            }
        } else {
            plain
        };
        if layout.blocks.is_empty() {
            return Err(SheetPackerError::Exhausted {
                packer: GridMethod::PACKER,
                method: method.name().to_string(),
                remaining: frames.len(),
            });
        }
        Ok(extract(frames, &layout.blocks))
    }
}
