//! Adapter over the `etagere` shelf allocator.
//!
//! Method names combine three choices:
//! - "Smart" searches upward from the square root of the total area for the
//!   smallest sheet that takes every sprite, otherwise the whole bin is used.
//! - "Square" keeps that sheet square.
//! - "Area" feeds the engine the largest sprites first, "Edge" the ones with
//!   the longest edge first.
//!
//! "Columns" variants use vertical shelves instead of rows.

use super::{Block, PackMethod, Packer, extract};
use crate::error::{Result, SheetPackerError};
use crate::model::Frame;
use etagere::{AllocatorOptions, AtlasAllocator, size2};
use std::cmp::Reverse;
use tracing::trace;

/// Largest side `etagere` accepts.
const ENGINE_MAX_SIDE: u32 = u16::MAX as u32;

/// Order in which blocks are handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackingLogic {
    /// Largest area first.
    MaxArea,
    /// Longest edge first.
    MaxEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShelfAllocatorMethod {
    name: &'static str,
    description: &'static str,
    pub smart: bool,
    pub square: bool,
    pub logic: PackingLogic,
    pub columns: bool,
}

impl ShelfAllocatorMethod {
    const fn new(
        name: &'static str,
        description: &'static str,
        smart: bool,
        square: bool,
        logic: PackingLogic,
        columns: bool,
    ) -> Self {
        Self {
            name,
            description,
            smart,
            square,
            logic,
            columns,
        }
    }

    pub const SMART_AREA: Self = Self::new(
        "SmartArea",
        "Shelf rows in the smallest sheet that fits everything, largest sprites first.",
        true,
        false,
        PackingLogic::MaxArea,
        false,
    );
    pub const SMART_EDGE: Self = Self::new(
        "SmartEdge",
        "Shelf rows in the smallest sheet that fits everything, longest edges first.",
        true,
        false,
        PackingLogic::MaxEdge,
        false,
    );
    pub const SQUARE_AREA: Self = Self::new(
        "SquareArea",
        "Shelf rows in a square sheet, largest sprites first.",
        false,
        true,
        PackingLogic::MaxArea,
        false,
    );
    pub const SQUARE_EDGE: Self = Self::new(
        "SquareEdge",
        "Shelf rows in a square sheet, longest edges first.",
        false,
        true,
        PackingLogic::MaxEdge,
        false,
    );
    pub const SMART_SQUARE_AREA: Self = Self::new(
        "SmartSquareArea",
        "Shelf rows in the smallest square sheet that fits everything, largest sprites first.",
        true,
        true,
        PackingLogic::MaxArea,
        false,
    );
    pub const SMART_SQUARE_EDGE: Self = Self::new(
        "SmartSquareEdge",
        "Shelf rows in the smallest square sheet that fits everything, longest edges first.",
        true,
        true,
        PackingLogic::MaxEdge,
        false,
    );
    pub const SMART_AREA_COLUMNS: Self = Self::new(
        "SmartAreaColumns",
        "Shelf columns in the smallest sheet that fits everything, largest sprites first.",
        true,
        false,
        PackingLogic::MaxArea,
        true,
    );
    pub const SMART_EDGE_COLUMNS: Self = Self::new(
        "SmartEdgeColumns",
        "Shelf columns in the smallest sheet that fits everything, longest edges first.",
        true,
        false,
        PackingLogic::MaxEdge,
        true,
    );
    pub const SQUARE_AREA_COLUMNS: Self = Self::new(
        "SquareAreaColumns",
        "Shelf columns in a square sheet, largest sprites first.",
        false,
        true,
        PackingLogic::MaxArea,
        true,
    );
    pub const SQUARE_EDGE_COLUMNS: Self = Self::new(
        "SquareEdgeColumns",
        "Shelf columns in a square sheet, longest edges first.",
        false,
        true,
        PackingLogic::MaxEdge,
        true,
    );
    pub const SMART_SQUARE_AREA_COLUMNS: Self = Self::new(
        "SmartSquareAreaColumns",
        "Shelf columns in the smallest square sheet that fits everything, largest sprites first.",
        true,
        true,
        PackingLogic::MaxArea,
        true,
    );
    pub const SMART_SQUARE_EDGE_COLUMNS: Self = Self::new(
        "SmartSquareEdgeColumns",
        "Shelf columns in the smallest square sheet that fits everything, longest edges first.",
        true,
        true,
        PackingLogic::MaxEdge,
        true,
    );

    /// Sorts blocks for the engine. Both orders ignore orientation, ties go
    /// to the longer short side and then to input order.
    fn sort(self, blocks: &mut [Block]) {
        let short = |b: &Block| b.w.min(b.h);
        match self.logic {
            PackingLogic::MaxArea => blocks.sort_by_key(|b| (Reverse(b.area()), Reverse(short(b)))),
            PackingLogic::MaxEdge => {
                blocks.sort_by_key(|b| (Reverse(b.w.max(b.h)), Reverse(short(b))))
            }
        }
    }
}

impl PackMethod for ShelfAllocatorMethod {
    const PACKER: &'static str = "ShelfAllocator";
    const ALL: &'static [Self] = &[
        Self::SMART_AREA,
        Self::SMART_EDGE,
        Self::SQUARE_AREA,
        Self::SQUARE_EDGE,
        Self::SMART_SQUARE_AREA,
        Self::SMART_SQUARE_EDGE,
        Self::SMART_AREA_COLUMNS,
        Self::SMART_EDGE_COLUMNS,
        Self::SQUARE_AREA_COLUMNS,
        Self::SQUARE_EDGE_COLUMNS,
        Self::SMART_SQUARE_AREA_COLUMNS,
        Self::SMART_SQUARE_EDGE_COLUMNS,
    ];

    fn name(self) -> &'static str {
        self.name
    }

    fn description(self) -> &'static str {
        self.description
    }
}

pub struct ShelfAllocatorPacker {
    bin_width: u32,
    bin_height: u32,
    allow_rotate: bool,
    padding: u32,
}

impl ShelfAllocatorPacker {
    pub fn new(bin_width: u32, bin_height: u32, allow_rotate: bool, padding: u32) -> Self {
        Self {
            bin_width,
            bin_height,
            allow_rotate,
            padding,
        }
    }

    /// Orientation for a `w x h` allocator: along the shelf direction (flat
    /// for rows, upright for columns) when that fits, otherwise whichever
    /// allowed orientation does. `None` when neither fits.
    fn orient(&self, b: &Block, w: u32, h: u32, columns: bool) -> Option<bool> {
        let fits = |rotated: bool| {
            let (pw, ph) = if rotated { (b.h, b.w) } else { (b.w, b.h) };
            pw <= w && ph <= h
        };
        let preferred = self.allow_rotate && if columns { b.w > b.h } else { b.h > b.w };
        if fits(preferred) {
            Some(preferred)
        } else if self.allow_rotate && fits(!preferred) {
            Some(!preferred)
        } else {
            None
        }
    }

    /// Allocates every block that fits into a `w x h` allocator.
    fn allocate(&self, blocks: &[Block], w: u32, h: u32, columns: bool) -> Vec<Block> {
        let (w, h) = (w.min(ENGINE_MAX_SIDE), h.min(ENGINE_MAX_SIDE));
        let options = AllocatorOptions {
            vertical_shelves: columns,
            ..AllocatorOptions::default()
        };
        let mut atlas = AtlasAllocator::with_options(size2(w as i32, h as i32), &options);
        let mut placed = Vec::with_capacity(blocks.len());
        for b in blocks {
            let Some(rotated) = self.orient(b, w, h, columns) else {
                continue;
            };
            let mut blk = *b;
            blk.rotated = rotated;
            let (pw, ph) = blk.placed_size();
            if pw == 0 || ph == 0 {
                // occupies nothing
                placed.push(blk);
                continue;
            }
            if let Some(alloc) = atlas.allocate(size2(pw as i32, ph as i32)) {
                blk.x = alloc.rectangle.min.x as u32;
                blk.y = alloc.rectangle.min.y as u32;
                placed.push(blk);
            }
        }
        placed
    }

    fn smart_search(&self, blocks: &[Block], max_w: u32, max_h: u32, columns: bool) -> Vec<Block> {
        let total_area: u64 = blocks.iter().map(Block::area).sum();
        let mut side = ((total_area as f64).sqrt().ceil() as u32).max(1);
        loop {
            let (w, h) = (side.min(max_w), side.min(max_h));
            let placed = self.allocate(blocks, w, h, columns);
            if placed.len() == blocks.len() || (w == max_w && h == max_h) {
                trace!(w, h, placed = placed.len(), "shelf allocator size");
                return placed;
            }
            side = (side + side / 8).max(side + 16);
        }
    }

    /// Largest allocator the method may use. Square sheets grow past the
    /// short bin side when a block needs it, as far as the bin allows.
    fn max_size(&self, blocks: &[Block], method: ShelfAllocatorMethod) -> (u32, u32) {
        let bin_w = self.bin_width.min(ENGINE_MAX_SIDE);
        let bin_h = self.bin_height.min(ENGINE_MAX_SIDE);
        if !method.square {
            return (bin_w, bin_h);
        }
        let needed = blocks
            .iter()
            .filter(|b| self.orient(b, bin_w, bin_h, method.columns).is_some())
            .map(|b| b.w.max(b.h))
            .max()
            .unwrap_or(0);
        let side = bin_w.min(bin_h).max(needed);
        (side.min(bin_w), side.min(bin_h))
    }
}

impl Packer for ShelfAllocatorPacker {
    fn pack(&mut self, frames: &[Frame], method: &str) -> Result<Vec<Frame>> {
        let method = ShelfAllocatorMethod::parse(method)?;
        if frames.is_empty() {
            return Ok(Vec::new());
        }
        let mut blocks = Block::from_frames(frames, self.padding);
        method.sort(&mut blocks);

        let (max_w, max_h) = self.max_size(&blocks, method);
        let placed = if method.smart {
            self.smart_search(&blocks, max_w, max_h, method.columns)
        } else {
            self.allocate(&blocks, max_w, max_h, method.columns)
        };
        if placed.is_empty() {
            return Err(SheetPackerError::Exhausted {
                packer: ShelfAllocatorMethod::PACKER,
                method: method.name().to_string(),
                remaining: frames.len(),
            });
        }
        Ok(extract(frames, &placed))
    }
}
