use crate::error::{Result, SheetPackerError};
use crate::model::Frame;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

pub mod growing;
pub mod grid;
pub mod maxrects;
pub mod optimal;
pub mod ordered;
pub mod shelf_allocator;

use growing::{GrowingMethod, GrowingPacker};
use grid::{GridMethod, GridSearchPacker};
use maxrects::{MaxRectsMethod, MaxRectsPacker};
use optimal::{OptimalMethod, OptimalPacker};
use ordered::{OrderedMethod, OrderedPacker};
use shelf_allocator::{ShelfAllocatorMethod, ShelfAllocatorPacker};

pub const DEFAULT_PACKER: &str = "MaxRects";
pub const DEFAULT_METHOD: &str = "BestShortSideFit";

/// A packer places rectangles into one bin of the size it was created with.
///
/// `pack` returns copies of the frames it could place, with `frame.x/y` and
/// `rotated` set and `frame.w/h` left at their unpadded input values. Frames
/// that do not fit are simply not returned; the caller feeds them into the
/// next sheet. The only error for a well-formed call is an unknown `method`.
pub trait Packer {
    fn pack(&mut self, frames: &[Frame], method: &str) -> Result<Vec<Frame>>;
}

/// Display metadata for one packing method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MethodProps {
    pub name: &'static str,
    pub description: &'static str,
}

/// A method enumeration owned by one packer.
pub trait PackMethod: Copy + Sized + 'static {
    const PACKER: &'static str;
    const ALL: &'static [Self];

    fn name(self) -> &'static str;
    fn description(self) -> &'static str;

    fn parse(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| SheetPackerError::UnknownMethod {
                packer: Self::PACKER,
                method: name.to_string(),
            })
    }

    fn props(self) -> MethodProps {
        MethodProps {
            name: self.name(),
            description: self.description(),
        }
    }
}

/// Packer-local working rectangle. `w,h` are the padded size in the frame's
/// natural orientation; `index` points back into the input slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Block {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub rotated: bool,
    pub index: usize,
}

impl Block {
    pub fn from_frames(frames: &[Frame], padding: u32) -> Vec<Block> {
        frames
            .iter()
            .enumerate()
            .map(|(index, f)| Block {
                x: 0,
                y: 0,
                w: f.frame.w + padding,
                h: f.frame.h + padding,
                rotated: false,
                index,
            })
            .collect()
    }

    /// Footprint in the chosen orientation.
    pub fn placed_size(&self) -> (u32, u32) {
        if self.rotated {
            (self.h, self.w)
        } else {
            (self.w, self.h)
        }
    }

    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }
}

/// Writes block placements back onto copies of their frames.
pub(crate) fn extract(frames: &[Frame], blocks: &[Block]) -> Vec<Frame> {
    blocks
        .iter()
        .map(|b| {
            let mut f = frames[b.index].clone();
            f.frame.x = b.x;
            f.frame.y = b.y;
            f.rotated = b.rotated;
            f
        })
        .collect()
}

/// Bounding-box area of a set of placed blocks.
pub(crate) fn bounding_area(blocks: &[Block]) -> u64 {
    let mut w = 0u32;
    let mut h = 0u32;
    for b in blocks {
        let (bw, bh) = b.placed_size();
        w = w.max(b.x + bw);
        h = h.max(b.y + bh);
    }
    w as u64 * h as u64
}

/// Registry of packer implementations, keyed by stable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackerKind {
    MaxRects,
    Ordered,
    GridSearch,
    Growing,
    ShelfAllocator,
    /// Marker: try every concrete combination and keep the best.
    Optimal,
}

impl PackerKind {
    pub const ALL: [PackerKind; 6] = [
        PackerKind::MaxRects,
        PackerKind::Ordered,
        PackerKind::GridSearch,
        PackerKind::Growing,
        PackerKind::ShelfAllocator,
        PackerKind::Optimal,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PackerKind::MaxRects => "MaxRects",
            PackerKind::Ordered => "Ordered",
            PackerKind::GridSearch => "GridSearch",
            PackerKind::Growing => "Growing",
            PackerKind::ShelfAllocator => "ShelfAllocator",
            PackerKind::Optimal => "Optimal",
        }
    }

    /// Strict lookup; unknown names are a configuration error.
    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| SheetPackerError::UnknownPacker(name.to_string()))
    }

    pub fn is_concrete(self) -> bool {
        !matches!(self, PackerKind::Optimal)
    }

    pub fn methods(self) -> Vec<MethodProps> {
        fn all<M: PackMethod>() -> Vec<MethodProps> {
            M::ALL.iter().map(|m| m.props()).collect()
        }
        match self {
            PackerKind::MaxRects => all::<MaxRectsMethod>(),
            PackerKind::Ordered => all::<OrderedMethod>(),
            PackerKind::GridSearch => all::<GridMethod>(),
            PackerKind::Growing => all::<GrowingMethod>(),
            PackerKind::ShelfAllocator => all::<ShelfAllocatorMethod>(),
            PackerKind::Optimal => all::<OptimalMethod>(),
        }
    }

    pub fn default_method(self) -> &'static str {
        match self {
            PackerKind::MaxRects => MaxRectsMethod::BestShortSideFit.name(),
            PackerKind::Ordered => OrderedMethod::Unsorted.name(),
            PackerKind::GridSearch => GridMethod::SortedAreaDesc.name(),
            PackerKind::Growing => GrowingMethod::SortedMaxSide.name(),
            PackerKind::ShelfAllocator => ShelfAllocatorMethod::SMART_AREA.name(),
            PackerKind::Optimal => OptimalMethod::Automatic.name(),
        }
    }

    /// Whether the Optimal search must also try this packer with rotation
    /// off when the user allowed rotation.
    pub fn needs_non_rotation(self) -> bool {
        match self {
            PackerKind::MaxRects
            | PackerKind::Ordered
            | PackerKind::GridSearch
            | PackerKind::ShelfAllocator => true,
            // no rotation support, a second trial would be identical
            PackerKind::Growing | PackerKind::Optimal => false,
        }
    }

    pub fn method_props(self, method: &str) -> Result<MethodProps> {
        match self {
            PackerKind::MaxRects => MaxRectsMethod::parse(method).map(PackMethod::props),
            PackerKind::Ordered => OrderedMethod::parse(method).map(PackMethod::props),
            PackerKind::GridSearch => GridMethod::parse(method).map(PackMethod::props),
            PackerKind::Growing => GrowingMethod::parse(method).map(PackMethod::props),
            PackerKind::ShelfAllocator => ShelfAllocatorMethod::parse(method).map(PackMethod::props),
            PackerKind::Optimal => OptimalMethod::parse(method).map(PackMethod::props),
        }
    }

    pub fn create(
        self,
        bin_width: u32,
        bin_height: u32,
        allow_rotate: bool,
        padding: u32,
    ) -> Box<dyn Packer + Send> {
        match self {
            PackerKind::MaxRects => Box::new(MaxRectsPacker::new(
                bin_width,
                bin_height,
                allow_rotate,
                padding,
            )),
            PackerKind::Ordered => Box::new(OrderedPacker::new(
                bin_width,
                bin_height,
                allow_rotate,
                padding,
            )),
            PackerKind::GridSearch => Box::new(GridSearchPacker::new(
                bin_width,
                bin_height,
                allow_rotate,
                padding,
            )),
            PackerKind::Growing => Box::new(GrowingPacker::new(
                bin_width,
                bin_height,
                allow_rotate,
                padding,
            )),
            PackerKind::ShelfAllocator => Box::new(ShelfAllocatorPacker::new(
                bin_width,
                bin_height,
                allow_rotate,
                padding,
            )),
            PackerKind::Optimal => Box::new(OptimalPacker::new(
                bin_width,
                bin_height,
                allow_rotate,
                padding,
            )),
        }
    }

    /// Lenient resolution for saved options: an unknown packer falls back to
    /// `MaxRects / BestShortSideFit`, an unknown method to the packer's default.
    pub fn resolve(packer: &str, method: &str) -> (PackerKind, &'static str) {
        let Some(kind) = get_packer_by_type(packer) else {
            warn!(packer, "unknown packer, using {}", DEFAULT_PACKER);
            return (PackerKind::MaxRects, DEFAULT_METHOD);
        };
        match kind.method_props(method) {
            Ok(props) => (kind, props.name),
            Err(_) => {
                warn!(
                    packer = kind.name(),
                    method,
                    "unknown method, using {}",
                    kind.default_method()
                );
                (kind, kind.default_method())
            }
        }
    }
}

impl FromStr for PackerKind {
    type Err = SheetPackerError;
    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

/// Lenient lookup by name.
pub fn get_packer_by_type(name: &str) -> Option<PackerKind> {
    PackerKind::from_name(name).ok()
}
