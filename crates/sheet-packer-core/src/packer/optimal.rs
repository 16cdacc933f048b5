//! The Optimal marker and the combination space it searches.
//!
//! The orchestrator expands `Optimal` into whole multi-sheet runs, one per
//! [`Combination`]. `OptimalPacker` is the single-bin form of the same search
//! so the marker also satisfies the [`Packer`] contract on its own.

use super::{PackMethod, Packer, PackerKind};
use crate::error::{Result, SheetPackerError};
use crate::model::Frame;
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimalMethod {
    Automatic,
}

impl PackMethod for OptimalMethod {
    const PACKER: &'static str = "Optimal";
    const ALL: &'static [Self] = &[OptimalMethod::Automatic];

    fn name(self) -> &'static str {
        "Automatic"
    }

    fn description(self) -> &'static str {
        "Tries every packer, method and rotation setting and keeps the best result."
    }
}

/// One strategy to try: a concrete packer, one of its methods and a rotation flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Combination {
    pub kind: PackerKind,
    pub method: &'static str,
    pub allow_rotation: bool,
}

impl Combination {
    pub fn new(kind: PackerKind, method: &'static str, allow_rotation: bool) -> Self {
        Self {
            kind,
            method,
            allow_rotation,
        }
    }
}

/// Every concrete packer crossed with its methods, in registry order.
///
/// With `allow_rotation` each pair is tried rotated, and again unrotated
/// for packers that report [`PackerKind::needs_non_rotation`]. Without it
/// only the unrotated trial is produced.
pub fn combinations(allow_rotation: bool) -> Vec<Combination> {
    let mut out = Vec::new();
    for kind in PackerKind::ALL.into_iter().filter(|k| k.is_concrete()) {
        for props in kind.methods() {
            if allow_rotation {
                out.push(Combination::new(kind, props.name, true));
                if kind.needs_non_rotation() {
                    out.push(Combination::new(kind, props.name, false));
                }
            } else {
                out.push(Combination::new(kind, props.name, false));
            }
        }
    }
    out
}

/// Area of the placed footprints over the area of their bounding box.
pub(crate) fn layout_efficiency(frames: &[Frame]) -> f64 {
    let (mut w, mut h, mut used) = (0u32, 0u32, 0u64);
    for f in frames {
        let r = f.placed_rect();
        w = w.max(r.right());
        h = h.max(r.bottom());
        used += r.area();
    }
    let bbox = w as u64 * h as u64;
    if bbox == 0 {
        0.0
    } else {
        used as f64 / bbox as f64
    }
}

pub struct OptimalPacker {
    bin_width: u32,
    bin_height: u32,
    allow_rotate: bool,
    padding: u32,
}

impl OptimalPacker {
    pub fn new(bin_width: u32, bin_height: u32, allow_rotate: bool, padding: u32) -> Self {
        Self {
            bin_width,
            bin_height,
            allow_rotate,
            padding,
        }
    }
}

impl Packer for OptimalPacker {
    /// Keeps the placement holding the most frames, then the densest one;
    /// remaining ties go to the earlier combination.
    fn pack(&mut self, frames: &[Frame], method: &str) -> Result<Vec<Frame>> {
        OptimalMethod::parse(method)?;
        if frames.is_empty() {
            return Ok(Vec::new());
        }
        let mut best: Option<(usize, f64, Vec<Frame>)> = None;
        for combo in combinations(self.allow_rotate) {
            let mut packer = combo.kind.create(
                self.bin_width,
                self.bin_height,
                combo.allow_rotation,
                self.padding,
            );
            let placed = match packer.pack(frames, combo.method) {
                Ok(placed) => placed,
                Err(e) => {
                    warn!(packer = combo.kind.name(), method = combo.method, error = %e, "trial failed");
                    continue;
                }
            };
            let efficiency = layout_efficiency(&placed);
            debug!(
                packer = combo.kind.name(),
                method = combo.method,
                rotation = combo.allow_rotation,
                placed = placed.len(),
                efficiency,
                "single-bin trial"
            );
            let better = best.as_ref().is_none_or(|(count, eff, _)| {
                placed.len() > *count || (placed.len() == *count && efficiency > *eff)
            });
            if better {
                best = Some((placed.len(), efficiency, placed));
            }
        }
        match best {
            Some((count, _, placed)) if count > 0 => Ok(placed),
            _ => Err(SheetPackerError::Exhausted {
                packer: OptimalMethod::PACKER,
                method: OptimalMethod::Automatic.name().to_string(),
                remaining: frames.len(),
            }),
        }
    }
}
