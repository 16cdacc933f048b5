use crate::compositing::render_sheet;
use crate::config::PackerConfig;
use crate::error::{Result, SheetPackerError};
use crate::model::{Frame, PackStats, Rect, Sheet};
use crate::packer::optimal::{Combination, combinations};
use crate::packer::PackerKind;
use crate::source::{ImageSource, LayoutSource, SpriteSource};
use image::{DynamicImage, RgbaImage};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// In-memory image to pack (name + decoded image).
pub struct InputImage {
    pub name: String,
    pub image: DynamicImage,
}

/// Layout-only sprite: a size plus optional trimming metadata and a content
/// handle for identical detection.
#[derive(Debug, Clone, Default)]
pub struct LayoutItem {
    pub name: String,
    pub w: u32,
    pub h: u32,
    pub sprite_source_size: Option<Rect>,
    pub source_size: Option<(u32, u32)>,
    pub trimmed: bool,
    pub content: Option<Vec<u8>>,
}

impl LayoutItem {
    pub fn new(name: impl Into<String>, w: u32, h: u32) -> Self {
        Self {
            name: name.into(),
            w,
            h,
            ..Default::default()
        }
    }
}

/// The winning placement of a packing run.
#[derive(Debug, Clone, Serialize)]
pub struct PackResult {
    pub sheets: Vec<Sheet>,
    pub packer: PackerKind,
    pub method: String,
    pub allow_rotation: bool,
    /// Rendered frame area over the summed bounding-box area of the sheets.
    pub efficiency: f64,
    /// Frame names in export order; hand back through `PackerConfig::stored_order`.
    pub export_order: Vec<String>,
}

impl PackResult {
    pub fn stats(&self) -> PackStats {
        PackStats::from_sheets(&self.sheets)
    }

    pub fn frame_count(&self) -> usize {
        self.sheets.iter().map(|s| s.frames.len()).sum()
    }
}

/// Packing result plus one composited RGBA texture per sheet.
pub struct PackOutput {
    pub result: PackResult,
    pub textures: Vec<RgbaImage>,
}

impl PackOutput {
    pub fn stats(&self) -> PackStats {
        self.result.stats()
    }
}

#[instrument(skip_all, fields(images = inputs.len()))]
/// Packs decoded images and composites every sheet.
pub fn pack_images(inputs: Vec<InputImage>, cfg: PackerConfig) -> Result<PackOutput> {
    let mut source = ImageSource::new();
    let mut frames = Vec::with_capacity(inputs.len());
    for input in inputs {
        let rgba = input.image.to_rgba8();
        frames.push(Frame::new(input.name.clone(), rgba.width(), rgba.height()));
        source.insert(input.name, rgba);
    }
    let result = pack_sprites(frames, &source, &cfg)?;
    let textures = result
        .sheets
        .iter()
        .map(|sheet| render_sheet(sheet, &source))
        .collect();
    Ok(PackOutput { result, textures })
}

#[instrument(skip_all, fields(items = items.len()))]
/// Packs sizes only; no pixels are touched.
pub fn pack_layout(items: Vec<LayoutItem>, cfg: PackerConfig) -> Result<PackResult> {
    let mut source = LayoutSource::new();
    let mut frames = Vec::with_capacity(items.len());
    for item in items {
        let mut f = Frame::new(item.name.clone(), item.w, item.h);
        if let Some(ss) = item.sprite_source_size {
            f.sprite_source_size = ss;
        }
        if let Some((w, h)) = item.source_size {
            f.source_size.w = w;
            f.source_size.h = h;
        }
        f.trimmed = item.trimmed;
        if let Some(content) = item.content {
            source.insert(item.name, content);
        }
        frames.push(f);
    }
    pack_sprites(frames, &source, &cfg)
}

/// Sheet geometry shared by every trial of one run.
#[derive(Debug, Clone, Copy)]
struct Plan {
    /// Requested sheet size (after power-of-two rounding).
    width: u32,
    height: u32,
    /// Space left for the packers once the border is taken off.
    bin_width: u32,
    bin_height: u32,
}

/// Outcome of one combination across as many sheets as it needed.
#[derive(Debug, Clone)]
struct Trial {
    combo: Combination,
    sheets: Vec<Vec<Frame>>,
    efficiency: f64,
}

impl Trial {
    /// Fewer sheets first, then higher efficiency. Ties keep `self`.
    fn beats(&self, other: &Trial) -> bool {
        self.sheets.len() < other.sheets.len()
            || (self.sheets.len() == other.sheets.len() && self.efficiency > other.efficiency)
    }
}

#[instrument(skip_all, fields(sprites = frames.len(), packer = %cfg.packer))]
/// Packs `frames` into as many sheets as needed.
///
/// Runs one combination, or every combination for the `Optimal` packer, and
/// returns the one with the fewest sheets and then the best efficiency.
/// `source` provides trimming and identical-content checks.
pub fn pack_sprites(
    mut frames: Vec<Frame>,
    source: &dyn SpriteSource,
    cfg: &PackerConfig,
) -> Result<PackResult> {
    cfg.validate()?;
    if frames.is_empty() {
        return Err(SheetPackerError::Empty);
    }
    let kind = PackerKind::from_name(&cfg.packer)?;
    let method = kind.method_props(&cfg.packer_method)?.name;

    frames.sort_by(|a, b| a.name.cmp(&b.name));
    let plan = plan_sheet(&frames, cfg)?;
    info!(
        sprites = frames.len(),
        width = plan.width,
        height = plan.height,
        packer = kind.name(),
        method,
        "packing started"
    );

    if cfg.allow_trim {
        for f in frames.iter_mut() {
            source.trim(f, cfg.alpha_threshold);
        }
    }
    assign_animation_sizes(&mut frames);

    let (active, identical) = if cfg.detect_identical {
        split_identical(frames, source)
    } else {
        (frames, Vec::new())
    };

    let combos = if kind.is_concrete() {
        vec![Combination::new(kind, method, cfg.allow_rotation)]
    } else {
        combinations(cfg.allow_rotation)
    };
    let best = run_combinations(&combos, &active, &identical, &plan, cfg)?;
    Ok(finish(best, &plan, cfg))
}

/// Resolves the target sheet size and checks that every sprite fits in it.
fn plan_sheet(frames: &[Frame], cfg: &PackerConfig) -> Result<Plan> {
    let pad = cfg.sprite_padding;
    let border = cfg.border_padding.saturating_mul(2);
    let loose_w = frames
        .iter()
        .fold(0u32, |acc, f| acc.saturating_add(f.frame.w + pad))
        .saturating_add(border);
    let loose_h = frames
        .iter()
        .fold(0u32, |acc, f| acc.saturating_add(f.frame.h + pad))
        .saturating_add(border);
    let mut width = cfg.width.unwrap_or(loose_w);
    let mut height = cfg.height.unwrap_or(loose_h);
    if cfg.power_of_two {
        width = pow2(width);
        height = pow2(height);
    }

    // a sprite that only fits turned counts at its turned size
    let (mut min_w, mut min_h) = (0u32, 0u32);
    for f in frames {
        let (mut w, mut h) = (f.frame.w + pad + border, f.frame.h + pad + border);
        let fits = w <= width && h <= height;
        if cfg.allow_rotation && !fits && h <= width && w <= height {
            std::mem::swap(&mut w, &mut h);
        }
        min_w = min_w.max(w);
        min_h = min_h.max(h);
    }
    if min_w > width || min_h > height {
        return Err(SheetPackerError::SizeTooSmall {
            width,
            height,
            min_width: min_w,
            min_height: min_h,
        });
    }
    Ok(Plan {
        width,
        height,
        bin_width: width - border,
        bin_height: height - border,
    })
}

/// `2^round(log2 v)`, doubled when that lands below `v`.
pub fn pow2(v: u32) -> u32 {
    if v <= 1 {
        return 1;
    }
    let exp = (v as f64).log2().round() as u32;
    let mut p = 1u64 << exp;
    if p < v as u64 {
        p <<= 1;
    }
    p.min(u32::MAX as u64) as u32
}

/// Name with its trailing frame number and separators removed, or `None`
/// when the name carries no frame number.
pub fn animation_prefix(name: &str) -> Option<&str> {
    let stem = match name.rsplit_once('.') {
        Some((stem, ext))
            if !ext.is_empty() && ext.chars().any(|c| c.is_ascii_alphabetic()) =>
        {
            stem
        }
        _ => name,
    };
    let without_digits = stem.trim_end_matches(|c: char| c.is_ascii_digit());
    if without_digits.len() == stem.len() {
        return None;
    }
    Some(without_digits.trim_end_matches(['_', '-', ' ', '.']))
}

/// Fills `source_size.mw/mh` with the largest source size per animation strip.
fn assign_animation_sizes(frames: &mut [Frame]) {
    let mut max_sizes: HashMap<&str, (u32, u32)> = HashMap::new();
    for f in frames.iter() {
        if let Some(prefix) = animation_prefix(&f.name) {
            let e = max_sizes.entry(prefix).or_insert((0, 0));
            e.0 = e.0.max(f.source_size.w);
            e.1 = e.1.max(f.source_size.h);
        }
    }
    let max_sizes: HashMap<String, (u32, u32)> = max_sizes
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    for f in frames.iter_mut() {
        let size = animation_prefix(&f.name).and_then(|p| max_sizes.get(p).copied());
        if let Some((mw, mh)) = size {
            f.source_size.mw = Some(mw);
            f.source_size.mh = Some(mh);
        }
    }
}

/// Moves every frame whose content equals an earlier frame's into the
/// returned duplicate list, tagged with the canonical frame's name.
fn split_identical(frames: Vec<Frame>, source: &dyn SpriteSource) -> (Vec<Frame>, Vec<Frame>) {
    let mut active: Vec<Frame> = Vec::with_capacity(frames.len());
    let mut contents: Vec<Option<Vec<u8>>> = Vec::with_capacity(frames.len());
    let mut identical = Vec::new();

    for mut f in frames {
        let content = source.content(&f);
        let canonical = content.as_ref().and_then(|bytes| {
            active.iter().zip(&contents).position(|(c, cc)| {
                c.frame.w == f.frame.w
                    && c.frame.h == f.frame.h
                    && cc.as_ref().is_some_and(|other| other == bytes)
            })
        });
        match canonical {
            Some(i) => {
                f.identical = Some(active[i].name.clone());
                identical.push(f);
            }
            None => {
                active.push(f);
                contents.push(content);
            }
        }
    }
    if !identical.is_empty() {
        debug!(duplicates = identical.len(), "identical sprites detected");
    }
    (active, identical)
}

fn run_combinations(
    combos: &[Combination],
    active: &[Frame],
    identical: &[Frame],
    plan: &Plan,
    cfg: &PackerConfig,
) -> Result<Trial> {
    if let [combo] = combos {
        return run_trial(*combo, active, identical, plan, cfg);
    }

    #[cfg(feature = "parallel")]
    let results: Vec<Result<Trial>> = if cfg.parallel {
        combos
            .par_iter()
            .map(|combo| run_trial(*combo, active, identical, plan, cfg))
            .collect()
    } else {
        combos
            .iter()
            .map(|combo| run_trial(*combo, active, identical, plan, cfg))
            .collect()
    };
    #[cfg(not(feature = "parallel"))]
    let results: Vec<Result<Trial>> = combos
        .iter()
        .map(|combo| run_trial(*combo, active, identical, plan, cfg))
        .collect();

    let mut best: Option<Trial> = None;
    let mut first_err = None;
    for (combo, result) in combos.iter().zip(results) {
        match result {
            Ok(trial) => {
                if best.as_ref().is_none_or(|b| trial.beats(b)) {
                    best = Some(trial);
                }
            }
            Err(e) => {
                warn!(packer = combo.kind.name(), method = combo.method, error = %e, "trial failed");
                first_err.get_or_insert(e);
            }
        }
    }
    match (best, first_err) {
        (Some(best), _) => Ok(best),
        (None, Some(e)) => Err(e),
        (None, None) => Err(SheetPackerError::Empty),
    }
}

/// Runs one combination on its own copies of the frame lists until every
/// frame sits on a sheet.
fn run_trial(
    combo: Combination,
    active: &[Frame],
    identical: &[Frame],
    plan: &Plan,
    cfg: &PackerConfig,
) -> Result<Trial> {
    let mut remaining = active.to_vec();
    let mut duplicates = identical.to_vec();
    let mut sheets: Vec<Vec<Frame>> = Vec::new();
    let (mut used_area, mut sheet_area) = (0u64, 0u64);

    while !remaining.is_empty() {
        let mut packer = combo.kind.create(
            plan.bin_width,
            plan.bin_height,
            combo.allow_rotation,
            cfg.sprite_padding,
        );
        let mut placed = packer.pack(&remaining, combo.method)?;
        if placed.is_empty() {
            return Err(SheetPackerError::Exhausted {
                packer: combo.kind.name(),
                method: combo.method.to_string(),
                remaining: remaining.len(),
            });
        }

        {
            let placed_names: HashSet<&str> = placed.iter().map(|f| f.name.as_str()).collect();
            remaining.retain(|f| !placed_names.contains(f.name.as_str()));
        }

        let (mut w, mut h) = (0u32, 0u32);
        for f in &placed {
            let r = f.placed_rect();
            w = w.max(r.right());
            h = h.max(r.bottom());
            used_area += f.frame.area();
        }
        sheet_area += w as u64 * h as u64;

        if !duplicates.is_empty() {
            let clones = resolve_clones(&placed, &mut duplicates);
            placed.extend(clones);
        }
        debug!(
            packer = combo.kind.name(),
            method = combo.method,
            sheet = sheets.len(),
            frames = placed.len(),
            left = remaining.len(),
            "sheet packed"
        );
        sheets.push(placed);
    }

    let efficiency = if sheet_area == 0 {
        0.0
    } else {
        used_area as f64 / sheet_area as f64
    };
    debug!(
        packer = combo.kind.name(),
        method = combo.method,
        rotation = combo.allow_rotation,
        sheets = sheets.len(),
        efficiency,
        "trial finished"
    );
    Ok(Trial {
        combo,
        sheets,
        efficiency,
    })
}

/// Takes the duplicates whose canonical frame is in `placed` and positions
/// them on top of it.
fn resolve_clones(placed: &[Frame], duplicates: &mut Vec<Frame>) -> Vec<Frame> {
    let by_name: HashMap<&str, &Frame> = placed.iter().map(|f| (f.name.as_str(), f)).collect();
    let mut clones = Vec::new();
    duplicates.retain(|dup| {
        let canonical = dup
            .identical
            .as_deref()
            .and_then(|name| by_name.get(name).copied());
        let Some(canonical) = canonical else {
            return true;
        };
        let mut clone = dup.clone();
        clone.frame.x = canonical.frame.x;
        clone.frame.y = canonical.frame.y;
        clone.rotated = canonical.rotated;
        clone.identical = None;
        clone.cloned = true;
        clone.skip_render = true;
        clones.push(clone);
        false
    });
    clones
}

/// Sheet size: the requested size when fixed, otherwise the used bounding
/// box plus border, rounded to powers of two when requested.
fn sheet_size(frames: &[Frame], plan: &Plan, cfg: &PackerConfig) -> (u32, u32) {
    if cfg.fixed_size {
        return (plan.width, plan.height);
    }
    let border = cfg.border_padding.saturating_mul(2);
    let (mut w, mut h) = (0u32, 0u32);
    for f in frames {
        let r = f.placed_rect();
        w = w.max(r.right());
        h = h.max(r.bottom());
    }
    let (mut w, mut h) = (w + border, h + border);
    if cfg.power_of_two {
        w = pow2(w);
        h = pow2(h);
    }
    (w, h)
}

fn finish(trial: Trial, plan: &Plan, cfg: &PackerConfig) -> PackResult {
    let border = cfg.border_padding;
    let sheets: Vec<Sheet> = trial
        .sheets
        .into_iter()
        .enumerate()
        .map(|(id, mut frames)| {
            let (width, height) = sheet_size(&frames, plan, cfg);
            for f in frames.iter_mut() {
                f.frame.x += border;
                f.frame.y += border;
            }
            Sheet {
                id,
                width,
                height,
                frames,
            }
        })
        .collect();
    let export_order = export_order(&sheets, cfg.stored_order.as_deref());
    info!(
        sheets = sheets.len(),
        packer = trial.combo.kind.name(),
        method = trial.combo.method,
        rotation = trial.combo.allow_rotation,
        efficiency = trial.efficiency,
        "packing finished"
    );
    PackResult {
        sheets,
        packer: trial.combo.kind,
        method: trial.combo.method.to_string(),
        allow_rotation: trial.combo.allow_rotation,
        efficiency: trial.efficiency,
        export_order,
    }
}

/// Stored names that still exist, in stored order, then every other frame
/// in sheet order.
pub fn export_order(sheets: &[Sheet], stored: Option<&[String]>) -> Vec<String> {
    let present: Vec<&str> = sheets
        .iter()
        .flat_map(|s| s.frames.iter().map(|f| f.name.as_str()))
        .collect();
    let present_set: HashSet<&str> = present.iter().copied().collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut order = Vec::with_capacity(present.len());
    for name in stored.unwrap_or_default() {
        if present_set.contains(name.as_str()) && seen.insert(name.as_str()) {
            order.push(name.clone());
        }
    }
    for name in present {
        if seen.insert(name) {
            order.push(name.to_string());
        }
    }
    order
}
