use super::{Block, PackMethod, Packer, extract};
use crate::error::Result;
use crate::model::{Frame, Rect};

/// MaxRects placement scoring rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxRectsMethod {
    BestShortSideFit,
    BestLongSideFit,
    BestAreaFit,
    BottomLeftRule,
    ContactPointRule,
}

impl PackMethod for MaxRectsMethod {
    const PACKER: &'static str = "MaxRects";
    const ALL: &'static [Self] = &[
        MaxRectsMethod::BestShortSideFit,
        MaxRectsMethod::BestLongSideFit,
        MaxRectsMethod::BestAreaFit,
        MaxRectsMethod::BottomLeftRule,
        MaxRectsMethod::ContactPointRule,
    ];

    fn name(self) -> &'static str {
        match self {
            MaxRectsMethod::BestShortSideFit => "BestShortSideFit",
            MaxRectsMethod::BestLongSideFit => "BestLongSideFit",
            MaxRectsMethod::BestAreaFit => "BestAreaFit",
            MaxRectsMethod::BottomLeftRule => "BottomLeftRule",
            MaxRectsMethod::ContactPointRule => "ContactPointRule",
        }
    }

    fn description(self) -> &'static str {
        match self {
            MaxRectsMethod::BestShortSideFit => {
                "Positions the rectangle against the short side of a free rectangle into which it fits the best."
            }
            MaxRectsMethod::BestLongSideFit => {
                "Positions the rectangle against the long side of a free rectangle into which it fits the best."
            }
            MaxRectsMethod::BestAreaFit => {
                "Positions the rectangle into the smallest free rectangle into which it fits."
            }
            MaxRectsMethod::BottomLeftRule => {
                "Does the Tetris placement: smallest resulting top edge, then leftmost."
            }
            MaxRectsMethod::ContactPointRule => {
                "Chooses the placement where the rectangle touches other rectangles as much as possible."
            }
        }
    }
}

/// Scored placement of one block into one free rectangle.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    rect: Rect,
    rotated: bool,
    score: (i64, i64),
}

pub struct MaxRectsPacker {
    bin: Rect,
    allow_rotate: bool,
    padding: u32,
    free: Vec<Rect>,
    used: Vec<Rect>,
}

impl MaxRectsPacker {
    pub fn new(bin_width: u32, bin_height: u32, allow_rotate: bool, padding: u32) -> Self {
        let bin = Rect::new(0, 0, bin_width, bin_height);
        Self {
            bin,
            allow_rotate,
            padding,
            free: vec![bin],
            used: Vec::new(),
        }
    }

    pub fn free_list_len(&self) -> usize {
        self.free.len()
    }

    fn score(&self, method: MaxRectsMethod, fr: &Rect, w: u32, h: u32) -> (i64, i64) {
        let leftover_h = (fr.w as i64 - w as i64).abs();
        let leftover_v = (fr.h as i64 - h as i64).abs();
        let short_fit = leftover_h.min(leftover_v);
        let long_fit = leftover_h.max(leftover_v);
        match method {
            MaxRectsMethod::BestShortSideFit => (short_fit, long_fit),
            MaxRectsMethod::BestLongSideFit => (long_fit, short_fit),
            MaxRectsMethod::BestAreaFit => (fr.area() as i64 - w as i64 * h as i64, short_fit),
            MaxRectsMethod::BottomLeftRule => ((fr.y + h) as i64, fr.x as i64),
            MaxRectsMethod::ContactPointRule => {
                // maximise contact: negate for minimisation
                (-(self.contact_point_score(fr.x, fr.y, w, h) as i64), 0)
            }
        }
    }

    fn find_position(&self, method: MaxRectsMethod, w: u32, h: u32) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;
        let try_rotated = self.allow_rotate && w != h;
        for fr in &self.free {
            if fr.w >= w && fr.h >= h {
                let score = self.score(method, fr, w, h);
                if best.is_none_or(|b| score < b.score) {
                    best = Some(Candidate {
                        rect: Rect::new(fr.x, fr.y, w, h),
                        rotated: false,
                        score,
                    });
                }
            }
            if try_rotated && fr.w >= h && fr.h >= w {
                let score = self.score(method, fr, h, w);
                if best.is_none_or(|b| score < b.score) {
                    best = Some(Candidate {
                        rect: Rect::new(fr.x, fr.y, h, w),
                        rotated: true,
                        score,
                    });
                }
            }
        }
        best
    }

    fn contact_point_score(&self, x: u32, y: u32, w: u32, h: u32) -> u32 {
        let node = Rect::new(x, y, w, h);
        let mut score = 0u32;
        if node.x == 0 || node.right() == self.bin.right() {
            score += node.h;
        }
        if node.y == 0 || node.bottom() == self.bin.bottom() {
            score += node.w;
        }
        for u in &self.used {
            if node.x == u.right() || u.x == node.right() {
                score += overlap_1d(node.y, node.bottom(), u.y, u.bottom());
            }
            if node.y == u.bottom() || u.y == node.bottom() {
                score += overlap_1d(node.x, node.right(), u.x, u.right());
            }
        }
        score
    }

    fn place_rect(&mut self, node: &Rect) {
        let mut new_free: Vec<Rect> = Vec::with_capacity(self.free.len() + 4);
        for fr in &self.free {
            if fr.intersects(node) {
                split_free_node(fr, node, &mut new_free);
            } else {
                new_free.push(*fr);
            }
        }
        self.free = new_free;
        self.prune_free_list();
        self.used.push(*node);
    }

    /// Drops every free rectangle contained in another one.
    fn prune_free_list(&mut self) {
        let mut i = 0;
        while i < self.free.len() {
            let a = self.free[i];
            let mut remove_i = false;
            let mut j = i + 1;
            while j < self.free.len() {
                let b = self.free[j];
                if b.contains(&a) {
                    remove_i = true;
                    break;
                }
                if a.contains(&b) {
                    self.free.remove(j);
                    continue;
                }
                j += 1;
            }
            if remove_i {
                self.free.remove(i);
            } else {
                i += 1;
            }
        }
    }
}

/// Splits `fr` around `node` into up to four maximal remainders.
fn split_free_node(fr: &Rect, node: &Rect, out: &mut Vec<Rect>) {
    // left
    if node.x > fr.x {
        out.push(Rect::new(fr.x, fr.y, node.x - fr.x, fr.h));
    }
    // right
    if node.right() < fr.right() {
        out.push(Rect::new(node.right(), fr.y, fr.right() - node.right(), fr.h));
    }
    // above
    if node.y > fr.y {
        out.push(Rect::new(fr.x, fr.y, fr.w, node.y - fr.y));
    }
    // below
    if node.bottom() < fr.bottom() {
        out.push(Rect::new(fr.x, node.bottom(), fr.w, fr.bottom() - node.bottom()));
    }
}

fn overlap_1d(a1: u32, a2: u32, b1: u32, b2: u32) -> u32 {
    let start = a1.max(b1);
    let end = a2.min(b2);
    end.saturating_sub(start)
}

impl Packer for MaxRectsPacker {
    fn pack(&mut self, frames: &[Frame], method: &str) -> Result<Vec<Frame>> {
        let method = MaxRectsMethod::parse(method)?;
        if !self.used.is_empty() {
            self.free = vec![self.bin];
            self.used.clear();
        }
        let mut remaining = Block::from_frames(frames, self.padding);
        let mut placed: Vec<Block> = Vec::with_capacity(remaining.len());

        // one block per round: rescore everything against the updated free list
        while !remaining.is_empty() {
            let mut best: Option<(usize, Candidate)> = None;
            for (i, b) in remaining.iter().enumerate() {
                if let Some(c) = self.find_position(method, b.w, b.h) {
                    if best.is_none_or(|(_, bc)| c.score < bc.score) {
                        best = Some((i, c));
                    }
                }
            }
            let Some((idx, cand)) = best else {
                break;
            };
            self.place_rect(&cand.rect);
            let mut block = remaining.remove(idx);
            block.x = cand.rect.x;
            block.y = cand.rect.y;
            block.rotated = cand.rotated;
            placed.push(block);
        }

        Ok(extract(frames, &placed))
    }
}
