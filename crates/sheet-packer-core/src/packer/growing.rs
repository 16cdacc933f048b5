use super::{Block, PackMethod, Packer, extract};
use crate::error::Result;
use crate::model::Frame;
use std::cmp::Reverse;

/// Input orderings for the growing packer (all descending).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowingMethod {
    Unsorted,
    SortedHeight,
    SortedWidth,
    SortedArea,
    SortedMaxSide,
}

impl GrowingMethod {
    fn sort(self, blocks: &mut [Block]) {
        match self {
            GrowingMethod::Unsorted => {}
            GrowingMethod::SortedHeight => blocks.sort_by_key(|b| (Reverse(b.h), Reverse(b.w))),
            GrowingMethod::SortedWidth => blocks.sort_by_key(|b| (Reverse(b.w), Reverse(b.h))),
            GrowingMethod::SortedArea => blocks.sort_by_key(|b| Reverse(b.area())),
            GrowingMethod::SortedMaxSide => {
                blocks.sort_by_key(|b| (Reverse(b.w.max(b.h)), Reverse(b.w.min(b.h))))
            }
        }
    }
}

impl PackMethod for GrowingMethod {
    const PACKER: &'static str = "Growing";
    const ALL: &'static [Self] = &[
        GrowingMethod::Unsorted,
        GrowingMethod::SortedHeight,
        GrowingMethod::SortedWidth,
        GrowingMethod::SortedArea,
        GrowingMethod::SortedMaxSide,
    ];

    fn name(self) -> &'static str {
        match self {
            GrowingMethod::Unsorted => "Unsorted",
            GrowingMethod::SortedHeight => "SortedHeight",
            GrowingMethod::SortedWidth => "SortedWidth",
            GrowingMethod::SortedArea => "SortedArea",
            GrowingMethod::SortedMaxSide => "SortedMaxSide",
        }
    }

    fn description(self) -> &'static str {
        match self {
            GrowingMethod::Unsorted => "Input order.",
            GrowingMethod::SortedHeight => "Tallest first.",
            GrowingMethod::SortedWidth => "Widest first.",
            GrowingMethod::SortedArea => "Largest area first.",
            GrowingMethod::SortedMaxSide => "Longest side first.",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Node {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    used: bool,
    right: Option<usize>,
    down: Option<usize>,
}

impl Node {
    fn leaf(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            x,
            y,
            w,
            h,
            used: false,
            right: None,
            down: None,
        }
    }
}

/// Binary tree packer that starts at the first block's size and grows
/// right or down, whichever keeps the root closer to square. Growth is
/// capped at the bin size; blocks that cannot be grown into are skipped.
pub struct GrowingPacker {
    bin_width: u32,
    bin_height: u32,
    padding: u32,
    nodes: Vec<Node>,
    root: usize,
}

impl GrowingPacker {
    /// Rotation is accepted for the common constructor shape and ignored.
    pub fn new(bin_width: u32, bin_height: u32, _allow_rotate: bool, padding: u32) -> Self {
        Self {
            bin_width,
            bin_height,
            padding,
            nodes: Vec::new(),
            root: 0,
        }
    }

    fn find(&self, start: usize, w: u32, h: u32) -> Option<usize> {
        let mut stack = vec![start];
        while let Some(i) = stack.pop() {
            let n = &self.nodes[i];
            if n.used {
                // right before down
                if let Some(d) = n.down {
                    stack.push(d);
                }
                if let Some(r) = n.right {
                    stack.push(r);
                }
            } else if w <= n.w && h <= n.h {
                return Some(i);
            }
        }
        None
    }

    fn split(&mut self, i: usize, w: u32, h: u32) -> (u32, u32) {
        let n = self.nodes[i];
        let down = self.push(Node::leaf(n.x, n.y + h, n.w, n.h - h));
        let right = self.push(Node::leaf(n.x + w, n.y, n.w - w, h));
        let node = &mut self.nodes[i];
        node.used = true;
        node.down = Some(down);
        node.right = Some(right);
        (n.x, n.y)
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn grow(&mut self, w: u32, h: u32) -> Option<(u32, u32)> {
        let root = self.nodes[self.root];
        let can_grow_down = w <= root.w && root.h + h <= self.bin_height;
        let can_grow_right = h <= root.h && root.w + w <= self.bin_width;
        let should_grow_right = can_grow_right && root.h >= root.w + w;
        let should_grow_down = can_grow_down && root.w >= root.h + h;

        if should_grow_right {
            self.grow_right(w, h)
        } else if should_grow_down {
            self.grow_down(w, h)
        } else if can_grow_right {
            self.grow_right(w, h)
        } else if can_grow_down {
            self.grow_down(w, h)
        } else {
            None
        }
    }

    fn grow_right(&mut self, w: u32, h: u32) -> Option<(u32, u32)> {
        let old = self.nodes[self.root];
        let right = self.push(Node::leaf(old.w, 0, w, old.h));
        let mut root = Node::leaf(0, 0, old.w + w, old.h);
        root.used = true;
        root.down = Some(self.root);
        root.right = Some(right);
        self.root = self.push(root);
        let i = self.find(self.root, w, h)?;
        Some(self.split(i, w, h))
    }

    fn grow_down(&mut self, w: u32, h: u32) -> Option<(u32, u32)> {
        let old = self.nodes[self.root];
        let down = self.push(Node::leaf(0, old.h, old.w, h));
        let mut root = Node::leaf(0, 0, old.w, old.h + h);
        root.used = true;
        root.down = Some(down);
        root.right = Some(self.root);
        self.root = self.push(root);
        let i = self.find(self.root, w, h)?;
        Some(self.split(i, w, h))
    }
}

impl Packer for GrowingPacker {
    fn pack(&mut self, frames: &[Frame], method: &str) -> Result<Vec<Frame>> {
        let method = GrowingMethod::parse(method)?;
        let mut blocks = Block::from_frames(frames, self.padding);
        method.sort(&mut blocks);
        self.nodes.clear();

        let mut placed = Vec::with_capacity(blocks.len());
        for mut b in blocks {
            if b.w > self.bin_width || b.h > self.bin_height {
                continue;
            }
            let pos = if self.nodes.is_empty() {
                self.root = self.push(Node::leaf(0, 0, b.w, b.h));
                Some(self.split(self.root, b.w, b.h))
            } else {
                match self.find(self.root, b.w, b.h) {
                    Some(i) => Some(self.split(i, b.w, b.h)),
                    None => self.grow(b.w, b.h),
                }
            };
            if let Some((x, y)) = pos {
                b.x = x;
                b.y = y;
                placed.push(b);
            }
        }
        Ok(extract(frames, &placed))
    }
}
