use sheet_packer_core::model::{Frame, Rect};
use sheet_packer_core::packer::growing::GrowingPacker;
use sheet_packer_core::packer::grid::GridSearchPacker;
use sheet_packer_core::packer::maxrects::MaxRectsPacker;
use sheet_packer_core::packer::optimal::{OptimalPacker, combinations};
use sheet_packer_core::packer::ordered::OrderedPacker;
use sheet_packer_core::packer::shelf_allocator::ShelfAllocatorPacker;
use sheet_packer_core::packer::{Packer, PackerKind};

fn squares(n: usize, side: u32) -> Vec<Frame> {
    (0..n).map(|i| Frame::new(format!("sq{}", i), side, side)).collect()
}

fn bbox(frames: &[Frame]) -> (u32, u32) {
    frames.iter().fold((0, 0), |(w, h), f| {
        let r = f.placed_rect();
        (w.max(r.right()), h.max(r.bottom()))
    })
}

#[test]
fn maxrects_tiles_three_squares_into_one_bin() {
    let frames = squares(3, 50);
    let mut p = MaxRectsPacker::new(100, 100, false, 0);
    let placed = p.pack(&frames, "BestShortSideFit").unwrap();
    assert_eq!(placed.len(), 3);
    let rects: Vec<Rect> = placed.iter().map(Frame::placed_rect).collect();
    for (i, a) in rects.iter().enumerate() {
        assert!(Rect::new(0, 0, 100, 100).contains(a));
        for b in &rects[i + 1..] {
            assert!(!a.intersects(b));
        }
    }
    assert_eq!(rects[0], Rect::new(0, 0, 50, 50));
    assert_eq!(rects[1], Rect::new(50, 0, 50, 50));
}

#[test]
fn maxrects_rotates_a_wide_rect_into_a_tall_bin() {
    let frames = vec![Frame::new("wide", 200, 100)];
    let mut p = MaxRectsPacker::new(100, 200, true, 0);
    let placed = p.pack(&frames, "BestShortSideFit").unwrap();
    assert_eq!(placed.len(), 1);
    assert!(placed[0].rotated);
    assert_eq!(placed[0].placed_size(), (100, 200));
    assert_eq!((placed[0].frame.w, placed[0].frame.h), (200, 100));
}

#[test]
fn maxrects_without_rotation_leaves_unfitting_rect_unplaced() {
    let frames = vec![Frame::new("wide", 200, 100)];
    let mut p = MaxRectsPacker::new(100, 200, false, 0);
    assert!(p.pack(&frames, "BestAreaFit").unwrap().is_empty());
}

#[test]
fn maxrects_bottom_left_rule_fills_lowest_top_edge_first() {
    let frames = vec![
        Frame::new("a", 40, 40),
        Frame::new("b", 40, 40),
        Frame::new("c", 40, 40),
    ];
    let mut p = MaxRectsPacker::new(100, 100, false, 0);
    let placed = p.pack(&frames, "BottomLeftRule").unwrap();
    // smallest y + h first, then smallest x: the first row fills before the second
    let mut pos: Vec<(u32, u32)> = placed.iter().map(|f| (f.frame.x, f.frame.y)).collect();
    pos.sort();
    assert_eq!(pos, vec![(0, 0), (0, 40), (40, 0)]);
}

#[test]
fn maxrects_free_list_stays_pruned() {
    let frames = squares(16, 16);
    let mut p = MaxRectsPacker::new(64, 64, false, 0);
    let placed = p.pack(&frames, "BestShortSideFit").unwrap();
    assert_eq!(placed.len(), 16);
    assert_eq!(p.free_list_len(), 0);
}

#[test]
fn maxrects_contact_point_hugs_corners() {
    let frames = squares(4, 30);
    let mut p = MaxRectsPacker::new(60, 60, false, 0);
    let placed = p.pack(&frames, "ContactPointRule").unwrap();
    assert_eq!(placed.len(), 4);
    assert_eq!(bbox(&placed), (60, 60));
}

#[test]
fn padding_separates_neighbours() {
    let frames = squares(2, 10);
    let mut p = MaxRectsPacker::new(100, 100, false, 3);
    let placed = p.pack(&frames, "BestShortSideFit").unwrap();
    let a = placed[0].placed_rect();
    let b = placed[1].placed_rect();
    let gap_x = b.x.saturating_sub(a.right()).max(a.x.saturating_sub(b.right()));
    let gap_y = b.y.saturating_sub(a.bottom()).max(a.y.saturating_sub(b.bottom()));
    assert!(gap_x >= 3 || gap_y >= 3, "{a:?} {b:?}");
}

#[test]
fn ordered_wraps_rows_at_the_ideal_width() {
    let frames = squares(9, 10);
    let mut p = OrderedPacker::new(1000, 1000, false, 0);
    let placed = p.pack(&frames, "Unsorted").unwrap();
    assert_eq!(placed.len(), 9);
    assert_eq!(bbox(&placed), (30, 30));
}

#[test]
fn ordered_keeps_the_prefix_when_the_bin_overflows() {
    let frames = squares(6, 50);
    let mut p = OrderedPacker::new(100, 100, true, 0);
    let placed = p.pack(&frames, "SortedAreaDesc").unwrap();
    assert_eq!(placed.len(), 4);
}

#[test]
fn ordered_lays_a_wide_block_sideways_under_a_tall_row() {
    let frames = vec![Frame::new("tall", 10, 40), Frame::new("wide", 30, 10)];
    let mut p = OrderedPacker::new(200, 200, true, 0);
    let placed = p.pack(&frames, "Unsorted").unwrap();
    let wide = placed.iter().find(|f| f.name == "wide").unwrap();
    assert!(wide.rotated);
    assert_eq!(bbox(&placed), (20, 40));
}

#[test]
fn grid_search_shrinks_the_sheet() {
    let frames = squares(4, 100);
    let mut p = GridSearchPacker::new(1024, 1024, false, 0);
    let placed = p.pack(&frames, "SortedAreaDesc").unwrap();
    assert_eq!(placed.len(), 4);
    let (w, h) = bbox(&placed);
    assert!(w <= 484 && h <= 484, "{w}x{h}");
}

#[test]
fn grid_search_alt_rows_fill_to_the_edge() {
    let frames = squares(5, 100);
    let mut p = GridSearchPacker::new(1024, 1024, true, 0);
    let placed = p.pack(&frames, "AltUnsorted").unwrap();
    assert_eq!(placed.len(), 5);
}

#[test]
fn grid_search_falls_back_to_partial_fill() {
    let frames = squares(5, 50);
    let mut p = GridSearchPacker::new(100, 100, false, 0);
    let placed = p.pack(&frames, "Unsorted").unwrap();
    assert_eq!(placed.len(), 4);
}

#[test]
fn growing_grows_toward_a_square() {
    let frames = squares(4, 50);
    let mut p = GrowingPacker::new(100, 100, false, 0);
    let placed = p.pack(&frames, "SortedMaxSide").unwrap();
    assert_eq!(placed.len(), 4);
    assert_eq!(bbox(&placed), (100, 100));
}

#[test]
fn growing_stops_at_the_bin() {
    let frames = squares(5, 50);
    let mut p = GrowingPacker::new(100, 100, false, 0);
    let placed = p.pack(&frames, "Unsorted").unwrap();
    assert_eq!(placed.len(), 4);
    assert!(placed.iter().all(|f| !f.rotated));
}

#[test]
fn shelf_allocator_smart_finds_a_small_sheet() {
    let frames = squares(16, 32);
    let mut p = ShelfAllocatorPacker::new(1024, 1024, false, 0);
    let placed = p.pack(&frames, "SmartArea").unwrap();
    assert_eq!(placed.len(), 16);
    let (w, h) = bbox(&placed);
    assert!(w <= 512 && h <= 512, "{w}x{h}");
}

#[test]
fn shelf_allocator_square_respects_the_short_side() {
    let frames = squares(8, 40);
    let mut p = ShelfAllocatorPacker::new(400, 80, false, 0);
    let placed = p.pack(&frames, "SquareArea").unwrap();
    let (w, h) = bbox(&placed);
    assert!(w <= 80 && h <= 80, "{w}x{h}");
    assert!(!placed.is_empty() && placed.len() <= 4);
}

#[test]
fn shelf_allocator_columns_turn_wide_sprites_upright() {
    let frames = vec![Frame::new("wide", 40, 10), Frame::new("tall", 10, 40)];
    let mut p = ShelfAllocatorPacker::new(256, 256, true, 0);
    let placed = p.pack(&frames, "SmartAreaColumns").unwrap();
    assert_eq!(placed.len(), 2);
    let wide = placed.iter().find(|f| f.name == "wide").unwrap();
    assert!(wide.rotated);
}

#[test]
fn shelf_allocator_logic_picks_the_first_sprite() {
    let frames = vec![Frame::new("long", 60, 5), Frame::new("big", 30, 30)];
    for (method, first) in [("SquareArea", "big"), ("SquareEdge", "long")] {
        let mut p = ShelfAllocatorPacker::new(100, 100, false, 0);
        let placed = p.pack(&frames, method).unwrap();
        assert_eq!(placed.len(), 2, "{method}");
        let f = placed.iter().find(|f| f.name == first).unwrap();
        assert_eq!((f.frame.x, f.frame.y), (0, 0), "{method}");
    }
}

#[test]
fn shelf_allocator_keeps_sprites_that_only_fit_unturned() {
    // flat would be 100 wide in a 50 wide bin
    let frames = vec![Frame::new("tall", 20, 100)];
    for method in ["SmartArea", "SquareEdge", "SmartSquareArea"] {
        let mut p = ShelfAllocatorPacker::new(50, 200, true, 0);
        let placed = p.pack(&frames, method).unwrap();
        assert_eq!(placed.len(), 1, "{method}");
        assert!(!placed[0].rotated, "{method}");
    }
    let frames = vec![Frame::new("wide", 100, 20)];
    let mut p = ShelfAllocatorPacker::new(200, 50, true, 0);
    let placed = p.pack(&frames, "SmartAreaColumns").unwrap();
    assert_eq!(placed.len(), 1);
    assert!(!placed[0].rotated);
}

#[test]
fn shelf_allocator_square_grows_past_the_short_side() {
    let frames = vec![Frame::new("pillar", 50, 200)];
    for method in ["SquareArea", "SmartSquareEdge"] {
        let mut p = ShelfAllocatorPacker::new(100, 300, false, 0);
        let placed = p.pack(&frames, method).unwrap();
        assert_eq!(placed.len(), 1, "{method}");
        let r = placed[0].placed_rect();
        assert!(r.right() <= 100 && r.bottom() <= 300);
    }
}

#[test]
fn shelf_allocator_handles_bins_beyond_the_engine_limit() {
    let frames = squares(4, 64);
    for method in ["SmartArea", "SquareEdge", "SquareAreaColumns"] {
        let mut p = ShelfAllocatorPacker::new(70_000, 70_000, true, 1);
        let placed = p.pack(&frames, method).unwrap();
        assert_eq!(placed.len(), 4, "{method}");
        assert!(placed.iter().all(|f| f.placed_rect().right() <= 65_535));
    }
}

#[test]
fn optimal_combinations_cover_every_concrete_method() {
    let with_rotation = combinations(true);
    let without = combinations(false);
    let method_count: usize = PackerKind::ALL
        .iter()
        .filter(|k| k.is_concrete())
        .map(|k| k.methods().len())
        .sum();
    assert_eq!(without.len(), method_count);
    assert!(without.iter().all(|c| !c.allow_rotation));
    assert!(with_rotation.iter().all(|c| c.kind.is_concrete()));
    let growing_trials = with_rotation
        .iter()
        .filter(|c| c.kind == PackerKind::Growing)
        .count();
    assert_eq!(growing_trials, PackerKind::Growing.methods().len());
    let maxrects_trials = with_rotation
        .iter()
        .filter(|c| c.kind == PackerKind::MaxRects)
        .count();
    assert_eq!(maxrects_trials, 2 * PackerKind::MaxRects.methods().len());
    assert_eq!(with_rotation[0].method, "BestShortSideFit");
    assert!(with_rotation[0].allow_rotation);
}

#[test]
fn optimal_single_bin_places_at_least_as_many_as_any_packer() {
    let frames: Vec<Frame> = (0..30)
        .map(|i| Frame::new(format!("f{:02}", i), 10 + (i * 7) % 40, 10 + (i * 13) % 35))
        .collect();
    let mut best_single = 0;
    for combo in combinations(true) {
        let placed = combo
            .kind
            .create(128, 128, combo.allow_rotation, 1)
            .pack(&frames, combo.method)
            .unwrap_or_default();
        best_single = best_single.max(placed.len());
    }
    let placed = OptimalPacker::new(128, 128, true, 1)
        .pack(&frames, "Automatic")
        .unwrap();
    assert_eq!(placed.len(), best_single);
}
