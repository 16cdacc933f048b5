use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sheet_packer_core::packer::optimal::combinations;
use sheet_packer_core::prelude::*;
use sheet_packer_core::{animation_prefix, pow2};
use std::collections::HashMap;

fn layout_cfg() -> PackerConfigBuilder {
    PackerConfig::builder()
        .sprite_padding(0)
        .allow_trim(false)
        .detect_identical(false)
}

fn random_items(seed: u64, n: usize) -> Vec<LayoutItem> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| LayoutItem::new(format!("item{:03}", i), rng.gen_range(8..=96), rng.gen_range(8..=96)))
        .collect()
}

fn assert_sheets_valid(result: &PackResult, border: u32) {
    for sheet in &result.sheets {
        let rects: Vec<Rect> = sheet.frames.iter().filter(|f| !f.cloned).map(Frame::placed_rect).collect();
        for (i, a) in rects.iter().enumerate() {
            assert!(a.x >= border && a.y >= border);
            assert!(a.right() + border <= sheet.width && a.bottom() + border <= sheet.height);
            for b in &rects[i + 1..] {
                assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
            }
        }
    }
}

fn names(result: &PackResult) -> Vec<String> {
    let mut n: Vec<String> = result
        .sheets
        .iter()
        .flat_map(|s| s.frames.iter().map(|f| f.name.clone()))
        .collect();
    n.sort();
    n
}

#[test]
fn three_squares_share_one_sheet() {
    let items = (0..3).map(|i| LayoutItem::new(format!("sq{i}"), 50, 50)).collect();
    let cfg = layout_cfg().with_dimensions(100, 100).allow_rotation(false).build();
    let result = pack_layout(items, cfg).unwrap();
    assert_eq!(result.sheets.len(), 1);
    assert_eq!(result.sheets[0].frames.len(), 3);
    assert_sheets_valid(&result, 0);
}

#[test]
fn wide_sprite_is_rotated_into_a_tall_sheet() {
    let items = vec![LayoutItem::new("wide", 200, 100)];
    let cfg = layout_cfg().with_dimensions(100, 200).allow_rotation(true).build();
    let result = pack_layout(items, cfg).unwrap();
    assert_eq!(result.sheets.len(), 1);
    let f = &result.sheets[0].frames[0];
    assert!(f.rotated);
    assert_eq!(f.placed_size(), (100, 200));
}

#[test]
fn undersized_sheet_reports_the_minimum() {
    let items = vec![LayoutItem::new("big", 100, 100)];
    let cfg = layout_cfg().with_dimensions(64, 64).build();
    match pack_layout(items, cfg) {
        Err(SheetPackerError::SizeTooSmall {
            width,
            height,
            min_width,
            min_height,
        }) => {
            assert_eq!((width, height), (64, 64));
            assert_eq!((min_width, min_height), (100, 100));
        }
        other => panic!("expected SizeTooSmall, got {other:?}"),
    }
}

#[test]
fn minimum_includes_padding_and_border() {
    let items = vec![LayoutItem::new("big", 100, 100)];
    let cfg = layout_cfg()
        .with_dimensions(104, 104)
        .sprite_padding(2)
        .border_padding(2)
        .build();
    let err = pack_layout(items, cfg).unwrap_err();
    assert!(matches!(
        err,
        SheetPackerError::SizeTooSmall {
            min_width: 106,
            min_height: 106,
            ..
        }
    ));
}

#[test]
fn identical_contents_become_a_clone() {
    let mut a = LayoutItem::new("a", 16, 16);
    a.content = Some(vec![7; 16 * 16 * 4]);
    let mut b = LayoutItem::new("b", 16, 16);
    b.content = Some(vec![7; 16 * 16 * 4]);
    let mut c = LayoutItem::new("c", 16, 16);
    c.content = Some(vec![9; 16 * 16 * 4]);
    let cfg = layout_cfg().detect_identical(true).with_dimensions(64, 64).build();
    let result = pack_layout(vec![a, b, c], cfg).unwrap();

    assert_eq!(result.sheets.len(), 1);
    let frames: HashMap<&str, &Frame> = result.sheets[0]
        .frames
        .iter()
        .map(|f| (f.name.as_str(), f))
        .collect();
    assert_eq!(frames.len(), 3);
    let (fa, fb) = (frames["a"], frames["b"]);
    assert!(!fa.skip_render);
    assert!(fb.skip_render && fb.cloned);
    assert_eq!((fa.frame.x, fa.frame.y), (fb.frame.x, fb.frame.y));
    assert!(fb.identical.is_none());
    assert!(!frames["c"].skip_render);
    assert_eq!(result.stats().num_clones, 1);
}

#[test]
fn identical_detection_needs_equal_sizes() {
    let mut a = LayoutItem::new("a", 8, 4);
    a.content = Some(vec![1; 128]);
    let mut b = LayoutItem::new("b", 4, 8);
    b.content = Some(vec![1; 128]);
    let cfg = layout_cfg().detect_identical(true).with_dimensions(64, 64).build();
    let result = pack_layout(vec![a, b], cfg).unwrap();
    assert!(result.sheets[0].frames.iter().all(|f| !f.cloned));
}

#[test]
fn power_of_two_rounds_the_used_bounds() {
    let items = vec![LayoutItem::new("strip", 130, 70)];
    let cfg = layout_cfg()
        .with_dimensions(512, 512)
        .allow_rotation(false)
        .pow2(true)
        .build();
    let result = pack_layout(items, cfg).unwrap();
    let sheet = &result.sheets[0];
    assert_eq!((sheet.width, sheet.height), (256, 128));
}

#[test]
fn pow2_rounds_to_nearest_then_bumps() {
    assert_eq!(pow2(1), 1);
    assert_eq!(pow2(64), 64);
    assert_eq!(pow2(70), 128);
    assert_eq!(pow2(90), 128);
    assert_eq!(pow2(100), 128);
    assert_eq!(pow2(130), 256);
    assert_eq!(pow2(200), 256);
}

#[test]
fn fixed_size_reports_the_requested_sheet() {
    let items = vec![LayoutItem::new("s", 10, 10)];
    let cfg = layout_cfg().with_dimensions(300, 200).fixed_size(true).build();
    let result = pack_layout(items, cfg).unwrap();
    assert_eq!((result.sheets[0].width, result.sheets[0].height), (300, 200));
}

#[test]
fn border_padding_offsets_every_frame() {
    let cfg = layout_cfg().with_dimensions(256, 256).border_padding(4).build();
    let result = pack_layout(random_items(5, 20), cfg).unwrap();
    assert_sheets_valid(&result, 4);
    let min_x = result.sheets[0].frames.iter().map(|f| f.frame.x).min().unwrap();
    let min_y = result.sheets[0].frames.iter().map(|f| f.frame.y).min().unwrap();
    assert_eq!((min_x, min_y), (4, 4));
}

#[test]
fn overflow_spills_into_more_sheets() {
    let items = (0..10).map(|i| LayoutItem::new(format!("t{i:02}"), 60, 60)).collect();
    let cfg = layout_cfg().with_dimensions(128, 128).allow_rotation(false).build();
    let result = pack_layout(items, cfg).unwrap();
    assert_eq!(result.sheets.len(), 3);
    assert_eq!(result.frame_count(), 10);
    assert_sheets_valid(&result, 0);
    let ids: Vec<usize> = result.sheets.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![0, 1, 2]);
}

#[test]
fn every_input_name_comes_back_once() {
    for packer in ["MaxRects", "Ordered", "GridSearch", "Growing", "ShelfAllocator", "Optimal"] {
        let items = random_items(99, 50);
        let mut expected: Vec<String> = items.iter().map(|i| i.name.clone()).collect();
        expected.sort();
        let method = PackerKind::from_name(packer).unwrap().default_method();
        let cfg = layout_cfg()
            .with_dimensions(256, 256)
            .sprite_padding(1)
            .packer(packer, method)
            .build();
        let result = pack_layout(items, cfg).unwrap();
        assert_eq!(names(&result), expected, "{packer}");
        assert_sheets_valid(&result, 0);
    }
}

#[test]
fn packing_is_deterministic() {
    let cfg = layout_cfg()
        .with_dimensions(200, 200)
        .packer("Optimal", "Automatic")
        .build();
    let a = pack_layout(random_items(3, 40), cfg.clone()).unwrap();
    let b = pack_layout(random_items(3, 40), cfg).unwrap();
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn optimal_is_never_worse_than_a_single_combination() {
    let items = random_items(21, 45);
    let optimal = pack_layout(
        items.clone(),
        layout_cfg()
            .with_dimensions(256, 256)
            .packer("Optimal", "Automatic")
            .build(),
    )
    .unwrap();

    for combo in combinations(true) {
        let cfg = layout_cfg()
            .with_dimensions(256, 256)
            .allow_rotation(combo.allow_rotation)
            .packer(combo.kind.name(), combo.method)
            .build();
        let Ok(single) = pack_layout(items.clone(), cfg) else {
            continue;
        };
        assert!(optimal.sheets.len() <= single.sheets.len(), "{combo:?}");
        if optimal.sheets.len() == single.sheets.len() {
            assert!(optimal.efficiency >= single.efficiency - 1e-12, "{combo:?}");
        }
    }
}

#[test]
fn optimal_reports_the_winning_combination() {
    let cfg = layout_cfg()
        .with_dimensions(256, 256)
        .packer("Optimal", "Automatic")
        .build();
    let result = pack_layout(random_items(8, 20), cfg).unwrap();
    assert!(result.packer.is_concrete());
    assert!(result.packer.method_props(&result.method).is_ok());
}

#[test]
fn stored_order_leads_the_export_order() {
    let items = vec![
        LayoutItem::new("a", 10, 10),
        LayoutItem::new("b", 10, 10),
        LayoutItem::new("c", 10, 10),
    ];
    let cfg = layout_cfg()
        .with_dimensions(64, 64)
        .stored_order(Some(vec!["c".into(), "gone".into(), "a".into()]))
        .build();
    let result = pack_layout(items, cfg).unwrap();
    assert_eq!(result.export_order, vec!["c", "a", "b"]);
}

#[test]
fn animation_strips_share_a_max_size() {
    let mut walk1 = LayoutItem::new("walk_01", 10, 20);
    walk1.source_size = Some((10, 20));
    let mut walk2 = LayoutItem::new("walk_02", 12, 18);
    walk2.source_size = Some((12, 18));
    let idle = LayoutItem::new("idle", 5, 5);
    let cfg = layout_cfg().with_dimensions(64, 64).build();
    let result = pack_layout(vec![walk1, walk2, idle], cfg).unwrap();
    for f in &result.sheets[0].frames {
        match f.name.as_str() {
            "idle" => assert_eq!((f.source_size.mw, f.source_size.mh), (None, None)),
            _ => assert_eq!((f.source_size.mw, f.source_size.mh), (Some(12), Some(20))),
        }
    }
}

#[test]
fn animation_prefix_strips_frame_numbers() {
    assert_eq!(animation_prefix("walk_01.png"), Some("walk"));
    assert_eq!(animation_prefix("run-12"), Some("run"));
    assert_eq!(animation_prefix("hero/jump3"), Some("hero/jump"));
    assert_eq!(animation_prefix("idle.png"), None);
    assert_eq!(animation_prefix("idle"), None);
}

#[test]
fn unknown_names_are_configuration_errors() {
    let cfg = layout_cfg().packer("Skyline", "BottomLeft").build();
    let err = pack_layout(vec![LayoutItem::new("a", 4, 4)], cfg).unwrap_err();
    assert!(matches!(err, SheetPackerError::UnknownPacker(ref n) if n == "Skyline"));

    let cfg = layout_cfg().packer("MaxRects", "Fastest").build();
    let err = pack_layout(vec![LayoutItem::new("a", 4, 4)], cfg).unwrap_err();
    assert!(matches!(
        err,
        SheetPackerError::UnknownMethod { packer: "MaxRects", ref method } if method == "Fastest"
    ));
}

#[test]
fn saved_names_resolve_leniently() {
    assert_eq!(
        PackerKind::resolve("Skyline", "BottomLeft"),
        (PackerKind::MaxRects, "BestShortSideFit")
    );
    assert_eq!(
        PackerKind::resolve("Ordered", "Nope"),
        (PackerKind::Ordered, "Unsorted")
    );
    assert_eq!(
        PackerKind::resolve("growing", "sortedarea"),
        (PackerKind::Growing, "SortedArea")
    );
    assert_eq!(get_packer_by_type("ShelfAllocator"), Some(PackerKind::ShelfAllocator));
    assert_eq!(get_packer_by_type("Guillotine"), None);
}

#[test]
fn packer_that_cannot_rotate_exhausts_instead_of_spinning() {
    let items = vec![LayoutItem::new("wide", 200, 100)];
    let cfg = layout_cfg()
        .with_dimensions(100, 200)
        .allow_rotation(true)
        .packer("Growing", "Unsorted")
        .build();
    let err = pack_layout(items, cfg).unwrap_err();
    assert!(matches!(
        err,
        SheetPackerError::Exhausted {
            packer: "Growing",
            remaining: 1,
            ..
        }
    ));
}

#[test]
fn empty_input_is_rejected() {
    let err = pack_layout(Vec::new(), layout_cfg().build()).unwrap_err();
    assert!(matches!(err, SheetPackerError::Empty));
}

#[test]
fn unbounded_sheet_fits_everything_on_one_sheet() {
    let cfg = layout_cfg().unbounded().build();
    let result = pack_layout(random_items(13, 30), cfg).unwrap();
    assert_eq!(result.sheets.len(), 1);
    assert_eq!(result.frame_count(), 30);
}

#[test]
fn config_validation() {
    let cfg = PackerConfig::builder().with_dimensions(0, 64).build();
    assert!(matches!(
        cfg.validate(),
        Err(SheetPackerError::InvalidDimensions { width: 0, height: 64 })
    ));
    let cfg = PackerConfig::builder().with_dimensions(20, 64).border_padding(10).build();
    assert!(matches!(cfg.validate(), Err(SheetPackerError::InvalidConfig(_))));
    assert!(PackerConfig::default().validate().is_ok());
    assert!(PackerConfig::builder().unbounded().build().validate().is_ok());
}

#[test]
fn config_round_trips_through_json_with_defaults() {
    let cfg: PackerConfig = serde_json::from_str(r#"{"packer":"Ordered","width":512}"#).unwrap();
    assert_eq!(cfg.packer, "Ordered");
    assert_eq!(cfg.width, Some(512));
    assert_eq!(cfg.height, Some(2048));
    assert!(cfg.allow_rotation);
    let back: PackerConfig = serde_json::from_str(&serde_json::to_string(&cfg).unwrap()).unwrap();
    assert_eq!(back, cfg);
}

#[test]
fn huge_sheets_pack_with_every_combination() {
    let items = (0..4).map(|i| LayoutItem::new(format!("s{i}"), 64, 64)).collect();
    let cfg = layout_cfg()
        .with_dimensions(70_000, 70_000)
        .packer("Optimal", "Automatic")
        .build();
    let result = pack_layout(items, cfg).unwrap();
    assert_eq!(result.sheets.len(), 1);
    assert_eq!(result.frame_count(), 4);
}

#[test]
fn unbounded_shelf_allocator_run_over_the_engine_limit() {
    let items = (0..1100).map(|i| LayoutItem::new(format!("s{i:04}"), 64, 64)).collect();
    let cfg = layout_cfg()
        .unbounded()
        .packer("ShelfAllocator", "SquareArea")
        .build();
    let result = pack_layout(items, cfg).unwrap();
    assert_eq!(result.frame_count(), 1100);
    assert_sheets_valid(&result, 0);
}

#[test]
fn shelf_allocator_places_a_sprite_that_only_fits_upright() {
    let items = vec![LayoutItem::new("tall", 20, 100)];
    let cfg = layout_cfg()
        .with_dimensions(50, 200)
        .packer("ShelfAllocator", "SmartArea")
        .build();
    let result = pack_layout(items, cfg).unwrap();
    assert_eq!(result.sheets.len(), 1);
    assert!(!result.sheets[0].frames[0].rotated);
}
