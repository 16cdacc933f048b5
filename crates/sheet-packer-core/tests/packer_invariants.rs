use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sheet_packer_core::model::Frame;
use sheet_packer_core::packer::{PackerKind, Packer};
use std::collections::HashMap;

fn random_frames(seed: u64, n: usize, max_side: u32) -> Vec<Frame> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let w = rng.gen_range(4..=max_side);
            let h = rng.gen_range(4..=max_side);
            Frame::new(format!("s{:03}", i), w, h)
        })
        .collect()
}

fn disjoint(frames: &[Frame]) -> bool {
    for i in 0..frames.len() {
        for j in (i + 1)..frames.len() {
            if frames[i].placed_rect().intersects(&frames[j].placed_rect()) {
                return false;
            }
        }
    }
    true
}

fn check_layout(label: &str, input: &[Frame], placed: &[Frame], bin_w: u32, bin_h: u32, padding: u32) {
    let by_name: HashMap<&str, &Frame> = input.iter().map(|f| (f.name.as_str(), f)).collect();
    assert!(disjoint(placed), "{label}: overlapping placements");
    for f in placed {
        let r = f.placed_rect();
        assert!(r.right() <= bin_w && r.bottom() <= bin_h, "{label}: {} outside bin: {:?}", f.name, r);
        // the padded footprint stays in the bin as well
        assert!(r.right() + padding <= bin_w && r.bottom() + padding <= bin_h, "{label}: padding outside bin");
        let orig = by_name[f.name.as_str()];
        assert_eq!((f.frame.w, f.frame.h), (orig.frame.w, orig.frame.h), "{label}: size changed");
        let (pw, ph) = f.placed_size();
        if f.rotated {
            assert_eq!((ph, pw), (orig.frame.w, orig.frame.h), "{label}: rotation round-trip");
        }
    }
    let mut names: Vec<&str> = placed.iter().map(|f| f.name.as_str()).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), placed.len(), "{label}: frame placed twice");
}

#[test]
fn every_packer_method_keeps_placements_disjoint_and_inside_the_bin() {
    let frames = random_frames(7, 40, 64);
    for kind in PackerKind::ALL {
        for props in kind.methods() {
            for rotate in [false, true] {
                for padding in [0, 2] {
                    let label = format!("{}/{} rot={} pad={}", kind.name(), props.name, rotate, padding);
                    let mut packer = kind.create(256, 256, rotate, padding);
                    let placed = packer.pack(&frames, props.name).expect(&label);
                    assert!(!placed.is_empty(), "{label}: nothing placed");
                    check_layout(&label, &frames, &placed, 256, 256, padding);
                }
            }
        }
    }
}

#[test]
fn packers_place_everything_when_the_bin_is_roomy() {
    let frames = random_frames(11, 25, 48);
    for kind in PackerKind::ALL {
        let method = kind.default_method();
        let mut packer = kind.create(1024, 1024, true, 1);
        let placed = packer.pack(&frames, method).unwrap();
        assert_eq!(placed.len(), frames.len(), "{} lost frames", kind.name());
        check_layout(kind.name(), &frames, &placed, 1024, 1024, 1);
    }
}

#[test]
fn repeated_runs_are_identical() {
    let frames = random_frames(42, 60, 80);
    for kind in PackerKind::ALL {
        for props in kind.methods() {
            let a = kind.create(300, 300, true, 1).pack(&frames, props.name).unwrap();
            let b = kind.create(300, 300, true, 1).pack(&frames, props.name).unwrap();
            assert_eq!(a, b, "{}/{} is not deterministic", kind.name(), props.name);
        }
    }
}

#[test]
fn unknown_method_is_rejected_by_every_packer() {
    let frames = random_frames(1, 3, 16);
    for kind in PackerKind::ALL {
        let err = kind.create(64, 64, false, 0).pack(&frames, "NoSuchMethod").unwrap_err();
        assert!(
            matches!(err, sheet_packer_core::SheetPackerError::UnknownMethod { .. }),
            "{}: {err}",
            kind.name()
        );
    }
}

#[test]
fn empty_input_is_a_no_op() {
    for kind in PackerKind::ALL {
        let placed = kind
            .create(64, 64, true, 0)
            .pack(&[], kind.default_method())
            .unwrap();
        assert!(placed.is_empty(), "{}", kind.name());
    }
}

#[test]
fn method_names_resolve_case_insensitively() {
    let frames = random_frames(3, 5, 16);
    let mut packer = PackerKind::MaxRects.create(128, 128, false, 0);
    assert!(packer.pack(&frames, "bestareafit").is_ok());
    let props = PackerKind::GridSearch.method_props("altsortedareadesc").unwrap();
    assert_eq!(props.name, "AltSortedAreaDesc");
}
