use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use carta_image::{
    split_rects, CachedImage, Color, ImageOperations, ImageSurface, MemoryImage, VirtualImage,
};
use proptest::prelude::*;

static NEXT_FILE: AtomicUsize = AtomicUsize::new(0);

fn scratch_path(tag: &str) -> PathBuf {
    let n = NEXT_FILE.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("carta-image-{}-{}-{}.dat", tag, std::process::id(), n))
}

fn color() -> impl Strategy<Value = Color> {
    (any::<u8>(), any::<u8>(), any::<u8>(), any::<u8>()).prop_map(|(r, g, b, a)| Color::new(r, g, b, a))
}

#[derive(Clone, Debug)]
enum PixelOp {
    Set(i64, i64, Color),
    Blend(i64, i64, Color),
}

fn pixel_op(side: i64) -> impl Strategy<Value = PixelOp> {
    (0..side, 0..side, color(), any::<bool>()).prop_map(|(x, y, c, set)| {
        if set {
            PixelOp::Set(x, y, c)
        } else {
            PixelOp::Blend(x, y, c)
        }
    })
}

proptest! {
    // Invariant: blending invisible is the identity; an opaque receiver
    // never changes.
    #[test]
    fn blend_identities(c in color()) {
        let mut x = c;
        x.blend(Color::INVISIBLE);
        prop_assert_eq!(x, c);

        let mut opaque = c;
        opaque.a = 0xff;
        let expect = opaque;
        opaque.blend(Color::new(1, 2, 3, 200));
        prop_assert_eq!(opaque, expect);
    }

    // Invariant: of two opaque ops on one pixel, the second is dropped;
    // transparent ops all accumulate.
    #[test]
    fn opaque_dedup_and_transparent_accumulation(
        mut a in color(), mut b in color(), n in 1usize..8,
    ) {
        a.a = 0xff;
        b.a = 0xff;
        let mut ops = ImageOperations::new(8, 8);
        ops.add(2, 2, a);
        ops.add(2, 2, b);
        prop_assert_eq!(ops.len(), 1);

        let mut ops = ImageOperations::new(8, 8);
        for _ in 0..n {
            ops.add(1, 1, Color::new(10, 10, 10, 128));
        }
        prop_assert_eq!(ops.len(), n);
    }

    // Invariant: any set/blend sequence on a small surface produces
    // bitwise-identical pixels on MemoryImage and CachedImage, even with a
    // pathologically small cache.
    #[test]
    fn memory_and_cached_surfaces_agree(
        ops in proptest::collection::vec(pixel_op(40), 0..60),
        cap in 1usize..32,
    ) {
        let path = scratch_path("parity");
        let mut mem = MemoryImage::new(40, 40);
        let mut cached = CachedImage::build(&path, 40, 40, cap).unwrap();
        for op in &ops {
            match *op {
                PixelOp::Set(x, y, c) => {
                    mem.set_pixel(x, y, c);
                    cached.set_pixel(x, y, c);
                }
                PixelOp::Blend(x, y, c) => {
                    mem.blend_pixel(x, y, c);
                    cached.blend_pixel(x, y, c);
                }
            }
        }
        for y in 0..40 {
            for x in 0..40 {
                prop_assert_eq!(mem.get_pixel(x, y), cached.get_pixel(x, y));
            }
        }
        let mut mline = vec![Color::INVISIBLE; 40];
        let mut cline = vec![Color::INVISIBLE; 40];
        for y in 0..40 {
            mem.get_line(y, 0, 40, &mut mline);
            cached.get_line(y, 0, 40, &mut cline);
            prop_assert_eq!(&mline, &cline);
        }
    }
}

#[test]
fn playback_keeps_first_opaque_op() {
    let mut ops = ImageOperations::new(8, 8);
    ops.add(0, 0, Color::opaque(255, 0, 0));
    ops.add(0, 0, Color::opaque(0, 0, 255));
    let mut img = MemoryImage::new(8, 8);
    img.composite_ops(0, 0, &ops);
    assert_eq!(img.get_pixel(0, 0), Color::opaque(255, 0, 0));
}

#[test]
fn playback_blends_later_transparent_over_earlier_opaque() {
    let mut ops = ImageOperations::new(8, 8);
    ops.add(0, 0, Color::opaque(0, 0, 0));
    ops.add(0, 0, Color::new(255, 255, 255, 128));
    let mut img = MemoryImage::new(8, 8);
    img.composite_ops(0, 0, &ops);
    assert_eq!(img.get_pixel(0, 0), Color::opaque(128, 128, 128));
}

#[test]
fn saved_pngs_match_between_memory_and_cached() {
    let cache = scratch_path("png-cache");
    let mut mem = MemoryImage::new(64, 64);
    let mut cached = CachedImage::build(&cache, 64, 64, 16).unwrap();
    for i in 0..64i64 {
        for j in 0..64i64 {
            let c = Color::opaque(i as u8, j as u8, (i ^ j) as u8);
            mem.set_pixel(i, j, c);
            cached.set_pixel(i, j, c);
        }
    }
    let out_a = scratch_path("png-a").with_extension("png");
    let out_b = scratch_path("png-b").with_extension("png");
    let mut quiet = |_: usize, _: usize| {};
    mem.save_png(&out_a, Some("parity"), &mut quiet).unwrap();
    cached.save_png(&out_b, Some("parity"), &mut quiet).unwrap();
    let a = std::fs::read(&out_a).unwrap();
    let b = std::fs::read(&out_b).unwrap();
    assert!(!a.is_empty());
    assert_eq!(a, b);
    std::fs::remove_file(out_a).unwrap();
    std::fs::remove_file(out_b).unwrap();
}

#[test]
fn get_line_reads_the_full_row() {
    let mut img = MemoryImage::new(5, 2);
    for x in 0..5 {
        img.set_pixel(x, 1, Color::opaque(x as u8, 0, 0));
    }
    let mut line = vec![Color::INVISIBLE; 5];
    img.get_line(1, 0, 5, &mut line);
    assert_eq!(line[4], Color::opaque(4, 0, 0));
}

#[test]
fn split_covers_the_surface_in_clamped_windows() {
    let tiles = split_rects(100, 80, 50);
    assert_eq!(tiles.len(), 4);
    let keys: Vec<(i64, i64)> = tiles.keys().copied().collect();
    assert_eq!(keys, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    assert_eq!(tiles[&(1, 1)].w, 50);
    assert_eq!(tiles[&(1, 1)].h, 30);
    let area: i64 = tiles.values().map(|r| r.w * r.h).sum();
    assert_eq!(area, 100 * 80);
}

#[test]
fn split_windows_are_bit_exact_subregions() {
    let mut base = MemoryImage::new(100, 80);
    for y in 0..80i64 {
        for x in 0..100i64 {
            base.set_pixel(x, y, Color::opaque(x as u8, y as u8, (x + y) as u8));
        }
    }
    for (_, rect) in split_rects(100, 80, 50) {
        let mut expect = Vec::new();
        for y in rect.y..rect.y + rect.h {
            for x in rect.x..rect.x + rect.w {
                expect.push(base.get_pixel(x, y));
            }
        }
        let mut view = VirtualImage::new(&mut base, rect);
        let mut got = Vec::new();
        for y in 0..rect.h {
            for x in 0..rect.w {
                got.push(view.get_pixel(x, y));
            }
        }
        assert_eq!(got, expect);
    }
}

#[test]
fn composite_paints_the_given_image_over_the_receiver() {
    let mut base = MemoryImage::new(10, 10);
    base.fill(Color::opaque(0, 0, 0));
    let mut mark = MemoryImage::new(3, 3);
    mark.fill(Color::opaque(250, 0, 0));
    base.safe_composite(2, 2, &mut mark);
    assert_eq!(base.get_pixel(3, 3), Color::opaque(250, 0, 0));
    assert_eq!(base.get_pixel(0, 0), Color::opaque(0, 0, 0));
    // A partially out-of-bounds composite is skipped entirely.
    base.safe_composite(9, 9, &mut mark);
    assert_eq!(base.get_pixel(9, 9), Color::opaque(0, 0, 0));
}
