//! Property tests for sparse storage, image layouts and factories

use approx::assert_relative_eq;
use hostview::make::{self, ImageOptions};
use hostview::{MemoryRuntime, SparseMatrixView};
use proptest::prelude::*;

/// A small dense matrix with roughly half of its entries zero
fn sparse_ish_matrix() -> impl Strategy<Value = (usize, usize, Vec<i64>)> {
    (1usize..6, 1usize..6).prop_flat_map(|(rows, cols)| {
        let cell = prop_oneof![Just(0i64), -50i64..50];
        (Just(rows), Just(cols), prop::collection::vec(cell, rows * cols))
    })
}

proptest! {
    #[test]
    fn factory_dimensions_match_request(rows in 0usize..8, cols in 0usize..8, slices in 0usize..4) {
        let host = MemoryRuntime::new();
        prop_assert_eq!(make::vector::<f64>(&host, rows).unwrap().dimensions(), vec![rows]);
        prop_assert_eq!(make::matrix::<i64>(&host, rows, cols).unwrap().dimensions(), vec![rows, cols]);
        prop_assert_eq!(
            make::cube::<f64>(&host, slices, rows, cols).unwrap().dimensions(),
            vec![slices, rows, cols]
        );
    }

    #[test]
    fn csr_invariants_hold((rows, cols, data) in sparse_ish_matrix()) {
        let host = MemoryRuntime::new();
        let t = make::matrix_from(&host, rows, cols, &data).unwrap();
        let s = t.to_sparse().unwrap();
        let rp: Vec<i64> = s.row_pointers().iter().collect();
        prop_assert_eq!(rp.len(), rows + 1);
        prop_assert_eq!(rp[0], 0);
        prop_assert!(rp.windows(2).all(|w| w[0] <= w[1]));
        prop_assert_eq!(rp[rows] as usize, data.iter().filter(|&&v| v != 0).count());
        prop_assert_eq!(s.len(), rp[rows] as usize);
    }

    #[test]
    fn dense_sparse_round_trip((rows, cols, data) in sparse_ish_matrix()) {
        let host = MemoryRuntime::new();
        let t = make::matrix_from(&host, rows, cols, &data).unwrap();
        let back = t.to_sparse().unwrap().to_dense().unwrap();
        prop_assert_eq!(back.dimensions(), vec![rows, cols]);
        prop_assert_eq!(back.iter().collect::<Vec<_>>(), data);
    }

    #[test]
    fn binary_search_matches_linear_scan((rows, cols, data) in sparse_ish_matrix()) {
        let host = MemoryRuntime::new();
        let t = make::matrix_from(&host, rows, cols, &data).unwrap();
        let sm = SparseMatrixView::from_array(t.to_sparse().unwrap()).unwrap();
        let rp = sm.row_pointers();
        let ci = sm.column_indices();
        let ev = sm.explicit_values().unwrap();
        for i in 0..rows {
            for j in 0..cols {
                let lower = rp.get(i) as usize;
                let upper = rp.get(i + 1) as usize;
                let scanned = (lower..upper)
                    .find(|&k| ci.get(k) == j as i64 + 1)
                    .map_or(sm.implicit_value(), |k| ev.get(k));
                prop_assert_eq!(sm.at(i, j).unwrap(), scanned);
                prop_assert_eq!(scanned, data[i * cols + j]);
            }
        }
    }

    #[test]
    fn iteration_is_ascending((rows, cols, data) in sparse_ish_matrix()) {
        let host = MemoryRuntime::new();
        let t = make::matrix_from(&host, rows, cols, &data).unwrap();
        let sm = SparseMatrixView::from_array(t.to_sparse().unwrap()).unwrap();
        let seen: Vec<(usize, usize)> = sm.entries().map(|c| (c.row(), c.index())).collect();
        prop_assert_eq!(seen.len(), sm.len());
        prop_assert!(seen.windows(2).all(|w| w[0] < w[1]));
        for c in sm.entries() {
            prop_assert_eq!(c.get().unwrap(), data[c.row() * cols + c.col()]);
        }
        let forward: Vec<usize> = sm.entries().map(|c| c.index()).collect();
        let mut backward: Vec<usize> = sm.entries().rev().map(|c| c.index()).collect();
        backward.reverse();
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn layouts_index_alike(
        width in 1usize..5,
        height in 1usize..5,
        channels in 1usize..5,
        seed in any::<u64>(),
    ) {
        let host = MemoryRuntime::new();
        let opts = ImageOptions::default().channels(channels);
        let inter = make::image::<f32>(&host, width, height, opts.interleaved(true)).unwrap();
        let planar = make::image::<f32>(&host, width, height, opts.interleaved(false)).unwrap();
        for r in 0..height {
            for c in 0..width {
                for ch in 0..channels {
                    let v = ((seed as usize ^ (r * 31 + c * 7 + ch)) % 1000) as f32 / 8.0;
                    inter.set_at(r, c, ch, v);
                    planar.set_at(r, c, ch, v);
                }
            }
        }
        for r in 0..height {
            for c in 0..width {
                for ch in 0..channels {
                    prop_assert_eq!(inter.at(r, c, ch), planar.at(r, c, ch));
                }
            }
        }
        for ch in 0..channels {
            prop_assert_eq!(
                inter.channel_pixels(ch).collect::<Vec<_>>(),
                planar.channel_pixels(ch).collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn clones_are_independent(data in prop::collection::vec(-1.0e6f64..1.0e6, 1..20), idx in any::<prop::sample::Index>()) {
        let host = MemoryRuntime::new();
        let v = make::vector_from(&host, &data).unwrap();
        let copy = v.duplicate().unwrap();
        let i = idx.index(data.len());
        copy.set(i, data[i] + 1.0);
        prop_assert_eq!(v.iter().collect::<Vec<_>>(), data);
    }
}

#[test]
fn byte_to_real_conversion_rescales() {
    let host = MemoryRuntime::new();
    let im = make::image::<u8>(&host, 2, 1, ImageOptions::default()).unwrap();
    im.fill_from(&[0, 51]).unwrap();
    let real = im.convert_to_same_layout::<f64>().unwrap();
    assert_relative_eq!(real.at(0, 0, 0), 0.0);
    assert_relative_eq!(real.at(0, 1, 0), 0.2, epsilon = 1e-12);
}
