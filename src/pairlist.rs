//! Builds the flat pair list from a cell-linked-list, and the list
//! itself: the materialised, optionally site-sorted array of pair
//! records everything downstream iterates over.

use itertools::iproduct;

use crate::binner::LinkedBins;
use crate::cell::CellGeometry;
use crate::error::{Error, Result};
use crate::geom::{Mat3, Vec3};
use crate::num::{index_from_usize, usize_from_index, IndexInt, Scalar};

/// One neighbour relationship: site `i` sees site `j` across
/// displacement `dr` (pointing from `i` to `j`, `|dr| = r`), after
/// applying the periodic image recorded in `shift`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairRecord<T, I> {
    pub i: I,
    pub j: I,
    pub r: T,
    pub dr: Vec3<T>,
    pub shift: [i64; 3],
}

/// The materialised pair list: five parallel arrays of equal length,
/// optionally reordered so each site's neighbours form a contiguous,
/// `j`-sorted slice.
#[derive(Debug, Clone)]
pub struct PairList<T, I> {
    i: Vec<I>,
    j: Vec<I>,
    abs: Vec<T>,
    dr: Vec<Vec3<T>>,
    shift: Vec<[i64; 3]>,
    first_of_site: Option<Vec<I>>,
    num_sites: usize,
}

impl<T: Scalar, I: IndexInt> PairList<T, I> {
    fn from_records(records: Vec<PairRecord<T, I>>, num_sites: usize, sorted: bool) -> Self {
        let mut i = Vec::with_capacity(records.len());
        let mut j = Vec::with_capacity(records.len());
        let mut abs = Vec::with_capacity(records.len());
        let mut dr = Vec::with_capacity(records.len());
        let mut shift = Vec::with_capacity(records.len());

        let mut records = records;
        if sorted {
            // Stable: ties on (i, j) keep their emission order, which
            // keeps shift bookkeeping deterministic across runs.
            records.sort_by(|a, b| {
                let ia = usize_from_index::<I>(a.i);
                let ib = usize_from_index::<I>(b.i);
                ia.cmp(&ib).then_with(|| {
                    let ja = usize_from_index::<I>(a.j);
                    let jb = usize_from_index::<I>(b.j);
                    ja.cmp(&jb)
                })
            });
        }

        for r in &records {
            i.push(r.i);
            j.push(r.j);
            abs.push(r.r);
            dr.push(r.dr);
            shift.push(r.shift);
        }

        let first_of_site = if sorted {
            let mut first = vec![index_from_usize::<I>(records.len()); num_sites + 1];
            let mut next_site = 0usize;
            for (pos, r) in records.iter().enumerate() {
                let this_site = usize_from_index::<I>(r.i);
                while next_site <= this_site {
                    first[next_site] = index_from_usize::<I>(pos);
                    next_site += 1;
                }
            }
            while next_site <= num_sites {
                first[next_site] = index_from_usize::<I>(records.len());
                next_site += 1;
            }
            Some(first)
        } else {
            None
        };

        PairList { i, j, abs, dr, shift, first_of_site, num_sites }
    }

    pub fn len(&self) -> usize {
        self.i.len()
    }

    pub fn is_empty(&self) -> bool {
        self.i.is_empty()
    }

    pub fn num_sites(&self) -> usize {
        self.num_sites
    }

    pub fn is_sorted(&self) -> bool {
        self.first_of_site.is_some()
    }

    /// Record `k`'s site indices, distance and displacement.
    pub fn record(&self, k: usize) -> (I, I, T, Vec3<T>, [i64; 3]) {
        (self.i[k], self.j[k], self.abs[k], self.dr[k], self.shift[k])
    }

    pub fn pair_iter(&self) -> impl Iterator<Item = (I, I, T, Vec3<T>)> + '_ {
        self.i.iter().zip(&self.j).zip(&self.abs).zip(&self.dr).map(|(((&i, &j), &r), &dr)| (i, j, r, dr))
    }

    /// Neighbour slice `(j[], |r|[], dr[])` for site `i`. Requires a
    /// sorted list; `None` otherwise.
    pub fn site(&self, i: usize) -> Option<(&[I], &[T], &[Vec3<T>])> {
        let first = self.first_of_site.as_ref()?;
        let a = usize_from_index::<I>(first[i]);
        let b = usize_from_index::<I>(first[i + 1]);
        Some((&self.j[a..b], &self.abs[a..b], &self.dr[a..b]))
    }

    pub fn sites_iter(&self) -> impl Iterator<Item = (I, &[I], &[T], &[Vec3<T>])> + '_ {
        let first = self.first_of_site.as_deref().unwrap_or(&[]);
        (0..self.num_sites).map(move |i| {
            let a = usize_from_index::<I>(first[i]);
            let b = usize_from_index::<I>(first[i + 1]);
            (index_from_usize::<I>(i), &self.j[a..b], &self.abs[a..b], &self.dr[a..b])
        })
    }

    /// Bounds of site `i`'s neighbour slice, and the offset of its
    /// first neighbour with `j > i` (per §4.5's `find_first_greater`).
    pub(crate) fn site_bounds_and_first_greater(&self, i: usize) -> Option<(usize, usize, Option<usize>)> {
        let first = self.first_of_site.as_ref()?;
        let a = usize_from_index::<I>(first[i]);
        let b = usize_from_index::<I>(first[i + 1]);
        let greater = self.j[a..b].iter().position(|&j| usize_from_index::<I>(j) > i).map(|off| a + off);
        Some((a, b, greater))
    }
}

/// Walk the cell-linked-list and emit every pair within `cutoff`.
fn build_pairs<T: Scalar, I: IndexInt>(
    positions: &[Vec3<T>],
    geom: &CellGeometry<T>,
    bins: &LinkedBins<I>,
) -> Vec<PairRecord<T, I>> {
    let n = geom.bins();
    let shell = geom.shell();
    let cutoff2 = geom.cutoff() * geom.cutoff();

    let mut out = Vec::with_capacity(positions.len() * 6);

    for (idx, &xi) in positions.iter().enumerate() {
        let ci0 = geom.bin_of(&xi);
        let ci_eff = geom.wrap_or_trunc(ci0);
        let dxi = xi - geom.bin_corner(ci_eff);

        for (x, y, z) in iproduct!(-shell[0]..=shell[0], -shell[1]..=shell[1], -shell[2]..=shell[2]) {
            let candidate = [ci_eff[0] + x, ci_eff[1] + y, ci_eff[2] + z];
            let Some(cj_candidate) = geom.wrap_or_reject(candidate) else {
                continue;
            };
            let off = geom.shift_offset([x, y, z]);
            let flat = geom.flatten(cj_candidate) as usize;

            for jdx in bins.bin(flat) {
                if jdx == idx && (x, y, z) == (0, 0, 0) {
                    continue;
                }

                let xj = positions[jdx];
                let cj = geom.wrap_or_trunc(geom.bin_of(&xj));
                let dxj = xj - geom.bin_corner(cj);

                let dr = dxj - dxi + off;
                let d2 = dr.norm2();

                if d2 < cutoff2 {
                    let mut shift = [0i64; 3];
                    for k in 0..3 {
                        let offset = [x, y, z][k];
                        shift[k] = (ci0[k] - cj[k] + offset) / n[k];
                    }

                    out.push(PairRecord {
                        i: index_from_usize(idx),
                        j: index_from_usize(jdx),
                        r: d2.sqrt(),
                        dr,
                        shift,
                    });
                }
            }
        }
    }

    out
}

/// Build the neighbour-pair list for `positions` within `cell`, an
/// (optionally triclinic, optionally periodic) simulation cell.
///
/// `sorted` controls whether neighbours are reordered into per-site
/// contiguous, `j`-ascending slices: pass `true` if you intend to call
/// [`PairList::site`], [`PairList::sites_iter`] or
/// [`crate::nbody::nbodies`] on the result.
///
/// The returned shifts are computed in a bin-relative scheme (§4.3) and
/// are not guaranteed to coincide with the strict minimum image under
/// extreme cutoff-to-cell-size ratios; verify shift arithmetic
/// independently if your cell is very skewed relative to the cutoff.
pub fn build_pairlist<T: Scalar, I: IndexInt>(
    cell: Mat3<T>,
    pbc: [bool; 3],
    positions: &[Vec3<T>],
    cutoff: T,
    sorted: bool,
) -> Result<PairList<T, I>> {
    if positions.len() as i128 > I::max_value().to_i128().expect("IndexInt must convert to i128") {
        return Err(Error::AllocationFailure);
    }

    let geom = CellGeometry::new(cell, pbc, cutoff)?;
    let bins = LinkedBins::<I>::build(positions, &geom)?;
    let records = build_pairs(positions, &geom, &bins);

    Ok(PairList::from_records(records, positions.len(), sorted))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cubic(d: f64) -> Mat3<f64> {
        [[d, 0.0, 0.0], [0.0, d, 0.0], [0.0, 0.0, d]]
    }

    #[test]
    fn two_particles_just_inside_cutoff_see_each_other_both_ways() {
        let positions = [Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.9, 0.0, 0.0)];
        let list: PairList<f64, i32> = build_pairlist(cubic(10.0), [false; 3], &positions, 1.0, true).unwrap();

        assert_eq!(list.len(), 2);
        let (j0, r0, _) = list.site(0).unwrap();
        let (j1, r1, _) = list.site(1).unwrap();
        assert_eq!(j0, &[1]);
        assert_eq!(j1, &[0]);
        assert!((r0[0] - 0.9).abs() < 1e-12);
        assert!((r1[0] - 0.9).abs() < 1e-12);
    }

    #[test]
    fn particles_beyond_cutoff_see_nothing() {
        let positions = [Vec3::new(0.0, 0.0, 0.0), Vec3::new(5.0, 0.0, 0.0)];
        let list: PairList<f64, i32> = build_pairlist(cubic(10.0), [false; 3], &positions, 1.0, true).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn periodic_self_image_is_emitted_for_a_small_cell() {
        // A single particle in a box smaller than 2*cutoff sees its own
        // periodic images: one for each of the 6 face directions.
        let positions = [Vec3::new(0.0, 0.0, 0.0)];
        let list: PairList<f64, i32> = build_pairlist(cubic(2.0), [true; 3], &positions, 2.1, true).unwrap();
        assert_eq!(list.len(), 6);
        for (i, j, _, _) in list.pair_iter() {
            assert_eq!(i, 0);
            assert_eq!(j, 0);
        }
    }

    #[test]
    fn two_dimensional_periodicity_admits_no_out_of_plane_images() {
        // Four particles on a unit-cell square, periodic only in x and y.
        let positions = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
        ];
        let list: PairList<f64, i32> =
            build_pairlist(cubic(1.0), [true, true, false], &positions, 1.1, true).unwrap();

        for (_, _, _, dr) in list.pair_iter() {
            assert!(dr.z.abs() < 1e-12, "found an out-of-plane periodic image: {:?}", dr);
        }

        for i in 0..4 {
            let (js, _, _) = list.site(i).unwrap();
            for &j in js {
                let j = j as usize;
                let (back, _, _) = list.site(j).unwrap();
                assert!(back.contains(&(i as i32)), "pair ({}, {}) missing its reverse orientation", i, j);
            }
        }
    }

    #[test]
    fn sorted_list_has_nondecreasing_j_within_each_site_slice() {
        let mut positions = Vec::new();
        for k in 0..20 {
            positions.push(Vec3::new((k as f64) * 0.31, (k as f64 * 1.7).sin(), (k as f64 * 0.9).cos()));
        }
        let list: PairList<f64, i32> = build_pairlist(cubic(8.0), [true; 3], &positions, 1.5, true).unwrap();

        for i in 0..list.num_sites() {
            let (js, _, _) = list.site(i).unwrap();
            for w in js.windows(2) {
                assert!(w[0] <= w[1], "site {} neighbours not sorted: {:?}", i, js);
            }
        }
    }

    #[test]
    fn unsorted_list_has_no_site_index() {
        let positions = [Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.5, 0.0, 0.0)];
        let list: PairList<f64, i32> = build_pairlist(cubic(10.0), [false; 3], &positions, 1.0, false).unwrap();
        assert!(!list.is_sorted());
        assert!(list.site(0).is_none());
    }
}
