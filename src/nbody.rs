//! Enumerates canonical n-body tuples over a sorted [`PairList`] and
//! computes their edge-length vectors, without heap-allocating per
//! tuple.

use crate::error::{Error, Result};
use crate::num::{usize_from_index, IndexInt, Scalar};
use crate::pairlist::PairList;

/// One canonical n-body tuple: central site `i` together with `M = N-1`
/// neighbour positions, given as offsets into `i`'s neighbour slice
/// (see [`PairList::site`]). All `M` neighbours satisfy `j > i`, and
/// the positions are strictly increasing, so every unordered n-tuple of
/// sites is produced exactly once across the whole list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NBodyTuple<const M: usize> {
    pub i: usize,
    pub positions: [usize; M],
}

impl<const M: usize> NBodyTuple<M> {
    /// The absolute site index of neighbour `k`.
    pub fn neighbour<T: Scalar, I: IndexInt>(&self, list: &PairList<T, I>, k: usize) -> usize {
        let (js, _, _) = list.site(self.i).expect("NBodyTuple requires a sorted PairList");
        usize_from_index::<I>(js[self.positions[k]])
    }

    /// Fill `out` (length `M*(M+1)/2`) with the canonical edge-length
    /// vector: the `M` edges from `i` to each neighbour (in tuple
    /// order), followed by the `M*(M-1)/2` inter-neighbour edges in
    /// lexicographic `(a, b)` order.
    pub fn edge_lengths<T: Scalar, I: IndexInt>(&self, list: &PairList<T, I>, out: &mut [T]) {
        assert_eq!(out.len(), M * (M + 1) / 2, "edge buffer has the wrong length");
        let (_, r, dr) = list.site(self.i).expect("NBodyTuple requires a sorted PairList");

        for k in 0..M {
            out[k] = r[self.positions[k]];
        }

        let mut idx = M;
        for a in 0..M {
            for b in (a + 1)..M {
                out[idx] = (dr[self.positions[a]] - dr[self.positions[b]]).norm();
                idx += 1;
            }
        }
    }
}

/// Stack-allocated generator of strictly increasing `M`-combinations
/// of `[start, end)`, advanced odometer-style. Never allocates.
struct Combinations<const M: usize> {
    state: [usize; M],
    end: usize,
    started: bool,
    exhausted: bool,
}

impl<const M: usize> Combinations<M> {
    fn new(start: usize, end: usize) -> Self {
        let mut state = [0usize; M];
        for (k, slot) in state.iter_mut().enumerate() {
            *slot = start + k;
        }
        let exhausted = M == 0 || start + M > end;
        Combinations { state, end, started: false, exhausted }
    }
}

impl<const M: usize> Iterator for Combinations<M> {
    type Item = [usize; M];

    fn next(&mut self) -> Option<[usize; M]> {
        if self.exhausted {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.state);
        }

        let mut k = M - 1;
        loop {
            let max_k = self.end - M + k;
            if self.state[k] < max_k {
                self.state[k] += 1;
                for t in (k + 1)..M {
                    self.state[t] = self.state[t - 1] + 1;
                }
                return Some(self.state);
            }
            if k == 0 {
                self.exhausted = true;
                return None;
            }
            k -= 1;
        }
    }
}

/// Iterates all canonical n-body tuples of a sorted [`PairList`], site
/// by site in ascending order.
pub struct NBodyIterator<'a, T, I, const M: usize> {
    list: &'a PairList<T, I>,
    site: usize,
    num_sites: usize,
    combos: Option<Combinations<M>>,
}

impl<'a, T: Scalar, I: IndexInt, const M: usize> NBodyIterator<'a, T, I, M> {
    fn advance_to_next_site(&mut self) {
        loop {
            self.site += 1;
            if self.site >= self.num_sites {
                self.combos = None;
                return;
            }
            if let Some(combos) = self.combos_for(self.site) {
                self.combos = Some(combos);
                return;
            }
        }
    }

    fn combos_for(&self, site: usize) -> Option<Combinations<M>> {
        let (a, b, greater) = self.list.site_bounds_and_first_greater(site)?;
        let greater = greater?;
        Some(Combinations::new(greater - a, b - a))
    }
}

impl<'a, T: Scalar, I: IndexInt, const M: usize> Iterator for NBodyIterator<'a, T, I, M> {
    type Item = NBodyTuple<M>;

    fn next(&mut self) -> Option<NBodyTuple<M>> {
        loop {
            if self.site >= self.num_sites {
                return None;
            }
            if let Some(combos) = self.combos.as_mut() {
                if let Some(positions) = combos.next() {
                    return Some(NBodyTuple { i: self.site, positions });
                }
            }
            self.advance_to_next_site();
        }
    }
}

/// Build an iterator of all canonical n-body tuples of arity `N = M+1`
/// over `list`, which must have been built with `sorted = true`.
pub fn nbodies<T: Scalar, I: IndexInt, const M: usize>(list: &PairList<T, I>) -> Result<NBodyIterator<'_, T, I, M>> {
    if M == 0 {
        return Err(Error::InvalidArity("n-body order must be at least 2 (M = N-1 >= 1)"));
    }
    if !list.is_sorted() {
        return Err(Error::InvalidArity("nbodies requires a PairList built with sorted = true"));
    }

    let num_sites = list.num_sites();
    let mut iter = NBodyIterator { list, site: 0, num_sites, combos: None };
    if num_sites > 0 {
        iter.combos = iter.combos_for(0);
        if iter.combos.is_none() {
            // `advance_to_next_site` increments before checking, so
            // this resumes the search from site 1.
            iter.advance_to_next_site();
        }
    }
    Ok(iter)
}
