//! Sorts particles into a cell-linked-list: one singly-linked chain of
//! particle indices per bin, threaded through a flat `next` array.

use crate::cell::CellGeometry;
use crate::error::{Error, Result};
use crate::geom::Vec3;
use crate::num::{index_from_usize, usize_from_index, IndexInt, Scalar};

/// `seed[c]` / `next[i]` linked-list bins, per §4.2.
///
/// Traversing `seed[c] -> next[...] -> ... -> sentinel` visits every
/// particle placed in bin `c` exactly once, in input order.
#[derive(Debug, Clone)]
pub struct LinkedBins<I> {
    seed: Vec<I>,
    next: Vec<I>,
    sentinel: I,
}

impl<I: IndexInt> LinkedBins<I> {
    pub fn build<T: Scalar>(positions: &[Vec3<T>], geom: &CellGeometry<T>) -> Result<Self> {
        let total_bins = geom.total_bins();
        let max_i = I::max_value().to_i128().expect("IndexInt must convert to i128");

        if total_bins > max_i || positions.len() as i128 > max_i {
            let n = geom.bins();
            return Err(Error::BinGridTooLarge { n1: n[0], n2: n[1], n3: n[2] });
        }

        let sentinel = I::from(-1).expect("IndexInt must represent -1");
        let mut seed = vec![sentinel; total_bins as usize];
        let mut last = vec![sentinel; total_bins as usize];
        let mut next = vec![sentinel; positions.len()];

        for (idx, pos) in positions.iter().enumerate() {
            let i = index_from_usize::<I>(idx);
            let ci0 = geom.bin_of(pos);
            let ci = geom.wrap_or_trunc(ci0);
            let c = geom.flatten(ci) as usize;

            if seed[c] == sentinel {
                seed[c] = i;
            } else {
                let last_idx = usize_from_index::<I>(last[c]);
                next[last_idx] = i;
            }
            last[c] = i;
        }

        Ok(LinkedBins { seed, next, sentinel })
    }

    /// Iterate the particle indices placed in flat bin `c`.
    pub fn bin(&self, c: usize) -> BinIter<'_, I> {
        BinIter { next: &self.next, sentinel: self.sentinel, cur: self.seed[c] }
    }

    pub fn num_bins(&self) -> usize {
        self.seed.len()
    }
}

/// Iterator over the particle indices in a single bin.
pub struct BinIter<'a, I> {
    next: &'a [I],
    sentinel: I,
    cur: I,
}

impl<'a, I: IndexInt> Iterator for BinIter<'a, I> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.cur == self.sentinel {
            return None;
        }
        let idx = usize_from_index::<I>(self.cur);
        self.cur = self.next[idx];
        Some(idx)
    }
}
