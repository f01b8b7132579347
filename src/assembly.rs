//! The four kernel shapes built on [`crate::reduce::ParallelReducer`]:
//! pair value/gradient and n-body value/gradient, each a single pass
//! over a pre-built, read-only [`PairList`].

use crate::error::Result;
use crate::geom::Vec3;
use crate::nbody::{nbodies, NBodyTuple};
use crate::num::{usize_from_index, IndexInt, Scalar};
use crate::pairlist::PairList;
use crate::reduce::ParallelReducer;

/// Pair symmetric (value) form: for every unordered pair `{i, j}`, add
/// `f(|r|, r_vec) / 2` to both `out[i]` and `out[j]`.
pub fn map_to_sites<T, I, F>(list: &PairList<T, I>, f: F, out: &mut [T])
where
    T: Scalar,
    I: IndexInt,
    F: Fn(T, Vec3<T>) -> T + Sync,
{
    let half = T::from(0.5).expect("0.5 must be representable");
    ParallelReducer::map_to_sites(out.len(), list.len(), out, move |k, buf| {
        let (i, j, r, dr, _) = list.record(k);
        let i = usize_from_index::<I>(i);
        let j = usize_from_index::<I>(j);
        if i < j {
            let v = f(r, dr) * half;
            buf[i].accumulate(v);
            buf[j].accumulate(v);
        }
    });
}

/// Pair antisymmetric (gradient) form: for every unordered pair
/// `{i, j}`, add `df(|r|, r_vec)` to `out[j]` and subtract it from
/// `out[i]`.
pub fn map_to_sites_d<T, I, F>(list: &PairList<T, I>, df: F, out: &mut [Vec3<T>])
where
    T: Scalar,
    I: IndexInt,
    F: Fn(T, Vec3<T>) -> Vec3<T> + Sync,
{
    ParallelReducer::map_to_sites(out.len(), list.len(), out, move |k, buf| {
        let (i, j, r, dr, _) = list.record(k);
        let i = usize_from_index::<I>(i);
        let j = usize_from_index::<I>(j);
        if i < j {
            let v = df(r, dr);
            buf[j].accumulate(v);
            buf[i].accumulate(-v);
        }
    });
}

/// N-body value form: for every canonical `(M+1)`-tuple rooted at `i`,
/// add `f(s) / (M+1)` to `out[i]` and to each neighbour's slot.
///
/// `s` is the canonical edge-length vector of length `L`; callers must
/// pass `L = M * (M + 1) / 2`.
pub fn map_to_sites_nbody<T, I, F, const M: usize, const L: usize>(
    list: &PairList<T, I>,
    f: F,
    out: &mut [T],
) -> Result<()>
where
    T: Scalar,
    I: IndexInt,
    F: Fn(&[T; L]) -> T + Sync,
{
    debug_assert_eq!(L, M * (M + 1) / 2, "L must equal M*(M+1)/2");
    let tuples: Vec<NBodyTuple<M>> = nbodies::<T, I, M>(list)?.collect();
    let divisor = T::from(M + 1).expect("arity must be representable");

    ParallelReducer::map_to_sites(out.len(), tuples.len(), out, move |k, buf| {
        let tuple = tuples[k];
        let mut edges = [T::zero(); L];
        tuple.edge_lengths(list, &mut edges);
        let value = f(&edges) / divisor;

        buf[tuple.i].accumulate(value);
        for m in 0..M {
            buf[tuple.neighbour(list, m)].accumulate(value);
        }
    });

    Ok(())
}

/// N-body gradient form: for every canonical `(M+1)`-tuple rooted at
/// `i`, compute `df(s)` (length `L`) and project each component onto
/// its edge's unit vector, adding to one endpoint and subtracting from
/// the other.
///
/// Edge order matches [`crate::nbody::NBodyTuple::edge_lengths`]: the
/// `M` edges from `i` to each neighbour, then the `M*(M-1)/2`
/// inter-neighbour edges in lexicographic order.
pub fn map_to_sites_nbody_d<T, I, F, const M: usize, const L: usize>(
    list: &PairList<T, I>,
    df: F,
    out: &mut [Vec3<T>],
) -> Result<()>
where
    T: Scalar,
    I: IndexInt,
    F: Fn(&[T; L]) -> [T; L] + Sync,
{
    debug_assert_eq!(L, M * (M + 1) / 2, "L must equal M*(M+1)/2");
    let tuples: Vec<NBodyTuple<M>> = nbodies::<T, I, M>(list)?.collect();

    ParallelReducer::map_to_sites(out.len(), tuples.len(), out, move |k, buf| {
        let tuple = tuples[k];
        let (_, r, dr) = list.site(tuple.i).expect("NBodyTuple requires a sorted PairList");

        let mut edges = [T::zero(); L];
        tuple.edge_lengths(list, &mut edges);
        let grads = df(&edges);

        for m in 0..M {
            let pos = tuple.positions[m];
            let unit = -dr[pos] / r[pos];
            let j = tuple.neighbour(list, m);
            buf[tuple.i].accumulate(unit * grads[m]);
            buf[j].accumulate(-(unit * grads[m]));
        }

        let mut idx = M;
        for a in 0..M {
            for b in (a + 1)..M {
                let edge = dr[tuple.positions[a]] - dr[tuple.positions[b]];
                let unit = edge / edge.norm();
                let ja = tuple.neighbour(list, a);
                let jb = tuple.neighbour(list, b);
                buf[ja].accumulate(unit * grads[idx]);
                buf[jb].accumulate(-(unit * grads[idx]));
                idx += 1;
            }
        }
    });

    Ok(())
}
