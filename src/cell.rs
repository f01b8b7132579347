//! Derived, immutable view of a simulation cell: inverse matrix, face
//! distances, bin counts and the bin-relative machinery the builder
//! needs to place particles and walk neighbour shells.

use crate::error::{Error, Result};
use crate::geom::{Mat3, Vec3};
use crate::num::Scalar;

const EPS_VOLUME: f64 = 1e-12;

fn det3<T: Scalar>(m: &Mat3<T>) -> T {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

fn inverse3<T: Scalar>(m: &Mat3<T>, det: T) -> Mat3<T> {
    let inv_det = T::one() / det;

    let c00 = m[1][1] * m[2][2] - m[1][2] * m[2][1];
    let c01 = -(m[1][0] * m[2][2] - m[1][2] * m[2][0]);
    let c02 = m[1][0] * m[2][1] - m[1][1] * m[2][0];
    let c10 = -(m[0][1] * m[2][2] - m[0][2] * m[2][1]);
    let c11 = m[0][0] * m[2][2] - m[0][2] * m[2][0];
    let c12 = -(m[0][0] * m[2][1] - m[0][1] * m[2][0]);
    let c20 = m[0][1] * m[1][2] - m[0][2] * m[1][1];
    let c21 = -(m[0][0] * m[1][2] - m[0][2] * m[1][0]);
    let c22 = m[0][0] * m[1][1] - m[0][1] * m[1][0];

    [
        [c00 * inv_det, c10 * inv_det, c20 * inv_det],
        [c01 * inv_det, c11 * inv_det, c21 * inv_det],
        [c02 * inv_det, c12 * inv_det, c22 * inv_det],
    ]
}

fn row<T: Scalar>(m: &Mat3<T>, i: usize) -> Vec3<T> {
    Vec3::new(m[i][0], m[i][1], m[i][2])
}

/// Immutable, derived view of a (possibly triclinic) simulation cell
/// and its periodicity, specialised to a cutoff.
///
/// Rows of `cell` are the lattice vectors a1, a2, a3. Bin indices used
/// internally are 1-based in `[1, n_k]`; the flattened bin index
/// handed to [`crate::binner::Binner`] is 0-based.
#[derive(Debug, Clone)]
pub struct CellGeometry<T> {
    cell: Mat3<T>,
    inv_cell: Mat3<T>,
    pbc: [bool; 3],
    cutoff: T,
    /// Number of bins along each axis.
    n: [i64; 3],
    /// Neighbour-shell half-width (in bins) along each axis.
    shell: [i64; 3],
    /// Columns are `a_k / n_k`: maps an integer offset `(x, y, z)` to
    /// the cartesian shift between the corresponding bins.
    bin_shape: Mat3<T>,
}

impl<T: Scalar> CellGeometry<T> {
    pub fn new(cell: Mat3<T>, pbc: [bool; 3], cutoff: T) -> Result<Self> {
        if cutoff <= T::zero() {
            return Err(Error::InvalidCutoff);
        }

        let det = det3(&cell);
        let eps = T::from(EPS_VOLUME).unwrap();
        if det.abs() < eps {
            return Err(Error::ZeroVolume);
        }
        let inv_cell = inverse3(&cell, det);
        let volume = det.abs();

        let a1 = row(&cell, 0);
        let a2 = row(&cell, 1);
        let a3 = row(&cell, 2);

        // len_k = |V| / |cross(a_a, a_b)| cycling (1,2,3)
        let face_distances = [
            volume / a2.cross(&a3).norm(),
            volume / a3.cross(&a1).norm(),
            volume / a1.cross(&a2).norm(),
        ];

        let mut n = [0i64; 3];
        let mut shell = [0i64; 3];
        for k in 0..3 {
            let len_k = face_distances[k];
            let n_k_f = (len_k / cutoff).floor();
            let n_k = n_k_f.to_i64().unwrap_or(1).max(1);
            n[k] = n_k;
            let m_k_f = (cutoff * T::from(n_k).unwrap() / len_k).ceil();
            shell[k] = m_k_f.to_i64().unwrap_or(1).max(1);
        }

        let rows = [a1, a2, a3];
        let bin_shape = [
            (rows[0] / T::from(n[0]).unwrap()).as_array(),
            (rows[1] / T::from(n[1]).unwrap()).as_array(),
            (rows[2] / T::from(n[2]).unwrap()).as_array(),
        ];

        Ok(CellGeometry {
            cell,
            inv_cell,
            pbc,
            cutoff,
            n,
            shell,
            bin_shape,
        })
    }

    pub fn cell(&self) -> &Mat3<T> {
        &self.cell
    }

    pub fn pbc(&self) -> [bool; 3] {
        self.pbc
    }

    pub fn cutoff(&self) -> T {
        self.cutoff
    }

    pub fn bins(&self) -> [i64; 3] {
        self.n
    }

    pub fn shell(&self) -> [i64; 3] {
        self.shell
    }

    pub fn total_bins(&self) -> i128 {
        self.n[0] as i128 * self.n[1] as i128 * self.n[2] as i128
    }

    /// World position -> fractional coordinates, `y = x . C^-1`.
    fn fractional(&self, x: &Vec3<T>) -> Vec3<T> {
        let ic = &self.inv_cell;
        Vec3::new(
            x.x * ic[0][0] + x.y * ic[1][0] + x.z * ic[2][0],
            x.x * ic[0][1] + x.y * ic[1][1] + x.z * ic[2][1],
            x.x * ic[0][2] + x.y * ic[1][2] + x.z * ic[2][2],
        )
    }

    /// Unwrapped, 1-based bin coordinate of a world position. May fall
    /// outside `[1, n_k]` for positions outside the primary cell.
    pub fn bin_of(&self, x: &Vec3<T>) -> [i64; 3] {
        let y = self.fractional(x);
        let n = self.n;
        [
            (y.x * T::from(n[0]).unwrap()).floor().to_i64().unwrap_or(0) + 1,
            (y.y * T::from(n[1]).unwrap()).floor().to_i64().unwrap_or(0) + 1,
            (y.z * T::from(n[2]).unwrap()).floor().to_i64().unwrap_or(0) + 1,
        ]
    }

    /// Apply the per-axis wrap-or-trunc policy: wrap modulo `n_k` when
    /// periodic, clamp to `[1, n_k]` otherwise.
    pub fn wrap_or_trunc(&self, c: [i64; 3]) -> [i64; 3] {
        let mut out = [0i64; 3];
        for k in 0..3 {
            let n_k = self.n[k];
            out[k] = if self.pbc[k] {
                (c[k] - 1).rem_euclid(n_k) + 1
            } else {
                c[k].clamp(1, n_k)
            };
        }
        out
    }

    /// Apply the wrap-or-reject policy used for neighbour-shell
    /// candidate bins: wrap modulo `n_k` when periodic, otherwise
    /// `None` if the candidate falls outside `[1, n_k]`.
    pub fn wrap_or_reject(&self, c: [i64; 3]) -> Option<[i64; 3]> {
        let mut out = [0i64; 3];
        for k in 0..3 {
            let n_k = self.n[k];
            out[k] = if self.pbc[k] {
                (c[k] - 1).rem_euclid(n_k) + 1
            } else if c[k] >= 1 && c[k] <= n_k {
                c[k]
            } else {
                return None;
            };
        }
        Some(out)
    }

    /// Flatten a 1-based bin coordinate to a 0-based bin index.
    pub fn flatten(&self, c: [i64; 3]) -> i64 {
        let n = self.n;
        (c[0] - 1) + n[0] * (c[1] - 1) + n[0] * n[1] * (c[2] - 1)
    }

    /// `B . (x, y, z)`: the cartesian shift between a bin and the bin
    /// offset by the integer triple `(x, y, z)`.
    pub fn shift_offset(&self, offset: [i64; 3]) -> Vec3<T> {
        let b0 = Vec3::from_array(self.bin_shape[0]);
        let b1 = Vec3::from_array(self.bin_shape[1]);
        let b2 = Vec3::from_array(self.bin_shape[2]);
        b0 * T::from(offset[0]).unwrap() + b1 * T::from(offset[1]).unwrap() + b2 * T::from(offset[2]).unwrap()
    }

    /// `B . (c - 1)`: the cartesian position of bin `c`'s lower-left corner.
    pub fn bin_corner(&self, c: [i64; 3]) -> Vec3<T> {
        self.shift_offset([c[0] - 1, c[1] - 1, c[2] - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cubic(d: f64) -> Mat3<f64> {
        [[d, 0.0, 0.0], [0.0, d, 0.0], [0.0, 0.0, d]]
    }

    #[test]
    fn zero_volume_is_rejected() {
        let cell = [[1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        let err = CellGeometry::new(cell, [true; 3], 0.5).unwrap_err();
        assert_eq!(err, Error::ZeroVolume);
    }

    #[test]
    fn non_positive_cutoff_is_rejected() {
        let err = CellGeometry::new(cubic(10.0), [true; 3], 0.0).unwrap_err();
        assert_eq!(err, Error::InvalidCutoff);
    }

    #[test]
    fn bin_of_is_always_in_range_for_wrap_or_trunc() {
        let geom = CellGeometry::new(cubic(10.0), [true, false, true], 1.5).unwrap();
        for x in [-15.0, -1.0, 0.0, 4.3, 9.9, 20.0] {
            let p = Vec3::new(x, x, x);
            let c0 = geom.bin_of(&p);
            let c = geom.wrap_or_trunc(c0);
            for k in 0..3 {
                assert!(c[k] >= 1 && c[k] <= geom.bins()[k], "axis {} out of range: {}", k, c[k]);
            }
        }
    }

    #[test]
    fn small_box_gets_a_single_bin_per_axis() {
        // cutoff larger than the cell: every axis collapses to one bin.
        let geom = CellGeometry::new(cubic(1.0), [true; 3], 5.0).unwrap();
        assert_eq!(geom.bins(), [1, 1, 1]);
    }
}
