//! Deterministic thread-parallel reduction: split iteration units
//! across workers on interlaced ranges, privatise per-worker output
//! buffers, sum them back sequentially.
//!
//! Ordering between workers is unspecified, so kernels must be
//! commutative and associative; sequential mode (a single worker)
//! gives byte-identical results across runs, since it writes directly
//! into `out` with no intermediate summation.

use crate::config;
use crate::geom::Vec3;
use crate::num::Scalar;

/// A per-site accumulator: a scalar energy or a [`Vec3`] force.
pub trait Accumulator: Copy + Send {
    fn zero() -> Self;
    fn accumulate(&mut self, other: Self);
}

impl<T: Scalar> Accumulator for T {
    fn zero() -> Self {
        T::zero()
    }

    fn accumulate(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl<T: Scalar> Accumulator for Vec3<T> {
    fn zero() -> Self {
        Vec3::zero()
    }

    fn accumulate(&mut self, other: Self) {
        *self += other;
    }
}

/// Splits `num_units` iteration units (pair or n-tuple indices) across
/// workers and reduces their contributions into `out`.
pub struct ParallelReducer;

impl ParallelReducer {
    /// Run `kernel(unit, buf)` once for every `unit` in `0..num_units`,
    /// writing contributions into a buffer shaped like `out`, then fold
    /// all workers' buffers into `out`.
    ///
    /// `kernel` must be safe to call concurrently from multiple
    /// threads (it receives a private buffer per thread, never `out`
    /// itself) and its contributions must not depend on call order.
    pub fn map_to_sites<A: Accumulator>(
        num_sites: usize,
        num_units: usize,
        out: &mut [A],
        kernel: impl Fn(usize, &mut [A]) + Sync,
    ) {
        assert_eq!(out.len(), num_sites, "out buffer must be shaped like the site array");

        let hw = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        let threads = config::get_max_threads().min(hw).min(num_units.max(1)).max(1);

        if threads <= 1 {
            for unit in 0..num_units {
                kernel(unit, out);
            }
            return;
        }

        let mut buffers: Vec<Vec<A>> = (0..threads).map(|_| vec![A::zero(); num_sites]).collect();

        std::thread::scope(|scope| {
            let kernel = &kernel;
            let mut handles = Vec::with_capacity(threads);
            for (t, buf) in buffers.iter_mut().enumerate() {
                handles.push(scope.spawn(move || {
                    let mut unit = t;
                    while unit < num_units {
                        kernel(unit, buf);
                        unit += threads;
                    }
                }));
            }
            for h in handles {
                h.join().expect("reduction worker panicked");
            }
        });

        for buf in buffers {
            for (o, b) in out.iter_mut().zip(buf) {
                o.accumulate(b);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use more_asserts::assert_le;
    use proptest::prelude::*;

    #[test]
    fn sequential_mode_matches_direct_summation() {
        let _guard = config::test_guard::acquire();
        config::set_max_threads(Some(1));
        let mut out = vec![0.0f64; 4];
        ParallelReducer::map_to_sites(4, 10, &mut out, |unit, buf| {
            buf[unit % 4] += unit as f64;
        });
        let mut expected = vec![0.0f64; 4];
        for unit in 0..10 {
            expected[unit % 4] += unit as f64;
        }
        assert_eq!(out, expected);
        config::set_max_threads(None);
    }

    #[test]
    fn parallel_mode_agrees_with_sequential_mode_up_to_summation_order() {
        let _guard = config::test_guard::acquire();
        let num_units = 500;
        let contributions: Vec<f64> = (0..num_units).map(|u| ((u * 7919) % 101) as f64 * 0.5).collect();

        config::set_max_threads(Some(1));
        let mut sequential = vec![0.0f64; 8];
        ParallelReducer::map_to_sites(8, num_units, &mut sequential, |unit, buf| {
            buf[unit % 8] += contributions[unit];
        });

        config::set_max_threads(Some(6));
        let mut parallel = vec![0.0f64; 8];
        ParallelReducer::map_to_sites(8, num_units, &mut parallel, |unit, buf| {
            buf[unit % 8] += contributions[unit];
        });
        config::set_max_threads(None);

        for (a, b) in sequential.iter().zip(&parallel) {
            assert!((a - b).abs() < 1e-9, "{} vs {}", a, b);
        }
    }

    proptest! {
        /// Determinism: sequential mode is byte-identical across repeated runs
        /// for the same inputs.
        #[test]
        fn sequential_mode_is_deterministic_across_runs(
            contributions in proptest::collection::vec(-1e3f64..1e3, 1..200),
        ) {
            let _guard = config::test_guard::acquire();
            config::set_max_threads(Some(1));

            let run = |contributions: &[f64]| {
                let mut out = vec![0.0f64; 6];
                ParallelReducer::map_to_sites(6, contributions.len(), &mut out, |unit, buf| {
                    buf[unit % 6] += contributions[unit];
                });
                out
            };

            let first = run(&contributions);
            let second = run(&contributions);
            config::set_max_threads(None);

            prop_assert_eq!(first, second);
        }

        /// Thread invariance: parallel and sequential reductions agree to
        /// within rounding error on arbitrary inputs (scenario 5's kernel
        /// generalised to a plain per-unit contribution, since the site-wise
        /// `|r|^2` kernel is exercised end-to-end in `assembly`'s own
        /// property tests).
        #[test]
        fn parallel_and_sequential_agree_within_tolerance(
            contributions in proptest::collection::vec(-1e3f64..1e3, 1..500),
            num_sites in 1usize..9,
            threads in 2usize..9,
        ) {
            let _guard = config::test_guard::acquire();
            let num_sites = num_sites.min(contributions.len().max(1));

            config::set_max_threads(Some(1));
            let mut sequential = vec![0.0f64; num_sites];
            ParallelReducer::map_to_sites(num_sites, contributions.len(), &mut sequential, |unit, buf| {
                buf[unit % num_sites] += contributions[unit];
            });

            config::set_max_threads(Some(threads));
            let mut parallel = vec![0.0f64; num_sites];
            ParallelReducer::map_to_sites(num_sites, contributions.len(), &mut parallel, |unit, buf| {
                buf[unit % num_sites] += contributions[unit];
            });
            config::set_max_threads(None);

            for (a, b) in sequential.iter().zip(&parallel) {
                assert_le!((a - b).abs(), 1e-6);
            }
        }
    }
}
