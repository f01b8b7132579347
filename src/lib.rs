//! Cell-linked-list pair construction and symmetric n-body site
//! assembly for particle simulations, generic over a floating-point
//! scalar and a signed index type.
//!
//! The pipeline: positions + a (possibly triclinic, possibly
//! periodic) cell go into [`build_pairlist`], producing a [`PairList`];
//! that list is iterated directly ([`PairList::pair_iter`],
//! [`PairList::sites_iter`]) or combined into higher-order tuples
//! ([`nbody::nbodies`]), and reduced into per-site outputs through the
//! kernels in [`assembly`].

pub mod assembly;
pub mod binner;
pub mod cell;
pub mod config;
pub mod error;
pub mod geom;
pub mod nbody;
pub mod num;
pub mod pairlist;
pub mod reduce;

pub use crate::error::{Error, FriendlyResult, Result};
pub use crate::geom::Vec3;
pub use crate::nbody::{nbodies, NBodyTuple};
pub use crate::num::{IndexInt, Scalar};
pub use crate::pairlist::{build_pairlist, PairList, PairRecord};
