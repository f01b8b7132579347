pub mod vec3d;

pub use self::vec3d::Vec3;

/// A 3x3 matrix stored as rows. Row `k` is lattice vector `a_{k+1}`.
pub type Mat3<T> = [[T; 3]; 3];
