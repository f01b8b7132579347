//! Error type for this crate.
//!
//! Matches the crate's historical style: a plain enum with a
//! human-readable description for each variant, rather than a
//! `thiserror` derive, so `Error::to_string()` reads as a single
//! actionable sentence naming the failing invariant.

use std::fmt;

/// Error type enum for this crate.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The determinant of the cell matrix is smaller in magnitude than
    /// `1e-12`: the cell is degenerate and has no well-defined volume.
    ZeroVolume,

    /// The bin grid `n1 * n2 * n3` does not fit in the chosen index
    /// type `I`. Carries the offending product so the message can
    /// suggest a fix.
    BinGridTooLarge { n1: i64, n2: i64, n3: i64 },

    /// `cutoff <= 0`.
    InvalidCutoff,

    /// An n-body order `< 2` was requested, or `N >= 3` was requested
    /// against a [`crate::pairlist::PairList`] that wasn't built with
    /// `sorted = true`.
    InvalidArity(&'static str),

    /// A buffer of the required size could not be allocated.
    AllocationFailure,
}

impl Error {
    fn description(&self) -> String {
        match self {
            Error::ZeroVolume => "cell matrix is degenerate: |det(cell)| is below 1e-12".to_string(),
            Error::BinGridTooLarge { n1, n2, n3 } => format!(
                "bin grid {}x{}x{} ({} cells) does not fit the chosen index type; \
                 use a wider integer type, a larger cutoff, or a smaller cell",
                n1,
                n2,
                n3,
                (*n1 as i128) * (*n2 as i128) * (*n3 as i128)
            ),
            Error::InvalidCutoff => "cutoff must be strictly positive".to_string(),
            Error::InvalidArity(why) => format!("invalid n-body order: {}", why),
            Error::AllocationFailure => "could not allocate an output buffer of the required size".to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl std::error::Error for Error {}

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Convenience extension for interactive callers (tests, benches, small
/// driver programs): print the error before panicking, rather than the
/// bare `Debug` output `.unwrap()` gives.
pub trait FriendlyResult {
    type Value;

    fn unwrap_nicely(self) -> Self::Value;
}

impl<T> FriendlyResult for Result<T> {
    type Value = T;

    fn unwrap_nicely(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => {
                eprintln!("-----------------------");
                eprintln!("{}", e);
                eprintln!("-----------------------");
                panic!("{}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_grid_too_large_message_mentions_remediation() {
        let e = Error::BinGridTooLarge { n1: 1000, n2: 1000, n3: 1000 };
        let msg = e.to_string();
        assert!(msg.contains("wider integer type"));
        assert!(msg.contains("1000000000"));
    }

    #[test]
    fn zero_volume_message_names_the_invariant() {
        assert!(Error::ZeroVolume.to_string().contains("1e-12"));
    }
}
