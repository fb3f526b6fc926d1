use crate::GroupId;

/// Result alias used throughout `ranktune`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by generation, re-ranking, and metric computation.
///
/// Every operation in this crate is pure given its seed, so an error never leaves
/// partial state behind. Callers should fail fast.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A scalar parameter or distribution is outside its domain
    /// (e.g. `phi` not in `[0, 1]`, proportions not summing to 1).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Two parallel inputs disagree in length.
    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An item id appeared more than once where uniqueness is required.
    #[error("duplicate item: {0}")]
    DuplicateItem(String),

    /// A ranked item has no group membership.
    #[error("item has no group membership: {0}")]
    UnknownItem(String),

    /// A re-ranking target cannot be met within the requested number of slots.
    #[error("infeasible target distribution: {0}")]
    InfeasibleDistribution(String),

    /// A group with zero members was referenced by a non-zero share, or would be
    /// divided by in a per-group average.
    #[error("group {0} has no members")]
    DegenerateGroup(GroupId),
}

pub(crate) fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidParameter(msg.into())
}

pub(crate) fn ensure_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(Error::ShapeMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_informative() {
        let e = Error::ShapeMismatch {
            what: "group_ids",
            expected: 3,
            actual: 2,
        };
        assert_eq!(
            e.to_string(),
            "shape mismatch for group_ids: expected 3, got 2"
        );
        assert_eq!(Error::DegenerateGroup(4).to_string(), "group 4 has no members");
    }

    #[test]
    fn ensure_len_accepts_equal() {
        assert!(ensure_len("x", 2, 2).is_ok());
        assert!(matches!(
            ensure_len("x", 2, 1),
            Err(Error::ShapeMismatch { expected: 2, actual: 1, .. })
        ));
    }
}
