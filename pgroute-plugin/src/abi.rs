//! ABI revisions.
//!
//! The layout of [`PrRouterContext`](crate::PrRouterContext) is fixed at build time.
//! Plugins export the revision they were built against and the host refuses
//! to load anything but its own. There is no runtime negotiation.

use std::fmt::Display;

/// Known ABI revisions.
///
/// ### Example
///
/// ```
/// use pgroute_plugin::abi::AbiRevision;
///
/// let revision = AbiRevision::try_from(2).unwrap();
/// assert_eq!(revision, AbiRevision::CURRENT);
/// assert!(revision.has_parameters());
/// assert!(AbiRevision::try_from(3).is_err());
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AbiRevision {
    /// Router context without bound parameters.
    V1,
    /// Router context with [`PrParameters`](crate::PrParameters).
    V2,
}

impl AbiRevision {
    /// Revision this crate was built with.
    pub const CURRENT: AbiRevision = AbiRevision::V2;

    /// Does the router context include bound parameters?
    pub fn has_parameters(&self) -> bool {
        *self >= AbiRevision::V2
    }

    /// Host and plugin agree on the context layout.
    pub fn compatible(&self, other: AbiRevision) -> bool {
        *self == other
    }
}

impl From<AbiRevision> for u32 {
    fn from(value: AbiRevision) -> Self {
        match value {
            AbiRevision::V1 => 1,
            AbiRevision::V2 => 2,
        }
    }
}

impl TryFrom<u32> for AbiRevision {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AbiRevision::V1),
            2 => Ok(AbiRevision::V2),
            other => Err(other),
        }
    }
}

impl Display for AbiRevision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", u32::from(*self))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_revisions() {
        assert!(!AbiRevision::V1.has_parameters());
        assert!(AbiRevision::CURRENT.compatible(AbiRevision::V2));
        assert!(!AbiRevision::CURRENT.compatible(AbiRevision::V1));
        assert_eq!(AbiRevision::try_from(0), Err(0));
        assert_eq!(AbiRevision::V1.to_string(), "r1");
    }
}
