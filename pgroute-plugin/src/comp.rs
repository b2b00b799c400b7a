//! Compatibility checks.

use crate::{abi::AbiRevision, PrStr};

/// Rust compiler version used to build this library.
pub fn rustc_version() -> PrStr {
    env!("RUSTC_VERSION").into()
}

/// ABI revision of the router context this library was built with.
pub fn abi_revision() -> u32 {
    AbiRevision::CURRENT.into()
}
