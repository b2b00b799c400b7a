//! `#[repr(C)]` types generated from `include/types.h` by `bindgen`.
//!
//! Layout is asserted again at compile time for 64-bit targets.
#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(dead_code)]

include!(concat!(env!("OUT_DIR"), "/bindings.rs"));

#[cfg(target_pointer_width = "64")]
const _: () = {
    use std::mem::{align_of, offset_of, size_of};

    assert!(size_of::<PrStr>() == 16);
    assert!(offset_of!(PrStr, data) == 8);

    assert!(size_of::<PrStatement>() == 24);
    assert!(offset_of!(PrStatement, len) == 8);
    assert!(offset_of!(PrStatement, data) == 16);

    assert!(size_of::<PrParameter>() == 16);
    assert!(offset_of!(PrParameter, data) == 8);

    assert!(size_of::<PrParameters>() == 32);
    assert!(offset_of!(PrParameters, params) == 8);
    assert!(offset_of!(PrParameters, num_format_codes) == 16);
    assert!(offset_of!(PrParameters, format_codes) == 24);

    assert!(size_of::<PrRouterContext>() == 72);
    assert!(align_of::<PrRouterContext>() == 8);
    assert!(offset_of!(PrRouterContext, has_replicas) == 8);
    assert!(offset_of!(PrRouterContext, has_primary) == 9);
    assert!(offset_of!(PrRouterContext, in_transaction) == 10);
    assert!(offset_of!(PrRouterContext, write_override) == 11);
    assert!(offset_of!(PrRouterContext, query) == 16);
    assert!(offset_of!(PrRouterContext, params) == 40);

    assert!(size_of::<PrRoute>() == 16);
    assert!(offset_of!(PrRoute, read_write) == 8);
};

#[cfg(test)]
mod test {
    use std::ptr::null_mut;

    use super::*;
    use crate::abi::AbiRevision;

    #[test]
    fn test_header_types() {
        let route = PrRoute {
            shard: -2_i64,
            read_write: 2_u8,
        };
        assert_eq!(route, PrRoute::default());

        let null = PrParameter {
            len: -1_i32,
            data: null_mut(),
        };
        assert_eq!(null.len, -1);

        let statement = PrStatement {
            version: -1_i32,
            len: 0_u64,
            data: null_mut(),
        };
        assert_eq!(statement.version, -1);

        let revision: u32 = PGROUTE_ABI_REVISION;
        assert_eq!(revision, u32::from(AbiRevision::CURRENT));
    }
}
