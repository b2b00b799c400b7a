//! Wrapper around Rust's [`str`], a UTF-8 encoded slice.
//!
//! This is used to pass strings back and forth between the plugin and
//! the host, without allocating memory as required by [`std::ffi::CString`].
//! The string is borrowed: it's valid only as long as the memory it points to
//! and it's never freed by the receiver.
//!
//! ### Example
//!
//! ```
//! use pgroute_plugin::PrStr;
//! use std::ops::Deref;
//!
//! let string = PrStr::from("hello world");
//! assert_eq!(string.deref(), "hello world");
//!
//! let string = string.to_string(); // Owned version.
//! ```
//!
use crate::bindings::PrStr;
use std::{
    borrow::Cow,
    ops::Deref,
    os::raw::c_void,
    slice::from_raw_parts,
    str::{from_utf8, from_utf8_unchecked, Utf8Error},
};

impl From<&str> for PrStr {
    fn from(value: &str) -> Self {
        PrStr {
            data: value.as_ptr() as *mut c_void,
            len: value.len(),
        }
    }
}

impl From<&String> for PrStr {
    fn from(value: &String) -> Self {
        PrStr {
            data: value.as_ptr() as *mut c_void,
            len: value.len(),
        }
    }
}

impl PrStr {
    /// Raw bytes, bounded by `len`. An empty string
    /// never dereferences its pointer, which may be null.
    pub fn as_bytes(&self) -> &[u8] {
        if self.len == 0 || self.data.is_null() {
            &[]
        } else {
            unsafe { from_raw_parts::<u8>(self.data as *const u8, self.len) }
        }
    }

    /// Checked conversion to [`str`].
    ///
    /// Plugins written in other languages only promise `(len, bytes)`.
    /// Use this, or [`PrStr::to_string_lossy`], for strings they return.
    pub fn to_str(&self) -> Result<&str, Utf8Error> {
        from_utf8(self.as_bytes())
    }

    /// Convert to [`str`], replacing invalid UTF-8 with `U+FFFD`.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }
}

impl Deref for PrStr {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        // SAFETY: Only for strings created from `&str` in Rust.
        // Strings returned by foreign plugins go through `to_str`.
        unsafe { from_utf8_unchecked(self.as_bytes()) }
    }
}

impl PartialEq for PrStr {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Default for PrStr {
    fn default() -> Self {
        Self {
            len: 0,
            data: "".as_ptr() as *mut c_void,
        }
    }
}
