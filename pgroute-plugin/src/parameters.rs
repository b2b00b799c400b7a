//! Prepared statement parameters.
//!
//! Parameters are borrowed from the host. They are only valid while
//! the plugin's route function is running.
//!
//! # Example
//!
//! ```
//! use pgroute_plugin::prelude::*;
//!
//! let params = Parameters::default();
//! assert_eq!(ParameterFormat::Text, params.parameter_format(0));
//!
//! if let Some(param) = params.get(0) {
//!     let value = param.decode(params.parameter_format(0));
//! }
//! ```
use std::{ptr::null_mut, slice::from_raw_parts, str::from_utf8};

use crate::{PrParameter, PrParameters};

/// Parameter format code. 0 is text encoding (usually UTF-8), 1 is binary encoding,
/// specific to the parameter data type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ParameterFormat {
    /// Text encoding.
    #[default]
    Text,

    /// Binary encoding.
    Binary,
}

impl From<ParameterFormat> for i16 {
    fn from(value: ParameterFormat) -> Self {
        match value {
            ParameterFormat::Text => 0,
            ParameterFormat::Binary => 1,
        }
    }
}

impl TryFrom<i16> for ParameterFormat {
    type Error = i16;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ParameterFormat::Text),
            1 => Ok(ParameterFormat::Binary),
            other => Err(other),
        }
    }
}

/// Wrapper around a decoded parameter.
///
/// # Example
///
/// ```
/// # use pgroute_plugin::prelude::*;
/// let parameter = ParameterValue::Text("test");
/// match parameter {
///     ParameterValue::Text(text) => assert_eq!(text, "test"),
///     ParameterValue::Binary(binary) => println!("{:?}", binary),
/// }
/// ```
#[derive(Debug, PartialEq, Eq)]
pub enum ParameterValue<'a> {
    /// Parameter is encoded using text (UTF-8).
    Text(&'a str),
    /// Parameter is encoded using binary encoding.
    Binary(&'a [u8]),
}

/// Prepared statement bound parameter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Parameter<'a> {
    /// Parameter data length, `-1` for `NULL`.
    pub len: i32,
    /// Parameter data.
    ///
    /// Use [`Self::decode`] to read this value.
    pub data: &'a [u8],
}

impl<'a> Parameter<'a> {
    /// Decode parameter given the provided format. If the parameter is encoded using text encoding (default),
    /// a UTF-8 string is returned. If encoded using binary encoding, a slice of bytes.
    ///
    /// If the parameter is `NULL` or the encoding doesn't match the data, `None` is returned.
    ///
    /// # Example
    ///
    /// ```
    /// use pgroute_plugin::prelude::*;
    ///
    /// let parameter = Parameter {
    ///     len: -1,
    ///     data: &[],
    /// };
    /// assert!(parameter.decode(ParameterFormat::Text).is_none());
    ///
    /// let parameter = Parameter {
    ///     len: 5,
    ///     data: b"hello",
    /// };
    /// assert_eq!(parameter.decode(ParameterFormat::Text), Some(ParameterValue::Text("hello")));
    /// ```
    ///
    pub fn decode(&self, format: ParameterFormat) -> Option<ParameterValue<'a>> {
        if self.null() {
            return None;
        }
        match format {
            ParameterFormat::Binary => Some(ParameterValue::Binary(self.data)),
            ParameterFormat::Text => from_utf8(self.data).ok().map(ParameterValue::Text),
        }
    }

    /// Returns true if the parameter is `NULL`.
    pub fn null(&self) -> bool {
        self.len == -1
    }

    fn from_ffi(value: &PrParameter) -> Self {
        let data: &'a [u8] = if value.len <= 0 || value.data.is_null() {
            &[]
        } else {
            // SAFETY: The host guarantees `len` bytes behind `data` for the duration of the call.
            unsafe { from_raw_parts(value.data as *const u8, value.len as usize) }
        };

        Self {
            len: value.len,
            data,
        }
    }
}

/// Prepared statement parameters.
///
/// Borrowed from the host, nothing is copied.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Parameters<'a> {
    params: &'a [PrParameter],
    format_codes: &'a [i16],
}

impl PartialEq for PrParameter {
    fn eq(&self, other: &Self) -> bool {
        Parameter::from_ffi(self) == Parameter::from_ffi(other)
    }
}

impl Eq for PrParameter {}

impl<'a> Parameters<'a> {
    /// Borrow parameters passed in by the host.
    ///
    /// # Safety
    ///
    /// The pointers must be valid for `'a`. Inside a plugin, use [`crate::Context::parameters`].
    ///
    pub unsafe fn from_ffi(value: &PrParameters) -> Self {
        let params: &[PrParameter] = if value.num_params == 0 || value.params.is_null() {
            &[]
        } else {
            from_raw_parts(value.params, value.num_params as usize)
        };

        let format_codes: &[i16] = if value.num_format_codes == 0 || value.format_codes.is_null() {
            &[]
        } else {
            from_raw_parts(value.format_codes, value.num_format_codes as usize)
        };

        Self {
            params,
            format_codes,
        }
    }

    /// Number of bound parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// No parameters. Always the case for the simple protocol.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Get parameter by position, starting at 0 for `$1`.
    pub fn get(&self, index: usize) -> Option<Parameter<'a>> {
        self.params.get(index).map(Parameter::from_ffi)
    }

    /// Iterate over all parameters, in order.
    pub fn iter(&self) -> impl Iterator<Item = Parameter<'a>> + 'a {
        self.params.iter().map(Parameter::from_ffi)
    }

    /// Returns a list of parameter format codes, as sent by the client.
    pub fn format_codes(&self) -> &'a [i16] {
        self.format_codes
    }

    /// Get a parameter format code indicating the encoding used.
    ///
    /// No format codes means everything is text. Unknown format codes
    /// are treated as text as well.
    pub fn parameter_format(&self, param: usize) -> ParameterFormat {
        let code = match self.format_codes.len() {
            0 => return ParameterFormat::Text,
            1 => self.format_codes[0],
            _ => match self.format_codes.get(param) {
                Some(code) => *code,
                None => return ParameterFormat::Text,
            },
        };

        ParameterFormat::try_from(code).unwrap_or_default()
    }
}

impl Default for PrParameters {
    fn default() -> Self {
        Self {
            num_params: 0,
            params: null_mut(),
            num_format_codes: 0,
            format_codes: null_mut(),
        }
    }
}
