//! Parameters of an extended protocol Bind message.

use std::os::raw::c_void;
use std::ptr::null_mut;

use bytes::Bytes;
use pgroute_plugin::{PrParameter, PrParameters};

use super::Error;

/// Bound parameters and their format codes.
///
/// Format codes are stored normalized: either none (all parameters are text)
/// or exactly one per parameter. Plugin descriptors are computed once, here,
/// so handing them to plugins doesn't allocate.
#[derive(Debug, Default)]
pub struct Bind {
    params: Vec<Option<Bytes>>,
    codes: Vec<i16>,
    ffi: Vec<PrParameter>,
}

// SAFETY: `ffi` only points into buffers owned by `params`,
// which are never mutated after construction.
unsafe impl Send for Bind {}
unsafe impl Sync for Bind {}

impl Bind {
    /// Create Bind from parameter values (`None` is NULL) and format codes.
    ///
    /// One format code applies to every parameter. Otherwise, there has to be
    /// no format codes at all or one for each parameter.
    pub fn new(params: Vec<Option<Bytes>>, codes: Vec<i16>) -> Result<Self, Error> {
        let codes = match codes.len() {
            0 => codes,
            1 => vec![codes[0]; params.len()],
            len if len == params.len() => codes,
            len => {
                return Err(Error::FormatCodes {
                    codes: len,
                    params: params.len(),
                })
            }
        };

        if let Some(code) = codes.iter().find(|code| !matches!(code, 0 | 1)) {
            return Err(Error::FormatCode(*code));
        }

        let mut ffi = Vec::with_capacity(params.len());
        for (index, param) in params.iter().enumerate() {
            ffi.push(match param {
                Some(value) => PrParameter {
                    len: parameter_len(index, value.len())?,
                    data: value.as_ptr() as *mut c_void,
                },
                None => PrParameter {
                    len: -1,
                    data: null_mut(),
                },
            });
        }

        Ok(Self { params, codes, ffi })
    }

    /// Text parameters.
    pub fn text<'a>(params: impl IntoIterator<Item = &'a str>) -> Result<Self, Error> {
        let params = params
            .into_iter()
            .map(|param| Some(Bytes::copy_from_slice(param.as_bytes())))
            .collect();

        Self::new(params, vec![])
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parameter value. `Some(None)` is a NULL.
    pub fn parameter(&self, index: usize) -> Option<Option<&[u8]>> {
        self.params.get(index).map(|param| param.as_deref())
    }

    /// Normalized format codes.
    pub fn format_codes(&self) -> &[i16] {
        &self.codes
    }

    /// Parameters as seen by plugins.
    ///
    /// The returned struct borrows from `self` and must not outlive it.
    pub fn ffi(&self) -> PrParameters {
        PrParameters {
            num_params: self.ffi.len() as u64,
            params: self.ffi.as_ptr() as *mut PrParameter,
            num_format_codes: self.codes.len() as u64,
            format_codes: self.codes.as_ptr() as *mut i16,
        }
    }
}

/// Parameter length as sent to plugins. `-1` is reserved for NULL.
fn parameter_len(index: usize, len: usize) -> Result<i32, Error> {
    i32::try_from(len).map_err(|_| Error::ParameterTooLarge(index + 1))
}

impl Clone for Bind {
    fn clone(&self) -> Self {
        // Descriptors must point into the clone's own buffers.
        let mut ffi = self.ffi.clone();
        let params = self.params.clone();
        for (descriptor, param) in ffi.iter_mut().zip(params.iter()) {
            if let Some(value) = param {
                descriptor.data = value.as_ptr() as *mut c_void;
            }
        }

        Self {
            params,
            codes: self.codes.clone(),
            ffi,
        }
    }
}

#[cfg(test)]
mod test {
    use pgroute_plugin::parameters::{ParameterFormat, ParameterValue, Parameters};

    use super::*;

    fn params() -> Vec<Option<Bytes>> {
        vec![
            Some(Bytes::from_static(b"42")),
            None,
            Some(Bytes::from_static(b"hello")),
        ]
    }

    #[test]
    fn test_format_codes() {
        let bind = Bind::new(params(), vec![]).unwrap();
        assert!(bind.format_codes().is_empty());

        let bind = Bind::new(params(), vec![1]).unwrap();
        assert_eq!(bind.format_codes(), &[1, 1, 1]);

        let bind = Bind::new(params(), vec![0, 1, 0]).unwrap();
        assert_eq!(bind.format_codes(), &[0, 1, 0]);

        assert!(matches!(
            Bind::new(params(), vec![0, 1]),
            Err(Error::FormatCodes {
                codes: 2,
                params: 3
            })
        ));
        assert!(matches!(
            Bind::new(params(), vec![3]),
            Err(Error::FormatCode(3))
        ));
    }

    #[test]
    fn test_ffi() {
        let bind = Bind::new(params(), vec![]).unwrap();
        let ffi = bind.ffi();
        assert_eq!(ffi.num_params, 3);
        assert_eq!(ffi.num_format_codes, 0);

        let params = unsafe { Parameters::from_ffi(&ffi) };
        assert_eq!(params.len(), 3);
        assert_eq!(
            params.get(0).unwrap().decode(params.parameter_format(0)),
            Some(ParameterValue::Text("42"))
        );
        assert!(params.get(1).unwrap().null());
        assert_eq!(params.get(2).unwrap().data, b"hello");
    }

    #[test]
    fn test_no_format_codes_means_text() {
        let implicit = Bind::new(params(), vec![]).unwrap();
        let explicit = Bind::new(params(), vec![0, 0, 0]).unwrap();

        let (implicit, explicit) = (implicit.ffi(), explicit.ffi());
        let implicit = unsafe { Parameters::from_ffi(&implicit) };
        let explicit = unsafe { Parameters::from_ffi(&explicit) };

        for index in 0..3 {
            assert_eq!(implicit.parameter_format(index), ParameterFormat::Text);
            assert_eq!(
                implicit.parameter_format(index),
                explicit.parameter_format(index)
            );
            assert_eq!(implicit.get(index), explicit.get(index));
        }
    }

    #[test]
    fn test_parameter_too_large() {
        assert_eq!(parameter_len(0, 5).unwrap(), 5);
        assert_eq!(parameter_len(0, i32::MAX as usize).unwrap(), i32::MAX);
        assert!(matches!(
            parameter_len(2, i32::MAX as usize + 1),
            Err(Error::ParameterTooLarge(3))
        ));

        let bind = Bind::text(["1", "", "3"]).unwrap();
        assert_eq!(bind.len(), 3);
        assert_eq!(bind.parameter(1), Some(Some(&b""[..])));
    }

    #[test]
    fn test_clone() {
        let bind = Bind::text(["1", "2"]).unwrap();
        let clone = bind.clone();
        drop(bind);

        let ffi = clone.ffi();
        let params = unsafe { Parameters::from_ffi(&ffi) };
        assert_eq!(params.get(1).unwrap().data, b"2");
        assert_eq!(clone.parameter(0), Some(Some(&b"1"[..])));
    }
}
