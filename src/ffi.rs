//! String marshaling helpers for native calls.

use crate::error::{MmError, MmResult};
use mmdevice_sys::MAX_STR_LENGTH;
use std::ffi::{c_char, c_uint, CString};

/// Zeroed output buffer of `MAX_STR_LENGTH` bytes for native string getters.
pub(crate) struct StrBuffer(Vec<c_char>);

impl StrBuffer {
    pub fn new() -> Self {
        Self(vec![0; MAX_STR_LENGTH])
    }

    pub fn as_mut_ptr(&mut self) -> *mut c_char {
        self.0.as_mut_ptr()
    }

    pub fn len(&self) -> c_uint {
        self.0.len() as c_uint
    }

    /// Contents up to the first NUL (or the whole buffer if the module did not
    /// terminate it), decoded lossily.
    pub fn into_string(self) -> String {
        let bytes: Vec<u8> = self
            .0
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// Convert a caller string for a native call.
pub(crate) fn to_cstring(value: &str) -> MmResult<CString> {
    CString::new(value)
        .map_err(|_| MmError::InvalidArgument(format!("'{value}' contains a NUL byte")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unterminated_buffer_uses_full_length() {
        let mut buf = StrBuffer::new();
        for b in buf.0.iter_mut() {
            *b = b'a' as c_char;
        }
        assert_eq!(buf.into_string().len(), MAX_STR_LENGTH);
    }

    #[test]
    fn interior_nul_is_rejected() {
        assert!(matches!(
            to_cstring("a\0b"),
            Err(MmError::InvalidArgument(_))
        ));
    }
}
