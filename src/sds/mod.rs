//! A minimal dynamic, length-prefixed byte string, grounded in `sds.h`.
//!
//! The original picks one of five header widths (`sdshdr5`/`8`/`16`/`32`/
//! `64`) per string to keep the header itself small; a `Vec<u8>` already
//! gives us a length/capacity pair without the manual header-width
//! dispatch, so this module only carries forward the parts of the `sds`
//! API a hash table's keys and values actually need.

use std::fmt;
use std::ops::Deref;

/// An owned, growable byte string.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct SdsString(Vec<u8>);

impl SdsString {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self(Vec::with_capacity(cap))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.0.capacity()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Matches `sdslen`'s caller contract: returns `None` when the bytes
    /// aren't valid UTF-8 rather than panicking, since keys and values
    /// stored in a `dict` are not guaranteed to be text.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn push_str(&mut self, s: &str) {
        self.0.extend_from_slice(s.as_bytes());
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.0.extend_from_slice(bytes);
    }

    pub fn push_byte(&mut self, byte: u8) {
        self.0.push(byte);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// `sdsgrowzero`: extends the string with `n` trailing zero bytes.
    pub fn grow_zero(&mut self, n: usize) {
        self.0.resize(self.0.len() + n, 0);
    }
}

impl Deref for SdsString {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for SdsString {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for SdsString {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<&[u8]> for SdsString {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<Vec<u8>> for SdsString {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for SdsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => write!(f, "SdsString({:?})", s),
            None => write!(f, "SdsString({:?})", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_read_back() {
        let mut s = SdsString::from("hello");
        s.push_byte(b' ');
        s.push_str("world");
        assert_eq!(s.as_str(), Some("hello world"));
        assert_eq!(s.len(), 11);
    }

    #[test]
    fn non_utf8_is_not_a_str() {
        let s = SdsString::from(vec![0xff, 0xfe]);
        assert_eq!(s.as_str(), None);
        assert_eq!(s.as_bytes(), &[0xff, 0xfe]);
    }

    #[test]
    fn grow_zero_pads() {
        let mut s = SdsString::from("ab");
        s.grow_zero(3);
        assert_eq!(s.as_bytes(), &[b'a', b'b', 0, 0, 0]);
    }
}
