//! Value types that have no direct Rust primitive counterpart.

use std::collections::BTreeMap;
use std::fmt;

/// Character-sequence text.
///
/// Travels separately from [`String`] so a receiver can tell the two apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CharSeq(pub String);

impl CharSeq {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CharSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CharSeq {
    fn from(text: &str) -> Self {
        Self(text.to_owned())
    }
}

impl From<String> for CharSeq {
    fn from(text: String) -> Self {
        Self(text)
    }
}

/// Opaque capability token referring to an object owned by some other party.
///
/// Requires platform level 18 when carried by a cross-process envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub u64);

impl Handle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Integer width and height. Platform level 21.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Floating width and height. Platform level 21.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SizeF {
    pub width: f32,
    pub height: f32,
}

impl SizeF {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Integer-keyed sparse mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMap<T> {
    entries: BTreeMap<i32, T>,
}

impl<T> SparseMap<T> {
    pub fn new() -> Self {
        Self { entries: BTreeMap::new() }
    }

    pub fn insert(&mut self, key: i32, value: T) -> Option<T> {
        self.entries.insert(key, value)
    }

    pub fn get(&self, key: i32) -> Option<&T> {
        self.entries.get(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &T)> {
        self.entries.iter().map(|(key, value)| (*key, value))
    }
}

impl<T> Default for SparseMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<(i32, T)> for SparseMap<T> {
    fn from_iter<I: IntoIterator<Item = (i32, T)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}
