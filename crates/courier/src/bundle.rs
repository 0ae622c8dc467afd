//! # Bundle
//!
//! A string-keyed container of [`Payload`] values with one typed accessor
//! pair per transportable category.
//!
//! Generated marshalling code writes each parameter under its own name and
//! reads it back with the matching accessor. A read against the wrong
//! category is an error rather than a silent conversion.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::payload::Payload;
use crate::record::Record;
use crate::record::RecordValue;
use crate::values::CharSeq;
use crate::values::Handle;
use crate::values::Size;
use crate::values::SizeF;
use crate::values::SparseMap;

/// Errors raised while reading from or writing into a bundle.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// No entry under the requested key.
    Missing(String),
    /// The entry exists but belongs to a different category.
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    /// A record was captured from a different record type.
    RecordMismatch { expected: &'static str, found: String },
    /// A serializable value could not be encoded or decoded.
    Serialization(String),
    /// Live arguments attached to a local envelope had an unexpected shape.
    ArgumentMismatch { expected: &'static str },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "Missing bundle entry '{}'", key),
            Self::TypeMismatch { key, expected, found } => {
                write!(f, "Entry '{}': expected {}, found {}", key, expected, found)
            }
            Self::RecordMismatch { expected, found } => {
                write!(f, "Record mismatch: expected {}, found {}", expected, found)
            }
            Self::Serialization(msg) => write!(f, "Serialization failed: {}", msg),
            Self::ArgumentMismatch { expected } => {
                write!(f, "Envelope arguments are not {}", expected)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

static EMPTY: Bundle = Bundle::new();

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bundle {
    entries: BTreeMap<String, Payload>,
}

impl Bundle {
    pub const fn new() -> Self {
        Self { entries: BTreeMap::new() }
    }

    /// Shared empty bundle, handed out for envelopes that carry no data.
    pub fn empty() -> &'static Bundle {
        &EMPTY
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Stores a payload, replacing any previous entry under the same key.
    pub fn insert(&mut self, key: impl Into<String>, payload: Payload) -> Option<Payload> {
        self.entries.insert(key.into(), payload)
    }

    pub fn get(&self, key: &str) -> Option<&Payload> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Payload> {
        self.entries.remove(key)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Payload> {
        self.entries.iter()
    }

    fn lookup(&self, key: &str) -> Result<&Payload> {
        self.entries.get(key).ok_or_else(|| Error::Missing(key.to_owned()))
    }
}

impl<'a> IntoIterator for &'a Bundle {
    type Item = (&'a String, &'a Payload);
    type IntoIter = btree_map::Iter<'a, String, Payload>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn mismatch(key: &str, expected: &'static str, found: &Payload) -> Error {
    Error::TypeMismatch {
        key: key.to_owned(),
        expected,
        found: found.label(),
    }
}

fn capture_all<R: Record>(values: &[R]) -> impl Iterator<Item = RecordValue> + '_ {
    values.iter().map(RecordValue::capture)
}

// ============================================================================
// Scalars and scalar arrays
// ============================================================================

/// Arguments passed to callback:
/// 1. put, get, put-array, get-array method names
/// 2. Rust type
/// 3. scalar and array `Payload` variants
/// 4. scalar and array labels
macro_rules! for_each_scalar {
    ($m:ident) => {
        $m!(put_byte,   get_byte,   put_byte_array,   get_byte_array,   i8,   Byte,   ByteArray,   "byte",   "byte array");
        $m!(put_short,  get_short,  put_short_array,  get_short_array,  i16,  Short,  ShortArray,  "short",  "short array");
        $m!(put_int,    get_int,    put_int_array,    get_int_array,    i32,  Int,    IntArray,    "int",    "int array");
        $m!(put_long,   get_long,   put_long_array,   get_long_array,   i64,  Long,   LongArray,   "long",   "long array");
        $m!(put_float,  get_float,  put_float_array,  get_float_array,  f32,  Float,  FloatArray,  "float",  "float array");
        $m!(put_double, get_double, put_double_array, get_double_array, f64,  Double, DoubleArray, "double", "double array");
        $m!(put_char,   get_char,   put_char_array,   get_char_array,   char, Char,   CharArray,   "char",   "char array");
        $m!(put_bool,   get_bool,   put_bool_array,   get_bool_array,   bool, Bool,   BoolArray,   "bool",   "bool array");
    };
}

macro_rules! scalar_accessors {
    ($put:ident, $get:ident, $put_arr:ident, $get_arr:ident, $ty:ty, $var:ident, $arr:ident, $label:literal, $arr_label:literal) => {
        pub fn $put(&mut self, key: &str, value: $ty) {
            self.insert(key, Payload::$var(value));
        }

        pub fn $get(&self, key: &str) -> Result<$ty> {
            match self.lookup(key)? {
                Payload::$var(v) => Ok(*v),
                other => Err(mismatch(key, $label, other)),
            }
        }

        pub fn $put_arr(&mut self, key: &str, values: Box<[$ty]>) {
            self.insert(key, Payload::$arr(values));
        }

        pub fn $get_arr(&self, key: &str) -> Result<Box<[$ty]>> {
            match self.lookup(key)? {
                Payload::$arr(v) => Ok(v.clone()),
                other => Err(mismatch(key, $arr_label, other)),
            }
        }
    };
}

impl Bundle {
    for_each_scalar!(scalar_accessors);
}

// ============================================================================
// Single values
// ============================================================================

impl Bundle {
    pub fn put_text(&mut self, key: &str, value: impl Into<String>) {
        self.insert(key, Payload::Text(value.into()));
    }

    pub fn get_text(&self, key: &str) -> Result<String> {
        match self.lookup(key)? {
            Payload::Text(v) => Ok(v.clone()),
            other => Err(mismatch(key, "text", other)),
        }
    }

    pub fn put_char_seq(&mut self, key: &str, value: CharSeq) {
        self.insert(key, Payload::CharSeq(value));
    }

    pub fn get_char_seq(&self, key: &str) -> Result<CharSeq> {
        match self.lookup(key)? {
            Payload::CharSeq(v) => Ok(v.clone()),
            other => Err(mismatch(key, "char sequence", other)),
        }
    }

    pub fn put_handle(&mut self, key: &str, value: Handle) {
        self.insert(key, Payload::Handle(value));
    }

    pub fn get_handle(&self, key: &str) -> Result<Handle> {
        match self.lookup(key)? {
            Payload::Handle(v) => Ok(*v),
            other => Err(mismatch(key, "handle", other)),
        }
    }

    pub fn put_size(&mut self, key: &str, value: Size) {
        self.insert(key, Payload::Size(value));
    }

    pub fn get_size(&self, key: &str) -> Result<Size> {
        match self.lookup(key)? {
            Payload::Size(v) => Ok(*v),
            other => Err(mismatch(key, "size", other)),
        }
    }

    pub fn put_size_f(&mut self, key: &str, value: SizeF) {
        self.insert(key, Payload::SizeF(value));
    }

    pub fn get_size_f(&self, key: &str) -> Result<SizeF> {
        match self.lookup(key)? {
            Payload::SizeF(v) => Ok(*v),
            other => Err(mismatch(key, "float size", other)),
        }
    }

    pub fn put_record<R: Record>(&mut self, key: &str, value: &R) {
        self.insert(key, Payload::Record(RecordValue::capture(value)));
    }

    pub fn get_record<R: Record>(&self, key: &str) -> Result<R> {
        match self.lookup(key)? {
            Payload::Record(v) => v.restore(),
            other => Err(mismatch(key, "record", other)),
        }
    }

    /// Stores a value through its serde representation.
    pub fn put_serializable<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.insert(key, Payload::Serialized(bytes));
        Ok(())
    }

    pub fn get_serializable<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        match self.lookup(key)? {
            Payload::Serialized(bytes) => Ok(serde_json::from_slice(bytes)?),
            other => Err(mismatch(key, "serializable", other)),
        }
    }
}

// ============================================================================
// Sequences
// ============================================================================

impl Bundle {
    pub fn put_text_array(&mut self, key: &str, values: Box<[String]>) {
        self.insert(key, Payload::TextArray(values));
    }

    pub fn get_text_array(&self, key: &str) -> Result<Box<[String]>> {
        match self.lookup(key)? {
            Payload::TextArray(v) => Ok(v.clone()),
            other => Err(mismatch(key, "text array", other)),
        }
    }

    pub fn put_char_seq_array(&mut self, key: &str, values: Box<[CharSeq]>) {
        self.insert(key, Payload::CharSeqArray(values));
    }

    pub fn get_char_seq_array(&self, key: &str) -> Result<Box<[CharSeq]>> {
        match self.lookup(key)? {
            Payload::CharSeqArray(v) => Ok(v.clone()),
            other => Err(mismatch(key, "char sequence array", other)),
        }
    }

    pub fn put_record_array<R: Record>(&mut self, key: &str, values: &[R]) {
        self.insert(key, Payload::RecordArray(capture_all(values).collect()));
    }

    pub fn get_record_array<R: Record>(&self, key: &str) -> Result<Box<[R]>> {
        match self.lookup(key)? {
            Payload::RecordArray(v) => v.iter().map(RecordValue::restore).collect(),
            other => Err(mismatch(key, "record array", other)),
        }
    }

    // Lists are always stored as a fresh copy of the caller's elements.

    pub fn put_int_list(&mut self, key: &str, values: &[i32]) {
        self.insert(key, Payload::IntList(values.to_vec()));
    }

    pub fn get_int_list(&self, key: &str) -> Result<Vec<i32>> {
        match self.lookup(key)? {
            Payload::IntList(v) => Ok(v.clone()),
            other => Err(mismatch(key, "int list", other)),
        }
    }

    pub fn put_text_list(&mut self, key: &str, values: &[String]) {
        self.insert(key, Payload::TextList(values.to_vec()));
    }

    pub fn get_text_list(&self, key: &str) -> Result<Vec<String>> {
        match self.lookup(key)? {
            Payload::TextList(v) => Ok(v.clone()),
            other => Err(mismatch(key, "text list", other)),
        }
    }

    pub fn put_char_seq_list(&mut self, key: &str, values: &[CharSeq]) {
        self.insert(key, Payload::CharSeqList(values.to_vec()));
    }

    pub fn get_char_seq_list(&self, key: &str) -> Result<Vec<CharSeq>> {
        match self.lookup(key)? {
            Payload::CharSeqList(v) => Ok(v.clone()),
            other => Err(mismatch(key, "char sequence list", other)),
        }
    }

    pub fn put_record_list<R: Record>(&mut self, key: &str, values: &[R]) {
        self.insert(key, Payload::RecordList(capture_all(values).collect()));
    }

    pub fn get_record_list<R: Record>(&self, key: &str) -> Result<Vec<R>> {
        match self.lookup(key)? {
            Payload::RecordList(v) => v.iter().map(RecordValue::restore).collect(),
            other => Err(mismatch(key, "record list", other)),
        }
    }

    pub fn put_sparse_records<R: Record>(&mut self, key: &str, values: &SparseMap<R>) {
        let captured = values
            .iter()
            .map(|(index, value)| (index, RecordValue::capture(value)))
            .collect();
        self.insert(key, Payload::SparseRecords(captured));
    }

    pub fn get_sparse_records<R: Record>(&self, key: &str) -> Result<SparseMap<R>> {
        match self.lookup(key)? {
            Payload::SparseRecords(v) => v
                .iter()
                .map(|(index, value)| value.restore().map(|record| (index, record)))
                .collect(),
            other => Err(mismatch(key, "sparse record map", other)),
        }
    }
}
