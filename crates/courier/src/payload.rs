//! # Payload
//!
//! The closed set of values a [`Bundle`](crate::Bundle) entry may hold.
//! Each variant corresponds to exactly one transportable category, so a
//! reader can always tell which accessor wrote an entry.

use crate::record::RecordValue;
use crate::values::CharSeq;
use crate::values::Handle;
use crate::values::Size;
use crate::values::SizeF;
use crate::values::SparseMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    // Scalars
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    Bool(bool),

    // Single values
    Text(String),
    CharSeq(CharSeq),
    Handle(Handle),
    Record(RecordValue),
    Serialized(Vec<u8>),

    // Fixed-length sequences
    ByteArray(Box<[i8]>),
    ShortArray(Box<[i16]>),
    IntArray(Box<[i32]>),
    LongArray(Box<[i64]>),
    FloatArray(Box<[f32]>),
    DoubleArray(Box<[f64]>),
    CharArray(Box<[char]>),
    BoolArray(Box<[bool]>),
    TextArray(Box<[String]>),
    CharSeqArray(Box<[CharSeq]>),
    RecordArray(Box<[RecordValue]>),

    // Growable lists
    IntList(Vec<i32>),
    TextList(Vec<String>),
    CharSeqList(Vec<CharSeq>),
    RecordList(Vec<RecordValue>),

    SparseRecords(SparseMap<RecordValue>),
    Size(Size),
    SizeF(SizeF),
}

impl Payload {
    /// Human-readable name of the category this payload belongs to.
    pub fn label(&self) -> &'static str {
        match self {
            Payload::Byte(_) => "byte",
            Payload::Short(_) => "short",
            Payload::Int(_) => "int",
            Payload::Long(_) => "long",
            Payload::Float(_) => "float",
            Payload::Double(_) => "double",
            Payload::Char(_) => "char",
            Payload::Bool(_) => "bool",
            Payload::Text(_) => "text",
            Payload::CharSeq(_) => "char sequence",
            Payload::Handle(_) => "handle",
            Payload::Record(_) => "record",
            Payload::Serialized(_) => "serializable",
            Payload::ByteArray(_) => "byte array",
            Payload::ShortArray(_) => "short array",
            Payload::IntArray(_) => "int array",
            Payload::LongArray(_) => "long array",
            Payload::FloatArray(_) => "float array",
            Payload::DoubleArray(_) => "double array",
            Payload::CharArray(_) => "char array",
            Payload::BoolArray(_) => "bool array",
            Payload::TextArray(_) => "text array",
            Payload::CharSeqArray(_) => "char sequence array",
            Payload::RecordArray(_) => "record array",
            Payload::IntList(_) => "int list",
            Payload::TextList(_) => "text list",
            Payload::CharSeqList(_) => "char sequence list",
            Payload::RecordList(_) => "record list",
            Payload::SparseRecords(_) => "sparse record map",
            Payload::Size(_) => "size",
            Payload::SizeF(_) => "float size",
        }
    }
}
