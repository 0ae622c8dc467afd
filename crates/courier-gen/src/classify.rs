//! # Type Classifier
//!
//! Maps a parameter's [`TypeDesc`] onto the closed set of categories the
//! marshalling emitter knows how to write and read.
//!
//! Categories are checked more specific first: scalars, then arrays, sparse
//! maps and lists (each inspecting their element type one level deep), then
//! text, char sequences, handles, records, serializables and the two size
//! types. Nothing else is transportable.

use crate::ir::ScalarKind;
use crate::ir::TypeDesc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCategory {
    Scalar(ScalarKind),
    Text,
    TextSeq,
    Handle,
    Record,
    Serializable,
    ScalarArray(ScalarKind),
    TextArray,
    TextSeqArray,
    RecordArray,
    IntList,
    TextList,
    TextSeqList,
    RecordList,
    SparseRecords,
    Size,
    SizeF,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Transportable(TypeCategory),
    Unsupported,
    /// A list or sparse map with no element type to inspect.
    UnknownGenericArgument { wrapper: &'static str },
}

impl Classification {
    pub fn category(self) -> Option<TypeCategory> {
        match self {
            Classification::Transportable(category) => Some(category),
            _ => None,
        }
    }
}

pub fn classify(desc: &TypeDesc) -> Classification {
    use Classification::*;
    use TypeCategory::*;

    match desc {
        TypeDesc::Scalar(kind) => Transportable(Scalar(*kind)),
        TypeDesc::Array(elem) => match elem.as_ref() {
            TypeDesc::Scalar(kind) => Transportable(ScalarArray(*kind)),
            TypeDesc::Text => Transportable(TextArray),
            TypeDesc::TextSeq => Transportable(TextSeqArray),
            TypeDesc::Named { conformance, .. } if conformance.record => Transportable(RecordArray),
            _ => Unsupported,
        },
        TypeDesc::SparseMap(args) => match args.as_slice() {
            [] => UnknownGenericArgument { wrapper: "SparseMap" },
            [TypeDesc::Named { conformance, .. }] if conformance.record => Transportable(SparseRecords),
            _ => Unsupported,
        },
        TypeDesc::List(args) => match args.as_slice() {
            [] => UnknownGenericArgument { wrapper: "Vec" },
            [TypeDesc::Scalar(ScalarKind::Int)] => Transportable(IntList),
            [TypeDesc::Text] => Transportable(TextList),
            [TypeDesc::TextSeq] => Transportable(TextSeqList),
            [TypeDesc::Named { conformance, .. }] if conformance.record => Transportable(RecordList),
            _ => Unsupported,
        },
        TypeDesc::Text => Transportable(Text),
        TypeDesc::TextSeq => Transportable(TextSeq),
        TypeDesc::Handle => Transportable(Handle),
        TypeDesc::Named { conformance, .. } if conformance.record => Transportable(Record),
        TypeDesc::Named { conformance, .. } if conformance.serializable => Transportable(Serializable),
        TypeDesc::Size => Transportable(Size),
        TypeDesc::SizeF => Transportable(SizeF),
        TypeDesc::Named { .. } | TypeDesc::Map(_) | TypeDesc::Other(_) => Unsupported,
    }
}

impl TypeCategory {
    /// Minimum platform level the generated call site must guard on.
    pub fn min_level(self) -> Option<u32> {
        match self {
            TypeCategory::Handle => Some(18),
            TypeCategory::Size | TypeCategory::SizeF => Some(21),
            _ => None,
        }
    }

    /// Whether the write copies into a fresh container instead of moving.
    pub fn copies_on_write(self) -> bool {
        matches!(
            self,
            TypeCategory::IntList
                | TypeCategory::TextList
                | TypeCategory::TextSeqList
                | TypeCategory::RecordList
                | TypeCategory::SparseRecords
        )
    }

    /// Whether the write itself can fail.
    pub fn fallible_write(self) -> bool {
        matches!(self, TypeCategory::Serializable)
    }

    pub fn label(self) -> String {
        match self {
            TypeCategory::Scalar(kind) => kind.stem().to_owned(),
            TypeCategory::ScalarArray(kind) => format!("{} array", kind.stem()),
            TypeCategory::Text => "text".into(),
            TypeCategory::TextSeq => "char sequence".into(),
            TypeCategory::Handle => "handle".into(),
            TypeCategory::Record => "record".into(),
            TypeCategory::Serializable => "serializable".into(),
            TypeCategory::TextArray => "text array".into(),
            TypeCategory::TextSeqArray => "char sequence array".into(),
            TypeCategory::RecordArray => "record array".into(),
            TypeCategory::IntList => "int list".into(),
            TypeCategory::TextList => "text list".into(),
            TypeCategory::TextSeqList => "char sequence list".into(),
            TypeCategory::RecordList => "record list".into(),
            TypeCategory::SparseRecords => "sparse record map".into(),
            TypeCategory::Size => "size".into(),
            TypeCategory::SizeF => "float size".into(),
        }
    }
}
