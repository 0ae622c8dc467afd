//! # Records
//!
//! Structured values that know how to flatten themselves into a [`Bundle`]
//! and rebuild themselves from one.

use crate::bundle;
use crate::bundle::Bundle;

/// A structured value that can cross a process boundary field by field.
///
/// Implementors write their fields with the ordinary bundle accessors, so a
/// record may nest other records, lists, or anything else a bundle holds.
pub trait Record: Sized {
    /// Stable name checked on the receiving side before fields are read.
    const TYPE_NAME: &'static str;

    fn write_fields(&self, fields: &mut Bundle);

    fn read_fields(fields: &Bundle) -> bundle::Result<Self>;
}

/// A record captured into its wire form.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordValue {
    type_name: String,
    fields: Bundle,
}

impl RecordValue {
    pub fn capture<R: Record>(record: &R) -> Self {
        let mut fields = Bundle::new();
        record.write_fields(&mut fields);
        Self {
            type_name: R::TYPE_NAME.to_owned(),
            fields,
        }
    }

    pub fn from_parts(type_name: impl Into<String>, fields: Bundle) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
        }
    }

    /// Rebuilds the record, refusing values captured from a different type.
    pub fn restore<R: Record>(&self) -> bundle::Result<R> {
        if self.type_name != R::TYPE_NAME {
            return Err(bundle::Error::RecordMismatch {
                expected: R::TYPE_NAME,
                found: self.type_name.clone(),
            });
        }
        R::read_fields(&self.fields)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn fields(&self) -> &Bundle {
        &self.fields
    }
}
