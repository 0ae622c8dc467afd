//! # Wire Format
//!
//! Self-describing encoding of envelopes for links that cross a process
//! boundary. Live arguments cannot be encoded, only bundles.
//!
//! ## Format
//!
//! - **Scalars**: `[Tag: 1b][Data: N]`
//! - **Blobs**: `[Tag: 1b][Len: 4b][Data: Len]`
//! - **Sequences**: `[Tag: 1b][Count: 4b][Items...]`, items untagged
//! - **Records**: `[Tag: 1b][Name blob][Bundle body]`
//! - **Bundle body**: `[Count: 4b]([Key blob][Payload])*`
//! - **Envelope**: `[Envelope][What: 4b]([Bundle][Bundle body] | [NoData])`
//!
//! All integers are Little-Endian. Decoders are bounds-checked and reject
//! trailing bytes.

use crate::bundle::Bundle;
use crate::envelope::Envelope;
use crate::payload::Payload;
use crate::record::RecordValue;
use crate::values::CharSeq;
use crate::values::Handle;
use crate::values::Size;
use crate::values::SizeF;
use crate::values::SparseMap;

/// Maximum nesting of records inside bundles.
pub const MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Byte does not correspond to a valid `Tag`.
    InvalidTag(u8),
    /// A valid tag appeared where it is not allowed.
    UnexpectedTag(Tag),
    /// Buffer exhausted while reading.
    UnexpectedEnd,
    /// Bytes left over after the envelope.
    TrailingBytes(usize),
    /// String data is not valid UTF-8.
    InvalidUtf8,
    /// Code point is not a valid `char`.
    InvalidChar(u32),
    /// Bool byte other than 0 or 1.
    InvalidBool(u8),
    /// Blob or sequence length exceeds `u32::MAX`.
    BlobTooLarge(usize),
    /// Records nested deeper than `MAX_DEPTH`.
    RecursionLimitExceeded,
    /// The envelope carries live arguments, which have no wire form.
    LiveArguments,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidTag(b) => write!(f, "Invalid Tag byte: {:#04x}", b),
            Error::UnexpectedTag(t) => write!(f, "Unexpected tag {:?}", t),
            Error::TrailingBytes(n) => write!(f, "{} trailing bytes after envelope", n),
            Error::InvalidChar(c) => write!(f, "Invalid char code point: {:#x}", c),
            Error::InvalidBool(b) => write!(f, "Invalid bool byte: {:#04x}", b),
            Error::LiveArguments => write!(f, "Envelope carries live arguments"),
            _ => write!(f, "{:?}", self),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    // Scalars
    Byte = 0x01,
    Short = 0x02,
    Int = 0x03,
    Long = 0x04,
    Float = 0x05,
    Double = 0x06,
    Char = 0x07,
    Bool = 0x08,

    // Blobs and single structured values
    Text = 0x10,
    CharSeq = 0x11,
    Handle = 0x12,
    Serialized = 0x13,
    Record = 0x14,

    // Arrays
    ByteArray = 0x20,
    ShortArray = 0x21,
    IntArray = 0x22,
    LongArray = 0x23,
    FloatArray = 0x24,
    DoubleArray = 0x25,
    CharArray = 0x26,
    BoolArray = 0x27,
    TextArray = 0x28,
    CharSeqArray = 0x29,
    RecordArray = 0x2A,

    // Lists
    IntList = 0x30,
    TextList = 0x31,
    CharSeqList = 0x32,
    RecordList = 0x33,
    SparseRecords = 0x34,

    Size = 0x40,
    SizeF = 0x41,

    // Framing
    Bundle = 0x50,
    NoData = 0x51,
    Envelope = 0x52,
}

impl Tag {
    /// Returns the Tag variant for a given byte, or `None` if invalid.
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Tag::Byte),
            0x02 => Some(Tag::Short),
            0x03 => Some(Tag::Int),
            0x04 => Some(Tag::Long),
            0x05 => Some(Tag::Float),
            0x06 => Some(Tag::Double),
            0x07 => Some(Tag::Char),
            0x08 => Some(Tag::Bool),
            0x10 => Some(Tag::Text),
            0x11 => Some(Tag::CharSeq),
            0x12 => Some(Tag::Handle),
            0x13 => Some(Tag::Serialized),
            0x14 => Some(Tag::Record),
            0x20 => Some(Tag::ByteArray),
            0x21 => Some(Tag::ShortArray),
            0x22 => Some(Tag::IntArray),
            0x23 => Some(Tag::LongArray),
            0x24 => Some(Tag::FloatArray),
            0x25 => Some(Tag::DoubleArray),
            0x26 => Some(Tag::CharArray),
            0x27 => Some(Tag::BoolArray),
            0x28 => Some(Tag::TextArray),
            0x29 => Some(Tag::CharSeqArray),
            0x2A => Some(Tag::RecordArray),
            0x30 => Some(Tag::IntList),
            0x31 => Some(Tag::TextList),
            0x32 => Some(Tag::CharSeqList),
            0x33 => Some(Tag::RecordList),
            0x34 => Some(Tag::SparseRecords),
            0x40 => Some(Tag::Size),
            0x41 => Some(Tag::SizeF),
            0x50 => Some(Tag::Bundle),
            0x51 => Some(Tag::NoData),
            0x52 => Some(Tag::Envelope),
            _ => None,
        }
    }
}

pub fn encode_envelope(envelope: &Envelope) -> Result<Vec<u8>> {
    let mut enc = Encoder::new();
    enc.envelope(envelope)?;
    Ok(enc.into_bytes())
}

pub fn decode_envelope(bytes: &[u8]) -> Result<Envelope> {
    let mut dec = Decoder::new(bytes);
    let envelope = dec.envelope()?;
    if dec.remaining() > 0 {
        return Err(Error::TrailingBytes(dec.remaining()));
    }
    Ok(envelope)
}

// ============================================================================
// Encoder
// ============================================================================

#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn envelope(&mut self, envelope: &Envelope) -> Result<()> {
        if envelope.has_args() {
            return Err(Error::LiveArguments);
        }
        self.tag(Tag::Envelope);
        self.buf.extend_from_slice(&envelope.what().to_le_bytes());
        match envelope.data() {
            Some(bundle) => {
                self.tag(Tag::Bundle);
                self.bundle_body(bundle, 0)
            }
            None => {
                self.tag(Tag::NoData);
                Ok(())
            }
        }
    }

    fn tag(&mut self, tag: Tag) {
        self.buf.push(tag as u8);
    }

    fn len(&mut self, n: usize) -> Result<()> {
        let n = u32::try_from(n).map_err(|_| Error::BlobTooLarge(n))?;
        self.buf.extend_from_slice(&n.to_le_bytes());
        Ok(())
    }

    fn blob(&mut self, bytes: &[u8]) -> Result<()> {
        self.len(bytes.len())?;
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<()> {
        self.blob(text.as_bytes())
    }

    fn seq<T>(&mut self, items: &[T], mut each: impl FnMut(&mut Self, &T) -> Result<()>) -> Result<()> {
        self.len(items.len())?;
        for item in items {
            each(self, item)?;
        }
        Ok(())
    }

    fn raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn char(&mut self, c: char) {
        self.buf.extend_from_slice(&u32::from(c).to_le_bytes());
    }

    fn bool(&mut self, b: bool) {
        self.buf.push(u8::from(b));
    }

    fn bundle_body(&mut self, bundle: &Bundle, depth: usize) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(Error::RecursionLimitExceeded);
        }
        self.len(bundle.len())?;
        for (key, payload) in bundle {
            self.text(key)?;
            self.payload(payload, depth)?;
        }
        Ok(())
    }

    fn record_body(&mut self, record: &RecordValue, depth: usize) -> Result<()> {
        self.text(record.type_name())?;
        self.bundle_body(record.fields(), depth + 1)
    }

    fn payload(&mut self, payload: &Payload, depth: usize) -> Result<()> {
        match payload {
            Payload::Byte(v) => {
                self.tag(Tag::Byte);
                self.buf.extend_from_slice(&v.to_le_bytes());
            }
            Payload::Short(v) => {
                self.tag(Tag::Short);
                self.buf.extend_from_slice(&v.to_le_bytes());
            }
            Payload::Int(v) => {
                self.tag(Tag::Int);
                self.buf.extend_from_slice(&v.to_le_bytes());
            }
            Payload::Long(v) => {
                self.tag(Tag::Long);
                self.buf.extend_from_slice(&v.to_le_bytes());
            }
            Payload::Float(v) => {
                self.tag(Tag::Float);
                self.buf.extend_from_slice(&v.to_le_bytes());
            }
            Payload::Double(v) => {
                self.tag(Tag::Double);
                self.buf.extend_from_slice(&v.to_le_bytes());
            }
            Payload::Char(v) => {
                self.tag(Tag::Char);
                self.char(*v);
            }
            Payload::Bool(v) => {
                self.tag(Tag::Bool);
                self.bool(*v);
            }
            Payload::Text(v) => {
                self.tag(Tag::Text);
                self.text(v)?;
            }
            Payload::CharSeq(v) => {
                self.tag(Tag::CharSeq);
                self.text(v.as_str())?;
            }
            Payload::Handle(v) => {
                self.tag(Tag::Handle);
                self.buf.extend_from_slice(&v.raw().to_le_bytes());
            }
            Payload::Serialized(v) => {
                self.tag(Tag::Serialized);
                self.blob(v)?;
            }
            Payload::Record(v) => {
                self.tag(Tag::Record);
                self.record_body(v, depth)?;
            }
            Payload::ByteArray(v) => {
                self.tag(Tag::ByteArray);
                self.seq(v, |e, x| e.raw(&x.to_le_bytes()))?;
            }
            Payload::ShortArray(v) => {
                self.tag(Tag::ShortArray);
                self.seq(v, |e, x| e.raw(&x.to_le_bytes()))?;
            }
            Payload::IntArray(v) => {
                self.tag(Tag::IntArray);
                self.seq(v, |e, x| e.raw(&x.to_le_bytes()))?;
            }
            Payload::LongArray(v) => {
                self.tag(Tag::LongArray);
                self.seq(v, |e, x| e.raw(&x.to_le_bytes()))?;
            }
            Payload::FloatArray(v) => {
                self.tag(Tag::FloatArray);
                self.seq(v, |e, x| e.raw(&x.to_le_bytes()))?;
            }
            Payload::DoubleArray(v) => {
                self.tag(Tag::DoubleArray);
                self.seq(v, |e, x| e.raw(&x.to_le_bytes()))?;
            }
            Payload::CharArray(v) => {
                self.tag(Tag::CharArray);
                self.seq(v, |e, x| e.raw(&u32::from(*x).to_le_bytes()))?;
            }
            Payload::BoolArray(v) => {
                self.tag(Tag::BoolArray);
                self.seq(v, |e, x| e.raw(&[u8::from(*x)]))?;
            }
            Payload::TextArray(v) => {
                self.tag(Tag::TextArray);
                self.seq(v, |e, x| e.text(x))?;
            }
            Payload::CharSeqArray(v) => {
                self.tag(Tag::CharSeqArray);
                self.seq(v, |e, x| e.text(x.as_str()))?;
            }
            Payload::RecordArray(v) => {
                self.tag(Tag::RecordArray);
                self.seq(v, |e, x| e.record_body(x, depth))?;
            }
            Payload::IntList(v) => {
                self.tag(Tag::IntList);
                self.seq(v, |e, x| e.raw(&x.to_le_bytes()))?;
            }
            Payload::TextList(v) => {
                self.tag(Tag::TextList);
                self.seq(v, |e, x| e.text(x))?;
            }
            Payload::CharSeqList(v) => {
                self.tag(Tag::CharSeqList);
                self.seq(v, |e, x| e.text(x.as_str()))?;
            }
            Payload::RecordList(v) => {
                self.tag(Tag::RecordList);
                self.seq(v, |e, x| e.record_body(x, depth))?;
            }
            Payload::SparseRecords(v) => {
                self.tag(Tag::SparseRecords);
                self.len(v.len())?;
                for (index, record) in v.iter() {
                    self.buf.extend_from_slice(&index.to_le_bytes());
                    self.record_body(record, depth)?;
                }
            }
            Payload::Size(v) => {
                self.tag(Tag::Size);
                self.buf.extend_from_slice(&v.width.to_le_bytes());
                self.buf.extend_from_slice(&v.height.to_le_bytes());
            }
            Payload::SizeF(v) => {
                self.tag(Tag::SizeF);
                self.buf.extend_from_slice(&v.width.to_le_bytes());
                self.buf.extend_from_slice(&v.height.to_le_bytes());
            }
        }
        Ok(())
    }
}

// ============================================================================
// Decoder
// ============================================================================

/// Zero-copy, bounds-checked reader over an encoded envelope.
#[derive(Debug, Clone, Copy)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

macro_rules! read_le {
    ($name:ident, $ty:ty) => {
        fn $name(&mut self) -> Result<$ty> {
            Ok(<$ty>::from_le_bytes(self.array()?))
        }
    };
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn envelope(&mut self) -> Result<Envelope> {
        self.expect(Tag::Envelope)?;
        let what = self.u32()?;
        match self.tag()? {
            Tag::Bundle => Ok(Envelope::with_data(what, self.bundle_body(0)?)),
            Tag::NoData => Ok(Envelope::new(what)),
            other => Err(Error::UnexpectedTag(other)),
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::UnexpectedEnd);
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    read_le!(i8, i8);
    read_le!(i16, i16);
    read_le!(i32, i32);
    read_le!(i64, i64);
    read_le!(u32, u32);
    read_le!(u64, u64);
    read_le!(f32, f32);
    read_le!(f64, f64);

    fn char(&mut self) -> Result<char> {
        let raw = self.u32()?;
        char::from_u32(raw).ok_or(Error::InvalidChar(raw))
    }

    fn bool(&mut self) -> Result<bool> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            b => Err(Error::InvalidBool(b)),
        }
    }

    fn tag(&mut self) -> Result<Tag> {
        let b = self.u8()?;
        Tag::from_u8(b).ok_or(Error::InvalidTag(b))
    }

    fn expect(&mut self, tag: Tag) -> Result<()> {
        match self.tag()? {
            t if t == tag => Ok(()),
            other => Err(Error::UnexpectedTag(other)),
        }
    }

    fn len(&mut self) -> Result<usize> {
        Ok(self.u32()? as usize)
    }

    fn blob(&mut self) -> Result<&'a [u8]> {
        let n = self.len()?;
        self.take(n)
    }

    fn text(&mut self) -> Result<String> {
        let bytes = self.blob()?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| Error::InvalidUtf8)
    }

    fn seq<T>(&mut self, mut each: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        let count = self.len()?;
        // Every item occupies at least one byte; cap the preallocation by what is left.
        let mut out = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            out.push(each(self)?);
        }
        Ok(out)
    }

    fn bundle_body(&mut self, depth: usize) -> Result<Bundle> {
        if depth > MAX_DEPTH {
            return Err(Error::RecursionLimitExceeded);
        }
        let count = self.len()?;
        let mut bundle = Bundle::new();
        for _ in 0..count {
            let key = self.text()?;
            let payload = self.payload(depth)?;
            bundle.insert(key, payload);
        }
        Ok(bundle)
    }

    fn record_body(&mut self, depth: usize) -> Result<RecordValue> {
        let type_name = self.text()?;
        let fields = self.bundle_body(depth + 1)?;
        Ok(RecordValue::from_parts(type_name, fields))
    }

    fn payload(&mut self, depth: usize) -> Result<Payload> {
        let payload = match self.tag()? {
            Tag::Byte => Payload::Byte(self.i8()?),
            Tag::Short => Payload::Short(self.i16()?),
            Tag::Int => Payload::Int(self.i32()?),
            Tag::Long => Payload::Long(self.i64()?),
            Tag::Float => Payload::Float(self.f32()?),
            Tag::Double => Payload::Double(self.f64()?),
            Tag::Char => Payload::Char(self.char()?),
            Tag::Bool => Payload::Bool(self.bool()?),
            Tag::Text => Payload::Text(self.text()?),
            Tag::CharSeq => Payload::CharSeq(CharSeq(self.text()?)),
            Tag::Handle => Payload::Handle(Handle(self.u64()?)),
            Tag::Serialized => Payload::Serialized(self.blob()?.to_vec()),
            Tag::Record => Payload::Record(self.record_body(depth)?),
            Tag::ByteArray => Payload::ByteArray(self.seq(Self::i8)?.into()),
            Tag::ShortArray => Payload::ShortArray(self.seq(Self::i16)?.into()),
            Tag::IntArray => Payload::IntArray(self.seq(Self::i32)?.into()),
            Tag::LongArray => Payload::LongArray(self.seq(Self::i64)?.into()),
            Tag::FloatArray => Payload::FloatArray(self.seq(Self::f32)?.into()),
            Tag::DoubleArray => Payload::DoubleArray(self.seq(Self::f64)?.into()),
            Tag::CharArray => Payload::CharArray(self.seq(Self::char)?.into()),
            Tag::BoolArray => Payload::BoolArray(self.seq(Self::bool)?.into()),
            Tag::TextArray => Payload::TextArray(self.seq(Self::text)?.into()),
            Tag::CharSeqArray => {
                Payload::CharSeqArray(self.seq(|d| d.text().map(CharSeq))?.into())
            }
            Tag::RecordArray => {
                Payload::RecordArray(self.seq(|d| d.record_body(depth))?.into())
            }
            Tag::IntList => Payload::IntList(self.seq(Self::i32)?),
            Tag::TextList => Payload::TextList(self.seq(Self::text)?),
            Tag::CharSeqList => Payload::CharSeqList(self.seq(|d| d.text().map(CharSeq))?),
            Tag::RecordList => Payload::RecordList(self.seq(|d| d.record_body(depth))?),
            Tag::SparseRecords => {
                let entries = self.seq(|d| Ok((d.i32()?, d.record_body(depth)?)))?;
                Payload::SparseRecords(entries.into_iter().collect::<SparseMap<_>>())
            }
            Tag::Size => Payload::Size(Size::new(self.i32()?, self.i32()?)),
            Tag::SizeF => Payload::SizeF(SizeF::new(self.f32()?, self.f32()?)),
            other @ (Tag::Bundle | Tag::NoData | Tag::Envelope) => {
                return Err(Error::UnexpectedTag(other));
            }
        };
        Ok(payload)
    }
}
