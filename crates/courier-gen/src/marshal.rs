//! # Marshalling Emitter
//!
//! For each [`TypeCategory`], the pair of bundle calls that write a value
//! under a key and read it back. Every category has exactly one entry;
//! unsupported types never get here because planning rejects them first.
//!
//! | category            | write                          | read                    |
//! |---------------------|--------------------------------|-------------------------|
//! | scalar `k`          | `put_<k>(key, v)`              | `get_<k>(key)`          |
//! | text / char seq     | `put_text` / `put_char_seq`    | `get_text` / `get_char_seq` |
//! | handle, size        | `put_handle`, `put_size[_f]`   | matching `get_*`        |
//! | record              | `put_record(key, &v)`          | `get_record(key)`       |
//! | serializable        | `put_serializable(key, &v)?`   | `get_serializable(key)` |
//! | arrays              | `put_<k>_array(key, v)`        | `get_<k>_array(key)`    |
//! | record array        | `put_record_array(key, &v[..])`| `get_record_array(key)` |
//! | lists               | `put_<k>_list(key, &v[..])`    | `get_<k>_list(key)`     |
//! | sparse records      | `put_sparse_records(key, &v)`  | `get_sparse_records(key)` |

use proc_macro2::Ident;
use proc_macro2::Span;
use proc_macro2::TokenStream;
use quote::quote;

use crate::classify::TypeCategory;

/// How the value expression is handed to the write accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Value,
    Ref,
    Slice,
}

struct Entry {
    put: String,
    get: String,
    pass: Pass,
}

fn entry(category: TypeCategory) -> Entry {
    let (stem, pass) = match category {
        TypeCategory::Scalar(kind) => (kind.stem().to_owned(), Pass::Value),
        TypeCategory::Text => ("text".to_owned(), Pass::Value),
        TypeCategory::TextSeq => ("char_seq".to_owned(), Pass::Value),
        TypeCategory::Handle => ("handle".to_owned(), Pass::Value),
        TypeCategory::Record => ("record".to_owned(), Pass::Ref),
        TypeCategory::Serializable => ("serializable".to_owned(), Pass::Ref),
        TypeCategory::ScalarArray(kind) => (format!("{}_array", kind.stem()), Pass::Value),
        TypeCategory::TextArray => ("text_array".to_owned(), Pass::Value),
        TypeCategory::TextSeqArray => ("char_seq_array".to_owned(), Pass::Value),
        TypeCategory::RecordArray => ("record_array".to_owned(), Pass::Slice),
        TypeCategory::IntList => ("int_list".to_owned(), Pass::Slice),
        TypeCategory::TextList => ("text_list".to_owned(), Pass::Slice),
        TypeCategory::TextSeqList => ("char_seq_list".to_owned(), Pass::Slice),
        TypeCategory::RecordList => ("record_list".to_owned(), Pass::Slice),
        TypeCategory::SparseRecords => ("sparse_records".to_owned(), Pass::Ref),
        TypeCategory::Size => ("size".to_owned(), Pass::Value),
        TypeCategory::SizeF => ("size_f".to_owned(), Pass::Value),
    };
    Entry {
        put: format!("put_{}", stem),
        get: format!("get_{}", stem),
        pass,
    }
}

/// Name of the bundle method that writes this category.
pub fn writer(category: TypeCategory) -> String {
    entry(category).put
}

/// Name of the bundle method that reads this category.
pub fn reader(category: TypeCategory) -> String {
    entry(category).get
}

/// Emits one statement writing `value` into `bundle` under `key`.
///
/// Fallible writes end in `?` and so must sit in a function returning
/// `Result<_, bundle::Error>`.
pub fn emit_write(category: TypeCategory, bundle: &Ident, key: &str, value: TokenStream) -> TokenStream {
    let e = entry(category);
    let put = Ident::new(&e.put, Span::call_site());
    let arg = match e.pass {
        Pass::Value => value,
        Pass::Ref => quote!(&#value),
        Pass::Slice => quote!(&#value[..]),
    };
    if category.fallible_write() {
        quote! { #bundle.#put(#key, #arg)?; }
    } else {
        quote! { #bundle.#put(#key, #arg); }
    }
}

/// Emits an expression reading `key` back out of `bundle`, propagating errors with `?`.
pub fn emit_read(category: TypeCategory, bundle: &Ident, key: &str) -> TokenStream {
    let get = Ident::new(&entry(category).get, Span::call_site());
    quote! { #bundle.#get(#key)? }
}
