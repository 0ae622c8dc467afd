//! Unit tests for classification, registry, planning and emission.

use syn::parse_quote;

use crate::classify::Classification;
use crate::classify::TypeCategory;
use crate::classify::classify;
use crate::error::ErrorKind;
use crate::generate::Options;
use crate::generate::generate;
use crate::generate::generate_all;
use crate::ir::Conformance;
use crate::ir::Declaration;
use crate::ir::InterfaceSpec;
use crate::ir::MethodSpec;
use crate::ir::ScalarKind;
use crate::ir::TransportKind;
use crate::ir::TypeDesc;
use crate::marshal;
use crate::registry;
use crate::registry::MethodRegistry;
use crate::strategy::CrossProcess;
use crate::strategy::DirectLocal;
use crate::strategy::Ownership;
use crate::strategy::TransportStrategy;
use crate::syntax;
use crate::syntax::KnownTypes;

fn greeter() -> InterfaceSpec {
    InterfaceSpec::new("Greeter")
        .method(MethodSpec::new("noop"))
        .method(MethodSpec::new("send").param("words", TypeDesc::Text))
}

fn compact(source: &str) -> String {
    source.chars().filter(|c| !c.is_whitespace()).collect()
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn test_classify_scalars() {
    for kind in ScalarKind::ALL {
        assert_eq!(
            classify(&TypeDesc::Scalar(kind)),
            Classification::Transportable(TypeCategory::Scalar(kind))
        );
        assert_eq!(
            classify(&TypeDesc::array(TypeDesc::Scalar(kind))),
            Classification::Transportable(TypeCategory::ScalarArray(kind))
        );
    }
}

#[test]
fn test_classify_every_category() {
    let point = || TypeDesc::record("Point");
    let cases = [
        (TypeDesc::Text, TypeCategory::Text),
        (TypeDesc::TextSeq, TypeCategory::TextSeq),
        (TypeDesc::Handle, TypeCategory::Handle),
        (point(), TypeCategory::Record),
        (TypeDesc::serializable("Settings"), TypeCategory::Serializable),
        (TypeDesc::array(TypeDesc::Text), TypeCategory::TextArray),
        (TypeDesc::array(TypeDesc::TextSeq), TypeCategory::TextSeqArray),
        (TypeDesc::array(point()), TypeCategory::RecordArray),
        (TypeDesc::list(TypeDesc::Scalar(ScalarKind::Int)), TypeCategory::IntList),
        (TypeDesc::list(TypeDesc::Text), TypeCategory::TextList),
        (TypeDesc::list(TypeDesc::TextSeq), TypeCategory::TextSeqList),
        (TypeDesc::list(point()), TypeCategory::RecordList),
        (TypeDesc::sparse(point()), TypeCategory::SparseRecords),
        (TypeDesc::Size, TypeCategory::Size),
        (TypeDesc::SizeF, TypeCategory::SizeF),
    ];
    for (desc, expected) in cases {
        assert_eq!(classify(&desc), Classification::Transportable(expected), "{}", desc);
    }
}

#[test]
fn test_classify_record_wins_over_serializable() {
    let both = TypeDesc::named(
        "Point",
        Conformance { record: true, serializable: true },
    );
    assert_eq!(classify(&both), Classification::Transportable(TypeCategory::Record));
}

#[test]
fn test_classify_rejections() {
    let unsupported = [
        TypeDesc::Map(vec![TypeDesc::Text, TypeDesc::Scalar(ScalarKind::Int)]),
        TypeDesc::array(TypeDesc::array(TypeDesc::Scalar(ScalarKind::Int))),
        TypeDesc::array(TypeDesc::serializable("Settings")),
        TypeDesc::list(TypeDesc::Scalar(ScalarKind::Long)),
        TypeDesc::list(TypeDesc::serializable("Settings")),
        TypeDesc::sparse(TypeDesc::Text),
        TypeDesc::named("Opaque", Conformance::NONE),
        TypeDesc::Other("& str".into()),
    ];
    for desc in unsupported {
        assert_eq!(classify(&desc), Classification::Unsupported, "{}", desc);
    }
}

#[test]
fn test_classify_missing_element_type() {
    assert_eq!(
        classify(&TypeDesc::List(vec![])),
        Classification::UnknownGenericArgument { wrapper: "Vec" }
    );
    assert_eq!(
        classify(&TypeDesc::SparseMap(vec![])),
        Classification::UnknownGenericArgument { wrapper: "SparseMap" }
    );
}

#[test]
fn test_classify_is_deterministic() {
    let desc = TypeDesc::Map(vec![TypeDesc::Text, TypeDesc::Text]);
    let first = classify(&desc);
    for _ in 0..100 {
        assert_eq!(classify(&desc), first);
    }
    assert_eq!(first, Classification::Unsupported);
}

#[test]
fn test_category_traits() {
    assert_eq!(TypeCategory::Handle.min_level(), Some(18));
    assert_eq!(TypeCategory::Size.min_level(), Some(21));
    assert_eq!(TypeCategory::SizeF.min_level(), Some(21));
    assert_eq!(TypeCategory::Text.min_level(), None);
    assert!(TypeCategory::IntList.copies_on_write());
    assert!(TypeCategory::SparseRecords.copies_on_write());
    assert!(!TypeCategory::TextArray.copies_on_write());
    assert!(TypeCategory::Serializable.fallible_write());
    assert!(!TypeCategory::Record.fallible_write());
}

// ============================================================================
// Registry
// ============================================================================

#[test]
fn test_registry_assigns_ids_in_order() {
    let registry = MethodRegistry::build(&greeter());
    assert_eq!(registry.id_of("noop"), Some(1));
    assert_eq!(registry.id_of("send"), Some(2));
    assert_eq!(registry.last_id(), 2);
    assert_eq!(registry.get(0).map(|m| m.id), None);
    assert_eq!(registry.get(2).map(|m| m.spec.name.as_str()), Some("send"));
    assert!(registry.get(3).is_none());
}

#[test]
fn test_registry_is_stable() {
    let spec = greeter();
    let a: Vec<(u32, String)> = MethodRegistry::build(&spec)
        .iter()
        .map(|m| (m.id, m.spec.name.clone()))
        .collect();
    let b: Vec<(u32, String)> = MethodRegistry::build(&spec)
        .iter()
        .map(|m| (m.id, m.spec.name.clone()))
        .collect();
    assert_eq!(a, b);
}

#[test]
fn test_empty_registry() {
    let registry = MethodRegistry::build(&InterfaceSpec::new("Empty"));
    assert!(registry.is_empty());
    assert_eq!(registry.last_id(), 0);
}

#[test]
fn test_validate_collects_every_violation() {
    let mut mutating = MethodSpec::new("reset");
    mutating.unsupported = Some("`&mut self` receivers cannot be proxied".into());
    let spec = InterfaceSpec::new("Counter")
        .method(MethodSpec::new("get").returns("i32"))
        .method(MethodSpec::new("bump"))
        .method(MethodSpec::new("peek").returns("Option<i32>"))
        .method(mutating);

    let diagnostics = registry::validate(&spec);
    let kinds: Vec<ErrorKind> = diagnostics.iter().map(|d| d.kind).collect();
    assert_eq!(
        kinds,
        vec![ErrorKind::NonVoidMethod, ErrorKind::NonVoidMethod, ErrorKind::UnsupportedSignature]
    );
    assert_eq!(diagnostics[0].method.as_deref(), Some("get() -> i32"));
}

// ============================================================================
// Planning
// ============================================================================

#[test]
fn test_strategy_policies() {
    assert_eq!(DirectLocal.suffix(), "Handler");
    assert_eq!(CrossProcess.suffix(), "Messenger");
    assert_eq!(DirectLocal.ownership(), Ownership::Weak);
    assert_eq!(CrossProcess.ownership(), Ownership::Owned);
    assert!(!DirectLocal.serializes());
    assert!(CrossProcess.serializes());
}

#[test]
fn test_cross_process_plan_classifies() {
    let spec = InterfaceSpec::new("Camera")
        .method(
            MethodSpec::new("resize")
                .param("size", TypeDesc::Size)
                .param("token", TypeDesc::Handle),
        )
        .method(MethodSpec::new("label").param("text", TypeDesc::Text));
    let plans = CrossProcess.plan(&MethodRegistry::build(&spec)).expect("plan");

    assert_eq!(plans[0].params[0].category, Some(TypeCategory::Size));
    assert_eq!(plans[0].params[1].category, Some(TypeCategory::Handle));
    assert_eq!(plans[0].min_level, Some(21));
    assert_eq!(plans[1].min_level, None);
}

#[test]
fn test_direct_local_plan_skips_classification() {
    let spec = InterfaceSpec::new("Store").method(
        MethodSpec::new("put").param("entries", TypeDesc::Map(vec![TypeDesc::Text, TypeDesc::Text])),
    );
    let plans = DirectLocal.plan(&MethodRegistry::build(&spec)).expect("plan");
    assert_eq!(plans[0].params[0].category, None);
}

#[test]
fn test_plan_reports_every_bad_parameter() {
    let spec = InterfaceSpec::new("Store")
        .method(
            MethodSpec::new("put")
                .param("entries", TypeDesc::Map(vec![TypeDesc::Text, TypeDesc::Text]))
                .param("ids", TypeDesc::List(vec![])),
        )
        .method(MethodSpec::new("tag").param("owner", TypeDesc::named("Opaque", Conformance::NONE)));

    let diagnostics = CrossProcess.plan(&MethodRegistry::build(&spec)).expect_err("rejected");
    let found: Vec<(ErrorKind, Option<&str>)> =
        diagnostics.iter().map(|d| (d.kind, d.param.as_deref())).collect();
    assert_eq!(
        found,
        vec![
            (ErrorKind::UnsupportedParameterType, Some("entries")),
            (ErrorKind::UnknownGenericArgument, Some("ids")),
            (ErrorKind::UnsupportedParameterType, Some("owner")),
        ]
    );
}

// ============================================================================
// Marshalling table
// ============================================================================

#[test]
fn test_marshal_accessor_names() {
    assert_eq!(marshal::writer(TypeCategory::Scalar(ScalarKind::Int)), "put_int");
    assert_eq!(marshal::reader(TypeCategory::ScalarArray(ScalarKind::Bool)), "get_bool_array");
    assert_eq!(marshal::writer(TypeCategory::TextSeqList), "put_char_seq_list");
    assert_eq!(marshal::reader(TypeCategory::SparseRecords), "get_sparse_records");
    assert_eq!(marshal::writer(TypeCategory::SizeF), "put_size_f");
}

#[test]
fn test_marshal_write_forms() {
    let data = quote::format_ident!("data");
    let value = quote::quote!(args.0);

    let serial = marshal::emit_write(TypeCategory::Serializable, &data, "s", value.clone());
    assert_eq!(compact(&serial.to_string()), r#"data.put_serializable("s",&args.0)?;"#);

    let list = marshal::emit_write(TypeCategory::IntList, &data, "ids", value.clone());
    assert_eq!(compact(&list.to_string()), r#"data.put_int_list("ids",&args.0[..]);"#);

    let text = marshal::emit_write(TypeCategory::Text, &data, "words", value);
    assert_eq!(compact(&text.to_string()), r#"data.put_text("words",args.0);"#);

    let read = marshal::emit_read(TypeCategory::Record, &data, "at");
    assert_eq!(compact(&read.to_string()), r#"data.get_record("at")?"#);
}

// ============================================================================
// Generation
// ============================================================================

#[test]
fn test_generate_messenger() {
    let decl = Declaration::interface(greeter(), TransportKind::CrossProcess);
    let generated = generate(&decl, &Options::new()).expect("generated");

    assert_eq!(generated.proxy.to_string(), "GreeterMessenger");
    assert_eq!(generated.dispatcher.to_string(), "GreeterMessengerDispatcher");
    assert_eq!(generated.plans.len(), 2);

    let source = compact(&generated.source());
    assert!(source.contains("pubconstLAST_METHOD_ID:u32=2u32;"));
    assert!(source.contains(r#"data.put_text("words",args.0);"#));
    assert!(source.contains(r#"data.get_text("words")?"#));
    assert!(source.contains("self.sender.send(::courier::Envelope::new(1u32));"));
    assert!(source.contains("_=>::courier::Outcome::unknown(\"Greeter\",what)"));

    syn::parse2::<syn::File>(generated.tokens).expect("emitted code parses");
}

#[test]
fn test_generate_handler() -> anyhow::Result<()> {
    let decl = Declaration::interface(greeter(), TransportKind::DirectLocal);
    let generated = generate(&decl, &Options::new()).expect("generated");

    assert_eq!(generated.proxy.to_string(), "GreeterHandler");
    assert!(generated.source().contains("Panics when called outside a tokio runtime."));
    let source = compact(&generated.source());
    assert!(source.contains("::courier::Envelope::with_args(2u32,(words,))"));
    assert!(source.contains("into_args::<(::std::string::String,)>()"));
    assert!(source.contains("ReceiverHandle::weak(receiver)"));
    assert!(!source.contains("put_text"));

    syn::parse2::<syn::File>(generated.tokens)?;
    Ok(())
}

#[test]
fn test_unsupported_parameter_only_fails_cross_process() {
    let spec = InterfaceSpec::new("Store").method(
        MethodSpec::new("put").param("entries", TypeDesc::Map(vec![TypeDesc::Text, TypeDesc::Text])),
    );

    let remote = generate(
        &Declaration::interface(spec.clone(), TransportKind::CrossProcess),
        &Options::new(),
    );
    let diagnostics = remote.expect_err("cross-process rejects maps");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, ErrorKind::UnsupportedParameterType);
    assert_eq!(diagnostics[0].param.as_deref(), Some("entries"));
    assert!(diagnostics[0].to_string().contains("Store::put(entries: HashMap<String, String>)"));

    let local = generate(&Declaration::interface(spec, TransportKind::DirectLocal), &Options::new());
    assert!(local.is_ok());
}

#[test]
fn test_not_an_interface() {
    let decl = Declaration::other("Config", "struct", TransportKind::CrossProcess);
    let diagnostics = generate(&decl, &Options::new()).expect_err("rejected");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, ErrorKind::NotAnInterface);
    assert_eq!(diagnostics[0].interface, "Config");
}

#[test]
fn test_output_name_and_runtime_path() {
    let decl = Declaration::interface(greeter(), TransportKind::CrossProcess).output_name("Outbox");
    let options = Options::new().runtime(parse_quote!(crate::rt));
    let generated = generate(&decl, &options).expect("generated");

    assert_eq!(generated.proxy.to_string(), "Outbox");
    assert_eq!(generated.dispatcher.to_string(), "OutboxDispatcher");
    assert!(compact(&generated.source()).contains("crate::rt::RemoteSender"));

    let bad = Declaration::interface(greeter(), TransportKind::CrossProcess).output_name("not valid");
    let diagnostics = generate(&bad, &Options::new()).expect_err("rejected");
    assert_eq!(diagnostics[0].kind, ErrorKind::UnsupportedSignature);
}

#[test]
fn test_generate_all_keeps_going() {
    let decls = vec![
        Declaration::other("Config", "struct", TransportKind::CrossProcess),
        Declaration::interface(greeter(), TransportKind::CrossProcess),
        Declaration::interface(
            InterfaceSpec::new("Broken").method(MethodSpec::new("get").returns("i32")),
            TransportKind::DirectLocal,
        ),
        Declaration::interface(greeter(), TransportKind::DirectLocal),
    ];
    let batch = generate_all(&decls, &Options::new());

    assert!(!batch.is_ok());
    assert_eq!(batch.outputs.len(), 2);
    let kinds: Vec<ErrorKind> = batch.diagnostics.iter().map(|d| d.kind).collect();
    assert_eq!(kinds, vec![ErrorKind::NotAnInterface, ErrorKind::NonVoidMethod]);
}

#[test]
fn test_min_level_becomes_doc() {
    let spec = InterfaceSpec::new("Camera").method(MethodSpec::new("resize").param("size", TypeDesc::Size));
    let generated = generate(
        &Declaration::interface(spec, TransportKind::CrossProcess),
        &Options::new(),
    )
    .expect("generated");
    assert_eq!(generated.plans[0].min_level, Some(21));
    assert!(generated.source().contains("Requires platform level 21."));
}

// ============================================================================
// Lowering
// ============================================================================

#[test]
fn test_lower_trait() {
    let item: syn::ItemTrait = parse_quote! {
        pub trait Canvas {
            fn clear(&self);
            fn draw(&self, at: Point, label: String, tags: Vec<CharSeq>, pixels: Box<[i32]>);
            fn tune(&self, settings: Settings, sizes: courier::SparseMap<Point>, raw: Vec<u8>);
        }
    };
    let known = KnownTypes::new().record("Point").serializable("Settings");
    let spec = syntax::lower_trait(&item, &known);

    assert_eq!(spec.name, "Canvas");
    assert!(!spec.generic);
    let draw = &spec.methods[1];
    let descs: Vec<&TypeDesc> = draw.params.iter().map(|p| &p.desc).collect();
    assert_eq!(
        descs,
        vec![
            &TypeDesc::record("Point"),
            &TypeDesc::Text,
            &TypeDesc::list(TypeDesc::TextSeq),
            &TypeDesc::array(TypeDesc::Scalar(ScalarKind::Int)),
        ]
    );

    let tune = &spec.methods[2];
    assert_eq!(tune.params[0].desc, TypeDesc::serializable("Settings"));
    assert_eq!(tune.params[1].desc, TypeDesc::sparse(TypeDesc::record("Point")));
    assert_eq!(
        classify(&tune.params[2].desc),
        Classification::Unsupported,
        "u8 is not one of the scalar kinds"
    );
}

#[test]
fn test_lower_flags_bad_signatures() {
    let item: syn::ItemTrait = parse_quote! {
        trait Odd {
            fn owned(self);
            fn exclusive(&mut self);
            fn generic<T>(&self, value: T);
            fn free(value: i32);
            fn counted(&self) -> usize;
            fn fine(&self, _: i64);
        }
    };
    let spec = syntax::lower_trait(&item, &KnownTypes::new());
    let flagged: Vec<bool> = spec.methods.iter().map(|m| m.unsupported.is_some()).collect();
    assert_eq!(flagged, vec![true, true, true, true, false, false]);
    assert_eq!(spec.methods[5].params[0].name, "__arg0");

    let diagnostics = registry::validate(&spec);
    assert_eq!(diagnostics.len(), 5);
}

#[test]
fn test_lower_non_trait() {
    let item: syn::Item = parse_quote! {
        struct Config { verbose: bool }
    };
    let decl = syntax::lower_item(&item, &KnownTypes::new(), TransportKind::CrossProcess);
    let diagnostics = generate(&decl, &Options::new()).expect_err("rejected");
    assert_eq!(diagnostics[0].kind, ErrorKind::NotAnInterface);
    assert!(diagnostics[0].detail.contains("struct"));
}

#[test]
fn test_lowered_trait_generates() -> anyhow::Result<()> {
    let item: syn::ItemTrait = parse_quote! {
        pub trait Canvas {
            fn clear(&self);
            fn draw(&self, at: Point, label: String, tags: Vec<CharSeq>);
        }
    };
    let known = KnownTypes::new().record("Point");
    let decl = Declaration::interface(syntax::lower_trait(&item, &known), TransportKind::CrossProcess);
    let generated = generate(&decl, &Options::new()).expect("generated");

    let source = compact(&generated.source());
    assert!(source.contains("fndraw(&self,at:Point,label:String,tags:Vec<CharSeq>)"));
    assert!(source.contains(r#"data.put_record("at",&args.0);"#));
    assert!(source.contains(r#"data.put_char_seq_list("tags",&args.2[..]);"#));
    assert!(source.contains("<RasCanvas>::draw(&*receiver,args.0,args.1,args.2);"));
    syn::parse2::<syn::File>(generated.tokens)?;
    Ok(())
}

#[test]
fn test_placeholder_names_do_not_clash() -> anyhow::Result<()> {
    let item: syn::ItemTrait = parse_quote! {
        trait Pair {
            fn set(&self, _: i32, arg0: i32);
        }
    };
    let spec = syntax::lower_trait(&item, &KnownTypes::new());
    let names: Vec<&str> = spec.methods[0].params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["__arg0", "arg0"]);

    let decl = Declaration::interface(spec, TransportKind::CrossProcess);
    let generated = generate(&decl, &Options::new()).expect("generated");
    let source = compact(&generated.source());
    assert!(source.contains("fnset(&self,__arg0:i32,arg0:i32)"));
    syn::parse2::<syn::File>(generated.tokens)?;
    Ok(())
}

#[test]
fn test_listed_names_shadow_builtins() {
    let item: syn::ItemTrait = parse_quote! {
        trait Layout {
            fn place(&self, size: Size, fallback: courier::SizeF);
        }
    };
    let spec = syntax::lower_trait(&item, &KnownTypes::new().record("Size"));
    assert_eq!(spec.methods[0].params[0].desc, TypeDesc::record("Size"));
    assert_eq!(spec.methods[0].params[1].desc, TypeDesc::SizeF);

    let decl = Declaration::interface(spec, TransportKind::CrossProcess);
    let generated = generate(&decl, &Options::new()).expect("generated");
    let source = compact(&generated.source());
    assert!(source.contains(r#"data.put_record("size",&args.0);"#));
    assert!(!source.contains(r#"put_size("size""#));
}

#[test]
fn test_rejects_params_that_borrow() {
    let item: syn::Item = parse_quote! {
        trait Log {
            type Sink;
            const LEVEL: u8;
            const DEFAULT_LEVEL: u8 = 3;
            fn write(&self, line: &str);
            fn show(&self, v: impl std::fmt::Display);
            fn tag(&self, label: std::borrow::Cow<'_, str>, extra: Vec<(i32, &'static str)>);
            fn keep(&self, line: &'static str, owned: String);
        }
    };
    let decl = syntax::lower_item(&item, &KnownTypes::new(), TransportKind::DirectLocal);
    let diagnostics = generate(&decl, &Options::new()).expect_err("rejected");

    let found: Vec<(ErrorKind, Option<&str>)> =
        diagnostics.iter().map(|d| (d.kind, d.param.as_deref())).collect();
    assert_eq!(
        found,
        vec![
            (ErrorKind::UnsupportedSignature, None),
            (ErrorKind::UnsupportedSignature, None),
            (ErrorKind::UnsupportedSignature, Some("line")),
            (ErrorKind::UnsupportedSignature, Some("v")),
            (ErrorKind::UnsupportedSignature, Some("label")),
        ]
    );
    assert!(diagnostics[0].detail.contains("associated type `Sink`"));
    assert!(diagnostics[1].detail.contains("associated constant `LEVEL`"));
    assert!(diagnostics[2].method.as_deref().is_some_and(|m| m.starts_with("write(")));
    assert!(diagnostics[2].detail.contains("borrowed parameter"));
    assert!(diagnostics[3].method.as_deref().is_some_and(|m| m.starts_with("show(")));
    assert!(diagnostics[4].detail.contains("only `'static` data can be queued"));
}

#[test]
fn test_static_borrows_are_queued() -> anyhow::Result<()> {
    let item: syn::ItemTrait = parse_quote! {
        trait Log {
            const DEFAULT_LEVEL: u8 = 3;
            fn keep(&self, line: &'static str, label: std::borrow::Cow<'static, str>);
        }
    };
    let spec = syntax::lower_trait(&item, &KnownTypes::new());
    assert!(spec.other_items.is_empty());
    assert!(spec.methods[0].params.iter().all(|p| p.unsupported.is_none()));

    let decl = Declaration::interface(spec, TransportKind::DirectLocal);
    let generated = generate(&decl, &Options::new()).expect("generated");
    syn::parse2::<syn::File>(generated.tokens)?;
    Ok(())
}
