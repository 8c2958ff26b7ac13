//! Catalogs and sequences shared by the integration tests.

use std::io::Write;
use std::sync::Arc;

use seqforge::core::{Literal, StatementKind, VarId, VariableKind};
use seqforge::types::{CatalogBuilder, InMemoryCatalog, Operation, TypeRef};
use seqforge::Sequence;
use tempfile::NamedTempFile;

/// `Foo()` and `void Foo.setX(int)`, with `Foo` as the target type.
pub fn foo_catalog() -> InMemoryCatalog {
    let foo = TypeRef::class("Foo");
    CatalogBuilder::new()
        .target(foo.clone())
        .operation(Operation::constructor(foo.clone(), vec![]))
        .operation(Operation::method(foo, "setX", vec![TypeRef::int()], TypeRef::Void))
        .build()
}

/// A catalog exercising every statement kind: constructors with
/// parameters, a field, arrays, an enum, a subtype and the top type.
#[allow(dead_code)]
pub fn rich_catalog() -> InMemoryCatalog {
    let foo = TypeRef::class("Foo");
    let bar = TypeRef::class("Bar");
    CatalogBuilder::new()
        .target(foo.clone())
        .operation(Operation::constructor(foo.clone(), vec![]))
        .operation(Operation::constructor(foo.clone(), vec![TypeRef::int(), TypeRef::string()]))
        .operation(Operation::method(foo.clone(), "setX", vec![TypeRef::int()], TypeRef::Void))
        .operation(Operation::method(foo.clone(), "getX", vec![], TypeRef::int()))
        .operation(Operation::method(foo.clone(), "setBar", vec![bar.clone()], TypeRef::Void))
        .operation(Operation::method(
            foo.clone(),
            "fill",
            vec![TypeRef::array(TypeRef::int())],
            TypeRef::Void,
        ))
        .operation(Operation::method(
            foo.clone(),
            "paint",
            vec![TypeRef::Enum("Color".into())],
            TypeRef::Void,
        ))
        .operation(Operation::field(foo.clone(), "x", TypeRef::int()))
        .operation(Operation::constructor(bar.clone(), vec![foo.clone()]))
        .operation(Operation::constructor(TypeRef::class("SubBar"), vec![]))
        .operation(Operation::method(bar, "combine", vec![foo.clone(), TypeRef::Top], TypeRef::Void))
        .subtype("SubBar", "Bar")
        .enumeration("Color", ["RED", "GREEN", "BLUE"])
        .build()
}

/// `[foo0 = new Foo(); int0 = 5; foo0.setX(int0)]` built against `catalog`,
/// with the ids of the three variables.
pub fn foo_set_x_sequence(catalog: &InMemoryCatalog) -> (Sequence, Vec<VarId>) {
    let new_foo = Arc::clone(catalog.by_signature("Foo.<init>()").expect("Foo() in catalog"));
    let set_x = Arc::clone(catalog.by_signature("Foo.setX(int)").expect("Foo.setX in catalog"));
    let mut seq = Sequence::new();
    let foo = seq
        .push(
            StatementKind::Constructor { op: new_foo, args: vec![] },
            TypeRef::class("Foo"),
            VariableKind::Value,
            0,
        )
        .unwrap();
    let five = seq
        .push(StatementKind::Literal(Literal::Int(5)), TypeRef::int(), VariableKind::Constant, 0)
        .unwrap();
    let call = seq
        .push(
            StatementKind::Method {
                op: set_x,
                receiver: Some(foo),
                args: vec![five],
            },
            TypeRef::Void,
            VariableKind::Value,
            0,
        )
        .unwrap();
    (seq, vec![foo, five, call])
}

/// Write `contents` to a temporary `.json` file kept alive by the handle.
#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}
