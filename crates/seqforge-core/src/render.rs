//! Rendering finished sequences as text.
//!
//! Renderers consume sequences; nothing they produce feeds back into
//! construction or mutation. [`PseudoCodeRenderer`] prints a Java-like
//! listing used for `Display` and debug logs:
//!
//! ```text
//! Foo foo0 = new Foo();
//! int int0 = 5;
//! foo0.setX(int0);   // threw IllegalStateException
//! ```

use std::collections::{BTreeMap, HashMap};

use seqforge_types::TypeRef;

use crate::sequence::{Sequence, Statement, StatementKind, VarId, VariableKind};

/// Turns a sequence and its per-position exception messages into text.
pub trait Renderer {
    fn render(&self, sequence: &Sequence, exceptions: &BTreeMap<usize, String>) -> String;
}

/// Plain pseudo-code listing, one statement per line.
#[derive(Debug, Default, Clone, Copy)]
pub struct PseudoCodeRenderer;

impl Renderer for PseudoCodeRenderer {
    fn render(&self, sequence: &Sequence, exceptions: &BTreeMap<usize, String>) -> String {
        let names = VariableNames::assign(sequence);
        let mut out = String::new();
        for (pos, stmt) in sequence.iter().enumerate() {
            out.push_str(&render_statement(sequence, &names, stmt));
            if let Some(ex) = exceptions.get(&pos) {
                out.push_str("   // threw ");
                out.push_str(ex);
            }
            out.push('\n');
        }
        out
    }
}

/// `foo0`, `foo1`, `int0`, ... in order of definition.
struct VariableNames {
    names: HashMap<VarId, String>,
}

impl VariableNames {
    fn assign(sequence: &Sequence) -> Self {
        let mut counters: HashMap<String, usize> = HashMap::new();
        let mut names = HashMap::new();
        for stmt in sequence {
            let var = &stmt.result;
            if var.ty.is_void() || var.is_array_cell() || var.is_field_access() {
                continue;
            }
            let base = lower_first(&var.ty.simple_name());
            let n = counters.entry(base.clone()).or_insert(0);
            names.insert(var.id, format!("{}{}", base, n));
            *n += 1;
        }
        Self { names }
    }

    fn name(&self, sequence: &Sequence, id: VarId) -> String {
        if let Some(name) = self.names.get(&id) {
            return name.clone();
        }
        let Some(var) = sequence.variable(id) else {
            return id.to_string();
        };
        match &var.kind {
            VariableKind::ArrayCell { array, index } => {
                format!("{}[{}]", self.name(sequence, *array), index)
            }
            VariableKind::FieldAccess { source, field } => match source {
                Some(src) => format!("{}.{}", self.name(sequence, *src), field.name),
                None => format!("{}.{}", field.owner.simple_name(), field.name),
            },
            _ => id.to_string(),
        }
    }
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn join_args(sequence: &Sequence, names: &VariableNames, args: &[VarId]) -> String {
    args.iter()
        .map(|a| names.name(sequence, *a))
        .collect::<Vec<_>>()
        .join(", ")
}

fn declaration(names: &VariableNames, sequence: &Sequence, stmt: &Statement) -> String {
    format!("{} {}", stmt.result.ty, names.name(sequence, stmt.id()))
}

fn render_statement(sequence: &Sequence, names: &VariableNames, stmt: &Statement) -> String {
    match &stmt.kind {
        StatementKind::Literal(lit) => {
            format!("{} = {};", declaration(names, sequence, stmt), lit)
        }
        StatementKind::Null => format!("{} = null;", declaration(names, sequence, stmt)),
        StatementKind::Constructor { op, args } => format!(
            "{} = new {}({});",
            declaration(names, sequence, stmt),
            op.owner,
            join_args(sequence, names, args)
        ),
        StatementKind::Method { op, receiver, args } => {
            let target = match receiver {
                Some(r) => names.name(sequence, *r),
                None => op.owner.simple_name(),
            };
            let call = format!("{}.{}({})", target, op.name, join_args(sequence, names, args));
            if stmt.result.ty.is_void() {
                format!("{};", call)
            } else {
                format!("{} = {};", declaration(names, sequence, stmt), call)
            }
        }
        StatementKind::Field { op, source } => {
            let target = match source {
                Some(s) => names.name(sequence, *s),
                None => op.owner.simple_name(),
            };
            format!("{} = {}.{};", declaration(names, sequence, stmt), target, op.name)
        }
        StatementKind::Array { length } => {
            let element = stmt.result.ty.component().cloned().unwrap_or(TypeRef::Top);
            format!(
                "{} = new {}[{}];",
                declaration(names, sequence, stmt),
                element,
                length
            )
        }
        StatementKind::Assignment { value } => format!(
            "{} = {};",
            names.name(sequence, stmt.id()),
            names.name(sequence, *value)
        ),
    }
}
