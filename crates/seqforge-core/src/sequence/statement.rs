//! Statements: one operation invocation plus its result variable.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use seqforge_types::{Operation, TypeRef};
use smallvec::SmallVec;

use super::variable::{VarId, Variable};

/// Value written directly into a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Literal {
    Boolean(bool),
    Char(char),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    /// Constant name of the enum given by the variable's type.
    EnumConstant(String),
    /// Class literal.
    Type(TypeRef),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Boolean(v) => write!(f, "{}", v),
            Literal::Char(c) => write!(f, "{:?}", c),
            Literal::Byte(v) => write!(f, "(byte) {}", v),
            Literal::Short(v) => write!(f, "(short) {}", v),
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Long(v) => write!(f, "{}L", v),
            Literal::Float(v) => write!(f, "{:?}F", v),
            Literal::Double(v) => write!(f, "{:?}", v),
            Literal::String(s) => write!(f, "{:?}", s),
            Literal::EnumConstant(name) => write!(f, "{}", name),
            Literal::Type(ty) => write!(f, "{}.class", ty),
        }
    }
}

/// Closed set of statement kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Literal(Literal),
    Null,
    Constructor {
        op: Arc<Operation>,
        args: Vec<VarId>,
    },
    Method {
        op: Arc<Operation>,
        receiver: Option<VarId>,
        args: Vec<VarId>,
    },
    /// Field read into a fresh variable.
    Field {
        op: Arc<Operation>,
        source: Option<VarId>,
    },
    /// Array allocation of the result variable's type.
    Array { length: usize },
    /// Writes `value` into the result variable, which is an array cell or a
    /// field access.
    Assignment { value: VarId },
}

/// A statement and the variable it defines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub kind: StatementKind,
    pub result: Variable,
}

impl Statement {
    pub fn new(kind: StatementKind, result: Variable) -> Self {
        Self { kind, result }
    }

    pub fn id(&self) -> VarId {
        self.result.id
    }

    /// The catalog operation invoked, if any.
    pub fn operation(&self) -> Option<&Arc<Operation>> {
        match &self.kind {
            StatementKind::Constructor { op, .. }
            | StatementKind::Method { op, .. }
            | StatementKind::Field { op, .. } => Some(op),
            _ => None,
        }
    }

    /// Variables read by the statement: receiver/source first, then
    /// arguments or the assigned value.
    pub fn operands(&self) -> SmallVec<[VarId; 4]> {
        let mut out = SmallVec::new();
        match &self.kind {
            StatementKind::Constructor { args, .. } => out.extend(args.iter().copied()),
            StatementKind::Method { receiver, args, .. } => {
                out.extend(receiver.iter().copied());
                out.extend(args.iter().copied());
            }
            StatementKind::Field { source, .. } => out.extend(source.iter().copied()),
            StatementKind::Assignment { value } => out.push(*value),
            StatementKind::Literal(_) | StatementKind::Null | StatementKind::Array { .. } => {}
        }
        out
    }

    /// Every variable the statement depends on: its operands plus the
    /// back-reference of its own result.
    pub fn references(&self) -> SmallVec<[VarId; 4]> {
        let mut out = self.operands();
        if let Some(owner) = self.result.back_reference() {
            if !out.contains(&owner) {
                out.push(owner);
            }
        }
        out
    }

    pub fn references_var(&self, id: VarId) -> bool {
        self.references().contains(&id)
    }

    /// Replace every operand equal to `old` with `new`; the result's
    /// back-reference is left alone. Returns whether anything changed.
    pub fn replace_operand(&mut self, old: VarId, new: VarId) -> bool {
        let mut changed = false;
        let mut swap = |slot: &mut VarId| {
            if *slot == old {
                *slot = new;
                changed = true;
            }
        };
        match &mut self.kind {
            StatementKind::Constructor { args, .. } => args.iter_mut().for_each(&mut swap),
            StatementKind::Method { receiver, args, .. } => {
                receiver.iter_mut().for_each(&mut swap);
                args.iter_mut().for_each(&mut swap);
            }
            StatementKind::Field { source, .. } => source.iter_mut().for_each(&mut swap),
            StatementKind::Assignment { value } => swap(value),
            StatementKind::Literal(_) | StatementKind::Null | StatementKind::Array { .. } => {}
        }
        changed
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, StatementKind::Literal(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, StatementKind::Null)
    }

    /// Literal or `null`: statements without any dependencies of their own.
    pub fn is_primitive(&self) -> bool {
        self.is_literal() || self.is_null()
    }

    pub fn is_assignment(&self) -> bool {
        matches!(self.kind, StatementKind::Assignment { .. })
    }

    pub fn array_length(&self) -> Option<usize> {
        match self.kind {
            StatementKind::Array { length } => Some(length),
            _ => None,
        }
    }

    /// Short kind label for logging.
    pub fn label(&self) -> &'static str {
        match self.kind {
            StatementKind::Literal(_) => "literal",
            StatementKind::Null => "null",
            StatementKind::Constructor { .. } => "constructor",
            StatementKind::Method { .. } => "method",
            StatementKind::Field { .. } => "field",
            StatementKind::Array { .. } => "array",
            StatementKind::Assignment { .. } => "assignment",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::variable::VariableKind;

    fn value(id: u32, ty: TypeRef) -> Variable {
        Variable {
            id: VarId(id),
            ty,
            kind: VariableKind::Value,
            distance: 0,
        }
    }

    #[test]
    fn test_method_operands_and_replace() {
        let op = Arc::new(Operation::method(
            TypeRef::class("Foo"),
            "swap",
            vec![TypeRef::int(), TypeRef::int()],
            TypeRef::Void,
        ));
        let mut stmt = Statement::new(
            StatementKind::Method {
                op,
                receiver: Some(VarId(0)),
                args: vec![VarId(1), VarId(1)],
            },
            value(2, TypeRef::Void),
        );
        assert_eq!(stmt.operands().as_slice(), &[VarId(0), VarId(1), VarId(1)]);
        assert!(stmt.replace_operand(VarId(1), VarId(5)));
        assert_eq!(stmt.operands().as_slice(), &[VarId(0), VarId(5), VarId(5)]);
        assert!(!stmt.replace_operand(VarId(9), VarId(0)));
    }

    #[test]
    fn test_assignment_references_include_back_reference() {
        let stmt = Statement::new(
            StatementKind::Assignment { value: VarId(2) },
            Variable {
                id: VarId(3),
                ty: TypeRef::int(),
                kind: VariableKind::ArrayCell {
                    array: VarId(1),
                    index: 0,
                },
                distance: 0,
            },
        );
        assert_eq!(stmt.operands().as_slice(), &[VarId(2)]);
        assert_eq!(stmt.references().as_slice(), &[VarId(2), VarId(1)]);
        assert!(stmt.references_var(VarId(1)));
    }

    #[test]
    fn test_literal_display() {
        assert_eq!(Literal::Long(5).to_string(), "5L");
        assert_eq!(Literal::String("a\"b".into()).to_string(), "\"a\\\"b\"");
        assert_eq!(Literal::Type(TypeRef::class("Foo")).to_string(), "Foo.class");
        assert_eq!(Literal::Double(1.0).to_string(), "1.0");
    }
}
