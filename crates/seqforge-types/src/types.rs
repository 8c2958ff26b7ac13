//! Type references used by the operation catalog and the sequence engine.
//!
//! A [`TypeRef`] is deliberately shallow: it names a type, its generic
//! arguments and (for arrays) its component type. Subtyping is not encoded
//! here; [`is_assignable`] consults a caller-supplied supertype lookup, which
//! the [`Catalog`](crate::Catalog) provides.
//!
//! ## Categories
//!
//! ```text
//!   primitive-like   boolean char byte short int long float double String
//!                    Class<?> (type literal)  enums
//!   reference        classes (optionally generic)  arrays  Object (top)
//!   unresolved       type variables, bound through TypeBindings
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Built-in value types, including `String`, which behaves as a nullable
/// primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    Boolean,
    Char,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
}

impl Primitive {
    /// Source-level name of the primitive.
    pub fn name(&self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Char => "char",
            Primitive::Byte => "byte",
            Primitive::Short => "short",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::String => "String",
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.widening_rank().is_some()
    }

    fn widening_rank(&self) -> Option<u8> {
        match self {
            Primitive::Byte => Some(0),
            Primitive::Short => Some(1),
            Primitive::Int => Some(2),
            Primitive::Long => Some(3),
            Primitive::Float => Some(4),
            Primitive::Double => Some(5),
            _ => None,
        }
    }

    /// Whether a value of `self` may be passed where `target` is expected.
    ///
    /// Numeric types widen along byte, short, int, long, float, double.
    /// `char` never widens into a numeric target.
    pub fn widens_to(&self, target: Primitive) -> bool {
        if *self == target {
            return true;
        }
        match (self.widening_rank(), target.widening_rank()) {
            (Some(from), Some(to)) => from <= to,
            _ => false,
        }
    }
}

/// A reference to a type known to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    /// Result type of operations that produce no value.
    Void,
    /// The universal top type every reference type is assignable to.
    Top,
    Primitive(Primitive),
    /// A class literal (`Foo.class`).
    TypeLiteral,
    /// An enumeration; constants are looked up through the catalog.
    Enum(String),
    Array(Box<TypeRef>),
    Class {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<TypeRef>,
    },
    /// An unbound type parameter.
    Var(String),
}

impl TypeRef {
    /// Non-generic class type.
    pub fn class(name: impl Into<String>) -> Self {
        TypeRef::Class {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Generic class type with explicit arguments.
    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        TypeRef::Class {
            name: name.into(),
            args,
        }
    }

    pub fn array(element: TypeRef) -> Self {
        TypeRef::Array(Box::new(element))
    }

    pub fn var(name: impl Into<String>) -> Self {
        TypeRef::Var(name.into())
    }

    pub fn int() -> Self {
        TypeRef::Primitive(Primitive::Int)
    }

    pub fn string() -> Self {
        TypeRef::Primitive(Primitive::String)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeRef::Void)
    }

    pub fn is_top(&self) -> bool {
        matches!(self, TypeRef::Top)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, TypeRef::Primitive(Primitive::String))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeRef::Array(_))
    }

    /// Primitives, strings, type literals and enums: values the engine can
    /// write down as a literal without calling anything.
    pub fn is_primitive_like(&self) -> bool {
        matches!(
            self,
            TypeRef::Primitive(_) | TypeRef::TypeLiteral | TypeRef::Enum(_)
        )
    }

    /// Whether `null` is a legal value of this type.
    pub fn is_nullable(&self) -> bool {
        match self {
            TypeRef::Void | TypeRef::Var(_) => false,
            TypeRef::Primitive(p) => *p == Primitive::String,
            _ => true,
        }
    }

    /// Component type of an array.
    pub fn component(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::Array(element) => Some(element.as_ref()),
            _ => None,
        }
    }

    /// Class name for class types.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            TypeRef::Class { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Whether any unbound type parameter occurs in this type.
    pub fn has_type_vars(&self) -> bool {
        match self {
            TypeRef::Var(_) => true,
            TypeRef::Array(element) => element.has_type_vars(),
            TypeRef::Class { args, .. } => args.iter().any(TypeRef::has_type_vars),
            _ => false,
        }
    }

    /// Replace bound type parameters; unbound ones are left in place.
    pub fn substitute(&self, bindings: &TypeBindings) -> TypeRef {
        match self {
            TypeRef::Var(name) => bindings
                .get(name)
                .cloned()
                .unwrap_or_else(|| self.clone()),
            TypeRef::Array(element) => TypeRef::array(element.substitute(bindings)),
            TypeRef::Class { name, args } => TypeRef::Class {
                name: name.clone(),
                args: args.iter().map(|a| a.substitute(bindings)).collect(),
            },
            other => other.clone(),
        }
    }

    /// Replace every remaining type parameter with the top type.
    pub fn erase_vars(&self) -> TypeRef {
        match self {
            TypeRef::Var(_) => TypeRef::Top,
            TypeRef::Array(element) => TypeRef::array(element.erase_vars()),
            TypeRef::Class { name, args } => TypeRef::Class {
                name: name.clone(),
                args: args.iter().map(TypeRef::erase_vars).collect(),
            },
            other => other.clone(),
        }
    }

    /// Unqualified name used to derive variable names (`com.acme.Foo` -> `Foo`).
    pub fn simple_name(&self) -> String {
        match self {
            TypeRef::Void => "void".to_string(),
            TypeRef::Top => "Object".to_string(),
            TypeRef::Primitive(p) => p.name().to_string(),
            TypeRef::TypeLiteral => "Class".to_string(),
            TypeRef::Enum(name) | TypeRef::Class { name, .. } => {
                name.rsplit('.').next().unwrap_or(name.as_str()).to_string()
            }
            TypeRef::Array(element) => format!("{}Array", element.simple_name()),
            TypeRef::Var(name) => name.clone(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Void => write!(f, "void"),
            TypeRef::Top => write!(f, "Object"),
            TypeRef::Primitive(p) => write!(f, "{}", p.name()),
            TypeRef::TypeLiteral => write!(f, "Class<?>"),
            TypeRef::Enum(name) => write!(f, "{}", name),
            TypeRef::Array(element) => write!(f, "{}[]", element),
            TypeRef::Class { name, args } => {
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    let rendered: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                    write!(f, "<{}>", rendered.join(", "))?;
                }
                Ok(())
            }
            TypeRef::Var(name) => write!(f, "{}", name),
        }
    }
}

/// Mapping from type-parameter names to concrete types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeBindings {
    bindings: BTreeMap<String, TypeRef>,
}

impl TypeBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, ty: TypeRef) {
        self.bindings.insert(name.into(), ty);
    }

    pub fn get(&self, name: &str) -> Option<&TypeRef> {
        self.bindings.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Bindings implied by using `concrete` where `declared` was expected.
    ///
    /// Only direct generic arguments that are type variables on the declared
    /// side and fully concrete on the other are bound:
    ///
    /// ```text
    ///   declared  Box<T>        concrete  Box<Foo>     =>  T -> Foo
    ///   declared  Pair<K, V>    concrete  Pair<int,?>  =>  K -> int
    /// ```
    pub fn from_receiver(declared: &TypeRef, concrete: &TypeRef) -> Self {
        let mut out = Self::new();
        if let (
            TypeRef::Class {
                name: declared_name,
                args: declared_args,
            },
            TypeRef::Class {
                name: concrete_name,
                args: concrete_args,
            },
        ) = (declared, concrete)
        {
            if declared_name == concrete_name && declared_args.len() == concrete_args.len() {
                for (d, c) in declared_args.iter().zip(concrete_args) {
                    if let TypeRef::Var(name) = d {
                        if !c.has_type_vars() {
                            out.bind(name.clone(), c.clone());
                        }
                    }
                }
            }
        }
        out
    }

    /// Union of both binding sets; entries in `other` win.
    pub fn merged(&self, other: &TypeBindings) -> TypeBindings {
        let mut out = self.clone();
        for (name, ty) in &other.bindings {
            out.bindings.insert(name.clone(), ty.clone());
        }
        out
    }
}

/// Whether a value of type `from` can be used where `to` is expected.
///
/// `supertypes` returns the declared direct supertypes of a class name; the
/// lookup is followed transitively.
pub fn is_assignable(from: &TypeRef, to: &TypeRef, supertypes: &dyn Fn(&str) -> Vec<String>) -> bool {
    match (from, to) {
        (TypeRef::Void, _) | (_, TypeRef::Void) => false,
        (_, TypeRef::Top) => true,
        (TypeRef::Primitive(a), TypeRef::Primitive(b)) => a.widens_to(*b),
        (TypeRef::Array(a), TypeRef::Array(b)) => {
            if a.is_primitive_like() || b.is_primitive_like() {
                a == b
            } else {
                is_assignable(a, b, supertypes)
            }
        }
        (
            TypeRef::Class {
                name: from_name,
                args: from_args,
            },
            TypeRef::Class {
                name: to_name,
                args: to_args,
            },
        ) => {
            if from_name == to_name {
                return args_compatible(from_args, to_args);
            }
            let mut seen = BTreeSet::new();
            let mut pending = vec![from_name.clone()];
            while let Some(current) = pending.pop() {
                for parent in supertypes(&current) {
                    if &parent == to_name {
                        return true;
                    }
                    if seen.insert(parent.clone()) {
                        pending.push(parent);
                    }
                }
            }
            false
        }
        (a, b) => a == b,
    }
}

fn args_compatible(from: &[TypeRef], to: &[TypeRef]) -> bool {
    // raw types match any parameterization
    if from.is_empty() || to.is_empty() {
        return true;
    }
    from.len() == to.len()
        && from.iter().zip(to).all(|(a, b)| {
            a == b || matches!(a, TypeRef::Var(_)) || matches!(b, TypeRef::Var(_))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_supertypes(_: &str) -> Vec<String> {
        Vec::new()
    }

    #[test]
    fn test_numeric_widening() {
        assert!(Primitive::Int.widens_to(Primitive::Long));
        assert!(Primitive::Byte.widens_to(Primitive::Double));
        assert!(!Primitive::Long.widens_to(Primitive::Int));
        assert!(!Primitive::Char.widens_to(Primitive::Int), "char must not feed numeric targets");
        assert!(!Primitive::Boolean.widens_to(Primitive::Int));
    }

    #[test]
    fn test_everything_but_void_is_assignable_to_top() {
        for ty in [
            TypeRef::int(),
            TypeRef::string(),
            TypeRef::class("Foo"),
            TypeRef::array(TypeRef::class("Foo")),
        ] {
            assert!(is_assignable(&ty, &TypeRef::Top, &no_supertypes), "{} -> Object", ty);
        }
        assert!(!is_assignable(&TypeRef::Void, &TypeRef::Top, &no_supertypes));
        assert!(!is_assignable(&TypeRef::Top, &TypeRef::class("Foo"), &no_supertypes));
    }

    #[test]
    fn test_class_assignability_follows_supertypes_transitively() {
        let supertypes = |name: &str| match name {
            "ArrayList" => vec!["AbstractList".to_string()],
            "AbstractList" => vec!["List".to_string()],
            _ => Vec::new(),
        };
        assert!(is_assignable(
            &TypeRef::class("ArrayList"),
            &TypeRef::class("List"),
            &supertypes
        ));
        assert!(!is_assignable(
            &TypeRef::class("List"),
            &TypeRef::class("ArrayList"),
            &supertypes
        ));
    }

    #[test]
    fn test_arrays() {
        let sup = |name: &str| {
            if name == "Sub" {
                vec!["Base".to_string()]
            } else {
                Vec::new()
            }
        };
        assert!(is_assignable(
            &TypeRef::array(TypeRef::class("Sub")),
            &TypeRef::array(TypeRef::class("Base")),
            &sup
        ));
        assert!(!is_assignable(
            &TypeRef::array(TypeRef::Primitive(Primitive::Byte)),
            &TypeRef::array(TypeRef::int()),
            &sup
        ));
    }

    #[test]
    fn test_generic_args_and_raw_types() {
        let boxed_foo = TypeRef::generic("Box", vec![TypeRef::class("Foo")]);
        let boxed_bar = TypeRef::generic("Box", vec![TypeRef::class("Bar")]);
        let boxed_t = TypeRef::generic("Box", vec![TypeRef::var("T")]);
        let raw = TypeRef::class("Box");
        assert!(is_assignable(&boxed_foo, &raw, &no_supertypes));
        assert!(is_assignable(&boxed_t, &boxed_foo, &no_supertypes));
        assert!(!is_assignable(&boxed_foo, &boxed_bar, &no_supertypes));
    }

    #[test]
    fn test_bindings_from_receiver_and_substitute() {
        let declared = TypeRef::generic("Box", vec![TypeRef::var("T")]);
        let concrete = TypeRef::generic("Box", vec![TypeRef::class("Foo")]);
        let bindings = TypeBindings::from_receiver(&declared, &concrete);
        assert_eq!(bindings.get("T"), Some(&TypeRef::class("Foo")));

        let param = TypeRef::array(TypeRef::var("T"));
        assert_eq!(
            param.substitute(&bindings),
            TypeRef::array(TypeRef::class("Foo"))
        );
        assert_eq!(TypeRef::var("U").substitute(&bindings), TypeRef::var("U"));
        assert_eq!(TypeRef::var("U").erase_vars(), TypeRef::Top);
    }

    #[test]
    fn test_display_and_simple_name() {
        let ty = TypeRef::generic("java.util.Map", vec![TypeRef::string(), TypeRef::int()]);
        assert_eq!(ty.to_string(), "java.util.Map<String, int>");
        assert_eq!(ty.simple_name(), "Map");
        assert_eq!(TypeRef::array(TypeRef::class("a.Foo")).simple_name(), "FooArray");
    }

    #[test]
    fn test_categories() {
        assert!(TypeRef::Enum("Color".into()).is_primitive_like());
        assert!(TypeRef::string().is_nullable());
        assert!(!TypeRef::int().is_nullable());
        assert!(TypeRef::class("Foo").is_nullable());
        assert!(!TypeRef::class("Foo").is_primitive_like());
    }
}
