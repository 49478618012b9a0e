use std::fmt;

use serde::Serialize;

use crate::expr::Expr;

/// Types of the target language.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Type {
    Int,
    Bool,
    /// A type variable, named as in source (`a`, `b`, ...).
    Var(String),
    List(Box<Type>),
    Fun(Box<Type>, Box<Type>),
}

impl Type {
    pub fn fun(from: Type, to: Type) -> Type {
        Type::Fun(Box::new(from), Box::new(to))
    }

    pub fn list(elem: Type) -> Type {
        Type::List(Box::new(elem))
    }

    /// Uncurry into (argument types, result type).
    pub fn uncurry(&self) -> (Vec<&Type>, &Type) {
        let mut args = Vec::new();
        let mut node = self;
        while let Type::Fun(from, to) = node {
            args.push(from.as_ref());
            node = to;
        }
        (args, node)
    }

    /// All type-variable names, in first-occurrence order.
    pub fn free_vars(&self) -> Vec<String> {
        fn walk(ty: &Type, out: &mut Vec<String>) {
            match ty {
                Type::Int | Type::Bool => {}
                Type::Var(name) => {
                    if !out.iter().any(|v| v == name) {
                        out.push(name.clone());
                    }
                }
                Type::List(elem) => walk(elem, out),
                Type::Fun(from, to) => {
                    walk(from, out);
                    walk(to, out);
                }
            }
        }
        let mut out = Vec::new();
        walk(self, &mut out);
        out
    }

    pub fn is_monomorphic(&self) -> bool {
        self.free_vars().is_empty()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "Int"),
            Type::Bool => write!(f, "Bool"),
            Type::Var(name) => write!(f, "{name}"),
            Type::List(elem) => write!(f, "[{elem}]"),
            Type::Fun(from, to) => {
                if matches!(from.as_ref(), Type::Fun(_, _)) {
                    write!(f, "({from}) -> {to}")
                } else {
                    write!(f, "{from} -> {to}")
                }
            }
        }
    }
}

/// A type with its variables quantified, as written in a signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Scheme {
    pub vars: Vec<String>,
    pub ty: Type,
}

impl Scheme {
    /// Quantify every variable occurring in `ty`.
    pub fn generalize(ty: Type) -> Scheme {
        Scheme {
            vars: ty.free_vars(),
            ty,
        }
    }

    pub fn mono(ty: Type) -> Scheme {
        Scheme { vars: Vec::new(), ty }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Quantification is implicit in source syntax.
        write!(f, "{}", self.ty)
    }
}

/// A named definition visible to the target and the properties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Binding {
    pub name: String,
    pub scheme: Option<Scheme>,
    pub expr: Expr,
}

impl Binding {
    pub fn new(name: &str, scheme: Option<Scheme>, expr: Expr) -> Binding {
        Binding {
            name: name.to_string(),
            scheme,
            expr,
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            writeln!(f, "{} :: {}", self.name, scheme)?;
        }
        write!(f, "{} = {}", self.name, self.expr)
    }
}

/// A named predicate over the repair candidate. The first parameter binds
/// the candidate; any further parameters are universally quantified and
/// filled by the randomized checker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Property {
    pub name: String,
    pub params: Vec<String>,
    pub body: Expr,
    pub scheme: Option<Scheme>,
}

impl Property {
    /// The property as a standalone function value.
    pub fn as_lambda(&self) -> Expr {
        Expr::lambda(&self.params, self.body.clone())
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            writeln!(f, "{} :: {}", self.name, scheme)?;
        }
        write!(f, "{}", self.name)?;
        for p in &self.params {
            write!(f, " {p}")?;
        }
        write!(f, " = {}", self.body)
    }
}

/// A loaded repair problem: a typed target with one designated repair site
/// (the target's whole expression), the properties it must satisfy, and the
/// auxiliary context bindings visible to both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    pub target: Expr,
    pub target_type: Type,
    pub properties: Vec<Property>,
    pub context: Vec<Binding>,
}

impl Problem {
    /// The target with its declared type ascribed, anchoring inference.
    pub fn ascribed_target(&self) -> Expr {
        Expr::Ascribe(Box::new(self.target.clone()), self.target_type.clone())
    }

    /// A copy of this problem with a different target expression.
    pub fn with_target(&self, target: Expr) -> Problem {
        Problem {
            target,
            ..self.clone()
        }
    }
}
