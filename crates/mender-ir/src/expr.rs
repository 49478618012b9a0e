use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::types::Type;

/// A path of child indices from the root of the repair site's expression.
///
/// Site paths are the location currency of fixes: totally ordered
/// (lexicographically, so a parent sorts before its descendants), with
/// containment as prefixhood. Paths of untouched nodes survive subtree
/// substitution, which is what keeps fixes from successive repair attempts
/// mergeable.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SitePath(pub Vec<usize>);

impl SitePath {
    /// The path of the repair site itself.
    pub fn root() -> Self {
        SitePath(Vec::new())
    }

    /// Extend this path by one child index.
    pub fn child(&self, index: usize) -> Self {
        let mut steps = self.0.clone();
        steps.push(index);
        SitePath(steps)
    }

    /// Whether `self` encloses `other` (strictly or equally).
    pub fn contains(&self, other: &SitePath) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// Whether `self` strictly encloses `other`.
    pub fn strictly_contains(&self, other: &SitePath) -> bool {
        other.0.len() > self.0.len() && self.contains(other)
    }
}

impl fmt::Display for SitePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        let steps: Vec<String> = self.0.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", steps.join("."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Literal {
    Int(i64),
    Bool(bool),
}

/// Expression AST of the target language.
///
/// Infix operators are desugared by the parser into prefix applications of
/// operator variables (`a + b` becomes `(+) a b`), so the search layers only
/// ever see applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Expr {
    Var(String),
    Lit(Literal),
    App(Box<Expr>, Box<Expr>),
    Lambda(String, Box<Expr>),
    /// Recursive let: all bindings are in scope in every bound expression
    /// and in the body.
    Let(Vec<(String, Expr)>, Box<Expr>),
    If(Box<Expr>, Box<Expr>, Box<Expr>),
    ListLit(Vec<Expr>),
    /// Type ascription, `(e :: t)`. Used to anchor typing of repair targets.
    Ascribe(Box<Expr>, Type),
    /// A typed hole, `_`.
    Hole,
}

impl Expr {
    pub fn var(name: &str) -> Expr {
        Expr::Var(name.to_string())
    }

    pub fn int(value: i64) -> Expr {
        Expr::Lit(Literal::Int(value))
    }

    pub fn app(fun: Expr, arg: Expr) -> Expr {
        Expr::App(Box::new(fun), Box::new(arg))
    }

    /// Left-nested application of `fun` to several arguments.
    pub fn apply(fun: Expr, args: Vec<Expr>) -> Expr {
        args.into_iter().fold(fun, Expr::app)
    }

    /// Nested single-parameter lambdas over `params`.
    pub fn lambda(params: &[String], body: Expr) -> Expr {
        params
            .iter()
            .rev()
            .fold(body, |acc, p| Expr::Lambda(p.clone(), Box::new(acc)))
    }

    /// Direct children, in the fixed order that defines site paths.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Var(_) | Expr::Lit(_) | Expr::Hole => Vec::new(),
            Expr::App(fun, arg) => vec![fun, arg],
            Expr::Lambda(_, body) => vec![body],
            Expr::Let(binds, body) => {
                let mut out: Vec<&Expr> = binds.iter().map(|(_, e)| e).collect();
                out.push(body);
                out
            }
            Expr::If(c, t, e) => vec![c, t, e],
            Expr::ListLit(items) => items.iter().collect(),
            Expr::Ascribe(inner, _) => vec![inner],
        }
    }

    /// All subexpression paths, preorder, root first.
    pub fn subexpr_paths(&self) -> Vec<SitePath> {
        let mut out = Vec::new();
        self.collect_paths(&SitePath::root(), &mut out);
        out
    }

    fn collect_paths(&self, at: &SitePath, out: &mut Vec<SitePath>) {
        out.push(at.clone());
        for (i, child) in self.children().into_iter().enumerate() {
            child.collect_paths(&at.child(i), out);
        }
    }

    /// The node at `path`, if the path resolves in this tree.
    pub fn at_path(&self, path: &SitePath) -> Option<&Expr> {
        let mut node = self;
        for &step in &path.0 {
            node = *node.children().get(step)?;
        }
        Some(node)
    }

    /// Replace the node at `path` with `replacement`.
    pub fn replace_at(&self, path: &SitePath, replacement: &Expr) -> Option<Expr> {
        let mut map = BTreeMap::new();
        map.insert(path.clone(), replacement.clone());
        let replaced = self.replace_many(&map);
        // replace_many skips unresolvable paths silently; detect that here.
        if path.0.is_empty() || self.at_path(path).is_some() {
            Some(replaced)
        } else {
            None
        }
    }

    /// Apply several span-keyed replacements in one traversal.
    ///
    /// A node whose path is in the map is substituted and not descended
    /// into, so entries strictly contained in an applied span are skipped.
    /// Paths that do not resolve in this tree are ignored.
    pub fn replace_many(&self, replacements: &BTreeMap<SitePath, Expr>) -> Expr {
        self.replace_walk(&SitePath::root(), replacements)
    }

    fn replace_walk(&self, at: &SitePath, replacements: &BTreeMap<SitePath, Expr>) -> Expr {
        if let Some(replacement) = replacements.get(at) {
            return replacement.clone();
        }
        match self {
            Expr::Var(_) | Expr::Lit(_) | Expr::Hole => self.clone(),
            Expr::App(fun, arg) => Expr::App(
                Box::new(fun.replace_walk(&at.child(0), replacements)),
                Box::new(arg.replace_walk(&at.child(1), replacements)),
            ),
            Expr::Lambda(p, body) => Expr::Lambda(
                p.clone(),
                Box::new(body.replace_walk(&at.child(0), replacements)),
            ),
            Expr::Let(binds, body) => {
                let new_binds = binds
                    .iter()
                    .enumerate()
                    .map(|(i, (n, e))| (n.clone(), e.replace_walk(&at.child(i), replacements)))
                    .collect();
                let body_at = at.child(binds.len());
                Expr::Let(new_binds, Box::new(body.replace_walk(&body_at, replacements)))
            }
            Expr::If(c, t, e) => Expr::If(
                Box::new(c.replace_walk(&at.child(0), replacements)),
                Box::new(t.replace_walk(&at.child(1), replacements)),
                Box::new(e.replace_walk(&at.child(2), replacements)),
            ),
            Expr::ListLit(items) => Expr::ListLit(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, e)| e.replace_walk(&at.child(i), replacements))
                    .collect(),
            ),
            Expr::Ascribe(inner, ty) => Expr::Ascribe(
                Box::new(inner.replace_walk(&at.child(0), replacements)),
                ty.clone(),
            ),
        }
    }

    /// Paths of every hole in this expression, preorder.
    pub fn hole_paths(&self) -> Vec<SitePath> {
        self.subexpr_paths()
            .into_iter()
            .filter(|p| matches!(self.at_path(p), Some(Expr::Hole)))
            .collect()
    }

    /// Substitute the holes of this expression, preorder, with `fills`.
    /// Returns None if the hole count does not match.
    pub fn fill_holes(&self, fills: &[Expr]) -> Option<Expr> {
        let holes = self.hole_paths();
        if holes.len() != fills.len() {
            return None;
        }
        let map: BTreeMap<SitePath, Expr> =
            holes.into_iter().zip(fills.iter().cloned()).collect();
        Some(self.replace_many(&map))
    }

    fn fmt_prec(&self, f: &mut fmt::Formatter<'_>, prec: u8) -> fmt::Result {
        match self {
            Expr::Var(name) => {
                if is_operator_name(name) {
                    write!(f, "({name})")
                } else {
                    write!(f, "{name}")
                }
            }
            Expr::Lit(Literal::Int(n)) => {
                if *n < 0 && prec > 0 {
                    write!(f, "({n})")
                } else {
                    write!(f, "{n}")
                }
            }
            Expr::Lit(Literal::Bool(b)) => {
                write!(f, "{}", if *b { "True" } else { "False" })
            }
            Expr::Hole => write!(f, "_"),
            Expr::ListLit(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt_prec(f, 0)?;
                }
                write!(f, "]")
            }
            Expr::App(fun, arg) => {
                if prec > 10 {
                    write!(f, "(")?;
                }
                fun.fmt_prec(f, 10)?;
                write!(f, " ")?;
                arg.fmt_prec(f, 11)?;
                if prec > 10 {
                    write!(f, ")")?;
                }
                Ok(())
            }
            Expr::Lambda(param, body) => {
                if prec > 0 {
                    write!(f, "(")?;
                }
                write!(f, "\\{param} -> ")?;
                body.fmt_prec(f, 0)?;
                if prec > 0 {
                    write!(f, ")")?;
                }
                Ok(())
            }
            Expr::Let(binds, body) => {
                if prec > 0 {
                    write!(f, "(")?;
                }
                write!(f, "let ")?;
                for (i, (name, e)) in binds.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{name} = ")?;
                    e.fmt_prec(f, 0)?;
                }
                write!(f, " in ")?;
                body.fmt_prec(f, 0)?;
                if prec > 0 {
                    write!(f, ")")?;
                }
                Ok(())
            }
            Expr::If(c, t, e) => {
                if prec > 0 {
                    write!(f, "(")?;
                }
                write!(f, "if ")?;
                c.fmt_prec(f, 0)?;
                write!(f, " then ")?;
                t.fmt_prec(f, 0)?;
                write!(f, " else ")?;
                e.fmt_prec(f, 0)?;
                if prec > 0 {
                    write!(f, ")")?;
                }
                Ok(())
            }
            Expr::Ascribe(inner, ty) => {
                // Always parenthesized so the ascription can't capture
                // surrounding syntax.
                write!(f, "(")?;
                inner.fmt_prec(f, 0)?;
                write!(f, " :: {ty})")
            }
        }
    }
}

/// Canonical rendering. Re-parsing a rendering yields a structurally equal
/// expression.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_prec(f, 0)
    }
}

pub(crate) fn is_operator_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| "+-*/=<>&|:!.".contains(c))
}
