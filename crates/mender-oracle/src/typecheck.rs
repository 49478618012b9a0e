//! Hindley-Milner type inference for the target language.
//!
//! Inference runs over expressions that may contain holes: each hole gets a
//! fresh variable, and the solved hole type is reported together with the
//! local binders (lambda parameters, let binders) in scope at the hole.
//! That scope report is what lets hole fits draw on locals the way a real
//! compiler's valid-hole-fits machinery does.

use std::collections::HashMap;

use mender_ir::{Binding, Expr, Literal, Scheme, Type};

#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("cannot unify {left} with {right}")]
    Mismatch { left: String, right: String },

    #[error("infinite type: {var} occurs in {ty}")]
    Occurs { var: String, ty: String },

    #[error("unbound variable '{name}'")]
    Unbound { name: String },
}

/// Solved type and scope of one hole, in preorder hole order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoleInfo {
    pub ty: Type,
    /// Local binders in scope at the hole, innermost last.
    pub locals: Vec<(String, Type)>,
}

/// Named schemes visible to inference: the prelude plus context bindings.
#[derive(Debug, Clone, Default)]
pub struct TypeEnv {
    schemes: HashMap<String, Scheme>,
}

impl TypeEnv {
    /// The built-in prelude signatures.
    pub fn prelude() -> TypeEnv {
        let mut env = TypeEnv::default();
        for (name, sig) in PRELUDE_SIGS {
            let ty = mender_ir::parse_type_text(sig).expect("prelude signature parses");
            env.insert(name, Scheme::generalize(ty));
        }
        env
    }

    /// Prelude extended with context bindings. Bindings without signatures
    /// get their types inferred against the environment built so far; a
    /// binding whose type cannot be inferred is skipped.
    pub fn with_context(ctx: &[Binding]) -> TypeEnv {
        let mut env = TypeEnv::prelude();
        env.extend_context(ctx);
        env
    }

    pub fn extend_context(&mut self, ctx: &[Binding]) {
        // Signatures first, so mutually recursive signed bindings resolve.
        for binding in ctx {
            if let Some(scheme) = &binding.scheme {
                self.insert(&binding.name, scheme.clone());
            }
        }
        for binding in ctx {
            if binding.scheme.is_some() {
                continue;
            }
            match infer(self, &binding.expr) {
                Ok((ty, _)) => self.insert(&binding.name, Scheme::generalize(ty)),
                Err(e) => {
                    tracing::debug!(name = %binding.name, error = %e, "context binding left untyped");
                }
            }
        }
    }

    pub fn insert(&mut self, name: &str, scheme: Scheme) {
        self.schemes.insert(name.to_string(), scheme);
    }

    pub fn lookup(&self, name: &str) -> Option<&Scheme> {
        self.schemes.get(name)
    }
}

const PRELUDE_SIGS: &[(&str, &str)] = &[
    ("+", "Int -> Int -> Int"),
    ("-", "Int -> Int -> Int"),
    ("*", "Int -> Int -> Int"),
    ("mod", "Int -> Int -> Int"),
    ("div", "Int -> Int -> Int"),
    ("==", "a -> a -> Bool"),
    ("/=", "a -> a -> Bool"),
    ("<", "Int -> Int -> Bool"),
    ("<=", "Int -> Int -> Bool"),
    (">", "Int -> Int -> Bool"),
    (">=", "Int -> Int -> Bool"),
    ("&&", "Bool -> Bool -> Bool"),
    ("||", "Bool -> Bool -> Bool"),
    ("not", "Bool -> Bool"),
    (":", "a -> [a] -> [a]"),
    ("sum", "[Int] -> Int"),
    ("length", "[a] -> Int"),
    ("null", "[a] -> Bool"),
    ("head", "[a] -> a"),
    ("tail", "[a] -> [a]"),
    ("last", "[a] -> a"),
    ("take", "Int -> [a] -> [a]"),
    ("repeat", "a -> [a]"),
    ("map", "(a -> b) -> [a] -> [b]"),
    ("foldl", "(b -> a -> b) -> b -> [a] -> b"),
    ("foldr", "(a -> b -> b) -> b -> [a] -> b"),
];

/// A unification session. Fresh variables are named `$0`, `$1`, ... so they
/// can never collide with source type variables.
pub struct Unifier {
    subst: HashMap<String, Type>,
    next_fresh: u32,
}

impl Unifier {
    pub fn new() -> Unifier {
        Unifier {
            subst: HashMap::new(),
            next_fresh: 0,
        }
    }

    pub fn fresh(&mut self) -> Type {
        let name = format!("${}", self.next_fresh);
        self.next_fresh += 1;
        Type::Var(name)
    }

    /// Instantiate a scheme with fresh variables for its quantified names.
    pub fn instantiate(&mut self, scheme: &Scheme) -> Type {
        let mapping: HashMap<&str, Type> = scheme
            .vars
            .iter()
            .map(|v| (v.as_str(), self.fresh()))
            .collect();
        rename(&scheme.ty, &mapping)
    }

    fn resolve(&self, ty: &Type) -> Type {
        match ty {
            Type::Var(name) => match self.subst.get(name) {
                Some(bound) => self.resolve(bound),
                None => ty.clone(),
            },
            _ => ty.clone(),
        }
    }

    /// Deep-apply the substitution.
    pub fn zonk(&self, ty: &Type) -> Type {
        match self.resolve(ty) {
            Type::Int => Type::Int,
            Type::Bool => Type::Bool,
            Type::Var(name) => Type::Var(name),
            Type::List(elem) => Type::list(self.zonk(&elem)),
            Type::Fun(from, to) => Type::fun(self.zonk(&from), self.zonk(&to)),
        }
    }

    pub fn unify(&mut self, left: &Type, right: &Type) -> Result<(), TypeError> {
        let left = self.resolve(left);
        let right = self.resolve(right);
        match (&left, &right) {
            (Type::Int, Type::Int) | (Type::Bool, Type::Bool) => Ok(()),
            (Type::Var(a), Type::Var(b)) if a == b => Ok(()),
            (Type::Var(name), other) | (other, Type::Var(name)) => {
                if occurs(name, other, self) {
                    return Err(TypeError::Occurs {
                        var: name.clone(),
                        ty: self.zonk(other).to_string(),
                    });
                }
                self.subst.insert(name.clone(), other.clone());
                Ok(())
            }
            (Type::List(a), Type::List(b)) => self.unify(a, b),
            (Type::Fun(a1, r1), Type::Fun(a2, r2)) => {
                self.unify(a1, a2)?;
                self.unify(r1, r2)
            }
            _ => Err(TypeError::Mismatch {
                left: self.zonk(&left).to_string(),
                right: self.zonk(&right).to_string(),
            }),
        }
    }
}

impl Default for Unifier {
    fn default() -> Self {
        Self::new()
    }
}

fn occurs(name: &str, ty: &Type, uni: &Unifier) -> bool {
    match uni.resolve(ty) {
        Type::Var(other) => other == name,
        Type::List(elem) => occurs(name, &elem, uni),
        Type::Fun(from, to) => occurs(name, &from, uni) || occurs(name, &to, uni),
        Type::Int | Type::Bool => false,
    }
}

fn rename(ty: &Type, mapping: &HashMap<&str, Type>) -> Type {
    match ty {
        Type::Int => Type::Int,
        Type::Bool => Type::Bool,
        Type::Var(name) => mapping
            .get(name.as_str())
            .cloned()
            .unwrap_or_else(|| ty.clone()),
        Type::List(elem) => Type::list(rename(elem, mapping)),
        Type::Fun(from, to) => Type::fun(rename(from, mapping), rename(to, mapping)),
    }
}

struct Inferencer<'a> {
    env: &'a TypeEnv,
    uni: Unifier,
    holes: Vec<(Type, Vec<(String, Type)>)>,
}

impl<'a> Inferencer<'a> {
    fn infer(
        &mut self,
        expr: &Expr,
        locals: &mut Vec<(String, Type)>,
    ) -> Result<Type, TypeError> {
        match expr {
            Expr::Var(name) => {
                // Innermost local binder wins, then the environment.
                if let Some((_, ty)) = locals.iter().rev().find(|(n, _)| n == name) {
                    return Ok(ty.clone());
                }
                match self.env.lookup(name) {
                    Some(scheme) => Ok(self.uni.instantiate(scheme)),
                    None => Err(TypeError::Unbound { name: name.clone() }),
                }
            }
            Expr::Lit(Literal::Int(_)) => Ok(Type::Int),
            Expr::Lit(Literal::Bool(_)) => Ok(Type::Bool),
            Expr::Hole => {
                let ty = self.uni.fresh();
                self.holes.push((ty.clone(), locals.clone()));
                Ok(ty)
            }
            Expr::App(fun, arg) => {
                let fun_ty = self.infer(fun, locals)?;
                let arg_ty = self.infer(arg, locals)?;
                let ret = self.uni.fresh();
                self.uni
                    .unify(&fun_ty, &Type::fun(arg_ty, ret.clone()))?;
                Ok(ret)
            }
            Expr::Lambda(param, body) => {
                let param_ty = self.uni.fresh();
                locals.push((param.clone(), param_ty.clone()));
                let body_ty = self.infer(body, locals);
                locals.pop();
                Ok(Type::fun(param_ty, body_ty?))
            }
            Expr::Let(binds, body) => {
                let depth = locals.len();
                for (name, _) in binds {
                    let var = self.uni.fresh();
                    locals.push((name.clone(), var));
                }
                let mut result = Ok(());
                for (i, (_, bound)) in binds.iter().enumerate() {
                    let declared = locals[depth + i].1.clone();
                    result = self
                        .infer(bound, locals)
                        .and_then(|ty| self.uni.unify(&declared, &ty));
                    if result.is_err() {
                        break;
                    }
                }
                let body_ty = match result {
                    Ok(()) => self.infer(body, locals),
                    Err(e) => Err(e),
                };
                locals.truncate(depth);
                body_ty
            }
            Expr::If(cond, then, els) => {
                let cond_ty = self.infer(cond, locals)?;
                self.uni.unify(&cond_ty, &Type::Bool)?;
                let then_ty = self.infer(then, locals)?;
                let else_ty = self.infer(els, locals)?;
                self.uni.unify(&then_ty, &else_ty)?;
                Ok(then_ty)
            }
            Expr::ListLit(items) => {
                let elem = self.uni.fresh();
                for item in items {
                    let item_ty = self.infer(item, locals)?;
                    self.uni.unify(&elem, &item_ty)?;
                }
                Ok(Type::list(elem))
            }
            Expr::Ascribe(inner, ty) => {
                let inner_ty = self.infer(inner, locals)?;
                self.uni.unify(&inner_ty, ty)?;
                Ok(ty.clone())
            }
        }
    }
}

/// Infer the type of `expr` in `env`. Returns the (zonked) type and one
/// `HoleInfo` per hole, in preorder.
pub fn infer(env: &TypeEnv, expr: &Expr) -> Result<(Type, Vec<HoleInfo>), TypeError> {
    let mut inf = Inferencer {
        env,
        uni: Unifier::new(),
        holes: Vec::new(),
    };
    let mut locals = Vec::new();
    let ty = inf.infer(expr, &mut locals)?;
    let zonked = inf.uni.zonk(&ty);
    let holes = inf
        .holes
        .iter()
        .map(|(hole_ty, scope)| HoleInfo {
            ty: inf.uni.zonk(hole_ty),
            locals: scope
                .iter()
                .map(|(n, t)| (n.clone(), inf.uni.zonk(t)))
                .collect(),
        })
        .collect();
    Ok((zonked, holes))
}

/// Default residual type variables to `Int`.
pub fn default_to_int(ty: &Type) -> Type {
    match ty {
        Type::Int => Type::Int,
        Type::Bool => Type::Bool,
        Type::Var(_) => Type::Int,
        Type::List(elem) => Type::list(default_to_int(elem)),
        Type::Fun(from, to) => Type::fun(default_to_int(from), default_to_int(to)),
    }
}

/// Whether `candidate`'s scheme can be used at `wanted`. Each check runs in
/// a fresh unification session.
pub fn fits(candidate: &Scheme, wanted: &Type) -> bool {
    let mut uni = Unifier::new();
    let inst = uni.instantiate(candidate);
    uni.unify(&inst, wanted).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mender_ir::{parse_expr_text, parse_type_text};

    fn infer_text(src: &str) -> Result<(Type, Vec<HoleInfo>), TypeError> {
        infer(&TypeEnv::prelude(), &parse_expr_text(src).unwrap())
    }

    #[test]
    fn test_infer_simple() {
        let (ty, holes) = infer_text("\\x -> x + 1").unwrap();
        assert_eq!(ty.to_string(), "Int -> Int");
        assert!(holes.is_empty());
    }

    #[test]
    fn test_infer_polymorphic_use() {
        let (ty, _) = infer_text("foldl (+) 0").unwrap();
        assert_eq!(ty.to_string(), "[Int] -> Int");
    }

    #[test]
    fn test_infer_ascription_anchors() {
        let (ty, holes) = infer_text("(foldl _ 0 :: [Int] -> Int)").unwrap();
        assert_eq!(ty.to_string(), "[Int] -> Int");
        assert_eq!(holes.len(), 1);
        assert_eq!(holes[0].ty.to_string(), "Int -> Int -> Int");
    }

    #[test]
    fn test_hole_locals_report_lambda_and_let() {
        let (_, holes) = infer_text("\\a b -> let c = a + 1 in (_ :: Int)").unwrap();
        assert_eq!(holes.len(), 1);
        let names: Vec<&str> = holes[0].locals.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(holes[0].locals[0].1, Type::Int);
        assert_eq!(holes[0].locals[2].1, Type::Int);
    }

    #[test]
    fn test_recursive_let() {
        let (ty, _) =
            infer_text("let go n = if n == 0 then 0 else go (n - 1) in go").unwrap();
        assert_eq!(ty.to_string(), "Int -> Int");
    }

    #[test]
    fn test_mismatch_reported() {
        let err = infer_text("1 + True").unwrap_err();
        assert!(matches!(err, TypeError::Mismatch { .. }));
    }

    #[test]
    fn test_occurs_check() {
        let err = infer_text("\\x -> x x").unwrap_err();
        assert!(matches!(err, TypeError::Occurs { .. }));
    }

    #[test]
    fn test_unbound() {
        let err = infer_text("frobnicate 3").unwrap_err();
        assert!(matches!(err, TypeError::Unbound { .. }));
    }

    #[test]
    fn test_fits() {
        let fold = Scheme::generalize(parse_type_text("(b -> a -> b) -> b -> [a] -> b").unwrap());
        assert!(fits(
            &fold,
            &parse_type_text("(Int -> Int -> Int) -> Int -> [Int] -> Int").unwrap()
        ));
        assert!(!fits(
            &Scheme::mono(Type::Int),
            &parse_type_text("Int -> Int").unwrap()
        ));
    }

    #[test]
    fn test_default_to_int() {
        let ty = parse_type_text("a -> [b]").unwrap();
        assert_eq!(default_to_int(&ty).to_string(), "Int -> [Int]");
    }
}
