//! Lexer and recursive-descent parser for the target language.
//!
//! Two surfaces share the grammar: standalone expressions (oracle traffic,
//! candidate round-trips) and problem files (signature and equation
//! declarations). Infix operators are desugared into prefix applications of
//! operator variables during parsing, so `a + b` and `(+) a b` produce the
//! same AST.

use std::collections::HashMap;

use crate::expr::{is_operator_name, Expr, Literal};
use crate::types::{Binding, Problem, Property, Scheme, Type};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unexpected character '{found}' at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEnd { expected: String },

    #[error("unexpected token {found}, expected {expected}")]
    UnexpectedToken { found: String, expected: String },

    #[error("integer literal out of range: {text}")]
    IntOutOfRange { text: String },

    #[error("malformed declaration: {line}")]
    MalformedDeclaration { line: String },

    #[error("problem has no 'target' binding")]
    MissingTarget,

    #[error("the 'target' binding requires a type signature")]
    MissingTargetSignature,

    #[error("duplicate definition of '{name}'")]
    DuplicateDefinition { name: String },
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    ConId(String),
    IntLit(i64),
    Op(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Semi,
    Backslash,
    Arrow,
    DoubleColon,
    Equals,
    Underscore,
    KwIf,
    KwThen,
    KwElse,
    KwLet,
    KwIn,
}

impl std::fmt::Display for Tok {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tok::Ident(s) | Tok::ConId(s) | Tok::Op(s) => write!(f, "'{s}'"),
            Tok::IntLit(n) => write!(f, "'{n}'"),
            Tok::LParen => write!(f, "'('"),
            Tok::RParen => write!(f, "')'"),
            Tok::LBracket => write!(f, "'['"),
            Tok::RBracket => write!(f, "']'"),
            Tok::Comma => write!(f, "','"),
            Tok::Semi => write!(f, "';'"),
            Tok::Backslash => write!(f, "'\\'"),
            Tok::Arrow => write!(f, "'->'"),
            Tok::DoubleColon => write!(f, "'::'"),
            Tok::Equals => write!(f, "'='"),
            Tok::Underscore => write!(f, "'_'"),
            Tok::KwIf => write!(f, "'if'"),
            Tok::KwThen => write!(f, "'then'"),
            Tok::KwElse => write!(f, "'else'"),
            Tok::KwLet => write!(f, "'let'"),
            Tok::KwIn => write!(f, "'in'"),
        }
    }
}

const OP_CHARS: &str = "+-*/=<>&|:!.";

fn lex(src: &str) -> Result<Vec<Tok>, ParseError> {
    let chars: Vec<char> = src.chars().collect();
    let mut toks = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        // Line comment.
        if c == '-' && chars.get(i + 1) == Some(&'-') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        match c {
            '(' => {
                toks.push(Tok::LParen);
                i += 1;
            }
            ')' => {
                toks.push(Tok::RParen);
                i += 1;
            }
            '[' => {
                toks.push(Tok::LBracket);
                i += 1;
            }
            ']' => {
                toks.push(Tok::RBracket);
                i += 1;
            }
            ',' => {
                toks.push(Tok::Comma);
                i += 1;
            }
            ';' => {
                toks.push(Tok::Semi);
                i += 1;
            }
            '\\' => {
                toks.push(Tok::Backslash);
                i += 1;
            }
            '0'..='9' => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<i64>()
                    .map_err(|_| ParseError::IntOutOfRange { text: text.clone() })?;
                toks.push(Tok::IntLit(value));
            }
            _ if c == '_' || c.is_ascii_lowercase() => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '\'')
                {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                toks.push(match text.as_str() {
                    "_" => Tok::Underscore,
                    "if" => Tok::KwIf,
                    "then" => Tok::KwThen,
                    "else" => Tok::KwElse,
                    "let" => Tok::KwLet,
                    "in" => Tok::KwIn,
                    _ => Tok::Ident(text),
                });
            }
            _ if c.is_ascii_uppercase() => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '\'')
                {
                    i += 1;
                }
                toks.push(Tok::ConId(chars[start..i].iter().collect()));
            }
            _ if OP_CHARS.contains(c) => {
                let start = i;
                while i < chars.len() && OP_CHARS.contains(chars[i]) {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                toks.push(match text.as_str() {
                    "->" => Tok::Arrow,
                    "::" => Tok::DoubleColon,
                    "=" => Tok::Equals,
                    _ => Tok::Op(text),
                });
            }
            _ => return Err(ParseError::UnexpectedChar { found: c, offset: i }),
        }
    }
    Ok(toks)
}

struct Parser {
    toks: Vec<Tok>,
    pos: usize,
}

impl Parser {
    fn new(toks: Vec<Tok>) -> Parser {
        Parser { toks, pos: 0 }
    }

    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn next(&mut self) -> Option<Tok> {
        let tok = self.toks.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, want: &Tok) -> Result<(), ParseError> {
        match self.next() {
            Some(tok) if &tok == want => Ok(()),
            Some(tok) => Err(ParseError::UnexpectedToken {
                found: tok.to_string(),
                expected: want.to_string(),
            }),
            None => Err(ParseError::UnexpectedEnd {
                expected: want.to_string(),
            }),
        }
    }

    fn expect_end(&mut self) -> Result<(), ParseError> {
        match self.peek() {
            None => Ok(()),
            Some(tok) => Err(ParseError::UnexpectedToken {
                found: tok.to_string(),
                expected: "end of input".to_string(),
            }),
        }
    }

    // --- expressions ---

    fn expr(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Tok::Backslash) => self.lambda(),
            Some(Tok::KwLet) => self.let_expr(),
            Some(Tok::KwIf) => self.if_expr(),
            _ => self.op_expr(0),
        }
    }

    fn lambda(&mut self) -> Result<Expr, ParseError> {
        self.expect(&Tok::Backslash)?;
        let mut params = Vec::new();
        while let Some(Tok::Ident(name)) = self.peek() {
            params.push(name.clone());
            self.next();
        }
        if params.is_empty() {
            return Err(ParseError::UnexpectedToken {
                found: self
                    .peek()
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "end of input".into()),
                expected: "lambda parameter".into(),
            });
        }
        self.expect(&Tok::Arrow)?;
        let body = self.expr()?;
        Ok(Expr::lambda(&params, body))
    }

    fn let_expr(&mut self) -> Result<Expr, ParseError> {
        self.expect(&Tok::KwLet)?;
        let mut binds = Vec::new();
        loop {
            let name = match self.next() {
                Some(Tok::Ident(name)) => name,
                Some(tok) => {
                    return Err(ParseError::UnexpectedToken {
                        found: tok.to_string(),
                        expected: "let binding name".into(),
                    })
                }
                None => {
                    return Err(ParseError::UnexpectedEnd {
                        expected: "let binding name".into(),
                    })
                }
            };
            let mut params = Vec::new();
            while let Some(Tok::Ident(p)) = self.peek() {
                params.push(p.clone());
                self.next();
            }
            self.expect(&Tok::Equals)?;
            let rhs = self.expr()?;
            binds.push((name, Expr::lambda(&params, rhs)));
            match self.peek() {
                Some(Tok::Semi) => {
                    self.next();
                }
                _ => break,
            }
        }
        self.expect(&Tok::KwIn)?;
        let body = self.expr()?;
        Ok(Expr::Let(binds, Box::new(body)))
    }

    fn if_expr(&mut self) -> Result<Expr, ParseError> {
        self.expect(&Tok::KwIf)?;
        let cond = self.expr()?;
        self.expect(&Tok::KwThen)?;
        let then = self.expr()?;
        self.expect(&Tok::KwElse)?;
        let els = self.expr()?;
        Ok(Expr::If(Box::new(cond), Box::new(then), Box::new(els)))
    }

    /// Infix operator layers, loosest first: `||`, `&&`, comparisons
    /// (non-associative), `:` (right), `+`/`-`, `*`.
    fn op_expr(&mut self, level: usize) -> Result<Expr, ParseError> {
        const LEVELS: [&[&str]; 5] = [&["||"], &["&&"], &["==", "/=", "<", "<=", ">", ">="], &[":"], &["+", "-"]];
        if level >= LEVELS.len() {
            return self.mul_expr();
        }
        let ops = LEVELS[level];
        let mut lhs = self.op_expr(level + 1)?;
        loop {
            let op = match self.peek() {
                Some(Tok::Op(op)) if ops.contains(&op.as_str()) => op.clone(),
                _ => break,
            };
            self.next();
            if op == ":" {
                // Right-associative: re-enter at this level.
                let rhs = self.op_expr(level)?;
                return Ok(Expr::apply(Expr::var(&op), vec![lhs, rhs]));
            }
            let rhs = self.op_expr(level + 1)?;
            lhs = Expr::apply(Expr::var(&op), vec![lhs, rhs]);
            if level == 2 {
                // Comparisons do not chain.
                break;
            }
        }
        Ok(lhs)
    }

    fn mul_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.app_expr()?;
        while let Some(Tok::Op(op)) = self.peek() {
            if op.as_str() != "*" {
                break;
            }
            self.next();
            let rhs = self.app_expr()?;
            lhs = Expr::apply(Expr::var("*"), vec![lhs, rhs]);
        }
        Ok(lhs)
    }

    fn app_expr(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.atom()?;
        while self.starts_atom() {
            let arg = self.atom()?;
            node = Expr::app(node, arg);
        }
        Ok(node)
    }

    fn starts_atom(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Tok::Ident(_)
                    | Tok::ConId(_)
                    | Tok::IntLit(_)
                    | Tok::LParen
                    | Tok::LBracket
                    | Tok::Underscore
            )
        )
    }

    fn atom(&mut self) -> Result<Expr, ParseError> {
        match self.next() {
            Some(Tok::Ident(name)) => Ok(Expr::Var(name)),
            Some(Tok::IntLit(n)) => Ok(Expr::Lit(Literal::Int(n))),
            Some(Tok::Underscore) => Ok(Expr::Hole),
            Some(Tok::ConId(name)) => match name.as_str() {
                "True" => Ok(Expr::Lit(Literal::Bool(true))),
                "False" => Ok(Expr::Lit(Literal::Bool(false))),
                _ => Err(ParseError::UnexpectedToken {
                    found: format!("'{name}'"),
                    expected: "expression".into(),
                }),
            },
            Some(Tok::LBracket) => {
                let mut items = Vec::new();
                if self.peek() != Some(&Tok::RBracket) {
                    loop {
                        items.push(self.expr()?);
                        match self.peek() {
                            Some(Tok::Comma) => {
                                self.next();
                            }
                            _ => break,
                        }
                    }
                }
                self.expect(&Tok::RBracket)?;
                Ok(Expr::ListLit(items))
            }
            Some(Tok::LParen) => {
                // Operator section: `(+)`, `(==)`, `(:)`.
                if let Some(Tok::Op(op)) = self.peek() {
                    if is_operator_name(op) {
                        let op = op.clone();
                        self.next();
                        self.expect(&Tok::RParen)?;
                        return Ok(Expr::Var(op));
                    }
                }
                let inner = self.expr()?;
                if self.peek() == Some(&Tok::DoubleColon) {
                    self.next();
                    let ty = self.ty()?;
                    self.expect(&Tok::RParen)?;
                    return Ok(Expr::Ascribe(Box::new(inner), ty));
                }
                self.expect(&Tok::RParen)?;
                Ok(inner)
            }
            Some(tok) => Err(ParseError::UnexpectedToken {
                found: tok.to_string(),
                expected: "expression".into(),
            }),
            None => Err(ParseError::UnexpectedEnd {
                expected: "expression".into(),
            }),
        }
    }

    // --- types ---

    fn ty(&mut self) -> Result<Type, ParseError> {
        let lhs = self.ty_atom()?;
        if self.peek() == Some(&Tok::Arrow) {
            self.next();
            let rhs = self.ty()?;
            return Ok(Type::fun(lhs, rhs));
        }
        Ok(lhs)
    }

    fn ty_atom(&mut self) -> Result<Type, ParseError> {
        match self.next() {
            Some(Tok::ConId(name)) => match name.as_str() {
                "Int" => Ok(Type::Int),
                "Bool" => Ok(Type::Bool),
                _ => Err(ParseError::UnexpectedToken {
                    found: format!("'{name}'"),
                    expected: "type".into(),
                }),
            },
            Some(Tok::Ident(name)) => Ok(Type::Var(name)),
            Some(Tok::LBracket) => {
                let elem = self.ty()?;
                self.expect(&Tok::RBracket)?;
                Ok(Type::list(elem))
            }
            Some(Tok::LParen) => {
                let inner = self.ty()?;
                self.expect(&Tok::RParen)?;
                Ok(inner)
            }
            Some(tok) => Err(ParseError::UnexpectedToken {
                found: tok.to_string(),
                expected: "type".into(),
            }),
            None => Err(ParseError::UnexpectedEnd {
                expected: "type".into(),
            }),
        }
    }
}

/// Parse a standalone expression.
pub fn parse_expr_text(src: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser::new(lex(src)?);
    let expr = parser.expr()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parse a standalone type.
pub fn parse_type_text(src: &str) -> Result<Type, ParseError> {
    let mut parser = Parser::new(lex(src)?);
    let ty = parser.ty()?;
    parser.expect_end()?;
    Ok(ty)
}

enum Decl {
    Sig(String, Scheme),
    Eqn(String, Vec<String>, Expr),
}

/// One logical declaration per physical line; indented lines continue the
/// previous declaration.
fn logical_lines(src: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for raw in src.lines() {
        let stripped = match raw.find("--") {
            Some(idx) => &raw[..idx],
            None => raw,
        };
        if stripped.trim().is_empty() {
            continue;
        }
        let continues = raw.starts_with(' ') || raw.starts_with('\t');
        match out.last_mut() {
            Some(prev) if continues => {
                prev.push(' ');
                prev.push_str(stripped.trim());
            }
            _ => out.push(stripped.trim().to_string()),
        }
    }
    out
}

fn parse_decl(line: &str) -> Result<Decl, ParseError> {
    let toks = lex(line)?;
    let mut parser = Parser::new(toks);
    let name = match parser.next() {
        Some(Tok::Ident(name)) => name,
        _ => {
            return Err(ParseError::MalformedDeclaration {
                line: line.to_string(),
            })
        }
    };
    match parser.peek() {
        Some(Tok::DoubleColon) => {
            parser.next();
            let ty = parser.ty()?;
            parser.expect_end()?;
            Ok(Decl::Sig(name, Scheme::generalize(ty)))
        }
        _ => {
            let mut params = Vec::new();
            loop {
                match parser.peek() {
                    Some(Tok::Ident(p)) => {
                        params.push(p.clone());
                        parser.next();
                    }
                    Some(Tok::Equals) => {
                        parser.next();
                        break;
                    }
                    _ => {
                        return Err(ParseError::MalformedDeclaration {
                            line: line.to_string(),
                        })
                    }
                }
            }
            let expr = parser.expr()?;
            parser.expect_end()?;
            Ok(Decl::Eqn(name, params, expr))
        }
    }
}

/// A parsed declaration document: plain bindings (equations with their
/// parameters folded into lambdas) and `prop_*` properties, each in file
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declarations {
    pub bindings: Vec<Binding>,
    pub properties: Vec<Property>,
}

impl Declarations {
    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.name == name)
    }
}

/// Parse a declaration document: signature lines and equation lines, `--`
/// comments, indented continuation lines.
pub fn parse_declarations(src: &str) -> Result<Declarations, ParseError> {
    let mut sigs: HashMap<String, Scheme> = HashMap::new();
    let mut eqns: Vec<(String, Vec<String>, Expr)> = Vec::new();

    for line in logical_lines(src) {
        match parse_decl(&line)? {
            Decl::Sig(name, scheme) => {
                if sigs.insert(name.clone(), scheme).is_some() {
                    return Err(ParseError::DuplicateDefinition { name });
                }
            }
            Decl::Eqn(name, params, expr) => {
                if eqns.iter().any(|(n, _, _)| n == &name) {
                    return Err(ParseError::DuplicateDefinition { name });
                }
                eqns.push((name, params, expr));
            }
        }
    }

    let mut bindings = Vec::new();
    let mut properties = Vec::new();
    for (name, params, expr) in eqns {
        let scheme = sigs.get(&name).cloned();
        if name.starts_with("prop_") {
            properties.push(Property {
                name,
                params,
                body: expr,
                scheme,
            });
        } else {
            bindings.push(Binding {
                name,
                scheme,
                expr: Expr::lambda(&params, expr),
            });
        }
    }
    Ok(Declarations {
        bindings,
        properties,
    })
}

/// Load a problem from source text.
///
/// The binding named `target` (signature required) is the repair target;
/// `prop_*` bindings are the properties, in file order; every other binding
/// is context, in file order.
pub fn parse_problem(src: &str) -> Result<Problem, ParseError> {
    let decls = parse_declarations(src)?;
    let mut target: Option<(Expr, Type)> = None;
    let mut context = Vec::new();

    for binding in decls.bindings {
        if binding.name == "target" {
            let scheme = binding.scheme.ok_or(ParseError::MissingTargetSignature)?;
            target = Some((binding.expr, scheme.ty));
        } else {
            context.push(binding);
        }
    }

    let (target, target_type) = target.ok_or(ParseError::MissingTarget)?;
    Ok(Problem {
        target,
        target_type,
        properties: decls.properties,
        context,
    })
}
