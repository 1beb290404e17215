//! Safe evaluation of user-supplied arithmetic formulas over grid arrays.
//!
//! Formulas are parsed by a small recursive-descent parser into an expression
//! tree whose leaves can only be numeric literals, the constants `pi` and `I`,
//! and the coordinate variables of a [`Scope`]. The only calls permitted are
//! to a fixed list of elementwise functions, and the only operators are
//! `+ - * / **` with Python precedence (`**` binds tighter than unary minus on
//! its left and is right-associative). Anything else (attribute access,
//! indexing, strings, assignment, unknown names) is rejected before evaluation
//! begins, so no input can reach anything outside this module.
//!
//! Evaluation is vectorized: each node maps whole arrays at once, with
//! scalar sub-expressions kept as scalars.
//!
//! ```
//! use ndarray as nd;
//! use tdse::{ expr::{ Formula, Scope }, grid::Grid1, limits::Limits };
//!
//! let grid = Grid1::new(-1.0, 1.0, 5).unwrap();
//! let limits = Limits::default();
//! let scope = Scope::for_grid(&grid);
//! let f = Formula::parse("0.5 * x**2 + 1", &scope, &limits).unwrap();
//! let v: nd::Array1<f64> = f.sample_real(&grid, &limits).unwrap();
//! assert_eq!(v[0], 1.5);
//! assert_eq!(v[2], 1.0);
//! ```

use std::f64::consts::PI;
use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    error::{ ExprError, LimitError },
    grid::Grid,
    limits::Limits,
};

pub type ExprResult<T> = Result<T, ExprError>;

// largest |n| for which an integer exponent is applied by repeated
// multiplication
const MAX_POWI: f64 = 1024.0;

// relative size of an imaginary part still accepted as round-off in a
// real-valued result
const REAL_RTOL: f64 = 1e-12;

/// Elementwise functions callable from a formula.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Func {
    Exp,
    Log,
    Sqrt,
    Abs,
    Sin,
    Cos,
    Tan,
    Sinh,
    Cosh,
    Tanh,
    /// Only available when the scope allows complex-part access.
    Real,
    /// Only available when the scope allows complex-part access.
    Imag,
    /// Only available when the scope allows complex-part access.
    Conj,
}

impl Func {
    fn lookup(name: &str, complex_parts: bool) -> Option<Self> {
        match name {
            "exp" => Some(Self::Exp),
            "log" => Some(Self::Log),
            "sqrt" => Some(Self::Sqrt),
            "abs" => Some(Self::Abs),
            "sin" => Some(Self::Sin),
            "cos" => Some(Self::Cos),
            "tan" => Some(Self::Tan),
            "sinh" => Some(Self::Sinh),
            "cosh" => Some(Self::Cosh),
            "tanh" => Some(Self::Tanh),
            "real" if complex_parts => Some(Self::Real),
            "imag" if complex_parts => Some(Self::Imag),
            "conj" if complex_parts => Some(Self::Conj),
            _ => None,
        }
    }

    fn apply(self, z: C64) -> C64 {
        match self {
            Self::Exp => z.exp(),
            Self::Log => unsigned_zero_im(z).ln(),
            Self::Sqrt => unsigned_zero_im(z).sqrt(),
            Self::Abs => C64::new(z.norm(), 0.0),
            Self::Sin => z.sin(),
            Self::Cos => z.cos(),
            Self::Tan => z.tan(),
            Self::Sinh => z.sinh(),
            Self::Cosh => z.cosh(),
            Self::Tanh => z.tanh(),
            Self::Real => C64::new(z.re, 0.0),
            Self::Imag => C64::new(z.im, 0.0),
            Self::Conj => z.conj(),
        }
    }
}

// a real negative number reached through negation carries a -0.0 imaginary
// part, which would put it on the wrong side of the branch cut
fn unsigned_zero_im(z: C64) -> C64 {
    if z.im == 0.0 { C64::new(z.re, 0.0) } else { z }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum BinOp { Add, Sub, Mul, Div, Pow }

impl BinOp {
    fn apply(self, a: C64, b: C64) -> C64 {
        match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Mul => a * b,
            Self::Div if b.im == 0.0 => C64::new(a.re / b.re, a.im / b.re),
            Self::Div => a / b,
            Self::Pow => pow(a, b),
        }
    }
}

fn pow(base: C64, exp: C64) -> C64 {
    if exp.im == 0.0 {
        let e = exp.re;
        if e.fract() == 0.0 && e.abs() <= MAX_POWI {
            if base.im == 0.0 {
                C64::new(base.re.powi(e as i32), 0.0)
            } else {
                base.powi(e as i32)
            }
        } else if base.im == 0.0 && base.re >= 0.0 {
            C64::new(base.re.powf(e), 0.0)
        } else {
            unsigned_zero_im(base).powf(e)
        }
    } else {
        unsigned_zero_im(base).powc(exp)
    }
}

fn neg(z: C64) -> C64 {
    C64::new(-z.re, if z.im == 0.0 { 0.0 } else { -z.im })
}

#[derive(Clone, Debug, PartialEq)]
enum Node {
    Const(C64),
    Var(usize),
    Neg(Box<Node>),
    Binary(BinOp, Box<Node>, Box<Node>),
    Call(Func, Box<Node>),
}

/// The set of variable names a formula may refer to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scope {
    vars: Vec<&'static str>,
    complex_parts: bool,
}

impl Scope {
    /// Create a new scope binding `vars`, in order.
    pub fn new(vars: &[&'static str]) -> Self {
        Self { vars: vars.to_vec(), complex_parts: false }
    }

    /// Create a new scope binding the coordinate variables of a grid.
    pub fn for_grid<G: Grid>(grid: &G) -> Self {
        Self::new(&grid.variable_names())
    }

    /// Add a variable to the end of the scope.
    pub fn with_var(mut self, name: &'static str) -> Self {
        self.vars.push(name);
        self
    }

    /// Also allow `real`, `imag`, and `conj`.
    pub fn with_complex_parts(mut self) -> Self {
        self.complex_parts = true;
        self
    }

    /// Get the bound variable names, in slot order.
    pub fn vars(&self) -> &[&'static str] { &self.vars }

    fn slot(&self, name: &str) -> Option<usize> {
        self.vars.iter().position(|v| *v == name)
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Tok {
    Num(f64),
    Imag(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Pow,
    LParen,
    RParen,
    End,
}

#[derive(Clone, Debug)]
struct Token {
    tok: Tok,
    pos: usize,
    len: usize,
}

fn is_ident_start(c: char) -> bool { c.is_ascii_alphabetic() || c == '_' }

fn is_ident_continue(c: char) -> bool { c.is_ascii_alphanumeric() || c == '_' }

fn forbidden(c: char) -> Option<&'static str> {
    match c {
        '\'' | '"' => Some("string literals are not allowed"),
        '[' | ']' | '{' | '}' => Some("indexing and collection literals are not allowed"),
        '.' => Some("attribute access is not allowed"),
        ',' => Some("argument lists are not allowed"),
        ';' | '=' | ':' => Some("only a single expression is allowed"),
        '@' | '`' | '\\' | '$' | '#' | '!' => Some("character is not allowed"),
        _ => None,
    }
}

fn lex(src: &str) -> ExprResult<Vec<Token>> {
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let at = |k: usize| chars.get(k).map(|(_, c)| *c);
    let pos_of = |k: usize| chars.get(k).map(|(p, _)| *p).unwrap_or(src.len());
    let mut tokens: Vec<Token> = Vec::new();
    let mut k: usize = 0;
    while let Some(c) = at(k) {
        let pos = pos_of(k);
        if c.is_whitespace() {
            k += 1;
            continue;
        }
        if c.is_ascii_digit()
            || (c == '.' && at(k + 1).is_some_and(|n| n.is_ascii_digit()))
        {
            while at(k).is_some_and(|c| c.is_ascii_digit()) { k += 1; }
            if at(k) == Some('.') {
                k += 1;
                while at(k).is_some_and(|c| c.is_ascii_digit()) { k += 1; }
            }
            if matches!(at(k), Some('e') | Some('E')) {
                let signed = matches!(at(k + 1), Some('+') | Some('-'));
                let first = if signed { k + 2 } else { k + 1 };
                if at(first).is_some_and(|c| c.is_ascii_digit()) {
                    k = first;
                    while at(k).is_some_and(|c| c.is_ascii_digit()) { k += 1; }
                }
            }
            let end = pos_of(k);
            let text = &src[pos..end];
            let value: f64 = text.parse()
                .map_err(|_| {
                    ExprError::parse(src, pos, end - pos, "malformed number")
                })?;
            let imag
                = matches!(at(k), Some('j') | Some('J'))
                && !at(k + 1).is_some_and(is_ident_continue);
            if imag { k += 1; }
            if at(k).is_some_and(|c| is_ident_continue(c) || c == '.') {
                let stop = pos_of(k + 1);
                return Err(ExprError::parse(
                    src, pos, stop - pos, "malformed number"));
            }
            let len = pos_of(k) - pos;
            let tok = if imag { Tok::Imag(value) } else { Tok::Num(value) };
            tokens.push(Token { tok, pos, len });
            continue;
        }
        if is_ident_start(c) {
            while at(k).is_some_and(is_ident_continue) { k += 1; }
            let end = pos_of(k);
            let name = &src[pos..end];
            if name.starts_with("__") {
                return Err(ExprError::unsafe_at(
                    src, pos, end - pos,
                    "double-underscore names are not allowed",
                ));
            }
            tokens.push(Token {
                tok: Tok::Ident(name.to_string()),
                pos,
                len: end - pos,
            });
            continue;
        }
        let (tok, width)
            = match c {
                '+' => (Tok::Plus, 1),
                '-' => (Tok::Minus, 1),
                '*' if at(k + 1) == Some('*') => (Tok::Pow, 2),
                '*' => (Tok::Star, 1),
                '/' => (Tok::Slash, 1),
                '(' => (Tok::LParen, 1),
                ')' => (Tok::RParen, 1),
                _ => {
                    let len = c.len_utf8();
                    return Err(match forbidden(c) {
                        Some(msg) => ExprError::unsafe_at(
                            src, pos, len, format!("'{c}': {msg}")),
                        None => ExprError::parse(
                            src, pos, len, format!("unexpected character '{c}'")),
                    });
                },
            };
        tokens.push(Token { tok, pos, len: width });
        k += width;
    }
    tokens.push(Token { tok: Tok::End, pos: src.len(), len: 0 });
    Ok(tokens)
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    k: usize,
    scope: &'a Scope,
    limits: &'a Limits,
    nodes: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token { &self.tokens[self.k] }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.k].clone();
        if self.k + 1 < self.tokens.len() { self.k += 1; }
        tok
    }

    fn parse_err(&self, tok: &Token, msg: impl Into<String>) -> ExprError {
        ExprError::parse(self.src, tok.pos, tok.len, msg)
    }

    fn unsafe_err(&self, tok: &Token, msg: impl Into<String>) -> ExprError {
        ExprError::unsafe_at(self.src, tok.pos, tok.len, msg)
    }

    fn count(&mut self) -> ExprResult<()> {
        self.nodes += 1;
        LimitError::check(
            "expression node count", self.nodes, self.limits.max_expr_nodes)?;
        Ok(())
    }

    fn enter(&mut self) -> ExprResult<()> {
        self.depth += 1;
        LimitError::check(
            "expression nesting depth", self.depth, self.limits.max_expr_depth)?;
        Ok(())
    }

    fn leave(&mut self) { self.depth -= 1; }

    fn binary(&mut self, op: BinOp, lhs: Node, rhs: Node) -> ExprResult<Node> {
        self.count()?;
        match (&lhs, &rhs) {
            (Node::Const(a), Node::Const(b)) => Ok(Node::Const(op.apply(*a, *b))),
            _ => Ok(Node::Binary(op, Box::new(lhs), Box::new(rhs))),
        }
    }

    fn negate(&mut self, arg: Node) -> ExprResult<Node> {
        self.count()?;
        match arg {
            Node::Const(a) => Ok(Node::Const(neg(a))),
            arg => Ok(Node::Neg(Box::new(arg))),
        }
    }

    fn call(&mut self, func: Func, arg: Node) -> ExprResult<Node> {
        self.count()?;
        match arg {
            Node::Const(a) => Ok(Node::Const(func.apply(a))),
            arg => Ok(Node::Call(func, Box::new(arg))),
        }
    }

    fn leaf(&mut self, node: Node) -> ExprResult<Node> {
        self.count()?;
        Ok(node)
    }

    fn expect_close(&mut self, open: &Token) -> ExprResult<()> {
        let tok = self.bump();
        match tok.tok {
            Tok::RParen => Ok(()),
            Tok::End => Err(self.parse_err(open, "unclosed '('")),
            _ => Err(self.parse_err(&tok, "expected ')'")),
        }
    }

    fn full(&mut self) -> ExprResult<Node> {
        let node = self.additive()?;
        let tok = self.peek().clone();
        match tok.tok {
            Tok::End => Ok(node),
            Tok::RParen => Err(self.parse_err(&tok, "unmatched ')'")),
            _ => Err(self.parse_err(&tok, "unexpected token after expression")),
        }
    }

    fn additive(&mut self) -> ExprResult<Node> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op
                = match self.peek().tok {
                    Tok::Plus => BinOp::Add,
                    Tok::Minus => BinOp::Sub,
                    _ => break,
                };
            self.bump();
            let rhs = self.multiplicative()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> ExprResult<Node> {
        let mut lhs = self.unary()?;
        loop {
            let op
                = match self.peek().tok {
                    Tok::Star => BinOp::Mul,
                    Tok::Slash => BinOp::Div,
                    _ => break,
                };
            self.bump();
            let rhs = self.unary()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> ExprResult<Node> {
        match self.peek().tok {
            Tok::Minus => {
                self.bump();
                self.enter()?;
                let arg = self.unary()?;
                self.leave();
                self.negate(arg)
            },
            Tok::Plus => {
                self.bump();
                self.enter()?;
                let arg = self.unary()?;
                self.leave();
                Ok(arg)
            },
            _ => self.power(),
        }
    }

    fn power(&mut self) -> ExprResult<Node> {
        let base = self.atom()?;
        if self.peek().tok == Tok::Pow {
            self.bump();
            self.enter()?;
            let exp = self.unary()?;
            self.leave();
            self.binary(BinOp::Pow, base, exp)
        } else {
            Ok(base)
        }
    }

    fn atom(&mut self) -> ExprResult<Node> {
        let tok = self.bump();
        match &tok.tok {
            Tok::Num(v) => self.leaf(Node::Const(C64::new(*v, 0.0))),
            Tok::Imag(v) => self.leaf(Node::Const(C64::new(0.0, *v))),
            Tok::LParen => {
                self.enter()?;
                let inner = self.additive()?;
                self.expect_close(&tok)?;
                self.leave();
                Ok(inner)
            },
            Tok::Ident(name) if self.peek().tok == Tok::LParen => {
                let func
                    = Func::lookup(name, self.scope.complex_parts)
                    .ok_or_else(|| {
                        let known
                            = self.scope.slot(name).is_some()
                            || name == "pi" || name == "I";
                        if known {
                            self.unsafe_err(&tok, format!("'{name}' is not callable"))
                        } else {
                            self.unsafe_err(&tok, format!("function '{name}' is not allowed"))
                        }
                    })?;
                let open = self.bump();
                self.enter()?;
                if self.peek().tok == Tok::RParen {
                    let close = self.peek().clone();
                    return Err(self.parse_err(
                        &close, format!("'{name}' takes exactly one argument")));
                }
                let arg = self.additive()?;
                self.expect_close(&open)?;
                self.leave();
                self.call(func, arg)
            },
            Tok::Ident(name) => {
                if let Some(slot) = self.scope.slot(name) {
                    self.leaf(Node::Var(slot))
                } else if name == "pi" {
                    self.leaf(Node::Const(C64::new(PI, 0.0)))
                } else if name == "I" {
                    self.leaf(Node::Const(C64::new(0.0, 1.0)))
                } else if Func::lookup(name, self.scope.complex_parts).is_some() {
                    Err(self.parse_err(
                        &tok, format!("function '{name}' must be called")))
                } else {
                    Err(self.unsafe_err(
                        &tok, format!("name '{name}' is not allowed")))
                }
            },
            Tok::End => Err(self.parse_err(&tok, "unexpected end of input")),
            Tok::RParen => Err(self.parse_err(&tok, "unmatched ')'")),
            _ => Err(self.parse_err(&tok, "expected a number, name, or '('")),
        }
    }
}

/// Bound value of a formula variable.
#[derive(Clone, Debug)]
pub enum Field<'a, D>
where D: nd::Dimension
{
    Real(nd::ArrayView<'a, f64, D>),
    Complex(nd::ArrayView<'a, C64, D>),
}

impl<'a, D> Field<'a, D>
where D: nd::Dimension
{
    fn raw_dim(&self) -> D {
        match self {
            Self::Real(a) => a.raw_dim(),
            Self::Complex(a) => a.raw_dim(),
        }
    }

    fn to_complex(&self) -> nd::Array<C64, D> {
        match self {
            Self::Real(a) => a.mapv(|x| C64::new(x, 0.0)),
            Self::Complex(a) => a.to_owned(),
        }
    }
}

enum Value<D>
where D: nd::Dimension
{
    Scalar(C64),
    Array(nd::Array<C64, D>),
}

impl<D> Value<D>
where D: nd::Dimension
{
    fn map<F>(self, f: F) -> Self
    where F: Fn(C64) -> C64
    {
        match self {
            Self::Scalar(z) => Self::Scalar(f(z)),
            Self::Array(mut a) => {
                a.mapv_inplace(&f);
                Self::Array(a)
            },
        }
    }

    fn combine(op: BinOp, lhs: Self, rhs: Self) -> Self {
        match (lhs, rhs) {
            (Self::Scalar(a), Self::Scalar(b)) => Self::Scalar(op.apply(a, b)),
            (Self::Array(mut a), Self::Scalar(b)) => {
                a.mapv_inplace(|ak| op.apply(ak, b));
                Self::Array(a)
            },
            (Self::Scalar(a), Self::Array(mut b)) => {
                b.mapv_inplace(|bk| op.apply(a, bk));
                Self::Array(b)
            },
            (Self::Array(mut a), Self::Array(b)) => {
                nd::Zip::from(&mut a).and(&b)
                    .for_each(|ak, bk| { *ak = op.apply(*ak, *bk); });
                Self::Array(a)
            },
        }
    }
}

fn eval_node<D>(node: &Node, vars: &[nd::Array<C64, D>]) -> Value<D>
where D: nd::Dimension
{
    match node {
        Node::Const(z) => Value::Scalar(*z),
        Node::Var(slot) => Value::Array(vars[*slot].clone()),
        Node::Neg(arg) => eval_node(arg, vars).map(neg),
        Node::Call(func, arg) => eval_node(arg, vars).map(|z| func.apply(z)),
        Node::Binary(op, lhs, rhs) => {
            let lhs = eval_node(lhs, vars);
            let rhs = eval_node(rhs, vars);
            Value::combine(*op, lhs, rhs)
        },
    }
}

/// A parsed, validated formula.
#[derive(Clone, Debug, PartialEq)]
pub struct Formula {
    src: String,
    root: Node,
    nodes: usize,
    nvars: usize,
}

impl Formula {
    /// Parse and validate a formula against a scope.
    ///
    /// Fails with [`ExprError::Unsafe`] for any construct outside the
    /// allow-list, [`ExprError::Parse`] for other malformed input, and
    /// [`ExprError::Limit`] if the source length, node count, or nesting
    /// depth exceeds `limits`.
    pub fn parse(src: &str, scope: &Scope, limits: &Limits)
        -> ExprResult<Self>
    {
        LimitError::check("expression length", src.len(), limits.max_expr_len)?;
        let tokens = lex(src)?;
        if tokens.len() == 1 {
            return Err(ExprError::parse(src, 0, 0, "empty expression"));
        }
        let mut parser = Parser {
            src,
            tokens,
            k: 0,
            scope,
            limits,
            nodes: 0,
            depth: 0,
        };
        let root = parser.full()?;
        Ok(Self {
            src: src.to_string(),
            root,
            nodes: parser.nodes,
            nvars: scope.vars.len(),
        })
    }

    /// Get the source text.
    pub fn source(&self) -> &str { &self.src }

    /// Get the number of syntax nodes counted during parsing.
    pub fn node_count(&self) -> usize { self.nodes }

    /// Return `true` if the formula does not depend on any variable.
    pub fn is_constant(&self) -> bool { matches!(self.root, Node::Const(_)) }

    /// Evaluate the formula elementwise over arrays of shape `dim`, with
    /// `fields` bound to the scope's variables in slot order.
    ///
    /// A constant formula is broadcast to `dim`. No check is made on the
    /// finiteness of the result.
    pub fn eval<D>(&self, fields: &[Field<'_, D>], dim: D, limits: &Limits)
        -> ExprResult<nd::Array<C64, D>>
    where D: nd::Dimension
    {
        if fields.len() != self.nvars {
            return Err(ExprError::Binding {
                expected: self.nvars,
                got: fields.len(),
            });
        }
        if let Some(field) = fields.iter().find(|f| f.raw_dim() != dim) {
            return Err(ExprError::Shape(
                field.raw_dim().slice().to_vec(), dim.slice().to_vec()));
        }
        LimitError::check(
            "expression evaluation work",
            self.nodes.saturating_mul(dim.size()),
            limits.max_eval_work,
        )?;
        let vars: Vec<nd::Array<C64, D>>
            = fields.iter().map(|f| f.to_complex()).collect();
        match eval_node(&self.root, &vars) {
            Value::Scalar(z) => Ok(nd::Array::from_elem(dim, z)),
            Value::Array(a) => Ok(a),
        }
    }

    /// Like [`Self::eval`], but fail unless every element is finite.
    pub fn eval_complex<D>(
        &self,
        fields: &[Field<'_, D>],
        dim: D,
        limits: &Limits,
    ) -> ExprResult<nd::Array<C64, D>>
    where D: nd::Dimension
    {
        let values = self.eval(fields, dim, limits)?;
        match values.iter().position(|z| !(z.re.is_finite() && z.im.is_finite())) {
            Some(index) => Err(ExprError::NonFinite { index }),
            None => Ok(values),
        }
    }

    /// Like [`Self::eval`], but require a finite, real-valued result.
    ///
    /// Imaginary parts no larger than a round-off tolerance relative to the
    /// real part are discarded; anything larger is an
    /// [`ExprError::NotReal`].
    pub fn eval_real<D>(
        &self,
        fields: &[Field<'_, D>],
        dim: D,
        limits: &Limits,
    ) -> ExprResult<nd::Array<f64, D>>
    where D: nd::Dimension
    {
        let values = self.eval_complex(fields, dim, limits)?;
        let complex
            = values.iter()
            .position(|z| z.im.abs() > REAL_RTOL * z.re.abs().max(1.0));
        match complex {
            Some(index) => Err(ExprError::NotReal {
                index,
                imag: values.iter().nth(index).map(|z| z.im).unwrap_or(0.0),
            }),
            None => Ok(values.mapv(|z| z.re)),
        }
    }

    /// Evaluate a real-valued formula over the coordinate variables of a
    /// grid.
    pub fn sample_real<G>(&self, grid: &G, limits: &Limits)
        -> ExprResult<nd::Array<f64, G::Dim>>
    where G: Grid
    {
        let vars = grid.variables();
        let fields: Vec<Field<'_, G::Dim>>
            = vars.iter().map(|(_, a)| Field::Real(a.view())).collect();
        self.eval_real(&fields, grid.dim(), limits)
    }

    /// Evaluate a complex-valued formula over the coordinate variables of a
    /// grid.
    pub fn sample_complex<G>(&self, grid: &G, limits: &Limits)
        -> ExprResult<nd::Array<C64, G::Dim>>
    where G: Grid
    {
        let vars = grid.variables();
        let fields: Vec<Field<'_, G::Dim>>
            = vars.iter().map(|(_, a)| Field::Real(a.view())).collect();
        self.eval_complex(&fields, grid.dim(), limits)
    }
}
