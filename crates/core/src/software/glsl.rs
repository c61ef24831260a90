//! Compiler for the GLSL subset executed by the software backend.
//!
//! Accepted language:
//!
//! - `#version 100` (or no directive) and `#version 300 es`, with the
//!   storage qualifiers of the matching dialect (`attribute`/`varying` vs
//!   `in`/`out`).
//! - `precision` statements (ignored).
//! - Global inputs and outputs of type `float`, `vec2`, `vec3`, `vec4`.
//! - A single `void main()` whose statements are local declarations and
//!   assignments. Expressions are literals, variables, unary minus,
//!   parentheses and `float`/`vecN` constructors. Integer literals never
//!   convert implicitly; they are only useful as constructor arguments.
//!
//! Diagnostics use the `ERROR: 0:<line>: <message>` layout of GL drivers.

use std::fmt;

use crate::gpu::ShaderStage;

/// Maximum number of vertex attributes a program may declare.
pub const MAX_VERTEX_ATTRIBS: usize = 16;

/// Deepest nesting of unary operators, parentheses and constructors.
const MAX_EXPR_DEPTH: usize = 64;

/// A four-wide register; unused trailing lanes are ignored.
pub type Value = [f32; 4];

/// GLSL dialect selected by the `#version` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Es100,
    Es300,
}

/// Scalar and vector float types, plus the type of integer literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    /// Only produced by literals such as `1`; never declarable.
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
}

impl Type {
    pub fn components(self) -> usize {
        match self {
            Type::Int | Type::Float => 1,
            Type::Vec2 => 2,
            Type::Vec3 => 3,
            Type::Vec4 => 4,
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "float" => Some(Type::Float),
            "vec2" => Some(Type::Vec2),
            "vec3" => Some(Type::Vec3),
            "vec4" => Some(Type::Vec4),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Type::Int => "int",
            Type::Float => "float",
            Type::Vec2 => "vec2",
            Type::Vec3 => "vec3",
            Type::Vec4 => "vec4",
        }
    }
}

/// A declared global input or output.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Const(f32),
    Input(usize),
    Output(usize),
    Local(usize),
    Neg(Box<Expr>),
    Construct {
        ty: Type,
        /// Argument expressions with their component counts.
        args: Vec<(Expr, usize)>,
        /// A single scalar argument fills every component.
        broadcast: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Place {
    Output(usize),
    Local(usize),
    Position,
    FragColor,
}

#[derive(Debug, Clone, PartialEq)]
struct Statement {
    place: Place,
    value: Expr,
}

/// A compile diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ERROR: 0:{}: {}", self.line, self.message)
    }
}

fn error(line: usize, message: impl Into<String>) -> CompileError {
    CompileError {
        line,
        message: message.into(),
    }
}

/// A successfully compiled shader stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderModule {
    stage: ShaderStage,
    dialect: Dialect,
    inputs: Vec<Variable>,
    outputs: Vec<Variable>,
    locals: Vec<Variable>,
    body: Vec<Statement>,
    writes_frag_color: bool,
}

/// Results of running a module once.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub outputs: Vec<Value>,
    pub position: Value,
    pub frag_color: Value,
}

impl ShaderModule {
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Attributes (vertex) or varyings (fragment), in declaration order.
    pub fn inputs(&self) -> &[Variable] {
        &self.inputs
    }

    /// Varyings (vertex) or the color output (fragment).
    pub fn outputs(&self) -> &[Variable] {
        &self.outputs
    }

    /// Runs `main` with the given input registers.
    pub fn execute(&self, inputs: &[Value]) -> Execution {
        let mut frame = Frame {
            inputs,
            outputs: vec![[0.0; 4]; self.outputs.len()],
            locals: vec![[0.0; 4]; self.locals.len()],
            position: [0.0, 0.0, 0.0, 1.0],
            frag_color: [0.0; 4],
        };

        for statement in &self.body {
            let value = frame.eval(&statement.value);
            match statement.place {
                Place::Output(i) => frame.outputs[i] = value,
                Place::Local(i) => frame.locals[i] = value,
                Place::Position => frame.position = value,
                Place::FragColor => frame.frag_color = value,
            }
        }

        let frag_color = if self.writes_frag_color {
            frame.frag_color
        } else {
            frame.outputs.first().copied().unwrap_or([0.0; 4])
        };

        Execution {
            outputs: frame.outputs,
            position: frame.position,
            frag_color,
        }
    }
}

struct Frame<'a> {
    inputs: &'a [Value],
    outputs: Vec<Value>,
    locals: Vec<Value>,
    position: Value,
    frag_color: Value,
}

impl Frame<'_> {
    fn eval(&self, expr: &Expr) -> Value {
        match expr {
            Expr::Const(v) => [*v, 0.0, 0.0, 0.0],
            Expr::Input(i) => self.inputs.get(*i).copied().unwrap_or([0.0, 0.0, 0.0, 1.0]),
            Expr::Output(i) => self.outputs[*i],
            Expr::Local(i) => self.locals[*i],
            Expr::Neg(inner) => self.eval(inner).map(|c| -c),
            Expr::Construct {
                ty,
                args,
                broadcast,
            } => {
                let n = ty.components();
                let mut out = [0.0; 4];
                if *broadcast {
                    let s = self.eval(&args[0].0)[0];
                    out[..n].fill(s);
                } else {
                    let mut filled = 0;
                    for (arg, comps) in args {
                        let v = self.eval(arg);
                        for &c in v.iter().take(*comps) {
                            if filled < n {
                                out[filled] = c;
                                filled += 1;
                            }
                        }
                    }
                }
                out
            }
        }
    }
}

// --- preprocessing and tokens ---

fn is_blank_or_comment(line: &str) -> bool {
    line.is_empty() || line.starts_with("//")
}

/// Handles directives line by line, replacing them with blank lines so that
/// token line numbers still match the source.
fn preprocess(source: &str) -> Result<(Dialect, String), CompileError> {
    let mut dialect = None;
    let mut seen_code = false;
    let mut out = String::with_capacity(source.len());

    for (i, line) in source.lines().enumerate() {
        let lineno = i + 1;
        let trimmed = line.trim();

        if let Some(directive) = trimmed.strip_prefix('#') {
            let mut words = directive.split_whitespace();
            match words.next() {
                Some("version") => {
                    if seen_code || dialect.is_some() {
                        return Err(error(lineno, "#version : must occur first in a shader"));
                    }
                    dialect = Some(match (words.next(), words.next()) {
                        (Some("100"), None) => Dialect::Es100,
                        (Some("300"), Some("es")) => Dialect::Es300,
                        (Some(v), profile) => {
                            let profile = profile.map(|p| format!(" {p}")).unwrap_or_default();
                            return Err(error(
                                lineno,
                                format!("'{v}{profile}' : version number not supported"),
                            ));
                        }
                        (None, _) => return Err(error(lineno, "#version : missing version number")),
                    });
                }
                Some(other) => {
                    return Err(error(
                        lineno,
                        format!("'#{other}' : preprocessor directive not supported"),
                    ))
                }
                None => {}
            }
        } else {
            if !is_blank_or_comment(trimmed) {
                seen_code = true;
            }
            out.push_str(line);
        }
        out.push('\n');
    }

    Ok((dialect.unwrap_or(Dialect::Es100), out))
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    /// Value and whether the literal was written as an integer.
    Number(f32, bool),
    Punct(char),
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tok::Ident(s) => f.write_str(s),
            Tok::Number(v, _) => write!(f, "{v}"),
            Tok::Punct(c) => write!(f, "{c}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    tok: Tok,
    line: usize,
}

fn tokenize(src: &str) -> Result<Vec<Token>, CompileError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c == '\n' {
            line += 1;
            i += 1;
        } else if c.is_whitespace() {
            i += 1;
        } else if c == '/' && next == Some('/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
        } else if c == '/' && next == Some('*') {
            let start = line;
            i += 2;
            loop {
                match chars.get(i) {
                    None => return Err(error(start, "unterminated comment")),
                    Some('*') if chars.get(i + 1) == Some(&'/') => {
                        i += 2;
                        break;
                    }
                    Some('\n') => line += 1,
                    Some(_) => {}
                }
                i += 1;
            }
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token {
                tok: Tok::Ident(chars[start..i].iter().collect()),
                line,
            });
        } else if c.is_ascii_digit() || (c == '.' && next.is_some_and(|n| n.is_ascii_digit())) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            if i < chars.len() && matches!(chars[i], 'e' | 'E') {
                i += 1;
                if i < chars.len() && matches!(chars[i], '+' | '-') {
                    i += 1;
                }
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            let text: String = chars[start..i].iter().collect();
            let is_int = text.chars().all(|c| c.is_ascii_digit());
            let value = text
                .parse::<f32>()
                .map_err(|_| error(line, format!("'{text}' : invalid number")))?;
            tokens.push(Token {
                tok: Tok::Number(value, is_int),
                line,
            });
        } else if "(){};,=-+*/.[]".contains(c) {
            tokens.push(Token {
                tok: Tok::Punct(c),
                line,
            });
            i += 1;
        } else {
            return Err(error(line, format!("'{c}' : unexpected character")));
        }
    }

    Ok(tokens)
}

// --- parsing ---

#[derive(Clone, Copy)]
enum Storage {
    Input,
    Output,
}

struct Parser {
    stage: ShaderStage,
    dialect: Dialect,
    tokens: Vec<Token>,
    pos: usize,
    last_line: usize,
    inputs: Vec<Variable>,
    outputs: Vec<Variable>,
    locals: Vec<Variable>,
    body: Vec<Statement>,
    has_main: bool,
    writes_frag_color: bool,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token, CompileError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| error(self.last_line, "syntax error, unexpected end of file"))?;
        self.pos += 1;
        Ok(token)
    }

    fn expect_punct(&mut self, expected: char) -> Result<usize, CompileError> {
        let token = self.next()?;
        match token.tok {
            Tok::Punct(c) if c == expected => Ok(token.line),
            other => Err(error(
                token.line,
                format!("syntax error, unexpected '{other}', expecting '{expected}'"),
            )),
        }
    }

    fn expect_ident(&mut self) -> Result<(String, usize), CompileError> {
        let token = self.next()?;
        match token.tok {
            Tok::Ident(name) => Ok((name, token.line)),
            other => Err(error(
                token.line,
                format!("syntax error, unexpected '{other}', expecting identifier"),
            )),
        }
    }

    fn at_punct(&self, c: char) -> bool {
        matches!(self.peek(), Some(Token { tok: Tok::Punct(p), .. }) if *p == c)
    }

    fn is_declared(&self, name: &str) -> bool {
        self.inputs
            .iter()
            .chain(&self.outputs)
            .chain(&self.locals)
            .any(|v| v.name == name)
    }

    fn parse_module(mut self) -> Result<ShaderModule, CompileError> {
        while let Some(token) = self.peek().cloned() {
            match &token.tok {
                Tok::Ident(word) => match word.as_str() {
                    "precision" => self.parse_precision()?,
                    "attribute" | "varying" | "in" | "out" | "uniform" | "const" => {
                        self.parse_global(word, token.line)?
                    }
                    "void" => self.parse_function()?,
                    w if Type::from_name(w).is_some() => {
                        return Err(error(
                            token.line,
                            format!("'{w}' : global variables need a storage qualifier"),
                        ))
                    }
                    w => return Err(error(token.line, format!("syntax error, unexpected '{w}'"))),
                },
                other => {
                    return Err(error(token.line, format!("syntax error, unexpected '{other}'")))
                }
            }
        }

        if !self.has_main {
            return Err(error(self.last_line, "'main' : function not found"));
        }

        Ok(ShaderModule {
            stage: self.stage,
            dialect: self.dialect,
            inputs: self.inputs,
            outputs: self.outputs,
            locals: self.locals,
            body: self.body,
            writes_frag_color: self.writes_frag_color,
        })
    }

    fn parse_precision(&mut self) -> Result<(), CompileError> {
        self.next()?;
        let (qualifier, line) = self.expect_ident()?;
        if !matches!(qualifier.as_str(), "lowp" | "mediump" | "highp") {
            return Err(error(line, format!("'{qualifier}' : invalid precision qualifier")));
        }
        let (ty, line) = self.expect_ident()?;
        if ty != "float" && ty != "int" {
            return Err(error(line, format!("'{ty}' : precision applies to float or int only")));
        }
        self.expect_punct(';')?;
        Ok(())
    }

    fn storage_for(&self, qualifier: &str, line: usize) -> Result<Storage, CompileError> {
        use Dialect::{Es100, Es300};
        use ShaderStage::{Fragment, Vertex};

        match (qualifier, self.dialect, self.stage) {
            ("attribute", Es100, Vertex) => Ok(Storage::Input),
            ("attribute", Es100, Fragment) => Err(error(
                line,
                "'attribute' : supported in vertex shaders only",
            )),
            ("varying", Es100, Vertex) => Ok(Storage::Output),
            ("varying", Es100, Fragment) => Ok(Storage::Input),
            ("in", Es300, _) => Ok(Storage::Input),
            ("out", Es300, _) => Ok(Storage::Output),
            ("attribute" | "varying", Es300, _) => Err(error(
                line,
                format!("'{qualifier}' : Illegal use of reserved word"),
            )),
            ("in" | "out", Es100, _) => Err(error(
                line,
                format!("'{qualifier}' : storage qualifier supported in GLSL ES 3.00 and above only"),
            )),
            _ => Err(error(line, format!("'{qualifier}' : qualifier not supported"))),
        }
    }

    fn parse_global(&mut self, qualifier: &str, line: usize) -> Result<(), CompileError> {
        let storage = self.storage_for(qualifier, line)?;
        self.next()?;

        let (mut type_name, mut line) = self.expect_ident()?;
        if matches!(type_name.as_str(), "lowp" | "mediump" | "highp") {
            (type_name, line) = self.expect_ident()?;
        }
        let ty = Type::from_name(&type_name)
            .ok_or_else(|| error(line, format!("'{type_name}' : type not supported")))?;

        let (name, line) = self.expect_ident()?;
        self.check_new_name(&name, line)?;
        self.expect_punct(';')?;

        let variable = Variable { name, ty };
        match storage {
            Storage::Input => {
                if self.stage == ShaderStage::Vertex && self.inputs.len() == MAX_VERTEX_ATTRIBS {
                    return Err(error(line, "too many vertex attributes"));
                }
                self.inputs.push(variable);
            }
            Storage::Output => {
                if self.stage == ShaderStage::Fragment {
                    if ty != Type::Vec4 {
                        return Err(error(
                            line,
                            format!("'{}' : fragment output must be vec4", variable.name),
                        ));
                    }
                    if !self.outputs.is_empty() {
                        return Err(error(
                            line,
                            format!("'{}' : only one fragment output is supported", variable.name),
                        ));
                    }
                }
                self.outputs.push(variable);
            }
        }
        Ok(())
    }

    fn check_new_name(&self, name: &str, line: usize) -> Result<(), CompileError> {
        if name.starts_with("gl_") {
            return Err(error(line, format!("'{name}' : reserved built-in name")));
        }
        if Type::from_name(name).is_some() {
            return Err(error(line, format!("'{name}' : Illegal use of reserved word")));
        }
        if self.is_declared(name) {
            return Err(error(line, format!("'{name}' : redefinition")));
        }
        Ok(())
    }

    fn parse_function(&mut self) -> Result<(), CompileError> {
        self.next()?;
        let (name, line) = self.expect_ident()?;
        if name != "main" {
            return Err(error(line, format!("'{name}' : only main() is supported")));
        }
        if self.has_main {
            return Err(error(line, "'main' : function already has a body"));
        }

        self.expect_punct('(')?;
        if matches!(self.peek(), Some(Token { tok: Tok::Ident(w), .. }) if w == "void") {
            self.next()?;
        }
        self.expect_punct(')')?;
        self.expect_punct('{')?;

        while !self.at_punct('}') {
            self.parse_statement()?;
        }
        self.last_line = self.expect_punct('}')?;
        self.has_main = true;
        Ok(())
    }

    fn parse_statement(&mut self) -> Result<(), CompileError> {
        let (name, line) = self.expect_ident()?;

        if let Some(ty) = Type::from_name(&name) {
            let (local, line) = self.expect_ident()?;
            self.check_new_name(&local, line)?;
            // The initializer cannot see the variable it initializes.
            let init = if self.at_punct('=') {
                self.next()?;
                let (value, value_ty) = self.parse_expr()?;
                check_assignable(ty, value_ty, line)?;
                Some(value)
            } else {
                None
            };
            self.expect_punct(';')?;

            self.locals.push(Variable { name: local, ty });
            if let Some(value) = init {
                self.body.push(Statement {
                    place: Place::Local(self.locals.len() - 1),
                    value,
                });
            }
            return Ok(());
        }

        let (place, place_ty) = self.resolve_place(&name, line)?;
        self.expect_punct('=')?;
        let (value, value_ty) = self.parse_expr()?;
        check_assignable(place_ty, value_ty, line)?;
        self.expect_punct(';')?;

        if place == Place::FragColor {
            self.writes_frag_color = true;
        }
        self.body.push(Statement { place, value });
        Ok(())
    }

    fn resolve_place(&self, name: &str, line: usize) -> Result<(Place, Type), CompileError> {
        match (name, self.stage, self.dialect) {
            ("gl_Position", ShaderStage::Vertex, _) => return Ok((Place::Position, Type::Vec4)),
            ("gl_FragColor", ShaderStage::Fragment, Dialect::Es100) => {
                return Ok((Place::FragColor, Type::Vec4))
            }
            _ => {}
        }
        if let Some(i) = self.outputs.iter().position(|v| v.name == name) {
            return Ok((Place::Output(i), self.outputs[i].ty));
        }
        if let Some(i) = self.locals.iter().position(|v| v.name == name) {
            return Ok((Place::Local(i), self.locals[i].ty));
        }
        if self.inputs.iter().any(|v| v.name == name) {
            return Err(error(
                line,
                format!("'{name}' : l-value required (can't modify an input)"),
            ));
        }
        Err(error(line, format!("'{name}' : undeclared identifier")))
    }

    fn resolve_value(&self, name: &str, line: usize) -> Result<(Expr, Type), CompileError> {
        if let Some(i) = self.inputs.iter().position(|v| v.name == name) {
            return Ok((Expr::Input(i), self.inputs[i].ty));
        }
        if let Some(i) = self.outputs.iter().position(|v| v.name == name) {
            return Ok((Expr::Output(i), self.outputs[i].ty));
        }
        if let Some(i) = self.locals.iter().position(|v| v.name == name) {
            return Ok((Expr::Local(i), self.locals[i].ty));
        }
        Err(error(line, format!("'{name}' : undeclared identifier")))
    }

    fn parse_expr(&mut self) -> Result<(Expr, Type), CompileError> {
        if self.depth >= MAX_EXPR_DEPTH {
            let line = self.peek().map_or(self.last_line, |t| t.line);
            return Err(error(line, "expression nested too deeply"));
        }
        self.depth += 1;
        let result = self.parse_operand();
        self.depth -= 1;
        result
    }

    fn parse_operand(&mut self) -> Result<(Expr, Type), CompileError> {
        let token = self.next()?;
        match token.tok {
            Tok::Number(v, true) => Ok((Expr::Const(v), Type::Int)),
            Tok::Number(v, false) => Ok((Expr::Const(v), Type::Float)),
            Tok::Punct('-') => {
                let (inner, ty) = self.parse_expr()?;
                Ok((Expr::Neg(Box::new(inner)), ty))
            }
            Tok::Punct('+') => self.parse_expr(),
            Tok::Punct('(') => {
                let inner = self.parse_expr()?;
                self.expect_punct(')')?;
                Ok(inner)
            }
            Tok::Ident(name) => match Type::from_name(&name) {
                Some(ty) => self.parse_constructor(ty, token.line),
                None => self.resolve_value(&name, token.line),
            },
            other => Err(error(token.line, format!("syntax error, unexpected '{other}'"))),
        }
    }

    fn parse_constructor(&mut self, ty: Type, line: usize) -> Result<(Expr, Type), CompileError> {
        self.expect_punct('(')?;
        let mut args = Vec::new();
        if !self.at_punct(')') {
            loop {
                let (arg, arg_ty) = self.parse_expr()?;
                args.push((arg, arg_ty.components()));
                if self.at_punct(',') {
                    self.next()?;
                } else {
                    break;
                }
            }
        }
        self.expect_punct(')')?;

        let name = ty.name();
        let wanted = ty.components();
        let total: usize = args.iter().map(|(_, n)| n).sum();
        let before_last = total - args.last().map_or(0, |(_, n)| *n);

        if args.is_empty() {
            return Err(error(line, format!("'{name}' : constructor does not have any arguments")));
        }
        let broadcast = args.len() == 1 && args[0].1 == 1;
        if !broadcast && total < wanted {
            return Err(error(
                line,
                format!("'{name}' : not enough data provided for construction"),
            ));
        }
        if before_last >= wanted {
            return Err(error(line, format!("'{name}' : too many arguments")));
        }

        Ok((
            Expr::Construct {
                ty,
                args,
                broadcast,
            },
            ty,
        ))
    }
}

fn check_assignable(place: Type, value: Type, line: usize) -> Result<(), CompileError> {
    if place == value {
        Ok(())
    } else {
        Err(error(
            line,
            format!(
                "'assign' : cannot convert from '{}' to '{}'",
                value.name(),
                place.name()
            ),
        ))
    }
}

/// Compiles `source` for `stage`.
///
/// # Errors
///
/// Returns the first diagnostic found.
pub fn compile(stage: ShaderStage, source: &str) -> Result<ShaderModule, CompileError> {
    let (dialect, body) = preprocess(source)?;
    let tokens = tokenize(&body)?;
    let last_line = tokens.last().map_or(1, |t| t.line);

    Parser {
        stage,
        dialect,
        tokens,
        pos: 0,
        last_line,
        inputs: Vec::new(),
        outputs: Vec::new(),
        locals: Vec::new(),
        body: Vec::new(),
        has_main: false,
        writes_frag_color: false,
        depth: 0,
    }
    .parse_module()
}

/// A vertex and fragment module joined through their varyings.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedProgram {
    pub vertex: ShaderModule,
    pub fragment: ShaderModule,
    /// For each fragment input, the index of the vertex output feeding it.
    pub varyings: Vec<usize>,
}

impl LinkedProgram {
    /// Slot of the vertex attribute called `name`.
    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.vertex
            .inputs()
            .iter()
            .position(|v| v.name == name)
            .and_then(|i| u32::try_from(i).ok())
    }
}

/// Links two compiled modules.
///
/// # Errors
///
/// Returns a link log when the stages are swapped, their dialects differ,
/// or a fragment input has no vertex output of the same name and type.
pub fn link(vertex: &ShaderModule, fragment: &ShaderModule) -> Result<LinkedProgram, String> {
    if vertex.stage != ShaderStage::Vertex || fragment.stage != ShaderStage::Fragment {
        return Err("program needs one vertex and one fragment shader".to_string());
    }
    if vertex.dialect != fragment.dialect {
        return Err("vertex and fragment shader versions do not match".to_string());
    }

    let varyings = fragment
        .inputs
        .iter()
        .map(|input| {
            let (index, output) = vertex
                .outputs
                .iter()
                .enumerate()
                .find(|(_, o)| o.name == input.name)
                .ok_or_else(|| {
                    format!(
                        "fragment input '{}' is not written by the vertex shader",
                        input.name
                    )
                })?;
            if output.ty != input.ty {
                return Err(format!(
                    "type of '{}' differs between stages: {} vs {}",
                    input.name,
                    output.ty.name(),
                    input.ty.name()
                ));
            }
            Ok(index)
        })
        .collect::<Result<Vec<_>, String>>()?;

    Ok(LinkedProgram {
        vertex: vertex.clone(),
        fragment: fragment.clone(),
        varyings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{
        COLORED_FRAGMENT_SHADER, COLORED_VERTEX_SHADER, SOLID_FRAGMENT_SHADER,
        SOLID_VERTEX_SHADER,
    };

    const WEBGL1_VERTEX: &str = "
    attribute vec3 position;
    void main() {
      gl_Position = vec4(position, 1);
    }
    ";

    const WEBGL1_FRAGMENT: &str = "
    void main() {
      gl_FragColor = vec4(1, 0, 0, 1);
    }
    ";

    fn vertex(source: &str) -> Result<ShaderModule, CompileError> {
        compile(ShaderStage::Vertex, source)
    }

    fn fragment(source: &str) -> Result<ShaderModule, CompileError> {
        compile(ShaderStage::Fragment, source)
    }

    #[test]
    fn built_in_shaders_compile() {
        for source in [SOLID_VERTEX_SHADER, COLORED_VERTEX_SHADER] {
            assert!(vertex(source).is_ok(), "failed:\n{source}");
        }
        for source in [SOLID_FRAGMENT_SHADER, COLORED_FRAGMENT_SHADER] {
            assert!(fragment(source).is_ok(), "failed:\n{source}");
        }
    }

    #[test]
    fn version_directive_selects_dialect() {
        assert_eq!(vertex(SOLID_VERTEX_SHADER).unwrap().dialect(), Dialect::Es300);
        assert_eq!(vertex(WEBGL1_VERTEX).unwrap().dialect(), Dialect::Es100);
    }

    #[test]
    fn webgl1_sources_compile_and_run() {
        let vs = vertex(WEBGL1_VERTEX).unwrap();
        let run = vs.execute(&[[0.5, -0.25, 0.0, 1.0]]);
        assert_eq!(run.position, [0.5, -0.25, 0.0, 1.0]);

        let fs = fragment(WEBGL1_FRAGMENT).unwrap();
        assert_eq!(fs.execute(&[]).frag_color, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn colored_shaders_forward_color() {
        let vs = vertex(COLORED_VERTEX_SHADER).unwrap();
        let names: Vec<&str> = vs.inputs().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["position", "color"]);

        let run = vs.execute(&[[0.0, 1.0, 0.0, 1.0], [0.2, 0.4, 0.6, 1.0]]);
        assert_eq!(run.outputs[0][..3], [0.2, 0.4, 0.6]);

        let fs = fragment(COLORED_FRAGMENT_SHADER).unwrap();
        assert_eq!(fs.execute(&[[0.2, 0.4, 0.6, 0.0]]).frag_color, [0.2, 0.4, 0.6, 1.0]);
    }

    #[test]
    fn constructor_broadcasts_single_scalar() {
        let fs = fragment("void main() { gl_FragColor = vec4(0.5); }").unwrap();
        assert_eq!(fs.execute(&[]).frag_color, [0.5; 4]);
    }

    #[test]
    fn locals_and_negation_evaluate() {
        let source = "
            attribute vec3 position;
            void main() {
                vec3 p = position;
                float w = 1.0;
                gl_Position = vec4(-p, w);
            }
        ";
        let run = vertex(source).unwrap().execute(&[[1.0, 2.0, 3.0, 1.0]]);
        assert_eq!(run.position, [-1.0, -2.0, -3.0, 1.0]);
    }

    #[test]
    fn comments_are_ignored_and_lines_counted() {
        let source = "// header\n/* block\n comment */\nvoid main() {\n  gl_FragColor = nope;\n}\n";
        let err = fragment(source).unwrap_err();
        assert_eq!(err.line, 5);
        assert!(err.message.contains("nope"), "got: {err}");
    }

    #[test]
    fn missing_semicolon_is_a_syntax_error() {
        let err = fragment("void main() {\n gl_FragColor = vec4(1.0)\n}").unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.to_string().starts_with("ERROR: 0:3: syntax error"), "got: {err}");
    }

    #[test]
    fn missing_main_is_reported() {
        let err = vertex("attribute vec3 position;").unwrap_err();
        assert!(err.message.contains("'main'"), "got: {err}");
    }

    #[test]
    fn assignment_type_mismatch_is_reported() {
        let err = vertex("attribute vec3 p;\nvoid main() { gl_Position = p; }").unwrap_err();
        assert!(err.message.contains("cannot convert from 'vec3' to 'vec4'"), "got: {err}");
    }

    #[test]
    fn constructor_arity_is_checked() {
        let err = fragment("void main() { gl_FragColor = vec4(1.0, 0.0); }").unwrap_err();
        assert!(err.message.contains("not enough data"), "got: {err}");

        let err = fragment("void main() { gl_FragColor = vec4(1.0, 0.0, 0.0, 1.0, 1.0); }")
            .unwrap_err();
        assert!(err.message.contains("too many arguments"), "got: {err}");
    }

    #[test]
    fn inputs_are_read_only() {
        let err = vertex("attribute vec3 p;\nvoid main() { p = vec3(0.0); }").unwrap_err();
        assert!(err.message.contains("l-value"), "got: {err}");
    }

    #[test]
    fn dialect_qualifiers_are_enforced() {
        let err = vertex("#version 300 es\nattribute vec3 p;\nvoid main() {}").unwrap_err();
        assert!(err.message.contains("reserved word"), "got: {err}");

        let err = vertex("in vec3 p;\nvoid main() {}").unwrap_err();
        assert!(err.message.contains("GLSL ES 3.00"), "got: {err}");

        let err = fragment("#version 300 es\nvoid main() { gl_FragColor = vec4(1.0); }")
            .unwrap_err();
        assert!(err.message.contains("gl_FragColor"), "got: {err}");
    }

    #[test]
    fn version_must_come_first() {
        let err = vertex("void main() {}\n#version 300 es\n").unwrap_err();
        assert_eq!(err.line, 2);
        let err = vertex("#version 450\nvoid main() {}").unwrap_err();
        assert!(err.message.contains("not supported"), "got: {err}");
    }

    #[test]
    fn redefinition_is_rejected() {
        let err = vertex("attribute vec3 p;\nattribute vec2 p;\nvoid main() {}").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("redefinition"), "got: {err}");
    }

    #[test]
    fn deeply_nested_expression_is_a_diagnostic() {
        let source = format!("void main() {{ gl_FragColor = {}vec4(1.0); }}", "-".repeat(200_000));
        let err = fragment(&source).unwrap_err();
        assert!(err.message.contains("nested too deeply"), "got: {err}");

        let parens = format!(
            "void main() {{ gl_FragColor = {}vec4(1.0){}; }}",
            "(".repeat(MAX_EXPR_DEPTH),
            ")".repeat(MAX_EXPR_DEPTH)
        );
        assert!(fragment(&parens).is_err());
    }

    #[test]
    fn moderate_nesting_still_compiles() {
        let fs = fragment("void main() { gl_FragColor = vec4(-(-(0.5))); }").unwrap();
        assert_eq!(fs.execute(&[]).frag_color, [0.5; 4]);
    }

    #[test]
    fn local_initializer_cannot_read_itself() {
        let err = vertex("void main() {\n  vec3 p = p;\n  gl_Position = vec4(p, 1.0);\n}")
            .unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("'p' : undeclared identifier"), "got: {err}");
    }

    #[test]
    fn integer_literal_does_not_convert_to_float() {
        let err = vertex("void main() {\n  float w = 1;\n  gl_Position = vec4(w);\n}").unwrap_err();
        assert!(err.message.contains("cannot convert from 'int' to 'float'"), "got: {err}");

        let err = fragment("void main() { gl_FragColor = vec4(1.0); gl_FragColor = -2; }")
            .unwrap_err();
        assert!(err.message.contains("'int'"), "got: {err}");
    }

    #[test]
    fn integer_literals_are_accepted_by_constructors() {
        let fs = fragment("void main() { float w = float(2); gl_FragColor = vec4(w, 0, 1e0, 1); }")
            .unwrap();
        assert_eq!(fs.execute(&[]).frag_color, [2.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn link_resolves_varyings_by_name() {
        let vs = vertex(COLORED_VERTEX_SHADER).unwrap();
        let fs = fragment(COLORED_FRAGMENT_SHADER).unwrap();
        let program = link(&vs, &fs).unwrap();
        assert_eq!(program.varyings, [0]);
        assert_eq!(program.attribute_location("position"), Some(0));
        assert_eq!(program.attribute_location("color"), Some(1));
        assert_eq!(program.attribute_location("normal"), None);
    }

    #[test]
    fn link_rejects_missing_varying() {
        let vs = vertex(SOLID_VERTEX_SHADER).unwrap();
        let fs = fragment(COLORED_FRAGMENT_SHADER).unwrap();
        let log = link(&vs, &fs).unwrap_err();
        assert!(log.contains("v_color"), "got: {log}");
    }

    #[test]
    fn link_rejects_mixed_dialects() {
        let vs = vertex(WEBGL1_VERTEX).unwrap();
        let fs = fragment(SOLID_FRAGMENT_SHADER).unwrap();
        assert!(link(&vs, &fs).unwrap_err().contains("versions"));
    }

    #[test]
    fn link_rejects_swapped_stages() {
        let vs = vertex(WEBGL1_VERTEX).unwrap();
        let fs = fragment(WEBGL1_FRAGMENT).unwrap();
        assert!(link(&fs, &vs).is_err());
    }
}
