/*!
Abstract syntax tree for the SQL dialect.

Nodes are built by the parser, mutated only by the pre-emission rewrite
passes, and read by the DSL emitter. Every `Display` implementation
produces parsable SQL, so `parse(stringify(stmt))` reproduces the same
tree.
*/

pub mod eval;
pub mod visit;

use std::fmt;

use crate::sql::parser::lexer::Token;

/// A single SELECT statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    /// Expressions returned from the selection
    pub fields: Vec<Field>,
    /// Data sources that fields are extracted from
    pub sources: Vec<Measurement>,
    /// Filter expression evaluated per document
    pub condition: Option<Expr>,
    /// Expressions used for grouping the selection
    pub dimensions: Vec<Dimension>,
    /// Filter over grouped buckets
    pub having: Option<Expr>,
    /// Fields to sort results by
    pub sort_fields: Vec<SortField>,
    /// Maximum number of rows to be returned; unlimited if zero
    pub limit: i64,
    /// Returns rows starting at an offset from the first row
    pub offset: i64,
    /// True when no aggregate call appears anywhere in the projection
    pub is_raw_query: bool,
    /// Removes duplicate rows from raw queries
    pub dedupe: bool,
}

/// An item in the projection list.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl Field {
    /// Name of the field: the alias if set, otherwise the function or
    /// variable name the expression resolves to.
    pub fn name(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        match &self.expr {
            Expr::Call { name, .. } => name.clone(),
            Expr::VarRef { value, .. } => value.clone(),
            Expr::Paren(inner) => Field {
                expr: (**inner).clone(),
                alias: None,
            }
            .name(),
            _ => String::new(),
        }
    }
}

/// An item in GROUP BY.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub expr: Expr,
    pub alias: Option<String>,
}

/// An item in ORDER BY. The first sort field may be a bare ASC/DESC with
/// no name.
#[derive(Debug, Clone, PartialEq)]
pub struct SortField {
    pub name: Option<String>,
    pub ascending: bool,
}

/// The FROM target, a single bare identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub database: String,
}

/// Binary operators, in SQL spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    And,
    Or,
    In,
    NotIn,
    Equal,
    NotEqual,
    RegexMatch,
    RegexNotMatch,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl BinaryOperator {
    pub fn from_token(tok: Token) -> Option<BinaryOperator> {
        match tok {
            Token::Add => Some(BinaryOperator::Add),
            Token::Sub => Some(BinaryOperator::Subtract),
            Token::Mul => Some(BinaryOperator::Multiply),
            Token::Div => Some(BinaryOperator::Divide),
            Token::Mod => Some(BinaryOperator::Modulo),
            Token::And => Some(BinaryOperator::And),
            Token::Or => Some(BinaryOperator::Or),
            Token::In => Some(BinaryOperator::In),
            Token::Ni => Some(BinaryOperator::NotIn),
            Token::Eq => Some(BinaryOperator::Equal),
            Token::Neq => Some(BinaryOperator::NotEqual),
            Token::EqRegex => Some(BinaryOperator::RegexMatch),
            Token::NeqRegex => Some(BinaryOperator::RegexNotMatch),
            Token::Lt => Some(BinaryOperator::LessThan),
            Token::Lte => Some(BinaryOperator::LessThanOrEqual),
            Token::Gt => Some(BinaryOperator::GreaterThan),
            Token::Gte => Some(BinaryOperator::GreaterThanOrEqual),
            _ => None,
        }
    }

    /// SQL spelling, used by `Display`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::In => "IN",
            BinaryOperator::NotIn => "NI",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::RegexMatch => "=~",
            BinaryOperator::RegexNotMatch => "!~",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
        }
    }

    /// Spelling in the target's inline-script dialect.
    pub fn script_str(&self) -> &'static str {
        match self {
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
            BinaryOperator::Equal => "==",
            other => other.as_str(),
        }
    }

    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOperator::Or => 1,
            BinaryOperator::And => 2,
            BinaryOperator::In | BinaryOperator::NotIn => 3,
            BinaryOperator::Equal
            | BinaryOperator::NotEqual
            | BinaryOperator::RegexMatch
            | BinaryOperator::RegexNotMatch
            | BinaryOperator::LessThan
            | BinaryOperator::LessThanOrEqual
            | BinaryOperator::GreaterThan
            | BinaryOperator::GreaterThanOrEqual => 4,
            BinaryOperator::Add | BinaryOperator::Subtract => 5,
            BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => 6,
        }
    }

    /// Operators that produce a boolean: comparisons, logicals, and set
    /// membership. These belong in WHERE/HAVING, never in SELECT fields.
    pub fn is_boolean(&self) -> bool {
        !matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Subtract
                | BinaryOperator::Multiply
                | BinaryOperator::Divide
                | BinaryOperator::Modulo
        )
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A possibly-dotted column reference. `segments` always holds the
    /// original dotted parts, even after the rewrite phase overwrites
    /// `value` with the script-style `doc['NAME'].value` form.
    VarRef {
        value: String,
        segments: Vec<String>,
    },
    /// Function invocation; the name is stored lower-cased.
    Call { name: String, args: Vec<Expr> },
    /// Any binary operation.
    Binary {
        op: BinaryOperator,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Parenthesized grouping.
    Paren(Box<Expr>),
    /// `*`
    Wildcard,
    /// A terminal literal value.
    Literal(Literal),
}

impl Expr {
    pub fn var_ref(value: impl Into<String>) -> Expr {
        let value = value.into();
        let segments = value.split('.').map(|s| s.to_string()).collect();
        Expr::VarRef { value, segments }
    }

    pub fn integer(v: i64) -> Expr {
        Expr::Literal(Literal::Integer(v))
    }

    pub fn string(v: impl Into<String>) -> Expr {
        Expr::Literal(Literal::String(v.into()))
    }

    /// Collect every `Call` in this expression, pre-order.
    pub fn function_calls(&self) -> Vec<&Expr> {
        let mut calls = Vec::new();
        collect_calls(self, &mut calls);
        calls
    }
}

fn collect_calls<'a>(expr: &'a Expr, out: &mut Vec<&'a Expr>) {
    match expr {
        Expr::Call { args, .. } => {
            out.push(expr);
            for arg in args {
                collect_calls(arg, out);
            }
        }
        Expr::Binary { lhs, rhs, .. } => {
            collect_calls(lhs, out);
            collect_calls(rhs, out);
        }
        Expr::Paren(inner) => collect_calls(inner, out),
        _ => {}
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Number(f64),
    String(String),
    Boolean(bool),
    /// Regex pattern text, slash-delimited in source
    Regex(String),
    /// Bracketed list of string/integer/float elements
    List(Vec<Literal>),
}

/// Quote a string for SQL output: `foo` becomes `'foo'` with `\`, `'` and
/// line feeds escaped.
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Quote an identifier when its spelling demands it (keyword collision or
/// characters outside the bare-identifier alphabet).
pub fn quote_ident(ident: &str) -> String {
    if !ident_needs_quotes(ident) {
        return ident.to_string();
    }
    let mut out = String::with_capacity(ident.len() + 2);
    out.push('"');
    for ch in ident.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn ident_needs_quotes(ident: &str) -> bool {
    if ident.is_empty() || Token::lookup(ident) != Token::Ident {
        return true;
    }
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '@' => {}
        _ => return true,
    }
    chars.any(|c| !(c.is_ascii_alphanumeric() || c == '_' || c == '@'))
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(v) => write!(f, "{}", v),
            Literal::Number(v) => write!(f, "{:.3}", v),
            Literal::String(s) => f.write_str(&quote_string(s)),
            Literal::Boolean(b) => f.write_str(if *b { "true" } else { "false" }),
            Literal::Regex(pattern) => write!(f, "/{}/", pattern.replace('/', "\\/")),
            Literal::List(values) => {
                f.write_str("[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::VarRef { value, .. } => f.write_str(value),
            Expr::Call { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
            Expr::Binary { op, lhs, rhs } => write!(f, "{} {} {}", lhs, op, rhs),
            Expr::Paren(inner) => write!(f, "({})", inner),
            Expr::Wildcard => f.write_str("*"),
            Expr::Literal(lit) => write!(f, "{}", lit),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", quote_ident(alias))?;
        }
        Ok(())
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", quote_ident(alias))?;
        }
        Ok(())
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{} ", name)?;
        }
        f.write_str(if self.ascending { "ASC" } else { "DESC" })
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&quote_ident(&self.database))
    }
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT ")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", field)?;
        }
        if !self.sources.is_empty() {
            f.write_str(" FROM ")?;
            for (i, source) in self.sources.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", source)?;
            }
        }
        if let Some(cond) = &self.condition {
            write!(f, " WHERE {}", cond)?;
        }
        if !self.dimensions.is_empty() {
            f.write_str(" GROUP BY ")?;
            for (i, dim) in self.dimensions.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", dim)?;
            }
        }
        if let Some(having) = &self.having {
            write!(f, " HAVING {}", having)?;
        }
        if !self.sort_fields.is_empty() {
            f.write_str(" ORDER BY ")?;
            for (i, sf) in self.sort_fields.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", sf)?;
            }
        }
        if self.offset > 0 {
            write!(f, " LIMIT {}, {}", self.limit, self.offset)?;
        } else if self.limit > 0 {
            write!(f, " LIMIT {}", self.limit)?;
        }
        Ok(())
    }
}
