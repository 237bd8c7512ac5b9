//! The `$filter` / `$orderby` / `$select` / `$expand` expression language.
//!
//! Parsing runs in three stages: [`lexer`] splits the text into tokens,
//! the grouping pass in [`parser`] folds every parenthesised span (method
//! calls, `any`/`all` aggregates, plain grouping) into a single synthetic
//! token, and precedence climbing splits the remaining flat token run at
//! its lowest-precedence operator.

mod lexer;
mod literal;
mod parser;

use std::fmt;

use rust_decimal::Decimal;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use time::{OffsetDateTime, Time};
use uuid::Uuid;

use crate::json::{format_double, format_single};
use crate::timefmt;

pub use parser::{parse_expand, parse_filter, parse_orderby, parse_select, parse_value};

/// Expression-language failures. Each carries the offending token or name.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExprError {
    #[error("unable to tokenize '{text}' at offset {offset}")]
    Tokenize { text: String, offset: usize },

    #[error("unterminated quoted string at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("unmatched parenthesis at offset {offset}")]
    UnmatchedParen { offset: usize },

    #[error("empty expression")]
    Empty,

    #[error("expected ':', found: {found}")]
    ExpectedColon { found: String },

    #[error("unexpected token: {found}")]
    UnexpectedToken { found: String },

    #[error("illegal {function} predicate")]
    IllegalPredicate { function: AggregateFunction },

    #[error("method {method} with {arity} argument(s) is not implemented")]
    NotImplemented { method: String, arity: usize },

    #[error("expected {expected} for {context}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        context: String,
        found: String,
    },

    #[error("invalid {kind} literal '{text}'")]
    InvalidLiteral { kind: &'static str, text: String },

    #[error("unable to read expression: {text}")]
    Unreadable { text: String },

    #[error("invalid navigation property name: {name}")]
    InvalidNavigation { name: String },
}

// ──────────────────────────────────────────────
// Literals
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    String(String),
    Int32(i32),
    Int64(i64),
    Single(f32),
    Double(f64),
    Decimal(Decimal),
    /// Zone-less date-time, normalised to UTC.
    DateTime(OffsetDateTime),
    DateTimeOffset(OffsetDateTime),
    Time(Time),
    Guid(Uuid),
    Binary(Vec<u8>),
}

impl Literal {
    /// EDM type name of the literal; `null` has none.
    pub fn edm_type(&self) -> Option<&'static str> {
        let name = match self {
            Literal::Null => return None,
            Literal::Boolean(_) => "Edm.Boolean",
            Literal::String(_) => "Edm.String",
            Literal::Int32(_) => "Edm.Int32",
            Literal::Int64(_) => "Edm.Int64",
            Literal::Single(_) => "Edm.Single",
            Literal::Double(_) => "Edm.Double",
            Literal::Decimal(_) => "Edm.Decimal",
            Literal::DateTime(_) => "Edm.DateTime",
            Literal::DateTimeOffset(_) => "Edm.DateTimeOffset",
            Literal::Time(_) => "Edm.Time",
            Literal::Guid(_) => "Edm.Guid",
            Literal::Binary(_) => "Edm.Binary",
        };
        Some(name)
    }
}

fn fractional(text: String) -> String {
    if text.contains(['.', 'e', 'E']) {
        text
    } else {
        format!("{}.0", text)
    }
}

/// The literal in its query-string form, e.g. `'it''s'`, `10L`, `2.5M`.
impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("null"),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Int32(n) => write!(f, "{}", n),
            Literal::Int64(n) => write!(f, "{}L", n),
            Literal::Single(v) => write!(f, "{}f", format_single(*v)),
            Literal::Double(v) => f.write_str(&fractional(format_double(*v))),
            Literal::Decimal(d) => write!(f, "{}M", d),
            Literal::DateTime(dt) => {
                let local = time::PrimitiveDateTime::new(dt.date(), dt.time());
                write!(
                    f,
                    "datetime'{}'",
                    timefmt::format_rfc3339(local.assume_utc()).trim_end_matches('Z')
                )
            }
            Literal::DateTimeOffset(dt) => {
                write!(f, "datetimeoffset'{}'", timefmt::format_rfc3339(*dt))
            }
            Literal::Time(t) => write!(f, "time'{}'", timefmt::format_time(*t)),
            Literal::Guid(g) => write!(f, "guid'{}'", g),
            Literal::Binary(b) => write!(f, "X'{}'", hex::encode_upper(b)),
        }
    }
}

impl Serialize for Literal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Literal", 2)?;
        s.serialize_field("type", &self.edm_type())?;
        s.serialize_field("text", &self.to_string())?;
        s.end()
    }
}

// ──────────────────────────────────────────────
// Operators
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    /// Lowest precedence first.
    pub(crate) const PRECEDENCE: [BinaryOp; 13] = [
        BinaryOp::Or,
        BinaryOp::And,
        BinaryOp::Eq,
        BinaryOp::Ne,
        BinaryOp::Lt,
        BinaryOp::Gt,
        BinaryOp::Le,
        BinaryOp::Ge,
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Mod,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::Lt => "lt",
            BinaryOp::Gt => "gt",
            BinaryOp::Le => "le",
            BinaryOp::Ge => "ge",
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
        }
    }

    /// Logical and comparison operators produce booleans.
    pub fn is_bool(self) -> bool {
        !matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Cast,
    IsOf,
    EndsWith,
    StartsWith,
    SubstringOf,
    IndexOf,
    Replace,
    ToLower,
    ToUpper,
    Trim,
    Substring,
    Concat,
    Length,
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Round,
    Floor,
    Ceiling,
}

impl Method {
    pub const ALL: [Method; 22] = [
        Method::Cast,
        Method::IsOf,
        Method::EndsWith,
        Method::StartsWith,
        Method::SubstringOf,
        Method::IndexOf,
        Method::Replace,
        Method::ToLower,
        Method::ToUpper,
        Method::Trim,
        Method::Substring,
        Method::Concat,
        Method::Length,
        Method::Year,
        Method::Month,
        Method::Day,
        Method::Hour,
        Method::Minute,
        Method::Second,
        Method::Round,
        Method::Floor,
        Method::Ceiling,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Method::Cast => "cast",
            Method::IsOf => "isof",
            Method::EndsWith => "endswith",
            Method::StartsWith => "startswith",
            Method::SubstringOf => "substringof",
            Method::IndexOf => "indexof",
            Method::Replace => "replace",
            Method::ToLower => "tolower",
            Method::ToUpper => "toupper",
            Method::Trim => "trim",
            Method::Substring => "substring",
            Method::Concat => "concat",
            Method::Length => "length",
            Method::Year => "year",
            Method::Month => "month",
            Method::Day => "day",
            Method::Hour => "hour",
            Method::Minute => "minute",
            Method::Second => "second",
            Method::Round => "round",
            Method::Floor => "floor",
            Method::Ceiling => "ceiling",
        }
    }

    pub fn from_name(name: &str) -> Option<Method> {
        Method::ALL.into_iter().find(|m| m.name() == name)
    }

    /// Argument counts the method is defined for.
    pub fn arities(self) -> &'static [usize] {
        match self {
            Method::Cast | Method::IsOf | Method::SubstringOf => &[1, 2],
            Method::Substring => &[2, 3],
            Method::Replace => &[3],
            Method::EndsWith | Method::StartsWith | Method::IndexOf | Method::Concat => &[2],
            _ => &[1],
        }
    }

    pub fn is_bool(self) -> bool {
        matches!(
            self,
            Method::IsOf | Method::EndsWith | Method::StartsWith | Method::SubstringOf
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunction {
    Any,
    All,
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AggregateFunction::Any => "any",
            AggregateFunction::All => "all",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

// ──────────────────────────────────────────────
// Expression tree
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    Literal {
        value: Literal,
    },
    /// A member reference; navigation paths keep their `/` separators.
    Property {
        name: String,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Method {
        method: Method,
        args: Vec<Expr>,
    },
    /// `source/any(var: predicate)`, `source/all(var: predicate)` or the
    /// nullary existence check `source/any()`.
    Aggregate {
        function: AggregateFunction,
        source: Box<Expr>,
        variable: Option<String>,
        predicate: Option<Box<Expr>>,
    },
    Paren {
        inner: Box<Expr>,
    },
    BoolParen {
        inner: Box<Expr>,
    },
}

impl Expr {
    pub fn literal(value: Literal) -> Expr {
        Expr::Literal { value }
    }

    pub fn property(name: impl Into<String>) -> Expr {
        Expr::Property { name: name.into() }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Whether the expression is boolean-valued.
    pub fn is_bool(&self) -> bool {
        match self {
            Expr::Literal { value } => matches!(value, Literal::Boolean(_)),
            Expr::Binary { op, .. } => op.is_bool(),
            Expr::Unary { op, .. } => *op == UnaryOp::Not,
            Expr::Method { method, .. } => method.is_bool(),
            Expr::Aggregate { .. } | Expr::BoolParen { .. } => true,
            Expr::Property { .. } | Expr::Paren { .. } => false,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Expr::Literal { .. } => "literal",
            Expr::Property { .. } => "property",
            Expr::Binary { .. } => "binary expression",
            Expr::Unary { .. } => "unary expression",
            Expr::Method { .. } => "method call",
            Expr::Aggregate { .. } => "aggregate",
            Expr::Paren { .. } | Expr::BoolParen { .. } => "parenthesised expression",
        }
    }
}

/// S-expression rendering: `(and (eq Name 'foo') (gt Age 10))`.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal { value } => write!(f, "{}", value),
            Expr::Property { name } => f.write_str(name),
            Expr::Binary { op, lhs, rhs } => write!(f, "({} {} {})", op.keyword(), lhs, rhs),
            Expr::Unary { op, operand } => match op {
                UnaryOp::Not => write!(f, "(not {})", operand),
                UnaryOp::Negate => write!(f, "(- {})", operand),
            },
            Expr::Method { method, args } => {
                write!(f, "({}", method.name())?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                f.write_str(")")
            }
            Expr::Aggregate {
                function,
                source,
                variable,
                predicate,
            } => {
                write!(f, "({} {}", function, source)?;
                if let (Some(var), Some(pred)) = (variable, predicate) {
                    write!(f, " {} {}", var, pred)?;
                }
                f.write_str(")")
            }
            Expr::Paren { inner } | Expr::BoolParen { inner } => write!(f, "{}", inner),
        }
    }
}

/// One `$orderby` item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderBy {
    pub expr: Expr,
    pub direction: SortDirection,
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            SortDirection::Asc => write!(f, "{} asc", self.expr),
            SortDirection::Desc => write!(f, "{} desc", self.expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_query_forms() {
        assert_eq!(Literal::String("it's".into()).to_string(), "'it''s'");
        assert_eq!(Literal::Int64(7).to_string(), "7L");
        assert_eq!(Literal::Double(2.0).to_string(), "2.0");
        assert_eq!(Literal::Single(2.5).to_string(), "2.5f");
        assert_eq!(Literal::Decimal(Decimal::new(25, 1)).to_string(), "2.5M");
        assert_eq!(Literal::Binary(vec![0x0a, 0xff]).to_string(), "X'0AFF'");
    }

    #[test]
    fn method_table() {
        assert_eq!(Method::from_name("substringof"), Some(Method::SubstringOf));
        assert_eq!(Method::from_name("nope"), None);
        assert_eq!(Method::Substring.arities(), &[2, 3]);
        assert!(Method::StartsWith.is_bool());
        assert!(!Method::ToLower.is_bool());
    }

    #[test]
    fn display_is_sexpr() {
        let e = Expr::binary(
            BinaryOp::And,
            Expr::binary(
                BinaryOp::Eq,
                Expr::property("Name"),
                Expr::literal(Literal::String("foo".into())),
            ),
            Expr::binary(
                BinaryOp::Gt,
                Expr::property("Age"),
                Expr::literal(Literal::Int32(10)),
            ),
        );
        assert_eq!(e.to_string(), "(and (eq Name 'foo') (gt Age 10))");
        assert!(e.is_bool());
    }

    #[test]
    fn serializes_with_kind_tag() {
        let e = Expr::binary(
            BinaryOp::Gt,
            Expr::property("Age"),
            Expr::literal(Literal::Int32(10)),
        );
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["kind"], "binary");
        assert_eq!(v["op"], "gt");
        assert_eq!(v["lhs"]["name"], "Age");
        assert_eq!(v["rhs"]["value"]["type"], "Edm.Int32");
        assert_eq!(v["rhs"]["value"]["text"], "10");
    }
}
