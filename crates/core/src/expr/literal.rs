//! Literal recognition over a flat token run.

use std::str::FromStr;

use rust_decimal::Decimal;
use time::PrimitiveDateTime;
use uuid::Uuid;

use super::lexer::{unquote, Spanned, Token};
use super::{ExprError, Literal};
use crate::timefmt;

/// Recognise `tokens` as one literal. `Ok(None)` means "not a literal".
pub(crate) fn recognize(tokens: &[Spanned]) -> Result<Option<Literal>, ExprError> {
    match tokens {
        [Spanned {
            token: Token::Word(prefix),
            ..
        }, Spanned {
            token: Token::Quoted(quoted),
            ..
        }] => prefixed(prefix, &unquote(quoted)),
        [Spanned {
            token: Token::Number(int),
            ..
        }, rest @ ..] => numeric(int, rest),
        _ => Ok(None),
    }
}

fn prefixed(prefix: &str, value: &str) -> Result<Option<Literal>, ExprError> {
    let invalid = |kind: &'static str| ExprError::InvalidLiteral {
        kind,
        text: value.to_owned(),
    };
    let literal = match prefix {
        "datetime" => Literal::DateTime(
            timefmt::parse_local_datetime(value)
                .map(PrimitiveDateTime::assume_utc)
                .ok_or_else(|| invalid("datetime"))?,
        ),
        "datetimeoffset" => Literal::DateTimeOffset(
            timefmt::parse_datetime_offset(value).ok_or_else(|| invalid("datetimeoffset"))?,
        ),
        "time" => Literal::Time(timefmt::parse_time(value).ok_or_else(|| invalid("time"))?),
        "guid" => Literal::Guid(Uuid::parse_str(value).map_err(|_| invalid("guid"))?),
        "decimal" => Literal::Decimal(Decimal::from_str(value).map_err(|_| invalid("decimal"))?),
        "X" | "binary" => Literal::Binary(hex::decode(value).map_err(|_| invalid("binary"))?),
        _ => return Ok(None),
    };
    Ok(Some(literal))
}

/// `E-10`, `e-10`; the lexer folds a negative exponent into one word.
/// The exponent must be signed, so `1E10` is not a literal.
fn exponent_word(word: &str) -> Option<&str> {
    let exp = word.strip_prefix(['E', 'e'])?;
    let digits = exp.strip_prefix('-')?;
    (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())).then_some(exp)
}

fn numeric(int: &str, rest: &[Spanned]) -> Result<Option<Literal>, ExprError> {
    let (mantissa, fractional, rest) = match rest {
        [Spanned {
            token: Token::Symbol('.'),
            ..
        }, Spanned {
            token: Token::Number(frac),
            ..
        }, rest @ ..]
            if !frac.starts_with('-') =>
        {
            (format!("{}.{}", int, frac), true, rest)
        }
        _ => (int.to_owned(), false, rest),
    };
    let invalid = |kind: &'static str| ExprError::InvalidLiteral {
        kind,
        text: mantissa.clone(),
    };
    let tokens: Vec<&Token> = rest.iter().map(|s| &s.token).collect();
    let literal = match tokens.as_slice() {
        [] if fractional => {
            Literal::Double(mantissa.parse().map_err(|_| invalid("double"))?)
        }
        [] => integer(&mantissa)?,
        [Token::Word(w)] if w == "L" && !fractional => {
            Literal::Int64(mantissa.parse().map_err(|_| invalid("int64"))?)
        }
        [Token::Word(w)] if w == "f" => {
            Literal::Single(mantissa.parse().map_err(|_| invalid("single"))?)
        }
        [Token::Word(w)] if w.eq_ignore_ascii_case("m") => {
            Literal::Decimal(Decimal::from_str(&mantissa).map_err(|_| invalid("decimal"))?)
        }
        [Token::Word(w)] => match exponent_word(w) {
            Some(exp) => double(&format!("{}e{}", mantissa, exp))?,
            None => return Ok(None),
        },
        [Token::Word(w), Token::Symbol('+'), Token::Number(exp)]
            if (w == "E" || w == "e") && !exp.starts_with('-') =>
        {
            double(&format!("{}e+{}", mantissa, exp))?
        }
        _ => return Ok(None),
    };
    Ok(Some(literal))
}

fn double(text: &str) -> Result<Literal, ExprError> {
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Literal::Double(v)),
        _ => Err(ExprError::InvalidLiteral {
            kind: "double",
            text: text.to_owned(),
        }),
    }
}

/// Int32 when it fits, else Int64.
fn integer(text: &str) -> Result<Literal, ExprError> {
    if let Ok(v) = text.parse::<i32>() {
        return Ok(Literal::Int32(v));
    }
    text.parse::<i64>()
        .map(Literal::Int64)
        .map_err(|_| ExprError::InvalidLiteral {
            kind: "integer",
            text: text.to_owned(),
        })
}
