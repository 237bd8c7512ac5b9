use tracing::debug;

use super::lexer::{dump_tokens, render, tokenize, unquote, Spanned, Token};
use super::literal;
use super::{
    AggregateFunction, BinaryOp, Expr, ExprError, Literal, Method, OrderBy, SortDirection,
    UnaryOp,
};

// ──────────────────────────────────────────────
// Entry points
// ──────────────────────────────────────────────

/// Parse any single expression.
pub fn parse_value(text: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(text)?;
    dump_tokens(&tokens);
    let expr = read_expression(&tokens)?;
    debug!(input = text, expr = %expr, "parsed expression");
    Ok(expr)
}

/// Parse a `$filter` value. The result is always boolean-valued.
pub fn parse_filter(text: &str) -> Result<Expr, ExprError> {
    let expr = parse_value(text)?;
    if !expr.is_bool() {
        return Err(ExprError::TypeMismatch {
            expected: "boolean expression",
            context: "$filter".into(),
            found: expr.to_string(),
        });
    }
    Ok(expr)
}

/// Parse a `$orderby` list; items without a direction sort ascending.
pub fn parse_orderby(text: &str) -> Result<Vec<OrderBy>, ExprError> {
    let tokens = tokenize(text)?;
    dump_tokens(&tokens);
    split_top_level(&tokens)?
        .into_iter()
        .map(|item| {
            let item = trim_whitespace(item);
            let direction = match item.last().map(|t| &t.token) {
                Some(Token::Word(w)) if w == "asc" => Some(SortDirection::Asc),
                Some(Token::Word(w)) if w == "desc" => Some(SortDirection::Desc),
                _ => None,
            };
            match direction {
                Some(direction) => Ok(OrderBy {
                    expr: read_expression(&item[..item.len() - 1])?,
                    direction,
                }),
                None => Ok(OrderBy {
                    expr: read_expression(item)?,
                    direction: SortDirection::Asc,
                }),
            }
        })
        .collect()
}

/// Parse a `$select` list. `*` selects everything and yields `None`.
pub fn parse_select(text: &str) -> Result<Option<Vec<String>>, ExprError> {
    if text.trim() == "*" {
        return Ok(None);
    }
    property_list(text, "$select").map(Some)
}

/// Parse a `$expand` list of navigation property names. Every name must
/// start with `_`.
pub fn parse_expand(text: &str) -> Result<Vec<String>, ExprError> {
    let tokens = tokenize(text)?;
    for t in &tokens {
        match &t.token {
            Token::Whitespace | Token::Symbol(',') => {}
            Token::Word(w) if w.starts_with('_') => {}
            other => {
                return Err(ExprError::InvalidNavigation {
                    name: other.to_string(),
                })
            }
        }
    }
    property_list(text, "$expand")
}

fn property_list(text: &str, context: &str) -> Result<Vec<String>, ExprError> {
    let tokens = tokenize(text)?;
    dump_tokens(&tokens);
    split_top_level(&tokens)?
        .into_iter()
        .map(|item| match read_expression(item)? {
            Expr::Property { name } => Ok(name),
            other => Err(ExprError::TypeMismatch {
                expected: "property name",
                context: context.to_owned(),
                found: other.to_string(),
            }),
        })
        .collect()
}

// ──────────────────────────────────────────────
// Token-run helpers
// ──────────────────────────────────────────────

fn trim_whitespace(tokens: &[Spanned]) -> &[Spanned] {
    let start = tokens
        .iter()
        .position(|t| t.token != Token::Whitespace)
        .unwrap_or(tokens.len());
    let end = tokens
        .iter()
        .rposition(|t| t.token != Token::Whitespace)
        .map_or(start, |i| i + 1);
    &tokens[start..end]
}

/// Split at commas outside any parentheses. Empty items are rejected.
fn split_top_level(tokens: &[Spanned]) -> Result<Vec<&[Spanned]>, ExprError> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, t) in tokens.iter().enumerate() {
        match t.token {
            Token::OpenParen => depth += 1,
            Token::CloseParen => {
                depth = depth
                    .checked_sub(1)
                    .ok_or(ExprError::UnmatchedParen { offset: t.offset })?;
            }
            Token::Symbol(',') if depth == 0 => {
                items.push(non_empty(&tokens[start..i])?);
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(non_empty(&tokens[start..])?);
    Ok(items)
}

fn non_empty(tokens: &[Spanned]) -> Result<&[Spanned], ExprError> {
    if trim_whitespace(tokens).is_empty() {
        Err(ExprError::Empty)
    } else {
        Ok(tokens)
    }
}

fn find_close(tokens: &[Spanned], open: usize) -> Result<usize, ExprError> {
    let mut depth = 0usize;
    for (j, t) in tokens.iter().enumerate().skip(open + 1) {
        match t.token {
            Token::OpenParen => depth += 1,
            Token::CloseParen if depth == 0 => return Ok(j),
            Token::CloseParen => depth -= 1,
            _ => {}
        }
    }
    Err(ExprError::UnmatchedParen {
        offset: tokens[open].offset,
    })
}

fn found(token: Option<&Spanned>) -> String {
    token.map_or_else(|| "eof".to_owned(), |t| t.token.to_string())
}

// ──────────────────────────────────────────────
// Grouping pass
// ──────────────────────────────────────────────

/// Fold every parenthesised span into a single `Expression` token.
fn process_parentheses(tokens: &[Spanned]) -> Result<Vec<Spanned>, ExprError> {
    let mut out: Vec<Spanned> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let open = &tokens[i];
        match open.token {
            Token::OpenParen => {}
            Token::CloseParen => return Err(ExprError::UnmatchedParen { offset: open.offset }),
            _ => {
                out.push(open.clone());
                i += 1;
                continue;
            }
        }
        let close = find_close(tokens, i)?;

        // the word before the paren, if any, decides what the span means
        let mut k = out.len();
        while k > 0 && out[k - 1].token == Token::Whitespace {
            k -= 1;
        }
        let callee = match k.checked_sub(1).map(|idx| &out[idx].token) {
            Some(Token::Word(w)) => Some(w.clone()),
            _ => None,
        };

        let method = callee.as_deref().and_then(Method::from_name);
        let aggregate = callee.as_deref().and_then(|w| {
            if let Some(source) = w.strip_suffix("/any") {
                Some((AggregateFunction::Any, source.to_owned()))
            } else {
                w.strip_suffix("/all")
                    .map(|source| (AggregateFunction::All, source.to_owned()))
            }
        });

        if let Some(method) = method {
            let args = method_arguments(&tokens[i + 1..close])?;
            let expr = method_call(method, args)?;
            let offset = out[k - 1].offset;
            out.truncate(k - 1);
            out.push(Spanned {
                token: Token::Expression(Box::new(expr)),
                offset,
            });
        } else if let Some((function, source)) = aggregate {
            let expr = aggregate_call(function, source, tokens, i, close)?;
            let offset = out[k - 1].offset;
            out.truncate(k - 1);
            out.push(Spanned {
                token: Token::Expression(Box::new(expr)),
                offset,
            });
        } else {
            let inner = read_expression(&tokens[i + 1..close])?;
            let expr = if inner.is_bool() {
                Expr::BoolParen {
                    inner: Box::new(inner),
                }
            } else {
                Expr::Paren {
                    inner: Box::new(inner),
                }
            };
            out.push(Spanned {
                token: Token::Expression(Box::new(expr)),
                offset: open.offset,
            });
        }
        i = close + 1;
    }
    Ok(out)
}

fn method_arguments(inner: &[Spanned]) -> Result<Vec<Expr>, ExprError> {
    if trim_whitespace(inner).is_empty() {
        return Ok(Vec::new());
    }
    split_top_level(inner)?
        .into_iter()
        .map(read_expression)
        .collect()
}

fn method_call(method: Method, args: Vec<Expr>) -> Result<Expr, ExprError> {
    if !method.arities().contains(&args.len()) {
        return Err(ExprError::NotImplemented {
            method: method.name().to_owned(),
            arity: args.len(),
        });
    }
    // the type operand of cast/isof is always the last argument
    if matches!(method, Method::Cast | Method::IsOf) {
        let type_arg = args.last();
        if !matches!(
            type_arg,
            Some(Expr::Literal {
                value: Literal::String(_)
            })
        ) {
            return Err(ExprError::TypeMismatch {
                expected: "string literal",
                context: method.name().to_owned(),
                found: type_arg.map_or_else(String::new, |e| e.kind_name().to_owned()),
            });
        }
    }
    Ok(Expr::Method { method, args })
}

/// `source/any(var: predicate)`, `source/all(var: predicate)`, `source/any()`.
/// The token directly after the paren must be the variable (or `)` for a
/// nullary `any`), followed directly by `:`.
fn aggregate_call(
    function: AggregateFunction,
    source: String,
    tokens: &[Spanned],
    open: usize,
    close: usize,
) -> Result<Expr, ExprError> {
    let source = Box::new(Expr::property(source));
    let next = tokens.get(open + 1);
    let variable = match next.map(|t| &t.token) {
        Some(Token::CloseParen) if function == AggregateFunction::Any => {
            return Ok(Expr::Aggregate {
                function,
                source,
                variable: None,
                predicate: None,
            })
        }
        Some(Token::Word(w)) => w.clone(),
        _ => return Err(ExprError::UnexpectedToken { found: found(next) }),
    };
    let colon = tokens.get(open + 2).filter(|_| open + 2 < close);
    if !colon.is_some_and(|t| t.token.is_symbol(':')) {
        return Err(ExprError::ExpectedColon {
            found: found(colon),
        });
    }
    let predicate = read_expression(&tokens[open + 3..close])?;
    if !predicate.is_bool() {
        return Err(ExprError::IllegalPredicate { function });
    }
    Ok(Expr::Aggregate {
        function,
        source,
        variable: Some(variable),
        predicate: Some(Box::new(predicate)),
    })
}

// ──────────────────────────────────────────────
// Precedence climbing
// ──────────────────────────────────────────────

fn read_expression(tokens: &[Spanned]) -> Result<Expr, ExprError> {
    let tokens = trim_whitespace(tokens);
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }
    let tokens = process_parentheses(tokens)?;

    if let Some(value) = literal::recognize(&tokens)? {
        return Ok(Expr::literal(value));
    }

    if let [single] = tokens.as_slice() {
        return match &single.token {
            Token::Quoted(q) => Ok(Expr::literal(Literal::String(unquote(q)))),
            Token::Word(w) => Ok(match w.as_str() {
                "null" => Expr::literal(Literal::Null),
                "true" => Expr::literal(Literal::Boolean(true)),
                "false" => Expr::literal(Literal::Boolean(false)),
                _ => Expr::property(w.clone()),
            }),
            Token::Expression(e) => Ok((**e).clone()),
            other => Err(ExprError::UnexpectedToken {
                found: other.to_string(),
            }),
        };
    }

    for op in BinaryOp::PRECEDENCE {
        if let Some(expr) = binary(&tokens, op)? {
            return Ok(expr);
        }
    }

    match tokens.as_slice() {
        [first, second, rest @ ..] if first.token.is_word("not") && second.token == Token::Whitespace => {
            Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(read_expression(rest)?),
            })
        }
        [first, rest @ ..] if first.token.is_symbol('-') => Ok(Expr::Unary {
            op: UnaryOp::Negate,
            operand: Box::new(read_expression(rest)?),
        }),
        _ => Err(ExprError::Unreadable {
            text: render(&tokens),
        }),
    }
}

/// Split at the first `<ws> op <ws>` and parse both halves.
fn binary(tokens: &[Spanned], op: BinaryOp) -> Result<Option<Expr>, ExprError> {
    let keyword = op.keyword();
    let split = tokens.windows(3).position(|w| {
        w[0].token == Token::Whitespace
            && w[1].token.is_word(keyword)
            && w[2].token == Token::Whitespace
    });
    let Some(i) = split else {
        return Ok(None);
    };
    let lhs = read_expression(&tokens[..i])?;
    let rhs = read_expression(&tokens[i + 3..])?;
    if matches!(op, BinaryOp::And | BinaryOp::Or) {
        for side in [&lhs, &rhs] {
            if !side.is_bool() {
                return Err(ExprError::TypeMismatch {
                    expected: "boolean operand",
                    context: keyword.to_owned(),
                    found: side.to_string(),
                });
            }
        }
    }
    Ok(Some(Expr::binary(op, lhs, rhs)))
}
