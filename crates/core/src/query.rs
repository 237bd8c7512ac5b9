//! System query options of a collection request.

use serde::Serialize;
use tracing::debug;

use crate::config::Limits;
use crate::expr::{self, Expr, ExprError, OrderBy};
use crate::uri;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("invalid value for {name}: '{value}'")]
    InvalidValue { name: String, value: String },

    #[error("unknown system query option: {name}")]
    UnknownOption { name: String },

    #[error("failed to parse {option}: {source}")]
    Expression {
        option: &'static str,
        #[source]
        source: ExprError,
    },

    #[error("$expand names {count} navigation properties, at most {max} allowed")]
    ExpandLimit { count: usize, max: usize },

    #[error("query parameter '{text}' is not valid percent-encoding")]
    Decode { text: String },
}

impl QueryError {
    fn invalid(name: &str, value: &str) -> Self {
        QueryError::InvalidValue {
            name: name.to_owned(),
            value: value.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InlineCount {
    AllPages,
    #[default]
    None,
}

/// The parsed options of one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryInfo {
    /// `$top`, or the configured default when absent.
    pub top: u32,
    pub skip: Option<u32>,
    pub filter: Option<Expr>,
    pub orderby: Vec<OrderBy>,
    /// `None` selects every property.
    pub select: Option<Vec<String>>,
    pub expand: Vec<String>,
    pub skip_token: Option<String>,
    pub inline_count: InlineCount,
    /// Full-text search keyword (`q`).
    pub search: Option<String>,
    pub format: Option<String>,
    /// Parameters without a `$` prefix, other than `q`.
    pub custom_options: Vec<(String, String)>,
}

impl QueryInfo {
    /// Parse a raw (still encoded) query string, with or without its `?`.
    pub fn parse(query: &str, limits: &Limits) -> Result<QueryInfo, QueryError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params: Vec<(String, String)> = Vec::new();
        for (name, value) in uri::split_query(query) {
            let decode = |text: &str| {
                uri::decode(text, true).ok_or_else(|| QueryError::Decode {
                    text: text.to_owned(),
                })
            };
            let (name, value) = (decode(name)?, decode(value)?);
            // the first occurrence of a parameter wins
            if !params.iter().any(|(n, _)| *n == name) {
                params.push((name, value));
            }
        }

        let mut info = QueryInfo {
            top: limits.top_default,
            skip: None,
            filter: None,
            orderby: Vec::new(),
            select: None,
            expand: Vec::new(),
            skip_token: None,
            inline_count: InlineCount::None,
            search: None,
            format: None,
            custom_options: Vec::new(),
        };
        let mut top = None;

        for (name, value) in params {
            match name.as_str() {
                "$top" => top = Some(bounded(&name, &value, limits.top_max)?),
                "$skip" => info.skip = Some(bounded(&name, &value, limits.skip_max)?),
                "$filter" => {
                    info.filter = Some(expr::parse_filter(&value).map_err(|source| {
                        QueryError::Expression {
                            option: "$filter",
                            source,
                        }
                    })?)
                }
                "$orderby" => {
                    if value.is_empty() {
                        return Err(QueryError::invalid(&name, &value));
                    }
                    info.orderby = expr::parse_orderby(&value).map_err(|source| {
                        QueryError::Expression {
                            option: "$orderby",
                            source,
                        }
                    })?;
                }
                "$select" => {
                    if value.is_empty() {
                        return Err(QueryError::invalid(&name, &value));
                    }
                    info.select = expr::parse_select(&value).map_err(|source| {
                        QueryError::Expression {
                            option: "$select",
                            source,
                        }
                    })?;
                }
                "$expand" => {
                    let expand = expr::parse_expand(&value).map_err(|source| {
                        QueryError::Expression {
                            option: "$expand",
                            source,
                        }
                    })?;
                    if expand.len() > limits.expand_max {
                        return Err(QueryError::ExpandLimit {
                            count: expand.len(),
                            max: limits.expand_max,
                        });
                    }
                    info.expand = expand;
                }
                "$skiptoken" => info.skip_token = Some(value),
                "$inlinecount" => {
                    info.inline_count = match value.as_str() {
                        "allpages" => InlineCount::AllPages,
                        "none" => InlineCount::None,
                        _ => return Err(QueryError::invalid(&name, &value)),
                    }
                }
                "$format" => info.format = Some(value),
                "q" => {
                    if value.is_empty() || value.len() > limits.search_max_bytes {
                        return Err(QueryError::invalid(&name, &value));
                    }
                    info.search = Some(value);
                }
                n if n.starts_with('$') => return Err(QueryError::UnknownOption { name }),
                _ => info.custom_options.push((name, value)),
            }
        }

        if let Some(top) = top {
            if !info.expand.is_empty() && top > limits.top_max_with_expand {
                return Err(QueryError::invalid("$top", &top.to_string()));
            }
            info.top = top;
        }
        debug!(?info, "query options");
        Ok(info)
    }
}

fn bounded(name: &str, value: &str, max: u32) -> Result<u32, QueryError> {
    match value.parse::<u32>() {
        Ok(n) if n <= max => Ok(n),
        _ => Err(QueryError::invalid(name, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(q: &str) -> Result<QueryInfo, QueryError> {
        QueryInfo::parse(q, &Limits::default())
    }

    #[test]
    fn defaults() {
        let info = parse("").unwrap();
        assert_eq!(info.top, 25);
        assert_eq!(info.skip, None);
        assert_eq!(info.inline_count, InlineCount::None);
        assert!(info.filter.is_none());
    }

    #[test]
    fn full_option_set() {
        let info = parse(
            "?$top=10&$skip=5&$filter=Age+gt+10&$orderby=Name%20desc&$select=Name,Age\
             &$expand=_Order&$inlinecount=allpages&$skiptoken=abc&q=tokyo&$format=json&x-tag=1",
        )
        .unwrap();
        assert_eq!(info.top, 10);
        assert_eq!(info.skip, Some(5));
        assert_eq!(info.filter.unwrap().to_string(), "(gt Age 10)");
        assert_eq!(info.orderby[0].to_string(), "Name desc");
        assert_eq!(info.select, Some(vec!["Name".into(), "Age".into()]));
        assert_eq!(info.expand, vec!["_Order".to_owned()]);
        assert_eq!(info.inline_count, InlineCount::AllPages);
        assert_eq!(info.skip_token.as_deref(), Some("abc"));
        assert_eq!(info.search.as_deref(), Some("tokyo"));
        assert_eq!(info.format.as_deref(), Some("json"));
        assert_eq!(info.custom_options, vec![("x-tag".into(), "1".into())]);
    }

    #[test]
    fn bounds() {
        assert!(parse("$top=10000").is_ok());
        assert!(matches!(
            parse("$top=10001"),
            Err(QueryError::InvalidValue { .. })
        ));
        assert!(parse("$top=-1").is_err());
        assert!(parse("$skip=100001").is_err());
        assert!(parse("$top=100&$expand=_Order").is_ok());
        assert!(parse("$top=101&$expand=_Order").is_err());
        assert!(matches!(
            parse("$expand=_A,_B,_C"),
            Err(QueryError::ExpandLimit { count: 3, max: 2 })
        ));
    }

    #[test]
    fn rejected_values() {
        assert!(parse("$orderby=").is_err());
        assert!(parse("$select=").is_err());
        assert!(parse("$inlinecount=some").is_err());
        assert!(parse("q=").is_err());
        assert!(parse(&format!("q={}", "a".repeat(256))).is_err());
        assert!(matches!(
            parse("$count=true"),
            Err(QueryError::UnknownOption { .. })
        ));
        assert!(matches!(
            parse("$filter=Age"),
            Err(QueryError::Expression {
                option: "$filter",
                ..
            })
        ));
    }

    #[test]
    fn first_occurrence_wins() {
        let info = parse("$top=1&$top=2").unwrap();
        assert_eq!(info.top, 1);
    }
}
