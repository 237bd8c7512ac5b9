use odatawire_core::{InlineCount, Limits, QueryInfo};

use crate::{fail, print_json, OutputFormat};

pub(crate) fn cmd_query(query: &str, limits: &Limits, output: OutputFormat, quiet: bool) {
    let info = match QueryInfo::parse(query, limits) {
        Ok(info) => info,
        Err(e) => fail(e, output, quiet),
    };
    match output {
        OutputFormat::Json => print_json(&info, output, quiet),
        OutputFormat::Text => {
            for (label, value) in summary(&info) {
                println!("{:<12}{}", label, value);
            }
        }
    }
}

/// One line per option that is set; `top` is always shown.
fn summary(info: &QueryInfo) -> Vec<(&'static str, String)> {
    let mut lines = vec![("top", info.top.to_string())];
    if let Some(skip) = info.skip {
        lines.push(("skip", skip.to_string()));
    }
    if let Some(filter) = &info.filter {
        lines.push(("filter", filter.to_string()));
    }
    if !info.orderby.is_empty() {
        let items: Vec<String> = info.orderby.iter().map(ToString::to_string).collect();
        lines.push(("orderby", items.join(", ")));
    }
    if let Some(select) = &info.select {
        lines.push(("select", select.join(", ")));
    }
    if !info.expand.is_empty() {
        lines.push(("expand", info.expand.join(", ")));
    }
    if let Some(token) = &info.skip_token {
        lines.push(("skiptoken", token.clone()));
    }
    if info.inline_count == InlineCount::AllPages {
        lines.push(("inlinecount", "allpages".to_owned()));
    }
    if let Some(q) = &info.search {
        lines.push(("q", q.clone()));
    }
    if let Some(format) = &info.format {
        lines.push(("format", format.clone()));
    }
    for (name, value) in &info.custom_options {
        lines.push(("custom", format!("{}={}", name, value)));
    }
    lines
}
