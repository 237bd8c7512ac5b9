use crate::{fail, print_json, OutputFormat};

pub(crate) fn cmd_filter(text: &str, output: OutputFormat, quiet: bool) {
    let expr = match odatawire_core::parse_filter(text) {
        Ok(e) => e,
        Err(e) => fail(e, output, quiet),
    };
    match output {
        OutputFormat::Text => println!("{}", expr),
        OutputFormat::Json => print_json(&expr, output, quiet),
    }
}

pub(crate) fn cmd_orderby(text: &str, output: OutputFormat, quiet: bool) {
    let items = match odatawire_core::parse_orderby(text) {
        Ok(items) => items,
        Err(e) => fail(e, output, quiet),
    };
    match output {
        OutputFormat::Text => {
            for item in &items {
                println!("{}", item);
            }
        }
        OutputFormat::Json => print_json(&items, output, quiet),
    }
}
