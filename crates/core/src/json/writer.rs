//! Streaming JSON output with separators inserted automatically.

use std::io::{self, Write};

pub struct JsonWriter<W: Write> {
    out: W,
    /// One flag per open container: true until its first member is written.
    first: Vec<bool>,
    after_name: bool,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(out: W) -> Self {
        JsonWriter {
            out,
            first: Vec::new(),
            after_name: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn before_value(&mut self) -> io::Result<()> {
        if self.after_name {
            self.after_name = false;
            return Ok(());
        }
        if let Some(first) = self.first.last_mut() {
            if !*first {
                self.out.write_all(b",")?;
            }
            *first = false;
        }
        Ok(())
    }

    pub fn start_object(&mut self) -> io::Result<()> {
        self.before_value()?;
        self.first.push(true);
        self.out.write_all(b"{")
    }

    pub fn end_object(&mut self) -> io::Result<()> {
        self.first.pop();
        self.out.write_all(b"}")
    }

    pub fn start_array(&mut self) -> io::Result<()> {
        self.before_value()?;
        self.first.push(true);
        self.out.write_all(b"[")
    }

    pub fn end_array(&mut self) -> io::Result<()> {
        self.first.pop();
        self.out.write_all(b"]")
    }

    pub fn write_name(&mut self, name: &str) -> io::Result<()> {
        self.before_value()?;
        self.write_quoted(name)?;
        self.out.write_all(b":")?;
        self.after_name = true;
        Ok(())
    }

    pub fn write_string(&mut self, value: &str) -> io::Result<()> {
        self.before_value()?;
        self.write_quoted(value)
    }

    pub fn write_boolean(&mut self, value: bool) -> io::Result<()> {
        self.before_value()?;
        self.out
            .write_all(if value { b"true" as &[u8] } else { b"false" })
    }

    pub fn write_null(&mut self) -> io::Result<()> {
        self.before_value()?;
        self.out.write_all(b"null")
    }

    pub fn write_integer(&mut self, value: i64) -> io::Result<()> {
        self.before_value()?;
        write!(self.out, "{}", value)
    }

    /// Non-finite values have no JSON number form and go out as the
    /// OData textual forms `"NaN"`, `"INF"` and `"-INF"`.
    pub fn write_double(&mut self, value: f64) -> io::Result<()> {
        if value.is_nan() {
            return self.write_string("NaN");
        }
        if value.is_infinite() {
            return self.write_string(if value > 0.0 { "INF" } else { "-INF" });
        }
        self.before_value()?;
        self.out.write_all(format_double(value).as_bytes())
    }

    pub fn write_single(&mut self, value: f32) -> io::Result<()> {
        if !value.is_finite() {
            return self.write_double(f64::from(value));
        }
        self.before_value()?;
        self.out.write_all(format_single(value).as_bytes())
    }

    fn write_quoted(&mut self, s: &str) -> io::Result<()> {
        let mut buf = String::with_capacity(s.len() + 2);
        buf.push('"');
        for c in s.chars() {
            match c {
                '"' => buf.push_str("\\\""),
                '\\' => buf.push_str("\\\\"),
                '/' => buf.push_str("\\/"),
                '\n' => buf.push_str("\\n"),
                '\r' => buf.push_str("\\r"),
                '\t' => buf.push_str("\\t"),
                '\u{8}' => buf.push_str("\\b"),
                '\u{c}' => buf.push_str("\\f"),
                c if (c as u32) < 0x20 => buf.push_str(&format!("\\u{:04x}", c as u32)),
                c => buf.push(c),
            }
        }
        buf.push('"');
        self.out.write_all(buf.as_bytes())
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Fixed-point with at most 15 integer and 14 fractional digits; the
/// shortest exact representation when fixed-point would lose precision.
pub fn format_double(value: f64) -> String {
    let fixed = format!("{:.14}", value);
    let trimmed = trim_fraction(&fixed);
    let int_digits = trimmed
        .trim_start_matches('-')
        .split('.')
        .next()
        .map_or(0, str::len);
    if int_digits <= 15 && trimmed.parse::<f64>().ok() == Some(value) {
        return trimmed.to_owned();
    }
    let magnitude = value.abs();
    if (1e-7..1e21).contains(&magnitude) {
        value.to_string()
    } else {
        format!("{:e}", value)
    }
}

pub fn format_single(value: f32) -> String {
    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-7..1e21).contains(&magnitude) {
        value.to_string()
    } else {
        format!("{:e}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(f: impl FnOnce(&mut JsonWriter<Vec<u8>>) -> io::Result<()>) -> String {
        let mut w = JsonWriter::new(Vec::new());
        f(&mut w).unwrap();
        String::from_utf8(w.into_inner()).unwrap()
    }

    #[test]
    fn separators_are_automatic() {
        let out = written(|w| {
            w.start_object()?;
            w.write_name("a")?;
            w.write_integer(1)?;
            w.write_name("b")?;
            w.start_array()?;
            w.write_string("x")?;
            w.write_null()?;
            w.start_object()?;
            w.end_object()?;
            w.end_array()?;
            w.write_name("c")?;
            w.write_boolean(false)?;
            w.end_object()
        });
        assert_eq!(out, r#"{"a":1,"b":["x",null,{}],"c":false}"#);
    }

    #[test]
    fn string_escaping() {
        let out = written(|w| w.write_string("a\"b\\c/d\ne\rf\u{c}g\u{8}h\ti\u{1}"));
        assert_eq!(out, r#""a\"b\\c\/d\ne\rf\fg\bh\ti\u0001""#);
    }

    #[test]
    fn double_formatting() {
        assert_eq!(format_double(0.0), "0");
        assert_eq!(format_double(2.0), "2");
        assert_eq!(format_double(-1.5), "-1.5");
        assert_eq!(format_double(0.1), "0.1");
        assert_eq!(format_double(123456789012345.0), "123456789012345");
        assert_eq!(format_double(1.0e300), "1e300");
        assert_eq!(format_double(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_double(1.0e-20), "1e-20");
    }

    #[test]
    fn double_formatting_round_trips() {
        for v in [3.14159, -2.5e-5, 1234567.125, 9.999999999999999e14, 5e-324] {
            assert_eq!(format_double(v).parse::<f64>().unwrap(), v);
        }
    }

    #[test]
    fn non_finite_doubles() {
        assert_eq!(written(|w| w.write_double(f64::NAN)), r#""NaN""#);
        assert_eq!(written(|w| w.write_double(f64::NEG_INFINITY)), r#""-INF""#);
    }

    #[test]
    fn single_formatting() {
        assert_eq!(format_single(0.1), "0.1");
        assert_eq!(format_single(2.0), "2");
        assert_eq!(format_single(-12.25), "-12.25");
    }
}
