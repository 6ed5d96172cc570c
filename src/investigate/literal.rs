//! Permissive parser for the `records` section.
//!
//! Models echo evidence back as JSON, Python dict literals, or something in
//! between. Accepted: single or double quoted strings, `None`/`null`,
//! `True`/`False`, tuples (read as arrays), trailing commas and bare-word keys
//! or values. Text before the first `{` and after the matching `}` is ignored.

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Deepest nesting of mappings and sequences accepted in one reply.
const MAX_DEPTH: usize = 128;

#[derive(Debug, Error, PartialEq)]
#[error("{message} at offset {offset}")]
pub struct LiteralError {
    pub offset: usize,
    pub message: String,
}

/// Replace bare `nan` tokens with `null`. Quoted text is left untouched.
pub fn normalize_nulls(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        if c == '"' || c == '\'' {
            quote = Some(c);
            out.push(c);
            i += 1;
        } else if is_ident_start(c) {
            let start = i;
            while i < chars.len() && is_ident_char(chars[i]) {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            if word.eq_ignore_ascii_case("nan") {
                out.push_str("null");
            } else {
                out.push_str(&word);
            }
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

/// Parse the echoed evidence into ledger name → field mapping.
pub fn parse_records(text: &str) -> Result<Map<String, Value>, LiteralError> {
    // Prose before the mapping may hold apostrophes; normalize from the brace on.
    let Some(start) = text.find('{') else {
        return Err(LiteralError {
            offset: 0,
            message: "no '{' found in records section".to_string(),
        });
    };

    let chars: Vec<char> = normalize_nulls(&text[start..]).chars().collect();
    let mut parser = Parser {
        chars,
        pos: 0,
        depth: 0,
    };
    match parser.value()? {
        Value::Object(map) => Ok(map),
        _ => Err(parser.error("records section is not a mapping")),
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, want: char) -> Result<(), LiteralError> {
        self.skip_ws();
        match self.peek() {
            Some(c) if c == want => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{}', found '{}'", want, c))),
            None => Err(self.error(format!("expected '{}', found end of text", want))),
        }
    }

    fn value(&mut self) -> Result<Value, LiteralError> {
        self.skip_ws();
        match self.peek() {
            Some(open @ ('{' | '[' | '(')) => {
                if self.depth == MAX_DEPTH {
                    return Err(self.error("nesting too deep"));
                }
                self.depth += 1;
                let nested = match open {
                    '{' => self.object(),
                    '[' => self.sequence('[', ']'),
                    _ => self.sequence('(', ')'),
                };
                self.depth -= 1;
                nested
            }
            Some(q @ ('"' | '\'')) => self.string(q).map(Value::String),
            Some(c) if c == '-' || c == '+' || c.is_ascii_digit() => self.number(),
            Some(c) if is_ident_start(c) => Ok(keyword(self.word())),
            Some(c) => Err(self.error(format!("unexpected '{}'", c))),
            None => Err(self.error("unexpected end of text")),
        }
    }

    fn object(&mut self) -> Result<Value, LiteralError> {
        self.expect('{')?;
        let mut map = Map::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(Value::Object(map));
            }
            let key = self.key()?;
            self.expect(':')?;
            let value = self.value()?;
            map.insert(key, value);

            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some('}') => {}
                Some(c) => return Err(self.error(format!("expected ',' or '}}', found '{}'", c))),
                None => return Err(self.error("unterminated mapping")),
            }
        }
    }

    fn sequence(&mut self, open: char, close: char) -> Result<Value, LiteralError> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(Value::Array(items));
            }
            items.push(self.value()?);

            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(c) if c == close => {}
                Some(c) => {
                    return Err(self.error(format!("expected ',' or '{}', found '{}'", close, c)))
                }
                None => return Err(self.error("unterminated sequence")),
            }
        }
    }

    fn key(&mut self) -> Result<String, LiteralError> {
        self.skip_ws();
        match self.peek() {
            Some(q @ ('"' | '\'')) => self.string(q),
            Some(c) if is_ident_start(c) || c.is_ascii_digit() || c == '-' => Ok(self.word()),
            Some(c) => Err(self.error(format!("unexpected '{}' where a key was expected", c))),
            None => Err(self.error("unterminated mapping")),
        }
    }

    fn word(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn string(&mut self, quote: char) -> Result<String, LiteralError> {
        self.pos += 1;
        let mut out = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                c if c == quote => return Ok(out),
                '\\' => {
                    let Some(esc) = self.peek() else { break };
                    self.pos += 1;
                    match esc {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        'u' => out.push(self.unicode_escape()?),
                        other => out.push(other),
                    }
                }
                c => out.push(c),
            }
        }
        Err(self.error("unterminated string"))
    }

    fn unicode_escape(&mut self) -> Result<char, LiteralError> {
        let end = self.pos + 4;
        if end > self.chars.len() {
            return Err(self.error("truncated \\u escape"));
        }
        let hex: String = self.chars[self.pos..end].iter().collect();
        let code = u32::from_str_radix(&hex, 16)
            .map_err(|_| self.error(format!("invalid \\u escape '{}'", hex)))?;
        self.pos = end;
        Ok(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
    }

    fn number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => {}
                '.' | 'e' | 'E' => is_float = true,
                '-' | '+' if matches!(self.chars[self.pos - 1], 'e' | 'E') => {}
                _ => break,
            }
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos].iter().collect();

        if !is_float {
            if let Ok(i) = raw.parse::<i64>() {
                return Ok(Value::Number(i.into()));
            }
        }
        raw.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| LiteralError {
                offset: start,
                message: format!("invalid number '{}'", raw),
            })
    }
}

fn keyword(word: String) -> Value {
    match word.as_str() {
        "null" | "None" | "none" => Value::Null,
        "true" | "True" => Value::Bool(true),
        "false" | "False" => Value::Bool(false),
        _ => Value::String(word),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_json() {
        let map = parse_records(
            r#"{"core_banking": {"txn_id": "TXN1", "amount": 100.5}, "switch": {"status": "ok"}}"#,
        )
        .unwrap();
        assert_eq!(map["core_banking"]["amount"], json!(100.5));
        assert_eq!(map["switch"]["status"], json!("ok"));
        let keys: Vec<&String> = map.keys().collect();
        assert_eq!(keys, vec!["core_banking", "switch"]);
    }

    #[test]
    fn test_parses_python_literal() {
        let text = "{'CBS': {'txn_id': 'TXN1', 'reversed': False, 'fee': nan, 'ref': None,},\n \
                    'M-Pesa': 'N/A', 'tags': ('a', 'b')}";
        let map = parse_records(text).unwrap();
        assert_eq!(map["CBS"]["reversed"], json!(false));
        assert_eq!(map["CBS"]["fee"], Value::Null);
        assert_eq!(map["CBS"]["ref"], Value::Null);
        assert_eq!(map["M-Pesa"], json!("N/A"));
        assert_eq!(map["tags"], json!(["a", "b"]));
    }

    #[test]
    fn test_ignores_surrounding_prose() {
        let map = parse_records("here's the data {core_banking: {amount: -3, fee: nan}} that's all")
            .unwrap();
        assert_eq!(map["core_banking"]["amount"], json!(-3));
        assert_eq!(map["core_banking"]["fee"], Value::Null);
    }

    #[test]
    fn test_escaped_quotes() {
        let map = parse_records(r#"{'note': 'customer\'s wallet', "x": "A"}"#).unwrap();
        assert_eq!(map["note"], json!("customer's wallet"));
        assert_eq!(map["x"], json!("A"));
    }

    #[test]
    fn test_nan_normalization_is_idempotent() {
        let text = "{'fee': nan, 'rate': NaN, 'name': 'nancy nan', 'finance': 1}";
        let once = normalize_nulls(text);
        assert_eq!(
            once,
            "{'fee': null, 'rate': null, 'name': 'nancy nan', 'finance': 1}"
        );
        assert_eq!(normalize_nulls(&once), once);
    }

    #[test]
    fn test_malformed_structures_are_errors() {
        assert!(parse_records("-").is_err());
        assert!(parse_records("{'a': 1").is_err());
        assert!(parse_records("{'a' 1}").is_err());
        assert!(parse_records("{'a': 'open}").is_err());
        assert!(parse_records("{'a': 1..2}").is_err());
    }

    #[test]
    fn test_deep_nesting_is_rejected_not_overflowed() {
        let deep = format!("{{'a': {}", "[".repeat(5000));
        let err = parse_records(&deep).unwrap_err();
        assert_eq!(err.message, "nesting too deep");

        let deep_maps = format!("{}1", "{'k': ".repeat(5000));
        assert_eq!(parse_records(&deep_maps).unwrap_err().message, "nesting too deep");
    }

    #[test]
    fn test_moderate_nesting_still_parses() {
        let text = format!("{{'a': {}1{}}}", "[".repeat(100), "]".repeat(100));
        let map = parse_records(&text).unwrap();
        let mut value = &map["a"];
        for _ in 0..100 {
            value = &value[0];
        }
        assert_eq!(value, &json!(1));
    }

    #[test]
    fn test_error_reports_offset() {
        let err = parse_records("{'a': @}").unwrap_err();
        assert_eq!(err.offset, 6);
    }
}
