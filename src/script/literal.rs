//! Literal grammar
//!
//! A byte cursor over one script line. Values are read by a fixed grammar
//! and never evaluated:
//!
//! ```text
//! value   := 'null' | 'true' | 'false' | number | string
//! number  := '-'? digit+ ('.' digit+)? (('e'|'E') ('+'|'-')? digit+)?
//! string  := '"' char* '"' | '\'' char* '\''
//! ident   := (letter | '_') (letter | digit | '_')*
//! ```

use crate::record::Value;

/// Parse failure with the byte offset it happened at
pub type ParseResult<T> = std::result::Result<T, String>;

/// Cursor over a single line
pub struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    pub fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\r' | b'\n') = self.peek_byte() {
            self.pos += 1;
        }
    }

    /// True once only whitespace remains
    pub fn at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.pos >= self.input.len()
    }

    /// Next non-whitespace byte, without consuming it
    pub fn peek(&mut self) -> Option<u8> {
        self.skip_whitespace();
        self.peek_byte()
    }

    /// Consume `c` if it is next
    pub fn eat(&mut self, c: u8) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, c: u8) -> ParseResult<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", c as char)))
        }
    }

    /// Consume the two-byte token `->`
    pub fn expect_arrow(&mut self) -> ParseResult<()> {
        self.skip_whitespace();
        if self.input[self.pos..].starts_with("->") {
            self.pos += 2;
            Ok(())
        } else {
            Err(self.error("expected '->'"))
        }
    }

    /// Consume `keyword` (case-insensitive) if the next identifier is it
    pub fn eat_keyword(&mut self, keyword: &str) -> bool {
        let start = self.pos;
        match self.ident() {
            Ok(word) if word.eq_ignore_ascii_case(keyword) => true,
            _ => {
                self.pos = start;
                false
            }
        }
    }

    pub fn expect_keyword(&mut self, keyword: &str) -> ParseResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", keyword)))
        }
    }

    /// Read an identifier
    pub fn ident(&mut self) -> ParseResult<&'a str> {
        self.skip_whitespace();
        let start = self.pos;
        match self.peek_byte() {
            Some(b) if b.is_ascii_alphabetic() || b == b'_' => self.pos += 1,
            _ => return Err(self.error("expected identifier")),
        }
        while let Some(b) = self.peek_byte() {
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(&self.input[start..self.pos])
    }

    /// Read a literal value
    pub fn value(&mut self) -> ParseResult<Value> {
        match self.peek() {
            Some(b'"') | Some(b'\'') => self.string().map(Value::Text),
            Some(b'-') | Some(b'0'..=b'9') => self.number(),
            Some(b) if b.is_ascii_alphabetic() => {
                let start = self.pos;
                let word = self.ident()?;
                match word.to_ascii_lowercase().as_str() {
                    "null" => Ok(Value::Null),
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    _ => {
                        self.pos = start;
                        Err(self.error(&format!("unquoted text '{}' is not a literal", word)))
                    }
                }
            }
            Some(_) => Err(self.error("expected literal")),
            None => Err(self.error("expected literal, found end of line")),
        }
    }

    /// Read a non-negative integer
    pub fn unsigned(&mut self) -> ParseResult<u64> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(b'0'..=b'9') = self.peek_byte() {
            self.pos += 1;
        }
        let input = self.input;
        match input[start..self.pos].parse() {
            Ok(n) => Ok(n),
            Err(_) => {
                self.pos = start;
                Err(self.error("expected unsigned integer"))
            }
        }
    }

    /// Parse `open item (',' item)* close` (possibly empty)
    pub fn list<T, F>(&mut self, open: u8, close: u8, mut item: F) -> ParseResult<Vec<T>>
    where
        F: FnMut(&mut Self) -> ParseResult<T>,
    {
        self.expect(open)?;
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(item(self)?);
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(b',')?;
        }
    }

    /// Format an error pointing at the current position
    pub fn error(&self, message: &str) -> String {
        format!("{} at column {}", message, self.pos + 1)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn peek_byte(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn number(&mut self) -> ParseResult<Value> {
        let start = self.pos;
        let mut is_float = false;

        if self.peek_byte() == Some(b'-') {
            self.pos += 1;
        }
        self.digits();
        if self.peek_byte() == Some(b'.') {
            is_float = true;
            self.pos += 1;
            self.digits();
        }
        if let Some(b'e' | b'E') = self.peek_byte() {
            is_float = true;
            self.pos += 1;
            if let Some(b'+' | b'-') = self.peek_byte() {
                self.pos += 1;
            }
            self.digits();
        }

        let input = self.input;
        let text = &input[start..self.pos];
        let parsed = if is_float {
            text.parse::<f64>().map(Value::Float).ok()
        } else {
            text.parse::<i64>().map(Value::Int).ok()
        };
        match parsed {
            Some(value) => Ok(value),
            None => {
                self.pos = start;
                Err(self.error(&format!("invalid number '{}'", text)))
            }
        }
    }

    fn digits(&mut self) {
        while let Some(b'0'..=b'9') = self.peek_byte() {
            self.pos += 1;
        }
    }

    fn string(&mut self) -> ParseResult<String> {
        let start = self.pos;
        let quote = self.input.as_bytes()[self.pos] as char;
        let mut out = String::new();
        let mut chars = self.input[self.pos + 1..].char_indices();

        while let Some((offset, c)) = chars.next() {
            match c {
                c if c == quote => {
                    self.pos += 1 + offset + c.len_utf8();
                    return Ok(out);
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, '0')) => out.push('\0'),
                    Some((_, '\\')) => out.push('\\'),
                    Some((_, '\'')) => out.push('\''),
                    Some((_, '"')) => out.push('"'),
                    Some((_, other)) => {
                        self.pos = start;
                        return Err(self.error(&format!("unknown escape '\\{}'", other)));
                    }
                    None => break,
                },
                c => out.push(c),
            }
        }

        self.pos = start;
        Err(self.error("unterminated string"))
    }
}
