//! Recursive-descent reader for the ASCII property-list grammar
//!
//! Trivia (whitespace, `/* */` and `//` comments) is captured verbatim and
//! attached to the token that follows it. A block comment that sits on the
//! same line right after a scalar is that scalar's annotation instead.

use crate::error::SyntaxError;
use crate::tree::{is_token_byte, Annotation, Document, Field, Item, List, Object, Scalar, Value};

/// Deepest list/object nesting the reader descends into
pub const MAX_DEPTH: usize = 128;

/// Parse a whole document
///
/// # Errors
/// Returns [`SyntaxError`] with the byte position of the first problem,
/// including input nested deeper than [`MAX_DEPTH`].
pub fn parse(source: &str) -> Result<Document, SyntaxError> {
    let mut reader = Reader {
        src: source,
        pos: 0,
        depth: 0,
    };
    let head = reader.trivia()?;
    let root = reader.value()?;
    let tail = reader.trivia()?;
    if reader.pos != source.len() {
        return Err(reader.error("end of input"));
    }
    Ok(Document { head, root, tail })
}

struct Reader<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Reader<'a> {
    fn bytes(&self) -> &'a [u8] {
        self.src.as_bytes()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    fn starts_with(&self, pat: &str) -> bool {
        self.src[self.pos..].starts_with(pat)
    }

    fn error(&self, expected: &str) -> SyntaxError {
        SyntaxError::expected(self.src, self.pos, expected)
    }

    fn expect(&mut self, byte: u8, what: &str) -> Result<(), SyntaxError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(what))
        }
    }

    /// Whitespace and comments, returned verbatim
    fn trivia(&mut self) -> Result<String, SyntaxError> {
        let start = self.pos;
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\n' | b'\r') => self.pos += 1,
                Some(b'/') if self.starts_with("/*") => {
                    self.block_comment_end()?;
                }
                Some(b'/') if self.starts_with("//") => {
                    while let Some(b) = self.peek() {
                        self.pos += 1;
                        if b == b'\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(self.src[start..self.pos].to_string())
    }

    /// Skip past the `*/` of a comment starting at `pos`
    fn block_comment_end(&mut self) -> Result<usize, SyntaxError> {
        let body_start = self.pos + 2;
        match self.src[body_start..].find("*/") {
            Some(rel) => {
                self.pos = body_start + rel + 2;
                Ok(body_start + rel)
            }
            None => Err(self.error("a closing `*/`")),
        }
    }

    fn value(&mut self) -> Result<Value, SyntaxError> {
        match self.peek() {
            Some(b'{') => self.nested(|r| r.object().map(Value::Object)),
            Some(b'(') => self.nested(|r| r.list().map(Value::List)),
            Some(b'"' | b'\'') => self.scalar().map(Value::Scalar),
            Some(b) if is_token_byte(b) => self.scalar().map(Value::Scalar),
            _ => Err(self.error("a value")),
        }
    }

    fn nested(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<Value, SyntaxError>,
    ) -> Result<Value, SyntaxError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(&format!("nesting depth <= {MAX_DEPTH}")));
        }
        self.depth += 1;
        let value = read(self);
        self.depth -= 1;
        value
    }

    fn object(&mut self) -> Result<Object, SyntaxError> {
        self.expect(b'{', "`{`")?;
        let mut fields = Vec::new();
        loop {
            let lead = self.trivia()?;
            if self.peek() == Some(b'}') {
                self.pos += 1;
                return Ok(Object {
                    fields,
                    trailing: lead,
                });
            }
            let key = self.scalar()?;
            let before_eq = self.trivia()?;
            self.expect(b'=', "`=`")?;
            let after_eq = self.trivia()?;
            let value = self.value()?;
            let before_semi = self.trivia()?;
            self.expect(b';', "`;`")?;
            fields.push(Field {
                lead,
                key,
                before_eq,
                after_eq,
                value,
                before_semi,
            });
        }
    }

    fn list(&mut self) -> Result<List, SyntaxError> {
        self.expect(b'(', "`(`")?;
        let mut items = Vec::new();
        loop {
            let lead = self.trivia()?;
            if self.peek() == Some(b')') {
                self.pos += 1;
                return Ok(List {
                    items,
                    trailing: lead,
                });
            }
            let value = self.value()?;
            let before_comma = self.trivia()?;
            let comma = self.peek() == Some(b',');
            if comma {
                self.pos += 1;
            } else if self.peek() != Some(b')') {
                return Err(self.error("`,` or `)`"));
            }
            if comma {
                items.push(Item {
                    lead,
                    value,
                    before_comma,
                    comma,
                });
            } else {
                // `before_comma` is really the trivia before `)`
                items.push(Item {
                    lead,
                    value,
                    before_comma: String::new(),
                    comma,
                });
                self.pos += 1;
                return Ok(List {
                    items,
                    trailing: before_comma,
                });
            }
        }
    }

    fn scalar(&mut self) -> Result<Scalar, SyntaxError> {
        let start = self.pos;
        let value = match self.peek() {
            Some(q @ (b'"' | b'\'')) => self.quoted(q)?,
            Some(b) if is_token_byte(b) => {
                while let Some(b) = self.peek() {
                    if is_token_byte(b) {
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                self.src[start..self.pos].to_string()
            }
            _ => return Err(self.error("a string")),
        };
        let raw = self.src[start..self.pos].to_string();
        let note = self.annotation()?;
        Ok(Scalar { raw, value, note })
    }

    /// Quoted string body with escapes resolved; `pos` ends after the quote
    fn quoted(&mut self, quote: u8) -> Result<String, SyntaxError> {
        let open = self.pos;
        self.pos += 1;
        let mut out = String::new();
        let mut run_start = self.pos;
        loop {
            match self.peek() {
                None => {
                    self.pos = open;
                    return Err(self.error("a closing quote"));
                }
                Some(b) if b == quote => {
                    out.push_str(&self.src[run_start..self.pos]);
                    self.pos += 1;
                    return Ok(out);
                }
                Some(b'\\') => {
                    out.push_str(&self.src[run_start..self.pos]);
                    self.pos += 1;
                    let escaped = self.src[self.pos..]
                        .chars()
                        .next()
                        .ok_or_else(|| self.error("an escaped character"))?;
                    out.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    });
                    self.pos += escaped.len_utf8();
                    run_start = self.pos;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// A `/* ... */` on the same line right after a scalar
    fn annotation(&mut self) -> Result<Option<Annotation>, SyntaxError> {
        let start = self.pos;
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
        if !self.starts_with("/*") {
            self.pos = start;
            return Ok(None);
        }
        let gap = self.src[start..self.pos].to_string();
        let body_start = self.pos + 2;
        let body_end = self.block_comment_end()?;
        Ok(Some(Annotation {
            gap,
            body: self.src[body_start..body_end].to_string(),
        }))
    }
}
