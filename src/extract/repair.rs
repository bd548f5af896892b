//! Permissive JSON repair for model output.
//!
//! A single pass over the input that rewrites the common ways LLMs break
//! JSON into something `serde_json` accepts:
//!
//! - trailing commas before `}` / `]`
//! - bare (unquoted) object keys and bare string values
//! - single-quoted strings
//! - missing commas between members or elements
//! - missing colons between a key and its value
//! - raw control characters and invalid escapes inside strings
//! - `//` and `/* */` comments
//! - Python-style `True` / `False` / `None`, and `undefined` / `NaN`
//! - truncation: unterminated strings, arrays and objects are closed
//!
//! The output is not guaranteed to parse; callers still run the real parser.

#[derive(Debug, Clone, Copy, PartialEq)]
enum Container {
    Object,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Expect {
    Key,
    Colon,
    Value,
    CommaOrEnd,
}

#[derive(Debug)]
struct Frame {
    container: Container,
    expect: Expect,
}

struct Repairer {
    chars: Vec<char>,
    pos: usize,
    out: String,
    stack: Vec<Frame>,
    top_level_done: bool,
}

/// Rewrite `input` into (hopefully) valid JSON.
pub fn repair_json(input: &str) -> String {
    let mut repairer = Repairer {
        chars: input.chars().collect(),
        pos: 0,
        out: String::with_capacity(input.len() + 16),
        stack: Vec::new(),
        top_level_done: false,
    };
    repairer.run();
    repairer.out
}

impl Repairer {
    fn run(&mut self) {
        while self.pos < self.chars.len() {
            if self.top_level_done && self.stack.is_empty() {
                // Anything after the first complete top-level value is noise.
                break;
            }

            let c = self.chars[self.pos];
            match c {
                c if c.is_whitespace() => {
                    self.out.push(c);
                    self.pos += 1;
                }
                '/' if self.peek(1) == Some('/') => self.skip_line_comment(),
                '/' if self.peek(1) == Some('*') => self.skip_block_comment(),
                '"' | '\'' => {
                    let is_key = self.begin_token();
                    self.read_string(c);
                    self.end_token(is_key);
                }
                '{' | '[' => {
                    self.begin_token();
                    self.out.push(c);
                    self.pos += 1;
                    let (container, expect) = if c == '{' {
                        (Container::Object, Expect::Key)
                    } else {
                        (Container::Array, Expect::Value)
                    };
                    self.stack.push(Frame { container, expect });
                }
                '}' | ']' => {
                    self.close(c);
                    self.pos += 1;
                }
                ':' => {
                    if let Some(frame) = self.stack.last_mut() {
                        if frame.expect == Expect::Colon {
                            self.out.push(':');
                            frame.expect = Expect::Value;
                        }
                    }
                    self.pos += 1;
                }
                ',' => {
                    if let Some(frame) = self.stack.last_mut() {
                        if frame.expect == Expect::CommaOrEnd {
                            self.out.push(',');
                            frame.expect = match frame.container {
                                Container::Object => Expect::Key,
                                Container::Array => Expect::Value,
                            };
                        }
                    }
                    self.pos += 1;
                }
                _ => {
                    let is_key = self.begin_token();
                    self.read_bare(is_key);
                    self.end_token(is_key);
                }
            }
        }
        self.finish();
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    /// Prepare for a key or value token; returns true when it is a key.
    fn begin_token(&mut self) -> bool {
        let Some(frame) = self.stack.last_mut() else {
            return false;
        };
        match frame.expect {
            Expect::CommaOrEnd => {
                self.out.push(',');
                match frame.container {
                    Container::Object => {
                        frame.expect = Expect::Key;
                        true
                    }
                    Container::Array => {
                        frame.expect = Expect::Value;
                        false
                    }
                }
            }
            Expect::Colon => {
                self.out.push(':');
                frame.expect = Expect::Value;
                false
            }
            Expect::Key => true,
            Expect::Value => false,
        }
    }

    fn end_token(&mut self, is_key: bool) {
        match self.stack.last_mut() {
            Some(frame) => {
                frame.expect = if is_key {
                    Expect::Colon
                } else {
                    Expect::CommaOrEnd
                };
            }
            None => self.top_level_done = true,
        }
    }

    fn read_string(&mut self, quote: char) {
        self.out.push('"');
        self.pos += 1;
        while self.pos < self.chars.len() {
            let c = self.chars[self.pos];
            if c == '\\' {
                match self.peek(1) {
                    Some(next) if "\"\\/bfnrtu".contains(next) => {
                        self.out.push('\\');
                        self.out.push(next);
                        self.pos += 2;
                    }
                    Some('\'') => {
                        self.out.push('\'');
                        self.pos += 2;
                    }
                    Some(_) => {
                        self.out.push_str("\\\\");
                        self.pos += 1;
                    }
                    None => {
                        self.pos += 1;
                    }
                }
                continue;
            }
            if c == quote {
                self.out.push('"');
                self.pos += 1;
                return;
            }
            match c {
                '"' => self.out.push_str("\\\""),
                '\n' => self.out.push_str("\\n"),
                '\r' => self.out.push_str("\\r"),
                '\t' => self.out.push_str("\\t"),
                c if (c as u32) < 0x20 => {
                    self.out.push_str(&format!("\\u{:04x}", c as u32));
                }
                c => self.out.push(c),
            }
            self.pos += 1;
        }
        // Truncated inside a string.
        self.out.push('"');
    }

    fn read_bare(&mut self, is_key: bool) {
        let start = self.pos;
        while self.pos < self.chars.len() {
            let c = self.chars[self.pos];
            let stop = if is_key {
                c == ':' || c.is_whitespace() || "{}[],\"'".contains(c)
            } else {
                c == '\n' || ",{}[]\"".contains(c)
            };
            if stop {
                break;
            }
            self.pos += 1;
        }
        let token: String = self.chars[start..self.pos].iter().collect();
        let token = token.trim_end();

        if token.is_empty() {
            // A lone stray character (e.g. an unmatched quote); drop it.
            self.pos = self.pos.max(start + 1);
            self.out.push_str("null");
            return;
        }

        if is_key {
            self.out.push_str(&quote(token));
            return;
        }

        // `[1 2 3]`: a literal followed by more text is a missing comma,
        // not a phrase.
        let first_len = token.chars().take_while(|c| !c.is_whitespace()).count();
        let first: String = token.chars().take(first_len).collect();
        if let Some(literal) = literal_or_number(&first) {
            self.pos = start + first_len;
            self.out.push_str(&literal);
            return;
        }
        self.out.push_str(&quote(token));
    }

    fn close(&mut self, closer: char) {
        let wanted = if closer == '}' {
            Container::Object
        } else {
            Container::Array
        };
        if !self.stack.iter().any(|f| f.container == wanted) {
            // Stray closer with nothing to close.
            return;
        }
        while let Some(frame) = self.stack.last() {
            let container = frame.container;
            self.close_top();
            if container == wanted {
                break;
            }
        }
    }

    fn close_top(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        self.trim_trailing_comma();
        match frame.expect {
            Expect::Colon => self.out.push_str(":null"),
            Expect::Value if frame.container == Container::Object => self.out.push_str("null"),
            _ => {}
        }
        self.out.push(match frame.container {
            Container::Object => '}',
            Container::Array => ']',
        });
        self.end_token(false);
    }

    fn trim_trailing_comma(&mut self) {
        let trimmed_len = self.out.trim_end().len();
        if self.out[..trimmed_len].ends_with(',') {
            self.out.truncate(trimmed_len - 1);
        }
    }

    fn finish(&mut self) {
        while !self.stack.is_empty() {
            self.close_top();
        }
    }

    fn skip_line_comment(&mut self) {
        while self.pos < self.chars.len() && self.chars[self.pos] != '\n' {
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) {
        self.pos += 2;
        while self.pos < self.chars.len() {
            if self.chars[self.pos] == '*' && self.peek(1) == Some('/') {
                self.pos += 2;
                return;
            }
            self.pos += 1;
        }
    }
}

fn quote(token: &str) -> String {
    serde_json::Value::String(token.to_string()).to_string()
}

fn literal_or_number(token: &str) -> Option<String> {
    match token {
        "true" | "True" | "TRUE" => Some("true".to_string()),
        "false" | "False" | "FALSE" => Some("false".to_string()),
        "null" | "None" | "undefined" | "NaN" => Some("null".to_string()),
        _ => normalize_number(token),
    }
}

fn normalize_number(token: &str) -> Option<String> {
    if serde_json::from_str::<serde_json::Number>(token).is_ok() {
        return Some(token.to_string());
    }
    // Leading '+', leading '.', trailing '.' and similar near-misses.
    let parsed: f64 = token.parse().ok()?;
    if !parsed.is_finite() {
        return None;
    }
    if parsed.fract() == 0.0 && parsed.abs() < 1e15 {
        Some(format!("{}", parsed as i64))
    } else {
        serde_json::Number::from_f64(parsed).map(|n| n.to_string())
    }
}
