//! Scans an input string character by character.
//! Reading past the end yields '\0', so parsers can treat end-of-input like
//! any other terminator.

#[derive(Debug)]
pub struct ParseError {
    msg: String,
    ofs: usize,
}
pub type ParseResult<T> = Result<T, ParseError>;

pub struct Scanner<'a> {
    buf: &'a str,
    pub ofs: usize,
    pub line: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(buf: &'a str) -> Self {
        Scanner {
            buf,
            ofs: 0,
            line: 1,
        }
    }

    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.buf[start..end]
    }
    pub fn peek(&self) -> char {
        match self.buf.as_bytes().get(self.ofs) {
            Some(&c) => c as char,
            None => '\0',
        }
    }
    pub fn at_end(&self) -> bool {
        self.ofs >= self.buf.len()
    }
    pub fn next(&mut self) {
        if self.peek() == '\n' {
            self.line += 1;
        }
        self.ofs += 1;
    }
    pub fn back(&mut self) {
        if self.ofs == 0 {
            panic!("back at start")
        }
        self.ofs -= 1;
        if self.peek() == '\n' {
            self.line -= 1;
        }
    }
    pub fn read(&mut self) -> char {
        let c = self.peek();
        self.next();
        c
    }
    pub fn skip(&mut self, ch: char) -> bool {
        if self.peek() == ch {
            self.next();
            return true;
        }
        false
    }

    /// Skips to just past the next newline, or to the end of input.
    pub fn skip_line(&mut self) {
        loop {
            match self.read() {
                '\n' => break,
                '\0' => {
                    self.back();
                    break;
                }
                _ => {}
            }
        }
    }

    pub fn expect(&mut self, ch: char) -> ParseResult<()> {
        let r = self.read();
        if r != ch {
            self.back();
            return self.parse_error(format!("expected {:?}, got {:?}", ch, r));
        }
        Ok(())
    }

    pub fn parse_error<T, S: Into<String>>(&self, msg: S) -> ParseResult<T> {
        Err(ParseError {
            msg: msg.into(),
            ofs: self.ofs,
        })
    }

    /// Renders an error with the offending line and a caret under the column.
    pub fn format_parse_error(&self, filename: &str, err: ParseError) -> String {
        let mut ofs = 0;
        for (line_number, line) in self.buf.split('\n').enumerate() {
            if ofs + line.len() >= err.ofs {
                let mut msg = format!("parse error: {}\n", err.msg);
                let prefix = format!("{}:{}: ", filename, line_number + 1);
                msg.push_str(&prefix);

                let col = err.ofs - ofs;
                let (context, col) = if col > 40 {
                    msg.push_str("...");
                    (line.get(col - 20..).unwrap_or(line), 3 + 20)
                } else {
                    (line, col)
                };
                match context.get(..40) {
                    Some(head) if context.len() > 40 => {
                        msg.push_str(head);
                        msg.push_str("...");
                    }
                    _ => msg.push_str(context),
                }
                msg.push('\n');
                msg.push_str(&" ".repeat(prefix.len() + col));
                msg.push_str("^\n");
                return msg;
            }
            ofs += line.len() + 1;
        }
        format!("parse error: {}\n{}: at end of input\n", err.msg, filename)
    }
}
