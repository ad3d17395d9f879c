//! The token stream consumed by the parser.
//!
//! Spec.md §1 scopes the lexer out as an "external collaborator"; nothing
//! else in this workspace produces a token stream, though, so this module
//! ships a small, self-contained one grounded directly in
//! `original_source/apexLex.h` / `lexer.c`. It is kept narrow on purpose (no
//! parsing logic, no AST awareness) to preserve that boundary at the API
//! level: the parser only ever calls `Lexer::next_token`.

use crate::error::SrcLoc;
use crate::intern::{Interner, StringId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Ident,
    Int,
    Flt,
    Str,
    Null,
    If,
    Elif,
    Else,
    Fn,
    For,
    While,
    Foreach,
    In,
    Return,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    Equal,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    ModEqual,
    EqualEqual,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Not,
    Amp,
    And,
    Pipe,
    Or,
    Break,
    Continue,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    True,
    False,
    Arrow,
    Include,
    Dot,
    Colon,
    Switch,
    Case,
    Default,
    Eof,
}

/// A lexed token. `text` holds the literal/identifier text (interned so that
/// identical identifiers compare by `StringId` the same way string literals
/// do — both ultimately feed the same interner).
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenType,
    pub text: StringId,
    pub srcloc: SrcLoc,
}

pub struct Lexer<'a> {
    source: &'a [u8],
    position: usize,
    line: u32,
    filename: String,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(source: &'a str, filename: impl Into<String>) -> Self {
        Self {
            source: source.as_bytes(),
            position: 0,
            line: 1,
            filename: filename.into(),
        }
    }

    fn srcloc(&self) -> SrcLoc {
        SrcLoc::new(self.line, self.filename.clone())
    }

    fn peek(&self) -> u8 {
        *self.source.get(self.position).unwrap_or(&0)
    }

    fn peek_at(&self, offset: usize) -> u8 {
        *self.source.get(self.position + offset).unwrap_or(&0)
    }

    fn advance(&mut self) -> u8 {
        let c = self.peek();
        if c != 0 {
            self.position += 1;
        }
        c
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.peek().is_ascii_whitespace() {
                if self.peek() == b'\n' {
                    self.line += 1;
                }
                self.advance();
            }
            if self.peek() == b'#' {
                while self.peek() != b'\n' && self.peek() != 0 {
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn make(&self, kind: TokenType, text: &str, interner: &mut Interner) -> Token {
        Token {
            kind,
            text: interner.intern(text),
            srcloc: self.srcloc(),
        }
    }

    fn scan_number(&mut self, start: usize, interner: &mut Interner) -> Token {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        let mut kind = TokenType::Int;
        if self.peek() == b'.' && self.peek_at(1).is_ascii_digit() {
            kind = TokenType::Flt;
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        let text = std::str::from_utf8(&self.source[start..self.position]).unwrap_or_default();
        self.make(kind, text, interner)
    }

    fn scan_ident(&mut self, start: usize, interner: &mut Interner) -> Token {
        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            self.advance();
        }
        let text = std::str::from_utf8(&self.source[start..self.position]).unwrap_or_default();
        let kind = match text {
            "if" => TokenType::If,
            "elif" => TokenType::Elif,
            "else" => TokenType::Else,
            "fn" => TokenType::Fn,
            "for" => TokenType::For,
            "while" => TokenType::While,
            "foreach" => TokenType::Foreach,
            "in" => TokenType::In,
            "return" => TokenType::Return,
            "break" => TokenType::Break,
            "continue" => TokenType::Continue,
            "true" => TokenType::True,
            "false" => TokenType::False,
            "null" => TokenType::Null,
            "include" => TokenType::Include,
            "switch" => TokenType::Switch,
            "case" => TokenType::Case,
            "default" => TokenType::Default,
            _ => TokenType::Ident,
        };
        self.make(kind, text, interner)
    }

    /// Scans a double-quoted string, honoring backslash escapes the way
    /// `original_source/lexer.c`'s `scan_str` does (escape the following
    /// character unconditionally rather than interpreting `\n`/`\t` etc.).
    fn scan_string(&mut self, interner: &mut Interner) -> Result<Token, String> {
        let mut out = String::new();
        loop {
            let c = self.peek();
            if c == 0 {
                return Err("unterminated string literal".to_owned());
            }
            if c == b'"' {
                self.advance();
                break;
            }
            if c == b'\\' {
                self.advance();
                let escaped = self.advance();
                out.push(match escaped {
                    b'n' => '\n',
                    b't' => '\t',
                    b'r' => '\r',
                    b'\\' => '\\',
                    b'"' => '"',
                    other => other as char,
                });
            } else {
                out.push(self.advance() as char);
            }
        }
        Ok(self.make(TokenType::Str, &out, interner))
    }

    /// Produces the next token, or a diagnostic string on an unexpected character.
    pub fn next_token(&mut self, interner: &mut Interner) -> Result<Token, (SrcLoc, String)> {
        self.skip_whitespace_and_comments();
        let start = self.position;
        if self.position >= self.source.len() {
            return Ok(self.make(TokenType::Eof, "EOF", interner));
        }
        let c = self.advance();

        if c.is_ascii_alphabetic() || c == b'_' {
            return Ok(self.scan_ident(start, interner));
        }
        if c.is_ascii_digit() {
            return Ok(self.scan_number(start, interner));
        }

        macro_rules! two {
            ($second:expr, $two_kind:expr, $one_kind:expr, $one_text:expr) => {{
                if self.peek() == $second {
                    self.advance();
                    let text: &[u8] = &[c, $second];
                    Ok(self.make($two_kind, std::str::from_utf8(text).unwrap(), interner))
                } else {
                    Ok(self.make($one_kind, $one_text, interner))
                }
            }};
        }

        match c {
            b'"' => self.scan_string(interner).map_err(|m| (self.srcloc(), m)),
            b'=' => {
                if self.peek() == b'=' {
                    self.advance();
                    Ok(self.make(TokenType::EqualEqual, "==", interner))
                } else if self.peek() == b'>' {
                    self.advance();
                    Ok(self.make(TokenType::Arrow, "=>", interner))
                } else {
                    Ok(self.make(TokenType::Equal, "=", interner))
                }
            }
            b'+' => {
                if self.peek() == b'+' {
                    self.advance();
                    Ok(self.make(TokenType::PlusPlus, "++", interner))
                } else {
                    two!(b'=', TokenType::PlusEqual, TokenType::Plus, "+")
                }
            }
            b'-' => {
                if self.peek() == b'-' {
                    self.advance();
                    Ok(self.make(TokenType::MinusMinus, "--", interner))
                } else {
                    two!(b'=', TokenType::MinusEqual, TokenType::Minus, "-")
                }
            }
            b'*' => two!(b'=', TokenType::StarEqual, TokenType::Star, "*"),
            b'/' => two!(b'=', TokenType::SlashEqual, TokenType::Slash, "/"),
            b'%' => two!(b'=', TokenType::ModEqual, TokenType::Percent, "%"),
            b'(' => Ok(self.make(TokenType::LParen, "(", interner)),
            b')' => Ok(self.make(TokenType::RParen, ")", interner)),
            b'{' => Ok(self.make(TokenType::LBrace, "{", interner)),
            b'}' => Ok(self.make(TokenType::RBrace, "}", interner)),
            b'[' => Ok(self.make(TokenType::LBracket, "[", interner)),
            b']' => Ok(self.make(TokenType::RBracket, "]", interner)),
            b',' => Ok(self.make(TokenType::Comma, ",", interner)),
            b';' => Ok(self.make(TokenType::Semicolon, ";", interner)),
            b'.' => Ok(self.make(TokenType::Dot, ".", interner)),
            b':' => Ok(self.make(TokenType::Colon, ":", interner)),
            b'<' => two!(b'=', TokenType::LessEqual, TokenType::Less, "<"),
            b'>' => two!(b'=', TokenType::GreaterEqual, TokenType::Greater, ">"),
            b'!' => two!(b'=', TokenType::NotEqual, TokenType::Not, "!"),
            b'&' => two!(b'&', TokenType::And, TokenType::Amp, "&"),
            b'|' => two!(b'|', TokenType::Or, TokenType::Pipe, "|"),
            other => Err((self.srcloc(), format!("unexpected character: '{}'", other as char))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Lexer, TokenType};
    use crate::intern::Interner;

    fn lex_all(source: &str) -> Vec<TokenType> {
        let mut interner = Interner::new();
        let mut lexer = Lexer::new(source, "<test>");
        let mut kinds = Vec::new();
        loop {
            let tok = lexer.next_token(&mut interner).expect("lex error");
            let done = tok.kind == TokenType::Eof;
            kinds.push(tok.kind);
            if done {
                break;
            }
        }
        kinds
    }

    #[test]
    fn operators_maximal_munch() {
        use TokenType::{Equal, EqualEqual, Plus, PlusEqual, PlusPlus};
        assert_eq!(lex_all("++"), vec![PlusPlus, TokenType::Eof]);
        assert_eq!(lex_all("+="), vec![PlusEqual, TokenType::Eof]);
        assert_eq!(lex_all("+"), vec![Plus, TokenType::Eof]);
        assert_eq!(lex_all("=="), vec![EqualEqual, TokenType::Eof]);
        assert_eq!(lex_all("="), vec![Equal, TokenType::Eof]);
    }

    #[test]
    fn keywords_are_recognized() {
        use TokenType::{Else, Foreach, If, In};
        assert_eq!(lex_all("if else foreach in"), vec![If, Else, Foreach, In, TokenType::Eof]);
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(lex_all("1 # comment\n+ 2"), vec![
            TokenType::Int,
            TokenType::Plus,
            TokenType::Int,
            TokenType::Eof
        ]);
    }
}
