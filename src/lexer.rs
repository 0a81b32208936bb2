pub mod stream;
pub mod token;

use crate::keywords;
use crate::lexer::token::{Token, TokenKind};
use crate::parser::ParseError;

// Two-character punctuators first so `==` wins over `=`.
const PUNCTUATORS: &[(&str, TokenKind)] = &[
    ("==", TokenKind::Equal),
    ("!=", TokenKind::NotEqual),
    ("<=", TokenKind::LessEqual),
    (">=", TokenKind::GreaterEqual),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
    ("=", TokenKind::Assign),
    ("<", TokenKind::Less),
    (">", TokenKind::Greater),
    (".", TokenKind::Dot),
    (",", TokenKind::Comma),
    (";", TokenKind::Semicolon),
    ("(", TokenKind::LeftParen),
    (")", TokenKind::RightParen),
    ("{", TokenKind::LeftBrace),
    ("}", TokenKind::RightBrace),
    ("[", TokenKind::LeftBracket),
    ("]", TokenKind::RightBracket),
];

/// Pull-based scanner over the source bytes. Each `read` produces the next
/// token; once the end of input is reached it keeps producing end-of-file.
pub struct Lexer {
    src: Vec<u8>,
    pos: usize,
    line: usize,
}

impl Lexer {
    pub fn new(source: impl Into<String>) -> Self {
        Lexer {
            src: source.into().into_bytes(),
            pos: 0,
            line: 1,
        }
    }

    pub fn read(&mut self) -> Result<Token, ParseError> {
        // Spaces, tabs and carriage returns are insignificant.
        while matches!(self.peek_byte(), Some(b' ' | b'\t' | b'\r')) {
            self.pos += 1;
        }

        // Line comments run up to, but not including, the newline.
        if self.peek_byte() == Some(b'/') && self.peek_byte_at(1) == Some(b'/') {
            self.pos += 2;
            while !matches!(self.peek_byte(), None | Some(b'\0' | b'\n')) {
                self.pos += 1;
            }
        }

        let start = self.pos;
        let line = self.line;

        match self.peek_byte() {
            None | Some(b'\0') => Ok(Token::new(TokenKind::Eof, "[EOF]", line)),
            Some(b'\n') => {
                self.pos += 1;
                self.line += 1;
                Ok(Token::new(TokenKind::Eol, "[EOL]", line))
            }
            Some(c) if c.is_ascii_alphabetic() || c == b'_' => {
                while matches!(self.peek_byte(), Some(c) if c.is_ascii_alphanumeric() || c == b'_')
                {
                    self.pos += 1;
                }
                let text = self.text_from(start);
                let kind = keywords::lookup(&text).unwrap_or(TokenKind::Identifier);
                Ok(Token::new(kind, text, line))
            }
            Some(c) if c.is_ascii_digit() => {
                while matches!(self.peek_byte(), Some(c) if c.is_ascii_digit()) {
                    self.pos += 1;
                }
                let text = self.text_from(start);
                let value = text.parse::<i32>().map_err(|_| ParseError {
                    line,
                    message: format!("integer literal '{}' out of range", text),
                })?;
                Ok(Token::new(TokenKind::Int(value), text, line))
            }
            Some(b'"') => self.read_string(start, line),
            Some(byte) => self.read_punctuator(byte, line),
        }
    }

    fn read_string(&mut self, start: usize, line: usize) -> Result<Token, ParseError> {
        self.pos += 1;
        let content_start = self.pos;
        loop {
            match self.peek_byte() {
                None | Some(b'\0') => {
                    return Err(ParseError {
                        line: self.line,
                        message: "unterminated string literal".to_string(),
                    });
                }
                Some(b'"') => break,
                Some(b'\n') => {
                    self.pos += 1;
                    self.line += 1;
                }
                Some(_) => self.pos += 1,
            }
        }
        let value = String::from_utf8_lossy(&self.src[content_start..self.pos]).into_owned();
        self.pos += 1;
        let text = self.text_from(start);
        Ok(Token::new(TokenKind::Str(value), text, line))
    }

    fn read_punctuator(&mut self, byte: u8, line: usize) -> Result<Token, ParseError> {
        for (text, kind) in PUNCTUATORS {
            if self.src[self.pos..].starts_with(text.as_bytes()) {
                self.pos += text.len();
                return Ok(Token::new(kind.clone(), *text, line));
            }
        }

        self.pos += 1;
        Err(ParseError {
            line,
            message: format!("unexpected character '\\x{:02X}'", byte),
        })
    }

    fn peek_byte(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_byte_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn text_from(&self, start: usize) -> String {
        String::from_utf8_lossy(&self.src[start..self.pos]).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.read().expect("scan failed");
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    fn kinds(tokens: &[Token]) -> Vec<&TokenKind> {
        tokens.iter().map(|t| &t.kind).collect()
    }

    #[test]
    fn scan_basic_tokens() {
        let tokens = scan("x = 5");
        assert_eq!(
            kinds(&tokens),
            vec![
                &TokenKind::Identifier,
                &TokenKind::Assign,
                &TokenKind::Int(5),
                &TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[0].text, "x");
    }

    #[test]
    fn scan_keywords_and_identifiers() {
        let tokens = scan("while whilex _if if9 if");
        assert_eq!(
            kinds(&tokens),
            vec![
                &TokenKind::While,
                &TokenKind::Identifier,
                &TokenKind::Identifier,
                &TokenKind::Identifier,
                &TokenKind::If,
                &TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn scan_prefers_longest_punctuator() {
        let tokens = scan("== = <= < >= > !=");
        assert_eq!(
            kinds(&tokens),
            vec![
                &TokenKind::Equal,
                &TokenKind::Assign,
                &TokenKind::LessEqual,
                &TokenKind::Less,
                &TokenKind::GreaterEqual,
                &TokenKind::Greater,
                &TokenKind::NotEqual,
                &TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn scan_line_comment_runs_to_newline() {
        let tokens = scan("1 // two three\n4");
        assert_eq!(
            kinds(&tokens),
            vec![
                &TokenKind::Int(1),
                &TokenKind::Eol,
                &TokenKind::Int(4),
                &TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn scan_end_of_line_carries_the_line_it_terminates() {
        let tokens = scan("1\n2\n3");
        let lines: Vec<usize> = tokens.iter().map(|t| t.line).collect();
        // 1 [EOL] 2 [EOL] 3 [EOF]
        assert_eq!(lines, vec![1, 1, 2, 2, 3, 3]);
    }

    #[test]
    fn scan_string_literal_keeps_raw_contents() {
        let tokens = scan("\"hello // not a comment\"");
        assert_eq!(
            tokens[0].kind,
            TokenKind::Str("hello // not a comment".to_string())
        );
        assert_eq!(tokens[0].text, "\"hello // not a comment\"");
    }

    #[test]
    fn scan_unterminated_string_fails() {
        let mut lexer = Lexer::new("\"open");
        let err = lexer.read().unwrap_err();
        assert!(err.message.contains("unterminated string"));
    }

    #[test]
    fn scan_unexpected_character_reports_hex() {
        let mut lexer = Lexer::new("@");
        let err = lexer.read().unwrap_err();
        assert!(err.message.contains("\\x40"), "got: {}", err.message);
    }

    #[test]
    fn scan_keeps_returning_eof() {
        let mut lexer = Lexer::new("1");
        assert_eq!(lexer.read().unwrap().kind, TokenKind::Int(1));
        assert_eq!(lexer.read().unwrap().kind, TokenKind::Eof);
        assert_eq!(lexer.read().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn scan_stops_at_embedded_nul() {
        let tokens = scan("1\0 2");
        assert_eq!(kinds(&tokens), vec![&TokenKind::Int(1), &TokenKind::Eof]);
    }

    #[test]
    fn scan_integer_out_of_range_fails() {
        let mut lexer = Lexer::new("99999999999999999999");
        let err = lexer.read().unwrap_err();
        assert!(err.message.contains("out of range"));
    }
}
