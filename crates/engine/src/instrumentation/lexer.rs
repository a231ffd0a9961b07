// Tracepad - Interactive Code Tracing Service
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! JavaScript tokenizer for the instrumenter.
//!
//! Produces tokens with byte spans and 1-based lines so that rewrites can be
//! applied to the original text. String, template, regex, and comment
//! contents are consumed as opaque units, which is what guarantees that
//! keywords inside them are never rewritten. Comments are skipped (the edits
//! operate on the original source, so skipped regions survive untouched).

use std::fmt;

/// Lexical class of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword; the text disambiguates.
    Ident,
    /// Numeric literal (loosely scanned; never reinterpreted).
    Number,
    /// Single- or double-quoted string literal.
    String,
    /// Template literal including its interpolations.
    Template,
    /// Regular expression literal including flags.
    Regex,
    /// Operator or punctuation.
    Punct,
}

/// A single token with its span in the original source.
#[derive(Debug, Clone, Copy)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Slice of the original source covered by this token.
    pub text: &'a str,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    /// 1-based line the token starts on.
    pub line: u32,
    /// Whether a line terminator occurred since the previous token.
    pub newline_before: bool,
}

/// Tokenization failure with its location.
#[derive(Debug, Clone)]
pub struct LexError {
    pub message: String,
    pub line: u32,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {})", self.message, self.line)
    }
}

impl std::error::Error for LexError {}

/// Multi-character punctuators, longest first so that greedy matching wins.
const PUNCTUATORS: &[&str] = &[
    ">>>=", "===", "!==", "**=", "...", "<<=", ">>=", "&&=", "||=", "??=", ">>>", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "**", "++", "--", "+=", "-=", "*=", "%=", "&=",
    "|=", "^=", "<<", ">>",
];

/// Keywords after which a `/` starts a regex literal rather than a division.
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case",
    "do", "else", "yield", "await",
];

pub fn tokenize(src: &str) -> Result<Vec<Token<'_>>, LexError> {
    Lexer::new(src).run()
}

struct Lexer<'a> {
    src: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    line: u32,
    newline_pending: bool,
    tokens: Vec<Token<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().collect(),
            pos: 0,
            line: 1,
            newline_pending: false,
            tokens: Vec::new(),
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).map(|&(_, c)| c)
    }

    /// Byte offset of the character at index `pos`, or the source length.
    fn byte_at(&self, pos: usize) -> usize {
        self.chars.get(pos).map_or(self.src.len(), |&(off, _)| off)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        if c == '\n' {
            self.line += 1;
            self.newline_pending = true;
        }
        self.pos += 1;
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError { message: message.into(), line: self.line }
    }

    fn push_token(&mut self, kind: TokenKind, start_pos: usize, start_line: u32) {
        let start = self.byte_at(start_pos);
        let end = self.byte_at(self.pos);
        self.tokens.push(Token {
            kind,
            text: &self.src[start..end],
            start,
            end,
            line: start_line,
            newline_before: self.newline_pending,
        });
        self.newline_pending = false;
    }

    fn run(mut self) -> Result<Vec<Token<'a>>, LexError> {
        while let Some(c) = self.peek(0) {
            if c.is_whitespace() {
                self.bump();
                continue;
            }
            if c == '/' && self.peek(1) == Some('/') {
                while let Some(c) = self.peek(0) {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
                continue;
            }
            if c == '/' && self.peek(1) == Some('*') {
                self.skip_block_comment()?;
                continue;
            }

            let start_pos = self.pos;
            let start_line = self.line;
            match c {
                '"' | '\'' => {
                    self.scan_string(c)?;
                    self.push_token(TokenKind::String, start_pos, start_line);
                }
                '`' => {
                    self.scan_template()?;
                    self.push_token(TokenKind::Template, start_pos, start_line);
                }
                '/' => {
                    if self.regex_allowed() && self.try_scan_regex() {
                        self.push_token(TokenKind::Regex, start_pos, start_line);
                    } else {
                        self.bump();
                        if self.peek(0) == Some('=') {
                            self.bump();
                        }
                        self.push_token(TokenKind::Punct, start_pos, start_line);
                    }
                }
                _ if c.is_ascii_digit() => {
                    self.scan_number();
                    self.push_token(TokenKind::Number, start_pos, start_line);
                }
                _ if is_ident_start(c) => {
                    self.scan_ident();
                    self.push_token(TokenKind::Ident, start_pos, start_line);
                }
                _ => {
                    self.scan_punct();
                    self.push_token(TokenKind::Punct, start_pos, start_line);
                }
            }
        }
        Ok(self.tokens)
    }

    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let start_line = self.line;
        self.bump();
        self.bump();
        loop {
            match self.peek(0) {
                Some('*') if self.peek(1) == Some('/') => {
                    self.bump();
                    self.bump();
                    return Ok(());
                }
                Some(_) => {
                    self.bump();
                }
                None => {
                    return Err(LexError {
                        message: "unterminated block comment".to_string(),
                        line: start_line,
                    })
                }
            }
        }
    }

    fn scan_string(&mut self, quote: char) -> Result<(), LexError> {
        self.bump();
        loop {
            match self.peek(0) {
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some('\n') | None => return Err(self.error("unterminated string literal")),
                Some(c) if c == quote => {
                    self.bump();
                    return Ok(());
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn scan_template(&mut self) -> Result<(), LexError> {
        self.bump();
        loop {
            match self.peek(0) {
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some('`') => {
                    self.bump();
                    return Ok(());
                }
                Some('$') if self.peek(1) == Some('{') => {
                    self.bump();
                    self.bump();
                    self.skip_interpolation()?;
                }
                Some(_) => {
                    self.bump();
                }
                None => return Err(self.error("unterminated template literal")),
            }
        }
    }

    /// Consumes an interpolation body up to its closing `}`, honoring nested
    /// braces, strings, templates, and comments.
    fn skip_interpolation(&mut self) -> Result<(), LexError> {
        let mut depth = 1usize;
        loop {
            match self.peek(0) {
                Some('{') => {
                    self.bump();
                    depth += 1;
                }
                Some('}') => {
                    self.bump();
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some('"') => self.scan_string('"')?,
                Some('\'') => self.scan_string('\'')?,
                Some('`') => self.scan_template()?,
                Some('/') if self.peek(1) == Some('/') => {
                    while let Some(c) = self.peek(0) {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') if self.peek(1) == Some('*') => self.skip_block_comment()?,
                Some(_) => {
                    self.bump();
                }
                None => return Err(self.error("unterminated template interpolation")),
            }
        }
    }

    /// Loose numeric scan; the instrumenter never reinterprets numbers, so
    /// exotic forms only need to be consumed, not understood.
    fn scan_number(&mut self) {
        while let Some(c) = self.peek(0) {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn scan_ident(&mut self) {
        while let Some(c) = self.peek(0) {
            if is_ident_continue(c) {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn scan_punct(&mut self) {
        let remaining: String = self.chars[self.pos..]
            .iter()
            .take(4)
            .map(|&(_, c)| c)
            .collect();
        for p in PUNCTUATORS {
            if remaining.starts_with(p) {
                for _ in 0..p.chars().count() {
                    self.bump();
                }
                return;
            }
        }
        self.bump();
    }

    /// Whether a `/` at the current position can start a regex literal, based
    /// on the previous significant token.
    fn regex_allowed(&self) -> bool {
        match self.tokens.last() {
            None => true,
            Some(tok) => match tok.kind {
                TokenKind::Ident => REGEX_PRECEDING_KEYWORDS.contains(&tok.text),
                TokenKind::Punct => !matches!(tok.text, ")" | "]" | "++" | "--"),
                _ => false,
            },
        }
    }

    /// Attempts to scan a regex literal. On a newline or end of input before
    /// the closing `/`, rewinds and reports failure so the `/` falls back to
    /// a division operator.
    fn try_scan_regex(&mut self) -> bool {
        let saved_pos = self.pos;
        let saved_line = self.line;
        self.pos += 1; // the opening '/'
        let mut in_class = false;
        loop {
            match self.peek(0) {
                Some('\\') => {
                    self.pos += 1;
                    if self.peek(0).is_some() {
                        self.pos += 1;
                    }
                }
                Some('[') => {
                    in_class = true;
                    self.pos += 1;
                }
                Some(']') => {
                    in_class = false;
                    self.pos += 1;
                }
                Some('/') if !in_class => {
                    self.pos += 1;
                    // Trailing flags.
                    while let Some(c) = self.peek(0) {
                        if is_ident_continue(c) {
                            self.pos += 1;
                        } else {
                            break;
                        }
                    }
                    return true;
                }
                Some('\n') | None => {
                    self.pos = saved_pos;
                    self.line = saved_line;
                    return false;
                }
                Some(_) => {
                    self.pos += 1;
                }
            }
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<(TokenKind, String)> {
        tokenize(src)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text.to_string()))
            .collect()
    }

    #[test]
    fn test_keywords_in_strings_are_opaque() {
        let tokens = tokenize(r#"const msg = "let inside string";"#).unwrap();
        let strings: Vec<_> =
            tokens.iter().filter(|t| t.kind == TokenKind::String).collect();
        assert_eq!(strings.len(), 1);
        assert_eq!(strings[0].text, r#""let inside string""#);
        // Only the leading `const` lexes as an identifier keyword.
        assert_eq!(tokens[0].text, "const");
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = tokenize("let x = 1; // let y = 2\n/* const */ x").unwrap();
        let texts: Vec<_> = tokens.iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["let", "x", "=", "1", ";", "x"]);
        assert!(tokens.last().unwrap().newline_before);
    }

    #[test]
    fn test_template_with_interpolation_is_one_token() {
        let tokens = tokenize("`a ${ {b: `${c}`} } d` + 1").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Template);
        assert_eq!(tokens[1].text, "+");
    }

    #[test]
    fn test_line_numbers() {
        let tokens = tokenize("a\nb\n\nc").unwrap();
        let lines: Vec<_> = tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![1, 2, 4]);
    }

    #[test]
    fn test_regex_vs_division() {
        let tokens = kinds("x = a / b; y = /ab+/g.test(s);");
        assert!(tokens.iter().any(|(k, t)| *k == TokenKind::Punct && t == "/"));
        assert!(tokens.iter().any(|(k, t)| *k == TokenKind::Regex && t == "/ab+/g"));
    }

    #[test]
    fn test_multichar_punctuators() {
        let tokens = kinds("a === b && c => d ?? e");
        let puncts: Vec<_> = tokens
            .iter()
            .filter(|(k, _)| *k == TokenKind::Punct)
            .map(|(_, t)| t.as_str())
            .collect();
        assert_eq!(puncts, vec!["===", "&&", "=>", "??"]);
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let err = tokenize("let x = \"oops\nnext").unwrap_err();
        assert!(err.message.contains("unterminated string"));
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_spans_index_original_source() {
        let src = "let x = 10;";
        let tokens = tokenize(src).unwrap();
        for t in &tokens {
            assert_eq!(&src[t.start..t.end], t.text);
        }
    }
}
