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

//! Statement-level recursive-descent parser over the token stream.
//!
//! Expressions are consumed as balanced token runs; only statement structure
//! is materialized. A conservative automatic-semicolon rule ends an
//! expression at a newline when the previous token can end one and the next
//! token cannot continue it.

use super::ast::*;
use super::lexer::{Token, TokenKind};
use std::fmt;

/// Parse failure with its location.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub line: u32,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {})", self.message, self.line)
    }
}

impl std::error::Error for ParseError {}

pub(crate) struct Parser<'a> {
    tokens: &'a [Token<'a>],
    pos: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(tokens: &'a [Token<'a>]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub(crate) fn parse_program(mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = Vec::new();
        while self.peek().is_some() {
            if self.at_punct("}") {
                return Err(self.error_here("unexpected '}'"));
            }
            stmts.push(self.parse_statement()?);
        }
        Ok(stmts)
    }

    // --- token helpers ---

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<Token<'a>> {
        self.tokens.get(self.pos + offset).copied()
    }

    fn at_punct(&self, text: &str) -> bool {
        self.peek().is_some_and(|t| t.kind == TokenKind::Punct && t.text == text)
    }

    fn at_ident(&self, text: &str) -> bool {
        self.peek().is_some_and(|t| t.kind == TokenKind::Ident && t.text == text)
    }

    fn bump(&mut self) -> Token<'a> {
        let tok = self.tokens[self.pos];
        self.pos += 1;
        tok
    }

    fn prev_end(&self) -> usize {
        self.tokens[self.pos - 1].end
    }

    fn expect_punct(&mut self, text: &str) -> Result<Token<'a>, ParseError> {
        if self.at_punct(text) {
            Ok(self.bump())
        } else {
            Err(self.error_here(format!("expected '{text}'")))
        }
    }

    fn expect_ident(&mut self, text: &str) -> Result<Token<'a>, ParseError> {
        if self.at_ident(text) {
            Ok(self.bump())
        } else {
            Err(self.error_here(format!("expected '{text}'")))
        }
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        let line = self
            .peek()
            .map(|t| t.line)
            .or_else(|| self.tokens.last().map(|t| t.line))
            .unwrap_or(1);
        ParseError { message: message.into(), line }
    }

    fn eof_error(&self) -> ParseError {
        ParseError {
            message: "unexpected end of input".to_string(),
            line: self.tokens.last().map_or(1, |t| t.line),
        }
    }

    // --- statements ---

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let Some(tok) = self.peek() else { return Err(self.eof_error()) };
        match (tok.kind, tok.text) {
            (TokenKind::Punct, "{") => Ok(Stmt::Block(self.parse_block()?)),
            (TokenKind::Punct, ";") => {
                let t = self.bump();
                Ok(Stmt::Empty(SourceRange { start: t.start, end: t.end, line: t.line }))
            }
            (TokenKind::Ident, "if") => self.parse_if(),
            (TokenKind::Ident, "for") => self.parse_for(),
            (TokenKind::Ident, "while") => self.parse_while(),
            (TokenKind::Ident, "do") => self.parse_do(),
            (TokenKind::Ident, "switch") => self.parse_switch(),
            (TokenKind::Ident, "try") => self.parse_try(),
            (TokenKind::Ident, "return" | "throw" | "break" | "continue") => self.parse_jump(),
            (TokenKind::Ident, "function") => self.parse_function(),
            (TokenKind::Ident, "async")
                if self
                    .peek_at(1)
                    .is_some_and(|t| t.kind == TokenKind::Ident && t.text == "function") =>
            {
                self.parse_function()
            }
            (TokenKind::Ident, "class") => self.parse_class(),
            (TokenKind::Ident, "let" | "const" | "var") if self.is_declaration_start() => {
                Ok(Stmt::Declaration(self.parse_declaration(false)?))
            }
            (TokenKind::Ident, _)
                if self
                    .peek_at(1)
                    .is_some_and(|t| t.kind == TokenKind::Punct && t.text == ":") =>
            {
                self.parse_labeled()
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        let open = self.expect_punct("{")?;
        let mut stmts = Vec::new();
        while let Some(t) = self.peek() {
            if t.kind == TokenKind::Punct && t.text == "}" {
                break;
            }
            stmts.push(self.parse_statement()?);
        }
        let close = self.expect_punct("}")?;
        Ok(Block {
            range: SourceRange { start: open.start, end: close.end, line: open.line },
            stmts,
        })
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let kw = self.bump();
        self.consume_paren_group()?;
        let consequent = Box::new(self.parse_statement()?);
        let mut end = consequent.range().end;
        let alternate = if self.at_ident("else") {
            self.bump();
            let stmt = self.parse_statement()?;
            end = stmt.range().end;
            Some(Box::new(stmt))
        } else {
            None
        };
        Ok(Stmt::If(IfStmt {
            range: SourceRange { start: kw.start, end, line: kw.line },
            consequent,
            alternate,
        }))
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let kw = self.bump();
        if self.at_ident("await") {
            self.bump();
        }
        self.expect_punct("(")?;
        let mut kind = LoopKind::For;
        let mut head_decl = None;
        if matches!(self.peek(), Some(t) if t.kind == TokenKind::Ident
            && matches!(t.text, "let" | "const" | "var"))
            && self.is_declaration_start()
        {
            let decl = self.parse_declaration(true)?;
            if self.at_ident("of") {
                kind = LoopKind::ForOf;
            } else if self.at_ident("in") {
                kind = LoopKind::ForIn;
            }
            head_decl = Some(decl);
        }
        self.consume_group_rest('(')?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::Loop(LoopStmt {
            range: SourceRange { start: kw.start, end: body.range().end, line: kw.line },
            kind,
            head_decl,
            body,
        }))
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        let kw = self.bump();
        self.consume_paren_group()?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::Loop(LoopStmt {
            range: SourceRange { start: kw.start, end: body.range().end, line: kw.line },
            kind: LoopKind::While,
            head_decl: None,
            body,
        }))
    }

    fn parse_do(&mut self) -> Result<Stmt, ParseError> {
        let kw = self.bump();
        let body = Box::new(self.parse_statement()?);
        self.expect_ident("while")?;
        self.consume_paren_group()?;
        if self.at_punct(";") {
            self.bump();
        }
        Ok(Stmt::Loop(LoopStmt {
            range: SourceRange { start: kw.start, end: self.prev_end(), line: kw.line },
            kind: LoopKind::DoWhile,
            head_decl: None,
            body,
        }))
    }

    fn parse_switch(&mut self) -> Result<Stmt, ParseError> {
        let kw = self.bump();
        self.consume_paren_group()?;
        if !self.at_punct("{") {
            return Err(self.error_here("expected '{' after switch head"));
        }
        let body = self.consume_balanced()?;
        Ok(Stmt::Switch(SwitchStmt {
            range: SourceRange { start: kw.start, end: body.end, line: kw.line },
        }))
    }

    fn parse_try(&mut self) -> Result<Stmt, ParseError> {
        let kw = self.bump();
        let mut blocks = vec![self.parse_block()?];
        if self.at_ident("catch") {
            self.bump();
            if self.at_punct("(") {
                self.consume_balanced()?;
            }
            blocks.push(self.parse_block()?);
        }
        if self.at_ident("finally") {
            self.bump();
            blocks.push(self.parse_block()?);
        }
        if blocks.len() == 1 {
            return Err(self.error_here("expected 'catch' or 'finally' after try block"));
        }
        Ok(Stmt::Try(TryStmt {
            range: SourceRange { start: kw.start, end: self.prev_end(), line: kw.line },
            blocks,
        }))
    }

    fn parse_jump(&mut self) -> Result<Stmt, ParseError> {
        let kw = self.bump();
        let has_argument = match self.peek() {
            None => false,
            // Restricted production: a newline after the keyword ends it.
            Some(t) if t.newline_before => false,
            Some(t) if t.kind == TokenKind::Punct && matches!(t.text, ";" | "}") => false,
            Some(_) => true,
        };
        if has_argument {
            self.consume_expression(false)?;
        }
        if self.at_punct(";") {
            self.bump();
        }
        Ok(Stmt::Jump(JumpStmt {
            range: SourceRange { start: kw.start, end: self.prev_end(), line: kw.line },
        }))
    }

    fn parse_function(&mut self) -> Result<Stmt, ParseError> {
        let first = self.bump();
        if first.text == "async" {
            self.expect_ident("function")?;
        }
        if self.at_punct("*") {
            self.bump();
        }
        if matches!(self.peek(), Some(t) if t.kind == TokenKind::Ident) {
            self.bump();
        }
        if !self.at_punct("(") {
            return Err(self.error_here("expected parameter list"));
        }
        self.consume_balanced()?;
        let body = self.parse_block()?;
        Ok(Stmt::FunctionDecl(FunctionDecl {
            range: SourceRange { start: first.start, end: body.range.end, line: first.line },
            body,
        }))
    }

    fn parse_class(&mut self) -> Result<Stmt, ParseError> {
        let kw = self.bump();
        if matches!(self.peek(), Some(t) if t.kind == TokenKind::Ident && t.text != "extends") {
            self.bump();
        }
        if self.at_ident("extends") {
            self.bump();
            // Heritage expression up to the class body brace.
            let mut stack: Vec<&str> = Vec::new();
            while let Some(t) = self.peek() {
                if stack.is_empty() && t.kind == TokenKind::Punct && t.text == "{" {
                    break;
                }
                if t.kind == TokenKind::Punct {
                    match t.text {
                        "(" | "[" | "{" => stack.push(t.text),
                        ")" | "]" | "}" => {
                            stack.pop();
                        }
                        _ => {}
                    }
                }
                self.bump();
            }
        }
        if !self.at_punct("{") {
            return Err(self.error_here("expected class body"));
        }
        let body = self.consume_balanced()?;
        Ok(Stmt::ClassDecl(ClassDecl {
            range: SourceRange { start: kw.start, end: body.end, line: kw.line },
        }))
    }

    fn parse_labeled(&mut self) -> Result<Stmt, ParseError> {
        let label = self.bump();
        self.bump(); // ':'
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::Labeled(LabeledStmt {
            range: SourceRange { start: label.start, end: body.range().end, line: label.line },
            body,
        }))
    }

    fn parse_expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let first = self.peek().ok_or_else(|| self.eof_error())?;
        let is_trace_call = first.kind == TokenKind::Ident
            && first.text == "__trace"
            && self
                .peek_at(1)
                .is_some_and(|t| t.kind == TokenKind::Punct && t.text == "(");
        let range = self
            .consume_expression(false)?
            .ok_or_else(|| self.error_here(format!("unexpected token '{}'", first.text)))?;
        if self.at_punct(";") {
            self.bump();
        }
        Ok(Stmt::Expression(ExpressionStmt {
            range: SourceRange { start: range.start, end: self.prev_end(), line: range.line },
            is_trace_call,
        }))
    }

    // --- declarations ---

    /// Whether the `let`/`const`/`var` at the cursor starts a declaration.
    /// In sloppy mode `let` is a valid identifier, so `let = 1` or `let.x`
    /// must not be treated as declarations.
    fn is_declaration_start(&self) -> bool {
        let Some(kw) = self.peek() else { return false };
        let Some(next) = self.peek_at(1) else { return false };
        if kw.text == "var" {
            return true;
        }
        next.kind == TokenKind::Ident
            || (next.kind == TokenKind::Punct && matches!(next.text, "[" | "{"))
    }

    fn parse_declaration(&mut self, in_for_head: bool) -> Result<DeclarationStmt, ParseError> {
        let kw = self.bump();
        let kind = match kw.text {
            "let" => DeclKind::Let,
            "const" => DeclKind::Const,
            _ => DeclKind::Var,
        };
        let mut declarators = Vec::new();
        loop {
            let Some(t) = self.peek() else {
                return Err(self.eof_error());
            };
            let (name, name_range) = if t.kind == TokenKind::Punct && matches!(t.text, "[" | "{")
            {
                (None, self.consume_balanced()?)
            } else if t.kind == TokenKind::Ident {
                self.bump();
                (Some(t.text.to_string()), SourceRange { start: t.start, end: t.end, line: t.line })
            } else {
                return Err(self.error_here("expected binding identifier"));
            };
            let init = if self.at_punct("=") {
                self.bump();
                Some(
                    self.consume_expression(true)?
                        .ok_or_else(|| self.error_here("expected initializer expression"))?,
                )
            } else {
                None
            };
            declarators.push(Declarator { name, name_range, init });
            if self.at_punct(",") {
                self.bump();
                continue;
            }
            break;
        }
        if !in_for_head && self.at_punct(";") {
            self.bump();
        }
        Ok(DeclarationStmt {
            range: SourceRange { start: kw.start, end: self.prev_end(), line: kw.line },
            kind,
            declarators,
        })
    }

    // --- expression consumption ---

    /// Consumes a balanced `(...)`, `[...]`, or `{...}` group starting at the
    /// cursor and returns its span.
    fn consume_balanced(&mut self) -> Result<SourceRange, ParseError> {
        let open = self.bump();
        let open_char = match open.text {
            "(" => '(',
            "[" => '[',
            "{" => '{',
            _ => return Err(self.error_here("expected opening delimiter")),
        };
        let end = self.consume_group_rest(open_char)?;
        Ok(SourceRange { start: open.start, end, line: open.line })
    }

    fn consume_paren_group(&mut self) -> Result<SourceRange, ParseError> {
        if !self.at_punct("(") {
            return Err(self.error_here("expected '('"));
        }
        self.consume_balanced()
    }

    /// Consumes tokens until the group opened by `open_char` (already
    /// consumed) closes, tracking nested delimiters.
    fn consume_group_rest(&mut self, open_char: char) -> Result<usize, ParseError> {
        let mut stack = vec![open_char];
        while let Some(t) = self.peek() {
            if t.kind == TokenKind::Punct {
                match t.text {
                    "(" => stack.push('('),
                    "[" => stack.push('['),
                    "{" => stack.push('{'),
                    ")" | "]" | "}" => {
                        let expected = match t.text {
                            ")" => '(',
                            "]" => '[',
                            _ => '{',
                        };
                        if stack.pop() != Some(expected) {
                            return Err(self.error_here(format!("mismatched '{}'", t.text)));
                        }
                    }
                    _ => {}
                }
            }
            self.bump();
            if stack.is_empty() {
                return Ok(self.prev_end());
            }
        }
        Err(self.eof_error())
    }

    /// Consumes an expression's tokens. Stops before `;`, before a top-level
    /// `,` when `stop_at_comma` is set, before a closing delimiter belonging
    /// to an enclosing construct, and at automatic-semicolon boundaries.
    /// Returns `None` when no token was consumed.
    fn consume_expression(
        &mut self,
        stop_at_comma: bool,
    ) -> Result<Option<SourceRange>, ParseError> {
        let start_idx = self.pos;
        let mut stack: Vec<char> = Vec::new();
        while let Some(t) = self.peek() {
            if stack.is_empty() {
                if t.kind == TokenKind::Punct {
                    match t.text {
                        ";" => break,
                        "," if stop_at_comma => break,
                        ")" | "]" | "}" => break,
                        _ => {}
                    }
                }
                if self.pos > start_idx && t.newline_before && self.asi_breaks(t) {
                    break;
                }
            }
            if t.kind == TokenKind::Punct {
                match t.text {
                    "(" => stack.push('('),
                    "[" => stack.push('['),
                    "{" => stack.push('{'),
                    ")" | "]" | "}" => {
                        let expected = match t.text {
                            ")" => '(',
                            "]" => '[',
                            _ => '{',
                        };
                        if stack.pop() != Some(expected) {
                            return Err(self.error_here(format!("mismatched '{}'", t.text)));
                        }
                    }
                    _ => {}
                }
            }
            self.bump();
        }
        if self.pos == start_idx {
            return Ok(None);
        }
        let first = self.tokens[start_idx];
        Ok(Some(SourceRange { start: first.start, end: self.prev_end(), line: first.line }))
    }

    /// Conservative automatic-semicolon rule: break at `tok` when the
    /// previous token can end an expression and `tok` cannot continue one.
    fn asi_breaks(&self, tok: Token<'_>) -> bool {
        let prev = self.tokens[self.pos - 1];
        let prev_ends = match prev.kind {
            TokenKind::Ident => !matches!(
                prev.text,
                "typeof"
                    | "new"
                    | "delete"
                    | "void"
                    | "in"
                    | "of"
                    | "instanceof"
                    | "case"
                    | "return"
                    | "throw"
                    | "yield"
                    | "await"
                    | "else"
                    | "do"
            ),
            TokenKind::Punct => matches!(prev.text, ")" | "]" | "}" | "++" | "--"),
            _ => true,
        };
        if !prev_ends {
            return false;
        }
        match tok.kind {
            TokenKind::Ident => !matches!(tok.text, "in" | "of" | "instanceof"),
            TokenKind::Number | TokenKind::String | TokenKind::Regex => true,
            // A tagged template continues the expression.
            TokenKind::Template => false,
            TokenKind::Punct => matches!(tok.text, "++" | "--" | "!" | "~" | "{"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::lexer::tokenize;
    use super::*;

    fn parse(src: &str) -> Vec<Stmt> {
        let tokens = tokenize(src).unwrap();
        Parser::new(&tokens).parse_program().unwrap()
    }

    #[test]
    fn test_declarations_and_calls() {
        let stmts = parse("const msg = \"hi\";\nlet x = 1;\nconsole.log(msg);");
        assert_eq!(stmts.len(), 3);
        match &stmts[0] {
            Stmt::Declaration(d) => {
                assert_eq!(d.kind, DeclKind::Const);
                assert_eq!(d.declarators[0].name.as_deref(), Some("msg"));
                assert!(d.declarators[0].init.is_some());
            }
            other => panic!("expected declaration, got {other:?}"),
        }
        assert!(matches!(&stmts[2], Stmt::Expression(e) if e.range.line == 3));
    }

    #[test]
    fn test_multi_declarator_lines() {
        let stmts = parse("let a = 1, b = [1, 2], c;");
        match &stmts[0] {
            Stmt::Declaration(d) => {
                assert_eq!(d.declarators.len(), 3);
                assert!(d.declarators[1].init.is_some());
                assert!(d.declarators[2].init.is_none());
            }
            other => panic!("expected declaration, got {other:?}"),
        }
    }

    #[test]
    fn test_if_else_chain() {
        let stmts = parse("if (a) { b(); } else if (c) d(); else { e(); }");
        match &stmts[0] {
            Stmt::If(s) => {
                assert!(matches!(*s.consequent, Stmt::Block(_)));
                assert!(matches!(s.alternate.as_deref(), Some(Stmt::If(_))));
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn test_for_head_declaration() {
        let stmts = parse("for (let i = 0; i < 3; i++) { work(i); }");
        match &stmts[0] {
            Stmt::Loop(l) => {
                assert_eq!(l.kind, LoopKind::For);
                let decl = l.head_decl.as_ref().unwrap();
                assert_eq!(decl.declarators[0].name.as_deref(), Some("i"));
                assert!(decl.declarators[0].init.is_some());
            }
            other => panic!("expected loop, got {other:?}"),
        }
    }

    #[test]
    fn test_for_of() {
        let stmts = parse("for (const item of items) use(item);");
        match &stmts[0] {
            Stmt::Loop(l) => {
                assert_eq!(l.kind, LoopKind::ForOf);
                assert!(l.head_decl.as_ref().unwrap().declarators[0].init.is_none());
                assert!(!matches!(*l.body, Stmt::Block(_)));
            }
            other => panic!("expected loop, got {other:?}"),
        }
    }

    #[test]
    fn test_do_while() {
        let stmts = parse("do x++; while (x < 3);");
        assert!(matches!(&stmts[0], Stmt::Loop(l) if l.kind == LoopKind::DoWhile));
    }

    #[test]
    fn test_function_declaration_body_is_parsed() {
        let stmts = parse("function f(a, b) { let t = a; return t + b; }");
        match &stmts[0] {
            Stmt::FunctionDecl(f) => assert_eq!(f.body.stmts.len(), 2),
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn test_asi_splits_statements() {
        let stmts = parse("let x = 1\nconsole.log(x)\nx = 2");
        assert_eq!(stmts.len(), 3);
    }

    #[test]
    fn test_call_continues_across_newline() {
        // No ASI before '(' — this is one statement, as in real JavaScript.
        let stmts = parse("foo\n(bar)");
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn test_try_catch_finally() {
        let stmts = parse("try { a(); } catch (e) { b(); } finally { c(); }");
        assert!(matches!(&stmts[0], Stmt::Try(t) if t.blocks.len() == 3));
    }

    #[test]
    fn test_trace_call_detection() {
        let stmts = parse("__trace(1); work();");
        assert!(matches!(&stmts[0], Stmt::Expression(e) if e.is_trace_call));
        assert!(matches!(&stmts[1], Stmt::Expression(e) if !e.is_trace_call));
    }

    #[test]
    fn test_let_as_identifier_is_expression() {
        let stmts = parse("let = 5;");
        assert!(matches!(&stmts[0], Stmt::Expression(_)));
    }

    #[test]
    fn test_unbalanced_braces_error() {
        let tokens = tokenize("function f() { return 1;").unwrap();
        assert!(Parser::new(&tokens).parse_program().is_err());
    }

    #[test]
    fn test_labeled_loop() {
        let stmts = parse("outer: for (;;) { break outer; }");
        assert!(matches!(&stmts[0], Stmt::Labeled(l) if matches!(*l.body, Stmt::Loop(_))));
    }
}
