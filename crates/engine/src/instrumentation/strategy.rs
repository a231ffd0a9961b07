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

//! Collects the instrumentation edits for a parsed program.
//!
//! Three kinds of edits are produced:
//! - `let`/`const` keywords are rewritten to `var` (token-level, so this also
//!   covers regions the statement parser treats as opaque);
//! - single-statement bodies of `if`/`else` and loops are wrapped in braces,
//!   then a `__trace(line);` probe is inserted before every block-level
//!   statement;
//! - top-level declarations are mirrored onto the `sandbox` object so the
//!   `with (sandbox)` wrapper routes later reads and writes through it.

use super::ast::*;
use super::lexer::{Token, TokenKind};
use super::modification::{
    SourceModifications, LEFT_BRACKET_PRIORITY, MIRROR_CLOSE_PRIORITY, MIRROR_OPEN_PRIORITY,
    RIGHT_BRACKET_PRIORITY, SEED_PRIORITY, TRACE_PROBE_PRIORITY,
};

/// Rewrites every block-scoped declaration keyword to `var`.
///
/// Works on the token stream rather than the statement tree so that
/// declarations inside opaque regions (function expressions, arrow bodies,
/// switch arms) are rewritten too. Keywords inside strings and comments never
/// reach this pass; the guards below keep `let`-as-identifier intact.
pub(crate) fn collect_declaration_rewrites(
    tokens: &[Token<'_>],
    mods: &mut SourceModifications,
) {
    for (i, tok) in tokens.iter().enumerate() {
        if tok.kind != TokenKind::Ident || !matches!(tok.text, "let" | "const") {
            continue;
        }
        let Some(next) = tokens.get(i + 1) else { continue };
        let declares_binding = next.kind == TokenKind::Ident
            || (next.kind == TokenKind::Punct && matches!(next.text, "[" | "{"));
        if !declares_binding {
            continue;
        }
        let statement_position = match i.checked_sub(1).map(|j| &tokens[j]) {
            None => true,
            Some(prev) => {
                if prev.kind == TokenKind::Punct && matches!(prev.text, "." | "?.") {
                    false
                } else if tok.newline_before {
                    true
                } else {
                    match prev.kind {
                        TokenKind::Punct => {
                            matches!(prev.text, ";" | "{" | "}" | "(" | ")" | "," | ":")
                        }
                        TokenKind::Ident => matches!(prev.text, "else" | "do"),
                        _ => false,
                    }
                }
            }
        };
        if statement_position {
            mods.replace(tok.start, tok.end, "var");
        }
    }
}

/// Collects probe, bracing, and sandbox-mirroring edits for the program.
pub(crate) fn collect_probe_modifications(stmts: &[Stmt], mods: &mut SourceModifications) {
    let mut collector = ProbeCollector { mods };
    for stmt in stmts {
        collector.walk_block_level(stmt, false);
    }
}

struct ProbeCollector<'m> {
    mods: &'m mut SourceModifications,
}

impl ProbeCollector<'_> {
    /// Handles a statement sitting directly in a block (or at top level):
    /// probe it, then descend.
    fn walk_block_level(&mut self, stmt: &Stmt, in_function: bool) {
        if should_probe(stmt) {
            let range = stmt.range();
            self.mods.insert(
                range.start,
                format!("__trace({}); ", range.line),
                TRACE_PROBE_PRIORITY,
            );
        }
        self.walk_children(stmt, in_function);
    }

    fn walk_children(&mut self, stmt: &Stmt, in_function: bool) {
        match stmt {
            Stmt::Block(block) => {
                for s in &block.stmts {
                    self.walk_block_level(s, in_function);
                }
            }
            Stmt::If(s) => {
                self.walk_body(&s.consequent, in_function);
                if let Some(alt) = &s.alternate {
                    self.walk_body(alt, in_function);
                }
            }
            Stmt::Loop(s) => {
                if let Some(decl) = &s.head_decl {
                    if !in_function {
                        self.mirror_for_head(s, decl);
                    }
                }
                self.walk_body(&s.body, in_function);
            }
            Stmt::Try(s) => {
                for block in &s.blocks {
                    for inner in &block.stmts {
                        self.walk_block_level(inner, in_function);
                    }
                }
            }
            Stmt::FunctionDecl(f) => {
                for inner in &f.body.stmts {
                    self.walk_block_level(inner, true);
                }
            }
            // The label and its statement share one probe.
            Stmt::Labeled(s) => self.walk_children(&s.body, in_function),
            Stmt::Declaration(d) => {
                if !in_function {
                    self.mirror_declaration(d);
                }
            }
            _ => {}
        }
    }

    /// A control-flow body: blockify single statements so probes are safe to
    /// inject, then treat the body as block-level.
    fn walk_body(&mut self, body: &Stmt, in_function: bool) {
        if !matches!(body, Stmt::Block(_)) {
            let range = body.range();
            self.mods.insert(range.start, "{ ", LEFT_BRACKET_PRIORITY);
            self.mods.insert(range.end, " }", RIGHT_BRACKET_PRIORITY);
        }
        self.walk_block_level(body, in_function);
    }

    /// Mirrors `var x = e` as `var x = (sandbox.x = e)`; an initializer-less
    /// declarator gets `= (sandbox.x = undefined)` appended. Pattern
    /// declarators have no single name and are left alone.
    fn mirror_declaration(&mut self, decl: &DeclarationStmt) {
        for declarator in &decl.declarators {
            let Some(name) = &declarator.name else { continue };
            match &declarator.init {
                Some(init) => {
                    self.mods.insert(
                        init.start,
                        format!("(sandbox.{name} = "),
                        MIRROR_OPEN_PRIORITY,
                    );
                    self.mods.insert(init.end, ")", MIRROR_CLOSE_PRIORITY);
                }
                None => {
                    self.mods.insert(
                        declarator.name_range.end,
                        format!(" = (sandbox.{name} = undefined)"),
                        MIRROR_CLOSE_PRIORITY,
                    );
                }
            }
        }
    }

    /// For-head declarations. Classic `for` heads are mirrored in place; the
    /// bindings of `for-in`/`for-of` are seeded onto the sandbox before the
    /// loop so the per-iteration assignments resolve to it.
    fn mirror_for_head(&mut self, stmt: &LoopStmt, decl: &DeclarationStmt) {
        match stmt.kind {
            LoopKind::For => self.mirror_declaration(decl),
            LoopKind::ForIn | LoopKind::ForOf => {
                for declarator in &decl.declarators {
                    let Some(name) = &declarator.name else { continue };
                    self.mods.insert(
                        stmt.range.start,
                        format!("sandbox.{name} = undefined; "),
                        SEED_PRIORITY,
                    );
                }
            }
            _ => {}
        }
    }
}

fn should_probe(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Block(_) | Stmt::Empty(_) => false,
        Stmt::Expression(e) => !e.is_trace_call,
        _ => true,
    }
}
