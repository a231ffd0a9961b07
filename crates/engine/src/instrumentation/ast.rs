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

//! Statement-level AST used by the instrumenter.
//!
//! The instrumenter only needs statement boundaries, declaration shapes, and
//! bodies of control flow; expressions are carried as opaque spans of the
//! original source.

/// A byte span in the original source plus the 1-based line it starts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRange {
    pub start: usize,
    pub end: usize,
    pub line: u32,
}

/// A statement as seen by the instrumenter.
#[derive(Debug)]
pub enum Stmt {
    Block(Block),
    If(IfStmt),
    Loop(LoopStmt),
    Switch(SwitchStmt),
    Try(TryStmt),
    Jump(JumpStmt),
    Declaration(DeclarationStmt),
    FunctionDecl(FunctionDecl),
    ClassDecl(ClassDecl),
    Labeled(LabeledStmt),
    Expression(ExpressionStmt),
    Empty(SourceRange),
}

impl Stmt {
    pub fn range(&self) -> SourceRange {
        match self {
            Stmt::Block(b) => b.range,
            Stmt::If(s) => s.range,
            Stmt::Loop(s) => s.range,
            Stmt::Switch(s) => s.range,
            Stmt::Try(s) => s.range,
            Stmt::Jump(s) => s.range,
            Stmt::Declaration(s) => s.range,
            Stmt::FunctionDecl(s) => s.range,
            Stmt::ClassDecl(s) => s.range,
            Stmt::Labeled(s) => s.range,
            Stmt::Expression(s) => s.range,
            Stmt::Empty(range) => *range,
        }
    }
}

/// `{ ... }` with its contained statements.
#[derive(Debug)]
pub struct Block {
    pub range: SourceRange,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug)]
pub struct IfStmt {
    pub range: SourceRange,
    pub consequent: Box<Stmt>,
    pub alternate: Option<Box<Stmt>>,
}

/// Which looping construct produced a [`LoopStmt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    For,
    ForIn,
    ForOf,
    While,
    DoWhile,
}

#[derive(Debug)]
pub struct LoopStmt {
    pub range: SourceRange,
    pub kind: LoopKind,
    /// Declaration in a `for` head, e.g. `for (let i = 0; ...)`.
    pub head_decl: Option<DeclarationStmt>,
    pub body: Box<Stmt>,
}

/// `switch` statements are consumed as opaque regions; declarations inside
/// them are still rewritten by the token-level pass.
#[derive(Debug)]
pub struct SwitchStmt {
    pub range: SourceRange,
}

#[derive(Debug)]
pub struct TryStmt {
    pub range: SourceRange,
    /// The try block followed by any catch and finally blocks.
    pub blocks: Vec<Block>,
}

/// `return`, `throw`, `break`, or `continue`.
#[derive(Debug)]
pub struct JumpStmt {
    pub range: SourceRange,
}

/// Declaration keyword kind as written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Var,
    Let,
    Const,
}

#[derive(Debug)]
pub struct DeclarationStmt {
    pub range: SourceRange,
    pub kind: DeclKind,
    pub declarators: Vec<Declarator>,
}

/// One `name = init` unit of a declaration. Destructuring patterns are
/// carried without a name and are left untouched by the sandbox mirroring.
#[derive(Debug)]
pub struct Declarator {
    pub name: Option<String>,
    pub name_range: SourceRange,
    pub init: Option<SourceRange>,
}

#[derive(Debug)]
pub struct FunctionDecl {
    pub range: SourceRange,
    pub body: Block,
}

/// Class bodies are consumed as opaque regions.
#[derive(Debug)]
pub struct ClassDecl {
    pub range: SourceRange,
}

#[derive(Debug)]
pub struct LabeledStmt {
    pub range: SourceRange,
    pub body: Box<Stmt>,
}

#[derive(Debug)]
pub struct ExpressionStmt {
    pub range: SourceRange,
    /// Whether this statement is already a `__trace(...)` probe.
    pub is_trace_call: bool,
}
