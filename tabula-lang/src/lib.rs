//! TABULA Lang - Analysis Dialect
//!
//! Lexer, AST, and recursive-descent parser for the restricted
//! Python-flavoured dialect the model is asked to emit. The grammar is
//! parsed in full - including constructs the policy gate always
//! refuses, such as `while` and `def` - so validation can judge
//! structure instead of matching substrings.

pub mod lexer;
pub mod parser;

pub use lexer::{Lexer, Span, Token, TokenKind};
pub use parser::{
    BinOp, BoolOpKind, CmpOp, Expr, ExprKind, ImportItem, Index, ParseError, Parser, Program,
    Stmt, StmtKind, UnaryOp,
};

/// Lex and parse a source text in one step.
pub fn parse_source(source: &str) -> Result<Program, ParseError> {
    let tokens = Lexer::new(source).tokenize();
    Parser::new(tokens).parse()
}

// ============================================================================
// TESTS
// ============================================================================
