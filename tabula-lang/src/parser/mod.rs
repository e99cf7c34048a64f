//! Parser for the analysis dialect

mod ast;
#[allow(clippy::module_inception)]
mod parser;

pub use ast::{
    BinOp, BoolOpKind, CmpOp, Expr, ExprKind, ImportItem, Index, ParseError, Program, Stmt,
    StmtKind, UnaryOp,
};
pub use parser::Parser;
