//! TABULA Policy - The Policy Gate
//!
//! Decides whether a generated program is safe to execute, before any
//! execution attempt. The judgement is structural: the program is
//! walked as an AST against an explicit allowlist of constructs, never
//! matched as text. Violations are collected exhaustively so the
//! surfaced error can list every reason at once.
//!
//! The gate is pure and deterministic: same code text, same verdict,
//! always. Its only side effect is a structured denial log record.

pub mod allowlist;
mod validator;

pub use validator::Validator;
