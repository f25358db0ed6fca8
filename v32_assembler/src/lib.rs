//! Assembler front half for the V32 fantasy console: a line-oriented
//! tokenizer and the directive preprocessor that runs before parsing.
pub mod lexer;
pub mod preprocessor;
pub mod tokens;
