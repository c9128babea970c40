//! Interactive shell: rustyline REPL plus dot commands.

pub mod commands;
pub mod repl;

pub use repl::Repl;
