//! # Interactive Shell
//!
//! Line-oriented loop over the engine. Dot commands are handled by
//! `commands`; everything else goes to the query layer. Errors are printed
//! and the loop continues; `exit`, `quit`, or Ctrl+D leave the shell after
//! closing the database.

use eyre::{Result, WrapErr};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::Database;

use super::commands;

const PROMPT: &str = "leafdb> ";

pub struct Repl {
    db: Database,
    editor: DefaultEditor,
}

impl Repl {
    pub fn new(db: Database) -> Result<Self> {
        let editor = DefaultEditor::new().wrap_err("failed to initialize line editor")?;
        Ok(Self { db, editor })
    }

    pub fn run(&mut self) -> Result<()> {
        println!("leafdb interactive shell");
        println!("Type '.help' for commands, 'exit' to quit");
        println!();

        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    if !self.handle_line(&line)? {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                }
                Err(ReadlineError::Eof) => {
                    break;
                }
                Err(err) => {
                    eprintln!("Error reading input: {err}");
                    break;
                }
            }
        }

        println!("Bye");
        self.db.close().wrap_err("failed to close database")
    }

    fn handle_line(&mut self, line: &str) -> Result<bool> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(true);
        }

        self.editor.add_history_entry(line).ok();

        if line == "exit" || line == "quit" {
            return Ok(false);
        }
        if line == "help" {
            return commands::execute(&mut self.db, ".help").map(|()| true);
        }
        if commands::is_command(line) {
            commands::execute(&mut self.db, line)?;
            return Ok(true);
        }

        match self.db.query(line) {
            Ok(result) => println!("{result}"),
            Err(err) => println!("Error: {err}"),
        }
        Ok(true)
    }
}
