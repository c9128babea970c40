//! # Query Layer
//!
//! Two input dialects over the same engine:
//!
//! ```text
//! SQL:     INSERT INTO kv VALUES (100, 'Naruto');
//!          SELECT * FROM kv WHERE key = 100;
//! simple:  INSERT 100 Naruto
//!          SELECT 100
//! ```
//!
//! Input containing an SQL shape keyword (`INTO`, `FROM`, `WHERE`, `VALUES`)
//! routes through the tokenizer and parser; anything else is treated as the
//! simple whitespace-separated syntax. SQL selects format as
//! `"<key> | <value>"`; simple selects return the bare value.

pub mod executor;
pub mod parser;
pub mod tokenizer;

pub use parser::{Parser, Statement};
pub use tokenizer::{Token, TokenKind, Tokenizer};

use crate::database::Database;
use crate::error::{Error, Result};

/// Executes one line of input in whichever dialect it is written.
pub fn run(db: &mut Database, input: &str) -> Result<String> {
    let input = input.trim();
    let upper = input.to_uppercase();

    if upper.contains(" INTO ")
        || upper.contains(" FROM ")
        || upper.contains(" WHERE ")
        || upper.contains(" VALUES ")
    {
        return executor::parse_and_execute(db, input);
    }

    run_simple(db, input)
}

fn run_simple(db: &mut Database, input: &str) -> Result<String> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    if parts.is_empty() {
        return Err(Error::Parse("empty query".to_owned()));
    }

    match parts[0].to_uppercase().as_str() {
        "SELECT" => {
            if parts.len() != 2 {
                return Err(Error::Parse("SELECT syntax: SELECT <key>".to_owned()));
            }
            let key = parse_key(parts[1])?;
            match db.get(key)? {
                Some(value) => Ok(value),
                None => Err(Error::NotFound(key)),
            }
        }
        "INSERT" => {
            if parts.len() != 3 {
                return Err(Error::Parse(
                    "INSERT syntax: INSERT <key> <value>".to_owned(),
                ));
            }
            let key = parse_key(parts[1])?;
            db.put(key, parts[2])?;
            Ok("OK".to_owned())
        }
        other => Err(Error::Parse(format!("unsupported command: {other}"))),
    }
}

fn parse_key(text: &str) -> Result<u32> {
    text.parse::<u32>()
        .map_err(|e| Error::Parse(format!("invalid key '{text}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_db(dir: &tempfile::TempDir) -> Database {
        Database::open(dir.path().join("kv")).unwrap()
    }

    #[test]
    fn dispatches_sql_and_simple_syntax() {
        let dir = tempdir().unwrap();
        let mut db = open_db(&dir);

        assert_eq!(run(&mut db, "INSERT 1 simple").unwrap(), "OK");
        assert_eq!(
            run(&mut db, "INSERT INTO kv VALUES (2, 'sql')").unwrap(),
            "OK"
        );

        assert_eq!(run(&mut db, "SELECT 1").unwrap(), "simple");
        assert_eq!(
            run(&mut db, "SELECT * FROM kv WHERE key = 2").unwrap(),
            "2 | sql"
        );
    }

    #[test]
    fn simple_syntax_errors() {
        let dir = tempdir().unwrap();
        let mut db = open_db(&dir);

        assert!(matches!(run(&mut db, ""), Err(Error::Parse(_))));
        assert!(matches!(run(&mut db, "SELECT"), Err(Error::Parse(_))));
        assert!(matches!(
            run(&mut db, "INSERT 1 two three"),
            Err(Error::Parse(_))
        ));
        assert!(matches!(run(&mut db, "DROP 1"), Err(Error::Parse(_))));
        assert!(matches!(
            run(&mut db, "SELECT abc"),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn simple_select_of_missing_key_is_not_found() {
        let dir = tempdir().unwrap();
        let mut db = open_db(&dir);

        assert!(matches!(run(&mut db, "SELECT 404"), Err(Error::NotFound(404))));
    }
}
