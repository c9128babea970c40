//! # Statement Executor
//!
//! Runs parsed statements against the engine. The only table is `kv`.
//! Hits format as `"<key> | <value>"`; inserts answer `"OK"`; a missing key
//! surfaces as `NotFound`.

use crate::database::Database;
use crate::error::{Error, Result};

use super::parser::{Parser, Statement};
use super::tokenizer::Tokenizer;

const KV_TABLE: &str = "kv";

pub fn execute(db: &mut Database, stmt: &Statement) -> Result<String> {
    match stmt {
        Statement::Select { table, key } => {
            check_table(table)?;
            match db.get(*key)? {
                Some(value) => Ok(format!("{key} | {value}")),
                None => Err(Error::NotFound(*key)),
            }
        }
        Statement::Insert { table, key, value } => {
            check_table(table)?;
            db.put(*key, value)?;
            Ok("OK".to_owned())
        }
    }
}

/// Tokenize, parse, execute.
pub fn parse_and_execute(db: &mut Database, input: &str) -> Result<String> {
    let tokens = Tokenizer::new(input).tokenize()?;
    let stmt = Parser::new(tokens).parse()?;
    execute(db, &stmt)
}

fn check_table(table: &str) -> Result<()> {
    if table != KV_TABLE {
        return Err(Error::Parse(format!(
            "table '{table}' not found (only '{KV_TABLE}' is supported)"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_db(dir: &tempfile::TempDir) -> Database {
        Database::open(dir.path().join("kv")).unwrap()
    }

    #[test]
    fn insert_then_select_formats_key_and_value() {
        let dir = tempdir().unwrap();
        let mut db = open_db(&dir);

        let result = parse_and_execute(&mut db, "INSERT INTO kv VALUES (100, 'Naruto');").unwrap();
        assert_eq!(result, "OK");

        let result = parse_and_execute(&mut db, "SELECT * FROM kv WHERE key = 100;").unwrap();
        assert_eq!(result, "100 | Naruto");
    }

    #[test]
    fn select_of_missing_key_is_not_found() {
        let dir = tempdir().unwrap();
        let mut db = open_db(&dir);

        let result = parse_and_execute(&mut db, "SELECT * FROM kv WHERE key = 5;");
        assert!(matches!(result, Err(Error::NotFound(5))));
    }

    #[test]
    fn unknown_table_is_rejected() {
        let dir = tempdir().unwrap();
        let mut db = open_db(&dir);

        let result = parse_and_execute(&mut db, "SELECT * FROM users WHERE key = 1;");
        assert!(matches!(result, Err(Error::Parse(_))));

        let result = parse_and_execute(&mut db, "INSERT INTO users VALUES (1, 'x');");
        assert!(matches!(result, Err(Error::Parse(_))));
    }
}
