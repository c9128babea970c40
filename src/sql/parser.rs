//! # SQL Parser
//!
//! Turns a token stream into one of the two supported statements:
//!
//! ```text
//! INSERT INTO <table> VALUES (<key>, '<value>');
//! SELECT * FROM <table> WHERE key = <key>;
//! ```
//!
//! The trailing semicolon is optional. Keys must fit in a `u32`.

use crate::error::{Error, Result};

use super::tokenizer::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Select { table: String, key: u32 },
    Insert { table: String, key: u32, value: String },
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse(mut self) -> Result<Statement> {
        let token = self.current().clone();
        if token.kind != TokenKind::Keyword {
            return Err(Error::Parse(format!(
                "expected a statement keyword, got '{}'",
                token.text
            )));
        }

        match token.text.as_str() {
            "SELECT" => self.parse_select(),
            "INSERT" => self.parse_insert(),
            other => Err(Error::Parse(format!("unsupported statement: {other}"))),
        }
    }

    fn parse_select(&mut self) -> Result<Statement> {
        self.expect(TokenKind::Keyword, "SELECT")?;
        self.expect(TokenKind::Star, "*")?;
        self.expect(TokenKind::Keyword, "FROM")?;

        let table = self.expect_identifier("table name")?;

        self.expect(TokenKind::Keyword, "WHERE")?;
        self.expect(TokenKind::Identifier, "key")?;
        self.expect(TokenKind::Operator, "=")?;

        let key = self.expect_key()?;
        self.skip_optional_semicolon();
        self.expect_end()?;

        Ok(Statement::Select { table, key })
    }

    fn parse_insert(&mut self) -> Result<Statement> {
        self.expect(TokenKind::Keyword, "INSERT")?;
        self.expect(TokenKind::Keyword, "INTO")?;

        let table = self.expect_identifier("table name")?;

        self.expect(TokenKind::Keyword, "VALUES")?;
        self.expect(TokenKind::LeftParen, "(")?;

        let key = self.expect_key()?;
        self.expect(TokenKind::Comma, ",")?;

        let value_token = self.current().clone();
        if value_token.kind != TokenKind::Str {
            return Err(Error::Parse(format!(
                "expected a quoted string value, got '{}'",
                value_token.text
            )));
        }
        self.advance();

        self.expect(TokenKind::RightParen, ")")?;
        self.skip_optional_semicolon();
        self.expect_end()?;

        Ok(Statement::Insert {
            table,
            key,
            value: value_token.text,
        })
    }

    fn current(&self) -> &Token {
        // tokenize() always terminates the stream with an Eof token
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn expect(&mut self, kind: TokenKind, text: &str) -> Result<()> {
        let token = self.current();
        if token.kind != kind || (!text.is_empty() && token.text != text) {
            return Err(Error::Parse(format!(
                "expected '{text}', got '{}'",
                token.text
            )));
        }
        self.advance();
        Ok(())
    }

    fn expect_identifier(&mut self, what: &str) -> Result<String> {
        let token = self.current();
        if token.kind != TokenKind::Identifier {
            return Err(Error::Parse(format!(
                "expected {what}, got '{}'",
                token.text
            )));
        }
        let text = token.text.clone();
        self.advance();
        Ok(text)
    }

    fn expect_key(&mut self) -> Result<u32> {
        let token = self.current();
        if token.kind != TokenKind::Number {
            return Err(Error::Parse(format!(
                "expected a numeric key, got '{}'",
                token.text
            )));
        }
        let key = token
            .text
            .parse::<u32>()
            .map_err(|e| Error::Parse(format!("invalid key '{}': {e}", token.text)))?;
        self.advance();
        Ok(key)
    }

    fn skip_optional_semicolon(&mut self) {
        if self.current().kind == TokenKind::Semicolon {
            self.advance();
        }
    }

    fn expect_end(&mut self) -> Result<()> {
        let token = self.current();
        if token.kind != TokenKind::Eof {
            return Err(Error::Parse(format!(
                "unexpected trailing input: '{}'",
                token.text
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::tokenizer::Tokenizer;

    fn parse(input: &str) -> Result<Statement> {
        Parser::new(Tokenizer::new(input).tokenize()?).parse()
    }

    #[test]
    fn parses_insert() {
        let stmt = parse("INSERT INTO kv VALUES (100, 'Naruto');").unwrap();
        assert_eq!(
            stmt,
            Statement::Insert {
                table: "kv".to_owned(),
                key: 100,
                value: "Naruto".to_owned(),
            }
        );
    }

    #[test]
    fn parses_select() {
        let stmt = parse("SELECT * FROM kv WHERE key = 100;").unwrap();
        assert_eq!(
            stmt,
            Statement::Select {
                table: "kv".to_owned(),
                key: 100,
            }
        );
    }

    #[test]
    fn semicolon_is_optional() {
        assert!(parse("SELECT * FROM kv WHERE key = 1").is_ok());
        assert!(parse("INSERT INTO kv VALUES (1, 'x')").is_ok());
    }

    #[test]
    fn key_must_fit_u32() {
        let result = parse("SELECT * FROM kv WHERE key = 99999999999;");
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn malformed_statements_fail() {
        for input in [
            "",
            "DELETE FROM kv WHERE key = 1;",
            "SELECT * FROM kv;",
            "SELECT key FROM kv WHERE key = 1;",
            "INSERT INTO kv VALUES (1);",
            "INSERT INTO kv VALUES ('x', 1);",
            "INSERT INTO kv VALUES (1, 'x') extra",
            "kv",
        ] {
            assert!(
                matches!(parse(input), Err(Error::Parse(_))),
                "should reject: {input}"
            );
        }
    }

    #[test]
    fn value_case_is_preserved() {
        let stmt = parse("insert into kv values (5, 'MiXeD CaSe')").unwrap();
        match stmt {
            Statement::Insert { value, .. } => assert_eq!(value, "MiXeD CaSe"),
            other => panic!("expected insert, got {other:?}"),
        }
    }
}
