//! # SQL Tokenizer
//!
//! Splits statement text into tokens for the two-statement grammar. Strings
//! are single-quoted with no escape sequences; keywords are recognised
//! case-insensitively and normalised to upper case.

use crate::error::{Error, Result};

const KEYWORDS: [&str; 6] = ["SELECT", "INSERT", "INTO", "VALUES", "FROM", "WHERE"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Eof,
    Keyword,
    Identifier,
    Number,
    Str,
    Operator,
    Comma,
    Semicolon,
    LeftParen,
    RightParen,
    Star,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

pub struct Tokenizer {
    input: Vec<char>,
    pos: usize,
    tokens: Vec<Token>,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        while self.pos < self.input.len() {
            let ch = self.input[self.pos];

            if ch.is_whitespace() {
                self.pos += 1;
                continue;
            }
            if ch == '\'' {
                self.read_string()?;
                continue;
            }
            if ch.is_ascii_digit() {
                self.read_number();
                continue;
            }
            if ch.is_alphabetic() || ch == '_' {
                self.read_identifier_or_keyword();
                continue;
            }

            let token = match ch {
                '(' => Token::new(TokenKind::LeftParen, "("),
                ')' => Token::new(TokenKind::RightParen, ")"),
                ',' => Token::new(TokenKind::Comma, ","),
                ';' => Token::new(TokenKind::Semicolon, ";"),
                '=' => Token::new(TokenKind::Operator, "="),
                '*' => Token::new(TokenKind::Star, "*"),
                other => {
                    return Err(Error::Parse(format!(
                        "unexpected character '{other}' at position {}",
                        self.pos
                    )));
                }
            };
            self.tokens.push(token);
            self.pos += 1;
        }

        self.tokens.push(Token::new(TokenKind::Eof, ""));
        Ok(self.tokens)
    }

    fn read_string(&mut self) -> Result<()> {
        self.pos += 1; // opening quote
        let start = self.pos;

        while self.pos < self.input.len() && self.input[self.pos] != '\'' {
            self.pos += 1;
        }
        if self.pos >= self.input.len() {
            return Err(Error::Parse("unterminated string literal".to_owned()));
        }

        let text: String = self.input[start..self.pos].iter().collect();
        self.tokens.push(Token::new(TokenKind::Str, text));
        self.pos += 1; // closing quote
        Ok(())
    }

    fn read_number(&mut self) {
        let start = self.pos;
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        let text: String = self.input[start..self.pos].iter().collect();
        self.tokens.push(Token::new(TokenKind::Number, text));
    }

    fn read_identifier_or_keyword(&mut self) {
        let start = self.pos;
        while self.pos < self.input.len() {
            let ch = self.input[self.pos];
            if !ch.is_alphanumeric() && ch != '_' {
                break;
            }
            self.pos += 1;
        }

        let text: String = self.input[start..self.pos].iter().collect();
        let upper = text.to_uppercase();
        if KEYWORDS.contains(&upper.as_str()) {
            self.tokens.push(Token::new(TokenKind::Keyword, upper));
        } else {
            self.tokens.push(Token::new(TokenKind::Identifier, text));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Tokenizer::new(input)
            .tokenize()
            .unwrap()
            .iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn tokenizes_an_insert_statement() {
        let tokens = Tokenizer::new("INSERT INTO kv VALUES (100, 'Naruto');")
            .tokenize()
            .unwrap();

        let expected = [
            (TokenKind::Keyword, "INSERT"),
            (TokenKind::Keyword, "INTO"),
            (TokenKind::Identifier, "kv"),
            (TokenKind::Keyword, "VALUES"),
            (TokenKind::LeftParen, "("),
            (TokenKind::Number, "100"),
            (TokenKind::Comma, ","),
            (TokenKind::Str, "Naruto"),
            (TokenKind::RightParen, ")"),
            (TokenKind::Semicolon, ";"),
            (TokenKind::Eof, ""),
        ];
        assert_eq!(tokens.len(), expected.len());
        for (token, (kind, text)) in tokens.iter().zip(expected) {
            assert_eq!(token.kind, kind);
            assert_eq!(token.text, text);
        }
    }

    #[test]
    fn tokenizes_a_select_statement() {
        assert_eq!(
            kinds("SELECT * FROM kv WHERE key = 42;"),
            vec![
                TokenKind::Keyword,
                TokenKind::Star,
                TokenKind::Keyword,
                TokenKind::Identifier,
                TokenKind::Keyword,
                TokenKind::Identifier,
                TokenKind::Operator,
                TokenKind::Number,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let tokens = Tokenizer::new("select Insert").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Keyword);
        assert_eq!(tokens[0].text, "SELECT");
        assert_eq!(tokens[1].kind, TokenKind::Keyword);
        assert_eq!(tokens[1].text, "INSERT");
    }

    #[test]
    fn string_keeps_inner_spacing_and_case() {
        let tokens = Tokenizer::new("'Hello World'").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(tokens[0].text, "Hello World");
    }

    #[test]
    fn empty_string_literal_is_a_token() {
        let tokens = Tokenizer::new("''").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(tokens[0].text, "");
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let result = Tokenizer::new("'oops").tokenize();
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn unexpected_character_is_an_error() {
        let result = Tokenizer::new("SELECT ? FROM kv").tokenize();
        assert!(matches!(result, Err(Error::Parse(_))));
    }
}
