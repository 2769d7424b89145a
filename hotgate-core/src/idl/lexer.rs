use super::{ParseError, Position};
use std::{iter::Peekable, str::Chars};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum TokenKind {
    Ident(String),
    Int(i64),
    Literal(String),
    Punct(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

const PUNCTUATION: &[char] = &['{', '}', '(', ')', ':', ',', ';', '*', '<', '>', '='];

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
}

/// Splits an IDL document into tokens, dropping whitespace and comments.
pub(super) fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = Lexer {
        chars: source.chars().peekable(),
        line: 1,
        column: 1,
    };

    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

impl Lexer<'_> {
    fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(&ch) = self.chars.peek() {
            if !predicate(ch) {
                break;
            }
            out.push(ch);
            self.bump();
        }
        out
    }

    fn skip_line(&mut self) {
        while let Some(ch) = self.bump() {
            if ch == '\n' {
                break;
            }
        }
    }

    fn skip_block_comment(&mut self, start: Position) -> Result<(), ParseError> {
        let mut previous = '\0';
        while let Some(ch) = self.bump() {
            if previous == '*' && ch == '/' {
                return Ok(());
            }
            previous = ch;
        }
        Err(ParseError::new("unterminated block comment", start))
    }

    /// Skips whitespace and comments. A lone `/` is an error.
    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match self.chars.peek() {
                Some(ch) if ch.is_whitespace() => {
                    self.bump();
                }
                Some('#') => self.skip_line(),
                Some('/') => {
                    let start = self.position();
                    self.bump();
                    match self.bump() {
                        Some('/') => self.skip_line(),
                        Some('*') => self.skip_block_comment(start)?,
                        _ => return Err(ParseError::new("unexpected character '/'", start)),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        self.skip_trivia()?;

        let position = self.position();
        let Some(&ch) = self.chars.peek() else {
            return Ok(None);
        };

        let kind = if ch.is_ascii_alphabetic() || ch == '_' {
            TokenKind::Ident(self.take_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.'))
        } else if ch.is_ascii_digit() || ch == '-' || ch == '+' {
            self.integer(position)?
        } else if ch == '"' || ch == '\'' {
            self.literal(position)?
        } else if PUNCTUATION.contains(&ch) {
            self.bump();
            TokenKind::Punct(ch)
        } else {
            return Err(ParseError::new(
                format!("unexpected character '{ch}'"),
                position,
            ));
        };

        Ok(Some(Token { kind, position }))
    }

    fn integer(&mut self, position: Position) -> Result<TokenKind, ParseError> {
        let mut text = String::new();
        if let Some(&sign @ ('-' | '+')) = self.chars.peek() {
            text.push(sign);
            self.bump();
        }
        let digits = self.take_while(|c| c.is_ascii_digit());
        if digits.is_empty() {
            return Err(ParseError::new("expected digits after sign", position));
        }
        text.push_str(&digits);

        text.parse::<i64>()
            .map(TokenKind::Int)
            .map_err(|_| ParseError::new(format!("integer '{text}' is out of range"), position))
    }

    fn literal(&mut self, position: Position) -> Result<TokenKind, ParseError> {
        let Some(quote) = self.bump() else {
            return Err(ParseError::new("expected string literal", position));
        };

        let mut out = String::new();
        loop {
            match self.bump() {
                Some(ch) if ch == quote => return Ok(TokenKind::Literal(out)),
                Some('\\') => match self.bump() {
                    Some(escaped) => out.push(escaped),
                    None => break,
                },
                Some(ch) => out.push(ch),
                None => break,
            }
        }
        Err(ParseError::new("unterminated string literal", position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn skips_every_comment_style() {
        let source = "// line\n# hash\n/* block\n spanning */ struct";
        assert_eq!(kinds(source), vec![TokenKind::Ident("struct".into())]);
    }

    #[test]
    fn reads_fields() {
        assert_eq!(
            kinds("1: string userId,"),
            vec![
                TokenKind::Int(1),
                TokenKind::Punct(':'),
                TokenKind::Ident("string".into()),
                TokenKind::Ident("userId".into()),
                TokenKind::Punct(','),
            ]
        );
    }

    #[test]
    fn tracks_positions() {
        let tokens = tokenize("struct\n  Request").unwrap();
        assert_eq!(tokens[1].position, Position { line: 2, column: 3 });
    }

    #[test]
    fn negative_integers_are_tokens() {
        assert_eq!(kinds("-3"), vec![TokenKind::Int(-3)]);
    }

    #[test]
    fn rejects_unterminated_comment() {
        let err = tokenize("struct /* never closed").unwrap_err();
        assert_eq!(err.message, "unterminated block comment");
        assert_eq!(err.position, Position { line: 1, column: 8 });
    }

    #[test]
    fn rejects_unknown_characters() {
        let err = tokenize("struct @").unwrap_err();
        assert_eq!(err.message, "unexpected character '@'");
    }

    #[test]
    fn reads_literals() {
        assert_eq!(
            kinds(r#"include "shared.thrift""#),
            vec![
                TokenKind::Ident("include".into()),
                TokenKind::Literal("shared.thrift".into()),
            ]
        );
    }
}
