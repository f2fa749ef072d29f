// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Semantic tokenization of test output.
//!
//! Live output and stored baselines are split by the same rules so that they
//! can be compared token by token:
//!
//! - every `\n` is its own token
//! - other whitespace runs collapse into one token
//! - numbers (with an optional decimal part) are split from punctuation
//! - word runs (letters, digits, `_`) are split from punctuation runs
//!
//! Tokenization is pure: equal input always yields equal tokens, and
//! concatenating the token texts reproduces the input.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Word,
    Number,
    Punctuation,
    Whitespace,
    Newline,
    /// Produced by [`TokenCursor::advance`] once the text is exhausted.
    End,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Token {
    kind: TokenKind,
    text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn newline() -> Self {
        Self::new(TokenKind::Newline, "\n")
    }

    pub fn end() -> Self {
        Self::new(TokenKind::End, "")
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_newline(&self) -> bool {
        self.kind == TokenKind::Newline
    }

    pub fn is_end(&self) -> bool {
        self.kind == TokenKind::End
    }

    /// Length in characters, used for column bookkeeping.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_punctuation(c: char) -> bool {
    !c.is_whitespace() && !is_word_char(c)
}

/// Scan the token starting at byte offset `start`.
///
/// Returns the token kind and the byte offset one past its end.
fn scan(text: &str, start: usize) -> Option<(TokenKind, usize)> {
    let rest = &text[start..];
    let first = rest.chars().next()?;

    let run_end = |pred: &dyn Fn(char) -> bool| -> usize {
        rest.char_indices()
            .find(|(_, c)| !pred(*c))
            .map_or(rest.len(), |(i, _)| i)
    };

    let (kind, len) = if first == '\n' {
        (TokenKind::Newline, 1)
    } else if first.is_whitespace() {
        (
            TokenKind::Whitespace,
            run_end(&|c: char| c.is_whitespace() && c != '\n'),
        )
    } else if first.is_ascii_digit() {
        let mut len = run_end(&|c: char| c.is_ascii_digit());
        let mut tail = rest[len..].chars();
        if tail.next() == Some('.') && tail.next().is_some_and(|c| c.is_ascii_digit()) {
            let fraction = &rest[len + 1..];
            len += 1 + fraction
                .char_indices()
                .find(|(_, c)| !c.is_ascii_digit())
                .map_or(fraction.len(), |(i, _)| i);
        }
        (TokenKind::Number, len)
    } else if is_word_char(first) {
        (TokenKind::Word, run_end(&is_word_char))
    } else {
        (TokenKind::Punctuation, run_end(&is_punctuation))
    };

    Some((kind, start + len))
}

/// Lazy token iterator over borrowed text.
///
/// Cloning the tokenizer restarts iteration from the clone's position.
#[derive(Clone, Debug)]
pub struct Tokenizer<'a> {
    text: &'a str,
    at: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, at: 0 }
    }

    /// Rewind to the beginning of the text.
    pub fn restart(&mut self) {
        self.at = 0;
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let (kind, end) = scan(self.text, self.at)?;
        let token = Token::new(kind, &self.text[self.at..end]);
        self.at = end;
        Some(token)
    }
}

/// Tokenize a whole string.
pub fn tokenize(text: &str) -> Vec<Token> {
    Tokenizer::new(text).collect()
}

/// Owned token cursor with one token of lookahead.
///
/// The snapshot cursor keeps one of these per baseline line so the diff
/// engine can inspect the upcoming baseline token before consuming it.
#[derive(Clone, Debug)]
pub struct TokenCursor {
    text: String,
    at: usize,
}

impl TokenCursor {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            at: 0,
        }
    }

    /// The full text under the cursor.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn has_next(&self) -> bool {
        self.at < self.text.len()
    }

    /// Look at the next token without consuming it.
    pub fn peek(&self) -> Option<Token> {
        scan(&self.text, self.at).map(|(kind, end)| Token::new(kind, &self.text[self.at..end]))
    }

    /// Consume the next token, or return an `End` token once exhausted.
    pub fn advance(&mut self) -> Token {
        match scan(&self.text, self.at) {
            Some((kind, end)) => {
                let token = Token::new(kind, &self.text[self.at..end]);
                self.at = end;
                token
            }
            None => Token::end(),
        }
    }
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
