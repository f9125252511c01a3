// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Command-line tokenizer using logos.
//!
//! Words are runs of anything but whitespace and the operators `|`, `>`,
//! `>>`. Operators split words even without surrounding spaces, so
//! `ls>out` is three tokens. No quoting or escaping.

use logos::Logos;

/// Raw token type for logos - word text is copied in a second pass.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum RawToken {
    #[token("|")]
    Pipe,
    #[token(">>")]
    Append,
    #[token(">")]
    Truncate,
    #[regex(r"[^ \t\r\n\f|>]+")]
    Word,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(String),
    Pipe,
    /// `>`
    Truncate,
    /// `>>`
    Append,
}

/// Split one input line into tokens.
pub fn tokenize(line: &str) -> Vec<Token> {
    let mut lexer = RawToken::lexer(line);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let token = match result {
            Ok(RawToken::Pipe) => Token::Pipe,
            Ok(RawToken::Append) => Token::Append,
            Ok(RawToken::Truncate) => Token::Truncate,
            // Anything logos cannot classify is kept as a literal word.
            Ok(RawToken::Word) | Err(()) => Token::Word(lexer.slice().to_string()),
        };
        tokens.push(token);
    }
    tokens
}
