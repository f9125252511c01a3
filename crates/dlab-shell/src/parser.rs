// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Pipeline parser.
//!
//! Grammar: `stage ('|' stage)* [('>' | '>>') file]`, where a stage is one
//! or more words. The redirection applies to the last stage's output.

use std::path::PathBuf;

use thiserror::Error;

use crate::lexer::{tokenize, Token};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// Program followed by its arguments. Never empty.
    pub argv: Vec<String>,
}

impl Stage {
    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    Truncate,
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub path: PathBuf,
    pub mode: RedirectMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
    pub redirect: Option<Redirect>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("syntax error: missing command")]
    EmptyStage,
    #[error("syntax error: expected a file name after `{0}`")]
    MissingTarget(&'static str),
    #[error("syntax error: output redirection must end the command")]
    RedirectNotLast,
    #[error("syntax error: only one output redirection is allowed")]
    DuplicateRedirect,
}

/// Parse one input line. A blank line yields `None`.
pub fn parse_line(line: &str) -> Result<Option<Pipeline>, ParseError> {
    let tokens = tokenize(line);
    if tokens.is_empty() {
        return Ok(None);
    }

    let mut stages = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut redirect: Option<Redirect> = None;
    let mut tokens = tokens.into_iter();

    while let Some(token) = tokens.next() {
        if redirect.is_some() {
            return Err(match token {
                Token::Truncate | Token::Append => ParseError::DuplicateRedirect,
                _ => ParseError::RedirectNotLast,
            });
        }
        match token {
            Token::Word(word) => current.push(word),
            Token::Pipe => {
                if current.is_empty() {
                    return Err(ParseError::EmptyStage);
                }
                stages.push(Stage { argv: std::mem::take(&mut current) });
            }
            Token::Truncate | Token::Append => {
                let (mode, op) = match token {
                    Token::Append => (RedirectMode::Append, ">>"),
                    _ => (RedirectMode::Truncate, ">"),
                };
                match tokens.next() {
                    Some(Token::Word(path)) => {
                        redirect = Some(Redirect { path: PathBuf::from(path), mode });
                    }
                    _ => return Err(ParseError::MissingTarget(op)),
                }
            }
        }
    }

    if current.is_empty() {
        return Err(ParseError::EmptyStage);
    }
    stages.push(Stage { argv: current });
    Ok(Some(Pipeline { stages, redirect }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(stage: &Stage) -> Vec<&str> {
        stage.argv.iter().map(String::as_str).collect()
    }

    #[test]
    fn blank_line_is_nothing() {
        assert_eq!(parse_line("   \n"), Ok(None));
    }

    #[test]
    fn simple_command() {
        let p = parse_line("ls -la /tmp\n").unwrap().unwrap();
        assert_eq!(p.stages.len(), 1);
        assert_eq!(p.stages[0].program(), "ls");
        assert_eq!(p.stages[0].args(), ["-la".to_string(), "/tmp".to_string()]);
        assert_eq!(p.redirect, None);
    }

    #[test]
    fn pipeline_with_append() {
        let p = parse_line("cat log | grep err | sort >> out.txt").unwrap().unwrap();
        let stages: Vec<_> = p.stages.iter().map(argv).collect();
        assert_eq!(stages, vec![vec!["cat", "log"], vec!["grep", "err"], vec!["sort"]]);
        assert_eq!(
            p.redirect,
            Some(Redirect { path: PathBuf::from("out.txt"), mode: RedirectMode::Append })
        );
    }

    #[test]
    fn truncate_without_spaces() {
        let p = parse_line("echo hi>f").unwrap().unwrap();
        assert_eq!(argv(&p.stages[0]), vec!["echo", "hi"]);
        assert_eq!(p.redirect.unwrap().mode, RedirectMode::Truncate);
    }

    #[test]
    fn syntax_errors() {
        assert_eq!(parse_line("| wc"), Err(ParseError::EmptyStage));
        assert_eq!(parse_line("ls |"), Err(ParseError::EmptyStage));
        assert_eq!(parse_line("ls || wc"), Err(ParseError::EmptyStage));
        assert_eq!(parse_line("> out"), Err(ParseError::EmptyStage));
        assert_eq!(parse_line("ls >"), Err(ParseError::MissingTarget(">")));
        assert_eq!(parse_line("ls >> | wc"), Err(ParseError::MissingTarget(">>")));
        assert_eq!(parse_line("ls > a | wc"), Err(ParseError::RedirectNotLast));
        assert_eq!(parse_line("ls > a extra"), Err(ParseError::RedirectNotLast));
        assert_eq!(parse_line("ls > a >> b"), Err(ParseError::DuplicateRedirect));
    }
}
