//! Turns one input line into a [`Command`].
//!
//! Grammar: `argv... [< infile] [> outfile] [&]`. Redirections may appear
//! anywhere after the program name and the last one of each kind wins. `&`
//! requests a background run only when it is the final token; anywhere else it
//! is dropped and parsing continues.

use crate::command::Command;
use crate::config::ShellConfig;
use crate::expand::expand_pid;
use crate::lexer::{self, Token};
use std::path::PathBuf;

/// Lines whose first word starts with this are ignored.
pub const COMMENT_MARKER: char = '#';

/// Outcome of parsing a line that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// Blank line or comment: nothing to run, prompt again.
    Skip,
    Command(Command),
}

/// User input errors. The line is discarded and the interpreter re-prompts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParsingError {
    /// The raw line, newline included, is longer than the configured ceiling.
    #[error("Too many characters entered")]
    TooManyCharacters { len: usize, max: usize },
    /// The line holds as many items as the configured ceiling, or more.
    #[error("max args exceeded")]
    TooManyTokens { count: usize, max: usize },
    /// `<` or `>` is not followed by a file name.
    #[error("missing file name after `{0}`")]
    MissingRedirectTarget(&'static str),
    /// Only operators and redirections, no program to run.
    #[error("missing command name")]
    MissingCommand,
}

/// Parse one line of input.
///
/// `foreground_only` forces the resulting command into the foreground even if
/// the line ends with `&`. `pid` is substituted for every `$$` in each word,
/// redirection targets included.
pub fn parse_line(
    line: &str,
    config: &ShellConfig,
    foreground_only: bool,
    pid: &str,
) -> Result<ParsedLine, ParsingError> {
    if line.len() > config.max_line_len {
        return Err(ParsingError::TooManyCharacters {
            len: line.len(),
            max: config.max_line_len,
        });
    }
    let line = line.trim_end_matches(['\n', '\r']);

    let tokens = lexer::split_into_tokens(line);
    match tokens.first() {
        None => return Ok(ParsedLine::Skip),
        Some(Token::Word(first)) if first.starts_with(COMMENT_MARKER) => {
            return Ok(ParsedLine::Skip);
        }
        Some(_) => {}
    }

    let count = count_items(&tokens);
    if count >= config.max_tokens {
        return Err(ParsingError::TooManyTokens {
            count,
            max: config.max_tokens,
        });
    }

    let mut command = CommandBuilder::from(tokens, pid).build()?;
    if foreground_only {
        command.foreground = true;
    }
    Ok(ParsedLine::Command(command))
}

/// Number of items on the line: words and `&` count once each, a redirection
/// together with its target counts once.
fn count_items(tokens: &[Token]) -> usize {
    let mut count = 0;
    let mut iter = tokens.iter().peekable();
    while let Some(token) = iter.next() {
        if matches!(token, Token::RedirectLeft | Token::RedirectRight) {
            iter.next_if(|next| matches!(next, Token::Word(_)));
        }
        count += 1;
    }
    count
}

struct CommandBuilder<'a> {
    tokens: Vec<Token>,
    pos: usize,
    pid: &'a str,
}

impl<'a> CommandBuilder<'a> {
    fn from(tokens: Vec<Token>, pid: &'a str) -> Self {
        CommandBuilder {
            tokens,
            pos: 0,
            pid,
        }
    }

    fn build(mut self) -> Result<Command, ParsingError> {
        let mut argv = Vec::new();
        let mut input = None;
        let mut output = None;
        let mut background = false;

        while let Some(token) = self.next_token() {
            match token {
                Token::Word(word) => argv.push(expand_pid(&word, self.pid)),
                Token::RedirectLeft => input = Some(self.expect_target("<")?),
                Token::RedirectRight => output = Some(self.expect_target(">")?),
                Token::Ampersand => background = self.at_end(),
            }
        }

        if argv.is_empty() {
            return Err(ParsingError::MissingCommand);
        }

        let mut command = Command::new(argv);
        if let Some(path) = input {
            command.input = path;
        }
        if let Some(path) = output {
            command.output = path;
        }
        command.foreground = !background;
        Ok(command)
    }

    fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn expect_target(&mut self, operator: &'static str) -> Result<PathBuf, ParsingError> {
        match self.next_token() {
            Some(Token::Word(word)) => Ok(PathBuf::from(expand_pid(&word, self.pid))),
            _ => Err(ParsingError::MissingRedirectTarget(operator)),
        }
    }
}
