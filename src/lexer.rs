//! Lexical analysis (tokenization) of one interpreter input line.
//!
//! Words are separated by whitespace. The operators `<`, `>` and `&` are only
//! recognized when they stand alone; `a>b` is a single word.

/// Represents a token resulting from lexical analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A plain word: the program name, an argument or a redirection target.
    Word(String),
    /// Input redirection symbol, `<`.
    RedirectLeft,
    /// Output redirection symbol, `>`.
    RedirectRight,
    /// Background marker, `&`.
    Ampersand,
}

impl Token {
    fn classify(raw: &str) -> Self {
        match raw {
            "<" => Token::RedirectLeft,
            ">" => Token::RedirectRight,
            "&" => Token::Ampersand,
            word => Token::Word(word.to_owned()),
        }
    }
}

/// Splits `line` into tokens.
///
/// Returns an empty vector for a blank line.
pub fn split_into_tokens(line: &str) -> Vec<Token> {
    line.split_whitespace().map(Token::classify).collect()
}
