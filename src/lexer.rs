//! Lexical analysis for the shell's input line grammar.
//!
//! The grammar has no quoting: tokens are runs of non-whitespace characters.
//! Three tokens are operators when they stand alone, everything else is a word.

/// Represents a token resulting from lexical analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Any token that is not an operator. Still unexpanded.
    Word(String),
    /// Input redirection symbol, `<`.
    RedirectLeft,
    /// Output redirection symbol, `>`.
    RedirectRight,
    /// Background marker, `&`. Only meaningful as the last token of a line.
    Ampersand,
}

impl Token {
    fn classify(raw: &str) -> Self {
        match raw {
            "<" => Token::RedirectLeft,
            ">" => Token::RedirectRight,
            "&" => Token::Ampersand,
            word => Token::Word(word.to_string()),
        }
    }

    /// The literal text this token was lexed from.
    pub fn as_str(&self) -> &str {
        match self {
            Token::Word(word) => word,
            Token::RedirectLeft => "<",
            Token::RedirectRight => ">",
            Token::Ampersand => "&",
        }
    }
}

/// Split a line on runs of whitespace and classify each piece.
///
/// A trailing newline is just more whitespace, so `"ls\n"` and `"ls"` lex the same.
pub fn split_into_tokens(line: &str) -> Vec<Token> {
    line.split_whitespace().map(Token::classify).collect()
}
