use crate::command::{Classification, Command};
use crate::error::{ParseError, Stream};
use crate::expand::expand;
use crate::lexer::{self, Token};
use log::debug;

/// Word limit used when none is configured.
pub const DEFAULT_MAX_WORDS: usize = 512;

/// Turns one line of input into a [`Command`].
///
/// The parser owns the two pieces of context parsing depends on: the pid used
/// for `$$` expansion and the maximum number of words a command may carry.
#[derive(Debug, Clone)]
pub struct Parser {
    pid: u32,
    max_words: usize,
}

impl Parser {
    pub fn new(pid: u32, max_words: usize) -> Self {
        Self { pid, max_words }
    }

    /// Parser expanding `$$` to the current process id.
    pub fn for_current_process(max_words: usize) -> Self {
        Self::new(std::process::id(), max_words)
    }

    /// Parse a single line.
    ///
    /// A line starting with `#` is a comment and is not tokenized. A line with
    /// no tokens, or with only operators, is empty. A redirection operator
    /// left dangling at the end of the line leaves its path unset.
    pub fn parse(&self, line: &str) -> Result<Command, ParseError> {
        if line.starts_with('#') {
            return Ok(Command::comment());
        }

        let tokens = lexer::split_into_tokens(line);
        let last = tokens.len().saturating_sub(1);
        let mut command = Command::normal();
        let mut pending: Option<Stream> = None;

        for (i, token) in tokens.iter().enumerate() {
            let value = match token {
                Token::RedirectLeft => {
                    pending = Some(Stream::Input);
                    continue;
                }
                Token::RedirectRight => {
                    pending = Some(Stream::Output);
                    continue;
                }
                Token::Ampersand if i == last => {
                    command.background = true;
                    continue;
                }
                // A `&` anywhere else is an ordinary word.
                other => expand(other.as_str(), self.pid).into_owned(),
            };

            match pending.take() {
                Some(Stream::Input) => command.input_path = Some(value),
                Some(Stream::Output) => command.output_path = Some(value),
                None => {
                    if command.words.len() == self.max_words {
                        return Err(ParseError::ArgumentOverflow {
                            limit: self.max_words,
                        });
                    }
                    command.words.push(value);
                }
            }
        }

        if command.words.is_empty() {
            command.classification = Classification::Empty;
        }
        debug!("parsed {:?}", command);
        Ok(command)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::for_current_process(DEFAULT_MAX_WORDS)
    }
}
