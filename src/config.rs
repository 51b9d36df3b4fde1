use crate::interpreter::DEFAULT_PROMPT;
use crate::parser::DEFAULT_MAX_WORDS;
use argh::FromArgs;
use log::LevelFilter;
use std::path::PathBuf;

#[derive(FromArgs, Debug)]
/// A small interactive shell with background jobs and a foreground-only mode.
pub struct Args {
    #[argh(option, default = "DEFAULT_PROMPT.to_string()")]
    /// text printed before each line of input.
    pub prompt: String,

    #[argh(option, default = "DEFAULT_MAX_WORDS")]
    /// maximum number of words in one command.
    pub max_words: usize,

    #[argh(option, default = "LevelFilter::Off")]
    /// log level: off, error, warn, info, debug or trace.
    pub log_level: LevelFilter,

    #[argh(option)]
    /// write logs to this file instead of stderr.
    pub log_file: Option<PathBuf>,

    #[argh(switch)]
    /// do not keep a history of entered lines.
    pub no_history: bool,
}

impl Args {
    /// Level actually used: a log file with no explicit level logs at `info`.
    pub fn effective_log_level(&self) -> LevelFilter {
        match (&self.log_file, self.log_level) {
            (Some(_), LevelFilter::Off) => LevelFilter::Info,
            (_, level) => level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, argh::EarlyExit> {
        Args::from_args(&["smallsh"], args)
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.prompt, ": ");
        assert_eq!(args.max_words, 512);
        assert_eq!(args.log_level, LevelFilter::Off);
        assert_eq!(args.log_file, None);
        assert!(!args.no_history);
        assert_eq!(args.effective_log_level(), LevelFilter::Off);
    }

    #[test]
    fn test_overrides() {
        let args = parse(&[
            "--prompt",
            "$ ",
            "--max-words",
            "1024",
            "--log-level",
            "debug",
            "--no-history",
        ])
        .unwrap();
        assert_eq!(args.prompt, "$ ");
        assert_eq!(args.max_words, 1024);
        assert_eq!(args.effective_log_level(), LevelFilter::Debug);
        assert!(args.no_history);
    }

    #[test]
    fn test_log_file_implies_info() {
        let args = parse(&["--log-file", "/tmp/smallsh.log"]).unwrap();
        assert_eq!(args.effective_log_level(), LevelFilter::Info);
    }

    #[test]
    fn test_bad_level_is_rejected() {
        assert!(parse(&["--log-level", "loud"]).is_err());
    }
}
