use smallsh::config::Args;
use smallsh::parser::Parser;
use smallsh::{Editor, Interpreter, logging};
use std::process::ExitCode;

fn run(args: Args) -> anyhow::Result<()> {
    logging::init(args.effective_log_level(), args.log_file.as_deref())?;

    let mut shell = Interpreter::default()
        .with_parser(Parser::for_current_process(args.max_words))
        .with_prompt(args.prompt);
    shell.state().mode.install()?;

    let mut editor = Editor::new(!args.no_history)?;
    shell.repl(&mut editor)
}

fn main() -> ExitCode {
    let args: Args = argh::from_env();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("smallsh: {e:#}");
            ExitCode::FAILURE
        }
    }
}
