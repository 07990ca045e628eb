use std::io::{BufRead, Write};

use anyhow::Result;
use capacity_pipeline::{PipelineError, PredictionPipeline, Session};

use crate::cli::{features_help, format_prediction};

const PROMPT: &str = "mtest> ";

const HELP: &str = "\
Enter As, σ0.2, n, fc, b and d separated by spaces or commas to predict Mtest.
Commands:
  history         list the predictions made so far
  save <csv>      append the last prediction to a CSV file
  export <csv>    append the whole history to a CSV file, rows already
                  saved or exported are written again
  clear           forget the history
  features        describe the input features
  help            show this text
  quit            leave
";

enum Line<'a> {
    Empty,
    History,
    Save(&'a str),
    Export(&'a str),
    Clear,
    Features,
    Help,
    Quit,
    Values(Vec<&'a str>),
}

impl<'a> Line<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        let (cmd, arg) = match line.split_once(char::is_whitespace) {
            Some((cmd, arg)) => (cmd, arg.trim()),
            None => (line, ""),
        };

        match cmd {
            "" => Line::Empty,
            "history" => Line::History,
            "save" => Line::Save(arg),
            "export" => Line::Export(arg),
            "clear" => Line::Clear,
            "features" => Line::Features,
            "help" => Line::Help,
            "quit" | "exit" => Line::Quit,
            _ => Line::Values(
                line.split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
        }
    }
}

/// Runs the line-oriented form until `quit` or the end of `input`.
///
/// Input and model errors are reported and the user is prompted again, only I/O failures on
/// `output` end the loop early.
pub fn run<R: BufRead, W: Write>(
    pipeline: &PredictionPipeline,
    input: R,
    mut output: W,
) -> Result<()> {
    let mut session = Session::new(pipeline);
    write!(output, "{PROMPT}")?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;

        match Line::parse(&line) {
            Line::Empty => {}
            Line::Quit => break,
            Line::Help => write!(output, "{HELP}")?,
            Line::Features => write!(output, "{}", features_help())?,
            Line::History => {
                if session.history().is_empty() {
                    writeln!(output, "no predictions yet")?;
                }
                for (i, record) in session.history().iter().enumerate() {
                    writeln!(output, "{}. {record}", i + 1)?;
                }
            }
            Line::Clear => {
                session.clear_history();
                writeln!(output, "history cleared")?;
            }
            Line::Save("") | Line::Export("") => writeln!(output, "missing CSV path")?,
            Line::Save(path) => match session.save_last(path) {
                Ok(true) => writeln!(output, "saved to {path}")?,
                Ok(false) => writeln!(output, "nothing to save")?,
                Err(e) => writeln!(output, "error: {e}")?,
            },
            Line::Export(path) => match session.export(path) {
                Ok(n) => writeln!(output, "exported {n} prediction(s) to {path}")?,
                Err(e) => writeln!(output, "error: {e}")?,
            },
            Line::Values(values) => match session.predict(values.as_slice()) {
                Ok(record) => writeln!(output, "{}", format_prediction(&record))?,
                Err(e @ (PipelineError::Input(_) | PipelineError::Model(_))) => {
                    writeln!(output, "error: {e}")?
                }
                Err(e) => return Err(e.into()),
            },
        }

        write!(output, "{PROMPT}")?;
        output.flush()?;
    }

    writeln!(output)?;
    Ok(())
}
