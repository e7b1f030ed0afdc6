//! Interactive conflict resolution on the terminal.

use std::io::{self, BufRead, Write};

use rebisect::resolve::{Conflict, ConflictDecision, ConflictResolver};

const HELP: &str = "\
  c, continue  conflicts are resolved and staged; finish the operation
  s, stop      abort the operation and end the run
  d, drop      abort the operation and skip this patch
  ?, what      show the git error again";

/// Asks the operator on stdin/stdout.
pub struct TerminalResolver<R, W> {
    input: R,
    output: W,
}

impl TerminalResolver<io::StdinLock<'static>, io::Stdout> {
    #[must_use]
    pub fn stdio() -> Self {
        Self {
            input: io::stdin().lock(),
            output: io::stdout(),
        }
    }
}

impl<R: BufRead, W: Write> TerminalResolver<R, W> {
    #[must_use]
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, conflict: &Conflict) -> io::Result<ConflictDecision> {
        writeln!(self.output)?;
        write!(self.output, "{conflict}")?;
        if !conflict.message.is_empty() {
            writeln!(self.output, "{}", conflict.message)?;
        }
        if conflict.still_unresolved {
            writeln!(self.output, "Unresolved paths remain:")?;
            for entry in conflict.unresolved() {
                writeln!(self.output, "  {entry}")?;
            }
        }
        loop {
            write!(self.output, "Resolve in the worktree, then [c]ontinue, [s]top, [d]rop, [?]: ")?;
            self.output.flush()?;
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(ConflictDecision::Stop);
            }
            match parse_choice(&line) {
                Some(Choice::Decide(decision)) => return Ok(decision),
                Some(Choice::What) => writeln!(self.output, "{}", what(conflict))?,
                None => writeln!(self.output, "{HELP}")?,
            }
        }
    }
}

impl<R: BufRead, W: Write> ConflictResolver for TerminalResolver<R, W> {
    fn decide(&mut self, conflict: &Conflict) -> ConflictDecision {
        self.ask(conflict).unwrap_or_else(|e| {
            tracing::error!(error = %e, "terminal unavailable, stopping");
            ConflictDecision::Stop
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Choice {
    Decide(ConflictDecision),
    What,
}

fn parse_choice(line: &str) -> Option<Choice> {
    let decision = match line.trim().to_ascii_lowercase().as_str() {
        "c" | "continue" => ConflictDecision::Continue,
        "s" | "stop" => ConflictDecision::Stop,
        "d" | "drop" => ConflictDecision::Drop,
        "?" | "what" => return Some(Choice::What),
        _ => return None,
    };
    Some(Choice::Decide(decision))
}

fn what(conflict: &Conflict) -> &str {
    if conflict.message.trim().is_empty() {
        "git gave no error text"
    } else {
        conflict.message.trim_end()
    }
}
