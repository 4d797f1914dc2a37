//! `spl completions SHELL`: print a shell completion script.

use std::io::Write;

use clap::{Args, Command};
use clap_complete::{Shell, generate};

/// Name completions are registered under.
const BIN_NAME: &str = "spl";

/// Arguments for `spl completions`.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script generation.
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Execute `spl completions`, writing the script to stdout.
pub fn run_completions(args: &CompletionsArgs, command: &mut Command) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_completions(args.shell, command, &mut out);
    out.flush()?;
    Ok(())
}

fn write_completions(shell: Shell, command: &mut Command, out: &mut dyn Write) {
    generate(shell, command, BIN_NAME, out);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Command {
        Command::new(BIN_NAME).subcommand(Command::new("timeline"))
    }

    #[test]
    fn bash_script_mentions_binary_and_subcommands() {
        let mut buf = Vec::new();
        write_completions(Shell::Bash, &mut sample(), &mut buf);
        let script = String::from_utf8(buf).unwrap();
        assert!(script.contains("spl"));
        assert!(script.contains("timeline"));
    }

    #[test]
    fn every_shell_produces_output() {
        for shell in [Shell::Bash, Shell::Zsh, Shell::Fish, Shell::PowerShell, Shell::Elvish] {
            let mut buf = Vec::new();
            write_completions(shell, &mut sample(), &mut buf);
            assert!(!buf.is_empty(), "{shell}");
        }
    }
}
