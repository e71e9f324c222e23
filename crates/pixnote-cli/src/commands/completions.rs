use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::aot::{generate, Generator, Shell};

use crate::cli::{Cli, CompletionShell};
use crate::error::CliError;

const BIN_NAME: &str = "pixnote";

impl From<CompletionShell> for Shell {
    fn from(shell: CompletionShell) -> Self {
        match shell {
            CompletionShell::Bash => Self::Bash,
            CompletionShell::Zsh => Self::Zsh,
            CompletionShell::Fish => Self::Fish,
        }
    }
}

/// Write the completion script to stdout, a file, or a directory (using the
/// shell's conventional file name, e.g. `_pixnote` for zsh).
pub fn run_completions(
    shell: CompletionShell,
    output_path: Option<&Path>,
) -> Result<Option<PathBuf>, CliError> {
    let shell = Shell::from(shell);
    let mut buffer = Vec::new();
    generate(shell, &mut Cli::command(), BIN_NAME, &mut buffer);

    let Some(path) = output_path else {
        io::stdout().write_all(&buffer)?;
        return Ok(None);
    };

    let path = if path.is_dir() {
        path.join(shell.file_name(BIN_NAME))
    } else {
        path.to_path_buf()
    };
    std::fs::write(&path, &buffer)?;
    println!("{}", path.display());
    Ok(Some(path))
}
