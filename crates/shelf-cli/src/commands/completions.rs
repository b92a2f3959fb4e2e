use std::io::{self, Write};
use std::path::Path;

use clap::CommandFactory;
use clap_complete::{generate, shells};

use crate::cli::{Cli, CompletionShell};
use crate::error::CliError;

pub fn run_completions(shell: CompletionShell, output_path: Option<&Path>) -> Result<(), CliError> {
    let mut command = Cli::command();
    let mut script = Vec::new();
    match shell {
        CompletionShell::Bash => generate(shells::Bash, &mut command, "shelf", &mut script),
        CompletionShell::Zsh => generate(shells::Zsh, &mut command, "shelf", &mut script),
        CompletionShell::Fish => generate(shells::Fish, &mut command, "shelf", &mut script),
    }

    match output_path {
        Some(path) => {
            std::fs::write(path, &script)?;
            println!("{}", path.display());
        }
        None => io::stdout().write_all(&script)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_a_bash_script_to_the_given_path() {
        let path = std::env::temp_dir().join(format!(
            "shelf-completions-test-{}.bash",
            std::process::id()
        ));

        run_completions(CompletionShell::Bash, Some(&path)).unwrap();

        let script = std::fs::read_to_string(&path).unwrap();
        assert!(script.contains("_shelf()"));
        assert!(script.contains("complete -F _shelf"));

        let _ = std::fs::remove_file(path);
    }
}
