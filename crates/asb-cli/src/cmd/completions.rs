//! Completions command

use clap::CommandFactory;
use clap_complete::generate;

/// Write shell completions for `asb` to stdout.
pub fn completions(shell: clap_complete::Shell) {
    let mut cmd = crate::Cli::command();
    generate(shell, &mut cmd, "asb", &mut std::io::stdout());
}
