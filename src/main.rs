//! probe-payload CLI entry point.

use probe_payload::cli::{self, Cli};
use probe_payload::core::Result;

fn main() -> Result<()> {
    // Parse command-line arguments
    let cli = Cli::parse_args();

    // Execute the command
    cli::execute(&cli)
}
