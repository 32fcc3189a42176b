use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = simp_passgen::cli::Cli::parse();
    cli.run()
}
