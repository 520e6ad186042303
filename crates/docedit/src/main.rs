use clap::Parser;

fn main() -> anyhow::Result<()> {
    docedit::init();

    let cli = docedit::cli::Cli::parse();
    cli.run()
}
