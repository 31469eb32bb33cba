use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod cli;

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    cli::run(&args)?;
    Ok(())
}
