use tracing_subscriber::EnvFilter;

use vcbridge::cli::{self, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    let filter = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    cli::run(cli)
}
