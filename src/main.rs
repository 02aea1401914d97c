use clap::Parser;

use doudarr::cli::Cli;
use doudarr::config::ConfigLoader;
use doudarr::logger::init_logger;
use doudarr::server::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = ConfigLoader::new(cli.config.clone())?.load()?;
    cli.apply_overrides(&mut settings);

    init_logger(&settings.logger)?;

    Server::new(settings).run().await
}
