// SPDX-License-Identifier: MPL-2.0

mod animated;
mod app;
mod capture;
mod cli;
mod compose;
mod dispatch;
mod error;
mod geometry;
mod gpu;
mod orchestrator;
mod placement;
mod platform;
mod shade;
mod window;

#[cfg(test)]
mod testing;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use visitor_gag_config::Config;

use crate::{animated::is_gif_file, cli::Args};

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,visitor_gag=info,visitor_gag_config=info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let args = Args::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("config file error, falling back to defaults: {err}");
            Config::default()
        }
    };
    let config = args.apply(config);

    if let Some(path) = args.path.as_deref().filter(|path| !is_gif_file(path)) {
        tracing::warn!(path = %path.display(), "file does not look like a GIF, trying anyway");
    }

    platform::run(&config, args.path.clone())?;
    Ok(())
}
