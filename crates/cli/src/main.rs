mod cli;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use futures::StreamExt;
use mediameta_core::{MediaKind, has_provider_support};
use mediameta_metadata::{MetadataError, ProviderOptions, create_provider};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(kind) = cli.kind.as_deref().and_then(|k| k.parse::<MediaKind>().ok()) {
        if !has_provider_support(&cli.provider, kind) {
            warn!(provider = %cli.provider, %kind, "provider does not serve this kind");
        }
    }

    let mut options = ProviderOptions::new().cache(!cli.no_cache);
    if let Some(key) = &cli.api_key {
        options = options.api_key(key);
    }
    if let Some(pin) = &cli.pin {
        options = options.pin(pin);
    }
    if let Some(language) = &cli.language {
        options = options.language(language);
    }

    let provider = create_provider(&cli.provider, options)
        .await
        .with_context(|| format!("failed to set up provider {}", cli.provider))?;

    let query = cli.search_query();
    debug!(?query, "searching");

    let mut results = provider.search(&query).take(cli.limit);
    while let Some(item) = results.next().await {
        match item {
            Ok(meta) if cli.json => {
                println!("{}", serde_json::to_string(&meta).context("failed to encode result")?);
            }
            Ok(meta) => println!("{meta}"),
            Err(MetadataError::NotFound) => {
                eprintln!("no results");
                return Ok(ExitCode::FAILURE);
            }
            Err(e) => return Err(e).context("search failed"),
        }
    }
    Ok(ExitCode::SUCCESS)
}
