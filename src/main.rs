mod ai;
mod cli;
mod config;
mod daemon;
mod db;
mod error;
mod export;
mod extract;
mod fallback;
mod generate;
mod models;
mod pipeline;
mod server;
mod store;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::AsyncReadExt;
use tracing::info;

use crate::cli::{Cli, Commands};
use crate::config::{Config, load_config, validate_config};
use crate::export::ExportFormat;
use crate::generate::ScriptGenerator;
use crate::models::{ContentInput, GenerationOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config).with_context(|| format!("loading config from {}", cli.config.display()))?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.podscript.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!(config_path = %cli.config.display(), "config loaded");

    validate_config(&config).context("config validation failed")?;
    info!("config validated successfully");

    match cli.command {
        Some(Commands::Validate) => {
            println!("Configuration is valid.");
        }
        Some(Commands::Fetch { url, json }) => {
            let client = daemon::fetch_client(&config)?;
            let fetched = extract::fetch_article(&client, &url).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&fetched)?);
            } else {
                println!("{}\n({} words)\n\n{}", fetched.title, fetched.word_count, fetched.content);
            }
        }
        Some(Commands::Generate {
            url,
            file,
            style,
            duration,
            show_name,
            format,
            output,
            offline,
        }) => {
            let input = match (url, file) {
                (Some(url), _) => {
                    let client = daemon::fetch_client(&config)?;
                    let fetched = extract::fetch_article(&client, &url).await?;
                    ContentInput::from_fetched(&url, fetched)
                }
                (None, Some(path)) => {
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading content from {}", path.display()))?;
                    ContentInput::from_text(text)
                }
                (None, None) => {
                    let mut text = String::new();
                    tokio::io::stdin()
                        .read_to_string(&mut text)
                        .await
                        .context("reading content from stdin")?;
                    ContentInput::from_text(text)
                }
            };

            let generator = if offline {
                ScriptGenerator::offline()
            } else {
                ScriptGenerator::from_config(&config.ai).context("configuring AI providers")?
            };
            let options = GenerationOptions::from_raw(Some(&style), Some(&duration), show_name.as_deref());

            let pool = db::create_pool(&config).await.context("creating database")?;
            let script = pipeline::create_script(&pool, &generator, input, options, config.timezone()).await?;
            pool.close().await;

            let rendered = export::render(&script, format)?;
            write_output(&rendered, output.as_deref())?;
            eprintln!("Script {} saved ({} generator).", script.id, script.source.as_str());
        }
        Some(Commands::List { limit }) => {
            let pool = db::create_pool(&config).await.context("creating database")?;
            let scripts = store::list_scripts(&pool, limit.max(1)).await?;
            if scripts.is_empty() {
                println!("No scripts stored yet.");
            }
            for script in &scripts {
                println!(
                    "{}  {}  {:<14} {:<6} {:<8}  {}",
                    script.id,
                    script.created_at.with_timezone(&config.timezone()).format("%Y-%m-%d %H:%M"),
                    script.podcast_style.as_str(),
                    script.target_duration.as_str(),
                    script.source.as_str(),
                    script.title
                );
            }
            pool.close().await;
        }
        Some(Commands::Export { id, format, output }) => {
            export_stored(&config, &id, format, output.as_deref()).await?;
        }
        Some(Commands::Serve) | None => {
            daemon::run(config).await?;
        }
    }

    Ok(())
}

async fn export_stored(config: &Config, id: &str, format: ExportFormat, output: Option<&Path>) -> Result<()> {
    let pool = db::create_pool(config).await.context("creating database")?;
    let script = store::get_script(&pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no script with id '{id}'"))?;
    pool.close().await;

    let rendered = export::render(&script, format)?;
    write_output(&rendered, output)
}

fn write_output(rendered: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, rendered).with_context(|| format!("writing output to {}", path.display()))?;
            info!(path = %path.display(), "wrote script");
            println!("Script written to: {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}
