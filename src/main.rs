use clap::Parser;
use sizefit::cli::{Cli, Commands, ConfigAction};
use sizefit::config::{validate_config_object, Config};
use sizefit::logging;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(opts) => {
            let mut config = Config::load(opts.config.as_deref())?;
            if let Some(token) = opts.token.as_deref() {
                config.telegram.apply_token(token);
            }
            logging::try_init(&config.logging)?;
            validate_config_object(&config)?;
            info!("Starting sizefit {}", env!("CARGO_PKG_VERSION"));
            sizefit::channels::run_telegram(&config).await?;
        }
        Commands::Convert(opts) => {
            let config = Config::load(opts.config.as_deref())?;
            logging::try_init(&config.logging)?;
            validate_config_object(&config)?;
            let written = sizefit::cli::run_convert(&config, &opts)?;
            println!("{}", written.display());
        }
        Commands::Config(opts) => match opts.action {
            ConfigAction::Show => {
                let mut config = Config::load(opts.config.as_deref())?;
                if let Some(token) = config.telegram.bot_token.as_mut() {
                    *token = "<redacted>".to_string();
                }
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConfigAction::Validate => {
                let config = Config::load(opts.config.as_deref())?;
                logging::try_init(&config.logging)?;
                validate_config_object(&config)?;
                info!("Configuration is valid");
            }
            ConfigAction::Init => {
                let path = opts.config.as_deref().unwrap_or("sizefit.json");
                Config::write_default(path)?;
                println!("Configuration file created at {path}");
            }
        },
        Commands::Version => {
            println!("sizefit {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
