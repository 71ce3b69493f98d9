use clap::{Parser, Subcommand};
use convo::capability::Capabilities;
use convo::config::ConvoConfig;
use convo::{parse, Conversation, ConvoError, Evaluator, ExecutionContext, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a script and print its messages as JSON
    Parse { file: PathBuf },
    /// Evaluate a script, or call one of its functions
    Run {
        file: PathBuf,

        /// Function to call instead of flattening the messages
        #[arg(long)]
        call: Option<String>,

        /// JSON object of arguments for --call
        #[arg(long, default_value = "{}")]
        args: String,
    },
}

fn load_config(path: &Path) -> Result<ConvoConfig, ConvoError> {
    if path.exists() {
        ConvoConfig::from_file(path)
    } else {
        debug!("config {:?} not found, using defaults", path);
        Ok(ConvoConfig::default())
    }
}

fn read_script(path: &Path) -> Result<String, ConvoError> {
    std::fs::read_to_string(path)
        .map_err(|e| ConvoError::internal(format!("Failed to read script {:?}: {}", path, e)))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, ConvoError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ConvoError::internal(format!("Failed to serialize output: {}", e)))
}

async fn run(cli: &Cli) -> Result<(), ConvoError> {
    let config = load_config(&cli.config)?;
    info!("config loaded.");
    debug!("config: {:?}", config);

    match &cli.command {
        Command::Parse { file } => {
            let code = read_script(file)?;
            let result = parse(&code);
            if let Some(error) = &result.error {
                eprintln!("{}\n{}", error, error.near);
            }
            println!("{}", to_json(&result.messages)?);
            if let Some(error) = result.error {
                return Err(error.into());
            }
        }
        Command::Run { file, call, args } => {
            let code = read_script(file)?;
            let capabilities = Capabilities::from_config(&config.http)?;
            let ctx = ExecutionContext::with_capabilities(capabilities).with_config(config.eval);
            let mut conversation = Conversation::new(Evaluator::default(), ctx);
            conversation.append(&code)?;

            match call {
                Some(name) => {
                    let args: serde_json::Value = serde_json::from_str(args).map_err(|e| {
                        ConvoError::internal(format!("Failed to parse --args: {}", e))
                    })?;
                    let value = conversation
                        .call_function(name, Value::from_json(args))
                        .await?;
                    println!("{}", to_json(&value.to_json())?);
                }
                None => {
                    let messages = conversation.flatten().await?;
                    println!("{}", to_json(&messages)?);
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
