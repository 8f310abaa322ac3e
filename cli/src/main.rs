use clap::{Parser, Subcommand};

mod commands;
mod util;

use commands::ai::AiCommands;
use commands::kb::KbCommands;

#[derive(Parser)]
#[command(name = "floodsense", version, about = "Floodsense CLI: ask the flood monitoring assistant from the terminal")]
struct Cli {
    /// API base URL
    #[arg(long, env = "FLOODSENSE_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// Print compact JSON instead of pretty-printed output
    #[arg(long, global = true)]
    raw: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health
    Health,
    /// Ask the assistant a question
    Chat {
        /// The question, e.g. "what is the current water level?"
        message: String,
        /// JSON file with earlier turns ([{"role", "content"}]); use - for stdin
        #[arg(long)]
        context: Option<String>,
    },
    /// Request a flood risk analysis
    Analyze {
        /// JSON file with {"metrics": [...], "sensors": [...]}; use - for stdin
        #[arg(long)]
        data: Option<String>,
    },
    /// Generative backend availability
    Ai {
        #[command(subcommand)]
        command: AiCommands,
    },
    /// Knowledge base introspection
    Kb {
        #[command(subcommand)]
        command: KbCommands,
    },
    /// Print the greeting for the current time of day
    Greeting,
    /// Print the flood risk level table
    RiskLevels,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let api_url = cli.api_url.as_str();
    let raw = cli.raw;

    let code = match cli.command {
        Commands::Health => commands::health::run(api_url, raw).await,
        Commands::Chat { message, context } => {
            if message.trim().is_empty() {
                util::exit_error("message must not be empty", Some("floodsense chat \"is it safe to drive?\""));
            }
            commands::assistant::chat(api_url, &message, context.as_deref(), raw).await
        }
        Commands::Analyze { data } => commands::assistant::analyze(api_url, data.as_deref(), raw).await,
        Commands::Ai { command } => commands::ai::run(api_url, command, raw).await,
        Commands::Kb { command } => commands::kb::run(api_url, command, raw).await,
        Commands::Greeting => commands::kb::greeting(api_url, raw).await,
        Commands::RiskLevels => commands::kb::risk_levels(api_url, raw).await,
    };

    std::process::exit(code);
}
