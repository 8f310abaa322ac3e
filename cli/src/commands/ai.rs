use clap::Subcommand;

use crate::util::api_request;

#[derive(Subcommand)]
pub enum AiCommands {
    /// Show whether the generative backend is enabled and its quota failure count
    Status,
    /// Enable or disable the generative backend (resets the failure count)
    Toggle,
}

pub async fn run(api_url: &str, command: AiCommands, raw: bool) -> i32 {
    match command {
        AiCommands::Status => {
            api_request(api_url, reqwest::Method::GET, "/api/ai/status", None, raw).await
        }
        AiCommands::Toggle => {
            api_request(api_url, reqwest::Method::POST, "/api/ai/toggle", None, raw).await
        }
    }
}
