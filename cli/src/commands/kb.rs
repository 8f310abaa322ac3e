use clap::Subcommand;

use crate::util::api_request;

#[derive(Subcommand)]
pub enum KbCommands {
    /// List loaded knowledge documents
    List,
    /// Print one knowledge document
    Get {
        /// Document name (alerts, fallback-data, reports, greetings, sensor-status)
        name: String,
    },
}

pub async fn run(api_url: &str, command: KbCommands, raw: bool) -> i32 {
    match command {
        KbCommands::List => api_request(api_url, reqwest::Method::GET, "/api/kb", None, raw).await,
        KbCommands::Get { name } => {
            let path = format!("/api/kb/{}", name.trim());
            api_request(api_url, reqwest::Method::GET, &path, None, raw).await
        }
    }
}

pub async fn greeting(api_url: &str, raw: bool) -> i32 {
    api_request(api_url, reqwest::Method::GET, "/api/greeting", None, raw).await
}

pub async fn risk_levels(api_url: &str, raw: bool) -> i32 {
    api_request(api_url, reqwest::Method::GET, "/api/flood-risk-levels", None, raw).await
}
