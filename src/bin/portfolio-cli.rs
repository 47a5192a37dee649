use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, ORIGIN};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "portfolio-cli")]
#[command(about = "Admin CLI for the portfolio API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080", env = "PORTFOLIO_URL")]
    url: String,

    /// Access token of an allowlisted admin.
    #[arg(short, long, env = "PORTFOLIO_TOKEN")]
    token: String,

    /// Origin sent with state-changing requests. Defaults to the API URL.
    #[arg(short, long)]
    origin: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show service status
    Status,
    /// List every post, drafts included
    Posts,
    /// Delete a post by id
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.token))?,
    );

    let res = match cli.command {
        Commands::Status => {
            client
                .get(format!("{base}/api/admin/status"))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Posts => {
            client
                .get(format!("{base}/api/admin/blog"))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Delete { id } => {
            let origin = cli.origin.as_deref().unwrap_or(base);
            headers.insert(ORIGIN, HeaderValue::from_str(origin)?);
            client
                .delete(format!("{base}/api/blog/{id}"))
                .headers(headers)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
