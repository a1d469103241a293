use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "resilience-cli")]
#[command(about = "Operator CLI for CRM circuit breakers and workers", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long)]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Overall status: breaker summary and worker state
    Status,
    /// Inspect circuit breakers
    Breakers {
        #[command(subcommand)]
        action: BreakerCommand,
    },
    /// Inspect workers and their queues
    Workers {
        #[command(subcommand)]
        action: WorkerCommand,
    },
}

#[derive(Subcommand)]
enum BreakerCommand {
    /// Stats for every breaker
    List,
    /// Stats for one breaker
    Get { name: String },
    /// Force a breaker OPEN
    Open { name: String },
    /// Force a breaker CLOSED
    Close { name: String },
    /// Zero a breaker's counters
    Clear { name: String },
}

#[derive(Subcommand)]
enum WorkerCommand {
    /// Status and queue sizes per worker
    List,
    /// Empty a worker's failed queue
    ClearFailed { name: String },
}

enum Method {
    Get,
    Post,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let (method, path) = match cli.command {
        Commands::Status => (Method::Get, "/admin/status".to_string()),
        Commands::Breakers { action } => match action {
            BreakerCommand::List => (Method::Get, "/admin/breakers".to_string()),
            BreakerCommand::Get { name } => (Method::Get, format!("/admin/breakers/{name}")),
            BreakerCommand::Open { name } => (Method::Post, format!("/admin/breakers/{name}/open")),
            BreakerCommand::Close { name } => (Method::Post, format!("/admin/breakers/{name}/close")),
            BreakerCommand::Clear { name } => (Method::Post, format!("/admin/breakers/{name}/clear")),
        },
        Commands::Workers { action } => match action {
            WorkerCommand::List => (Method::Get, "/admin/workers".to_string()),
            WorkerCommand::ClearFailed { name } => {
                (Method::Post, format!("/admin/workers/{name}/failed/clear"))
            }
        },
    };

    let url = format!("{}{}", cli.url.trim_end_matches('/'), path);
    let request = match method {
        Method::Get => client.get(url),
        Method::Post => client.post(url),
    };
    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
