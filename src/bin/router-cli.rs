use clap::{Parser, Subcommand};
use serde_json::Value;

use tcp_router::routing::{BackendHostInfo, MappingRequest};

#[derive(Parser)]
#[command(name = "router-cli")]
#[command(about = "Management CLI for the TCP router", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:9999")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map an external port to one or more backends
    Map {
        /// External port to expose
        #[arg(short, long)]
        port: u16,

        /// Backend as ADDRESS:PORT (repeatable)
        #[arg(short, long = "backend", required = true, value_parser = parse_backend)]
        backends: Vec<BackendHostInfo>,
    },
    /// List current port mappings
    List,
    /// Check router status
    Status,
}

fn parse_backend(s: &str) -> Result<BackendHostInfo, String> {
    let (address, port) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("expected ADDRESS:PORT, got {:?}", s))?;
    let port: u16 = port
        .parse()
        .map_err(|_| format!("invalid port in {:?}", s))?;
    // `[::1]:80` carries an IPv6 address; HAProxy wants it without brackets.
    let address = address
        .strip_prefix('[')
        .and_then(|a| a.strip_suffix(']'))
        .unwrap_or(address);
    if address.is_empty() {
        return Err(format!("missing address in {:?}", s));
    }
    Ok(BackendHostInfo::new(address, port))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let endpoint = format!("{}/v0/external_ports", cli.url);

    let res = match cli.command {
        Commands::Map { port, backends } => {
            let body = vec![MappingRequest::new(port, backends)];
            client.post(&endpoint).json(&body).send().await?
        }
        Commands::List => client.get(&endpoint).send().await?,
        Commands::Status => client.get(format!("{}/status", cli.url)).send().await?,
    };
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: router returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
