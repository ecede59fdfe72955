use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Map, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Command line client for the edge gateway", long_about = None)]
struct Cli {
    /// Gateway base URL
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show gateway health and configured routes
    Health,
    /// Log in and print the issued token
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// Check whether a token is valid for a subject
    Validate {
        #[arg(short, long)]
        token: String,
        #[arg(short, long)]
        subject: String,
    },
    /// Update an account with a bearer token
    Update {
        id: u64,
        #[arg(short, long)]
        token: String,
        /// Subject named in the payload
        #[arg(short, long)]
        username: String,
        /// Extra fields as key=value, e.g. city=Springfield
        #[arg(short, long = "set", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{base}/health")).send().await?;
            print_response(res).await?;
        }
        Commands::Login { username, password } => {
            let res = client
                .post(format!("{base}/api/customers/login"))
                .json(&json!({ "username": username, "password": password }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Validate { token, subject } => {
            let res = client
                .post(format!("{base}/api/customers/validate"))
                .json(&json!({ "token": token, "subject": subject }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Update { id, token, username, fields } => {
            let mut headers = HeaderMap::new();
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);

            let mut body = Map::new();
            body.insert("username".into(), Value::String(username));
            for (key, value) in fields {
                body.insert(key, Value::String(value));
            }

            let res = client
                .post(format!("{base}/api/customers/{id}"))
                .headers(headers)
                .json(&body)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
