use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde_json::Value;

use storefront_gate::security::signature::SIGNATURE_HEADER;
use storefront_gate::security::{TokenAuthenticator, WebhookVerifier};

#[derive(Parser)]
#[command(name = "gate-cli")]
#[command(about = "Operator CLI for the storefront gate", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the webhook signature of a payload file
    Sign {
        file: PathBuf,
        #[arg(long, env = "WEBHOOK_SECRET", hide_env_values = true)]
        secret: String,
    },
    /// Mint a bearer token
    Token {
        #[arg(long)]
        sub: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "customer")]
        role: String,
        #[arg(long, default_value_t = 86_400)]
        ttl: u64,
        #[arg(long, env = "JWT_KEY", hide_env_values = true)]
        key: String,
    },
    /// Post a signed payload to a webhook endpoint
    Send {
        file: PathBuf,
        #[arg(short, long, default_value = "http://localhost:3001/webhooks/payments")]
        url: String,
        #[arg(long, env = "WEBHOOK_SECRET", hide_env_values = true)]
        secret: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sign { file, secret } => {
            let body = std::fs::read(&file)?;
            let verifier = WebhookVerifier::new(secret.as_bytes());
            println!("{}", verifier.sign_hex(&body));
        }
        Commands::Token { sub, email, role, ttl, key } => {
            let tokens = TokenAuthenticator::new(key.as_bytes(), ttl, 0);
            println!("{}", tokens.issue(&sub, &email, &role)?);
        }
        Commands::Send { file, url, secret } => {
            let body = std::fs::read(&file)?;
            let verifier = WebhookVerifier::new(secret.as_bytes());
            let signature = verifier.sign_hex(&body);

            let res = reqwest::Client::new()
                .post(&url)
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .header(SIGNATURE_HEADER, signature)
                .body(body)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: gate returned status {}", status);
        eprintln!("Response: {}", text);
        return Ok(());
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
