use clap::{Parser, Subcommand};
use reqwest::{StatusCode, Url};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "control-cli")]
#[command(about = "Management CLI for the voice server control service", long_about = None)]
struct Cli {
    /// Base URL of the control API, including its path prefix.
    #[arg(short, long, default_value = "http://localhost:8080/api")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the service answers
    Ping,
    /// List cataloged features and their enablement
    List,
    /// Print the stored config of a feature
    Get { name: String },
    /// Replace the config of a feature with a JSON document
    Set { name: String, config: String },
    /// Enable a feature
    Enable { name: String },
    /// Disable a feature
    Disable { name: String },
    /// Ask the worker to reload a feature
    Reload { name: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = Url::parse(&cli.url)?;
    let base = &base;

    match cli.command {
        Commands::Ping => {
            let res = client.get(endpoint(base, &[""])?).send().await?;
            println!("{}", res.text().await?);
        }
        Commands::List => {
            let res = client.get(endpoint(base, &["config", "all"])?).send().await?;
            print_json(res).await?;
        }
        Commands::Get { name } => {
            let res = client.get(endpoint(base, &["config", &name])?).send().await?;
            print_json(res).await?;
        }
        Commands::Set { name, config } => {
            let config: Value = serde_json::from_str(&config)?;
            let res = client
                .post(endpoint(base, &["config", &name])?)
                .json(&json!({ "config": config }))
                .send()
                .await?;
            report(res, &name).await?;
        }
        Commands::Enable { name } => toggle(&client, base, &name, true).await?,
        Commands::Disable { name } => toggle(&client, base, &name, false).await?,
        Commands::Reload { name } => {
            let res = client.get(endpoint(base, &["reload", &name])?).send().await?;
            if res.status() == StatusCode::NOT_FOUND {
                eprintln!("Error: no worker connected");
                return Ok(());
            }
            report(res, &name).await?;
        }
    }

    Ok(())
}

/// Append path segments to the API base, percent-encoding each one.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, Box<dyn std::error::Error>> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| format!("'{}' cannot be used as an API base URL", base))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn toggle(
    client: &reqwest::Client,
    base: &Url,
    name: &str,
    enabled: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let res = client
        .post(endpoint(base, &["config", "control"])?)
        .json(&json!({ "name": name, "enabled": enabled }))
        .send()
        .await?;
    if res.status() == StatusCode::NOT_FOUND {
        eprintln!("Error: feature '{}' has no stored configuration", name);
        return Ok(());
    }
    report(res, name).await
}

async fn report(res: reqwest::Response, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if status.is_success() {
        println!("ok: {}", name);
    } else {
        eprintln!("Error: control API returned status {}", status);
        let text = res.text().await?;
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
    }
    Ok(())
}

async fn print_json(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: control API returned status {}", status);
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
