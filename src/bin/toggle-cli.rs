use clap::{Parser, Subcommand};
use serde::Serialize;
use toggle_sdk::{SdkError, ToggleClient};

#[derive(Parser)]
#[command(name = "toggle-cli")]
#[command(about = "Management CLI for the resilience toggle service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Admin API key, if the service requires one.
    #[arg(short, long)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether resilience patterns are active
    Status,
    /// Turn all resilience patterns on
    Enable,
    /// Bypass all resilience patterns
    Disable,
    /// Set the resilience flag explicitly
    Toggle {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    /// Change fault injection settings
    Configure {
        #[arg(long)]
        failure_rate: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        delay_ms: Option<i64>,
    },
    /// Show fault injection settings
    Settings,
    /// Call the protected endpoint once
    Call,
}

#[tokio::main]
async fn main() -> Result<(), SdkError> {
    let cli = Cli::parse();
    let mut client = ToggleClient::new(&cli.url);
    if let Some(key) = &cli.key {
        client = client.with_api_key(key);
    }

    match cli.command {
        Commands::Status => print_json(&client.status().await?)?,
        Commands::Enable => print_json(&client.enable().await?)?,
        Commands::Disable => print_json(&client.disable().await?)?,
        Commands::Toggle { enabled } => print_json(&client.toggle(enabled).await?)?,
        Commands::Configure { failure_rate, delay_ms } => {
            if failure_rate.is_none() && delay_ms.is_none() {
                eprintln!("Error: nothing to configure (use --failure-rate and/or --delay-ms)");
                return Ok(());
            }
            print_json(&client.configure_mock(failure_rate, delay_ms).await?)?
        }
        Commands::Settings => print_json(&client.mock_settings().await?)?,
        Commands::Call => {
            let resp = client.call_external().await?;
            println!("HTTP {}", resp.status_code);
            print_json(&resp)?
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), SdkError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
