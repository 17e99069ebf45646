use clap::{Parser, Subcommand};
use colored::Colorize;
use influxdb_v2_provider::InfluxProvider;
use influxdb_v2_provider::config::{TOKEN_ENV, URL_ENV};
use influxdb2_client::ClientOptions;
use influxdb2_provider_framework::{Context, Diagnostics, ProviderServer, Severity};
use serde_json::json;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "terraform-provider-influxdb-v2")]
#[command(about = "InfluxDB v2 provider: buckets, authorizations and server readiness", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the provider, resource and data source schemas as JSON
    Schema,
    /// Configure the provider and check the server readiness
    Ready {
        /// InfluxDB server URL
        #[arg(long, env = URL_ENV)]
        url: Option<String>,
        /// InfluxDB API token
        #[arg(long, env = TOKEN_ENV, hide_env_values = true)]
        token: Option<String>,
        /// Give up after this many seconds
        #[arg(long, default_value = "30")]
        timeout: u64,
        /// Per-request HTTP timeout in seconds
        #[arg(long, default_value = "20")]
        request_timeout: u64,
    },
}

fn print_diagnostics(diags: &Diagnostics) {
    for diag in diags.iter() {
        match diag.severity {
            Severity::Error => eprintln!("{} {}", "✗".red(), diag),
            Severity::Warning => eprintln!("{} {}", "⚠".yellow(), diag),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Schema => {
            let server = influxdb_v2_provider::server()?;
            println!("{}", serde_json::to_string_pretty(&server.schemas())?);
        }
        Commands::Ready {
            url,
            token,
            timeout,
            request_timeout,
        } => {
            let options = ClientOptions {
                timeout: Duration::from_secs(request_timeout),
                ..Default::default()
            };
            let mut server = ProviderServer::new(InfluxProvider::with_client_options(options))?;

            let ctx = Context::new().with_timeout(Duration::from_secs(timeout));
            let cancel = ctx.cancellation_token().clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            });

            if let Err(diags) = server
                .configure(&ctx, json!({ "url": url, "token": token }))
                .await
            {
                print_diagnostics(&diags);
                anyhow::bail!("provider configuration failed");
            }

            let data_source = format!("{}_ready", influxdb_v2_provider::TYPE_NAME);
            match server.read_data_source(&ctx, &data_source, json!({})).await {
                Ok(state) => {
                    println!(
                        "{} {} ({})",
                        "✓".green(),
                        state["url"].as_str().unwrap_or_default().cyan(),
                        state["status"].as_str().unwrap_or_default()
                    );
                    if let Some(started) = state["started"].as_str().filter(|s| !s.is_empty()) {
                        println!("  started: {}", started);
                    }
                }
                Err(diags) => {
                    print_diagnostics(&diags);
                    anyhow::bail!("readiness check failed");
                }
            }
        }
    }

    Ok(())
}
