use std::convert::Infallible;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use tracing::info;
use tracing_subscriber::EnvFilter;
use zconnect::{AuthenticationProvider, ConnectorsConfig};
use zconnect_sdk::{AuthenticatedSession, Authentication, ConnectorRequest};

#[derive(Parser)]
#[command(name = "zconnect")]
#[command(about = "Log in to z/OSMF or ZSS and call its REST services", long_about = None)]
#[command(version)]
struct Cli {
    /// YAML configuration file; `ZCONNECT_*` environment variables override it
    #[arg(short, long, env = "ZCONNECT_CONFIG")]
    config: Option<PathBuf>,

    /// Log as JSON lines instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    /// z/OS user ID
    #[arg(short, long, env = "ZCONNECT_USER")]
    user: String,

    /// Password for the user ID
    #[arg(
        long,
        env = "ZCONNECT_PASSWORD",
        hide_env_values = true,
        value_parser = |raw: &str| Ok::<_, Infallible>(SecretString::from(raw))
    )]
    password: SecretString,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate and print the session cookie name
    Login,

    /// Authenticate, then GET a path relative to the backend root
    Get {
        /// Path relative to the connector root, e.g. `restjobs/jobs`
        path: String,

        /// Raw query string, e.g. `owner=ALICE&prefix=*`
        #[arg(long)]
        query: Option<String>,
    },
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn login(provider: &AuthenticationProvider, cli: &Cli) -> Result<AuthenticatedSession> {
    let credentials = Authentication::username_password(cli.user.clone(), cli.password.clone());
    provider
        .authenticate(&credentials)
        .await
        .with_context(|| format!("login as {} failed", cli.user))?
        .context("credentials were already authenticated")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json);

    let config = ConnectorsConfig::load(cli.config.as_deref()).context("invalid configuration")?;
    let provider = AuthenticationProvider::from_config(&config)?;
    let session = login(&provider, &cli).await?;

    let mut stdout = std::io::stdout().lock();
    match &cli.command {
        Commands::Login => {
            info!(connector = %provider.kind(), "login succeeded");
            writeln!(stdout, "{}", session.token())?;
        }
        Commands::Get { path, query } => {
            let connector = provider.connector();
            let url = connector.full_url_with_query(path, query.as_deref())?;
            let response = connector
                .request(ConnectorRequest::get(url).build(), session.principal())
                .await
                .with_context(|| format!("GET {path} failed"))?;

            info!(status = %response.status(), bytes = response.bytes().len(), "response received");
            stdout.write_all(response.bytes())?;
            if !response.status().is_success() {
                anyhow::bail!("backend answered {}", response.status());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_password_parsed_into_secret() {
        let cli = Cli::try_parse_from([
            "zconnect", "--user", "alice", "--password", "hunter2", "get", "restjobs/jobs",
        ])
        .unwrap();

        assert_eq!(cli.password.expose_secret(), "hunter2");
        assert!(matches!(
            cli.command,
            Commands::Get { ref path, query: None } if path == "restjobs/jobs"
        ));
    }
}
