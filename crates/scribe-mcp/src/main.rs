//! scribe-mcp - MCP server exposing Confluence and Jira write operations.

mod protocol;
mod server;
mod tools;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scribe_atlassian::{
    HttpTransport, IssueOrchestrator, PageOrchestrator, Product, SiteConfig,
};
use tools::Services;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "scribe-mcp")]
#[command(author, version, about = "MCP server for Confluence and Jira writes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server (communicates via stdin/stdout)
    Serve,
}

fn main() -> Result<()> {
    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => serve(),
    }
}

fn serve() -> Result<()> {
    // Credentials may live in a .env file next to the server.
    dotenvy::dotenv().ok();

    let confluence_site =
        SiteConfig::from_env("CONFLUENCE").context("Failed to load Confluence configuration")?;
    let jira_site = SiteConfig::from_env("JIRA").context("Failed to load Jira configuration")?;

    let services = Services {
        pages: PageOrchestrator::new(
            HttpTransport::new(confluence_site.clone(), Product::Confluence),
            confluence_site,
        ),
        issues: IssueOrchestrator::new(
            HttpTransport::new(jira_site.clone(), Product::Jira),
            jira_site,
        ),
    };

    server::serve(&services)
}
