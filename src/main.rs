//! Service entrypoint: HTTP server or one-shot CLI chat.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use smartwealth::agents::AdvisoryDeps;
use smartwealth::api::{ApiState, serve};
use smartwealth::config::Config;
use smartwealth::llm::{create_embedding_provider, create_llm_provider};
use smartwealth::market::MarketDataClient;
use smartwealth::network::{Message, Role};
use smartwealth::store::CosmosDocumentStore;

#[derive(Parser, Debug)]
#[command(name = "smartwealth", about = "Multi-agent financial advisory service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API server (default).
    Serve,
    /// Run one conversation from the command line and print the replies.
    Chat {
        /// The user's message.
        message: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Arc::new(Config::from_env().context("loading configuration")?);

    let llm = create_llm_provider(&config);
    let embeddings = create_embedding_provider(&config);
    let store = Arc::new(CosmosDocumentStore::new(
        config.store.clone(),
        embeddings,
    ));
    let market = Arc::new(MarketDataClient::new(&config.market));

    let deps = Arc::new(AdvisoryDeps {
        llm,
        store,
        market,
        config: Arc::clone(&config),
    });

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config.server.bind, ApiState { deps }).await,
        Command::Chat { message } => chat_once(&deps, message).await,
    }
}

async fn chat_once(deps: &AdvisoryDeps, message: String) -> anyhow::Result<()> {
    let network = smartwealth::agents::build_advisory_network(deps).await?;
    let state = network.run(vec![Message::user(message)]).await?;

    for reply in state
        .messages
        .iter()
        .filter(|m| m.role == Role::Agent && !m.content.is_empty())
    {
        let author = reply.author.as_deref().unwrap_or("assistant");
        println!("[{author}] {}", reply.content);
    }

    Ok(())
}
