//! `persona-chat`: terminal chat surface for the resume persona

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use persona::prelude::*;
use persona::settings::{EmbeddingBackend, Settings};
use persona::rag::vector::EmbeddingProvider;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Chat with a resume persona grounded in its resume
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML settings file (overridden by PERSONA__* variables)
    #[arg(short, long, env = "PERSONA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive chat; one session for the whole conversation
    Chat,
    /// Answer a single question and exit
    Ask {
        /// The question
        question: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref()).context("Failed to load settings")?;

    let bot = build_chatbot(&settings).await?;

    match args.command {
        Command::Ask { question } => {
            let session = generate_session_id();
            let reply = bot.chat(&question, &session).await?;
            println!("{reply}");
        }
        Command::Chat => run_repl(&bot).await?,
    }

    Ok(())
}

async fn build_chatbot(settings: &Settings) -> Result<Chatbot> {
    let client = Arc::new(Client::from_env().context("Failed to create LLM client")?);

    let embeddings: Arc<dyn EmbeddingProvider> = match settings.embedding {
        EmbeddingBackend::OpenAi => client.clone(),
        EmbeddingBackend::Hash => Arc::new(HashEmbeddingProvider::new(1024)),
    };
    let index = Arc::new(InMemoryVectorIndex::new(embeddings));

    let documents = load_documents(&settings.resume_sources())
        .await
        .context("Failed to load resume sources")?;
    let indexed = index.add_documents(documents).await?;
    if indexed == 0 {
        warn!("No resume documents indexed; every question will be refused");
    }

    let storage = connect_storage(settings).await?;

    let bot = Chatbot::builder()
        .with_llm(client)
        .with_index(index)
        .with_storage(storage)
        .with_config(settings.chatbot_config())
        .build()?;

    info!(documents = indexed, "Persona ready");
    Ok(bot)
}

#[cfg(feature = "redis")]
async fn connect_storage(settings: &Settings) -> Result<Arc<dyn Memory>> {
    match &settings.redis_url {
        Some(url) => Ok(Arc::new(
            RedisStorage::connect(url)
                .await
                .context("Failed to connect to redis")?,
        )),
        None => Ok(Arc::new(InMemoryStorage::new())),
    }
}

#[cfg(not(feature = "redis"))]
async fn connect_storage(settings: &Settings) -> Result<Arc<dyn Memory>> {
    if settings.redis_url.is_some() {
        warn!("redis_url is set but the `redis` feature is disabled; using in-memory storage");
    }
    Ok(Arc::new(InMemoryStorage::new()))
}

async fn run_repl(bot: &Chatbot) -> Result<()> {
    let session = generate_session_id();
    info!(session_id = %session, "Started chat session");

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(
            format!(
                "{}에게 무엇이든 물어보세요. 종료하려면 exit를 입력하세요.\n",
                bot.config().persona_name
            )
            .as_bytes(),
        )
        .await?;

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if matches!(message, "exit" | "quit") {
            break;
        }

        match bot.chat(message, &session).await {
            Ok(reply) => stdout.write_all(format!("{reply}\n").as_bytes()).await?,
            Err(e) => {
                warn!(error = %e, "Chat turn failed");
                stdout
                    .write_all(format!("{}\n", bot.config().refusal_message).as_bytes())
                    .await?;
            }
        }
    }

    Ok(())
}
