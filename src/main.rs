use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use assistant_rag::assistant::{read_question, AssistantRunner};
use assistant_rag::chunk::Chunker;
use assistant_rag::client::OpenAIClient;
use assistant_rag::config::{self, expand_home};
use assistant_rag::embedding::OpenAIEmbedder;
use assistant_rag::extract::load_corpus;
use assistant_rag::qa::{chat, OpenAIGenerator};
use assistant_rag::retrieval::SemanticIndex;
use assistant_rag::Error;

#[derive(Parser)]
#[command(name = "assistant-rag")]
#[command(about = "Run an OpenAI assistant or ask questions about local documents")]
#[command(version)]
struct Cli {
    /// API key for the OpenAI-compatible endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Base URL of the API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = config::DEFAULT_BASE_URL, global = true)]
    base_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask an assistant a question and download any files it produces
    Assistant(AssistantArgs),
    /// Index local documents and answer questions from them interactively
    Qa(QaArgs),
}

#[derive(Args)]
struct AssistantArgs {
    /// Question to send; read from stdin when omitted
    question: Option<String>,

    #[arg(long, env = "OPENAI_ASSISTANT_ID")]
    assistant_id: String,

    /// Directory that receives downloaded files
    #[arg(long, default_value = config::DOWNLOAD_DIR)]
    out_dir: PathBuf,

    #[arg(long, default_value_t = config::POLL_INTERVAL_MS)]
    poll_interval_ms: u64,
}

#[derive(Args)]
struct QaArgs {
    /// Documents to index (pdf, txt, md, csv, html, docx, ...)
    files: Vec<String>,

    #[arg(long, default_value = config::EMBED_MODEL)]
    embed_model: String,

    #[arg(long, default_value = config::GEN_MODEL)]
    gen_model: String,

    #[arg(long, default_value_t = config::CHUNK_SIZE)]
    chunk_size: usize,

    #[arg(long, default_value_t = config::CHUNK_OVERLAP)]
    chunk_overlap: usize,

    /// Number of passages retrieved per question
    #[arg(long, default_value_t = config::TOP_K)]
    top_k: usize,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let api_key = cli.api_key.ok_or(Error::MissingApiKey).context("set OPENAI_API_KEY or pass --api-key")?;
    let client = OpenAIClient::with_base_url(api_key, &cli.base_url);

    match cli.command {
        Commands::Assistant(args) => run_assistant(&client, args).await,
        Commands::Qa(args) => run_qa(client, args).await,
    }
}

/// Resolves on the first Ctrl-C. If the handler cannot be installed it never resolves.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn run_assistant(client: &OpenAIClient, args: AssistantArgs) -> Result<()> {
    let question = match args.question {
        Some(q) => Some(q.trim().to_string()).filter(|q| !q.is_empty()),
        None => read_question(BufReader::new(tokio::io::stdin()), &mut std::io::stdout()).await?,
    };
    let Some(question) = question else {
        error!("No question given.");
        return Ok(());
    };

    let runner = AssistantRunner::new(client, args.out_dir)
        .poll_interval(Duration::from_millis(args.poll_interval_ms));
    let outcome = runner
        .run(&args.assistant_id, &question, &mut std::io::stdout())
        .await
        .context("assistant run failed")?;
    info!("Assistant finished: {:?}", outcome);
    Ok(())
}

async fn run_qa(client: OpenAIClient, args: QaArgs) -> Result<()> {
    let paths: Vec<PathBuf> = if args.files.is_empty() {
        config::default_file_paths()
    } else {
        args.files.iter().map(|f| expand_home(f)).collect()
    };
    let chunker = Chunker::new(args.chunk_size, args.chunk_overlap)?;
    info!("Chunking with size {} and overlap {}", chunker.size(), chunker.overlap());

    let corpus = load_corpus(&paths, &chunker).context("failed to read documents")?;
    if corpus.is_empty() {
        error!("No usable text extracted.");
        return Ok(());
    }

    let chunk_count = corpus.chunks.len();
    let embedder = OpenAIEmbedder::new(client.clone(), args.embed_model);
    let index = SemanticIndex::build(embedder, corpus.chunks)
        .await
        .context("failed to build index")?;
    println!("[ok] Indexed {} chunks from {} files.", chunk_count, paths.len());

    let generator = OpenAIGenerator::new(client, args.gen_model);
    let end = chat(
        &index,
        &generator,
        args.top_k,
        BufReader::new(tokio::io::stdin()),
        &mut std::io::stdout(),
        interrupted(),
    )
    .await?;
    info!("Session ended: {:?}", end);
    Ok(())
}
