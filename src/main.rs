use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use selfquery_api::RestApi;
use selfquery_core::CollectionConfig;
use selfquery_llm::{
    EmbeddingProvider, HashEmbedder, LanguageModel, OpenAiChatModel, OpenAiConfig,
    OpenAiEmbeddings, DEFAULT_API_BASE, DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_DIM,
    DEFAULT_EMBEDDING_MODEL, DEFAULT_HASH_DIM,
};
use selfquery_query::{build_collection, RetrievalResult, RetrieverConfig, SelfQueryRetriever, DEFAULT_LIMIT};
use selfquery_schema::Corpus;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum EmbedderKind {
    /// OpenAI-compatible embeddings endpoint
    Openai,
    /// Offline hashing embedder
    Hash,
}

/// Natural-language retrieval with self-querying metadata filters
#[derive(Parser, Debug)]
#[command(name = "selfquery")]
#[command(about = "Ask for documents in plain language; filters are inferred from the schema", long_about = None)]
struct Args {
    /// Corpus file with schema and documents
    #[arg(short, long, env = "SELFQUERY_CORPUS", default_value = "data/movies.json")]
    corpus: PathBuf,

    /// HTTP API port
    #[arg(long, env = "SELFQUERY_HTTP_PORT", default_value_t = 8080)]
    http_port: u16,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "SELFQUERY_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// API key for the language model (and embeddings)
    #[arg(long, env = "SELFQUERY_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Chat model that structures queries
    #[arg(long, env = "SELFQUERY_CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    chat_model: String,

    /// Embedding model, when --embedder=openai
    #[arg(long, env = "SELFQUERY_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Embedding backend
    #[arg(long, value_enum, default_value_t = EmbedderKind::Hash)]
    embedder: EmbedderKind,

    /// Embedding dimension (defaults depend on the embedder)
    #[arg(long)]
    embedding_dim: Option<usize>,

    /// Documents returned when a query names no limit
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    default_limit: usize,

    /// Seconds to wait for the language model
    #[arg(long, default_value_t = 60)]
    model_timeout_secs: u64,

    /// Seconds to wait for each embedding and search call
    #[arg(long, default_value_t = 30)]
    store_timeout_secs: u64,

    /// Run a single query, print the results and exit
    #[arg(short, long)]
    query: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting SelfQuery v{}", env!("CARGO_PKG_VERSION"));
    info!("Corpus: {:?}", args.corpus);

    if args.default_limit == 0 {
        bail!("--default-limit must be at least 1");
    }

    let corpus = Corpus::load(&args.corpus)
        .with_context(|| format!("failed to load corpus {:?}", args.corpus))?;

    let Some(api_key) = args.api_key.clone() else {
        bail!("an API key is required (--api-key or SELFQUERY_API_KEY)");
    };

    let model_config = OpenAiConfig::new(api_key.clone(), args.chat_model.clone())
        .with_api_base(args.api_base.clone())
        .with_timeout(Duration::from_secs(args.model_timeout_secs));
    let model: Arc<dyn LanguageModel> = Arc::new(OpenAiChatModel::new(model_config)?);

    let embedder: Arc<dyn EmbeddingProvider> = match args.embedder {
        EmbedderKind::Hash => Arc::new(HashEmbedder::new(
            args.embedding_dim.unwrap_or(DEFAULT_HASH_DIM),
        )),
        EmbedderKind::Openai => {
            let config = OpenAiConfig::new(api_key, args.embedding_model.clone())
                .with_api_base(args.api_base.clone())
                .with_timeout(Duration::from_secs(args.store_timeout_secs));
            Arc::new(OpenAiEmbeddings::new(
                config,
                args.embedding_dim.unwrap_or(DEFAULT_EMBEDDING_DIM),
            )?)
        }
    };
    info!(
        "Language model: {} | embedder: {:?} ({} dimensions)",
        model.name(),
        args.embedder,
        embedder.dimension()
    );

    let collection_config = CollectionConfig {
        name: "documents".to_string(),
        ..Default::default()
    };
    let store = build_collection(collection_config, corpus.documents, embedder.as_ref()).await?;

    let config = RetrieverConfig {
        default_limit: args.default_limit,
        model_timeout: Duration::from_secs(args.model_timeout_secs),
        store_timeout: Duration::from_secs(args.store_timeout_secs),
    };
    let retriever = Arc::new(SelfQueryRetriever::with_config(
        Arc::new(corpus.schema),
        model,
        embedder,
        Arc::new(store),
        config,
    ));

    if let Some(query) = args.query.as_deref() {
        return run_once(&retriever, query).await;
    }

    let http_port = args.http_port;
    let retriever_http = retriever.clone();
    let http_handle = std::thread::spawn(move || {
        let sys = actix_web::rt::System::new();
        sys.block_on(async {
            if let Err(e) = RestApi::start(retriever_http, http_port).await {
                eprintln!("HTTP server error: {}", e);
            }
        })
    });

    info!("SelfQuery started successfully");
    info!("HTTP API: http://localhost:{}/", http_port);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = tokio::task::spawn_blocking(move || {
            http_handle.join().ok();
        }) => {
            info!("HTTP server stopped");
        }
    }

    info!("Shutting down...");
    Ok(())
}

async fn run_once(retriever: &SelfQueryRetriever, query: &str) -> anyhow::Result<()> {
    let query = query.trim();
    if query.is_empty() {
        warn!("Please enter a query");
        eprintln!("Please enter a query.");
        return Ok(());
    }

    match retriever.retrieve(query).await {
        Ok(result) => {
            print_result(&result);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            Err(e.into())
        }
    }
}

fn print_result(result: &RetrievalResult) {
    println!("Understood as: {}", serde_json::to_string(&result.structured_query).unwrap_or_default());
    println!();

    if result.is_empty() {
        println!("No matching documents found.");
        return;
    }

    for (i, hit) in result.iter().enumerate() {
        println!("Document #{}", i + 1);
        println!("Content: {}", hit.document.content);
        println!(
            "Metadata: {}",
            serde_json::to_string(&hit.document.metadata).unwrap_or_default()
        );
        println!("Score: {:.4}", hit.score);
        println!("---");
    }
}
