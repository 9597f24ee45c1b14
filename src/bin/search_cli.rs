use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use smartsearch::{
    ArtifactPaths, AzureOpenAiEmbedder, QueryEmbedder, RankedChunk, SearchContext, SearchEngine,
    SearchError,
};

#[derive(Parser, Debug)]
#[command(
    name = "smartsearch",
    about = "Semantic search over a prebuilt chunk index with cosine reranking"
)]
struct SearchCli {
    /// Optional one-shot query; omit to enter the interactive loop
    #[arg(long)]
    query: Option<String>,

    /// Path to the vector index artifact
    #[arg(
        long,
        env = "SMARTSEARCH_INDEX",
        default_value = "embeddings/index.json"
    )]
    index: PathBuf,

    /// Path to the embedding matrix artifact
    #[arg(
        long,
        env = "SMARTSEARCH_EMBEDDINGS",
        default_value = "embeddings/chunk_embeddings.jsonl"
    )]
    embeddings: PathBuf,

    /// Path to the metadata store artifact
    #[arg(
        long,
        env = "SMARTSEARCH_METADATA",
        default_value = "embeddings/metadata.jsonl"
    )]
    metadata: PathBuf,

    /// Number of candidates fetched by the coarse index search
    #[arg(long, env = "SMARTSEARCH_TOP_K", default_value_t = 10)]
    top_k: usize,

    /// Number of chunks kept after reranking
    #[arg(long, env = "SMARTSEARCH_TOP_N", default_value_t = 5)]
    top_n: usize,

    /// Azure OpenAI API key used for query embeddings
    #[arg(long, env = "AZURE_OPENAI_API_KEY")]
    azure_api_key: String,

    /// Azure OpenAI resource endpoint
    #[arg(long, env = "AZURE_OPENAI_ENDPOINT")]
    azure_endpoint: String,

    /// Azure OpenAI API version
    #[arg(long, env = "AZURE_OPENAI_API_VERSION", default_value = "2024-02-01")]
    azure_api_version: String,

    /// Embedding model deployment name
    #[arg(long, env = "AZURE_OPENAI_DEPLOYMENT")]
    embedding_deployment: String,

    /// Seconds before embedding requests time out
    #[arg(long, env = "SMARTSEARCH_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Retry attempts for transient embedding errors
    #[arg(long, env = "SMARTSEARCH_MAX_RETRIES", default_value_t = 5)]
    max_retries: usize,
}

fn main() -> Result<()> {
    let cli = SearchCli::parse();
    let embedder = AzureOpenAiEmbedder::new(
        cli.azure_api_key.clone(),
        cli.azure_endpoint.clone(),
        cli.embedding_deployment.clone(),
        cli.azure_api_version.clone(),
        Duration::from_secs(cli.timeout_secs.max(1)),
        cli.max_retries.max(1),
    )?;
    let paths = ArtifactPaths {
        index: cli.index.clone(),
        embeddings: cli.embeddings.clone(),
        metadata: cli.metadata.clone(),
    };
    let context = SearchContext::load(&paths)?;
    eprintln!("loaded {} chunks from {:?}", context.len(), cli.metadata);
    let engine = SearchEngine::new(context, embedder);

    if let Some(query) = &cli.query {
        return run_query(&engine, query, cli.top_k, cli.top_n);
    }

    let stdin = io::stdin();
    loop {
        print!("\nquery> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let query = line.trim();
        if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit") {
            break;
        }
        if let Err(err) = run_query(&engine, query, cli.top_k, cli.top_n) {
            eprintln!("search failed: {err:#}");
        }
    }
    Ok(())
}

fn run_query<E: QueryEmbedder>(
    engine: &SearchEngine<E>,
    query: &str,
    top_k: usize,
    top_n: usize,
) -> Result<()> {
    let result = match engine.retrieve_and_rerank(query, top_k, top_n) {
        Ok(result) => result,
        Err(SearchError::EmptyQuery) => {
            eprintln!("query is empty; type a question or 'exit'.");
            return Ok(());
        }
        Err(err) => return Err(err).context("retrieval pipeline failed"),
    };
    if result.chunks.is_empty() {
        println!("no matching chunks.");
        return Ok(());
    }
    print_chunks(&result.chunks);
    Ok(())
}

fn print_chunks(chunks: &[RankedChunk]) {
    for (rank, ranked) in chunks.iter().enumerate() {
        println!(
            "{}. [row {} | similarity {:.4}] {}",
            rank + 1,
            ranked.chunk.position,
            ranked.similarity,
            ranked.chunk.text.trim()
        );
    }
}
