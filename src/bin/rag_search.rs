use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use smartsearch::{
    AnswerProvider, ArtifactPaths, AzureOpenAiEmbedder, AzureOpenAiProvider, Chunk,
    CompletionRequest, OpenAiProvider, PromptTemplate, QueryEmbedder, RankedChunk, SearchContext,
    SearchEngine, SearchError,
};

#[derive(Parser, Debug)]
#[command(
    name = "smartsearch-rag",
    about = "Retrieve reranked chunks and stream them into an LLM answer"
)]
struct RagCli {
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

    /// Optional prompt template path (embedded default when omitted)
    #[arg(long, env = "SMARTSEARCH_PROMPT")]
    prompt_template: Option<PathBuf>,

    /// Number of candidates fetched by the coarse index search
    #[arg(long, env = "SMARTSEARCH_TOP_K", default_value_t = 10)]
    top_k: usize,

    /// Number of chunks kept after reranking
    #[arg(long, env = "SMARTSEARCH_TOP_N", default_value_t = 5)]
    top_n: usize,

    /// Azure OpenAI API key used for embeddings and Azure completions
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

    /// Completion model deployment name (azure provider)
    #[arg(long, env = "AZURE_OPENAI_COMPLETION_DEPLOYMENT", default_value = "")]
    completion_deployment: String,

    /// Target LLM provider (azure or openai)
    #[arg(long, env = "SMARTSEARCH_RAG_PROVIDER", default_value = "azure")]
    llm_provider: String,

    /// OpenAI API key (required when --llm-provider openai)
    #[arg(long, env = "OPENAI_API_KEY")]
    openai_api_key: Option<String>,

    /// OpenAI chat model used for synthesis
    #[arg(long, env = "SMARTSEARCH_RAG_MODEL", default_value = "gpt-4o-mini")]
    openai_model: String,

    /// Base URL for OpenAI-compatible endpoints
    #[arg(
        long,
        env = "SMARTSEARCH_OPENAI_BASE",
        default_value = "https://api.openai.com/v1"
    )]
    openai_base_url: String,

    /// Sampling temperature for the answer model
    #[arg(long, default_value_t = 0.2)]
    temperature: f32,

    /// Maximum tokens to request from the completion model
    #[arg(long, default_value_t = 400)]
    max_completion_tokens: usize,

    /// Seconds before embedding requests time out
    #[arg(long, env = "SMARTSEARCH_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Retry attempts for transient embedding errors
    #[arg(long, env = "SMARTSEARCH_MAX_RETRIES", default_value_t = 5)]
    max_retries: usize,

    /// Only print the retrieved context (skip the LLM call)
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

fn main() -> Result<()> {
    let cli = RagCli::parse();
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

    let template = match &cli.prompt_template {
        Some(path) => PromptTemplate::load(path)?,
        None => PromptTemplate::default(),
    };
    let provider = build_provider(&cli)?;

    if let Some(query) = cli.query.clone() {
        return answer_query(&cli, &engine, &template, provider.as_deref(), &query);
    }

    let stdin = io::stdin();
    loop {
        print!("\nquery> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let query = line.trim().to_string();
        if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit") {
            break;
        }
        if let Err(err) = answer_query(&cli, &engine, &template, provider.as_deref(), &query) {
            eprintln!("query failed: {err:#}");
        }
    }
    Ok(())
}

fn build_provider(cli: &RagCli) -> Result<Option<Box<dyn AnswerProvider>>> {
    if cli.dry_run {
        return Ok(None);
    }
    let provider: Box<dyn AnswerProvider> = match cli.llm_provider.to_lowercase().as_str() {
        "azure" => {
            anyhow::ensure!(
                !cli.completion_deployment.trim().is_empty(),
                "AZURE_OPENAI_COMPLETION_DEPLOYMENT must be set for the Azure provider"
            );
            Box::new(AzureOpenAiProvider::new(
                cli.azure_api_key.clone(),
                cli.azure_endpoint.clone(),
                cli.completion_deployment.clone(),
                cli.azure_api_version.clone(),
            )?)
        }
        "openai" => {
            let key = cli
                .openai_api_key
                .clone()
                .ok_or_else(|| anyhow!("OPENAI_API_KEY must be set for the OpenAI provider"))?;
            Box::new(OpenAiProvider::new(
                key,
                cli.openai_base_url.clone(),
                cli.openai_model.clone(),
            )?)
        }
        other => bail!("unsupported llm provider '{}'; use azure or openai", other),
    };
    Ok(Some(provider))
}

fn answer_query<E: QueryEmbedder>(
    cli: &RagCli,
    engine: &SearchEngine<E>,
    template: &PromptTemplate,
    provider: Option<&dyn AnswerProvider>,
    query: &str,
) -> Result<()> {
    let result = match engine.retrieve_and_rerank(query, cli.top_k, cli.top_n) {
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

    // Retrieval and generation are independent failure domains: the
    // context is printed before the completion call so a generation
    // failure still leaves the retrieved chunks on screen.
    println!("--- Retrieved Context ---");
    print_chunks(&result.chunks);

    let provider = match provider {
        Some(provider) => provider,
        None => {
            println!("\ndry-run enabled; skipping LLM call.");
            return Ok(());
        }
    };

    let context_chunks: Vec<Chunk> = result
        .chunks
        .iter()
        .map(|ranked| ranked.chunk.clone())
        .collect();
    let prompt = template.render(&context_chunks, query);
    let request = CompletionRequest {
        prompt: &prompt,
        temperature: cli.temperature,
        max_tokens: cli.max_completion_tokens,
    };
    match provider.answer(&request) {
        Ok(answer) => println!("\n--- Answer ---\n{answer}"),
        Err(err @ SearchError::Generation(_)) => {
            eprintln!("\nanswer generation failed (context above is still valid): {err}");
        }
        Err(err) => return Err(err).context("answer provider failed"),
    }
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
