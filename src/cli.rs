//! Command-line surface: ingest a document, query the store, or run an
//! interactive retrieval session.

use crate::config::Config;
use crate::db::{create_pool, PgVectorStore};
use crate::embeddings::{
    EmbeddingsClient, IngestOptions, SearchMode, SearchOptions, TextProcessor, VectorStore,
};
use crate::types::AppResult;
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "manual-rag",
    about = "Chunk documents into pgvector and retrieve the passages closest to a question"
)]
pub struct Cli {
    /// Vector table, optionally schema-qualified (overrides RAG_TABLE)
    #[arg(long, global = true)]
    pub table: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Chunk, embed and store a UTF-8 text file
    Ingest {
        file: PathBuf,
        #[command(flatten)]
        args: IngestArgs,
    },
    /// Print the stored chunks most similar to a query
    Search {
        query: String,
        #[command(flatten)]
        args: SearchArgs,
    },
    /// Read queries from stdin, one per line, until `exit` or `quit`
    Repl {
        #[command(flatten)]
        args: SearchArgs,
    },
    /// Check database connectivity and report the stored chunk count
    Status,
}

#[derive(Args, Debug, Default)]
pub struct IngestArgs {
    /// Characters per chunk
    #[arg(long)]
    pub chunk_size: Option<usize>,
    /// Characters shared by consecutive chunks
    #[arg(long)]
    pub overlap: Option<usize>,
    /// Embedding width
    #[arg(long)]
    pub dimensions: Option<usize>,
    /// Keep existing rows instead of truncating the table first
    #[arg(long)]
    pub append: bool,
}

impl IngestArgs {
    pub fn apply(&self, base: &IngestOptions) -> IngestOptions {
        IngestOptions {
            chunk_size: self.chunk_size.unwrap_or(base.chunk_size),
            overlap: self.overlap.unwrap_or(base.overlap),
            dimensions: self.dimensions.unwrap_or(base.dimensions),
            truncate_table: base.truncate_table && !self.append,
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct SearchArgs {
    /// Distance metric: cosine or euclidean
    #[arg(long)]
    pub mode: Option<SearchMode>,
    /// Maximum number of chunks returned
    #[arg(long)]
    pub top_k: Option<usize>,
    /// Minimum similarity (1 - distance)
    #[arg(long, allow_negative_numbers = true)]
    pub min_score: Option<f64>,
    /// Embedding width
    #[arg(long)]
    pub dimensions: Option<usize>,
}

impl SearchArgs {
    pub fn apply(&self, base: &SearchOptions) -> SearchOptions {
        SearchOptions {
            mode: self.mode.unwrap_or(base.mode),
            top_k: self.top_k.unwrap_or(base.top_k),
            min_score: self.min_score.unwrap_or(base.min_score),
            dimensions: self.dimensions.unwrap_or(base.dimensions),
        }
    }
}

pub async fn run(cli: Cli, config: Config) -> AppResult<()> {
    let table = cli.table.unwrap_or_else(|| config.database.table.clone());
    let mut stdout = std::io::stdout();

    match cli.command {
        Command::Status => {
            let pool = create_pool(&config.database).await?;
            let store = PgVectorStore::new(pool, &table)?;
            let count = store.count().await?;
            writeln!(stdout, "{}: {} chunk(s) stored", store.table().qualified(), count)?;
        }
        Command::Ingest { file, args } => {
            let options = args.apply(&config.ingest);
            let processor = connect(&config, &table, Some(options.dimensions)).await?;
            let report = processor.process_text_file(&file, &options).await?;
            writeln!(
                stdout,
                "Stored {} chunk(s) from {}{}",
                report.chunks,
                report.document_name,
                if report.truncated { " (table truncated)" } else { "" }
            )?;
        }
        Command::Search { query, args } => {
            let options = args.apply(&config.search);
            let processor = connect(&config, &table, None).await?;
            let results = processor.search(&query, &options).await?;
            print_results(&mut stdout, &results)?;
        }
        Command::Repl { args } => {
            let options = args.apply(&config.search);
            let processor = connect(&config, &table, None).await?;
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            run_session(&processor, &options, stdin, &mut stdout).await?;
        }
    }

    Ok(())
}

// Credentials are checked before any database I/O.
async fn connect(
    config: &Config,
    table: &str,
    ensure_dimensions: Option<usize>,
) -> AppResult<TextProcessor> {
    let provider = EmbeddingsClient::new(&config.embeddings)?;
    let pool = create_pool(&config.database).await?;
    let store = PgVectorStore::new(pool, table)?;
    if let Some(dimensions) = ensure_dimensions {
        store.ensure_schema(dimensions).await?;
    }
    Ok(TextProcessor::new(Arc::new(provider), Arc::new(store)))
}

fn print_results<W: Write>(out: &mut W, results: &[String]) -> std::io::Result<()> {
    if results.is_empty() {
        return writeln!(out, "No relevant context found.");
    }
    for (rank, text) in results.iter().enumerate() {
        writeln!(out, "[{}] {}\n", rank + 1, text.trim())?;
    }
    Ok(())
}

/// Interactive loop. A failing query prints an error notice and the session
/// carries on; only I/O errors on the session streams end it.
pub async fn run_session<R, W>(
    processor: &TextProcessor,
    options: &SearchOptions,
    input: R,
    out: &mut W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    info!(mode = %options.mode, top_k = options.top_k, "Starting retrieval session");
    writeln!(out, "Type a question, or 'exit' to quit.")?;

    let mut lines = input.lines();
    loop {
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit") {
            break;
        }

        match processor.search(query, options).await {
            Ok(results) => print_results(out, &results)?,
            Err(e) => {
                warn!(error = %e, "Query failed");
                writeln!(out, "Error: {e}")?;
            }
        }
    }

    writeln!(out, "Goodbye!")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{EmbeddingProvider, InMemoryVectorStore};
    use crate::types::{AppError, EmbeddingBatch};
    use async_trait::async_trait;

    // Embeds "fail" as a provider error, everything else as a fixed vector.
    struct StubProvider;

    #[async_trait]
    impl EmbeddingProvider for StubProvider {
        async fn embed(&self, texts: &[String], _dimensions: usize) -> AppResult<EmbeddingBatch> {
            if texts.iter().any(|t| t == "fail") {
                return Err(AppError::Provider { status: 503, body: "unavailable".to_string() });
            }
            Ok(texts.iter().enumerate().map(|(i, _)| (i, vec![1.0, 0.0])).collect())
        }
    }

    async fn stub_processor() -> TextProcessor {
        let store = Arc::new(InMemoryVectorStore::new(2));
        store.insert("doc.txt", "stored chunk", &[1.0, 0.0]).await.unwrap();
        TextProcessor::new(Arc::new(StubProvider), store)
    }

    fn search_options() -> SearchOptions {
        SearchOptions {
            dimensions: 2,
            ..SearchOptions::default()
        }
    }

    #[tokio::test]
    async fn test_session_survives_failed_query() {
        let processor = stub_processor().await;
        let input: &[u8] = b"fail\n\nwhat is stored?\nquit\nnever reached\n";
        let mut out = Vec::new();

        run_session(&processor, &search_options(), input, &mut out).await.unwrap();

        let transcript = String::from_utf8(out).unwrap();
        assert!(transcript.contains("Error: Embedding provider error (503): unavailable"));
        assert!(transcript.contains("[1] stored chunk"));
        assert!(transcript.ends_with("Goodbye!\n"));
        assert_eq!(transcript.matches("[1] stored chunk").count(), 1);
    }

    #[tokio::test]
    async fn test_session_ends_at_eof() {
        let processor = stub_processor().await;
        let input: &[u8] = b"what is stored?";
        let mut out = Vec::new();

        run_session(&processor, &search_options(), input, &mut out).await.unwrap();
        assert!(String::from_utf8(out).unwrap().contains("[1] stored chunk"));
    }

    #[test]
    fn test_print_results_empty() {
        let mut out = Vec::new();
        print_results(&mut out, &[]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "No relevant context found.\n");
    }

    #[test]
    fn test_parse_search_flags() {
        let cli = Cli::try_parse_from([
            "manual-rag",
            "search",
            "how do I defrost?",
            "--mode",
            "euclidean",
            "--top-k",
            "3",
            "--min-score",
            "-0.25",
        ])
        .unwrap();

        match cli.command {
            Command::Search { query, args } => {
                assert_eq!(query, "how do I defrost?");
                let options = args.apply(&SearchOptions::default());
                assert_eq!(options.mode, SearchMode::Euclidean);
                assert_eq!(options.top_k, 3);
                assert_eq!(options.min_score, -0.25);
                assert_eq!(options.dimensions, 1536);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_ingest_flags() {
        let cli = Cli::try_parse_from([
            "manual-rag",
            "--table",
            "rag.manual",
            "ingest",
            "manual.txt",
            "--chunk-size",
            "500",
            "--append",
        ])
        .unwrap();

        assert_eq!(cli.table.as_deref(), Some("rag.manual"));
        match cli.command {
            Command::Ingest { file, args } => {
                assert_eq!(file, PathBuf::from("manual.txt"));
                let options = args.apply(&IngestOptions::default());
                assert_eq!(options.chunk_size, 500);
                assert_eq!(options.overlap, 40);
                assert!(!options.truncate_table);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(Cli::try_parse_from(["manual-rag", "search", "q", "--mode", "manhattan"]).is_err());
    }
}
