//! One-shot command line query.
//!
//! Runs a single question through the pipeline using the same environment configuration as the
//! servers and prints the answer to stdout. Degraded stages are listed on stderr.
use anyhow::{Context, Result};
use clap::Parser;
use reporag::{config, logging, pipeline::RagPipeline};

/// Ask a question about an indexed repository.
#[derive(Debug, Parser)]
#[command(name = "reporag-ask", version, about)]
struct Args {
    /// Repository identifier the chunks were indexed under.
    #[arg(short, long)]
    repository: String,

    /// Print the run report (query used for retrieval, chunk counts) to stderr.
    #[arg(short, long)]
    verbose: bool,

    /// Question to answer.
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    config::init_config();
    logging::init_tracing();

    let pipeline = RagPipeline::from_config(config::get_config())
        .context("failed to assemble answering pipeline")?;
    let query = args.query.join(" ");

    let report = pipeline
        .run_with_report(&query, &args.repository)
        .await
        .context("query failed")?;

    if args.verbose {
        eprintln!("run: {}", report.run_id);
        eprintln!("retrieval query: {}", report.optimized_query);
        eprintln!(
            "chunks: {} retrieved, {} summarized, {} redactions",
            report.retrieved_chunks, report.summarized_chunks, report.redactions
        );
    }
    for degradation in &report.degradations {
        eprintln!("degraded {}: {degradation}", degradation.stage());
    }
    println!("{}", report.answer);
    Ok(())
}
