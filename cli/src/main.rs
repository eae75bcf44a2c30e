use anyhow::Result;
use clap::Parser;
use freqsearch_core::persist::{load_config, load_documents, load_requests, save_answers, Answers, WorkspacePaths};
use freqsearch_core::{rank, InvertedIndex};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "freqsearch")]
#[command(about = "Answer requests.json against the documents listed in config.json", long_about = None)]
struct Cli {
    /// Directory holding config.json and requests.json; answers.json is written here
    #[arg(long, default_value = ".")]
    root: String,
    /// Worker threads for the index build (defaults to one per CPU)
    #[arg(long)]
    threads: Option<usize>,
}

fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    if let Err(error) = run(&cli) {
        tracing::error!(%error, "search run failed");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new().num_threads(threads).build_global()?;
    }

    let paths = WorkspacePaths::new(&cli.root);
    let config = load_config(&paths)?;
    tracing::info!(name = %config.config.name, "starting");

    let docs = load_documents(&paths, &config);
    let index = InvertedIndex::build(&docs);
    tracing::info!(num_docs = index.num_docs(), num_terms = index.num_terms(), "index built");

    let requests = load_requests(&paths)?;
    let results = rank(&index, &requests);
    let answers = Answers::from_results(&results, config.config.max_responses);
    save_answers(&paths, &answers)?;

    tracing::info!(requests = requests.len(), output = %paths.answers().display(), "answers written");
    Ok(())
}
