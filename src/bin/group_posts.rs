use std::{fs, io::Write, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use news_grouper::{
    config::Config,
    grouping::{DBSCAN_GROUPER, GroupingService},
    logging,
    models::GroupedPosts,
    sources::{ConfiguredSource, JsonFileSource, PostSource},
};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

#[derive(Parser)]
#[command(
    name = "group-posts",
    about = "Group JSON dumps of news posts and print the summarized groups"
)]
struct Cli {
    /// JSON array of posts (`title`, `body`, `published_time`, `author`, `link`). Repeatable.
    #[arg(long, required_unless_present = "list")]
    input: Vec<PathBuf>,
    /// Only keep posts published at or after this RFC 3339 instant.
    #[arg(long, value_parser = parse_instant)]
    from: Option<OffsetDateTime>,
    /// Only keep posts published before this RFC 3339 instant.
    #[arg(long, value_parser = parse_instant)]
    to: Option<OffsetDateTime>,
    /// Grouper name, matched exactly.
    #[arg(long, default_value = DBSCAN_GROUPER)]
    grouper: String,
    /// Write the result here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Print the registered groupers and exit.
    #[arg(long)]
    list: bool,
}

fn parse_instant(raw: &str) -> Result<OffsetDateTime, String> {
    OffsetDateTime::parse(raw, &Rfc3339).map_err(|error| format!("expected RFC 3339: {error}"))
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    logging::init_tracing();
    let config = Config::from_env().context("loading configuration from the environment")?;
    let service =
        GroupingService::from_config(&config).context("initializing grouping service")?;

    if cli.list {
        for grouper in service.list_groupers() {
            println!("{}\n    {}", grouper.name, grouper.description);
        }
        return Ok(());
    }

    let reader: Arc<dyn PostSource> = Arc::new(JsonFileSource);
    let sources: Vec<ConfiguredSource> = cli
        .input
        .iter()
        .map(|path| ConfiguredSource {
            link: path.to_string_lossy().into_owned(),
            source: Arc::clone(&reader),
        })
        .collect();

    let from = cli.from.unwrap_or(OffsetDateTime::UNIX_EPOCH);
    let items = service
        .group_sources(&sources, from, cli.to, &cli.grouper)
        .await
        .with_context(|| format!("grouping {} input file(s)", sources.len()))?;
    let rendered = serde_json::to_string_pretty(&GroupedPosts::from(items))?;

    match cli.output {
        Some(path) => fs::write(&path, rendered)
            .with_context(|| format!("writing result to {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{rendered}")?;
        }
    }
    Ok(())
}
