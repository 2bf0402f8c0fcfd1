use std::process::ExitCode;

use serde::Serialize;
use sightwords_core::config::Config;
use sightwords_core::constants::{DEFAULT_RECENT_LIMIT, DEFAULT_TREND_LIMIT};
use sightwords_core::logging::{init_tracing, LogConfig};
use sightwords_core::repository::import::ImportPolicy;
use sightwords_core::repository::statistics::{percentage, CollectionSummary};
use sightwords_core::store::operations::collections::{HistoryEntry, SessionRecord};
use sightwords_core::state::AppState;
use sightwords_core::transfer::{
    decode_share_url, encode_for_share, export_full, export_stats, to_json_string, ExportPayload,
    ImportPayload,
};

const USAGE: &str = "usage: sightwords <list|stats <id>|export-stats|export-full|share-stats|share-full|settings|import <url> [skip|overwrite|keep-both]>";

#[derive(Debug)]
enum Command {
    List,
    Stats { id: String },
    ExportStats,
    ExportFull,
    ShareStats,
    ShareFull,
    Settings,
    Import { link: String, policy: ImportPolicy },
}

impl Command {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, String> {
        let name = args.next().unwrap_or_else(|| "list".to_string());
        let command = match name.as_str() {
            "list" => Command::List,
            "stats" => Command::Stats {
                id: args.next().ok_or("stats needs a collection id")?,
            },
            "export-stats" => Command::ExportStats,
            "export-full" => Command::ExportFull,
            "share-stats" => Command::ShareStats,
            "share-full" => Command::ShareFull,
            "settings" => Command::Settings,
            "import" => {
                let link = args.next().ok_or("import needs a share link")?;
                let policy = match args.next() {
                    Some(raw) => raw.parse()?,
                    None => ImportPolicy::default(),
                };
                Command::Import { link, policy }
            }
            other => return Err(format!("unknown command: {other}")),
        };
        Ok(command)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListedCollection<'a> {
    id: &'a str,
    name: &'a str,
    word_count: usize,
    #[serde(flatten)]
    summary: CollectionSummary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CollectionReport<'a> {
    id: &'a str,
    name: &'a str,
    #[serde(flatten)]
    summary: CollectionSummary,
    trend: Vec<f64>,
    sessions: Vec<SessionRecord>,
    words: Vec<WordReport<'a>>,
}

#[derive(Serialize)]
struct WordReport<'a> {
    word: &'a str,
    percentage: u32,
    recent: Vec<HistoryEntry>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    init_tracing(&LogConfig::from(&config));

    let command = match Command::parse(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{message}\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    let state = match AppState::bootstrap(&config).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, path = %config.sled_path, "Failed to open store");
            return ExitCode::FAILURE;
        }
    };

    let code = match run(&state, command).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            tracing::error!(error = %message, "Command failed");
            ExitCode::FAILURE
        }
    };

    if let Err(e) = state.store().flush() {
        tracing::error!(error = %e, "Failed to flush store before exit");
    }
    code
}

async fn run(state: &AppState, command: Command) -> Result<String, String> {
    let mut repo = state.repository().lock().await;
    let base_url = state.share_base_url();

    let share = |payload: ExportPayload| encode_for_share(&payload, base_url).map_err(|e| e.to_string());
    let dump = |payload: ExportPayload| to_json_string(&payload, true).map_err(|e| e.to_string());

    match command {
        Command::List => {
            let listed: Vec<ListedCollection> = repo
                .list()
                .iter()
                .map(|c| ListedCollection {
                    id: &c.id,
                    name: &c.name,
                    word_count: c.words.len(),
                    summary: repo.collection_summary(&c.id).unwrap_or_default(),
                })
                .collect();
            serde_json::to_string_pretty(&listed).map_err(|e| e.to_string())
        }
        Command::Stats { id } => {
            let collection = repo
                .get_by_id(&id)
                .ok_or_else(|| format!("no collection with id {id}"))?;
            let words = collection
                .stats
                .iter()
                .flatten()
                .map(|stats| WordReport {
                    word: &stats.word,
                    percentage: percentage(stats),
                    recent: repo.recent_history(&id, &stats.word, DEFAULT_RECENT_LIMIT),
                })
                .collect();
            let report = CollectionReport {
                id: &collection.id,
                name: &collection.name,
                summary: repo.collection_summary(&id).unwrap_or_default(),
                trend: repo.collection_trend(&id, DEFAULT_TREND_LIMIT),
                sessions: repo.collection_sessions(&id, DEFAULT_TREND_LIMIT),
                words,
            };
            serde_json::to_string_pretty(&report).map_err(|e| e.to_string())
        }
        Command::ExportStats => dump(export_stats(repo.list())),
        Command::ExportFull => dump(export_full(repo.list())),
        Command::ShareStats => share(export_stats(repo.list())),
        Command::ShareFull => share(export_full(repo.list())),
        Command::Settings => {
            let settings = state
                .store()
                .get_practice_settings()
                .map_err(|e| e.to_string())?;
            serde_json::to_string_pretty(&settings).map_err(|e| e.to_string())
        }
        Command::Import { link, policy } => {
            let payload = decode_share_url(&link).map_err(|e| e.to_string())?;
            if let ImportPayload::Export(export) = &payload {
                tracing::info!(
                    kind = ?export.kind(),
                    version = export.version(),
                    collections = export.collection_count(),
                    ?policy,
                    "Importing share link"
                );
            }
            let report = repo.apply_import(payload, policy);
            if let Some(error) = &report.save_error {
                return Err(format!("import applied in memory but not saved: {error}"));
            }
            serde_json::to_string_pretty(&report).map_err(|e| e.to_string())
        }
    }
}
