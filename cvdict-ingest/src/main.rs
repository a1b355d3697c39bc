//! cvdict - Chinese-Vietnamese dictionary completion CLI
//!
//! Builds the Source Store from CC-CEDICT, fills the Primary Store from seed
//! vocabulary files, reconciles the two, enriches incomplete entries through
//! the DeepSeek API and reports coverage.
//!
//! **Usage:**
//! ```bash
//! cvdict import-cedict cedict_ts.u8
//! cvdict import-cedict --download
//! cvdict integrate --capacity 5000
//! cvdict enhance --batch-size 20 --max-entries 100
//! cvdict complete --quick
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cvdict_common::config::{resolve_root_folder, StorePaths, TomlConfig};
use cvdict_common::db::{
    create_primary_store, create_source_store, open_primary_store, open_source_store, LexicalEntry,
};
use cvdict_ingest::config::{resolve_api_key, EnrichmentSettings};
use cvdict_ingest::services::{
    cedict_importer, completion_reporter, CedictImporter, CompletionWorkflow, EnrichmentClient,
    EnrichmentScheduler, Lookup, Preset, Reconciler, SeedImporter, SideTable, SideTableMerger,
    WorkflowOptions,
};
use sqlx::SqlitePool;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cvdict")]
#[command(about = "Chinese-Vietnamese dictionary completion pipeline")]
#[command(version)]
struct Cli {
    /// Root folder holding both stores and the reports
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Config file (default: <config_dir>/cvdict/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Primary Store path override
    #[arg(long, global = true)]
    primary_db: Option<PathBuf>,

    /// Source Store (CC-CEDICT) path override
    #[arg(long, global = true)]
    source_db: Option<PathBuf>,

    /// DeepSeek API key (overrides DEEPSEEK_API_KEY and the config file)
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge CC-CEDICT data into the Primary Store
    Integrate {
        /// Maximum number of new entries to insert
        #[arg(long, default_value_t = 5000)]
        capacity: usize,
    },

    /// Fill incomplete entries through the generative API
    Enhance {
        #[arg(long, default_value_t = 20)]
        batch_size: usize,

        #[arg(long, default_value_t = 100)]
        max_entries: usize,
    },

    /// Run integration, enrichment and reporting in one go
    Complete {
        /// Reduced limits (1000 CC-CEDICT entries, 100 AI enhancements)
        #[arg(long)]
        quick: bool,

        #[arg(long)]
        cedict_limit: Option<usize>,

        #[arg(long)]
        ai_limit: Option<usize>,

        /// Print the report without saving it
        #[arg(long)]
        no_report: bool,
    },

    /// Show coverage and store statistics
    Stats,

    /// Import a CC-CEDICT file (plain or .gz) into the Source Store
    ImportCedict {
        #[arg(required_unless_present = "download")]
        file: Option<PathBuf>,

        /// Fetch the current export into the root folder first
        #[arg(long, conflicts_with = "file")]
        download: bool,

        #[arg(long, default_value = cedict_importer::CEDICT_URL)]
        url: String,
    },

    /// Import seed vocabulary JSON files into the Primary Store
    ImportSeed { dir: PathBuf },

    /// Fill zhuyin or Hán-Việt readings from a side-table database
    MergeSideTable {
        #[arg(value_enum)]
        table: SideTable,
        file: PathBuf,
    },

    /// Search the dictionary
    Search {
        query: String,

        #[arg(long, default_value_t = 20)]
        limit: i64,
    },

    /// Show one entry with its examples and tags
    Show { id: i64 },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let toml_config = TomlConfig::load(cli.config.as_deref())?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&toml_config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "Starting cvdict v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = resolve_root_folder(cli.root.as_deref(), &toml_config);
    let paths = StorePaths::resolve(
        root_folder,
        &toml_config,
        cli.primary_db.as_deref(),
        cli.source_db.as_deref(),
    );
    info!("Root folder: {}", paths.root_folder.display());

    match cli.command {
        Command::Integrate { capacity } => {
            let primary = open_primary_store(&paths.primary_db).await?;
            let source = open_source_store(&paths.source_db).await?;

            let summary = Reconciler::new(primary, source).integrate(capacity).await?;

            println!("Integration results:");
            println!("  Matched entries:  {}", summary.matched_count);
            println!("  Updated entries:  {}", summary.updated_count);
            println!("  Inserted entries: {}", summary.inserted_count);
            println!("  Total before:     {}", summary.total_before);
            println!("  Total after:      {}", summary.total_after);
        }

        Command::Enhance {
            batch_size,
            max_entries,
        } => {
            let primary = open_primary_store(&paths.primary_db).await?;
            let client = enrichment_client(cli.api_key.as_deref(), &toml_config)?;

            let enhanced = EnrichmentScheduler::new(primary, client)
                .enhance_batch(batch_size, max_entries)
                .await?;

            println!("Enhanced {} entries", enhanced);
        }

        Command::Complete {
            quick,
            cedict_limit,
            ai_limit,
            no_report,
        } => {
            let primary = open_primary_store(&paths.primary_db).await?;

            let source = if paths.source_db.exists() {
                Some(open_source_store(&paths.source_db).await?)
            } else {
                warn!("Source store not found: {}", paths.source_db.display());
                None
            };

            let client = match enrichment_client(cli.api_key.as_deref(), &toml_config) {
                Ok(client) => Some(client),
                Err(e) => {
                    warn!("AI enhancement will be skipped: {}", e);
                    None
                }
            };

            let preset = if quick { Preset::Quick } else { Preset::Standard };
            let options = WorkflowOptions {
                cedict_limit,
                ai_limit,
                report_dir: (!no_report).then(|| paths.report_dir.clone()),
            };

            let outcome = CompletionWorkflow::new(primary, source, client)
                .run(preset, options)
                .await?;

            println!("{}", outcome.report.render());
            if let Some(path) = &outcome.report_path {
                println!("\nReport saved to {}", path.display());
            }
            println!(
                "Overall improvement: {:.1} percentage points",
                outcome.report.improvement()
            );
            println!("Total time: {:.1} seconds", outcome.elapsed.as_secs_f64());
        }

        Command::Stats => {
            let primary = open_primary_store(&paths.primary_db).await?;
            print_statistics(&primary).await?;

            if paths.source_db.exists() {
                let source = open_source_store(&paths.source_db).await?;
                let stats = cedict_importer::source_stats(&source).await?;
                println!("\nCC-CEDICT source store:");
                println!("  Total entries:       {}", stats.total_entries);
                println!("  Unique simplified:   {}", stats.unique_simplified);
                println!("  Unique traditional:  {}", stats.unique_traditional);
            }
        }

        Command::ImportCedict {
            file,
            download,
            url,
        } => {
            let file = match file {
                Some(file) if !download => file,
                _ => {
                    let client = reqwest::Client::new();
                    cedict_importer::download_cedict(&client, &url, &paths.root_folder).await?
                }
            };
            let source = create_source_store(&paths.source_db).await?;
            let stats = CedictImporter::new(source.clone())
                .import_file(&file)
                .await
                .with_context(|| format!("Importing {}", file.display()))?;

            println!(
                "Read {} lines, parsed {} entries: {} inserted, {} already present",
                stats.lines, stats.parsed, stats.inserted, stats.skipped
            );
            let totals = cedict_importer::source_stats(&source).await?;
            println!("Source store now holds {} entries", totals.total_entries);
        }

        Command::ImportSeed { dir } => {
            let primary = create_primary_store(&paths.primary_db).await?;
            let stats = SeedImporter::new(primary)?.import_directory(&dir).await?;

            println!(
                "Imported {} files: {} inserted, {} updated, {} skipped",
                stats.files, stats.inserted, stats.updated, stats.skipped
            );
        }

        Command::MergeSideTable { table, file } => {
            let primary = open_primary_store(&paths.primary_db).await?;
            let updated = SideTableMerger::new(primary).merge_file(table, &file).await?;

            println!("Updated {} entries from {}", updated, file.display());
        }

        Command::Search { query, limit } => {
            let primary = open_primary_store(&paths.primary_db).await?;
            let results = Lookup::new(primary).search(&query, limit).await?;

            if results.is_empty() {
                println!("No results for '{}'", query);
            }
            for entry in &results {
                print_entry_line(entry);
            }
        }

        Command::Show { id } => {
            let primary = open_primary_store(&paths.primary_db).await?;
            let Some(details) = Lookup::new(primary).details(id).await? else {
                bail!("No entry with id {}", id);
            };

            println!("{}", serde_json::to_string_pretty(&details)?);
        }
    }

    Ok(())
}

/// Client for the configured generative API; fails without a credential
fn enrichment_client(cli_key: Option<&str>, toml_config: &TomlConfig) -> Result<EnrichmentClient> {
    let api_key = resolve_api_key(cli_key, toml_config)?;
    let settings = EnrichmentSettings::from_config(&toml_config.enrichment, api_key);
    info!(
        "Enrichment API: {} (model {}, {:?} between calls)",
        settings.api_url, settings.model, settings.request_interval
    );

    Ok(EnrichmentClient::from_settings(&settings)?)
}

async fn print_statistics(primary: &SqlitePool) -> Result<()> {
    let coverage = completion_reporter::coverage(primary).await?;
    let lexicon = Lookup::new(primary.clone()).statistics().await?;

    println!("Primary store: {} entries", coverage.total_entries);
    for (label, rate) in coverage.rates() {
        println!("  {:<20}{:5.1}%", format!("{label}:"), rate);
    }
    println!("  Overall score:      {:5.1}%", coverage.overall_score());

    if !lexicon.hsk_distribution.is_empty() {
        println!("\nHSK levels:");
        for (level, count) in &lexicon.hsk_distribution {
            println!("  HSK {}: {}", level, count);
        }
    }
    if !lexicon.tocfl_distribution.is_empty() {
        println!("\nTOCFL levels:");
        for (level, count) in &lexicon.tocfl_distribution {
            println!("  TOCFL {}: {}", level, count);
        }
    }
    if !lexicon.categories.is_empty() {
        println!("\nTag categories:");
        for (category, count) in &lexicon.categories {
            println!("  {}: {}", category, count);
        }
    }

    Ok(())
}

fn print_entry_line(entry: &LexicalEntry) {
    let pinyin = entry.pinyin.as_deref().unwrap_or("");
    let vietnamese = entry.vi_meaning.as_deref().unwrap_or("");
    let english = entry.en_meaning.as_deref().unwrap_or("");

    println!(
        "[{}] {} [{}] {} / {}",
        entry.id, entry.word, pinyin, vietnamese, english
    );
}
