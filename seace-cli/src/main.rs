//! `seace` command-line entry point.

mod cli;
mod logging;
mod report;

use clap::Parser;
use color_eyre::eyre::{eyre, Result, WrapErr};

use seace_cache::FetchOptions;
use seace_client::{cache_from_settings, SeaceClient, TenderFilters};
use seace_core::{normalize_label, SeaceConfig};
use seace_history::{
    analyze, HistoricalMatcher, MatcherConfig, ScorerConfig, SimilarityScorer, TrendConfig,
};

use crate::cli::{CacheCommand, Cli, Command, HistoryArgs, TenderArgs};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let config = SeaceConfig::load(cli.config.as_deref()).wrap_err("failed to load configuration")?;
    logging::init(&config.log)?;
    tracing::debug!(base_url = %config.api.base_url, persist = ?config.cache.persist, "configuration loaded");

    match &cli.command {
        Command::History(args) => history(&cli, &config, args).await,
        Command::Tenders(args) => tenders(&cli, &config, args).await,
        Command::Cache(CacheCommand::Stats) => {
            let cache = cache_from_settings(&config.cache);
            let stats = cache.stats();
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "entries": stats.entries,
                        "actions": stats.actions,
                        "sizeBytes": stats.size_bytes,
                    })
                );
            } else {
                print!("{}", report::render_cache_stats(&stats));
            }
            Ok(())
        }
        Command::Cache(CacheCommand::Clear) => {
            let cache = cache_from_settings(&config.cache);
            let entries = cache.stats().entries;
            cache.invalidate_all();
            println!("Cleared {} cached responses.", entries);
            Ok(())
        }
    }
}

fn client(cli: &Cli, config: &SeaceConfig) -> Result<SeaceClient> {
    let client = SeaceClient::from_config(config).wrap_err("failed to build backend client")?;
    Ok(if cli.refresh {
        client.with_fetch_options(FetchOptions::force_refresh())
    } else {
        client
    })
}

async fn history(cli: &Cli, config: &SeaceConfig, args: &HistoryArgs) -> Result<()> {
    let client = client(cli, config)?;
    let page = client
        .get_procesos(&TenderFilters::default())
        .await
        .wrap_err("failed to fetch tenders")?;
    let tenders = &page.value().tenders;

    let wanted = normalize_label(&args.nomenclature);
    let reference = tenders
        .iter()
        .find(|t| normalize_label(&t.nomenclature) == wanted)
        .ok_or_else(|| eyre!("tender {} not found among {} tenders", args.nomenclature.trim(), tenders.len()))?;

    let mut matcher_config = MatcherConfig::from(&config.matcher);
    if let Some(threshold) = args.threshold {
        matcher_config.threshold = threshold;
    }
    matcher_config.same_object_only |= args.same_object;
    matcher_config.earlier_only |= args.earlier_only;

    let matcher = HistoricalMatcher::new(matcher_config, SimilarityScorer::new(ScorerConfig::default()));
    let report = analyze(reference, tenders, &matcher, &TrendConfig::from(&config.trend));
    tracing::info!(
        nomenclature = %reference.nomenclature,
        candidates = tenders.len(),
        matches = report.total_matches(),
        "history analyzed"
    );

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report::render_history(&report));
    }
    Ok(())
}

async fn tenders(cli: &Cli, config: &SeaceConfig, args: &TenderArgs) -> Result<()> {
    let client = client(cli, config)?;

    let mut filters = TenderFilters::default();
    if let Some(region) = &args.region {
        filters = filters.region(region.as_str());
    }
    if let Some(entity) = &args.entity {
        filters = filters.entity(entity.as_str());
    }
    if let Some(search) = &args.search {
        filters = filters.search(search.as_str());
    }

    let page = client
        .get_procesos(&filters)
        .await
        .wrap_err("failed to fetch tenders")?;
    if page.was_cache_hit() {
        tracing::info!(age_ms = page.staleness().as_millis() as u64, "tenders served from cache");
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&page.value().tenders)?);
    } else {
        print!("{}", report::render_tenders(page.value()));
    }
    Ok(())
}
