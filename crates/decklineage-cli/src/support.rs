use crate::cli::Cli;
use crate::config::LineageConfig;
use decklineage_store::{
    JsonDeckSource, JsonlBackend, Permutation, PermutationPerformance, PermutationRepository,
};
use serde_json::{Value, json};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

pub type Repository = PermutationRepository<JsonlBackend, JsonDeckSource>;

pub fn fail(err: impl Display) -> ! {
    eprintln!("error: {err}");
    std::process::exit(1);
}

pub fn or_exit<T, E: Display>(result: Result<T, E>) -> T {
    result.unwrap_or_else(|err| fail(err))
}

/// Config file values with command-line overrides applied.
pub fn load_config_or_exit(cli: &Cli) -> LineageConfig {
    let mut config = or_exit(LineageConfig::discover(cli.config.as_deref().map(Path::new)));
    if let Some(store) = &cli.store {
        config.store_path = PathBuf::from(store);
    }
    if let Some(decks) = &cli.decks {
        config.decks_path = PathBuf::from(decks);
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    or_exit(config.validate());
    config
}

/// Log to stderr; `RUST_LOG` wins over the configured level.
pub fn init_tracing(config: &LineageConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

pub fn open_repository(config: &LineageConfig) -> Repository {
    PermutationRepository::new(
        JsonlBackend::new(&config.store_path).with_lock_policy(config.lock_policy()),
        JsonDeckSource::new(&config.decks_path),
    )
}

pub fn print_json(payload: &Value) {
    println!("{}", or_exit(serde_json::to_string_pretty(payload)));
}

pub fn permutation_json(permutation: &Permutation) -> Value {
    or_exit(serde_json::to_value(permutation))
}

/// Row without cards, for listings.
pub fn permutation_row_json(permutation: &Permutation) -> Value {
    json!({
        "id": permutation.id,
        "deck_id": permutation.deck_id,
        "version_number": permutation.version_number,
        "version_name": permutation.version_name,
        "parent_permutation_id": permutation.parent_permutation_id,
        "content_hash": permutation.content_hash,
        "card_count": permutation.cards.len(),
        "created_at": permutation.created_at.to_rfc3339(),
    })
}

pub fn performance_json(performance: &PermutationPerformance) -> Value {
    or_exit(serde_json::to_value(performance))
}

pub fn print_permutation_line(permutation: &Permutation) {
    let parent = permutation
        .parent_permutation_id
        .map(|id| format!(" <- #{id}"))
        .unwrap_or_default();
    println!(
        "  - #{} {} [{}]{} {}",
        permutation.id,
        permutation.label(),
        permutation.content_hash.short(),
        parent,
        permutation.created_at.to_rfc3339()
    );
}

pub fn print_permutation_detail(permutation: &Permutation) {
    println!("  Permutation: #{}", permutation.id);
    println!("  Deck: {}", permutation.deck_id);
    println!(
        "  Version: {} ({})",
        permutation.version_number,
        permutation.label()
    );
    if let Some(parent) = permutation.parent_permutation_id {
        println!("  Parent: #{parent}");
    }
    println!("  Hash: {}", permutation.content_hash);
    if let Some(summary) = &permutation.change_summary {
        println!("  Summary: {summary}");
    }
    println!("  Created: {}", permutation.created_at.to_rfc3339());
    println!("  Cards: {}", permutation.cards.len());
    for item in &permutation.cards {
        println!("    {}x {} ({})", item.quantity, item.card_id, item.board);
    }
}

pub fn print_performance_line(performance: &PermutationPerformance) {
    println!(
        "  - #{} v{} matches {}/{} ({:.1}%) games {}/{} ({:.1}%)",
        performance.permutation_id,
        performance.version_number,
        performance.matches_won,
        performance.matches_played,
        performance.match_win_rate * 100.0,
        performance.games_won,
        performance.games_played,
        performance.game_win_rate * 100.0
    );
}
