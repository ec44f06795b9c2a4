//! Decklineage CLI: the `decklineage` command.

mod cli;
mod commands;
mod config;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let config = support::load_config_or_exit(&cli);
    support::init_tracing(&config);
    let repo = support::open_repository(&config);

    match cli.command {
        Commands::Snapshot {
            deck,
            name,
            summary,
            json,
        } => commands::version::run_snapshot(&repo, deck, name, summary, json),

        Commands::Import { file, json } => commands::version::run_import(&repo, file, json),

        Commands::List { deck, json } => commands::version::run_list(&repo, deck, json),

        Commands::Show { id, json } => commands::version::run_show(&repo, id, json),

        Commands::Find { deck, hash, json } => {
            commands::version::run_find(&repo, deck, hash, json)
        }

        Commands::Latest { deck, json } => commands::version::run_latest(&repo, deck, json),

        Commands::NextVersion { deck, json } => {
            commands::version::run_next_version(&repo, deck, json)
        }

        Commands::Current { deck, json } => commands::current::run_current(&repo, deck, json),

        Commands::SetCurrent { deck, id, json } => {
            commands::current::run_set_current(&repo, deck, id, json)
        }

        Commands::Diff { from, to, json } => commands::diff::run(&repo, from, to, json),

        Commands::RecordMatch {
            id,
            won,
            games_won,
            games_lost,
            json,
        } => commands::performance::run_record_match(&repo, id, won, games_won, games_lost, json),

        Commands::Performance { deck, id, json } => {
            commands::performance::run(&repo, deck, id, json)
        }

        Commands::Lineage { id, json } => commands::version::run_lineage(&repo, id, json),

        Commands::Delete { id, json } => commands::version::run_delete(&repo, id, json),

        Commands::DeleteDeck { deck, json } => {
            commands::version::run_delete_deck(&repo, deck, json)
        }
    }
}
