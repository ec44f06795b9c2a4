use clap::{Parser, Subcommand};
use decklineage_store::PermutationId;

#[derive(Parser)]
#[command(
    name = "decklineage",
    about = "Decklineage: content-addressed version history for decks",
    version
)]
pub struct Cli {
    /// Path to config TOML (defaults to .decklineage/config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Path to permutation store JSONL (overrides config)
    #[arg(long, global = true)]
    pub store: Option<String>,

    /// Path to live decks JSON (overrides config)
    #[arg(long, global = true)]
    pub decks: Option<String>,

    /// Log filter when RUST_LOG is unset (overrides config)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record the deck's live contents as a permutation and make it current
    Snapshot {
        /// Deck ID
        deck: String,

        /// Version name (kept only if this content is new)
        #[arg(long)]
        name: Option<String>,

        /// Change summary (kept only if this content is new)
        #[arg(long)]
        summary: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Insert an explicit permutation from a JSON file
    Import {
        /// Path to permutation JSON (`deck_id`, `cards`, optional labels)
        file: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List a deck's permutations by version number
    List {
        /// Deck ID
        deck: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one permutation with its cards
    Show {
        /// Permutation ID
        id: PermutationId,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Find a deck's permutation by content hash
    Find {
        /// Deck ID
        deck: String,

        /// Content hash (64 hex chars)
        hash: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the most recently created permutation of a deck
    Latest {
        /// Deck ID
        deck: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the version number the next new permutation would receive
    NextVersion {
        /// Deck ID
        deck: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a deck's current permutation (latest when no pointer is set)
    Current {
        /// Deck ID
        deck: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Point a deck at one of its permutations
    SetCurrent {
        /// Deck ID
        deck: String,

        /// Permutation ID
        id: PermutationId,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare two permutations
    Diff {
        /// Base permutation ID
        from: PermutationId,

        /// Target permutation ID
        to: PermutationId,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Attribute a match result to a permutation
    RecordMatch {
        /// Permutation ID
        id: PermutationId,

        /// The match was won
        #[arg(long)]
        won: bool,

        /// Games won within the match
        #[arg(long, default_value_t = 0)]
        games_won: u32,

        /// Games lost within the match
        #[arg(long, default_value_t = 0)]
        games_lost: u32,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show performance of one permutation, or of every version of a deck
    Performance {
        /// Deck ID (all versions)
        #[arg(required_unless_present = "id", conflicts_with = "id")]
        deck: Option<String>,

        /// Single permutation ID
        #[arg(long)]
        id: Option<PermutationId>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Walk a permutation's parent chain back to its root
    Lineage {
        /// Permutation ID
        id: PermutationId,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete one permutation (children keep existing as roots)
    Delete {
        /// Permutation ID
        id: PermutationId,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete every permutation of a deck
    DeleteDeck {
        /// Deck ID
        deck: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
