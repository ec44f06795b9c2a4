use crate::support::{
    Repository, fail, or_exit, permutation_json, permutation_row_json, print_json,
    print_permutation_detail, print_permutation_line,
};
use decklineage_kernel::ContentHash;
use decklineage_store::{NewPermutation, PermutationId};
use serde_json::json;

pub fn run_snapshot(
    repo: &Repository,
    deck: String,
    name: Option<String>,
    summary: Option<String>,
    json_output: bool,
) {
    let snapshot = or_exit(repo.snapshot_current_state(&deck, name, summary));
    let permutation = &snapshot.permutation;

    if json_output {
        print_json(&json!({
            "action": "snapshot",
            "outcome": snapshot.outcome.as_str(),
            "permutation": permutation_json(permutation)
        }));
    } else {
        println!(
            "decklineage snapshot\n  Deck: {}\n  Permutation: #{} {} ({})\n  Hash: {}",
            deck,
            permutation.id,
            permutation.label(),
            snapshot.outcome.as_str(),
            permutation.content_hash
        );
    }
}

pub fn run_import(repo: &Repository, file: String, json_output: bool) {
    let raw = std::fs::read_to_string(&file)
        .unwrap_or_else(|e| fail(format!("failed to read {file}: {e}")));
    let new: NewPermutation =
        serde_json::from_str(&raw).unwrap_or_else(|e| fail(format!("failed to parse {file}: {e}")));
    let permutation = or_exit(repo.create(new));

    if json_output {
        print_json(&json!({
            "action": "import",
            "permutation": permutation_json(&permutation)
        }));
    } else {
        println!(
            "decklineage import\n  Deck: {}\n  Permutation: #{} {}\n  Hash: {}",
            permutation.deck_id,
            permutation.id,
            permutation.label(),
            permutation.content_hash
        );
    }
}

pub fn run_list(repo: &Repository, deck: String, json_output: bool) {
    let rows = or_exit(repo.get_by_deck(&deck));

    if json_output {
        let items = rows.iter().map(permutation_row_json).collect::<Vec<_>>();
        print_json(&json!({
            "action": "list",
            "deck_id": deck,
            "count": items.len(),
            "items": items
        }));
    } else {
        println!("decklineage list\n  Deck: {}\n  Count: {}", deck, rows.len());
        for permutation in &rows {
            print_permutation_line(permutation);
        }
    }
}

pub fn run_show(repo: &Repository, id: PermutationId, json_output: bool) {
    let permutation = or_exit(repo.get_by_id(id))
        .unwrap_or_else(|| fail(format!("permutation not found: {id}")));

    if json_output {
        print_json(&json!({
            "action": "show",
            "permutation": permutation_json(&permutation)
        }));
    } else {
        println!("decklineage show");
        print_permutation_detail(&permutation);
    }
}

pub fn run_find(repo: &Repository, deck: String, hash: String, json_output: bool) {
    let hash = ContentHash(hash.trim().to_ascii_lowercase());
    let found = or_exit(repo.get_by_hash(&deck, &hash));

    if json_output {
        print_json(&json!({
            "action": "find",
            "deck_id": deck,
            "content_hash": hash,
            "permutation": found.as_ref().map(permutation_json)
        }));
    } else {
        println!("decklineage find\n  Deck: {deck}\n  Hash: {hash}");
        match &found {
            Some(permutation) => print_permutation_line(permutation),
            None => println!("  (no permutation)"),
        }
    }
}

pub fn run_latest(repo: &Repository, deck: String, json_output: bool) {
    let latest = or_exit(repo.get_latest(&deck));

    if json_output {
        print_json(&json!({
            "action": "latest",
            "deck_id": deck,
            "permutation": latest.as_ref().map(permutation_json)
        }));
    } else {
        println!("decklineage latest\n  Deck: {deck}");
        match &latest {
            Some(permutation) => print_permutation_line(permutation),
            None => println!("  (no permutations)"),
        }
    }
}

pub fn run_next_version(repo: &Repository, deck: String, json_output: bool) {
    let next = or_exit(repo.get_next_version_number(&deck));

    if json_output {
        print_json(&json!({
            "action": "next-version",
            "deck_id": deck,
            "version_number": next
        }));
    } else {
        println!("decklineage next-version\n  Deck: {deck}\n  Next: {next}");
    }
}

pub fn run_lineage(repo: &Repository, id: PermutationId, json_output: bool) {
    let chain = or_exit(repo.lineage(id));

    if json_output {
        let items = chain.iter().map(permutation_row_json).collect::<Vec<_>>();
        print_json(&json!({
            "action": "lineage",
            "permutation_id": id,
            "depth": items.len(),
            "items": items
        }));
    } else {
        println!("decklineage lineage\n  From: #{id}\n  Depth: {}", chain.len());
        for permutation in &chain {
            print_permutation_line(permutation);
        }
    }
}

pub fn run_delete(repo: &Repository, id: PermutationId, json_output: bool) {
    let removed = or_exit(repo.delete(id));

    if json_output {
        print_json(&json!({
            "action": "delete",
            "permutation": permutation_row_json(&removed.permutation),
            "orphaned": removed.orphaned,
            "cleared_current": removed.cleared_current
        }));
    } else {
        println!(
            "decklineage delete\n  Deleted: #{} {}\n  Orphaned: {}\n  Cleared current: {}",
            removed.permutation.id,
            removed.permutation.label(),
            removed.orphaned.len(),
            removed.cleared_current
        );
    }
}

pub fn run_delete_deck(repo: &Repository, deck: String, json_output: bool) {
    let removed = or_exit(repo.delete_deck(&deck));

    if json_output {
        print_json(&json!({
            "action": "delete-deck",
            "deck_id": deck,
            "removed": removed
        }));
    } else {
        println!("decklineage delete-deck\n  Deck: {deck}\n  Removed: {removed}");
    }
}
