use crate::support::{Repository, or_exit, permutation_json, print_json, print_permutation_detail};
use decklineage_store::PermutationId;
use serde_json::json;

pub fn run_current(repo: &Repository, deck: String, json_output: bool) {
    let current = or_exit(repo.get_current(&deck));

    if json_output {
        print_json(&json!({
            "action": "current",
            "deck_id": deck,
            "permutation": current.as_ref().map(permutation_json)
        }));
    } else {
        println!("decklineage current\n  Deck: {deck}");
        match &current {
            Some(permutation) => print_permutation_detail(permutation),
            None => println!("  (no permutations)"),
        }
    }
}

pub fn run_set_current(repo: &Repository, deck: String, id: PermutationId, json_output: bool) {
    or_exit(repo.set_current(&deck, id));

    if json_output {
        print_json(&json!({
            "action": "set-current",
            "deck_id": deck,
            "permutation_id": id
        }));
    } else {
        println!("decklineage set-current\n  Deck: {deck}\n  Current: #{id}");
    }
}
