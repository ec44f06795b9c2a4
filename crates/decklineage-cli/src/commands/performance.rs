use crate::support::{
    Repository, fail, or_exit, performance_json, print_json, print_performance_line,
};
use decklineage_store::PermutationId;
use serde_json::json;

pub fn run_record_match(
    repo: &Repository,
    id: PermutationId,
    won: bool,
    games_won: u32,
    games_lost: u32,
    json_output: bool,
) {
    let performance = or_exit(repo.update_performance(id, won, games_won, games_lost));

    if json_output {
        print_json(&json!({
            "action": "record-match",
            "performance": performance_json(&performance)
        }));
    } else {
        println!(
            "decklineage record-match\n  Permutation: #{id}\n  Result: {} ({games_won}-{games_lost})",
            if won { "won" } else { "lost" }
        );
        print_performance_line(&performance);
    }
}

pub fn run(repo: &Repository, deck: Option<String>, id: Option<PermutationId>, json_output: bool) {
    let (scope, rows) = match (deck, id) {
        (_, Some(id)) => {
            let performance = or_exit(repo.get_performance(id))
                .unwrap_or_else(|| fail(format!("permutation not found: {id}")));
            (json!({ "permutation_id": id }), vec![performance])
        }
        (Some(deck), None) => {
            let rows = or_exit(repo.get_all_performance(&deck));
            (json!({ "deck_id": deck }), rows)
        }
        (None, None) => fail("either a deck ID or --id is required"),
    };

    if json_output {
        let items = rows.iter().map(performance_json).collect::<Vec<_>>();
        print_json(&json!({
            "action": "performance",
            "scope": scope,
            "count": items.len(),
            "items": items
        }));
    } else {
        println!("decklineage performance\n  Count: {}", rows.len());
        for performance in &rows {
            print_performance_line(performance);
        }
    }
}
