use crate::support::{Repository, or_exit, print_json};
use decklineage_store::PermutationId;
use serde_json::json;

pub fn run(repo: &Repository, from: PermutationId, to: PermutationId, json_output: bool) {
    let diff = or_exit(repo.get_diff(from, to));

    if json_output {
        print_json(&json!({
            "action": "diff",
            "diff": or_exit(serde_json::to_value(&diff))
        }));
        return;
    }

    println!("decklineage diff\n  From: #{from}\n  To: #{to}");
    if diff.is_empty() {
        println!("  (identical)");
        return;
    }
    for item in &diff.added_cards {
        println!("  + {}x {} ({})", item.quantity, item.card_id, item.board);
    }
    for item in &diff.removed_cards {
        println!("  - {}x {} ({})", item.quantity, item.card_id, item.board);
    }
    for change in &diff.changed_cards {
        println!(
            "  ~ {} ({}): {} -> {} ({:+})",
            change.card_id,
            change.board,
            change.old_quantity,
            change.new_quantity,
            change.delta()
        );
    }
}
