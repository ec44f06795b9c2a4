use chrono::{DateTime, Duration, TimeZone, Utc};
use decklineage_kernel::{CardChange, ContentHash, DeckItem};
use decklineage_store::{
    InMemoryBackend, InMemoryDeckSource, LineageError, ManualClock, NewPermutation,
    PermutationId, PermutationRepository, SnapshotOutcome,
};
use std::sync::Arc;

type Repo = PermutationRepository<InMemoryBackend, Arc<InMemoryDeckSource>, Arc<ManualClock>>;

struct Fixture {
    repo: Repo,
    source: Arc<InMemoryDeckSource>,
    clock: Arc<ManualClock>,
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
        .single()
        .expect("fixed time")
}

fn fixture() -> Fixture {
    let source = Arc::new(InMemoryDeckSource::new());
    let clock = Arc::new(ManualClock::new(start()));
    let repo = PermutationRepository::with_clock(
        InMemoryBackend::new(),
        Arc::clone(&source),
        Arc::clone(&clock),
    );
    Fixture {
        repo,
        source,
        clock,
    }
}

fn state_a() -> Vec<DeckItem> {
    vec![
        DeckItem::main(100, 4),
        DeckItem::main(101, 4),
        DeckItem::main(102, 3),
    ]
}

fn state_b() -> Vec<DeckItem> {
    vec![
        DeckItem::main(100, 4),
        DeckItem::main(101, 2),
        DeckItem::main(103, 3),
    ]
}

#[test]
fn snapshots_chain_versions_and_diff_between_them() {
    let fx = fixture();
    fx.source.set_deck("deck-a", state_a());
    let p1 = fx
        .repo
        .create_from_current_state("deck-a", None, None)
        .expect("first snapshot");
    assert_eq!(p1.version_number, 1);
    assert_eq!(p1.parent_permutation_id, None);

    fx.clock.advance(Duration::minutes(1));
    fx.source.set_deck("deck-a", state_b());
    let p2 = fx
        .repo
        .create_from_current_state("deck-a", None, None)
        .expect("second snapshot");
    assert_eq!(p2.version_number, 2);
    assert_eq!(p2.parent_permutation_id, Some(p1.id));
    assert_eq!(p2.created_at, start() + Duration::minutes(1));

    let diff = fx.repo.get_diff(p1.id, p2.id).expect("diff");
    assert_eq!(diff.added_cards, vec![DeckItem::main(103, 3)]);
    assert_eq!(diff.removed_cards, vec![DeckItem::main(102, 3)]);
    assert_eq!(
        diff.changed_cards,
        vec![CardChange {
            card_id: 101,
            board: "main".to_string(),
            old_quantity: 4,
            new_quantity: 2,
        }]
    );

    let current = fx
        .repo
        .get_current("deck-a")
        .expect("current")
        .expect("deck has a current permutation");
    assert_eq!(current.id, p2.id);
}

#[test]
fn same_state_twice_reuses_row_and_keeps_first_label() {
    let fx = fixture();
    fx.source.set_deck("deck-a", state_a());
    let first = fx
        .repo
        .snapshot_current_state("deck-a", Some("v1".to_string()), None)
        .expect("first snapshot");
    let second = fx
        .repo
        .snapshot_current_state("deck-a", Some("v2".to_string()), None)
        .expect("second snapshot");

    assert_eq!(first.outcome, SnapshotOutcome::Created);
    assert_eq!(second.outcome, SnapshotOutcome::Reused);
    assert_eq!(first.permutation.id, second.permutation.id);
    assert_eq!(second.permutation.version_name.as_deref(), Some("v1"));
    assert_eq!(fx.repo.get_by_deck("deck-a").expect("list").len(), 1);
}

#[test]
fn input_order_does_not_change_identity() {
    let fx = fixture();
    fx.source.set_deck("deck-a", state_a());
    let first = fx
        .repo
        .create_from_current_state("deck-a", None, None)
        .expect("snapshot");

    let mut reversed = state_a();
    reversed.reverse();
    fx.source.set_deck("deck-a", reversed);
    let again = fx
        .repo
        .create_from_current_state("deck-a", None, None)
        .expect("snapshot");
    assert_eq!(first.id, again.id);
}

#[test]
fn returning_to_earlier_state_repoints_without_new_row() {
    let fx = fixture();
    fx.source.set_deck("deck-a", state_a());
    let p1 = fx
        .repo
        .create_from_current_state("deck-a", None, None)
        .expect("p1");
    fx.source.set_deck("deck-a", state_b());
    let p2 = fx
        .repo
        .create_from_current_state("deck-a", None, None)
        .expect("p2");
    fx.source.set_deck("deck-a", state_a());
    let back = fx
        .repo
        .create_from_current_state("deck-a", None, None)
        .expect("back to p1");

    assert_eq!(back.id, p1.id);
    assert_eq!(back.version_number, 1);
    assert_eq!(
        fx.repo
            .get_current("deck-a")
            .expect("current")
            .map(|p| p.id),
        Some(p1.id)
    );
    assert_eq!(fx.repo.get_next_version_number("deck-a").expect("next"), 3);
    assert_ne!(p1.id, p2.id);
}

#[test]
fn same_content_in_two_decks_is_two_permutations() {
    let fx = fixture();
    fx.source.set_deck("deck-a", state_a());
    fx.source.set_deck("deck-b", state_a());
    let a = fx
        .repo
        .create_from_current_state("deck-a", None, None)
        .expect("deck-a");
    let b = fx
        .repo
        .create_from_current_state("deck-b", None, None)
        .expect("deck-b");

    assert_ne!(a.id, b.id);
    assert_eq!(a.content_hash, b.content_hash);
    assert_eq!(b.version_number, 1);
}

#[test]
fn empty_deck_hashes_like_empty_input() {
    let fx = fixture();
    fx.source.set_deck("deck-a", Vec::new());
    let p = fx
        .repo
        .create_from_current_state("deck-a", None, None)
        .expect("empty snapshot");
    assert_eq!(
        p.content_hash.as_str(),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
    assert!(p.cards.is_empty());
}

#[test]
fn snapshot_of_unknown_deck_is_not_found() {
    let fx = fixture();
    let err = fx
        .repo
        .create_from_current_state("ghost", None, None)
        .expect_err("missing deck");
    assert!(matches!(err, LineageError::DeckNotFound(ref id) if id == "ghost"));
    assert!(err.is_not_found());
}

#[test]
fn invalid_live_items_are_rejected_before_storage() {
    let fx = fixture();
    fx.source
        .set_deck("deck-a", vec![DeckItem::main(1, 4), DeckItem::main(1, 2)]);
    let err = fx
        .repo
        .create_from_current_state("deck-a", None, None)
        .expect_err("duplicate line");
    assert!(err.is_validation());
    assert!(fx.repo.get_by_deck("deck-a").expect("list").is_empty());
}

#[test]
fn set_current_rejects_foreign_permutation_and_keeps_pointer() {
    let fx = fixture();
    fx.source.set_deck("deck-a", state_a());
    fx.source.set_deck("deck-b", state_b());
    let a = fx
        .repo
        .create_from_current_state("deck-a", None, None)
        .expect("deck-a");
    let b = fx
        .repo
        .create_from_current_state("deck-b", None, None)
        .expect("deck-b");

    let err = fx
        .repo
        .set_current("deck-a", b.id)
        .expect_err("foreign permutation");
    assert!(matches!(
        err,
        LineageError::OwnershipViolation { ref owner_deck_id, .. } if owner_deck_id == "deck-b"
    ));
    assert_eq!(
        fx.repo
            .get_current("deck-a")
            .expect("current")
            .map(|p| p.id),
        Some(a.id)
    );
}

#[test]
fn set_current_checks_deck_and_permutation_existence() {
    let fx = fixture();
    fx.source.set_deck("deck-a", state_a());
    fx.repo
        .create_from_current_state("deck-a", None, None)
        .expect("snapshot");

    let err = fx
        .repo
        .set_current("ghost", PermutationId(1))
        .expect_err("missing deck");
    assert!(matches!(err, LineageError::DeckNotFound(_)));

    let err = fx
        .repo
        .set_current("deck-a", PermutationId(99))
        .expect_err("missing permutation");
    assert!(matches!(err, LineageError::PermutationNotFound(PermutationId(99))));
}

#[test]
fn current_falls_back_to_latest_created() {
    let fx = fixture();
    fx.source.set_deck("deck-a", state_a());
    let base = fx
        .repo
        .create(NewPermutation::new("deck-a", state_a()))
        .expect("import v1");
    fx.clock.advance(Duration::hours(1));
    let newer = fx
        .repo
        .create(NewPermutation {
            parent_permutation_id: Some(base.id),
            ..NewPermutation::new("deck-a", state_b())
        })
        .expect("import v2");

    let current = fx
        .repo
        .get_current("deck-a")
        .expect("current")
        .expect("fallback to latest");
    assert_eq!(current.id, newer.id);
    assert_eq!(
        fx.repo
            .get_latest("deck-a")
            .expect("latest")
            .map(|p| p.id),
        Some(newer.id)
    );

    fx.repo.set_current("deck-a", base.id).expect("repoint");
    assert_eq!(
        fx.repo
            .get_current("deck-a")
            .expect("current")
            .map(|p| p.id),
        Some(base.id)
    );
}

#[test]
fn explicit_create_checks_hash_and_duplicates() {
    let fx = fixture();
    fx.source.set_deck("deck-a", state_a());

    let err = fx
        .repo
        .create(NewPermutation {
            content_hash: Some(ContentHash("0".repeat(64))),
            ..NewPermutation::new("deck-a", state_a())
        })
        .expect_err("hash mismatch");
    assert!(matches!(err, LineageError::ContentHashMismatch { .. }));

    let stored = fx
        .repo
        .create(NewPermutation {
            content_hash: Some(ContentHash::of_items(&state_a())),
            version_name: Some("imported".to_string()),
            ..NewPermutation::new("deck-a", state_a())
        })
        .expect("matching hash");
    assert_eq!(stored.version_number, 1);

    let err = fx
        .repo
        .create(NewPermutation::new("deck-a", state_a()))
        .expect_err("duplicate content");
    assert!(matches!(
        err,
        LineageError::DuplicateContent { existing, .. } if existing == stored.id
    ));

    let err = fx
        .repo
        .create(NewPermutation {
            version_number: Some(1),
            ..NewPermutation::new("deck-a", state_b())
        })
        .expect_err("version reuse");
    assert!(err.is_validation());
}

#[test]
fn performance_accumulates_per_permutation() {
    let fx = fixture();
    fx.source.set_deck("deck-a", state_a());
    let p = fx
        .repo
        .create_from_current_state("deck-a", None, None)
        .expect("snapshot");

    fx.repo
        .update_performance(p.id, true, 2, 1)
        .expect("first match");
    fx.clock.advance(Duration::minutes(30));
    fx.repo
        .update_performance(p.id, false, 1, 2)
        .expect("second match");

    let perf = fx
        .repo
        .get_performance(p.id)
        .expect("performance")
        .expect("permutation exists");
    assert_eq!(perf.matches_played, 2);
    assert_eq!(perf.matches_won, 1);
    assert_eq!(perf.games_played, 6);
    assert_eq!(perf.games_won, 3);
    assert_eq!(perf.match_win_rate, 0.5);
    assert_eq!(perf.game_win_rate, 0.5);
    assert_eq!(perf.last_played_at, Some(start() + Duration::minutes(30)));

    let err = fx
        .repo
        .update_performance(PermutationId(42), true, 2, 0)
        .expect_err("missing permutation");
    assert!(err.is_not_found());
}

#[test]
fn all_performance_is_ordered_by_version() {
    let fx = fixture();
    fx.source.set_deck("deck-a", state_a());
    let p1 = fx
        .repo
        .create_from_current_state("deck-a", None, None)
        .expect("p1");
    fx.source.set_deck("deck-a", state_b());
    let p2 = fx
        .repo
        .create_from_current_state("deck-a", None, None)
        .expect("p2");
    fx.repo
        .update_performance(p2.id, true, 2, 0)
        .expect("match");

    let all = fx.repo.get_all_performance("deck-a").expect("all");
    let ids: Vec<PermutationId> = all.iter().map(|perf| perf.permutation_id).collect();
    assert_eq!(ids, vec![p1.id, p2.id]);
    assert_eq!(all[0].match_win_rate, 0.0);
    assert_eq!(all[1].match_win_rate, 1.0);
}

#[test]
fn diff_of_missing_permutation_is_not_found() {
    let fx = fixture();
    fx.source.set_deck("deck-a", state_a());
    let p = fx
        .repo
        .create_from_current_state("deck-a", None, None)
        .expect("snapshot");
    let err = fx
        .repo
        .get_diff(p.id, PermutationId(77))
        .expect_err("missing target");
    assert!(matches!(err, LineageError::PermutationNotFound(PermutationId(77))));

    let same = fx.repo.get_diff(p.id, p.id).expect("self diff");
    assert!(same.is_empty());
}

#[test]
fn delete_orphans_children_and_never_reuses_versions() {
    let fx = fixture();
    fx.source.set_deck("deck-a", state_a());
    let p1 = fx
        .repo
        .create_from_current_state("deck-a", None, None)
        .expect("p1");
    fx.source.set_deck("deck-a", state_b());
    let p2 = fx
        .repo
        .create_from_current_state("deck-a", None, None)
        .expect("p2");

    let removed = fx.repo.delete(p2.id).expect("delete current");
    assert!(removed.cleared_current);
    assert_eq!(
        fx.repo
            .get_current("deck-a")
            .expect("current")
            .map(|p| p.id),
        Some(p1.id)
    );

    fx.source.set_deck("deck-a", vec![DeckItem::main(200, 1)]);
    let p3 = fx
        .repo
        .create_from_current_state("deck-a", None, None)
        .expect("p3");
    assert_eq!(p3.version_number, 3);
    assert!(p3.id > p2.id);

    let removed = fx.repo.delete(p1.id).expect("delete root");
    assert_eq!(removed.orphaned, vec![p3.id]);
    let p3 = fx
        .repo
        .get_by_id(p3.id)
        .expect("lookup")
        .expect("child kept");
    assert!(p3.is_root());

    let err = fx.repo.delete(p1.id).expect_err("already deleted");
    assert!(err.is_not_found());
}

#[test]
fn lineage_walks_parents_newest_first() {
    let fx = fixture();
    let mut ids = Vec::new();
    for card in 1..=3 {
        fx.source.set_deck("deck-a", vec![DeckItem::main(card, 4)]);
        let p = fx
            .repo
            .create_from_current_state("deck-a", None, None)
            .expect("snapshot");
        ids.push(p.id);
    }

    let chain: Vec<PermutationId> = fx
        .repo
        .lineage(ids[2])
        .expect("lineage")
        .iter()
        .map(|p| p.id)
        .collect();
    ids.reverse();
    assert_eq!(chain, ids);
}

#[test]
fn delete_deck_removes_rows_and_pointer() {
    let fx = fixture();
    fx.source.set_deck("deck-a", state_a());
    fx.source.set_deck("deck-b", state_a());
    fx.repo
        .create_from_current_state("deck-a", None, None)
        .expect("deck-a");
    fx.source.set_deck("deck-a", state_b());
    fx.repo
        .create_from_current_state("deck-a", None, None)
        .expect("deck-a v2");
    let kept = fx
        .repo
        .create_from_current_state("deck-b", None, None)
        .expect("deck-b");

    assert_eq!(fx.repo.delete_deck("deck-a").expect("delete deck"), 2);
    assert!(fx.repo.get_by_deck("deck-a").expect("list").is_empty());
    assert!(fx.repo.get_current("deck-a").expect("current").is_none());
    assert_eq!(
        fx.repo
            .get_by_hash("deck-b", &kept.content_hash)
            .expect("by hash")
            .map(|p| p.id),
        Some(kept.id)
    );
    assert_eq!(fx.repo.delete_deck("deck-a").expect("idempotent"), 0);
}

#[test]
fn snapshot_after_delete_deck_continues_numbering() {
    let fx = fixture();
    fx.source.set_deck("deck-a", state_a());
    let first = fx
        .repo
        .create_from_current_state("deck-a", None, None)
        .expect("v1");
    fx.repo.delete_deck("deck-a").expect("delete deck");
    assert_eq!(fx.repo.get_next_version_number("deck-a").expect("next"), 2);

    let again = fx
        .repo
        .create_from_current_state("deck-a", None, None)
        .expect("snapshot after delete");
    assert_eq!(again.version_number, 2);
    assert_ne!(again.id, first.id);
    assert_eq!(again.parent_permutation_id, None);
    assert_eq!(
        fx.repo.get_current("deck-a").expect("current").map(|p| p.id),
        Some(again.id)
    );
}

#[test]
fn version_numbers_never_repeat_at_the_top_of_the_range() {
    let fx = fixture();
    fx.source.set_deck("deck-a", state_a());
    let top = fx
        .repo
        .create(NewPermutation {
            version_number: Some(u32::MAX),
            ..NewPermutation::new("deck-a", state_a())
        })
        .expect("explicit top version");
    assert_eq!(top.version_number, u32::MAX);

    let err = fx
        .repo
        .get_next_version_number("deck-a")
        .expect_err("no number left");
    assert!(err.is_validation(), "{err:?}");

    fx.source.set_deck("deck-a", state_b());
    let err = fx
        .repo
        .create_from_current_state("deck-a", None, None)
        .expect_err("new content needs a new number");
    assert!(err.is_validation(), "{err:?}");

    // Content already recorded is still adopted.
    fx.source.set_deck("deck-a", state_a());
    let reused = fx
        .repo
        .create_from_current_state("deck-a", None, None)
        .expect("recorded content is reused");
    assert_eq!(reused.id, top.id);

    let versions: Vec<u32> = fx
        .repo
        .get_by_deck("deck-a")
        .expect("list")
        .iter()
        .map(|p| p.version_number)
        .collect();
    assert_eq!(versions, vec![u32::MAX]);
}
