use serde_json::Value;
use sha2::{Digest, Sha256};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "decklineage-cli-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Workspace with a decks file and a store path, driven through `--config`.
struct Workspace {
    tmp: TempDirGuard,
}

impl Workspace {
    fn new(prefix: &str) -> Self {
        let tmp = TempDirGuard::new(prefix);
        let config = format!(
            "store_path = \"{}\"\ndecks_path = \"{}\"\nlock_retry_attempts = 0\nlock_retry_delay_ms = 0\n",
            tmp.path().join("permutations.jsonl").display(),
            tmp.path().join("decks.json").display(),
        );
        fs::write(tmp.path().join("config.toml"), config).expect("config should write");
        Self { tmp }
    }

    fn set_decks(&self, decks: &str) {
        fs::write(self.tmp.path().join("decks.json"), decks).expect("decks should write");
    }

    fn store_path(&self) -> PathBuf {
        self.tmp.path().join("permutations.jsonl")
    }

    fn run<I, S>(&self, args: I) -> Output
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let config = self.tmp.path().join("config.toml");
        Command::new(env!("CARGO_BIN_EXE_decklineage"))
            .arg("--config")
            .arg(config)
            .args(args)
            .env_remove("RUST_LOG")
            .output()
            .expect("decklineage command should execute")
    }

    fn run_json<I, S>(&self, args: I) -> Value
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self.run(args);
        assert_success(&output);
        parse_json_stdout(&output)
    }
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn assert_failure(output: &Output) {
    if output.status.success() {
        panic!(
            "command unexpectedly succeeded\nstdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice::<Value>(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout should be valid JSON: {e}\nstdout:\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn sha256_hex(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

const STATE_A: &str = r#"{"deck-a":[
    {"card_id":102,"quantity":3,"board":"main"},
    {"card_id":100,"quantity":4,"board":"main"},
    {"card_id":101,"quantity":4,"board":"main"}
]}"#;

const STATE_B: &str = r#"{"deck-a":[
    {"card_id":100,"quantity":4,"board":"main"},
    {"card_id":101,"quantity":2,"board":"main"},
    {"card_id":103,"quantity":3,"board":"main"}
]}"#;

#[test]
fn snapshot_is_idempotent_and_hash_is_canonical() {
    let ws = Workspace::new("snapshot");
    ws.set_decks(STATE_A);

    let first = ws.run_json(["snapshot", "deck-a", "--name", "v1", "--json"]);
    assert_eq!(first["outcome"], "created");
    assert_eq!(first["permutation"]["version_number"], 1);
    assert_eq!(
        first["permutation"]["content_hash"],
        sha256_hex("100:4:main|101:4:main|102:3:main")
    );

    let second = ws.run_json(["snapshot", "deck-a", "--name", "v2", "--json"]);
    assert_eq!(second["outcome"], "reused");
    assert_eq!(second["permutation"]["id"], first["permutation"]["id"]);
    assert_eq!(second["permutation"]["version_name"], "v1");

    let list = ws.run_json(["list", "deck-a", "--json"]);
    assert_eq!(list["count"], 1);
    assert_eq!(list["deck_id"], "deck-a");
    let row = &list["items"][0];
    assert_eq!(row["id"], first["permutation"]["id"]);
    assert_eq!(row["deck_id"], first["permutation"]["deck_id"]);
    assert_eq!(row["version_number"], first["permutation"]["version_number"]);
    assert_eq!(row["content_hash"], first["permutation"]["content_hash"]);
    assert_eq!(row["card_count"], 3);
    assert!(ws.store_path().exists());
}

#[test]
fn diff_current_and_performance_round_trip() {
    let ws = Workspace::new("flow");
    ws.set_decks(STATE_A);
    let p1 = ws.run_json(["snapshot", "deck-a", "--json"])["permutation"]["id"].clone();
    ws.set_decks(STATE_B);
    let p2 = ws.run_json(["snapshot", "deck-a", "--json"])["permutation"].clone();
    assert_eq!(p2["parent_permutation_id"], p1);

    let p1 = p1.to_string();
    let p2_id = p2["id"].to_string();

    let diff = ws.run_json(["diff", p1.as_str(), p2_id.as_str(), "--json"]);
    assert_eq!(diff["diff"]["added_cards"][0]["card_id"], 103);
    assert_eq!(diff["diff"]["removed_cards"][0]["card_id"], 102);
    assert_eq!(diff["diff"]["changed_cards"][0]["old_quantity"], 4);
    assert_eq!(diff["diff"]["changed_cards"][0]["new_quantity"], 2);

    let current = ws.run_json(["current", "deck-a", "--json"]);
    assert_eq!(current["permutation"]["id"], p2["id"]);
    ws.run_json(["set-current", "deck-a", p1.as_str(), "--json"]);
    let current = ws.run_json(["current", "deck-a", "--json"]);
    assert_eq!(current["permutation"]["id"].to_string(), p1);

    ws.run_json([
        "record-match",
        p2_id.as_str(),
        "--won",
        "--games-won",
        "2",
        "--games-lost",
        "1",
        "--json",
    ]);
    ws.run_json([
        "record-match",
        p2_id.as_str(),
        "--games-won",
        "1",
        "--games-lost",
        "2",
        "--json",
    ]);
    let perf = ws.run_json(["performance", "--id", p2_id.as_str(), "--json"]);
    assert_eq!(perf["items"][0]["matches_played"], 2);
    assert_eq!(perf["items"][0]["games_played"], 6);
    assert_eq!(perf["items"][0]["match_win_rate"], 0.5);

    let all = ws.run_json(["performance", "deck-a", "--json"]);
    assert_eq!(all["count"], 2);
}

#[test]
fn errors_exit_nonzero_with_message() {
    let ws = Workspace::new("errors");
    ws.set_decks(r#"{"deck-a":[],"deck-b":[{"card_id":1,"quantity":1,"board":"main"}]}"#);

    let output = ws.run(["snapshot", "ghost"]);
    assert_failure(&output);
    assert!(String::from_utf8_lossy(&output.stderr).contains("error: deck not found: ghost"));

    let b = ws.run_json(["snapshot", "deck-b", "--json"])["permutation"]["id"].to_string();
    ws.run_json(["snapshot", "deck-a", "--json"]);
    let output = ws.run(["set-current", "deck-a", b.as_str()]);
    assert_failure(&output);
    assert!(String::from_utf8_lossy(&output.stderr).contains("belongs to deck deck-b"));

    let output = ws.run(["show", "999"]);
    assert_failure(&output);
    assert!(String::from_utf8_lossy(&output.stderr).contains("permutation not found: 999"));
}

#[test]
fn invalid_config_is_rejected() {
    let tmp = TempDirGuard::new("bad-config");
    let config = tmp.path().join("config.toml");
    fs::write(&config, "lock_retry_attempts = 3\nlock_retry_delay_ms = 0\n")
        .expect("config should write");

    let output = Command::new(env!("CARGO_BIN_EXE_decklineage"))
        .arg("--config")
        .arg(&config)
        .args(["list", "deck-a"])
        .output()
        .expect("decklineage command should execute");
    assert_failure(&output);
    assert!(String::from_utf8_lossy(&output.stderr).contains("lock_retry_delay_ms"));
}
