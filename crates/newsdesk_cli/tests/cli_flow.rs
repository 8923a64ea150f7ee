use std::path::Path;
use std::process::{Command, Output};

fn newsdesk(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_newsdesk"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("NEWSDESK_DB_PATH")
        .env_remove("NEWSDESK_LOG_LEVEL")
        .output()
        .expect("newsdesk binary should run")
}

fn write_config(dir: &Path) -> std::path::PathBuf {
    let config = serde_json::json!({
        "db_path": dir.join("newsdesk.sqlite3"),
        "object_root": dir.join("objects"),
        "public_base_url": "https://cdn.example.test",
        "editors": ["editor@example.com"],
    });
    let path = dir.join("newsdesk.json");
    std::fs::write(&path, config.to_string()).unwrap();
    path
}

#[test]
fn add_list_and_delete_round_through_the_binary() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let image = dir.path().join("concert.png");
    std::fs::write(&image, b"png").unwrap();

    let added = newsdesk(
        &config,
        &[
            "--user",
            "editor@example.com",
            "add",
            "--headline",
            "Concert",
            "--content",
            "Main hall",
            "--image",
            image.to_str().unwrap(),
            "--event",
        ],
    );
    assert!(added.status.success(), "{added:?}");
    let stdout = String::from_utf8(added.stdout).unwrap();
    let id = stdout
        .trim()
        .strip_prefix("created event ")
        .expect("add should print the created id")
        .to_string();

    let listed = newsdesk(&config, &["list", "--events", "--json"]);
    assert!(listed.status.success());
    let value: serde_json::Value = serde_json::from_slice(&listed.stdout).unwrap();
    assert_eq!(value["events"][0]["id"], id.as_str());
    assert_eq!(value["events"][0]["Headline"], "Concert");
    assert!(value.get("news").is_none());

    let deleted = newsdesk(&config, &["--user", "editor@example.com", "delete", &id]);
    assert!(deleted.status.success(), "{deleted:?}");
    assert_eq!(
        String::from_utf8(deleted.stdout).unwrap().trim(),
        format!("deleted {id}")
    );
}

#[test]
fn mutations_without_sign_in_fail() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let output = newsdesk(&config, &["delete", "missing"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("sign in required"));
}

#[test]
fn unknown_editor_gets_sign_in_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let output = newsdesk(&config, &["--user", "guest@example.com", "list"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("sign-in failed"));
}
