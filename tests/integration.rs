//! Integration tests for the abview command-line surface

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command as AssertCommand;
use predicates::prelude::*;
use tempfile::TempDir;
use time::{Duration, OffsetDateTime};

// =============================================================================
// Test Helpers
// =============================================================================

const SAMPLE_CONTACTS: &str = r#"{
    "Ada Lovelace": {
        "phones": ["0501234567"],
        "email": "ada@example.com",
        "birthday": "10-12-1815",
        "tags": ["Math", "friends"],
        "notes": ["first programmer", "wrote notes on the engine"]
    },
    "Bob Smith": {
        "phones": ["0931112233", "0671234567"],
        "email": null,
        "birthday": null,
        "tags": ["work"],
        "notes": []
    },
    "Carol": {}
}"#;

/// Isolated config, log directory, and viewer base directory
struct TestEnv {
    temp_dir: TempDir,
    config_path: PathBuf,
    base_dir: PathBuf,
}

impl TestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let base_dir = temp_dir.path().join("viewer");
        fs::create_dir_all(&base_dir).unwrap();

        let log_dir = temp_dir.path().join("logs");
        fs::write(
            &config_path,
            format!("[log]\nlevel = \"debug\"\ndir = {:?}\n", log_dir.to_str().unwrap()),
        )
        .unwrap();

        Self {
            temp_dir,
            config_path,
            base_dir,
        }
    }

    fn with_contacts(body: &str) -> Self {
        let env = Self::new();
        env.write(&env.base_dir.join("contacts.json"), body);
        env
    }

    fn write(&self, path: &Path, body: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, body).unwrap();
    }

    fn abview(&self) -> AssertCommand {
        let mut cmd = abview_cmd();
        cmd.args([
            "--config",
            self.config_path.to_str().unwrap(),
            "--base-dir",
            self.base_dir.to_str().unwrap(),
        ]);
        cmd
    }
}

/// Get the abview binary command
fn abview_cmd() -> AssertCommand {
    AssertCommand::cargo_bin("abview").unwrap()
}

fn stdout_of(cmd: &mut AssertCommand) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).unwrap()
}

// =============================================================================
// list
// =============================================================================

#[test]
fn test_list_prints_status_and_rows_in_file_order() {
    let env = TestEnv::with_contacts(SAMPLE_CONTACTS);
    let stdout = stdout_of(env.abview().arg("list"));
    let lines: Vec<&str> = stdout.lines().collect();

    assert_eq!(
        lines,
        vec![
            "3 contacts",
            "Ada Lovelace\t0501234567\tada@example.com\t10 Dec 1815\tMath, friends\tfirst programmer | wrote notes on the engine",
            "Bob Smith\t0931112233, 0671234567\t—\t—\twork\t—",
            "Carol\t—\t—\t—\t—\t—",
        ]
    );
}

#[test]
fn test_list_loads_records_with_unexpected_field_types() {
    let env = TestEnv::with_contacts(
        r#"{"Ada": {"email": "a@x.com"}, "Bob": {"phones": "0501234567", "email": 5}, "Cy": "note"}"#,
    );
    let stdout = stdout_of(env.abview().arg("list"));
    let lines: Vec<&str> = stdout.lines().collect();

    assert_eq!(
        lines,
        vec![
            "3 contacts",
            "Ada\t—\ta@x.com\t—\t—\t—",
            "Bob\t—\t—\t—\t—\t—",
            "Cy\t—\t—\t—\t—\t—",
        ]
    );
}

#[test]
fn test_list_query_filters_case_insensitively() {
    let env = TestEnv::with_contacts(SAMPLE_CONTACTS);
    env.abview()
        .args(["list", "  ENGINE "])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("1 contact\nAda Lovelace\t"));

    env.abview()
        .args(["list", "0671"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Bob Smith"))
        .stdout(predicate::str::contains("Ada").not());
}

#[test]
fn test_list_without_matches_reports_total() {
    let env = TestEnv::with_contacts(SAMPLE_CONTACTS);
    env.abview()
        .args(["list", "zzz"])
        .assert()
        .success()
        .stdout("0 of 3 contacts\nNo contacts match\n");
}

#[test]
fn test_list_by_tag() {
    let env = TestEnv::with_contacts(SAMPLE_CONTACTS);
    env.abview()
        .args(["list", "--tag", " MATH"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("1 contact\nAda Lovelace\t"));
}

#[test]
fn test_explicit_data_file_overrides_candidates() {
    let env = TestEnv::with_contacts(SAMPLE_CONTACTS);
    let other = env.temp_dir.path().join("elsewhere.json");
    env.write(&other, r#"{"Zed": {"phones": ["0500000000"]}}"#);

    env.abview()
        .args(["--data", other.to_str().unwrap(), "list"])
        .assert()
        .success()
        .stdout("1 contact\nZed\t0500000000\t—\t—\t—\t—\n");
}

#[test]
fn test_candidate_priority_prefers_parent_directory() {
    let env = TestEnv::with_contacts(SAMPLE_CONTACTS);
    env.write(
        &env.temp_dir.path().join("user_address_book/contacts.json"),
        r#"{"Parent Dir": {}}"#,
    );

    env.abview()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Parent Dir"))
        .stdout(predicate::str::contains("Ada Lovelace").not());
}

#[test]
fn test_invalid_candidate_is_skipped() {
    let env = TestEnv::with_contacts(SAMPLE_CONTACTS);
    env.write(&env.base_dir.join("user_address_book/contacts.json"), "[1, 2, 3]");

    env.abview()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("3 contacts\n"));
}

#[test]
fn test_missing_contacts_fails_with_guidance() {
    let env = TestEnv::new();
    env.abview()
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Contacts file not found"))
        .stderr(predicate::str::contains("Locations tried:"))
        .stderr(predicate::str::contains("test_addressbook/ex_contacts.json"));
}

// =============================================================================
// helper
// =============================================================================

#[test]
fn test_helper_edit_targets_named_contact() {
    let env = TestEnv::new();
    let stdout = stdout_of(env.abview().args(["helper", "edit", "Bob Smith"]));

    assert!(stdout.starts_with("Edit a contact\n"));
    let targeted = stdout
        .lines()
        .filter(|line| line.contains("\"Bob Smith\""))
        .count();
    assert_eq!(targeted, 4);
    assert!(stdout.contains("change \"Bob Smith\" <old_phone> <new_phone>"));
    assert!(!stdout.contains("<name>"));
}

#[test]
fn test_helper_add_and_delete_work_without_contacts() {
    let env = TestEnv::new();
    env.abview()
        .args(["helper", "add"])
        .assert()
        .success()
        .stdout(predicate::str::contains("add <name> [phone] [email] [birthday]"));

    env.abview()
        .args(["helper", "DELETE"])
        .assert()
        .success()
        .stdout(predicate::str::contains("delete <name>"));
}

#[test]
fn test_helper_rejects_unknown_action() {
    let env = TestEnv::new();
    env.abview()
        .args(["helper", "rename"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown helper action"));
}

// =============================================================================
// birthdays and tags
// =============================================================================

#[test]
fn test_birthdays_lists_contacts_in_window() {
    let today = OffsetDateTime::now_utc().date();
    let far = today + Duration::days(60);
    let body = format!(
        r#"{{
            "Far Away": {{"birthday": "{:02}-{:02}-2000"}},
            "Today Person": {{"birthday": "{:02}-{:02}-2000"}},
            "No Birthday": {{}}
        }}"#,
        far.day(),
        u8::from(far.month()),
        today.day(),
        u8::from(today.month()),
    );
    let env = TestEnv::with_contacts(&body);

    let stdout = stdout_of(env.abview().arg("birthdays"));
    assert!(stdout.contains("Today Person\t"));
    assert!(stdout.contains("\ttoday"));
    assert!(!stdout.contains("Far Away"));

    let stdout = stdout_of(env.abview().args(["birthdays", "--days", "90"]));
    assert!(stdout.starts_with("Today Person\t"));
    assert!(stdout.contains("Far Away\t"));
}

#[test]
fn test_tags_groups_contacts() {
    let env = TestEnv::with_contacts(SAMPLE_CONTACTS);
    env.abview()
        .arg("tags")
        .assert()
        .success()
        .stdout("friends\tAda Lovelace\nmath\tAda Lovelace\nwork\tBob Smith\n");
}

// =============================================================================
// configuration
// =============================================================================

#[test]
fn test_explicit_config_must_exist() {
    let env = TestEnv::new();
    abview_cmd()
        .args([
            "--config",
            env.temp_dir.path().join("missing.toml").to_str().unwrap(),
            "helper",
            "add",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn test_logs_written_to_configured_directory() {
    let env = TestEnv::with_contacts(SAMPLE_CONTACTS);
    env.abview().arg("list").assert().success();

    let log_dir = env.temp_dir.path().join("logs");
    let has_log = fs::read_dir(&log_dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .any(|entry| entry.file_name().to_string_lossy().starts_with("abview"));
    assert!(has_log);
}
