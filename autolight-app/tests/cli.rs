use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

fn io_fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("../autolight-io/tests/data");
    path.push(name);
    path
}

fn write_config(dir: &Path) -> PathBuf {
    let config = dir.join("autolight.toml");
    let body = format!(
        r#"
[logging]
level = "warn"

[storage]
database_path = "{}"
media_root = "{}"
"#,
        dir.join("db").join("autolight.db").display(),
        dir.join("media").display()
    );
    fs::write(&config, body).unwrap();
    config
}

fn autolight(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("autolight").expect("binary built");
    cmd.arg("--config").arg(config);
    cmd
}

#[test]
fn seed_process_show_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    autolight(&config)
        .args(["catalog", "seed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("10"));

    autolight(&config)
        .args(["catalog", "list", "--symbol", "down"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DOWNLIGHT_12W").and(predicate::str::contains("DOWNLIGHT_8W")));

    autolight(&config)
        .arg("process")
        .arg(io_fixture("office_two_rooms.dxf"))
        .args(["--project", "Office"])
        .assert()
        .success()
        .stdout(predicate::str::contains("UNKNOWN_SYMBOL"));
    assert!(dir.path().join("media/cad_files/office_two_rooms.dxf").exists());

    autolight(&config)
        .args(["show", "1"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[Main Area]")
                .and(predicate::str::contains("Room 1"))
                .and(predicate::str::contains("DOWNLIGHT_12W x3")),
        );

    autolight(&config)
        .args(["show", "1", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"current_lux\": 106.4"));

    autolight(&config)
        .args(["report", "1", "--kind", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lighting_report_1_"));

    let reports: Vec<_> = fs::read_dir(dir.path().join("media/reports"))
        .unwrap()
        .collect();
    assert_eq!(reports.len(), 1);
}

#[test]
fn rejects_unsupported_upload() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let bogus = dir.path().join("plan.pdf");
    fs::write(&bogus, b"%PDF").unwrap();

    autolight(&config)
        .arg("process")
        .arg(&bogus)
        .assert()
        .failure()
        .stderr(predicate::str::contains("不支持的文件类型"));
}

#[test]
fn failed_drawing_exits_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    autolight(&config)
        .arg("process")
        .arg(io_fixture("malformed_insert.dxf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("处理失败"));

    autolight(&config)
        .args(["show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("failed"));
}
