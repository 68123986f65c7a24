#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

mod common;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");
    let deployment = common::deployment_file().unwrap();

    // 1. First run: approve and pay
    let csv1 = common::command_file(&["buyer, approve, 1000000", "buyer, pay,"]).unwrap();
    let output1 = Command::new(cargo_bin!("escrow-engine"))
        .arg(csv1.path())
        .arg("--deployment")
        .arg(deployment.path())
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains("payment,buyer,1000000,"));

    // 2. Second run resumes in Paid: paying again is rejected, delivery succeeds
    let csv2 = common::command_file(&["buyer, pay,", "buyer, deliver,", "buyer, complete,"]).unwrap();
    let output2 = Command::new(cargo_bin!("escrow-engine"))
        .arg(csv2.path())
        .arg("--deployment")
        .arg(deployment.path())
        .arg("--db-path")
        .arg(&db_path)
        .arg("-v")
        .output()
        .expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);
    let stderr2 = String::from_utf8_lossy(&output2.stderr);

    assert!(!stdout2.contains("payment"));
    assert!(stdout2.contains("delivered,buyer,,"));
    assert!(stdout2.contains("completed,buyer,,"));
    assert!(stderr2.contains("Invalid status"));
    // Balances were minted once, on first deployment only.
    assert!(stderr2.contains("seller=1000000"));
    assert!(stderr2.contains("buyer=0"));
}

#[test]
fn test_resume_rejects_changed_deployment() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");
    let deployment = common::deployment_file().unwrap();
    let commands = common::command_file(&["buyer, approve, 1000000"]).unwrap();

    let first = Command::new(cargo_bin!("escrow-engine"))
        .arg(commands.path())
        .arg("--deployment")
        .arg(deployment.path())
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("Failed to execute command");
    assert!(first.status.success());

    let mut changed = tempfile::NamedTempFile::new().unwrap();
    write!(
        changed,
        r#"{{"custody":"escrow","seller":"mallory","buyer":"buyer","arbitrator":"arbitrator","price":1000000,"asset":"TST"}}"#
    )
    .unwrap();
    let second = Command::new(cargo_bin!("escrow-engine"))
        .arg(commands.path())
        .arg("--deployment")
        .arg(changed.path())
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("Failed to execute command");
    assert!(!second.status.success());
    let stderr = String::from_utf8_lossy(&second.stderr);
    assert!(stderr.contains("differs from the deployment file in: seller"));
}
