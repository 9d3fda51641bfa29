use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const PAYLOAD: &str = r#"{
  "invoiceData": {
    "InvoiceNumber": "INV-2201",
    "InvoiceDate": "20/11/25",
    "SupplierName": "Bonhams",
    "TotalAmount": 1240,
    "Currency": "GBP",
    "LineItems": [
      {"LineType": "Lot", "LotNumber": "17", "Description": "Bronze figure", "UnitPrice": 1000, "LineTotal": 1000},
      {"LineType": "Surcharge", "Description": "Postage", "UnitPrice": 200, "TaxType": "VAT", "TaxRate": 20, "TaxAmount": 40, "LineTotal": 240}
    ]
  }
}"#;

fn lotbill() -> Command {
    Command::cargo_bin("lotbill").unwrap()
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn normalize_prints_canonical_invoice() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "invoice.json", PAYLOAD);

    lotbill()
        .arg("normalize")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""InvoiceNumber": "INV-2201""#))
        .stdout(predicate::str::contains(r#""InvoiceDate": "2025-11-20""#))
        .stdout(predicate::str::contains(r#""LineType": "Surcharge""#));
}

#[test]
fn normalize_csv_has_a_row_per_line() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "invoice.json", PAYLOAD);
    let output = dir.path().join("out.csv");

    lotbill()
        .args(["normalize", "--format", "csv", "--output"])
        .arg(&output)
        .arg(&input)
        .assert()
        .success();

    let csv = fs::read_to_string(&output).unwrap();
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.starts_with("invoice_number,invoice_date"));
    assert!(csv.contains("Bronze figure"));
}

#[test]
fn normalize_tolerates_garbage() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "garbage.json", "this is not json");

    lotbill()
        .arg("normalize")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""LineItems": []"#));
}

#[test]
fn map_produces_draft_bill() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "invoice.json", PAYLOAD);

    lotbill()
        .args(["map", "--account-code", "429"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""Type": "ACCPAY""#))
        .stdout(predicate::str::contains(r#""Status": "DRAFT""#))
        .stdout(predicate::str::contains(r#""TaxType": "vat20""#))
        .stdout(predicate::str::contains(r#""Description": "Lot - Lot #17 - Bronze figure""#));
}

#[test]
fn map_requires_account_code_value() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "invoice.json", PAYLOAD);

    lotbill()
        .args(["map", "--account-code", " "])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("account code is required"));
}

#[test]
fn map_uses_configured_tax_codes() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "invoice.json", PAYLOAD);
    let config = write(
        dir.path(),
        "config.json",
        r#"{"ledger": {"tax_codes": {"none": "NONE", "vat20": "INPUT2", "vat5": "RRINPUT"}}}"#,
    );

    lotbill()
        .arg("--config")
        .arg(&config)
        .args(["map", "--account-code", "429", "--reconcile"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""TaxType": "INPUT2""#))
        .stderr(predicate::str::contains("within tolerance"));
}

#[test]
fn validate_reports_issues() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "partial.json", r#"{"InvoiceNumber": "X-1"}"#);

    lotbill()
        .arg("validate")
        .arg(&input)
        .assert()
        .success()
        .stderr(predicate::str::contains("No line items"));

    lotbill()
        .args(["validate", "--strict"])
        .arg(&input)
        .assert()
        .failure();
}

#[test]
fn validate_accepts_complete_invoice() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "invoice.json", PAYLOAD);

    lotbill()
        .args(["validate", "--strict"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("looks complete"));
}

#[test]
fn batch_writes_bills_and_summary() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.json", PAYLOAD);
    write(dir.path(), "b.json", r#"{"InvoiceNumber": "B-2", "LineItems": null}"#);
    let out = dir.path().join("out");
    let pattern = format!("{}/*.json", dir.path().display());

    lotbill()
        .args(["batch", "--account-code", "429", "--summary", "--output-dir"])
        .arg(&out)
        .arg(&pattern)
        .assert()
        .success();

    assert!(out.join("a.bill.json").exists());
    assert!(out.join("b.bill.json").exists());

    let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
    assert_eq!(summary.lines().count(), 3);
    assert!(summary.contains("INV-2201"));
    assert!(summary.contains("B-2"));
}

#[test]
fn batch_without_matches_fails() {
    let dir = TempDir::new().unwrap();
    let pattern = format!("{}/*.json", dir.path().display());

    lotbill()
        .arg("batch")
        .arg(&pattern)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching files"));
}

#[test]
fn config_init_get_set() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("lotbill.json");

    lotbill()
        .arg("--config")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .success();
    assert!(config.exists());

    lotbill()
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "ledger.default_currency", "EUR"])
        .assert()
        .success();

    lotbill()
        .arg("--config")
        .arg(&config)
        .args(["config", "get", "ledger.default_currency"])
        .assert()
        .success()
        .stdout(predicate::str::contains("EUR"));

    lotbill()
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "ledger.no_such_key", "1"])
        .assert()
        .failure();

    lotbill()
        .arg("--config")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn submit_requires_token() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "invoice.json", PAYLOAD);

    lotbill()
        .env_remove("LOTBILL_ACCESS_TOKEN")
        .env_remove("LOTBILL_TENANT_ID")
        .args(["submit", "--account-code", "429", "--tenant", "t-1"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--token"));
}
