mod common;

use std::fs;

use common::{parse_date, sample_request};
use issuedesk::IssueDesk;
use issuedesk::cli::Session;
use issuedesk::io::{Exporter, HistorySnapshot, load_directory};
use tempfile::TempDir;

#[test]
fn test_load_json_directory_and_issue() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("staff.json");
    fs::write(
        &path,
        r#"{ "lib01": { "name": "Ana Costa", "designation": "Librarian" } }"#,
    )
    .unwrap();

    let directory = load_directory(&path).unwrap();
    let mut desk = IssueDesk::new(directory);
    let request = issuedesk::IssueRequest::new("QR-1", "LIB01", "SICP").with_image("img");
    let receipt = desk.issue_at(&request, parse_date("2024-05-01")).unwrap();

    assert_eq!(receipt.record.employee_name, "Ana Costa");
    assert_eq!(
        receipt.message,
        "SICP issued to Ana Costa. Due on Thu May 16 2024."
    );
}

#[test]
fn test_load_csv_directory() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("staff.csv");
    fs::write(
        &path,
        "employee_id,name,designation\nEMP100,Ben Ode,Archivist\n",
    )
    .unwrap();

    let directory = load_directory(&path).unwrap();
    assert_eq!(directory.len(), 1);
}

#[test]
fn test_load_directory_errors() {
    let temp_dir = TempDir::new().unwrap();

    let unsupported = temp_dir.path().join("staff.txt");
    fs::write(&unsupported, "x").unwrap();
    assert!(load_directory(&unsupported).is_err());

    let missing = temp_dir.path().join("missing.json");
    assert!(load_directory(&missing).is_err());

    let broken = temp_dir.path().join("broken.json");
    fs::write(&broken, "{ not json").unwrap();
    let err = load_directory(&broken).unwrap_err();
    assert!(err.to_string().contains("JSON parse error"));
}

#[test]
fn test_export_json_file_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("history.json");

    let mut desk = common::test_desk();
    desk.issue_at(&sample_request("QR-1", "Book One"), parse_date("2024-02-01"))
        .unwrap();
    desk.issue_at(&sample_request("QR-2", "Book Two"), parse_date("2024-02-02"))
        .unwrap();
    desk.return_at("QR-1", parse_date("2024-02-03")).unwrap();

    let file = fs::File::create(&path).unwrap();
    let count = Exporter::new(desk.records()).export_json(file).unwrap();
    assert_eq!(count, 2);

    let snapshot: HistorySnapshot =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(snapshot.records, desk.records());
    assert_eq!(snapshot.records[0].qr_code, "QR-1");
}

#[test]
fn test_session_script_with_export() {
    let temp_dir = TempDir::new().unwrap();
    let export_path = temp_dir.path().join("history.csv");
    let script = format!(
        "issue QR-9 EMP001 \"The Pragmatic Programmer\" img --at 2024-04-01\n\
         lookup emp001\n\
         export csv --output {}\n\
         export xml\n",
        export_path.display()
    );

    let mut session = Session::new(common::test_desk(), Vec::new());
    let stats = session.run(script.as_bytes()).unwrap();
    assert_eq!(stats.commands, 4);
    assert_eq!(session.desk().records().len(), 1);

    let output = String::from_utf8(session.into_output()).unwrap();
    assert!(output.contains("The Pragmatic Programmer issued to Test User."));
    assert!(output.contains("Test User · Engineer"));
    assert!(output.contains("Exported 1 record(s)"));
    assert!(output.contains("Error: Invalid input: invalid export format 'xml'"));

    let csv = fs::read_to_string(&export_path).unwrap();
    assert!(csv.contains(",QR-9,EMP001,Test User,Engineer,The Pragmatic Programmer,"));
}
