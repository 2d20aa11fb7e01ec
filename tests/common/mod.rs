// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, Utc};
use issuedesk::IssueDesk;
use issuedesk::domain::{EmployeeInfo, IssueRequest, StaticDirectory};

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Helper to parse an RFC 3339 timestamp
pub fn parse_time(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

/// Directory with a single well-known employee
pub fn test_directory() -> StaticDirectory {
    StaticDirectory::new().with_employee("EMP001", EmployeeInfo::new("Test User", "Engineer"))
}

/// Helper to create an empty desk backed by the test directory
pub fn test_desk() -> IssueDesk<StaticDirectory> {
    IssueDesk::new(test_directory())
}

/// A complete, valid issue request for EMP001
pub fn sample_request(qr_code: &str, title: &str) -> IssueRequest {
    IssueRequest::new(qr_code, "EMP001", title).with_image("data:image/png;base64,test")
}
