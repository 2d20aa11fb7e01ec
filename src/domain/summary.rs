use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{IssueRecord, IssueStatus};

/// Counters shown on the desk dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeskSummary {
    /// Books currently with employees
    pub active: usize,
    /// Active issues past their due date
    pub overdue: usize,
    /// Records closed on the same UTC day as `now`
    pub returned_today: usize,
    pub total: usize,
}

impl DeskSummary {
    pub fn compute(records: &[IssueRecord], now: DateTime<Utc>) -> Self {
        let today = now.date_naive();

        records.iter().fold(
            DeskSummary {
                total: records.len(),
                ..Default::default()
            },
            |mut summary, record| {
                if record.status == IssueStatus::Issued {
                    summary.active += 1;
                }
                if record.is_overdue(now) {
                    summary.overdue += 1;
                }
                if record
                    .return_date
                    .is_some_and(|returned| returned.date_naive() == today)
                {
                    summary.returned_today += 1;
                }
                summary
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EmployeeInfo, IssueRequest, StaticDirectory, issue_book, return_book};

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(
            DeskSummary::compute(&[], Utc::now()),
            DeskSummary::default()
        );
    }

    #[test]
    fn test_summary_counts() {
        let directory = StaticDirectory::new()
            .with_employee("EMP001", EmployeeInfo::new("Test User", "Engineer"));
        let mut records = Vec::new();
        for (qr, date) in [
            ("QR-1", "2024-01-01T08:00:00Z"),
            ("QR-2", "2024-01-20T08:00:00Z"),
            ("QR-3", "2024-01-21T08:00:00Z"),
        ] {
            let request = IssueRequest::new(qr, "EMP001", "Book").with_image("img");
            let issued = issue_book(&records, &request, &directory, Some(at(date))).unwrap();
            records.push(issued.record);
        }
        let returned = return_book(&records, "QR-3", Some(at("2024-01-22T09:00:00Z"))).unwrap();

        let summary = DeskSummary::compute(&returned.records, at("2024-01-22T18:00:00Z"));

        assert_eq!(summary.total, 3);
        assert_eq!(summary.active, 2);
        // QR-1 was due on the 16th
        assert_eq!(summary.overdue, 1);
        assert_eq!(summary.returned_today, 1);
    }
}
