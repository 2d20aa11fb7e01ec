use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::domain::{
    DeskSummary, EmployeeDirectory, EmployeeInfo, IssueRecord, IssueRequest,
    IssueStatus, issue_book, return_book, sort_records_by_activity,
};

use super::AppError;

/// Application service for the issue desk.
/// Owns the one mutable record collection and serializes every change to it;
/// the ledger functions it calls stay pure.
pub struct IssueDesk<D: EmployeeDirectory> {
    directory: D,
    records: Vec<IssueRecord>,
}

/// Result of issuing a book
#[derive(Debug, Clone)]
pub struct IssueReceipt {
    pub record: IssueRecord,
    pub message: String,
}

/// Result of returning a book
#[derive(Debug, Clone)]
pub struct ReturnReceipt {
    pub record: IssueRecord,
    pub message: String,
    /// Whole days the book was kept past its due date
    pub days_late: i64,
}

impl<D: EmployeeDirectory> IssueDesk<D> {
    /// Create an empty desk backed by the given directory.
    pub fn new(directory: D) -> Self {
        Self {
            directory,
            records: Vec::new(),
        }
    }

    /// Create a desk seeded with existing records (re-ordered for display).
    pub fn with_records(directory: D, records: Vec<IssueRecord>) -> Self {
        Self {
            directory,
            records: sort_records_by_activity(&records),
        }
    }

    // ========================
    // Issue / return
    // ========================

    /// Issue a book now.
    pub fn issue(&mut self, request: &IssueRequest) -> Result<IssueReceipt, AppError> {
        self.issue_inner(request, None)
    }

    /// Issue a book at an explicit reference time.
    pub fn issue_at(
        &mut self,
        request: &IssueRequest,
        now: DateTime<Utc>,
    ) -> Result<IssueReceipt, AppError> {
        self.issue_inner(request, Some(now))
    }

    fn issue_inner(
        &mut self,
        request: &IssueRequest,
        now: Option<DateTime<Utc>>,
    ) -> Result<IssueReceipt, AppError> {
        let issued = match issue_book(&self.records, request, &self.directory, now) {
            Ok(issued) => issued,
            Err(err) => {
                warn!(qr_code = %request.qr_code.trim(), reason = ?err, "issue rejected");
                return Err(err.into());
            }
        };

        info!(
            id = %issued.record.id,
            qr_code = %issued.record.qr_code,
            employee_id = %issued.record.employee_id,
            due = %issued.record.due_date.to_rfc3339(),
            "book issued"
        );

        let mut records = Vec::with_capacity(self.records.len() + 1);
        records.push(issued.record.clone());
        records.extend(self.records.iter().cloned());
        self.records = sort_records_by_activity(&records);

        Ok(IssueReceipt {
            record: issued.record,
            message: issued.message,
        })
    }

    /// Return a book now.
    pub fn return_book(&mut self, qr_code: &str) -> Result<ReturnReceipt, AppError> {
        self.return_inner(qr_code, None)
    }

    /// Return a book at an explicit reference time.
    pub fn return_at(
        &mut self,
        qr_code: &str,
        now: DateTime<Utc>,
    ) -> Result<ReturnReceipt, AppError> {
        self.return_inner(qr_code, Some(now))
    }

    fn return_inner(
        &mut self,
        qr_code: &str,
        now: Option<DateTime<Utc>>,
    ) -> Result<ReturnReceipt, AppError> {
        let returned = match return_book(&self.records, qr_code, now) {
            Ok(returned) => returned,
            Err(err) => {
                warn!(qr_code = %qr_code.trim(), reason = ?err, "return rejected");
                return Err(err.into());
            }
        };

        let record = returned.record;
        let days_late = record.days_late();

        info!(
            id = %record.id,
            qr_code = %record.qr_code,
            employee_id = %record.employee_id,
            days_late,
            "book returned"
        );

        self.records = returned.records;

        Ok(ReturnReceipt {
            record,
            message: returned.message,
            days_late,
        })
    }

    // ========================
    // Queries
    // ========================

    /// All records, most recently active first.
    pub fn records(&self) -> &[IssueRecord] {
        &self.records
    }

    /// Books currently with employees.
    pub fn active(&self) -> Vec<&IssueRecord> {
        self.records
            .iter()
            .filter(|r| r.status == IssueStatus::Issued)
            .collect()
    }

    /// Active issues past their due date at `now`, most overdue first.
    pub fn overdue(&self, now: DateTime<Utc>) -> Vec<&IssueRecord> {
        let mut overdue: Vec<_> = self.records.iter().filter(|r| r.is_overdue(now)).collect();
        overdue.sort_by_key(|r| r.due_date);
        overdue
    }

    /// Every record for a copy, most recently active first.
    pub fn history_for(&self, qr_code: &str) -> Vec<&IssueRecord> {
        let qr_code = qr_code.trim();
        self.records.iter().filter(|r| r.qr_code == qr_code).collect()
    }

    pub fn summary(&self, now: DateTime<Utc>) -> DeskSummary {
        DeskSummary::compute(&self.records, now)
    }

    /// Preview the borrower details an issue would snapshot.
    pub fn lookup_employee(&self, employee_id: &str) -> Option<EmployeeInfo> {
        let found = self.directory.lookup(employee_id);
        debug!(employee_id = %employee_id.trim(), found = found.is_some(), "employee lookup");
        found
    }
}
