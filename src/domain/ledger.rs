use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::{
    EmployeeDirectory, IssueRecord, IssueRequest, IssueStatus, due_date_for,
    normalize_employee_id,
};

/// Why the desk refused an issue or a return. Every rejection is a
/// correctable input problem; the message is meant to be shown as is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IssueError {
    #[error("Please scan or enter a QR code for the book.")]
    MissingQrCode,

    #[error("Employee ID is required to issue a book.")]
    MissingEmployeeId,

    #[error("No employee record found for the provided ID.")]
    UnknownEmployee(String),

    #[error("Please provide the book title before issuing.")]
    MissingTitle,

    #[error("Please capture and upload the book image.")]
    MissingImage,

    #[error("This QR code is already associated with an active book issue.")]
    AlreadyIssued(String),

    #[error("No active issued book found for the scanned QR code.")]
    NoActiveIssue(String),

    #[error("The issue date is out of range; no due date can be set.")]
    IssueDateOutOfRange(DateTime<Utc>),

    #[error("A book cannot be returned before it was issued.")]
    ReturnBeforeIssue {
        issue_date: DateTime<Utc>,
        return_date: DateTime<Utc>,
    },
}

/// A successful issue. The caller owns the collection and adds `record` to it.
#[derive(Debug, Clone)]
pub struct Issued {
    pub record: IssueRecord,
    pub message: String,
}

/// A successful return, with the full re-ordered collection.
#[derive(Debug, Clone)]
pub struct Returned {
    pub record: IssueRecord,
    pub records: Vec<IssueRecord>,
    pub message: String,
}

fn is_active_issue(record: &IssueRecord, qr_code: &str) -> bool {
    record.qr_code == qr_code && record.status == IssueStatus::Issued
}

/// Validate an issue request against the current records and build the new record.
///
/// Checks run in a fixed order and the first failure wins: QR code,
/// employee id, directory lookup, title, image, then the one-active-issue
/// rule. A reference time with no representable due date is rejected last.
/// `records` is only read.
pub fn issue_book<D: EmployeeDirectory + ?Sized>(
    records: &[IssueRecord],
    request: &IssueRequest,
    directory: &D,
    now: Option<DateTime<Utc>>,
) -> Result<Issued, IssueError> {
    let now = now.unwrap_or_else(Utc::now);
    let qr_code = request.qr_code.trim();
    let employee_id = normalize_employee_id(&request.employee_id);
    let book_title = request.book_title.trim();

    if qr_code.is_empty() {
        return Err(IssueError::MissingQrCode);
    }

    if employee_id.is_empty() {
        return Err(IssueError::MissingEmployeeId);
    }

    let employee = directory
        .get(&employee_id)
        .ok_or_else(|| IssueError::UnknownEmployee(employee_id.clone()))?;

    if book_title.is_empty() {
        return Err(IssueError::MissingTitle);
    }

    let book_image = match request.book_image.as_deref() {
        Some(image) if !image.is_empty() => image.to_string(),
        _ => return Err(IssueError::MissingImage),
    };

    if records.iter().any(|r| is_active_issue(r, qr_code)) {
        return Err(IssueError::AlreadyIssued(qr_code.to_string()));
    }

    let due_date = due_date_for(now).ok_or(IssueError::IssueDateOutOfRange(now))?;
    let record = IssueRecord {
        id: Uuid::new_v4(),
        qr_code: qr_code.to_string(),
        employee_id,
        employee_name: employee.name,
        designation: employee.designation,
        book_title: book_title.to_string(),
        issue_date: now,
        due_date,
        return_date: None,
        status: IssueStatus::Issued,
        book_image: Some(book_image),
    };

    let message = format!(
        "{} issued to {}. Due on {}.",
        record.book_title,
        record.employee_name,
        due_date.format("%a %b %d %Y")
    );

    Ok(Issued { record, message })
}

/// Close the active issue for `qr_code`.
///
/// The input is never modified: the result holds a new collection where
/// only the matching record is replaced, ordered by activity. A return time
/// earlier than the record's issue date is rejected.
pub fn return_book(
    records: &[IssueRecord],
    qr_code: &str,
    now: Option<DateTime<Utc>>,
) -> Result<Returned, IssueError> {
    let qr_code = qr_code.trim();

    if qr_code.is_empty() {
        return Err(IssueError::MissingQrCode);
    }

    let now = now.unwrap_or_else(Utc::now);

    let index = records
        .iter()
        .position(|r| is_active_issue(r, qr_code))
        .ok_or_else(|| IssueError::NoActiveIssue(qr_code.to_string()))?;

    let issue_date = records[index].issue_date;
    if now < issue_date {
        return Err(IssueError::ReturnBeforeIssue {
            issue_date,
            return_date: now,
        });
    }

    let record = records[index].clone().into_returned(now);

    let mut updated = records.to_vec();
    updated[index] = record.clone();

    let message = format!(
        "{} returned successfully by {}.",
        record.book_title, record.employee_name
    );

    Ok(Returned {
        record,
        records: sort_records_by_activity(&updated),
        message,
    })
}

/// Display order: most recently active first, open issues before
/// returned ones on equal activity, then newest issue first.
pub fn compare_by_activity(a: &IssueRecord, b: &IssueRecord) -> Ordering {
    b.activity_timestamp()
        .cmp(&a.activity_timestamp())
        .then_with(|| a.return_date.is_some().cmp(&b.return_date.is_some()))
        .then_with(|| b.issue_date.cmp(&a.issue_date))
}

/// Stable sort into display order. Records with fully equal keys keep
/// their relative input order.
pub fn sort_records_by_activity(records: &[IssueRecord]) -> Vec<IssueRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(compare_by_activity);
    sorted
}
