use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type IssueId = Uuid;

/// Every book is lent for a fixed number of days.
pub const ISSUE_DURATION_DAYS: i64 = 15;

/// Due date for a book issued at `issue_date`, or `None` when it falls
/// outside the representable range.
pub fn due_date_for(issue_date: DateTime<Utc>) -> Option<DateTime<Utc>> {
    issue_date.checked_add_signed(Duration::days(ISSUE_DURATION_DAYS))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueStatus {
    /// The copy is currently with an employee
    Issued,
    /// The copy was checked back in. Terminal.
    Returned,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Issued => "issued",
            IssueStatus::Returned => "returned",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "issued" => Some(IssueStatus::Issued),
            "returned" => Some(IssueStatus::Returned),
            _ => None,
        }
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single book-loan event.
/// Borrower details are a snapshot taken at issue time; later directory
/// changes never reach an existing record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub id: IssueId,
    /// Identifies the physical copy
    pub qr_code: String,
    pub employee_id: String,
    pub employee_name: String,
    pub designation: String,
    pub book_title: String,
    pub issue_date: DateTime<Utc>,
    /// Always `issue_date + ISSUE_DURATION_DAYS`
    pub due_date: DateTime<Utc>,
    /// Set once, by the return
    pub return_date: Option<DateTime<Utc>>,
    pub status: IssueStatus,
    /// Opaque image payload captured at the desk (usually a data URL)
    pub book_image: Option<String>,
}

impl IssueRecord {
    pub fn is_returned(&self) -> bool {
        self.status == IssueStatus::Returned
    }

    /// Most recent event time: the return date if returned, else the issue date.
    pub fn activity_timestamp(&self) -> DateTime<Utc> {
        self.return_date.unwrap_or(self.issue_date)
    }

    /// An issued record whose due date has passed relative to `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == IssueStatus::Issued && self.due_date < now
    }

    /// Whole days past the due date, 0 when not overdue.
    pub fn days_overdue(&self, now: DateTime<Utc>) -> i64 {
        if self.is_overdue(now) {
            (now - self.due_date).num_days()
        } else {
            0
        }
    }

    /// Whole days a returned book was kept past its due date.
    pub fn days_late(&self) -> i64 {
        match self.return_date {
            Some(returned) if returned > self.due_date => (returned - self.due_date).num_days(),
            _ => 0,
        }
    }

    /// Close this record. Callers only pass issued records.
    pub(crate) fn into_returned(mut self, return_date: DateTime<Utc>) -> Self {
        self.status = IssueStatus::Returned;
        self.return_date = Some(return_date);
        self
    }
}

/// What the desk operator submits to lend a book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRequest {
    pub qr_code: String,
    pub employee_id: String,
    pub book_title: String,
    pub book_image: Option<String>,
}

impl IssueRequest {
    pub fn new(
        qr_code: impl Into<String>,
        employee_id: impl Into<String>,
        book_title: impl Into<String>,
    ) -> Self {
        Self {
            qr_code: qr_code.into(),
            employee_id: employee_id.into(),
            book_title: book_title.into(),
            book_image: None,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.book_image = Some(image.into());
        self
    }
}
