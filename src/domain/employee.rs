use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeInfo {
    pub name: String,
    pub designation: String,
}

impl EmployeeInfo {
    pub fn new(name: impl Into<String>, designation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            designation: designation.into(),
        }
    }
}

/// Employee ids are compared trimmed and uppercased.
pub fn normalize_employee_id(id: &str) -> String {
    id.trim().to_uppercase()
}

/// Resolves an employee id to the borrower details shown on a record.
/// Implementations receive ids that are already normalized.
pub trait EmployeeDirectory {
    fn get(&self, normalized_id: &str) -> Option<EmployeeInfo>;

    /// Normalize `id` and resolve it.
    fn lookup(&self, id: &str) -> Option<EmployeeInfo> {
        let normalized = normalize_employee_id(id);
        if normalized.is_empty() {
            return None;
        }
        self.get(&normalized)
    }
}

impl<T: EmployeeDirectory + ?Sized> EmployeeDirectory for &T {
    fn get(&self, normalized_id: &str) -> Option<EmployeeInfo> {
        (**self).get(normalized_id)
    }
}

impl EmployeeDirectory for HashMap<String, EmployeeInfo> {
    fn get(&self, normalized_id: &str) -> Option<EmployeeInfo> {
        HashMap::get(self, normalized_id).cloned()
    }
}

/// In-memory directory keyed by normalized employee id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticDirectory {
    employees: HashMap<String, EmployeeInfo>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The desk's built-in roster.
    pub fn default_roster() -> Self {
        Self::new()
            .with_employee("EMP001", EmployeeInfo::new("Aarav Natarajan", "Senior Analyst"))
            .with_employee("EMP002", EmployeeInfo::new("Meera Iyer", "Data Scientist"))
            .with_employee("EMP003", EmployeeInfo::new("Rahul Verma", "Product Manager"))
            .with_employee("EMP004", EmployeeInfo::new("Divya Krishnan", "UX Researcher"))
    }

    pub fn with_employee(mut self, id: &str, info: EmployeeInfo) -> Self {
        self.insert(id, info);
        self
    }

    /// Insert or replace. Returns the previous entry for the id, if any.
    pub fn insert(&mut self, id: &str, info: EmployeeInfo) -> Option<EmployeeInfo> {
        self.employees.insert(normalize_employee_id(id), info)
    }

    pub fn len(&self) -> usize {
        self.employees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.employees.is_empty()
    }

    /// Entries sorted by id.
    pub fn entries(&self) -> Vec<(&str, &EmployeeInfo)> {
        let mut entries: Vec<_> = self
            .employees
            .iter()
            .map(|(id, info)| (id.as_str(), info))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

impl EmployeeDirectory for StaticDirectory {
    fn get(&self, normalized_id: &str) -> Option<EmployeeInfo> {
        self.employees.get(normalized_id).cloned()
    }
}
