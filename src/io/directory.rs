use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::application::AppError;
use crate::domain::{EmployeeInfo, StaticDirectory};

/// Supported directory file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryFormat {
    Json,
    Csv,
}

impl DirectoryFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "json" => Some(DirectoryFormat::Json),
            "csv" => Some(DirectoryFormat::Csv),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DirectoryRow {
    employee_id: String,
    name: String,
    designation: String,
}

/// Load an employee directory from a `.json` or `.csv` file.
pub fn load_directory(path: &Path) -> Result<StaticDirectory, AppError> {
    let format = DirectoryFormat::from_path(path).ok_or_else(|| {
        AppError::Directory(format!(
            "unsupported file extension for {} (expected .json or .csv)",
            path.display()
        ))
    })?;

    let file = std::fs::File::open(path)
        .map_err(|e| AppError::Directory(format!("cannot open {}: {}", path.display(), e)))?;

    let directory = match format {
        DirectoryFormat::Json => read_directory_json(file)?,
        DirectoryFormat::Csv => read_directory_csv(file)?,
    };

    debug!(path = %path.display(), employees = directory.len(), "employee directory loaded");
    Ok(directory)
}

/// Read a JSON object keyed by employee id.
pub fn read_directory_json<R: Read>(reader: R) -> Result<StaticDirectory, AppError> {
    let entries: BTreeMap<String, EmployeeInfo> = serde_json::from_reader(reader)
        .map_err(|e| AppError::Directory(format!("JSON parse error: {}", e)))?;

    let mut directory = StaticDirectory::new();
    for (id, info) in entries {
        add_entry(&mut directory, &id, info, None)?;
    }
    Ok(directory)
}

/// Read CSV with the header `employee_id,name,designation`.
pub fn read_directory_csv<R: Read>(reader: R) -> Result<StaticDirectory, AppError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut directory = StaticDirectory::new();

    for (line_num, result) in csv_reader.deserialize::<DirectoryRow>().enumerate() {
        let line = line_num + 2; // +2 for header and 0-indexing
        let row = result
            .map_err(|e| AppError::Directory(format!("CSV parse error on line {}: {}", line, e)))?;
        add_entry(
            &mut directory,
            &row.employee_id,
            EmployeeInfo::new(row.name, row.designation),
            Some(line),
        )?;
    }

    Ok(directory)
}

fn add_entry(
    directory: &mut StaticDirectory,
    id: &str,
    info: EmployeeInfo,
    line: Option<usize>,
) -> Result<(), AppError> {
    if id.trim().is_empty() {
        return Err(AppError::Directory(match line {
            Some(line) => format!("missing employee id on line {}", line),
            None => "missing employee id".to_string(),
        }));
    }
    if directory.insert(id, info).is_some() {
        warn!(employee_id = %id.trim(), "duplicate employee id in directory, keeping the last entry");
    }
    Ok(())
}
