use std::fs::File;
use std::io::{BufRead, BufReader, Write, stdin, stdout};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::application::{AppError, IssueDesk};
use crate::domain::{
    EmployeeDirectory, ISSUE_DURATION_DAYS, IssueRecord, IssueRequest, StaticDirectory,
};
use crate::io::{ExportFormat, Exporter, load_directory};

/// Issuedesk - Library Issue/Return Desk
#[derive(Parser)]
#[command(name = "issuedesk")]
#[command(about = "Issue and return QR-coded library books from the command line")]
#[command(version)]
pub struct Cli {
    /// Employee directory file (.json or .csv); defaults to the built-in roster
    #[arg(short, long, global = true)]
    pub directory: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the employee directory
    Employees,

    /// Show the name and designation for an employee id
    Lookup {
        /// Employee id (case-insensitive)
        employee_id: String,
    },

    /// Run a desk session, one command per line
    Session {
        /// Read commands from a file instead of stdin
        #[arg(short, long)]
        script: Option<PathBuf>,
    },
}

/// A single line typed at the desk.
#[derive(Parser, Debug)]
#[command(name = "desk", no_binary_name = true)]
#[command(disable_version_flag = true)]
struct DeskLine {
    #[command(subcommand)]
    command: DeskCommand,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum DeskCommand {
    /// Issue a book to an employee
    Issue {
        /// QR code of the book copy
        qr_code: String,

        /// Employee id
        employee_id: String,

        /// Book title (quote titles with spaces)
        title: String,

        /// Captured book image payload (e.g. a data URL)
        image: String,

        /// Reference time (RFC 3339 or YYYY-MM-DD, defaults to now)
        #[arg(long)]
        at: Option<String>,
    },

    /// Return a book by its QR code
    Return {
        /// QR code of the book copy
        qr_code: String,

        /// Reference time (RFC 3339 or YYYY-MM-DD, defaults to now)
        #[arg(long)]
        at: Option<String>,
    },

    /// List all activity, most recent first
    List {
        /// Evaluate overdue flags at this time
        #[arg(long)]
        at: Option<String>,
    },

    /// List books currently with employees
    Active {
        /// Evaluate overdue flags at this time
        #[arg(long)]
        at: Option<String>,
    },

    /// List overdue books
    Overdue {
        #[arg(long)]
        at: Option<String>,
    },

    /// Show dashboard counters
    Summary {
        #[arg(long)]
        at: Option<String>,
    },

    /// Show every record for a QR code
    History { qr_code: String },

    /// Preview an employee
    Lookup { employee_id: String },

    /// Export the session history
    Export {
        /// Format: csv, json
        format: String,

        /// Output file (session output if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Counters reported when a session ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub commands: usize,
    pub rejected: usize,
}

impl Cli {
    /// Install the stderr subscriber. `RUST_LOG` takes precedence over `--verbose`.
    pub fn init_logging(&self) {
        let default = if self.verbose {
            "issuedesk=debug"
        } else {
            "issuedesk=warn"
        };
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init();
    }

    pub fn run(self) -> Result<()> {
        let directory = match &self.directory {
            Some(path) => load_directory(path)
                .with_context(|| format!("Failed to load directory: {}", path.display()))?,
            None => StaticDirectory::default_roster(),
        };

        match self.command {
            Commands::Employees => {
                if directory.is_empty() {
                    println!("No employees found.");
                } else {
                    println!("{:<10} {:<24} DESIGNATION", "ID", "NAME");
                    println!("{}", "-".repeat(56));
                    for (id, info) in directory.entries() {
                        println!("{:<10} {:<24} {}", id, info.name, info.designation);
                    }
                }
            }

            Commands::Lookup { employee_id } => match directory.lookup(&employee_id) {
                Some(info) => println!("{} · {}", info.name, info.designation),
                None => anyhow::bail!("No employee found for this ID."),
            },

            Commands::Session { script } => {
                let input: Box<dyn BufRead> = match &script {
                    Some(path) => Box::new(BufReader::new(File::open(path).with_context(
                        || format!("Failed to open script: {}", path.display()),
                    )?)),
                    None => Box::new(BufReader::new(stdin())),
                };

                let mut session = Session::new(IssueDesk::new(directory), stdout());
                let stats = session.run(input)?;
                if self.verbose {
                    eprintln!(
                        "Session ended: {} command(s), {} rejected",
                        stats.commands, stats.rejected
                    );
                }
            }
        }

        Ok(())
    }
}

/// Line-oriented desk session. State lives only as long as the session.
pub struct Session<D: EmployeeDirectory, W: Write> {
    desk: IssueDesk<D>,
    out: W,
    stats: SessionStats,
}

impl<D: EmployeeDirectory, W: Write> Session<D, W> {
    pub fn new(desk: IssueDesk<D>, out: W) -> Self {
        Self {
            desk,
            out,
            stats: SessionStats::default(),
        }
    }

    pub fn desk(&self) -> &IssueDesk<D> {
        &self.desk
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Run every line of `input`. Rejected or malformed lines are reported
    /// to the session output and the session carries on.
    pub fn run<R: BufRead>(&mut self, input: R) -> Result<SessionStats> {
        for line in input.lines() {
            let line = line.context("Failed to read session input")?;
            self.run_line(&line)?;
        }
        Ok(self.stats)
    }

    pub fn run_line(&mut self, line: &str) -> Result<()> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(());
        }

        let command = match split_line(trimmed)
            .and_then(|tokens| DeskLine::try_parse_from(tokens).map_err(anyhow::Error::from))
        {
            Ok(parsed) => parsed.command,
            Err(err) => {
                write!(self.out, "{}", err)?;
                if !err.to_string().ends_with('\n') {
                    writeln!(self.out)?;
                }
                return Ok(());
            }
        };

        self.stats.commands += 1;
        match self.execute(command) {
            Ok(()) => Ok(()),
            Err(err) => match err.downcast::<AppError>() {
                Ok(app_err) => {
                    if app_err.is_rejection() {
                        self.stats.rejected += 1;
                    }
                    writeln!(self.out, "Error: {}", app_err)?;
                    Ok(())
                }
                Err(other) => {
                    writeln!(self.out, "Error: {:#}", other)?;
                    Ok(())
                }
            },
        }
    }

    fn execute(&mut self, command: DeskCommand) -> Result<()> {
        match command {
            DeskCommand::Issue {
                qr_code,
                employee_id,
                title,
                image,
                at,
            } => {
                let request = IssueRequest::new(qr_code, employee_id, title).with_image(image);
                let receipt = match parse_at(at.as_deref())? {
                    Some(now) => self.desk.issue_at(&request, now)?,
                    None => self.desk.issue(&request)?,
                };
                writeln!(self.out, "{}", receipt.message)?;
            }

            DeskCommand::Return { qr_code, at } => {
                let receipt = match parse_at(at.as_deref())? {
                    Some(now) => self.desk.return_at(&qr_code, now)?,
                    None => self.desk.return_book(&qr_code)?,
                };
                writeln!(self.out, "{}", receipt.message)?;
                if receipt.days_late > 0 {
                    writeln!(self.out, "  Returned {} day(s) late.", receipt.days_late)?;
                }
            }

            DeskCommand::List { at } => {
                let now = parse_at(at.as_deref())?.unwrap_or_else(Utc::now);
                let records: Vec<_> = self.desk.records().iter().collect();
                if records.is_empty() {
                    writeln!(
                        self.out,
                        "No book activity recorded yet. Use issue or return to get started."
                    )?;
                } else {
                    write_records(&mut self.out, &records, now)?;
                }
            }

            DeskCommand::Active { at } => {
                let now = parse_at(at.as_deref())?.unwrap_or_else(Utc::now);
                let records = self.desk.active();
                if records.is_empty() {
                    writeln!(self.out, "No books are currently issued.")?;
                } else {
                    write_records(&mut self.out, &records, now)?;
                }
            }

            DeskCommand::Overdue { at } => {
                let now = parse_at(at.as_deref())?.unwrap_or_else(Utc::now);
                let records = self.desk.overdue(now);
                if records.is_empty() {
                    writeln!(self.out, "No overdue books.")?;
                } else {
                    writeln!(
                        self.out,
                        "{:<14} {:<28} {:<20} {:>6}",
                        "QR", "TITLE", "BORROWER", "DAYS"
                    )?;
                    writeln!(self.out, "{}", "-".repeat(71))?;
                    for record in records {
                        writeln!(
                            self.out,
                            "{:<14} {:<28} {:<20} {:>6}",
                            record.qr_code,
                            truncate(&record.book_title, 28),
                            truncate(&record.employee_name, 20),
                            record.days_overdue(now)
                        )?;
                    }
                }
            }

            DeskCommand::Summary { at } => {
                let now = parse_at(at.as_deref())?.unwrap_or_else(Utc::now);
                let summary = self.desk.summary(now);
                writeln!(self.out, "Active issues:   {:>5}", summary.active)?;
                writeln!(self.out, "Overdue:         {:>5}", summary.overdue)?;
                writeln!(self.out, "Returned today:  {:>5}", summary.returned_today)?;
                writeln!(self.out, "Total records:   {:>5}", summary.total)?;
                writeln!(self.out, "Loan period:     {:>5} days", ISSUE_DURATION_DAYS)?;
            }

            DeskCommand::History { qr_code } => {
                let records = self.desk.history_for(&qr_code);
                if records.is_empty() {
                    writeln!(self.out, "No records for {}.", qr_code.trim())?;
                } else {
                    write_records(&mut self.out, &records, Utc::now())?;
                }
            }

            DeskCommand::Lookup { employee_id } => match self.desk.lookup_employee(&employee_id) {
                Some(info) => writeln!(self.out, "{} · {}", info.name, info.designation)?,
                None => writeln!(self.out, "No employee found for this ID.")?,
            },

            DeskCommand::Export { format, output } => {
                let export_format = ExportFormat::from_str(&format).ok_or_else(|| {
                    AppError::InvalidInput(format!(
                        "invalid export format '{}'. Valid formats: csv, json",
                        format
                    ))
                })?;
                let exporter = Exporter::new(self.desk.records());

                match output {
                    Some(path) => {
                        let file = File::create(&path)
                            .with_context(|| format!("Failed to create output file: {}", path))?;
                        let count = exporter
                            .export(export_format, file)
                            .map_err(AppError::Export)?;
                        writeln!(self.out, "Exported {} record(s) to {}", count, path)?;
                    }
                    None => {
                        exporter
                            .export(export_format, &mut self.out)
                            .map_err(AppError::Export)?;
                    }
                }
            }
        }

        Ok(())
    }
}

fn write_records<W: Write>(
    out: &mut W,
    records: &[&IssueRecord],
    now: DateTime<Utc>,
) -> Result<()> {
    writeln!(
        out,
        "{:<14} {:<28} {:<20} {:<10} {:<10} {:<10} STATUS",
        "QR", "TITLE", "BORROWER", "ISSUED", "DUE", "RETURNED"
    )?;
    writeln!(out, "{}", "-".repeat(104))?;
    for record in records {
        let status = if record.is_overdue(now) {
            "OVERDUE".to_string()
        } else {
            record.status.as_str().to_uppercase()
        };
        writeln!(
            out,
            "{:<14} {:<28} {:<20} {:<10} {:<10} {:<10} {}",
            record.qr_code,
            truncate(&record.book_title, 28),
            truncate(&record.employee_name, 20),
            record.issue_date.format("%Y-%m-%d").to_string(),
            record.due_date.format("%Y-%m-%d").to_string(),
            record
                .return_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string()),
            status
        )?;
    }
    Ok(())
}

/// Split a desk line on whitespace; double quotes group words.
fn split_line(line: &str) -> Result<Vec<String>> {
    let normalized = line.replace('\t', " ");
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .flexible(true)
        .from_reader(normalized.as_bytes());

    let mut tokens = Vec::new();
    if let Some(record) = reader.records().next() {
        let record = record.context("Could not split command line")?;
        tokens.extend(
            record
                .iter()
                .filter(|token| !token.is_empty())
                .map(str::to_string),
        );
    }
    Ok(tokens)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn parse_at(value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    value
        .map(|s| parse_date(s).with_context(|| format!("Invalid date '{}'", s)))
        .transpose()
}

/// Parse RFC 3339, or YYYY-MM-DD as midnight UTC.
pub fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(date_str) {
        return Ok(parsed.with_timezone(&Utc));
    }

    let naive_date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .context("Date must be RFC 3339 or YYYY-MM-DD")?;
    let naive_datetime = naive_date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("Invalid date"))?;

    Ok(naive_datetime.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_script(script: &str) -> (String, SessionStats) {
        let desk = IssueDesk::new(StaticDirectory::default_roster());
        let mut session = Session::new(desk, Vec::new());
        let stats = session.run(script.as_bytes()).unwrap();
        (String::from_utf8(session.into_output()).unwrap(), stats)
    }

    #[test]
    fn test_split_line_groups_quotes() {
        let tokens = split_line(r#"issue  QR-1 emp001 "Clean Code" img --at 2024-01-01"#).unwrap();
        assert_eq!(
            tokens,
            vec!["issue", "QR-1", "emp001", "Clean Code", "img", "--at", "2024-01-01"]
        );
    }

    #[test]
    fn test_parse_desk_line() {
        let tokens = split_line("return QR-9 --at 2024-02-01T10:00:00Z").unwrap();
        let parsed = DeskLine::try_parse_from(tokens).unwrap();
        assert_eq!(
            parsed.command,
            DeskCommand::Return {
                qr_code: "QR-9".into(),
                at: Some("2024-02-01T10:00:00Z".into()),
            }
        );
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(
            parse_date("2024-01-16").unwrap().to_rfc3339(),
            "2024-01-16T00:00:00+00:00"
        );
        assert_eq!(
            parse_date("2024-01-16T05:30:00+02:00").unwrap().to_rfc3339(),
            "2024-01-16T03:30:00+00:00"
        );
        assert!(parse_date("16/01/2024").is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long title", 10), "a very ...");
    }

    #[test]
    fn test_session_issue_and_return() {
        let script = r#"
            # morning desk
            issue QR-300 EMP001 "Refactoring" img --at 2024-01-03
            issue QR-300 EMP002 "Refactoring" img --at 2024-01-03
            return QR-300 --at 2024-01-20
            return QR-300
        "#;
        let (output, stats) = run_script(script);

        assert!(output.contains(
            "Refactoring issued to Aarav Natarajan. Due on Thu Jan 18 2024."
        ));
        assert!(output.contains(
            "Error: This QR code is already associated with an active book issue."
        ));
        assert!(output.contains("Refactoring returned successfully by Aarav Natarajan."));
        assert!(output.contains("Returned 2 day(s) late."));
        assert!(output.contains("Error: No active issued book found for the scanned QR code."));
        assert_eq!(stats.commands, 4);
        assert_eq!(stats.rejected, 2);
    }

    #[test]
    fn test_session_reports_bad_lines_and_continues() {
        let script = "issue QR-1\nreturn QR-1 --at yesterday\nsummary --at 2024-01-01\n";
        let (output, stats) = run_script(script);

        assert!(output.contains("Invalid date 'yesterday'"));
        assert!(output.contains("Active issues:       0"));
        // The malformed issue line never reaches the desk
        assert_eq!(stats.commands, 2);
        assert_eq!(stats.rejected, 0);
    }

    #[test]
    fn test_session_survives_out_of_range_dates() {
        let script = "issue QR-1 EMP001 Book img --at +262142-12-30\n\
                      issue QR-2 EMP001 Book img --at 2024-01-10\n\
                      return QR-2 --at 2024-01-01\n\
                      summary --at 2024-01-11\n";
        let (output, stats) = run_script(script);

        assert!(output.contains("Error: The issue date is out of range; no due date can be set."));
        assert!(output.contains("Error: A book cannot be returned before it was issued."));
        assert!(output.contains("Active issues:       1"));
        assert_eq!(stats.commands, 4);
        assert_eq!(stats.rejected, 2);
    }

    #[test]
    fn test_session_list_and_overdue() {
        let script = r#"
            issue QR-A emp003 "Design Patterns" img --at 2024-01-01
            issue QR-B EMP004 "Working Effectively with Legacy Code" img --at 2024-01-10
            overdue --at 2024-01-20
            list --at 2024-01-20
        "#;
        let (output, _) = run_script(script);

        let overdue_line = output
            .lines()
            .find(|l| l.starts_with("QR-A") && !l.contains("OVERDUE") && !l.contains("ISSUED"))
            .unwrap();
        assert!(overdue_line.trim_end().ends_with('4'));
        assert!(output.contains("Working Effectively with ..."));
        let list_lines: Vec<_> = output
            .lines()
            .filter(|l| l.contains("OVERDUE") || l.contains("ISSUED"))
            .collect();
        assert_eq!(list_lines.len(), 2);
        assert!(list_lines[0].starts_with("QR-B"));
        assert!(list_lines[1].starts_with("QR-A"));
        assert!(list_lines[1].ends_with("OVERDUE"));
    }
}
