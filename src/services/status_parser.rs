//! `compose ps` output parsing
//!
//! Best-effort and lossy: it depends on the human-readable table that the
//! compose CLI prints today. Callers only see [`StatusParser`], so a format
//! change is contained here.

use crate::config::env::constants::STATUS_HEADER_LINES;
use crate::domain::compose::ServiceStatusSnapshot;

/// Turns raw `ps` stdout into a snapshot. Must never fail.
pub trait StatusParser: Send + Sync {
    fn parse(&self, stdout: &str) -> ServiceStatusSnapshot;
}

/// Table parser: skip the header, keep rows whose status mentions `Up`,
/// take the first column as the service name.
#[derive(Clone, Debug)]
pub struct PsTableParser {
    header_lines: usize,
}

impl PsTableParser {
    pub fn new(header_lines: usize) -> Self {
        Self { header_lines }
    }
}

impl Default for PsTableParser {
    fn default() -> Self {
        Self::new(STATUS_HEADER_LINES)
    }
}

impl StatusParser for PsTableParser {
    fn parse(&self, stdout: &str) -> ServiceStatusSnapshot {
        let services = stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .skip(self.header_lines)
            .filter(|line| line.contains("Up"))
            .filter_map(|line| line.split_whitespace().next())
            .map(str::to_string)
            .collect();

        ServiceStatusSnapshot::from_services(services)
    }
}
