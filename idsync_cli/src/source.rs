//! CSV-backed row source
//!
//! The source file doubles as the run's audit log: outcome columns sit
//! immediately after the input columns and are rewritten after every row.
//! The first two records are a reserved header region, carried through
//! unchanged on every flush.

use anyhow::{Context, Result};
use csv::StringRecord;
use idsync_core::batch::RowSource;
use idsync_core::model::{RowOutcome, UserRow};
use log::debug;
use std::path::{Path, PathBuf};

/// Reserved header records before the first data row
pub const HEADER_RECORDS: usize = 2;

const SERVICE_ACCOUNT_COLUMN: usize = 0;
const ACTIVE_COLUMN: usize = 1;
const USERNAME_COLUMN: usize = 2;
const FIRST_NAME_COLUMN: usize = 3;
const LAST_NAME_COLUMN: usize = 4;
const EMAIL_COLUMN: usize = 5;
const PHONE_COLUMN: usize = 6;
const POSITION_COLUMN: usize = 7;
const RESTRICT_LOGIN_IPS_COLUMN: usize = 8;
const LOGIN_ENABLED_COLUMN: usize = 9;
const CUSTOM_1_COLUMN: usize = 10;
const TEAMS_COLUMN: usize = 15;
const ROLES_COLUMN: usize = 16;
const TEAMS_MANAGED_COLUMN: usize = 17;
const STATUS_COLUMN: usize = 18;
const API_ID_COLUMN: usize = 19;
const API_SECRET_COLUMN: usize = 20;
const TOTAL_COLUMNS: usize = 21;

pub struct CsvRowSource {
    path: PathBuf,
    header: Vec<StringRecord>,
    records: Vec<Vec<String>>,
}

impl CsvRowSource {
    /// Reads the whole file into memory: the header region verbatim, each
    /// data record padded out to the outcome columns
    pub fn open(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        let mut header = Vec::new();
        let mut records = Vec::new();
        for (position, result) in reader.records().enumerate() {
            let record = result
                .with_context(|| format!("Failed to read record {} of {}", position + 1, path.display()))?;
            if position < HEADER_RECORDS {
                header.push(record);
                continue;
            }
            let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
            cells.resize(TOTAL_COLUMNS, String::new());
            records.push(cells);
        }
        debug!(
            "loaded {} data rows from {} (header region: {} records)",
            records.len(),
            path.display(),
            header.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            header,
            records,
        })
    }

    fn cell(&self, index: usize, column: usize) -> Option<String> {
        let value = &self.records[index][column];
        if value.trim().is_empty() {
            None
        } else {
            Some(value.clone())
        }
    }
}

impl RowSource for CsvRowSource {
    fn row_count(&self) -> usize {
        self.records.len()
    }

    fn load(&self, index: usize) -> UserRow {
        UserRow {
            service_account: self.cell(index, SERVICE_ACCOUNT_COLUMN),
            active: self.cell(index, ACTIVE_COLUMN),
            username: self.cell(index, USERNAME_COLUMN),
            first_name: self.cell(index, FIRST_NAME_COLUMN),
            last_name: self.cell(index, LAST_NAME_COLUMN),
            email: self.cell(index, EMAIL_COLUMN),
            phone: self.cell(index, PHONE_COLUMN),
            position: self.cell(index, POSITION_COLUMN),
            restrict_login_ips: self.cell(index, RESTRICT_LOGIN_IPS_COLUMN),
            login_enabled: self.cell(index, LOGIN_ENABLED_COLUMN),
            custom: [
                self.cell(index, CUSTOM_1_COLUMN),
                self.cell(index, CUSTOM_1_COLUMN + 1),
                self.cell(index, CUSTOM_1_COLUMN + 2),
                self.cell(index, CUSTOM_1_COLUMN + 3),
                self.cell(index, CUSTOM_1_COLUMN + 4),
            ],
            teams: self.cell(index, TEAMS_COLUMN),
            roles: self.cell(index, ROLES_COLUMN),
            teams_managed: self.cell(index, TEAMS_MANAGED_COLUMN),
        }
    }

    fn status(&self, index: usize) -> Option<String> {
        self.cell(index, STATUS_COLUMN)
    }

    fn record(&mut self, index: usize, outcome: &RowOutcome) {
        let (api_id, api_secret) = outcome
            .credentials
            .as_ref()
            .map(|creds| (creds.api_id.clone(), creds.api_secret.clone()))
            .unwrap_or_default();
        self.records[index][STATUS_COLUMN] = outcome.status.clone();
        self.records[index][API_ID_COLUMN] = api_id;
        self.records[index][API_SECRET_COLUMN] = api_secret;
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(std::io::Error::other)?;
        for record in &self.header {
            writer.write_record(record).map_err(std::io::Error::other)?;
        }
        for cells in &self.records {
            writer.write_record(cells).map_err(std::io::Error::other)?;
        }
        writer.flush()
    }
}
