use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::io::Read;

use crate::application::{AppError, SplitService};
use crate::domain::{Amount, parse_amount};

/// Result of an import operation
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

/// Error that occurred during import
#[derive(Debug, Clone)]
pub struct ImportError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub dry_run: bool,
    pub create_missing_members: bool,
}

/// Importer for loading expense data into a group
pub struct Importer<'a> {
    service: &'a SplitService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a SplitService) -> Self {
        Self { service }
    }

    /// Import expenses from CSV into a group. Expected columns:
    /// date, description, amount, paid_by, category, splits
    /// where `splits` is empty (equal split) or `name:amount;name:amount`.
    ///
    /// Faulty lines are collected, never fatal; the rest of the file still
    /// imports.
    pub async fn import_expenses_csv<R: Read>(
        &self,
        group_name: &str,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut imported = 0;
        let mut skipped = 0;
        let mut errors = Vec::new();

        for (line_num, result) in csv_reader.records().enumerate() {
            let line = line_num + 2; // +2 for header and 0-indexing

            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    errors.push(ImportError {
                        line,
                        field: None,
                        error: format!("CSV parse error: {}", e),
                    });
                    continue;
                }
            };

            let date_str = record.get(0).unwrap_or("");
            let description = record.get(1).unwrap_or("").to_string();
            let amount_str = record.get(2).unwrap_or("");
            let paid_by = record.get(3).unwrap_or("").to_string();
            let category = record.get(4).and_then(|s| {
                if s.is_empty() {
                    None
                } else {
                    Some(s.to_string())
                }
            });
            let splits_str = record.get(5).unwrap_or("");

            let amount = match parse_amount(amount_str) {
                Ok(a) => a,
                Err(e) => {
                    errors.push(ImportError {
                        line,
                        field: Some("amount".to_string()),
                        error: format!("Invalid amount: {}", e),
                    });
                    continue;
                }
            };

            let date = match parse_import_date(date_str) {
                Ok(d) => d,
                Err(e) => {
                    errors.push(ImportError {
                        line,
                        field: Some("date".to_string()),
                        error: format!("Invalid date: {}", e),
                    });
                    continue;
                }
            };

            let splits = match parse_splits(splits_str) {
                Ok(s) => s,
                Err(e) => {
                    errors.push(ImportError {
                        line,
                        field: Some("splits".to_string()),
                        error: e,
                    });
                    continue;
                }
            };

            if options.create_missing_members {
                let mut names: Vec<&str> = vec![paid_by.as_str()];
                if let Some(splits) = &splits {
                    names.extend(splits.iter().map(|(name, _)| name.as_str()));
                }
                for name in names {
                    if let Err(e) = self
                        .ensure_member(group_name, name, options.dry_run)
                        .await
                    {
                        errors.push(ImportError {
                            line,
                            field: Some("paid_by".to_string()),
                            error: e.to_string(),
                        });
                    }
                }
            }

            if options.dry_run {
                skipped += 1;
                continue;
            }

            match self
                .service
                .add_expense(
                    group_name,
                    description,
                    amount,
                    date,
                    &paid_by,
                    category,
                    splits,
                )
                .await
            {
                Ok(_) => imported += 1,
                Err(e) => {
                    errors.push(ImportError {
                        line,
                        field: None,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(ImportResult {
            imported,
            skipped,
            errors,
        })
    }

    /// Make sure a person exists and belongs to the group, creating roster
    /// entries and memberships as needed.
    async fn ensure_member(&self, group_name: &str, name: &str, dry_run: bool) -> Result<(), AppError> {
        if dry_run {
            return Ok(());
        }
        match self.service.get_person(name).await {
            Ok(_) => {}
            Err(AppError::PersonNotFound(_)) => {
                self.service.add_person(name.to_string(), None).await?;
            }
            Err(e) => return Err(e),
        }
        match self.service.add_member(group_name, name).await {
            Ok(_) | Err(AppError::AlreadyMember { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn parse_import_date(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")?;
    Ok(date
        .and_hms_opt(0, 0, 0)
        .context("Invalid time of day")?
        .and_utc())
}

fn parse_splits(value: &str) -> Result<Option<Vec<(String, Amount)>>, String> {
    if value.trim().is_empty() {
        return Ok(None);
    }

    let mut splits = Vec::new();
    for part in value.split(';') {
        let (name, amount) = part
            .split_once(':')
            .ok_or_else(|| format!("Expected name:amount, got '{}'", part))?;
        let amount = parse_amount(amount).map_err(|e| format!("Invalid share '{}': {}", amount, e))?;
        splits.push((name.trim().to_string(), amount));
    }
    Ok(Some(splits))
}
