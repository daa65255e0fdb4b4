use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::SplitService;
use crate::domain::{Group, format_amount};

/// Group snapshot for full export/import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub group: Group,
}

/// Exporter for converting group data to various formats
pub struct Exporter<'a> {
    service: &'a SplitService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a SplitService) -> Self {
        Self { service }
    }

    /// Export a group's expenses to CSV format. Splits are serialized as
    /// `name:amount` pairs joined with `;`. Amounts are rounded to two
    /// decimals here, at the presentation boundary.
    pub async fn export_expenses_csv<W: Write>(
        &self,
        group_name: &str,
        writer: W,
    ) -> Result<usize> {
        let group = self.service.get_group(group_name).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        // Write header
        csv_writer.write_record([
            "id",
            "date",
            "description",
            "amount",
            "paid_by",
            "category",
            "splits",
        ])?;

        let mut count = 0;
        for expense in &group.expenses {
            let splits = expense
                .splits
                .iter()
                .map(|s| format!("{}:{}", group.member_name(s.member_id), format_amount(s.amount)))
                .collect::<Vec<_>>()
                .join(";");

            csv_writer.write_record([
                expense.id.to_string(),
                expense.date.to_rfc3339(),
                expense.description.clone(),
                format_amount(expense.amount),
                group.member_name(expense.paid_by).to_string(),
                expense.category.clone(),
                splits,
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export a group's net balances to CSV format.
    pub async fn export_balances_csv<W: Write>(
        &self,
        group_name: &str,
        writer: W,
    ) -> Result<usize> {
        let balances = self.service.group_balances(group_name).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        // Write header
        csv_writer.write_record(["member", "balance"])?;

        let mut count = 0;
        for entry in &balances {
            csv_writer.write_record([entry.name.clone(), format_amount(entry.balance)])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export a full group (members and expenses) as a JSON snapshot.
    pub async fn export_full_json<W: Write>(
        &self,
        group_name: &str,
        mut writer: W,
    ) -> Result<GroupSnapshot> {
        let group = self.service.get_group(group_name).await?;

        let snapshot = GroupSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            group,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
