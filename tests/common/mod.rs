// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use splitledger::application::SplitService;
use splitledger::domain::GroupType;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(SplitService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = SplitService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Test fixture: standard group setup
pub struct StandardGroup;

impl StandardGroup {
    /// Create a "Flat" apartment group with members Alice, Bob and Carol
    pub async fn create_flat(service: &SplitService) -> Result<()> {
        service
            .create_group("Flat".into(), GroupType::Apartment, None)
            .await?;
        for name in ["Alice", "Bob", "Carol"] {
            service.add_person(name.into(), None).await?;
            service.add_member("Flat", name).await?;
        }
        Ok(())
    }

    /// Create a two-person "Trip" group with Dana and Eve
    pub async fn create_trip(service: &SplitService) -> Result<()> {
        service
            .create_group("Trip".into(), GroupType::Trip, None)
            .await?;
        for name in ["Dana", "Eve"] {
            service.add_person(name.into(), None).await?;
            service.add_member("Trip", name).await?;
        }
        Ok(())
    }

    /// Record an evenly split expense in a group
    pub async fn add_equal_expense(
        service: &SplitService,
        group: &str,
        description: &str,
        amount: f64,
        paid_by: &str,
        date: DateTime<Utc>,
    ) -> Result<()> {
        service
            .add_expense(
                group,
                description.to_string(),
                amount,
                date,
                paid_by,
                None,
                None,
            )
            .await?;
        Ok(())
    }
}
