//! Cafe and table seeding from config.toml
//!
//! The cafes listed in config.toml, together with their table labels, are
//! inserted on startup when missing. Existing rows are left untouched.

use crate::entities::{Cafe, DiningTable, cafe, dining_table};
use crate::errors::Result;
use sea_orm::{Set, prelude::*};
use serde::Deserialize;
use tracing::{info, instrument};

/// Configuration for a single cafe
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CafeConfig {
    /// Cafe identifier used by the apps
    pub id: i64,
    /// Display name
    pub name: String,
    /// Whether the whole floor orders through the app
    #[serde(default)]
    pub complete_pos: bool,
    /// Table labels
    #[serde(default)]
    pub tables: Vec<String>,
}

/// Inserts missing cafes and tables. Returns the number of rows created.
#[instrument(skip(db, cafes))]
pub async fn seed_cafes(db: &DatabaseConnection, cafes: &[CafeConfig]) -> Result<usize> {
    let mut created = 0;
    for config in cafes {
        if Cafe::find_by_id(config.id).one(db).await?.is_none() {
            cafe::ActiveModel {
                id: Set(config.id),
                name: Set(config.name.clone()),
                complete_pos: Set(config.complete_pos),
            }
            .insert(db)
            .await?;
            created += 1;
        }

        for table in &config.tables {
            let exists = DiningTable::find()
                .filter(dining_table::Column::CafeId.eq(config.id))
                .filter(dining_table::Column::Name.eq(table.as_str()))
                .one(db)
                .await?
                .is_some();
            if !exists {
                dining_table::ActiveModel {
                    cafe_id: Set(config.id),
                    name: Set(table.clone()),
                    ..Default::default()
                }
                .insert(db)
                .await?;
                created += 1;
            }
        }
    }
    info!("Seeded {} cafe/table rows", created);
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn test_seed_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let cafes = vec![CafeConfig {
            id: 3,
            name: "Seeded".to_string(),
            complete_pos: true,
            tables: vec!["T1".to_string(), "T2".to_string()],
        }];

        assert_eq!(seed_cafes(&db, &cafes).await?, 3);
        assert_eq!(seed_cafes(&db, &cafes).await?, 0);

        let tables = DiningTable::find()
            .filter(dining_table::Column::CafeId.eq(3))
            .all(&db)
            .await?;
        assert_eq!(tables.len(), 2);
        Ok(())
    }
}
