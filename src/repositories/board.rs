//! Board repository for database operations.

use std::collections::HashSet;

use anyhow::Result;
use sea_orm::{ActiveValue, ConnectionTrait, DatabaseConnection};

use crate::entities::board;

/// Repository for board-related database operations.
pub struct BoardRepository;

impl BoardRepository {
    /// Identifiers of all stored boards.
    pub async fn existing_ids<C>(conn: &C) -> Result<HashSet<String>>
    where
        C: ConnectionTrait,
    {
        super::existing_ids::<board::Entity, C>(conn).await
    }

    /// Insert or overwrite boards in a single transaction.
    pub async fn upsert_many(db: &DatabaseConnection, boards: Vec<board::Model>) -> Result<u64> {
        let rows: Vec<board::ActiveModel> = boards
            .into_iter()
            .map(|b| board::ActiveModel {
                id: ActiveValue::Set(b.id),
                name: ActiveValue::Set(b.name),
            })
            .collect();
        super::upsert_batch::<board::Entity, _>(db, rows).await
    }
}
