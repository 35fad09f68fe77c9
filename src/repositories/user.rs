//! User repository for database operations.

use std::collections::HashSet;

use anyhow::Result;
use sea_orm::{ActiveValue, ConnectionTrait, DatabaseConnection};

use crate::entities::user;

/// Repository for user-related database operations.
pub struct UserRepository;

impl UserRepository {
    pub async fn existing_ids<C>(conn: &C) -> Result<HashSet<String>>
    where
        C: ConnectionTrait,
    {
        super::existing_ids::<user::Entity, C>(conn).await
    }

    pub async fn upsert_many(db: &DatabaseConnection, users: Vec<user::Model>) -> Result<u64> {
        let rows: Vec<user::ActiveModel> = users
            .into_iter()
            .map(|u| user::ActiveModel {
                id: ActiveValue::Set(u.id),
                name: ActiveValue::Set(u.name),
            })
            .collect();
        super::upsert_batch::<user::Entity, _>(db, rows).await
    }
}
