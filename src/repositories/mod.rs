//! Repository layer for database operations.
//!
//! This module provides repository structs that encapsulate database queries
//! and operations, following the Data Mapper pattern recommended by SeaORM.
//! Repositories keep entities as pure data models while providing reusable
//! database access methods.
//!
//! The shared helpers below implement the two operations every entity needs:
//! loading the set of persisted identifiers and writing rows idempotently.

pub mod board;
pub mod task;
pub mod user;

pub use board::BoardRepository;
pub use task::TaskRepository;
pub use user::UserRepository;

use std::collections::HashSet;

use anyhow::{anyhow, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, IdenStatic, IntoActiveModel,
    Iterable, PrimaryKeyToColumn, QuerySelect, TransactionTrait,
};

use crate::constants::UPSERT_CHUNK_SIZE;

fn primary_key<E: EntityTrait>() -> Result<E::Column> {
    E::PrimaryKey::iter()
        .next()
        .map(|key| key.into_column())
        .ok_or_else(|| anyhow!("Table {} has no primary key", E::default().table_name()))
}

/// Every primary-key value currently stored for `E`.
pub(crate) async fn existing_ids<E, C>(conn: &C) -> Result<HashSet<String>>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let ids: Vec<String> = E::find()
        .select_only()
        .column(primary_key::<E>()?)
        .into_tuple()
        .all(conn)
        .await?;
    Ok(ids.into_iter().collect())
}

/// Insert rows, overwriting every non-key column of rows whose key exists.
///
/// All chunks are written inside one transaction, so either every row lands
/// or none do. An empty batch does not touch the database.
pub(crate) async fn upsert_batch<E, A>(db: &DatabaseConnection, rows: Vec<A>) -> Result<u64>
where
    E: EntityTrait,
    E::Model: IntoActiveModel<A>,
    A: ActiveModelTrait<Entity = E> + Send,
{
    if rows.is_empty() {
        return Ok(0);
    }

    let key = primary_key::<E>()?;
    let value_columns: Vec<E::Column> = E::Column::iter().filter(|c| c.as_str() != key.as_str()).collect();
    let on_conflict = OnConflict::column(key).update_columns(value_columns).to_owned();

    let txn = db.begin().await?;
    let mut written = 0;
    let mut rows = rows.into_iter().peekable();
    while rows.peek().is_some() {
        let chunk: Vec<A> = rows.by_ref().take(UPSERT_CHUNK_SIZE).collect();
        written += E::insert_many(chunk)
            .on_conflict(on_conflict.clone())
            .exec_without_returning(&txn)
            .await?;
    }
    txn.commit().await?;

    Ok(written)
}
