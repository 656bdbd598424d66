//! Persisted chip boundary.
//!
//! The engine reads a player's chip balance when they sit down and writes
//! the result back when they leave or a hand settles. No transactional
//! coupling with the store is assumed: settlement rows are keyed by
//! (hand_id, user_id) and applied at most once, so a retried write-back
//! after a partial failure is harmless.

use std::sync::Arc;

use sqlx::{PgPool, Row};
use thiserror::Error;
use uuid::Uuid;

use crate::game::{Chips, UserId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user {0} not found")]
    UserNotFound(UserId),
    #[error("user {0} has insufficient balance")]
    InsufficientBalance(UserId),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct ChipStore {
    pool: Arc<PgPool>,
}

impl ChipStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Balance read at join time.
    pub async fn balance(&self, user_id: UserId) -> Result<Chips, StoreError> {
        let row = sqlx::query("SELECT chips FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or(StoreError::UserNotFound(user_id))?;
        let chips: i64 = row.get("chips");
        Ok(chips.max(0) as Chips)
    }

    /// Move a buy-in out of the stored balance and onto the table.
    /// Refuses rather than going negative.
    pub async fn debit(&self, user_id: UserId, amount: Chips) -> Result<(), StoreError> {
        let applied = sqlx::query(
            "UPDATE users SET chips = chips - $2 WHERE id = $1 AND chips >= $2",
        )
        .bind(user_id)
        .bind(amount as i64)
        .execute(self.pool.as_ref())
        .await?
        .rows_affected()
            > 0;
        if applied {
            Ok(())
        } else {
            Err(StoreError::InsufficientBalance(user_id))
        }
    }

    /// Return a stack to the stored balance when a player leaves.
    pub async fn credit(&self, user_id: UserId, amount: Chips) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET chips = chips + $2 WHERE id = $1")
            .bind(user_id)
            .bind(amount as i64)
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }

    /// Record one player's hand result in the settlement ledger. Keyed
    /// by (hand_id, user_id): replaying the same settlement after a
    /// partial failure is a no-op. Returns whether the row was new.
    pub async fn record_settlement(
        &self,
        hand_id: Uuid,
        user_id: UserId,
        delta: i64,
    ) -> Result<bool, StoreError> {
        let inserted = sqlx::query(
            "INSERT INTO hand_settlements (hand_id, user_id, delta) \
             VALUES ($1, $2, $3) ON CONFLICT (hand_id, user_id) DO NOTHING",
        )
        .bind(hand_id)
        .bind(user_id)
        .bind(delta)
        .execute(self.pool.as_ref())
        .await?
        .rows_affected()
            > 0;
        Ok(inserted)
    }

    /// Bump the per-user hand counters after a settled hand.
    pub async fn record_hand_played(&self, user_id: UserId, won: bool) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET games_played = games_played + 1, \
             games_won = games_won + $2 WHERE id = $1",
        )
        .bind(user_id)
        .bind(if won { 1i64 } else { 0 })
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }
}
