//! The point ledger: the only code that writes `users.points_balance`.
//!
//! Every mutation updates the balance with a single conditional `UPDATE`
//! (so concurrent debits can never drive it negative) and appends one
//! `point_transactions` row carrying the resulting balance. The `*_in`
//! variants run on a caller-owned connection so the mutation can share a
//! transaction with other writes; the plain variants open their own.

use pixora_core::types::{DbId, Points};
use sqlx::{PgConnection, PgPool};

use crate::error::LedgerError;
use crate::models::point_transaction::{CreditEntry, PointTransaction};
use crate::models::status::PointTransactionKind;

/// Column list for `point_transactions` queries, with the kind name resolved.
const COLUMNS: &str = "\
    point_transactions.id, point_transactions.user_id, point_transactions.kind_id, \
    (SELECT k.name FROM point_transaction_kinds k WHERE k.id = point_transactions.kind_id) AS kind, \
    point_transactions.amount, point_transactions.balance_after, point_transactions.description, \
    point_transactions.related_job_id, point_transactions.related_order_id, \
    point_transactions.created_at";

/// Maximum page size for transaction listing.
const MAX_LIMIT: i64 = 100;

/// PostgreSQL unique violation.
const UNIQUE_VIOLATION: &str = "23505";

/// Ledger operations over `users` and `point_transactions`.
pub struct LedgerRepo;

impl LedgerRepo {
    /// Current balance of a user.
    pub async fn balance(pool: &PgPool, user_id: DbId) -> Result<Points, LedgerError> {
        sqlx::query_scalar::<_, Points>("SELECT points_balance FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or(LedgerError::UserNotFound(user_id))
    }

    /// Debit `amount` points in its own transaction.
    pub async fn debit(
        pool: &PgPool,
        user_id: DbId,
        amount: Points,
        description: &str,
        related_job_id: Option<DbId>,
    ) -> Result<PointTransaction, LedgerError> {
        let mut tx = pool.begin().await?;
        let entry = Self::debit_in(&mut tx, user_id, amount, description, related_job_id).await?;
        tx.commit().await?;
        Ok(entry)
    }

    /// Debit `amount` points on an existing connection.
    ///
    /// Fails with [`LedgerError::InsufficientFunds`] without writing
    /// anything if the balance would go negative.
    pub async fn debit_in(
        conn: &mut PgConnection,
        user_id: DbId,
        amount: Points,
        description: &str,
        related_job_id: Option<DbId>,
    ) -> Result<PointTransaction, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let new_balance = sqlx::query_scalar::<_, Points>(
            "UPDATE users SET points_balance = points_balance - $2 \
             WHERE id = $1 AND points_balance >= $2 \
             RETURNING points_balance",
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(new_balance) = new_balance else {
            let available =
                sqlx::query_scalar::<_, Points>("SELECT points_balance FROM users WHERE id = $1")
                    .bind(user_id)
                    .fetch_optional(&mut *conn)
                    .await?;
            return Err(match available {
                None => LedgerError::UserNotFound(user_id),
                Some(available) => LedgerError::InsufficientFunds {
                    required: amount,
                    available,
                },
            });
        };

        let entry = Self::append(
            conn,
            user_id,
            PointTransactionKind::Consume,
            -amount,
            new_balance,
            description,
            related_job_id,
            None,
        )
        .await?;

        tracing::debug!(user_id, amount, new_balance, "Points debited");
        Ok(entry)
    }

    /// Credit points in its own transaction.
    ///
    /// A recharge carrying an order id that was already credited returns
    /// the existing entry instead of crediting twice. Replaying an order
    /// for a different user fails with [`LedgerError::OrderConflict`].
    pub async fn credit(pool: &PgPool, entry: &CreditEntry) -> Result<PointTransaction, LedgerError> {
        if let Some(existing) = Self::find_recharge(pool, entry).await? {
            let existing = Self::same_owner(existing, entry)?;
            tracing::info!(
                user_id = entry.user_id,
                order_id = ?entry.related_order_id,
                "Recharge already applied, skipping",
            );
            return Ok(existing);
        }

        let mut tx = pool.begin().await?;
        match Self::credit_in(&mut tx, entry).await {
            Ok(row) => {
                tx.commit().await?;
                Ok(row)
            }
            // Lost a race with an identical recharge.
            Err(LedgerError::Database(sqlx::Error::Database(db_err)))
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                drop(tx);
                let existing = Self::find_recharge(pool, entry)
                    .await?
                    .ok_or(LedgerError::Database(sqlx::Error::Database(db_err)))?;
                Self::same_owner(existing, entry)
            }
            Err(e) => Err(e),
        }
    }

    /// Credit points on an existing connection.
    pub async fn credit_in(
        conn: &mut PgConnection,
        entry: &CreditEntry,
    ) -> Result<PointTransaction, LedgerError> {
        if entry.amount <= 0 {
            return Err(LedgerError::InvalidAmount(entry.amount));
        }

        let new_balance = sqlx::query_scalar::<_, Points>(
            "UPDATE users SET points_balance = points_balance + $2 \
             WHERE id = $1 \
             RETURNING points_balance",
        )
        .bind(entry.user_id)
        .bind(entry.amount)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(LedgerError::UserNotFound(entry.user_id))?;

        let row = Self::append(
            conn,
            entry.user_id,
            entry.kind,
            entry.amount,
            new_balance,
            &entry.description,
            entry.related_job_id,
            entry.related_order_id.as_deref(),
        )
        .await?;

        tracing::debug!(
            user_id = entry.user_id,
            amount = entry.amount,
            kind = entry.kind.name(),
            new_balance,
            "Points credited",
        );
        Ok(row)
    }

    /// A user's transactions, newest first.
    pub async fn list_transactions(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PointTransaction>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM point_transactions \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, PointTransaction>(&query)
            .bind(user_id)
            .bind(limit.clamp(1, MAX_LIMIT))
            .bind(offset.max(0))
            .fetch_all(pool)
            .await
    }

    /// Refund entries referencing a job. At most one exists.
    pub async fn find_refunds_for_job(
        pool: &PgPool,
        job_id: DbId,
    ) -> Result<Vec<PointTransaction>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM point_transactions \
             WHERE related_job_id = $1 AND kind_id = $2"
        );
        sqlx::query_as::<_, PointTransaction>(&query)
            .bind(job_id)
            .bind(PointTransactionKind::Refund.id())
            .fetch_all(pool)
            .await
    }

    // ---- private helpers ----

    async fn find_recharge(
        pool: &PgPool,
        entry: &CreditEntry,
    ) -> Result<Option<PointTransaction>, sqlx::Error> {
        let Some(order_id) = entry.related_order_id.as_deref() else {
            return Ok(None);
        };
        if entry.kind != PointTransactionKind::Recharge {
            return Ok(None);
        }
        let query = format!(
            "SELECT {COLUMNS} FROM point_transactions \
             WHERE related_order_id = $1 AND kind_id = $2"
        );
        sqlx::query_as::<_, PointTransaction>(&query)
            .bind(order_id)
            .bind(PointTransactionKind::Recharge.id())
            .fetch_optional(pool)
            .await
    }

    fn same_owner(
        existing: PointTransaction,
        entry: &CreditEntry,
    ) -> Result<PointTransaction, LedgerError> {
        if existing.user_id == entry.user_id {
            return Ok(existing);
        }
        let order_id = existing.related_order_id.unwrap_or_default();
        tracing::warn!(
            user_id = entry.user_id,
            owner_id = existing.user_id,
            order_id = %order_id,
            "Recharge order replayed for another user",
        );
        Err(LedgerError::OrderConflict(order_id))
    }

    #[allow(clippy::too_many_arguments)]
    async fn append(
        conn: &mut PgConnection,
        user_id: DbId,
        kind: PointTransactionKind,
        amount: Points,
        balance_after: Points,
        description: &str,
        related_job_id: Option<DbId>,
        related_order_id: Option<&str>,
    ) -> Result<PointTransaction, sqlx::Error> {
        let query = format!(
            "INSERT INTO point_transactions \
                (user_id, kind_id, amount, balance_after, description, related_job_id, related_order_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PointTransaction>(&query)
            .bind(user_id)
            .bind(kind.id())
            .bind(amount)
            .bind(balance_after)
            .bind(description)
            .bind(related_job_id)
            .bind(related_order_id)
            .fetch_one(&mut *conn)
            .await
    }
}
