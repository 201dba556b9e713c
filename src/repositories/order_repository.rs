use crate::models::order::{CheckoutDetails, Order, OrderStatus};
use async_trait::async_trait;
use sqlx::SqlitePool;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Order not found")]
    NotFound,
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

const ORDER_COLUMNS: &str =
    "id, checkout_id, status, customer_email, amount, currency, created_at, updated_at";

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait OrderRepository: Send + Sync {
    /// Records the new status for a checkout, creating the order on first sight.
    async fn upsert_status(
        &self,
        checkout_id: &str,
        status: OrderStatus,
        details: CheckoutDetails,
    ) -> RepositoryResult<Order>;
    async fn find_by_checkout_id(&self, checkout_id: &str) -> RepositoryResult<Option<Order>>;
    async fn list_recent(&self, limit: i64) -> RepositoryResult<Vec<Order>>;
}

pub struct SqliteOrderRepository {
    pool: SqlitePool,
}

impl SqliteOrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for SqliteOrderRepository {
    async fn upsert_status(
        &self,
        checkout_id: &str,
        status: OrderStatus,
        details: CheckoutDetails,
    ) -> RepositoryResult<Order> {
        // Details only overwrite stored values when the event carries them.
        sqlx::query(
            r#"
            INSERT INTO orders (checkout_id, status, customer_email, amount, currency)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(checkout_id) DO UPDATE SET
                status = excluded.status,
                customer_email = COALESCE(excluded.customer_email, orders.customer_email),
                amount = COALESCE(excluded.amount, orders.amount),
                currency = COALESCE(excluded.currency, orders.currency),
                updated_at = datetime('now')
            "#,
        )
        .bind(checkout_id)
        .bind(status.as_str())
        .bind(details.customer_email)
        .bind(details.amount)
        .bind(details.currency)
        .execute(&self.pool)
        .await?;

        self.find_by_checkout_id(checkout_id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_checkout_id(&self, checkout_id: &str) -> RepositoryResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE checkout_id = ?",
            ORDER_COLUMNS
        ))
        .bind(checkout_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn list_recent(&self, limit: i64) -> RepositoryResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders ORDER BY updated_at DESC, id DESC LIMIT ?",
            ORDER_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_helpers;

    #[tokio::test]
    async fn upsert_creates_then_updates_order() {
        let pool = test_helpers::create_test_db().await.unwrap();
        let repository = SqliteOrderRepository::new(pool);

        let created = repository
            .upsert_status(
                "chk_1",
                OrderStatus::Completed,
                CheckoutDetails {
                    customer_email: Some("buyer@example.com".to_string()),
                    amount: Some(1500),
                    currency: Some("usd".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(created.status, "completed");

        let updated = repository
            .upsert_status("chk_1", OrderStatus::Canceled, CheckoutDetails::default())
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.status, "canceled");
        assert_eq!(updated.customer_email.as_deref(), Some("buyer@example.com"));
        assert_eq!(updated.amount, Some(1500));
    }

    #[tokio::test]
    async fn find_missing_checkout_returns_none() {
        let pool = test_helpers::create_test_db().await.unwrap();
        let repository = SqliteOrderRepository::new(pool);

        assert!(repository
            .find_by_checkout_id("chk_missing")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn list_recent_respects_limit() {
        let pool = test_helpers::create_test_db().await.unwrap();
        let repository = SqliteOrderRepository::new(pool);

        for id in ["chk_a", "chk_b", "chk_c"] {
            repository
                .upsert_status(id, OrderStatus::Canceled, CheckoutDetails::default())
                .await
                .unwrap();
        }

        let orders = repository.list_recent(2).await.unwrap();
        assert_eq!(orders.len(), 2);
    }
}
