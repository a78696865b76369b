use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderNumber, SkuCode};
use domain::{CommittedOrder, LineItem, Money};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{OrderRepository, Result, StoreError};

/// PostgreSQL-backed order repository.
#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    /// Creates a new PostgreSQL order repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the given database URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn load_line_items(&self, order_number: OrderNumber) -> Result<Vec<LineItem>> {
        let rows = sqlx::query(
            r#"
            SELECT sku_code, unit_price_cents, quantity
            FROM order_line_items
            WHERE order_number = $1
            ORDER BY position ASC
            "#,
        )
        .bind(order_number.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<LineItem> {
                Ok(LineItem {
                    sku: SkuCode::new(row.try_get::<String, _>("sku_code")?),
                    unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
                    quantity: stored_quantity(order_number, row.try_get::<i64, _>("quantity")?)?,
                })
            })
            .collect()
    }
}

/// Converts a stored `BIGINT` quantity back into a line item quantity.
fn stored_quantity(order_number: OrderNumber, quantity: i64) -> Result<u32> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| *q > 0)
        .ok_or_else(|| {
            StoreError::InvalidRow(format!(
                "order {order_number}: quantity {quantity} out of range"
            ))
        })
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn save(&self, order: &CommittedOrder) -> Result<()> {
        let order_number = order.order_number();
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO orders (order_number, committed_at) VALUES ($1, $2)")
            .bind(order_number.as_uuid())
            .bind(order.committed_at())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return StoreError::DuplicateOrder(order_number);
                }
                StoreError::Database(e)
            })?;

        for (position, item) in order.line_items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_line_items (order_number, position, sku_code, unit_price_cents, quantity)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order_number.as_uuid())
            .bind(position as i32)
            .bind(item.sku.as_str())
            .bind(item.unit_price.cents())
            .bind(i64::from(item.quantity))
            .execute(&mut *tx)
            .await?;
        }

        // Dropping `tx` on any early return above rolls the whole order back.
        tx.commit().await?;

        metrics::counter!("orders_saved_total", "store" => "postgres").increment(1);
        tracing::debug!(%order_number, lines = order.line_items().len(), "order saved");
        Ok(())
    }

    async fn find(&self, order_number: OrderNumber) -> Result<Option<CommittedOrder>> {
        let row = sqlx::query("SELECT order_number, committed_at FROM orders WHERE order_number = $1")
            .bind(order_number.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let stored_number = OrderNumber::from_uuid(row.try_get::<Uuid, _>("order_number")?);
        let committed_at: DateTime<Utc> = row.try_get("committed_at")?;
        let line_items = self.load_line_items(stored_number).await?;

        Ok(Some(CommittedOrder::restore(
            stored_number,
            line_items,
            committed_at,
        )))
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as usize)
    }
}
