use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, OrderNumber};
use domain::{
    InventoryTransaction, Money, Order, Product, ProductId, TransactionKind,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::store::{OrderCommit, TierStore};

/// PostgreSQL-backed tier store.
///
/// Orders are persisted as a JSONB document alongside the columns used for
/// lookups; products and inventory transactions are plain rows. Every trait
/// method runs in one transaction, and `apply_commit` takes row locks on the
/// order and each touched product so concurrent accepts serialize on the
/// status precondition.
#[derive(Clone)]
pub struct PostgresTierStore {
    pool: PgPool,
}

impl PostgresTierStore {
    /// Creates a new PostgreSQL tier store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the schema if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                id UUID PRIMARY KEY,
                order_number TEXT NOT NULL UNIQUE,
                status TEXT NOT NULL,
                doc JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            );

            CREATE TABLE IF NOT EXISTS products (
                sku TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                unit_price_cents BIGINT NOT NULL,
                current_stock BIGINT NOT NULL,
                reserved_stock BIGINT NOT NULL,
                min_stock_level BIGINT,
                reorder_point BIGINT,
                reorder_quantity BIGINT,
                active BOOLEAN NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            );

            CREATE TABLE IF NOT EXISTS inventory_transactions (
                id UUID PRIMARY KEY,
                product_sku TEXT NOT NULL,
                kind TEXT NOT NULL,
                quantity BIGINT NOT NULL,
                reference TEXT NOT NULL,
                occurred_at TIMESTAMPTZ NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_inventory_transactions_sku
                ON inventory_transactions (product_sku, occurred_at);
            "#,
        )
        .execute(&self.pool)
        .await?;
        tracing::debug!("tier store schema ensured");
        Ok(())
    }

    fn row_to_order(row: &PgRow) -> Result<Order> {
        let doc: serde_json::Value = row.try_get("doc")?;
        Ok(serde_json::from_value(doc)?)
    }

    fn row_to_product(row: &PgRow) -> Result<Product> {
        Ok(Product {
            sku: ProductId::new(row.try_get::<String, _>("sku")?),
            name: row.try_get("name")?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            current_stock: row.try_get("current_stock")?,
            reserved_stock: row.try_get("reserved_stock")?,
            min_stock_level: row.try_get("min_stock_level")?,
            reorder_point: row.try_get("reorder_point")?,
            reorder_quantity: row.try_get("reorder_quantity")?,
            active: row.try_get("active")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_transaction(row: &PgRow) -> Result<InventoryTransaction> {
        let kind: String = row.try_get("kind")?;
        let kind = TransactionKind::parse(&kind).ok_or_else(|| {
            StoreError::Serialization(serde_json::Error::io(std::io::Error::other(format!(
                "unknown transaction kind: {kind}"
            ))))
        })?;
        Ok(InventoryTransaction {
            id: row.try_get::<Uuid, _>("id")?,
            product_id: ProductId::new(row.try_get::<String, _>("product_sku")?),
            kind,
            quantity: row.try_get("quantity")?,
            reference: OrderNumber::from_string(row.try_get::<String, _>("reference")?),
            occurred_at: row.try_get::<DateTime<Utc>, _>("occurred_at")?,
        })
    }
}

#[async_trait]
impl TierStore for PostgresTierStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let doc = serde_json::to_value(order)?;
        sqlx::query(
            r#"
            INSERT INTO orders (id, order_number, status, doc, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.order_number().as_str())
        .bind(order.status().as_str())
        .bind(&doc)
        .bind(order.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::DuplicateOrderNumber(order.order_number().clone());
            }
            StoreError::Database(e)
        })?;
        Ok(())
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT doc FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_order).transpose()
    }

    async fn order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT doc FROM orders WHERE order_number = $1")
            .bind(number.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_order).transpose()
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query("SELECT doc FROM orders ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_order).collect()
    }

    async fn apply_commit(&self, commit: OrderCommit) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        // Lock the order row; concurrent commits on the same order queue here.
        let row = sqlx::query("SELECT doc FROM orders WHERE id = $1 FOR UPDATE")
            .bind(commit.order_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::OrderNotFound(commit.order_id))?;
        let mut order = Self::row_to_order(&row)?;

        // Dropping `tx` without commit rolls everything back on error.
        order.transition(commit.new_status)?;

        let reference = order.order_number().clone();
        for movement in &commit.movements {
            let current: Option<i64> =
                sqlx::query_scalar("SELECT current_stock FROM products WHERE sku = $1 FOR UPDATE")
                    .bind(movement.product_id.as_str())
                    .fetch_optional(&mut *tx)
                    .await?;
            let current =
                current.ok_or_else(|| StoreError::ProductNotFound(movement.product_id.clone()))?;

            if movement.kind == TransactionKind::Out && current < movement.quantity {
                return Err(StoreError::InsufficientStock {
                    product_id: movement.product_id.clone(),
                    available: current,
                    required: movement.quantity,
                });
            }

            sqlx::query("UPDATE products SET current_stock = current_stock + $2 WHERE sku = $1")
                .bind(movement.product_id.as_str())
                .bind(movement.kind.signed(movement.quantity))
                .execute(&mut *tx)
                .await?;

            let entry = InventoryTransaction::record(
                movement.product_id.clone(),
                movement.kind,
                movement.quantity,
                reference.clone(),
            );
            sqlx::query(
                r#"
                INSERT INTO inventory_transactions (id, product_sku, kind, quantity, reference, occurred_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(entry.id)
            .bind(entry.product_id.as_str())
            .bind(entry.kind.as_str())
            .bind(entry.quantity)
            .bind(entry.reference.as_str())
            .bind(entry.occurred_at)
            .execute(&mut *tx)
            .await?;
        }

        let doc = serde_json::to_value(&order)?;
        sqlx::query("UPDATE orders SET status = $2, doc = $3 WHERE id = $1")
            .bind(order.id().as_uuid())
            .bind(order.status().as_str())
            .bind(&doc)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(order)
    }

    async fn upsert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products
                (sku, name, unit_price_cents, current_stock, reserved_stock,
                 min_stock_level, reorder_point, reorder_quantity, active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (sku) DO UPDATE SET
                name = EXCLUDED.name,
                unit_price_cents = EXCLUDED.unit_price_cents,
                current_stock = EXCLUDED.current_stock,
                reserved_stock = EXCLUDED.reserved_stock,
                min_stock_level = EXCLUDED.min_stock_level,
                reorder_point = EXCLUDED.reorder_point,
                reorder_quantity = EXCLUDED.reorder_quantity,
                active = EXCLUDED.active
            "#,
        )
        .bind(product.sku.as_str())
        .bind(&product.name)
        .bind(product.unit_price.cents())
        .bind(product.current_stock)
        .bind(product.reserved_stock)
        .bind(product.min_stock_level)
        .bind(product.reorder_point)
        .bind(product.reorder_quantity)
        .bind(product.active)
        .bind(product.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn product(&self, sku: &ProductId) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT * FROM products WHERE sku = $1")
            .bind(sku.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn transactions_for(&self, sku: &ProductId) -> Result<Vec<InventoryTransaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_sku, kind, quantity, reference, occurred_at
            FROM inventory_transactions
            WHERE product_sku = $1
            ORDER BY occurred_at ASC
            "#,
        )
        .bind(sku.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_transaction).collect()
    }
}
