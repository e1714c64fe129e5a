//! Order repository.
//!
//! Every mutation runs in one transaction together with its domain event.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use marketplace_core::{
    CartId, GuestInfo, OrderId, OrderItemId, ProductId, UserId, fits_amount, order_total,
};

use super::RepositoryError;
use super::events;
use crate::models::event::{EventKind, NewEvent};
use crate::models::order::{NewOrder, NewOrderItem, Order, OrderItem, OrderPatch};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    order_number: String,
    user_id: Option<i32>,
    guest_first_name: Option<String>,
    guest_last_name: Option<String>,
    guest_email: Option<String>,
    shipping_address: serde_json::Value,
    payment_method: String,
    total_price: Decimal,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    is_delivered: bool,
    delivered_at: Option<DateTime<Utc>>,
    is_confirmed_by_admin: bool,
    confirmed_at: Option<DateTime<Utc>>,
    client_confirmed_payment: bool,
    client_confirmed_at: Option<DateTime<Utc>>,
    payment_code: Option<String>,
    payment_code_generated_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        let guest_info = self.guest_email.map(|email| GuestInfo {
            first_name: self.guest_first_name.unwrap_or_default(),
            last_name: self.guest_last_name.unwrap_or_default(),
            email,
        });

        Order {
            id: OrderId::new(self.id),
            order_number: self.order_number,
            user_id: self.user_id.map(UserId::new),
            guest_info,
            shipping_address: self.shipping_address,
            payment_method: self.payment_method,
            total_price: self.total_price,
            is_paid: self.is_paid,
            paid_at: self.paid_at,
            is_delivered: self.is_delivered,
            delivered_at: self.delivered_at,
            is_confirmed_by_admin: self.is_confirmed_by_admin,
            confirmed_at: self.confirmed_at,
            client_confirmed_payment: self.client_confirmed_payment,
            client_confirmed_at: self.client_confirmed_at,
            payment_code: self.payment_code,
            payment_code_generated_at: self.payment_code_generated_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: i32,
    order_id: i32,
    product_id: Option<i32>,
    seller_id: Option<i32>,
    product_name: String,
    quantity: i32,
    price: Decimal,
}

impl From<OrderItemRow> for OrderItem {
    fn from(r: OrderItemRow) -> Self {
        Self {
            id: OrderItemId::new(r.id),
            order_id: OrderId::new(r.order_id),
            product_id: r.product_id.map(ProductId::new),
            seller_id: r.seller_id.map(UserId::new),
            product_name: r.product_name,
            quantity: r.quantity,
            price: r.price,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    product_id: i32,
    seller_id: i32,
    product_name: String,
    quantity: i32,
    price: Decimal,
}

impl From<SnapshotRow> for NewOrderItem {
    fn from(r: SnapshotRow) -> Self {
        Self {
            product_id: ProductId::new(r.product_id),
            seller_id: UserId::new(r.seller_id),
            product_name: r.product_name,
            quantity: r.quantity,
            price: r.price,
        }
    }
}

/// Order fields for checkout; items and total come from the cart.
#[derive(Debug, Clone)]
pub struct Checkout {
    pub order_number: String,
    pub user_id: Option<UserId>,
    pub guest_info: Option<GuestInfo>,
    pub shipping_address: serde_json::Value,
    pub payment_method: String,
}

/// Outcome of [`OrderRepository::place_from_cart`].
#[derive(Debug)]
pub enum Placement {
    Placed(Order),
    /// The cart has no orderable lines.
    EmptyCart,
    /// The total does not fit the order total column.
    TotalTooLarge(Decimal),
}

/// Result of an admin payment confirmation.
#[derive(Debug)]
pub struct AdminConfirmation {
    pub order: Order,
    /// `false` when the order was already confirmed and nothing was written.
    pub changed: bool,
}

/// Repository for orders and order items.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Turn a cart into an order.
    ///
    /// In one transaction: lock the cart row, remove its lines while
    /// snapshotting current product prices, insert the order and its items,
    /// and append `order.placed`. The cart row itself is kept, and so are
    /// lines for hidden products.
    ///
    /// Nothing is written unless the result is [`Placement::Placed`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the cart does not exist.
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn place_from_cart(
        &self,
        cart_id: CartId,
        checkout: Checkout,
    ) -> Result<Placement, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, i32>(
            r"
            SELECT id FROM marketplace.cart
            WHERE id = $1
            FOR UPDATE
            ",
        )
        .bind(cart_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let snapshot: Vec<NewOrderItem> = sqlx::query_as::<_, SnapshotRow>(
            r"
            WITH removed AS (
                DELETE FROM marketplace.cart_item ci
                USING marketplace.product vp
                WHERE ci.cart_id = $1 AND vp.id = ci.product_id AND vp.is_visible
                RETURNING ci.id, ci.product_id, ci.quantity
            )
            SELECT p.id AS product_id, p.created_by_id AS seller_id,
                   p.name AS product_name, r.quantity, p.price
            FROM removed r
            JOIN marketplace.product p ON p.id = r.product_id
            ORDER BY r.id
            ",
        )
        .bind(cart_id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(NewOrderItem::from)
        .collect();

        if snapshot.is_empty() {
            tx.rollback().await?;
            return Ok(Placement::EmptyCart);
        }

        let total_price = order_total(snapshot.iter().map(|i| (i.price, i.quantity)));
        if !fits_amount(total_price) {
            tx.rollback().await?;
            return Ok(Placement::TotalTooLarge(total_price));
        }

        let new_order = NewOrder {
            order_number: checkout.order_number,
            user_id: checkout.user_id,
            guest_info: checkout.guest_info,
            shipping_address: checkout.shipping_address,
            payment_method: checkout.payment_method,
            total_price,
            items: snapshot,
        };

        let order = insert_order(&mut tx, &new_order).await?;
        let event = NewEvent::for_order(EventKind::OrderPlaced, order.id, order.user_id)
            .with_payload(serde_json::json!({
                "cartId": cart_id,
                "totalPrice": order.total_price,
            }));
        events::append(&mut tx, &event).await?;

        tx.commit().await?;
        Ok(Placement::Placed(order))
    }

    /// Insert an order built outside the cart flow.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn create(
        &self,
        new_order: &NewOrder,
        actor: UserId,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order = insert_order(&mut tx, new_order).await?;
        let event = NewEvent::for_order(EventKind::OrderCreated, order.id, Some(actor))
            .with_payload(serde_json::json!({ "userId": order.user_id }));
        events::append(&mut tx, &event).await?;

        tx.commit().await?;
        Ok(order)
    }

    /// Get an order with all its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, order_number, user_id, guest_first_name, guest_last_name, guest_email,
                   shipping_address, payment_method, total_price,
                   is_paid, paid_at, is_delivered, delivered_at,
                   is_confirmed_by_admin, confirmed_at,
                   client_confirmed_payment, client_confirmed_at,
                   payment_code, payment_code_generated_at, created_at, updated_at
            FROM marketplace.order
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => {
                let items = self.items_for(&[row.id]).await?.remove(&row.id);
                Ok(Some(row.into_order(items.unwrap_or_default())))
            }
            None => Ok(None),
        }
    }

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, order_number, user_id, guest_first_name, guest_last_name, guest_email,
                   shipping_address, payment_method, total_price,
                   is_paid, paid_at, is_delivered, delivered_at,
                   is_confirmed_by_admin, confirmed_at,
                   client_confirmed_payment, client_confirmed_at,
                   payment_code, payment_code_generated_at, created_at, updated_at
            FROM marketplace.order
            ORDER BY created_at DESC, id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        self.with_items(rows).await
    }

    /// Orders containing at least one item sold by `seller`, newest first.
    ///
    /// Items are returned unfiltered; callers scope them with
    /// [`Order::scoped_to_seller`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_containing_seller(
        &self,
        seller: UserId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, order_number, user_id, guest_first_name, guest_last_name, guest_email,
                   shipping_address, payment_method, total_price,
                   is_paid, paid_at, is_delivered, delivered_at,
                   is_confirmed_by_admin, confirmed_at,
                   client_confirmed_payment, client_confirmed_at,
                   payment_code, payment_code_generated_at, created_at, updated_at
            FROM marketplace.order o
            WHERE EXISTS (
                SELECT 1 FROM marketplace.order_item oi
                WHERE oi.order_id = o.id AND oi.seller_id = $1
            )
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(seller)
        .fetch_all(self.pool)
        .await?;

        self.with_items(rows).await
    }

    /// Orders placed by a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, order_number, user_id, guest_first_name, guest_last_name, guest_email,
                   shipping_address, payment_method, total_price,
                   is_paid, paid_at, is_delivered, delivered_at,
                   is_confirmed_by_admin, confirmed_at,
                   client_confirmed_payment, client_confirmed_at,
                   payment_code, payment_code_generated_at, created_at, updated_at
            FROM marketplace.order
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        self.with_items(rows).await
    }

    /// Apply an edit. `paid_at` / `delivered_at` follow their flags: set on
    /// the first transition to `true`, cleared on `false`.
    ///
    /// Clearing `is_paid` also clears the client and admin confirmations, so
    /// the payment workflow restarts from the issued code (or `Pending`).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn update(
        &self,
        id: OrderId,
        patch: &OrderPatch,
        actor: UserId,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(
            r"
            UPDATE marketplace.order
            SET shipping_address = COALESCE($2, shipping_address),
                payment_method = COALESCE($3, payment_method),
                is_paid = COALESCE($4::boolean, is_paid),
                paid_at = CASE
                    WHEN $4::boolean IS NULL THEN paid_at
                    WHEN $4::boolean THEN COALESCE(paid_at, now())
                    ELSE NULL
                END,
                is_confirmed_by_admin = is_confirmed_by_admin AND $4::boolean IS DISTINCT FROM FALSE,
                confirmed_at = CASE WHEN $4::boolean = FALSE THEN NULL ELSE confirmed_at END,
                client_confirmed_payment =
                    client_confirmed_payment AND $4::boolean IS DISTINCT FROM FALSE,
                client_confirmed_at =
                    CASE WHEN $4::boolean = FALSE THEN NULL ELSE client_confirmed_at END,
                is_delivered = COALESCE($5::boolean, is_delivered),
                delivered_at = CASE
                    WHEN $5::boolean IS NULL THEN delivered_at
                    WHEN $5::boolean THEN COALESCE(delivered_at, now())
                    ELSE NULL
                END
            WHERE id = $1
            RETURNING id, order_number, user_id, guest_first_name, guest_last_name, guest_email,
                      shipping_address, payment_method, total_price,
                      is_paid, paid_at, is_delivered, delivered_at,
                      is_confirmed_by_admin, confirmed_at,
                      client_confirmed_payment, client_confirmed_at,
                      payment_code, payment_code_generated_at, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(&patch.shipping_address)
        .bind(&patch.payment_method)
        .bind(patch.is_paid)
        .bind(patch.is_delivered)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let event = NewEvent::for_order(EventKind::OrderUpdated, id, Some(actor))
            .with_payload(serde_json::json!({
                "isPaid": patch.is_paid,
                "isDelivered": patch.is_delivered,
                "shippingAddressChanged": patch.shipping_address.is_some(),
                "paymentMethodChanged": patch.payment_method.is_some(),
            }));
        events::append(&mut tx, &event).await?;
        tx.commit().await?;

        self.attach_items(row).await
    }

    /// Delete an order, items first. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn delete(&self, id: OrderId, actor: UserId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM marketplace.order_item WHERE order_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query_scalar::<_, String>(
            "DELETE FROM marketplace.order WHERE id = $1 RETURNING order_number",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(order_number) = deleted else {
            tx.rollback().await?;
            return Ok(false);
        };

        let event = NewEvent::for_order(EventKind::OrderDeleted, id, Some(actor))
            .with_payload(serde_json::json!({ "orderNumber": order_number }));
        events::append(&mut tx, &event).await?;
        tx.commit().await?;

        Ok(true)
    }

    /// Store a payment code unless one exists; the stored code wins.
    ///
    /// Returns `Ok(None)` when the order does not exist or is already paid.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn issue_payment_code(
        &self,
        id: OrderId,
        candidate: &str,
        actor: Option<UserId>,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(
            r"
            UPDATE marketplace.order
            SET payment_code = COALESCE(payment_code, $2),
                payment_code_generated_at = COALESCE(payment_code_generated_at, now())
            WHERE id = $1 AND NOT (is_paid OR is_confirmed_by_admin)
            RETURNING id, order_number, user_id, guest_first_name, guest_last_name, guest_email,
                      shipping_address, payment_method, total_price,
                      is_paid, paid_at, is_delivered, delivered_at,
                      is_confirmed_by_admin, confirmed_at,
                      client_confirmed_payment, client_confirmed_at,
                      payment_code, payment_code_generated_at, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(candidate)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        let reissued = row.payment_code.as_deref() != Some(candidate);
        let event = NewEvent::for_order(EventKind::PaymentCodeGenerated, id, actor)
            .with_payload(serde_json::json!({ "reissued": reissued }));
        events::append(&mut tx, &event).await?;
        tx.commit().await?;

        self.attach_items(row).await.map(Some)
    }

    /// Record that the customer says they paid.
    ///
    /// Returns `Ok(None)` when the order does not exist, has no payment code,
    /// or is already paid.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn mark_client_confirmed(
        &self,
        id: OrderId,
        actor: Option<UserId>,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(
            r"
            UPDATE marketplace.order
            SET client_confirmed_payment = TRUE,
                client_confirmed_at = COALESCE(client_confirmed_at, now())
            WHERE id = $1
              AND payment_code IS NOT NULL
              AND NOT (is_paid OR is_confirmed_by_admin)
            RETURNING id, order_number, user_id, guest_first_name, guest_last_name, guest_email,
                      shipping_address, payment_method, total_price,
                      is_paid, paid_at, is_delivered, delivered_at,
                      is_confirmed_by_admin, confirmed_at,
                      client_confirmed_payment, client_confirmed_at,
                      payment_code, payment_code_generated_at, created_at, updated_at
            ",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        let event = NewEvent::for_order(EventKind::PaymentClientConfirmed, id, actor);
        events::append(&mut tx, &event).await?;
        tx.commit().await?;

        self.attach_items(row).await.map(Some)
    }

    /// Mark the order paid and admin-confirmed.
    ///
    /// An order that is already admin-confirmed is returned unchanged with
    /// `changed == false`, and no event is written.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn mark_admin_confirmed(
        &self,
        id: OrderId,
        actor: UserId,
    ) -> Result<AdminConfirmation, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let already = sqlx::query_scalar::<_, bool>(
            r"
            SELECT is_confirmed_by_admin FROM marketplace.order
            WHERE id = $1
            FOR UPDATE
            ",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if already {
            tx.rollback().await?;
            let order = self.get(id).await?.ok_or(RepositoryError::NotFound)?;
            return Ok(AdminConfirmation {
                order,
                changed: false,
            });
        }

        let row = sqlx::query_as::<_, OrderRow>(
            r"
            UPDATE marketplace.order
            SET is_paid = TRUE,
                paid_at = COALESCE(paid_at, now()),
                is_confirmed_by_admin = TRUE,
                confirmed_at = now()
            WHERE id = $1
            RETURNING id, order_number, user_id, guest_first_name, guest_last_name, guest_email,
                      shipping_address, payment_method, total_price,
                      is_paid, paid_at, is_delivered, delivered_at,
                      is_confirmed_by_admin, confirmed_at,
                      client_confirmed_payment, client_confirmed_at,
                      payment_code, payment_code_generated_at, created_at, updated_at
            ",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        let event = NewEvent::for_order(EventKind::PaymentAdminConfirmed, id, Some(actor))
            .with_payload(serde_json::json!({
                "clientConfirmed": row.client_confirmed_payment,
            }));
        events::append(&mut tx, &event).await?;
        tx.commit().await?;

        Ok(AdminConfirmation {
            order: self.attach_items(row).await?,
            changed: true,
        })
    }

    async fn attach_items(&self, row: OrderRow) -> Result<Order, RepositoryError> {
        let items = self.items_for(&[row.id]).await?.remove(&row.id);
        Ok(row.into_order(items.unwrap_or_default()))
    }

    async fn with_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let mut items = self.items_for(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let own = items.remove(&row.id).unwrap_or_default();
                row.into_order(own)
            })
            .collect())
    }

    async fn items_for(
        &self,
        order_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<OrderItem>>, RepositoryError> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT id, order_id, product_id, seller_id, product_name, quantity, price
            FROM marketplace.order_item
            WHERE order_id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(order_ids)
        .fetch_all(self.pool)
        .await?;

        let mut grouped: HashMap<i32, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            grouped
                .entry(row.order_id)
                .or_default()
                .push(OrderItem::from(row));
        }
        Ok(grouped)
    }
}

/// Insert the order row and its items on an open transaction.
async fn insert_order(
    conn: &mut PgConnection,
    new_order: &NewOrder,
) -> Result<Order, RepositoryError> {
    let guest = new_order.guest_info.as_ref();

    let row = sqlx::query_as::<_, OrderRow>(
        r"
        INSERT INTO marketplace.order
            (order_number, user_id, guest_first_name, guest_last_name, guest_email,
             shipping_address, payment_method, total_price)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, order_number, user_id, guest_first_name, guest_last_name, guest_email,
                  shipping_address, payment_method, total_price,
                  is_paid, paid_at, is_delivered, delivered_at,
                  is_confirmed_by_admin, confirmed_at,
                  client_confirmed_payment, client_confirmed_at,
                  payment_code, payment_code_generated_at, created_at, updated_at
        ",
    )
    .bind(&new_order.order_number)
    .bind(new_order.user_id)
    .bind(guest.map(|g| g.first_name.as_str()))
    .bind(guest.map(|g| g.last_name.as_str()))
    .bind(guest.map(|g| g.email.as_str()))
    .bind(&new_order.shipping_address)
    .bind(&new_order.payment_method)
    .bind(new_order.total_price)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| RepositoryError::from_unique(e, "order number"))?;

    let mut items = Vec::with_capacity(new_order.items.len());
    for item in &new_order.items {
        let item_row = sqlx::query_as::<_, OrderItemRow>(
            r"
            INSERT INTO marketplace.order_item
                (order_id, product_id, seller_id, product_name, quantity, price)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, order_id, product_id, seller_id, product_name, quantity, price
            ",
        )
        .bind(row.id)
        .bind(item.product_id)
        .bind(item.seller_id)
        .bind(&item.product_name)
        .bind(item.quantity)
        .bind(item.price)
        .fetch_one(&mut *conn)
        .await?;
        items.push(OrderItem::from(item_row));
    }

    Ok(row.into_order(items))
}
