//! Orders: checkout, direct creation and role-scoped access.

use chrono::{DateTime, Utc};
use rand::{Rng, distr::Alphanumeric};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use marketplace_core::{
    CartId, GuestInfo, OrderId, ProductId, Role, UserId, fits_amount, max_amount, order_total,
};

use super::ServiceError;
use super::cart::check_quantity;
use super::email::EmailService;
use super::notifier::Notifier;
use crate::db::RepositoryError;
use crate::db::carts::CartRepository;
use crate::db::catalog::ProductRepository;
use crate::db::events;
use crate::db::orders::{Checkout, OrderRepository, Placement};
use crate::db::users::UserRepository;
use crate::models::Identity;
use crate::models::event::DomainEvent;
use crate::models::notification::Recipient;
use crate::models::order::{NewOrder, NewOrderItem, Order, OrderPatch, StatusUpdate};

/// Attempts at a fresh order number before giving up on collisions.
const ORDER_NUMBER_ATTEMPTS: usize = 3;

/// Checkout request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    pub shipping_address: serde_json::Value,
    pub payment_method: String,
    /// Required for anonymous callers.
    pub guest_info: Option<GuestInfo>,
    /// The anonymous cart to check out; ignored for authenticated callers.
    pub cart_id: Option<CartId>,
}

/// Staff-initiated order that bypasses the cart.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectOrder {
    pub user_id: UserId,
    pub items: Vec<DirectOrderItem>,
    /// When given, must equal the total computed from current prices.
    pub total_price: Option<Decimal>,
    pub shipping_address: serde_json::Value,
    pub payment_method: String,
}

/// One line of a [`DirectOrder`].
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectOrderItem {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Order operations.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    orders: OrderRepository<'a>,
    notifier: Notifier<'a>,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, email: Option<&'a EmailService>) -> Self {
        Self {
            pool,
            orders: OrderRepository::new(pool),
            notifier: Notifier::new(pool, email),
        }
    }

    /// Turn the caller's cart into an order.
    ///
    /// The cart lines are removed in the same transaction that writes the
    /// order; the cart row is kept for the next session.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if the cart is missing or empty,
    /// its total is too large to store, or an anonymous caller sends no
    /// valid guest details.
    #[instrument(skip(self, identity, request), fields(user_id = ?identity.map(|i| i.user_id)))]
    pub async fn place_order(
        &self,
        identity: Option<&Identity>,
        request: PlaceOrder,
    ) -> Result<Order, ServiceError> {
        validate_payment_method(&request.payment_method)?;
        validate_shipping_address(&request.shipping_address)?;

        let carts = CartRepository::new(self.pool);
        let (cart, user_id, guest_info) = match identity {
            Some(identity) => (
                carts.get_for_user(identity.user_id).await?,
                Some(identity.user_id),
                None,
            ),
            None => {
                let guest = request
                    .guest_info
                    .as_ref()
                    .ok_or_else(|| ServiceError::validation("guestInfo is required"))?
                    .validate()?;
                let cart_id = request
                    .cart_id
                    .ok_or_else(|| ServiceError::validation("cartId is required"))?;
                let cart = carts
                    .get(cart_id)
                    .await?
                    .filter(|cart| cart.user_id.is_none());
                (cart, None, Some(guest))
            }
        };
        let cart = cart.ok_or_else(|| ServiceError::validation("cart is empty"))?;

        let mut attempt = 0;
        let order = loop {
            attempt += 1;
            let checkout = Checkout {
                order_number: generate_order_number(Utc::now()),
                user_id,
                guest_info: guest_info.clone(),
                shipping_address: request.shipping_address.clone(),
                payment_method: request.payment_method.trim().to_owned(),
            };
            match self.orders.place_from_cart(cart.id, checkout).await {
                Ok(Placement::Placed(order)) => break order,
                Ok(Placement::EmptyCart) => return Err(ServiceError::validation("cart is empty")),
                Ok(Placement::TotalTooLarge(total)) => return Err(total_too_large(total)),
                Err(RepositoryError::Conflict(_)) if attempt < ORDER_NUMBER_ATTEMPTS => {
                    tracing::warn!(attempt, "Order number collision, retrying");
                }
                Err(RepositoryError::NotFound) => {
                    return Err(ServiceError::validation("cart is empty"));
                }
                Err(e) => return Err(e.into()),
            }
        };

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total_price,
            "Order placed"
        );

        self.notifier
            .notify(
                Recipient::Role(Role::Admin),
                &format!(
                    "New order {} placed for {}",
                    order.order_number, order.total_price
                ),
                Some(order.id),
            )
            .await;

        match (identity, &order.guest_info) {
            (Some(identity), _) => {
                self.notifier
                    .order_placed(&identity.email, &identity.name, &order)
                    .await;
            }
            (None, Some(guest)) => {
                self.notifier
                    .order_placed(&guest.email, &guest.first_name, &order)
                    .await;
            }
            (None, None) => {}
        }

        Ok(order)
    }

    /// Create an order for `request.user_id` directly from line items.
    ///
    /// Prices are read from the catalog now. A seller may only include
    /// products they own.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for buyers, or a seller naming
    /// another seller's product.
    /// Returns `ServiceError::NotFound` if the user or a product is missing.
    /// Returns `ServiceError::Validation` for empty items, out-of-range
    /// quantities, a total too large to store or a mismatched `totalPrice`.
    #[instrument(skip(self, caller, request), fields(caller_id = %caller.user_id))]
    pub async fn create_order(
        &self,
        caller: &Identity,
        request: DirectOrder,
    ) -> Result<Order, ServiceError> {
        if !caller.role.is_staff() {
            return Err(ServiceError::forbidden("only staff can create orders directly"));
        }
        if request.items.is_empty() {
            return Err(ServiceError::validation("items must not be empty"));
        }
        for item in &request.items {
            check_quantity(item.quantity)?;
        }
        validate_payment_method(&request.payment_method)?;
        validate_shipping_address(&request.shipping_address)?;

        let target = UserRepository::new(self.pool)
            .get_by_id(request.user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("user"))?;

        let ids: Vec<ProductId> = request.items.iter().map(|item| item.product_id).collect();
        let products = ProductRepository::new(self.pool).get_many(&ids).await?;

        let mut items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let product = products
                .iter()
                .find(|p| p.id == line.product_id)
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("product {} not found", line.product_id))
                })?;
            if caller.is_seller() && product.created_by_id != caller.user_id {
                return Err(ServiceError::Forbidden(format!(
                    "product {} belongs to another seller",
                    product.id
                )));
            }
            items.push(NewOrderItem {
                product_id: product.id,
                seller_id: product.created_by_id,
                product_name: product.name.clone(),
                quantity: line.quantity,
                price: product.price,
            });
        }

        let total_price = order_total(items.iter().map(|i| (i.price, i.quantity)));
        if !fits_amount(total_price) {
            return Err(total_too_large(total_price));
        }
        if let Some(claimed) = request
            .total_price
            .filter(|claimed| claimed.round_dp(2) != total_price)
        {
            return Err(ServiceError::Validation(format!(
                "totalPrice {claimed} does not match items total {total_price}"
            )));
        }

        let new_order = NewOrder {
            order_number: generate_order_number(Utc::now()),
            user_id: Some(target.id),
            guest_info: None,
            shipping_address: request.shipping_address,
            payment_method: request.payment_method.trim().to_owned(),
            total_price,
            items,
        };
        let order = self.orders.create(&new_order, caller.user_id).await?;

        tracing::info!(order_id = %order.id, target = %target.id, "Order created directly");

        self.notifier
            .notify(
                Recipient::User(target.id),
                &format!("Order {} was created on your behalf", order.order_number),
                Some(order.id),
            )
            .await;

        Ok(order)
    }

    /// Every order visible to the caller: all of them for an admin; for a
    /// seller, orders containing their products with only their lines.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for buyers.
    #[instrument(skip(self, caller), fields(caller_id = %caller.user_id))]
    pub async fn get_all_orders(&self, caller: &Identity) -> Result<Vec<Order>, ServiceError> {
        match caller.role {
            Role::Admin => Ok(self.orders.list_all().await?),
            Role::Seller => Ok(self
                .orders
                .list_containing_seller(caller.user_id)
                .await?
                .into_iter()
                .filter_map(|order| order.scoped_to_seller(caller.user_id))
                .collect()),
            Role::Buyer => Err(ServiceError::forbidden("buyers cannot list all orders")),
        }
    }

    /// The caller's own orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    pub async fn my_orders(&self, caller: &Identity) -> Result<Vec<Order>, ServiceError> {
        Ok(self.orders.list_for_user(caller.user_id).await?)
    }

    /// One order, scoped to the caller's role.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the order does not exist.
    /// Returns `ServiceError::Forbidden` if the caller may not see it.
    pub async fn get_order(&self, caller: &Identity, id: OrderId) -> Result<Order, ServiceError> {
        let order = self.find(id).await?;
        scope_for(caller, order)
    }

    /// Full edit of an order (admin).
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for non-admins.
    /// Returns `ServiceError::NotFound` if the order does not exist.
    #[instrument(skip(self, caller, patch), fields(caller_id = %caller.user_id))]
    pub async fn update_order(
        &self,
        caller: &Identity,
        id: OrderId,
        patch: &OrderPatch,
    ) -> Result<Order, ServiceError> {
        if !caller.is_admin() {
            return Err(ServiceError::forbidden("only admins can edit orders"));
        }
        if let Some(method) = &patch.payment_method {
            validate_payment_method(method)?;
        }

        let before = self.find(id).await?;
        let order = self.orders.update(id, patch, caller.user_id).await?;
        self.notify_delivered(&before, &order).await;
        Ok(order)
    }

    /// Set `isPaid` / `isDelivered` from the order dashboard.
    ///
    /// Sellers may only change `isDelivered`; payment is an admin decision.
    /// Clearing `isPaid` restarts the payment workflow.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for buyers, for sellers with no
    /// line in the order and for sellers sending `isPaid`.
    /// Returns `ServiceError::NotFound` if the order does not exist.
    #[instrument(skip(self, caller), fields(caller_id = %caller.user_id))]
    pub async fn update_status(
        &self,
        caller: &Identity,
        id: OrderId,
        update: StatusUpdate,
    ) -> Result<Order, ServiceError> {
        let before = self.find(id).await?;
        authorize_staff(caller, &before)?;
        authorize_status_update(caller, &update)?;

        let order = self
            .orders
            .update(id, &OrderPatch::from(update), caller.user_id)
            .await?;
        self.notify_delivered(&before, &order).await;

        scope_for(caller, order)
    }

    /// Delete an order and its items (admin).
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for non-admins.
    /// Returns `ServiceError::NotFound` if the order does not exist.
    #[instrument(skip(self, caller), fields(caller_id = %caller.user_id))]
    pub async fn delete_order(&self, caller: &Identity, id: OrderId) -> Result<(), ServiceError> {
        if !caller.is_admin() {
            return Err(ServiceError::forbidden("only admins can delete orders"));
        }
        if !self.orders.delete(id, caller.user_id).await? {
            return Err(ServiceError::not_found("order"));
        }
        tracing::info!(order_id = %id, "Order deleted");
        Ok(())
    }

    /// Durable history of an order (admin).
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for non-admins.
    pub async fn events(
        &self,
        caller: &Identity,
        id: OrderId,
    ) -> Result<Vec<DomainEvent>, ServiceError> {
        if !caller.is_admin() {
            return Err(ServiceError::forbidden("only admins can read order history"));
        }
        Ok(events::list_for_order(self.pool, id).await?)
    }

    async fn find(&self, id: OrderId) -> Result<Order, ServiceError> {
        self.orders
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("order"))
    }

    async fn notify_delivered(&self, before: &Order, after: &Order) {
        if before.is_delivered || !after.is_delivered {
            return;
        }
        if let Some(user_id) = after.user_id {
            self.notifier
                .notify(
                    Recipient::User(user_id),
                    &format!("Your order {} has been delivered", after.order_number),
                    Some(after.id),
                )
                .await;
        }
    }
}

/// Staff access check for a single order: admins always, sellers only when
/// the order has one of their lines.
pub(crate) fn authorize_staff(caller: &Identity, order: &Order) -> Result<(), ServiceError> {
    match caller.role {
        Role::Admin => Ok(()),
        Role::Seller if order.has_items_from(caller.user_id) => Ok(()),
        Role::Seller => Err(ServiceError::forbidden("order contains none of your products")),
        Role::Buyer => Err(ServiceError::forbidden("staff only")),
    }
}

fn authorize_status_update(caller: &Identity, update: &StatusUpdate) -> Result<(), ServiceError> {
    if update.is_paid.is_some() && !caller.is_admin() {
        return Err(ServiceError::forbidden("only admins can change isPaid"));
    }
    Ok(())
}

fn scope_for(caller: &Identity, order: Order) -> Result<Order, ServiceError> {
    authorize_staff(caller, &order)?;
    match caller.role {
        Role::Seller => order
            .scoped_to_seller(caller.user_id)
            .ok_or_else(|| ServiceError::forbidden("order contains none of your products")),
        _ => Ok(order),
    }
}

fn total_too_large(total: Decimal) -> ServiceError {
    ServiceError::Validation(format!(
        "order total {total} exceeds the maximum of {}",
        max_amount()
    ))
}

fn validate_payment_method(method: &str) -> Result<(), ServiceError> {
    if method.trim().is_empty() {
        return Err(ServiceError::validation("paymentMethod is required"));
    }
    Ok(())
}

fn validate_shipping_address(address: &serde_json::Value) -> Result<(), ServiceError> {
    let blank = match address {
        serde_json::Value::Null => true,
        serde_json::Value::String(s) => s.trim().is_empty(),
        serde_json::Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if blank {
        return Err(ServiceError::validation("shippingAddress is required"));
    }
    Ok(())
}

/// Human-readable order number: `ORD-<UTC yyyymmddHHMMSS>-<6 alphanumerics>`.
#[must_use]
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("ORD-{}-{suffix}", now.format("%Y%m%d%H%M%S"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::models::order::tests::{item, order};

    fn caller(id: i32, role: Role) -> Identity {
        Identity {
            user_id: UserId::new(id),
            name: "Caller".to_string(),
            email: "caller@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn test_order_number_format() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 5, 7).unwrap();
        let number = generate_order_number(now);

        assert!(number.starts_with("ORD-20260301090507-"));
        let suffix = number.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 6);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }

    #[test]
    fn test_order_numbers_differ() {
        let now = Utc::now();
        assert_ne!(generate_order_number(now), generate_order_number(now));
    }

    #[test]
    fn test_seller_sees_only_own_lines() {
        let shared = order(vec![item(1, 10, 500, 1), item(2, 20, 700, 2)]);
        let scoped = scope_for(&caller(10, Role::Seller), shared).unwrap();

        assert_eq!(scoped.items.len(), 1);
        assert!(
            scoped
                .items
                .iter()
                .all(|i| i.seller_id == Some(UserId::new(10)))
        );
    }

    #[test]
    fn test_seller_without_lines_is_forbidden() {
        let other = order(vec![item(1, 20, 500, 1)]);
        assert!(matches!(
            scope_for(&caller(10, Role::Seller), other),
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[test]
    fn test_admin_sees_everything_and_buyer_nothing() {
        let shared = order(vec![item(1, 10, 500, 1), item(2, 20, 700, 2)]);
        assert_eq!(
            scope_for(&caller(1, Role::Admin), shared.clone())
                .unwrap()
                .items
                .len(),
            2
        );
        assert!(matches!(
            scope_for(&caller(3, Role::Buyer), shared),
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[test]
    fn test_only_admin_changes_is_paid() {
        let unpay = StatusUpdate {
            is_paid: Some(false),
            is_delivered: None,
        };
        let deliver = StatusUpdate {
            is_paid: None,
            is_delivered: Some(true),
        };

        assert!(matches!(
            authorize_status_update(&caller(10, Role::Seller), &unpay),
            Err(ServiceError::Forbidden(_))
        ));
        assert!(authorize_status_update(&caller(10, Role::Seller), &deliver).is_ok());
        assert!(authorize_status_update(&caller(1, Role::Admin), &unpay).is_ok());
    }

    #[test]
    fn test_oversized_total_is_a_validation_error() {
        let err = total_too_large(Decimal::new(9_999_900_000_000_000, 2));
        assert!(matches!(&err, ServiceError::Validation(msg) if msg.contains("9999999999.99")));
    }

    #[test]
    fn test_shipping_address_must_not_be_blank() {
        assert!(validate_shipping_address(&serde_json::Value::Null).is_err());
        assert!(validate_shipping_address(&serde_json::json!("  ")).is_err());
        assert!(validate_shipping_address(&serde_json::json!({})).is_err());
        assert!(validate_shipping_address(&serde_json::json!("1 Main St")).is_ok());
        assert!(validate_shipping_address(&serde_json::json!({"city": "Accra"})).is_ok());
    }

    #[test]
    fn test_payment_method_required() {
        assert!(validate_payment_method(" ").is_err());
        assert!(validate_payment_method("mobile_money").is_ok());
    }

    #[test]
    fn test_place_order_request_shape() {
        let request: PlaceOrder = serde_json::from_value(serde_json::json!({
            "shippingAddress": {"line1": "1 Main St"},
            "paymentMethod": "mobile_money",
            "guestInfo": {"firstName": "Ada", "lastName": "Lovelace", "email": "ada@example.com"},
            "cartId": 101
        }))
        .unwrap();
        assert_eq!(request.cart_id, Some(CartId::new(101)));
        assert!(request.guest_info.is_some());
    }
}
