//! Cart resolution and mutation.
//!
//! An authenticated caller owns exactly one cart, found or created by user
//! ID. An anonymous caller addresses a cart by the ID it was handed on its
//! first add and keeps client-side. Anonymous callers can only reach carts
//! that have no owner; the two kinds are never merged.

use sqlx::PgPool;
use tracing::instrument;

use marketplace_core::{CartId, MAX_LINE_QUANTITY, ProductId, valid_line_quantity};

use super::ServiceError;
use crate::db::carts::CartRepository;
use crate::db::catalog::ProductRepository;
use crate::models::Identity;
use crate::models::cart::{Cart, CartView};

/// Cart operations.
pub struct CartService<'a> {
    carts: CartRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            carts: CartRepository::new(pool),
            products: ProductRepository::new(pool),
        }
    }

    /// Find the caller's existing cart without creating one.
    ///
    /// `cart_id` is only consulted for anonymous callers.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    pub async fn resolve(
        &self,
        identity: Option<&Identity>,
        cart_id: Option<CartId>,
    ) -> Result<Option<Cart>, ServiceError> {
        match (identity, cart_id) {
            (Some(identity), _) => Ok(self.carts.get_for_user(identity.user_id).await?),
            (None, Some(cart_id)) => Ok(self
                .carts
                .get(cart_id)
                .await?
                .filter(|cart| cart.user_id.is_none())),
            (None, None) => Ok(None),
        }
    }

    /// The caller's cart with product details, or an empty shape when no
    /// cart exists yet.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    #[instrument(skip(self, identity))]
    pub async fn get_cart(
        &self,
        identity: Option<&Identity>,
        cart_id: Option<CartId>,
    ) -> Result<CartView, ServiceError> {
        match self.resolve(identity, cart_id).await? {
            Some(cart) => self.view(cart).await,
            None => Ok(CartView::empty(None)),
        }
    }

    /// Add `quantity` of a product, creating the cart on first use.
    ///
    /// The returned view carries the cart ID so an anonymous caller can
    /// persist it.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if `quantity` is not positive, or
    /// the line would exceed [`MAX_LINE_QUANTITY`].
    /// Returns `ServiceError::NotFound` if the product does not exist or is
    /// hidden, or an anonymous caller names a cart it cannot reach.
    #[instrument(skip(self, identity))]
    pub async fn add_item(
        &self,
        identity: Option<&Identity>,
        cart_id: Option<CartId>,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartView, ServiceError> {
        check_quantity(quantity)?;

        self.products
            .get(product_id)
            .await?
            .filter(|product| product.is_visible)
            .ok_or_else(|| ServiceError::not_found("product"))?;

        let cart = match (identity, cart_id) {
            (Some(identity), _) => self.carts.get_or_create_for_user(identity.user_id).await?,
            (None, Some(_)) => self
                .resolve(None, cart_id)
                .await?
                .ok_or_else(|| ServiceError::not_found("cart"))?,
            (None, None) => {
                let cart = self.carts.create_anonymous().await?;
                tracing::debug!(cart_id = %cart.id, "Created anonymous cart");
                cart
            }
        };

        if !self
            .carts
            .add_item(cart.id, product_id, quantity, MAX_LINE_QUANTITY)
            .await?
        {
            return Err(ServiceError::Validation(format!(
                "a cart line holds at most {MAX_LINE_QUANTITY} units"
            )));
        }
        self.view(cart).await
    }

    /// Remove every line for a product. Removing something that is not in
    /// the cart is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if an anonymous caller omits the
    /// cart ID.
    #[instrument(skip(self, identity))]
    pub async fn remove_item(
        &self,
        identity: Option<&Identity>,
        cart_id: Option<CartId>,
        product_id: ProductId,
    ) -> Result<CartView, ServiceError> {
        if identity.is_none() && cart_id.is_none() {
            return Err(ServiceError::validation("cartId is required"));
        }

        let Some(cart) = self.resolve(identity, cart_id).await? else {
            return Ok(CartView::empty(None));
        };

        let removed = self.carts.remove_item(cart.id, product_id).await?;
        tracing::debug!(cart_id = %cart.id, removed, "Removed cart lines");

        self.view(cart).await
    }

    async fn view(&self, cart: Cart) -> Result<CartView, ServiceError> {
        let lines = self.carts.lines(cart.id).await?;
        Ok(CartView::new(cart.id, lines))
    }
}

/// Reject non-positive quantities and ones above [`MAX_LINE_QUANTITY`].
pub(crate) fn check_quantity(quantity: i32) -> Result<(), ServiceError> {
    if quantity <= 0 {
        return Err(ServiceError::validation("quantity must be greater than zero"));
    }
    if !valid_line_quantity(quantity) {
        return Err(ServiceError::Validation(format!(
            "quantity must be at most {MAX_LINE_QUANTITY}"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_check_quantity() {
        assert!(check_quantity(1).is_ok());
        assert!(check_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(matches!(check_quantity(0), Err(ServiceError::Validation(_))));
        assert!(matches!(
            check_quantity(i32::MAX),
            Err(ServiceError::Validation(_))
        ));
    }
}
