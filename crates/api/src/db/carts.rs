//! Cart repository.

use rust_decimal::Decimal;
use sqlx::PgPool;

use marketplace_core::{CartId, ProductId, UserId};

use super::RepositoryError;
use crate::models::cart::{Cart, CartLine};

#[derive(sqlx::FromRow)]
struct CartRow {
    id: i32,
    user_id: Option<i32>,
}

impl From<CartRow> for Cart {
    fn from(r: CartRow) -> Self {
        Self {
            id: CartId::new(r.id),
            user_id: r.user_id.map(UserId::new),
        }
    }
}

#[derive(sqlx::FromRow)]
struct CartLineRow {
    product_id: i32,
    name: String,
    price: Decimal,
    cover_image: Option<String>,
    seller_id: i32,
    quantity: i32,
}

impl From<CartLineRow> for CartLine {
    fn from(r: CartLineRow) -> Self {
        Self::new(
            ProductId::new(r.product_id),
            r.name,
            r.price,
            r.cover_image,
            UserId::new(r.seller_id),
            r.quantity,
        )
    }
}

/// Repository for carts and cart lines.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a cart by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CartId) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, user_id
            FROM marketplace.cart
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Cart::from))
    }

    /// Get the cart bound to a user, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, user_id
            FROM marketplace.cart
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Cart::from))
    }

    /// Find or create the single cart bound to a user.
    ///
    /// The unique index on `user_id` makes this safe under concurrent calls.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn get_or_create_for_user(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            INSERT INTO marketplace.cart (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id, user_id
            ",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(Cart::from(row))
    }

    /// Create a cart with no owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_anonymous(&self) -> Result<Cart, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            INSERT INTO marketplace.cart (user_id)
            VALUES (NULL)
            RETURNING id, user_id
            ",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(Cart::from(row))
    }

    /// Lines of a cart with product details joined in, oldest first.
    ///
    /// Lines for hidden products stay stored but are left out until the
    /// product is visible again.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT ci.product_id, p.name, p.price, p.cover_image,
                   p.created_by_id AS seller_id, ci.quantity
            FROM marketplace.cart_item ci
            JOIN marketplace.product p ON p.id = ci.product_id
            WHERE ci.cart_id = $1 AND p.is_visible
            ORDER BY ci.id
            ",
        )
        .bind(cart_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(CartLine::from).collect())
    }

    /// Add `quantity` of a product, incrementing an existing line.
    ///
    /// One atomic upsert, so concurrent adds never create duplicate lines.
    /// Returns `false` and writes nothing when the line would grow past
    /// `max_quantity`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn add_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i32,
        max_quantity: i32,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO marketplace.cart_item (cart_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = marketplace.cart_item.quantity + EXCLUDED.quantity
            WHERE marketplace.cart_item.quantity <= $4 - EXCLUDED.quantity
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .bind(max_quantity)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Remove every line for a product. Returns the number of rows deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn remove_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM marketplace.cart_item
            WHERE cart_id = $1 AND product_id = $2
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
