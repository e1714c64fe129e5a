//! Products, categories and reviews.

use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use marketplace_core::{CategoryId, ProductId, SellerStatus};

use super::ServiceError;
use crate::db::catalog::{CategoryRepository, ProductRepository, ReviewRepository};
use crate::db::users::UserRepository;
use crate::models::Identity;
use crate::models::catalog::{Category, Product, ProductDraft, ProductPatch, Review};

/// New category.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

/// New review.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub rating: i16,
    #[serde(default)]
    pub comment: String,
}

/// Catalog operations.
pub struct CatalogService<'a> {
    pool: &'a PgPool,
    products: ProductRepository<'a>,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            products: ProductRepository::new(pool),
        }
    }

    /// Visible products, optionally by category and name search.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list_products(
        &self,
        category_id: Option<CategoryId>,
        search: Option<&str>,
    ) -> Result<Vec<Product>, ServiceError> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        Ok(self.products.list_visible(category_id, search).await?)
    }

    /// One product. Hidden products are only shown to their owner and
    /// admins.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist or is
    /// hidden from the caller.
    pub async fn get_product(
        &self,
        identity: Option<&Identity>,
        id: ProductId,
    ) -> Result<Product, ServiceError> {
        self.products
            .get(id)
            .await?
            .filter(|product| {
                product.is_visible
                    || identity.is_some_and(|i| i.may_access(Some(product.created_by_id)))
            })
            .ok_or_else(|| ServiceError::not_found("product"))
    }

    /// Create a product owned by the caller.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for buyers and sellers that are not
    /// `ACTIVE`.
    /// Returns `ServiceError::Validation` for a blank name or negative
    /// price/stock.
    #[instrument(skip(self, caller, draft), fields(caller_id = %caller.user_id))]
    pub async fn create_product(
        &self,
        caller: &Identity,
        draft: ProductDraft,
    ) -> Result<Product, ServiceError> {
        if !caller.role.is_staff() {
            return Err(ServiceError::forbidden("only sellers and admins can add products"));
        }

        let owner = UserRepository::new(self.pool)
            .get_by_id(caller.user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("user"))?;
        if caller.is_seller() && owner.seller_status != Some(SellerStatus::Active) {
            return Err(ServiceError::forbidden("seller account is not active"));
        }

        let draft = ProductDraft {
            name: draft.name.trim().to_owned(),
            ..draft
        };
        validate_product(Some(&draft.name), Some(draft.price), Some(draft.stock))?;

        let product = self
            .products
            .create(owner.id, &draft, owner.is_active)
            .await?;
        tracing::info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// Edit a product. Owner or admin only.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist.
    /// Returns `ServiceError::Forbidden` if the caller does not own it.
    #[instrument(skip(self, caller, patch), fields(caller_id = %caller.user_id))]
    pub async fn update_product(
        &self,
        caller: &Identity,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, ServiceError> {
        self.owned(caller, id).await?;
        validate_product(patch.name.as_deref(), patch.price, patch.stock)?;
        Ok(self.products.update(id, patch).await?)
    }

    /// Delete a product. Owner or admin only.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist.
    /// Returns `ServiceError::Forbidden` if the caller does not own it.
    #[instrument(skip(self, caller), fields(caller_id = %caller.user_id))]
    pub async fn delete_product(&self, caller: &Identity, id: ProductId) -> Result<(), ServiceError> {
        self.owned(caller, id).await?;
        if !self.products.delete(id).await? {
            return Err(ServiceError::not_found("product"));
        }
        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// All categories.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, ServiceError> {
        Ok(CategoryRepository::new(self.pool).list().await?)
    }

    /// Create a category (admin).
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for non-admins.
    /// Returns `ServiceError::Conflict` if the name is taken.
    pub async fn create_category(
        &self,
        caller: &Identity,
        category: NewCategory,
    ) -> Result<Category, ServiceError> {
        if !caller.is_admin() {
            return Err(ServiceError::forbidden("only admins can add categories"));
        }
        let name = category.name.trim();
        if name.is_empty() {
            return Err(ServiceError::validation("name is required"));
        }
        Ok(CategoryRepository::new(self.pool)
            .create(name, category.description.as_deref())
            .await?)
    }

    /// Reviews for a visible product.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist.
    pub async fn list_reviews(&self, product_id: ProductId) -> Result<Vec<Review>, ServiceError> {
        self.get_product(None, product_id).await?;
        Ok(ReviewRepository::new(self.pool).list(product_id).await?)
    }

    /// Review a product, once per user.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if the rating is outside 1..=5.
    /// Returns `ServiceError::NotFound` if the product does not exist.
    /// Returns `ServiceError::Conflict` if the caller already reviewed it.
    pub async fn add_review(
        &self,
        caller: &Identity,
        product_id: ProductId,
        review: NewReview,
    ) -> Result<Review, ServiceError> {
        if !(1..=5).contains(&review.rating) {
            return Err(ServiceError::validation("rating must be between 1 and 5"));
        }
        self.get_product(Some(caller), product_id).await?;
        Ok(ReviewRepository::new(self.pool)
            .create(product_id, caller.user_id, review.rating, review.comment.trim())
            .await?)
    }

    async fn owned(&self, caller: &Identity, id: ProductId) -> Result<Product, ServiceError> {
        let product = self
            .products
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("product"))?;
        if caller.is_admin() || (caller.is_seller() && product.created_by_id == caller.user_id) {
            Ok(product)
        } else {
            Err(ServiceError::forbidden("you do not own this product"))
        }
    }
}

fn validate_product(
    name: Option<&str>,
    price: Option<rust_decimal::Decimal>,
    stock: Option<i32>,
) -> Result<(), ServiceError> {
    if name.is_some_and(|n| n.trim().is_empty()) {
        return Err(ServiceError::validation("name is required"));
    }
    if price.is_some_and(|p| p.is_sign_negative()) {
        return Err(ServiceError::validation("price must not be negative"));
    }
    if price.is_some_and(|p| !marketplace_core::fits_amount(p)) {
        return Err(ServiceError::Validation(format!(
            "price must be at most {}",
            marketplace_core::max_amount()
        )));
    }
    if stock.is_some_and(|s| s < 0) {
        return Err(ServiceError::validation("stock must not be negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_validate_product() {
        assert!(validate_product(Some("Mug"), Some(Decimal::new(500, 2)), Some(3)).is_ok());
        assert!(validate_product(None, None, None).is_ok());
        assert!(validate_product(Some(" "), None, None).is_err());
        assert!(validate_product(None, Some(Decimal::new(-1, 2)), None).is_err());
        assert!(validate_product(None, None, Some(-1)).is_err());
        assert!(validate_product(None, Some(Decimal::new(1_000_000_000_000, 2)), None).is_err());
    }
}
