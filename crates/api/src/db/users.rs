//! User repository: accounts, credentials and seller status.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use marketplace_core::{Email, Role, SellerStatus, UserId};

use super::RepositoryError;
use super::events;
use crate::models::event::NewEvent;
use crate::models::user::{NewUser, User};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i32,
    name: String,
    email: String,
    role: Role,
    business_name: Option<String>,
    gender: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    seller_status: Option<SellerStatus>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&r.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(r.id),
            name: r.name,
            email,
            role: r.role,
            business_name: r.business_name,
            gender: r.gender,
            phone: r.phone,
            address: r.address,
            seller_status: r.seller_status,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, name, email, role, business_name, gender, phone, address,
                   seller_status, is_active, created_at, updated_at
            FROM marketplace.user
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, name, email, role, business_name, gender, phone, address,
                   seller_status, is_active, created_at, updated_at
            FROM marketplace.user
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user together with their password hash, for login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r"
            SELECT id, name, email, role, business_name, gender, phone, address,
                   seller_status, is_active, created_at, updated_at, password_hash
            FROM marketplace.user
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| Ok((User::try_from(r.user)?, r.password_hash)))
            .transpose()
    }

    /// Create a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new: &NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO marketplace.user
                (name, email, password_hash, role, business_name, gender, phone,
                 seller_status, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, name, email, role, business_name, gender, phone, address,
                      seller_status, is_active, created_at, updated_at
            ",
        )
        .bind(&new.name)
        .bind(new.email.as_str())
        .bind(&new.password_hash)
        .bind(new.role)
        .bind(&new.business_name)
        .bind(&new.gender)
        .bind(&new.phone)
        .bind(new.seller_status)
        .bind(new.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "email"))?;

        User::try_from(row)
    }

    /// List sellers, optionally filtered by status. Newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_sellers(
        &self,
        status: Option<SellerStatus>,
    ) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, name, email, role, business_name, gender, phone, address,
                   seller_status, is_active, created_at, updated_at
            FROM marketplace.user
            WHERE role = 'SELLER'
              AND ($1::marketplace.seller_status IS NULL OR seller_status = $1)
            ORDER BY created_at DESC
            ",
        )
        .bind(status)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    /// Change a seller's status and propagate `is_active` to the visibility
    /// of every product they own, in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no seller has this ID.
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn update_seller_status(
        &self,
        seller_id: UserId,
        status: SellerStatus,
        is_active: bool,
        event: &NewEvent,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(
            r"
            UPDATE marketplace.user
            SET seller_status = $2, is_active = $3
            WHERE id = $1 AND role = 'SELLER'
            RETURNING id, name, email, role, business_name, gender, phone, address,
                      seller_status, is_active, created_at, updated_at
            ",
        )
        .bind(seller_id)
        .bind(status)
        .bind(is_active)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let hidden = sqlx::query(
            r"
            UPDATE marketplace.product
            SET is_visible = $2
            WHERE created_by_id = $1
            ",
        )
        .bind(seller_id)
        .bind(is_active)
        .execute(&mut *tx)
        .await?;

        events::append(&mut tx, event).await?;
        tx.commit().await?;

        tracing::debug!(
            seller_id = %seller_id,
            products = hidden.rows_affected(),
            "Propagated seller visibility to products"
        );

        User::try_from(row)
    }
}
