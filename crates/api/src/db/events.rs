//! Durable domain event log.
//!
//! Appends run on the caller's connection so an event commits or rolls back
//! together with the change it describes.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use marketplace_core::{DomainEventId, OrderId, UserId};

use super::RepositoryError;
use crate::models::event::{DomainEvent, NewEvent};

#[derive(sqlx::FromRow)]
struct EventRow {
    id: i32,
    event_type: String,
    order_id: Option<i32>,
    actor_id: Option<i32>,
    payload: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl From<EventRow> for DomainEvent {
    fn from(r: EventRow) -> Self {
        Self {
            id: DomainEventId::new(r.id),
            event_type: r.event_type,
            order_id: r.order_id.map(OrderId::new),
            actor_id: r.actor_id.map(UserId::new),
            payload: r.payload,
            created_at: r.created_at,
        }
    }
}

/// Append an event on an open connection or transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn append(conn: &mut PgConnection, event: &NewEvent) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO marketplace.domain_event (event_type, order_id, actor_id, payload)
        VALUES ($1, $2, $3, $4)
        ",
    )
    .bind(event.kind.as_str())
    .bind(event.order_id)
    .bind(event.actor_id)
    .bind(&event.payload)
    .execute(conn)
    .await?;

    Ok(())
}

/// Events recorded for one order, oldest first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_for_order(
    pool: &PgPool,
    order_id: OrderId,
) -> Result<Vec<DomainEvent>, RepositoryError> {
    let rows = sqlx::query_as::<_, EventRow>(
        r"
        SELECT id, event_type, order_id, actor_id, payload, created_at
        FROM marketplace.domain_event
        WHERE order_id = $1
        ORDER BY id
        ",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(DomainEvent::from).collect())
}
