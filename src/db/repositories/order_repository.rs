use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::AppResult;
use crate::models::order::OrderRecord;

impl TryFrom<&Row<'_>> for OrderRecord {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            scheduled_start: row.get("scheduled_start")?,
            scheduled_end: row.get("scheduled_end")?,
            status: row.get("status")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct OrderRepository;

impl OrderRepository {
    /// Records the schedule chosen for an order, creating the mirror row
    /// when the order has not been seen yet.
    pub fn upsert_schedule(
        conn: &Connection,
        order_id: &str,
        scheduled_start: &str,
        scheduled_end: &str,
        status: &str,
        updated_at: &str,
    ) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO orders (id, scheduled_start, scheduled_end, status, updated_at)
                VALUES (:id, :scheduled_start, :scheduled_end, :status, :updated_at)
                ON CONFLICT(id) DO UPDATE SET
                    scheduled_start = excluded.scheduled_start,
                    scheduled_end = excluded.scheduled_end,
                    status = excluded.status,
                    updated_at = excluded.updated_at
            "#,
            named_params! {
                ":id": order_id,
                ":scheduled_start": scheduled_start,
                ":scheduled_end": scheduled_end,
                ":status": status,
                ":updated_at": updated_at,
            },
        )?;

        Ok(())
    }

    pub fn update_status(
        conn: &Connection,
        order_id: &str,
        status: &str,
        updated_at: &str,
    ) -> AppResult<()> {
        conn.execute(
            "UPDATE orders SET status = :status, updated_at = :updated_at WHERE id = :id",
            named_params! {
                ":id": order_id,
                ":status": status,
                ":updated_at": updated_at,
            },
        )?;
        Ok(())
    }

    pub fn get(conn: &Connection, order_id: &str) -> AppResult<Option<OrderRecord>> {
        let mut stmt = conn.prepare(
            "SELECT id, scheduled_start, scheduled_end, status, updated_at FROM orders WHERE id = :id",
        )?;

        let row = stmt
            .query_row(named_params! {":id": order_id}, |row| {
                OrderRecord::try_from(row)
            })
            .optional()?;

        Ok(row)
    }
}
