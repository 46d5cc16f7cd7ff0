use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection};
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db::init_db;
use crate::error::Result;
use crate::types::Event;

/// A handle to the shared outbox connection. Cheap to clone; every consumer
/// and publisher in a process holds one.
#[derive(Clone)]
pub struct EventBus {
    conn: Arc<Mutex<Connection>>,
}

impl EventBus {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Append an event to the outbox. Returns the event's own id (not the cursor).
    pub async fn publish(&self, topic: &str, payload: impl serde::Serialize) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let payload_json = serde_json::to_string(&payload)?;
        let now = Utc::now().to_rfc3339();

        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO events (id, topic, payload, published_at) VALUES (?1, ?2, ?3, ?4)",
            params![id, topic, payload_json, now],
        )?;
        info!(event_id = %id, %topic, "event published");
        Ok(id)
    }

    /// Fetch up to `batch_size` events for `topic` past the consumer group's
    /// last acked cursor, oldest first.
    pub async fn poll_new(
        &self,
        consumer_group: &str,
        topic: &str,
        batch_size: i64,
    ) -> Result<Vec<Event>> {
        let conn = self.conn.lock().await;
        let since: i64 = conn
            .query_row(
                "SELECT last_cursor FROM bus_cursors WHERE consumer_group = ?1 AND topic = ?2",
                params![consumer_group, topic],
                |row| row.get(0),
            )
            .unwrap_or(0);

        let mut stmt = conn.prepare_cached(
            "SELECT cursor, id, topic, payload, published_at FROM events
             WHERE topic = ?1 AND cursor > ?2 ORDER BY cursor LIMIT ?3",
        )?;
        let events = stmt
            .query_map(params![topic, since, batch_size], |row| {
                let payload_raw: String = row.get(3)?;
                Ok(Event {
                    cursor: row.get(0)?,
                    id: row.get(1)?,
                    topic: row.get(2)?,
                    payload: serde_json::from_str(&payload_raw).unwrap_or(serde_json::Value::Null),
                    published_at: row.get(4)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(events)
    }

    /// Advance a consumer group's cursor for `topic` to `cursor`, provided it
    /// does not move backwards (acks can race across worker restarts).
    pub async fn ack(&self, consumer_group: &str, topic: &str, cursor: i64) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO bus_cursors (consumer_group, topic, last_cursor, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (consumer_group, topic) DO UPDATE SET
                last_cursor = MAX(last_cursor, excluded.last_cursor),
                updated_at  = excluded.updated_at",
            params![consumer_group, topic, cursor, now],
        )?;
        Ok(())
    }
}

/// Spawn a background task that polls `topic` on a fixed interval and hands
/// each event to `handler`, acking incrementally as handlers succeed.
///
/// On handler failure the cursor is left at the last successfully processed
/// event, so the failed event (and anything after it) is retried on the next
/// tick. `handler` must therefore be idempotent, per the at-least-once
/// delivery contract.
pub fn spawn_polling_consumer<F, Fut>(
    bus: EventBus,
    consumer_group: &'static str,
    topic: &'static str,
    poll_interval: Duration,
    handler: F,
) -> tokio::task::JoinHandle<()>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(poll_interval);
        loop {
            interval.tick().await;
            let events = match bus.poll_new(consumer_group, topic, 50).await {
                Ok(events) => events,
                Err(e) => {
                    error!(%consumer_group, %topic, "poll failed: {e}");
                    continue;
                }
            };

            for event in events {
                let cursor = event.cursor;
                match handler(event).await {
                    Ok(()) => {
                        if let Err(e) = bus.ack(consumer_group, topic, cursor).await {
                            warn!(%consumer_group, %topic, "ack failed: {e}");
                        }
                    }
                    Err(e) => {
                        warn!(%consumer_group, %topic, cursor, "handler failed, will retry: {e}");
                        break;
                    }
                }
            }
        }
    })
}
