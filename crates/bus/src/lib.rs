pub mod db;
pub mod engine;
pub mod error;
pub mod types;

pub use engine::{spawn_polling_consumer, EventBus};
pub use error::{BusError, Result};
pub use types::{
    DocumentIngested, Event, LessonReady, QuizReady, VisualizationReady, TOPIC_DOCUMENT_INGESTED,
    TOPIC_LESSON_READY, TOPIC_QUIZ_READY, TOPIC_VISUALIZATION_READY,
};

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[tokio::test]
    async fn publish_then_poll_returns_in_order() {
        let bus = EventBus::new(Connection::open_in_memory().unwrap()).unwrap();
        bus.publish(TOPIC_DOCUMENT_INGESTED, serde_json::json!({"n": 1}))
            .await
            .unwrap();
        bus.publish(TOPIC_DOCUMENT_INGESTED, serde_json::json!({"n": 2}))
            .await
            .unwrap();

        let events = bus.poll_new("lesson", TOPIC_DOCUMENT_INGESTED, 10).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].payload["n"], 1);
        assert_eq!(events[1].payload["n"], 2);
    }

    #[tokio::test]
    async fn ack_hides_already_consumed_events() {
        let bus = EventBus::new(Connection::open_in_memory().unwrap()).unwrap();
        bus.publish(TOPIC_LESSON_READY, serde_json::json!({"n": 1})).await.unwrap();
        let first = bus.poll_new("quiz", TOPIC_LESSON_READY, 10).await.unwrap();
        bus.ack("quiz", TOPIC_LESSON_READY, first[0].cursor).await.unwrap();

        bus.publish(TOPIC_LESSON_READY, serde_json::json!({"n": 2})).await.unwrap();
        let second = bus.poll_new("quiz", TOPIC_LESSON_READY, 10).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].payload["n"], 2);
    }

    #[tokio::test]
    async fn separate_consumer_groups_track_independent_cursors() {
        let bus = EventBus::new(Connection::open_in_memory().unwrap()).unwrap();
        bus.publish(TOPIC_LESSON_READY, serde_json::json!({"n": 1})).await.unwrap();

        let for_quiz = bus.poll_new("quiz", TOPIC_LESSON_READY, 10).await.unwrap();
        bus.ack("quiz", TOPIC_LESSON_READY, for_quiz[0].cursor).await.unwrap();

        let for_visualization = bus.poll_new("visualization", TOPIC_LESSON_READY, 10).await.unwrap();
        assert_eq!(for_visualization.len(), 1, "a fresh consumer group starts at cursor 0");
    }
}
