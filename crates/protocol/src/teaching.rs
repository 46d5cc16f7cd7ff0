use serde::{Deserialize, Serialize};

// Client → Server methods on the teaching channel.
pub const METHOD_START: &str = "teaching.start";
pub const METHOD_PAUSE: &str = "teaching.pause";
pub const METHOD_RESUME: &str = "teaching.resume";
pub const METHOD_NEXT: &str = "teaching.next";
pub const METHOD_PREVIOUS: &str = "teaching.previous";
pub const METHOD_ACK_SCENE: &str = "teaching.ack_scene";

// Server → Client event names on the teaching channel.
pub const EVENT_SCENE: &str = "scene";
pub const EVENT_PROGRESS: &str = "progress";
pub const EVENT_DONE: &str = "done";
pub const EVENT_ERROR: &str = "error";

/// `teaching.start { conversation_id, visualization_id }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartParams {
    pub conversation_id: String,
    pub visualization_id: String,
}

/// `teaching.ack_scene { scene_index }` — the client confirms it finished
/// rendering the scene so the server can advance without waiting out the
/// timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckSceneParams {
    pub scene_index: u32,
}

/// Payload of a `scene` event: one resolved frame of the visualization (its
/// placed shapes, animations, and optional audio, as a generic JSON blob),
/// with the duration the client should hold it before the server advances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenePayload {
    pub scene_index: u32,
    pub scene_count: u32,
    pub duration_ms: u64,
    pub content: serde_json::Value,
    pub narration: Option<String>,
}

/// Payload of a `progress` event: coarse playback position, sent between
/// scenes so a client reconnecting mid-lesson can resync its progress bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressPayload {
    pub scene_index: u32,
    pub scene_count: u32,
    pub elapsed_ms: u64,
    pub total_ms: u64,
}

/// Payload of the terminal `done` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonePayload {
    pub visualization_id: String,
    pub scene_count: u32,
}
