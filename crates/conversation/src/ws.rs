use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use lumen_core::jwt;
use lumen_core::types::{Principal, Role};
use lumen_protocol::frames::{EventFrame, InboundFrame, ResFrame};
use lumen_protocol::teaching::{
    self, AckSceneParams, DonePayload, ProgressPayload, ScenePayload, StartParams,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::app::AppState;

const TICK_INTERVAL_MS: u64 = 250;
const PROGRESS_INTERVAL_MS: u64 = 2_000;

/// `/ws/teaching` handler. The connection itself is authenticated the same
/// way as any other request (the gateway forwards `Authorization`
/// unmodified); once upgraded, the channel speaks the request/event
/// protocol of [`lumen_protocol::teaching`].
pub async fn ws_handler(State(state): State<Arc<AppState>>, principal: Principal, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state, principal))
}

/// The visualization service's resolved scene shape, as fetched over HTTP.
/// `position` is not a field on the wire — it is this scene's index in the
/// enclosing `scenes` array, stamped on after deserializing.
#[derive(Debug, Deserialize)]
struct SceneDto {
    #[serde(default)]
    position: u32,
    title: String,
    duration: f64,
    shapes: serde_json::Value,
    animations: serde_json::Value,
    #[serde(default)]
    audio: serde_json::Value,
    #[serde(default)]
    background_color: Option<String>,
}

impl SceneDto {
    fn duration_ms(&self) -> u64 {
        (self.duration * 1_000.0).round() as u64
    }

    fn content(&self) -> serde_json::Value {
        serde_json::json!({
            "shapes": self.shapes,
            "animations": self.animations,
            "audio": self.audio,
            "background_color": self.background_color,
        })
    }
}

#[derive(Debug, Deserialize)]
struct VisualizationDto {
    id: String,
    #[serde(default)]
    scenes: Vec<SceneDto>,
}

enum TeachingState {
    AwaitingStart,
    Streaming(Stream),
    Done,
}

struct Stream {
    visualization_id: String,
    scenes: Vec<SceneDto>,
    index: usize,
    paused: bool,
    scene_started: Instant,
    last_progress_sent: Instant,
    seq: u64,
}

impl Stream {
    fn current(&self) -> &SceneDto {
        &self.scenes[self.index]
    }

    fn total_duration_ms(&self) -> u64 {
        self.scenes.iter().map(SceneDto::duration_ms).sum()
    }

    fn elapsed_ms(&self) -> u64 {
        self.scenes[..self.index].iter().map(SceneDto::duration_ms).sum::<u64>()
            + self.scene_started.elapsed().as_millis().min(self.current().duration_ms() as u128) as u64
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }
}

async fn handle_connection(socket: WebSocket, state: Arc<AppState>, principal: Principal) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    info!(conn_id, user_id = %principal.user_id, "teaching channel opened");

    let (mut tx, mut rx) = socket.split();
    let mut teaching_state = TeachingState::AwaitingStart;
    let mut tick = tokio::time::interval(Duration::from_millis(TICK_INTERVAL_MS));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            msg = rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        teaching_state = process_message(&conn_id, &text, teaching_state, &mut tx, &state, &principal).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!(conn_id, "teaching channel read error: {e}");
                        break;
                    }
                    _ => {}
                }
            }

            _ = tick.tick() => {
                if let TeachingState::Streaming(stream) = &mut teaching_state {
                    if advance_or_report(stream, &mut tx).await.is_break() {
                        teaching_state = TeachingState::Done;
                    }
                }
            }
        }

        if matches!(teaching_state, TeachingState::Done) {
            let _ = tx.send(Message::Close(None)).await;
            break;
        }
    }

    info!(conn_id, "teaching channel closed");
}

async fn process_message(
    conn_id: &str,
    text: &str,
    state: TeachingState,
    tx: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    app: &Arc<AppState>,
    principal: &Principal,
) -> TeachingState {
    let frame: InboundFrame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            warn!(conn_id, "malformed teaching frame, ignoring: {e}");
            return state;
        }
    };
    let Some(req) = frame.as_req() else {
        return state;
    };

    match req.method() {
        teaching::METHOD_START => {
            let Some(params) = req.params.clone().and_then(|p| serde_json::from_value::<StartParams>(p).ok()) else {
                let _ = send_json(tx, &ResFrame::err(&req.id, "PROTOCOL_ERROR", "invalid start params")).await;
                return state;
            };
            match fetch_visualization(app, principal, &params.visualization_id).await {
                Ok(visualization) if !visualization.scenes.is_empty() => {
                    let _ = send_json(tx, &ResFrame::ok(&req.id, serde_json::json!({ "accepted": true }))).await;
                    let mut stream = Stream {
                        visualization_id: visualization.id,
                        scenes: visualization.scenes,
                        index: 0,
                        paused: false,
                        scene_started: Instant::now(),
                        last_progress_sent: Instant::now(),
                        seq: 0,
                    };
                    send_current_scene(&mut stream, tx).await;
                    TeachingState::Streaming(stream)
                }
                Ok(_) => {
                    let _ = send_json(tx, &ResFrame::err(&req.id, "EMPTY_VISUALIZATION", "visualization has no scenes")).await;
                    state
                }
                Err(e) => {
                    warn!(conn_id, "failed to fetch visualization: {e}");
                    let _ = send_json(tx, &ResFrame::err(&req.id, "UPSTREAM_UNAVAILABLE", &e.to_string())).await;
                    state
                }
            }
        }

        teaching::METHOD_PAUSE => with_stream(state, tx, &req.id, |stream, _| stream.paused = true).await,

        teaching::METHOD_RESUME => {
            with_stream(state, tx, &req.id, |stream, _| {
                stream.paused = false;
                stream.scene_started = Instant::now();
            })
            .await
        }

        teaching::METHOD_NEXT => advance_from_request(state, tx, &req.id, 1).await,

        teaching::METHOD_PREVIOUS => advance_from_request(state, tx, &req.id, -1).await,

        teaching::METHOD_ACK_SCENE => {
            let ack: Option<AckSceneParams> = req.params.clone().and_then(|p| serde_json::from_value(p).ok());
            match (state, ack) {
                (TeachingState::Streaming(mut stream), Some(ack)) if ack.scene_index as usize == stream.index => {
                    let _ = send_json(tx, &ResFrame::ok(&req.id, serde_json::json!({ "advanced": true }))).await;
                    if step(&mut stream, tx).await {
                        TeachingState::Done
                    } else {
                        TeachingState::Streaming(stream)
                    }
                }
                (other, _) => {
                    let _ = send_json(tx, &ResFrame::ok(&req.id, serde_json::json!({ "advanced": false }))).await;
                    other
                }
            }
        }

        other => {
            let _ = send_json(tx, &ResFrame::err(&req.id, "METHOD_NOT_FOUND", &format!("unknown method '{other}'"))).await;
            state
        }
    }
}

async fn with_stream(
    state: TeachingState,
    tx: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    req_id: &str,
    f: impl FnOnce(&mut Stream, &mut futures_util::stream::SplitSink<WebSocket, Message>),
) -> TeachingState {
    match state {
        TeachingState::Streaming(mut stream) => {
            f(&mut stream, tx);
            let _ = send_json(tx, &ResFrame::ok(req_id, serde_json::json!({}))).await;
            TeachingState::Streaming(stream)
        }
        other => {
            let _ = send_json(tx, &ResFrame::err(req_id, "NOT_STREAMING", "no active scene stream")).await;
            other
        }
    }
}

async fn advance_from_request(
    state: TeachingState,
    tx: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    req_id: &str,
    delta: i64,
) -> TeachingState {
    match state {
        TeachingState::Streaming(mut stream) => {
            let next = (stream.index as i64 + delta).clamp(0, stream.scenes.len() as i64 - 1) as usize;
            stream.index = next;
            stream.scene_started = Instant::now();
            let _ = send_json(tx, &ResFrame::ok(req_id, serde_json::json!({}))).await;
            send_current_scene(&mut stream, tx).await;
            TeachingState::Streaming(stream)
        }
        other => {
            let _ = send_json(tx, &ResFrame::err(req_id, "NOT_STREAMING", "no active scene stream")).await;
            other
        }
    }
}

enum TickOutcome {
    Continue,
    Break,
}

impl TickOutcome {
    fn is_break(&self) -> bool {
        matches!(self, TickOutcome::Break)
    }
}

/// Called on every tick while streaming. Advances the scene once its
/// duration elapses (or, regardless of pause, once 2x the duration has
/// elapsed — bounding how long a laggy or paused client holds server-side
/// state); otherwise, periodically pushes a `progress` event.
async fn advance_or_report(stream: &mut Stream, tx: &mut futures_util::stream::SplitSink<WebSocket, Message>) -> TickOutcome {
    let elapsed_in_scene = stream.scene_started.elapsed().as_millis() as u64;
    let duration = stream.current().duration_ms();

    if (!stream.paused && elapsed_in_scene >= duration) || elapsed_in_scene >= duration.saturating_mul(2) {
        if step(stream, tx).await {
            return TickOutcome::Break;
        }
        return TickOutcome::Continue;
    }

    if stream.last_progress_sent.elapsed().as_millis() as u64 >= PROGRESS_INTERVAL_MS {
        send_progress(stream, tx).await;
    }
    TickOutcome::Continue
}

/// Advances to the next scene (or signals completion). Returns `true` once
/// the stream is finished.
async fn step(stream: &mut Stream, tx: &mut futures_util::stream::SplitSink<WebSocket, Message>) -> bool {
    stream.index += 1;
    if stream.index >= stream.scenes.len() {
        let seq = stream.next_seq();
        let payload = DonePayload { visualization_id: stream.visualization_id.clone(), scene_count: stream.scenes.len() as u32 };
        let _ = send_json(tx, &EventFrame::new(teaching::EVENT_DONE, payload).with_seq(seq)).await;
        return true;
    }
    stream.scene_started = Instant::now();
    stream.paused = false;
    send_current_scene(stream, tx).await;
    false
}

async fn send_current_scene(stream: &mut Stream, tx: &mut futures_util::stream::SplitSink<WebSocket, Message>) {
    let scene = stream.current();
    let payload = ScenePayload {
        scene_index: scene.position,
        scene_count: stream.scenes.len() as u32,
        duration_ms: scene.duration_ms(),
        content: scene.content(),
        narration: Some(scene.title.clone()),
    };
    let seq = stream.next_seq();
    let _ = send_json(tx, &EventFrame::new(teaching::EVENT_SCENE, payload).with_seq(seq)).await;
    stream.last_progress_sent = Instant::now();
}

async fn send_progress(stream: &mut Stream, tx: &mut futures_util::stream::SplitSink<WebSocket, Message>) {
    let payload = ProgressPayload {
        scene_index: stream.current().position,
        scene_count: stream.scenes.len() as u32,
        elapsed_ms: stream.elapsed_ms(),
        total_ms: stream.total_duration_ms(),
    };
    let seq = stream.next_seq();
    let _ = send_json(tx, &EventFrame::new(teaching::EVENT_PROGRESS, payload).with_seq(seq)).await;
    stream.last_progress_sent = Instant::now();
}

async fn fetch_visualization(app: &Arc<AppState>, principal: &Principal, visualization_id: &str) -> anyhow::Result<VisualizationDto> {
    let token = service_token(&app.keys, &principal.user_id)?;
    let url = format!("{}/visualizations/{}", app.visualization_url, visualization_id);
    let response = app.http.get(url).bearer_auth(token).send().await?.error_for_status()?;
    let mut visualization = response.json::<VisualizationDto>().await?;
    for (index, scene) in visualization.scenes.iter_mut().enumerate() {
        scene.position = index as u32;
    }
    Ok(visualization)
}

fn service_token(keys: &jwt::KeyRing, user_id: &str) -> anyhow::Result<String> {
    let principal = Principal { user_id: user_id.to_string(), email: String::new(), name: String::new(), role: Role::Student };
    jwt::encode_access_token(keys, &principal).map_err(|e| anyhow::anyhow!("failed to mint service token: {e}"))
}

async fn send_json<T: serde::Serialize>(
    tx: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    payload: &T,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(payload).unwrap_or_default();
    tx.send(Message::Text(json.into())).await.map_err(axum::Error::new)
}
