use std::sync::{Arc, Mutex};

use chrono::Utc;
use lumen_bus::{EventBus, VisualizationReady, TOPIC_VISUALIZATION_READY};
use lumen_core::jwt::{self, KeyRing};
use lumen_core::types::{new_id, now_rfc3339, Principal, Role};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::error::{Result, VisualizationError};
use crate::geometry;
use crate::types::{
    Animation, Audio, CandidateScene, CandidateVisualization, PlacedShape, Scene, Shape, Visualization, VisualizationStatus,
    VisualizationWithScenes,
};

/// Average adult silent-reading speed, used to size a lesson-synthesized
/// scene's hold time before the teaching channel advances it.
const READING_WORDS_PER_MINUTE: u64 = 200;
const MIN_SCENE_SECONDS: f64 = 4.0;
const MAX_SCENE_SECONDS: f64 = 20.0;
const FADE_IN_SECONDS: f64 = 0.6;

#[derive(Debug, Deserialize)]
struct LessonSectionDto {
    title: String,
    body: String,
}

#[derive(Debug, Deserialize)]
struct LessonDto {
    status: String,
    sections: Vec<LessonSectionDto>,
}

pub struct VisualizationManager {
    db: Mutex<Connection>,
    bus: EventBus,
    http: reqwest::Client,
    lesson_url: String,
    keys: KeyRing,
}

impl VisualizationManager {
    pub fn new(conn: Connection, bus: EventBus, lesson_url: String, keys: KeyRing) -> Arc<Self> {
        Arc::new(Self { db: Mutex::new(conn), bus, http: reqwest::Client::new(), lesson_url, keys })
    }

    /// Handle a `lesson.ready` event: fetch the finished lesson, synthesize a
    /// candidate visualization (one scene per section), and run it through
    /// the same pipeline a caller's `POST /visualizations/process` would.
    /// Idempotent on `lesson_id`: a redelivered event is a no-op once a
    /// visualization already exists for it.
    #[instrument(skip(self))]
    pub async fn handle_lesson_ready(&self, lesson_id: &str, user_id: &str) -> anyhow::Result<()> {
        if self.get_by_lesson(lesson_id).is_ok() {
            info!(lesson_id, "visualization already exists for this lesson, skipping");
            return Ok(());
        }

        let lesson = self.fetch_lesson(lesson_id, user_id).await?;
        if lesson.status != "ready" {
            anyhow::bail!("lesson is not ready yet (status: {})", lesson.status);
        }
        if lesson.sections.is_empty() {
            return Err(VisualizationError::EmptyLesson.into());
        }

        let candidate = synthesize_candidate(lesson_id, &lesson);
        let outcome = self.process(user_id, candidate)?;
        if outcome.visualization.status == VisualizationStatus::Ready {
            let event = VisualizationReady {
                visualization_id: outcome.visualization.id.clone(),
                lesson_id: lesson_id.to_string(),
                user_id: user_id.to_string(),
            };
            self.bus.publish(TOPIC_VISUALIZATION_READY, event).await?;
        } else {
            warn!(lesson_id, errors = ?outcome.visualization.errors, "synthesized visualization failed validation");
        }
        Ok(())
    }

    /// Runs a candidate visualization through the five-step pipeline:
    /// structural validation, coordinate resolution, animation
    /// reconciliation, audio/timing truncation, and persistence. Always
    /// persists something — either the fully resolved visualization or an
    /// `invalid` record carrying the accumulated errors — and never fails
    /// the request for layout alone.
    pub fn process(&self, user_id: &str, candidate: CandidateVisualization) -> Result<VisualizationWithScenes> {
        let lesson_id = candidate.lesson_id.clone();
        let errors = validate_candidate(&candidate);
        if !errors.is_empty() {
            let visualization = self.persist_invalid(&lesson_id, user_id, errors)?;
            return Ok(VisualizationWithScenes { visualization, scenes: Vec::new() });
        }

        let mut warnings = Vec::new();
        let mut scenes = Vec::with_capacity(candidate.scenes.len());
        for (position, candidate_scene) in candidate.scenes.into_iter().enumerate() {
            let (scene, scene_warnings) = resolve_scene(position, candidate_scene);
            warnings.extend(scene_warnings);
            scenes.push(scene);
        }

        let total_duration = scenes.iter().map(|s| s.duration).sum();
        let visualization_id = make_visualization_id(&lesson_id);
        let created_at = now_rfc3339();
        self.persist(&visualization_id, &lesson_id, user_id, &created_at, &scenes, total_duration, &warnings)
            .map_err(|e| VisualizationError::StoreFailed(e.to_string()))?;

        Ok(VisualizationWithScenes {
            visualization: Visualization {
                id: visualization_id,
                lesson_id,
                user_id: user_id.to_string(),
                status: VisualizationStatus::Ready,
                total_duration,
                errors: Vec::new(),
                warnings,
                created_at,
            },
            scenes,
        })
    }

    pub fn get(&self, visualization_id: &str) -> Result<VisualizationWithScenes> {
        let db = self.db.lock().unwrap();
        let visualization =
            get_visualization(&db, visualization_id)?.ok_or_else(|| VisualizationError::NotFound(visualization_id.to_string()))?;
        let scenes = list_scenes(&db, visualization_id)?;
        Ok(VisualizationWithScenes { visualization, scenes })
    }

    /// The most recently generated visualization for a lesson — regenerating
    /// creates a new record rather than overwriting the prior one, so this
    /// is the one callers should treat as canonical for playback.
    pub fn get_by_lesson(&self, lesson_id: &str) -> Result<VisualizationWithScenes> {
        let db = self.db.lock().unwrap();
        let id: Option<String> = db
            .query_row(
                "SELECT id FROM visualizations WHERE lesson_id = ?1 ORDER BY created_at DESC LIMIT 1",
                params![lesson_id],
                |r| r.get(0),
            )
            .optional()?;
        let id = id.ok_or_else(|| VisualizationError::NotFound(lesson_id.to_string()))?;
        let visualization = get_visualization(&db, &id)?.ok_or_else(|| VisualizationError::NotFound(id.clone()))?;
        let scenes = list_scenes(&db, &id)?;
        Ok(VisualizationWithScenes { visualization, scenes })
    }

    pub fn list(&self, user_id: &str) -> Result<Vec<Visualization>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, lesson_id, user_id, status, total_duration, errors, warnings, created_at
             FROM visualizations WHERE user_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![user_id], row_to_visualization)?.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn fetch_lesson(&self, lesson_id: &str, user_id: &str) -> anyhow::Result<LessonDto> {
        let token = self.service_token(user_id)?;
        let url = format!("{}/lessons/{}", self.lesson_url, lesson_id);
        let response = self.http.get(url).bearer_auth(token).send().await?.error_for_status()?;
        Ok(response.json::<LessonDto>().await?)
    }

    fn service_token(&self, user_id: &str) -> Result<String> {
        let principal = Principal { user_id: user_id.to_string(), email: String::new(), name: String::new(), role: Role::Student };
        jwt::encode_access_token(&self.keys, &principal).map_err(|e| VisualizationError::Token(e.to_string()))
    }

    fn persist_invalid(&self, lesson_id: &str, user_id: &str, errors: Vec<String>) -> Result<Visualization> {
        let id = make_visualization_id(lesson_id);
        let created_at = now_rfc3339();
        let errors_json = serde_json::to_string(&errors).unwrap_or_default();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO visualizations (id, lesson_id, user_id, status, total_duration, errors, warnings, created_at)
             VALUES (?1, ?2, ?3, 'invalid', 0, ?4, '[]', ?5)",
            params![id, lesson_id, user_id, errors_json, created_at],
        )?;
        Ok(Visualization {
            id,
            lesson_id: lesson_id.to_string(),
            user_id: user_id.to_string(),
            status: VisualizationStatus::Invalid,
            total_duration: 0.0,
            errors,
            warnings: Vec::new(),
            created_at,
        })
    }

    /// Writes the visualization row and every scene row in one transaction:
    /// either the whole visualization is persisted, or none of it is.
    fn persist(
        &self,
        visualization_id: &str,
        lesson_id: &str,
        user_id: &str,
        created_at: &str,
        scenes: &[Scene],
        total_duration: f64,
        warnings: &[String],
    ) -> rusqlite::Result<()> {
        let warnings_json = serde_json::to_string(warnings).unwrap_or_default();
        let mut db = self.db.lock().unwrap();
        let tx = db.transaction()?;
        tx.execute(
            "INSERT INTO visualizations (id, lesson_id, user_id, status, total_duration, errors, warnings, created_at)
             VALUES (?1, ?2, ?3, 'ready', ?4, '[]', ?5, ?6)",
            params![visualization_id, lesson_id, user_id, total_duration, warnings_json, created_at],
        )?;
        for (position, scene) in scenes.iter().enumerate() {
            let shapes_json = serde_json::to_string(&scene.shapes).unwrap_or_default();
            let animations_json = serde_json::to_string(&scene.animations).unwrap_or_default();
            let audio_json = scene.audio.as_ref().map(|a| serde_json::to_string(a).unwrap_or_default());
            tx.execute(
                "INSERT INTO scenes (id, visualization_id, position, scene_id, title, duration, shapes, animations, audio, background_color)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    new_id(),
                    visualization_id,
                    position as i64,
                    scene.scene_id,
                    scene.title,
                    scene.duration,
                    shapes_json,
                    animations_json,
                    audio_json,
                    scene.background_color,
                ],
            )?;
        }
        tx.commit()
    }
}

fn make_visualization_id(lesson_id: &str) -> String {
    format!("viz_{lesson_id}_{}", Utc::now().format("%Y%m%d%H%M%S"))
}

/// Step 1: structural validation. Every violation accumulates here rather
/// than short-circuiting, so a caller sees every problem with their
/// submission at once.
fn validate_candidate(candidate: &CandidateVisualization) -> Vec<String> {
    let mut errors = Vec::new();
    if candidate.scenes.is_empty() {
        errors.push("visualization has no scenes".to_string());
    }
    for (si, scene) in candidate.scenes.iter().enumerate() {
        if scene.duration <= 0.0 {
            errors.push(format!("scene {si} has a non-positive duration"));
        }
        if scene.shapes.is_empty() {
            errors.push(format!("scene {si} has no shapes"));
        }
        for (shi, shape) in scene.shapes.iter().enumerate() {
            if shape.placement().is_none() {
                errors.push(format!("scene {si} shape {shi} has neither an explicit position nor a zone"));
            }
            if !shape.kind.has_content() {
                errors.push(format!("scene {si} shape {shi} has empty or invalid content"));
            }
        }
        for (ai, animation) in scene.animations.iter().enumerate() {
            if animation.shape_index >= scene.shapes.len() {
                errors.push(format!("scene {si} animation {ai} references missing shape {}", animation.shape_index));
            }
            if animation.duration <= 0.0 {
                errors.push(format!("scene {si} animation {ai} has a non-positive duration"));
            }
        }
    }
    errors
}

/// Steps 2-4 for a single scene: pack its shapes into their zones, clamp and
/// extend animation timing to fit, and truncate audio that overruns the
/// (possibly just-extended) scene duration.
fn resolve_scene(position: usize, candidate: CandidateScene) -> (Scene, Vec<String>) {
    let mut warnings = Vec::new();

    let (placed, placement_warnings) = geometry::resolve_placements(&candidate.shapes);
    warnings.extend(placement_warnings);
    let shapes: Vec<PlacedShape> = placed
        .into_iter()
        .map(|p| PlacedShape {
            shape_index: p.shape_index,
            x: p.x,
            y: p.y,
            width: p.width,
            height: p.height,
            kind: candidate.shapes[p.shape_index].kind.clone(),
        })
        .collect();

    let mut animations: Vec<Animation> = candidate.animations;
    for (i, animation) in animations.iter_mut().enumerate() {
        if animation.start < 0.0 {
            warnings.push(format!("scene {position} animation {i} start clamped to 0"));
            animation.start = 0.0;
        }
    }

    let latest_end = animations.iter().map(|a| a.start + a.duration).fold(0.0_f64, f64::max);
    let mut duration = candidate.duration;
    if latest_end > duration {
        warnings.push(format!("scene {position} duration extended from {duration:.2}s to {latest_end:.2}s to fit its animations"));
        duration = latest_end;
    }

    let audio = candidate.audio.map(|mut audio| {
        if audio.start_time + audio.duration > duration {
            let truncated = (duration - audio.start_time).max(0.0);
            warnings.push(format!("scene {position} audio truncated from {:.2}s to {truncated:.2}s to fit the scene", audio.duration));
            audio.duration = truncated;
        }
        audio
    });

    let scene_id = candidate.scene_id.unwrap_or_else(|| format!("scene_{position}"));
    (Scene { scene_id, title: candidate.title, duration, shapes, animations, audio, background_color: candidate.background_color }, warnings)
}

/// Builds one scene per lesson section for the bus-triggered path: a title
/// shown top-center, a body shown center, both fading in, and narration
/// carried as the scene's `audio`.
fn synthesize_candidate(lesson_id: &str, lesson: &LessonDto) -> CandidateVisualization {
    let scenes = lesson
        .sections
        .iter()
        .enumerate()
        .map(|(position, section)| {
            let title_shape = Shape {
                kind: crate::types::ShapeKind::Text { text: section.title.clone(), font: Some("heading".to_string()) },
                x: None,
                y: None,
                zone: Some("top_center".to_string()),
            };
            let body_shape = Shape {
                kind: crate::types::ShapeKind::Text { text: section.body.clone(), font: None },
                x: None,
                y: None,
                zone: Some("center".to_string()),
            };
            let animations = vec![
                Animation { shape_index: 0, kind: crate::types::AnimationKind::FadeIn, start: 0.0, duration: FADE_IN_SECONDS, ease: None, to: None, from: None },
                Animation { shape_index: 1, kind: crate::types::AnimationKind::FadeIn, start: FADE_IN_SECONDS, duration: FADE_IN_SECONDS, ease: None, to: None, from: None },
            ];
            let narration = format!("{} {}", section.title, section.body);
            let duration = reading_duration_seconds(&narration);
            let audio = Audio { text: narration, start_time: 0.0, duration };
            CandidateScene {
                scene_id: Some(format!("scene_{position}")),
                title: section.title.clone(),
                duration,
                shapes: vec![title_shape, body_shape],
                animations,
                audio: Some(audio),
                background_color: None,
            }
        })
        .collect();
    CandidateVisualization { lesson_id: lesson_id.to_string(), scenes }
}

fn reading_duration_seconds(text: &str) -> f64 {
    let word_count = text.split_whitespace().count() as f64;
    ((word_count * 60.0) / READING_WORDS_PER_MINUTE as f64).clamp(MIN_SCENE_SECONDS, MAX_SCENE_SECONDS)
}

fn row_to_visualization(row: &rusqlite::Row) -> rusqlite::Result<Visualization> {
    let status_str: String = row.get(3)?;
    let errors_str: String = row.get(5)?;
    let warnings_str: String = row.get(6)?;
    Ok(Visualization {
        id: row.get(0)?,
        lesson_id: row.get(1)?,
        user_id: row.get(2)?,
        status: status_str.parse().unwrap_or(VisualizationStatus::StoreFailed),
        total_duration: row.get(4)?,
        errors: serde_json::from_str(&errors_str).unwrap_or_default(),
        warnings: serde_json::from_str(&warnings_str).unwrap_or_default(),
        created_at: row.get(7)?,
    })
}

fn get_visualization(conn: &Connection, id: &str) -> Result<Option<Visualization>> {
    const SQL: &str = "SELECT id, lesson_id, user_id, status, total_duration, errors, warnings, created_at
                        FROM visualizations WHERE id = ?1";
    conn.query_row(SQL, params![id], row_to_visualization).optional().map_err(VisualizationError::Database)
}

fn list_scenes(conn: &Connection, visualization_id: &str) -> Result<Vec<Scene>> {
    let mut stmt = conn.prepare(
        "SELECT scene_id, title, duration, shapes, animations, audio, background_color
         FROM scenes WHERE visualization_id = ?1 ORDER BY position",
    )?;
    let rows = stmt
        .query_map(params![visualization_id], |row| {
            let shapes_str: String = row.get(3)?;
            let animations_str: String = row.get(4)?;
            let audio_str: Option<String> = row.get(5)?;
            Ok(Scene {
                scene_id: row.get(0)?,
                title: row.get(1)?,
                duration: row.get(2)?,
                shapes: serde_json::from_str(&shapes_str).unwrap_or_default(),
                animations: serde_json::from_str(&animations_str).unwrap_or_default(),
                audio: audio_str.and_then(|s| serde_json::from_str(&s).ok()),
                background_color: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
