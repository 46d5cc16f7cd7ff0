use serde::{Deserialize, Serialize};

pub const CANVAS_WIDTH: f64 = 1920.0;
pub const CANVAS_HEIGHT: f64 = 1080.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualizationStatus {
    Ready,
    Invalid,
    StoreFailed,
}

impl std::fmt::Display for VisualizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VisualizationStatus::Ready => "ready",
            VisualizationStatus::Invalid => "invalid",
            VisualizationStatus::StoreFailed => "store_failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for VisualizationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ready" => Ok(VisualizationStatus::Ready),
            "invalid" => Ok(VisualizationStatus::Invalid),
            "store_failed" => Ok(VisualizationStatus::StoreFailed),
            other => Err(format!("unknown visualization status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

fn bounding_box(points: &[Point]) -> (f64, f64) {
    let Some(first) = points.first() else {
        return (0.0, 0.0);
    };
    let (mut min_x, mut max_x) = (first.x, first.x);
    let (mut min_y, mut max_y) = (first.y, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    (max_x - min_x, max_y - min_y)
}

const TEXT_CHAR_WIDTH: f64 = 12.0;
const TEXT_LINE_HEIGHT: f64 = 28.0;

/// A shape's type-specific attributes. Tagged by `type` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeKind {
    Circle { radius: f64 },
    Rectangle { width: f64, height: f64 },
    Line { points: Vec<Point> },
    Arrow { points: Vec<Point> },
    Text { text: String, #[serde(default)] font: Option<String> },
    Image { image_ref: String, width: f64, height: f64 },
    Polygon { points: Vec<Point> },
}

impl ShapeKind {
    /// The axis-aligned bounding box a shape of this kind occupies, used for
    /// zone packing. Text is approximated from its character count; every
    /// other kind carries exact dimensions.
    pub fn bounding_size(&self) -> (f64, f64) {
        match self {
            ShapeKind::Circle { radius } => (radius * 2.0, radius * 2.0),
            ShapeKind::Rectangle { width, height } => (*width, *height),
            ShapeKind::Line { points } | ShapeKind::Arrow { points } | ShapeKind::Polygon { points } => bounding_box(points),
            ShapeKind::Text { text, .. } => ((text.chars().count().max(1) as f64) * TEXT_CHAR_WIDTH, TEXT_LINE_HEIGHT),
            ShapeKind::Image { width, height, .. } => (*width, *height),
        }
    }

    /// Structural validity of the shape's own content, independent of its
    /// placement (empty text or image reference is meaningless).
    pub fn has_content(&self) -> bool {
        match self {
            ShapeKind::Text { text, .. } => !text.trim().is_empty(),
            ShapeKind::Image { image_ref, .. } => !image_ref.trim().is_empty(),
            ShapeKind::Line { points } | ShapeKind::Arrow { points } | ShapeKind::Polygon { points } => points.len() >= 2,
            ShapeKind::Circle { radius } => *radius > 0.0,
            ShapeKind::Rectangle { width, height } => *width > 0.0 && *height > 0.0,
        }
    }
}

/// Where a shape is anchored before coordinate resolution: an explicit pixel
/// position, or a symbolic zone name resolved against the nine-zone grid.
pub enum Placement {
    Explicit { x: f64, y: f64 },
    Zone(String),
}

/// A candidate shape, as submitted by a caller or synthesized from a lesson
/// section. Exactly one of `(x, y)` or `zone` should be set; which one is
/// checked during structural validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shape {
    #[serde(flatten)]
    pub kind: ShapeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
}

impl Shape {
    pub fn placement(&self) -> Option<Placement> {
        match (self.x, self.y, &self.zone) {
            (Some(x), Some(y), _) => Some(Placement::Explicit { x, y }),
            (_, _, Some(zone)) => Some(Placement::Zone(zone.clone())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationKind {
    FadeIn,
    FadeOut,
    Scale,
    Move,
    Rotate,
    Pulse,
    Glow,
    Draw,
    Write,
    Orbit,
}

/// An animation targeting one shape in the same scene by index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Animation {
    pub shape_index: usize,
    pub kind: AnimationKind,
    pub start: f64,
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ease: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Audio {
    pub text: String,
    pub start_time: f64,
    pub duration: f64,
}

/// A shape after coordinate resolution: its type-specific attributes plus
/// the resolved top-left canvas position and bounding size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedShape {
    pub shape_index: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(flatten)]
    pub kind: ShapeKind,
}

/// One timed whiteboard frame, fully resolved: shapes placed, animation
/// timings reconciled against `duration`, audio truncated to fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub scene_id: String,
    pub title: String,
    pub duration: f64,
    pub shapes: Vec<PlacedShape>,
    pub animations: Vec<Animation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<Audio>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visualization {
    pub id: String,
    pub lesson_id: String,
    pub user_id: String,
    pub status: VisualizationStatus,
    pub total_duration: f64,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationWithScenes {
    #[serde(flatten)]
    pub visualization: Visualization,
    pub scenes: Vec<Scene>,
}

/// A caller-submitted (or lesson-synthesized) visualization, before any of
/// the five pipeline steps have run.
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateVisualization {
    pub lesson_id: String,
    pub scenes: Vec<CandidateScene>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateScene {
    #[serde(default)]
    pub scene_id: Option<String>,
    pub title: String,
    pub duration: f64,
    pub shapes: Vec<Shape>,
    #[serde(default)]
    pub animations: Vec<Animation>,
    #[serde(default)]
    pub audio: Option<Audio>,
    #[serde(default)]
    pub background_color: Option<String>,
}
