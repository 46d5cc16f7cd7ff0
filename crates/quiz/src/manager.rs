use std::sync::{Arc, Mutex};

use lumen_bus::{EventBus, QuizReady, TOPIC_QUIZ_READY};
use lumen_core::jwt::{self, KeyRing};
use lumen_core::types::{new_id, now_rfc3339, Principal, Role};
use lumen_generator::{GenerationRequest, GeneratedItem, TextGenerator};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::error::{QuizError, Result};
use crate::types::{Answer, Difficulty, Question, Quiz, QuizStatus, Submission, SubmissionResult};

const MAX_QUESTIONS: u32 = 5;
const OPTIONS_PER_QUESTION: usize = 4;
const SUMMARY_WORD_COUNT: usize = 12;

#[derive(Debug, Deserialize)]
struct LessonSectionDto {
    title: String,
    body: String,
}

#[derive(Debug, Deserialize)]
struct LessonDto {
    title: Option<String>,
    status: String,
    sections: Vec<LessonSectionDto>,
}

pub struct QuizManager {
    db: Mutex<Connection>,
    bus: EventBus,
    http: reqwest::Client,
    lesson_url: String,
    generator: Arc<dyn TextGenerator>,
    keys: KeyRing,
}

impl QuizManager {
    pub fn new(conn: Connection, bus: EventBus, lesson_url: String, generator: Arc<dyn TextGenerator>, keys: KeyRing) -> Arc<Self> {
        Arc::new(Self { db: Mutex::new(conn), bus, http: reqwest::Client::new(), lesson_url, generator, keys })
    }

    /// Handle a `lesson.ready` event. Idempotent on `lesson_id`: a
    /// redelivered event is a no-op once a quiz already exists for it.
    #[instrument(skip(self))]
    pub async fn handle_lesson_ready(&self, lesson_id: &str, user_id: &str) -> anyhow::Result<()> {
        let Some(quiz_id) = self.create_pending(lesson_id, user_id)? else {
            info!(lesson_id, "quiz already exists for this lesson, skipping");
            return Ok(());
        };

        match self.generate(&quiz_id, lesson_id, user_id).await {
            Ok(()) => {
                self.set_ready(&quiz_id)?;
                let event = QuizReady { quiz_id: quiz_id.clone(), lesson_id: lesson_id.to_string(), user_id: user_id.to_string() };
                self.bus.publish(TOPIC_QUIZ_READY, event).await?;
            }
            Err(e) => {
                warn!(quiz_id, "quiz generation failed: {e}");
                self.set_failed(&quiz_id, &e.to_string())?;
            }
        }
        Ok(())
    }

    pub fn get(&self, lesson_id: &str) -> Result<Quiz> {
        let db = self.db.lock().unwrap();
        let id: Option<String> = db.query_row("SELECT id FROM quizzes WHERE lesson_id = ?1", params![lesson_id], |r| r.get(0)).optional()?;
        let id = id.ok_or_else(|| QuizError::NotFound(lesson_id.to_string()))?;
        load_quiz(&db, &id)?.ok_or_else(|| QuizError::NotFound(lesson_id.to_string()))
    }

    pub fn submit(&self, lesson_id: &str, user_id: &str, answers: Vec<Answer>) -> Result<(Submission, Vec<SubmissionResult>)> {
        let quiz = self.get(lesson_id)?;

        let mut results = Vec::with_capacity(answers.len());
        let mut score = 0u32;
        for answer in &answers {
            let question = quiz
                .questions
                .get(answer.question_index as usize)
                .ok_or(QuizError::InvalidAnswer)?;
            let correct = answer.selected_option == question.correct_index;
            if correct {
                score += 1;
            }
            results.push(SubmissionResult { question_index: answer.question_index, correct, correct_index: question.correct_index });
        }

        let submission = Submission {
            id: new_id(),
            lesson_id: lesson_id.to_string(),
            user_id: user_id.to_string(),
            answers,
            score,
            total: quiz.questions.len() as u32,
            submitted_at: now_rfc3339(),
        };

        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO submissions (id, lesson_id, user_id, answers, score, total, submitted_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                submission.id,
                submission.lesson_id,
                submission.user_id,
                serde_json::to_string(&submission.answers).unwrap_or_default(),
                submission.score,
                submission.total,
                submission.submitted_at,
            ],
        )?;

        Ok((submission, results))
    }

    fn create_pending(&self, lesson_id: &str, user_id: &str) -> Result<Option<String>> {
        let id = new_id();
        let now = now_rfc3339();
        let db = self.db.lock().unwrap();
        let inserted = db.execute(
            "INSERT OR IGNORE INTO quizzes (id, lesson_id, user_id, status, error, created_at, updated_at)
             VALUES (?1, ?2, ?3, 'pending', NULL, ?4, ?4)",
            params![id, lesson_id, user_id, now],
        )?;
        Ok(if inserted > 0 { Some(id) } else { None })
    }

    async fn generate(&self, quiz_id: &str, lesson_id: &str, user_id: &str) -> anyhow::Result<()> {
        let lesson = self.fetch_lesson(lesson_id, user_id).await?;
        if lesson.status != "ready" {
            anyhow::bail!("lesson is not ready yet (status: {})", lesson.status);
        }

        let source_text = lesson.sections.iter().map(|s| format!("{}: {}", s.title, s.body)).collect::<Vec<_>>().join("\n\n");
        let request = GenerationRequest {
            instruction: format!("Produce quiz questions testing understanding of \"{}\"", lesson.title.unwrap_or_default()),
            source_text,
            max_items: MAX_QUESTIONS,
        };

        let response = self.generator.generate(&request).await?;
        let questions: Vec<Question> =
            response.items.into_iter().enumerate().map(|(position, item)| build_question(position, item)).collect();

        let db = self.db.lock().unwrap();
        for (position, question) in questions.iter().enumerate() {
            db.execute(
                "INSERT INTO quiz_questions (id, quiz_id, position, question, options, correct_index, explanation, difficulty)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    new_id(),
                    quiz_id,
                    position as u32,
                    question.question,
                    serde_json::to_string(&question.options).unwrap_or_default(),
                    question.correct_index,
                    question.explanation,
                    serde_json::to_string(&question.difficulty).unwrap_or_default(),
                ],
            )?;
        }
        Ok(())
    }

    async fn fetch_lesson(&self, lesson_id: &str, user_id: &str) -> anyhow::Result<LessonDto> {
        let token = self.service_token(user_id)?;
        let url = format!("{}/lessons/{}", self.lesson_url, lesson_id);
        let response = self.http.get(url).bearer_auth(token).send().await?.error_for_status()?;
        Ok(response.json::<LessonDto>().await?)
    }

    fn service_token(&self, user_id: &str) -> Result<String> {
        let principal = Principal { user_id: user_id.to_string(), email: String::new(), name: String::new(), role: Role::Student };
        jwt::encode_access_token(&self.keys, &principal).map_err(|e| QuizError::Generation(format!("failed to mint service token: {e}")))
    }

    fn set_ready(&self, quiz_id: &str) -> Result<()> {
        let now = now_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute("UPDATE quizzes SET status = 'ready', error = NULL, updated_at = ?2 WHERE id = ?1", params![quiz_id, now])?;
        Ok(())
    }

    fn set_failed(&self, quiz_id: &str, error: &str) -> Result<()> {
        let now = now_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute("UPDATE quizzes SET status = 'failed', error = ?2, updated_at = ?3 WHERE id = ?1", params![quiz_id, error, now])?;
        Ok(())
    }
}

/// Derives a multiple-choice question from a generated section. The offline
/// generator has no notion of distractors, so plausible-looking wrong
/// options are synthesized by rotating through the section's own words;
/// a real provider would return options directly.
fn build_question(position: usize, item: GeneratedItem) -> Question {
    let words: Vec<&str> = item.body.split_whitespace().collect();
    let summarize = |rotate: usize| -> String {
        if words.is_empty() {
            return item.title.clone();
        }
        words.iter().cycle().skip(rotate % words.len()).take(words.len().min(SUMMARY_WORD_COUNT)).copied().collect::<Vec<_>>().join(" ")
    };

    let correct_index = (position as u32) % OPTIONS_PER_QUESTION as u32;
    let options = (0..OPTIONS_PER_QUESTION)
        .map(|i| if i as u32 == correct_index { summarize(0) } else { summarize((i + 1) * SUMMARY_WORD_COUNT) })
        .collect();

    Question {
        question: format!("Which statement best matches \"{}\"?", item.title),
        options,
        correct_index,
        explanation: item.body,
        difficulty: Difficulty::for_position(position),
    }
}

fn load_quiz(conn: &Connection, quiz_id: &str) -> Result<Option<Quiz>> {
    const SQL: &str = "SELECT id, lesson_id, user_id, status, error, created_at, updated_at FROM quizzes WHERE id = ?1";
    let row: Option<(String, String, String, String, Option<String>, String, String)> = conn
        .query_row(SQL, params![quiz_id], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?, r.get(6)?)))
        .optional()?;
    let Some((id, lesson_id, user_id, status, error, created_at, updated_at)) = row else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT question, options, correct_index, explanation, difficulty FROM quiz_questions WHERE quiz_id = ?1 ORDER BY position",
    )?;
    let questions = stmt
        .query_map(params![quiz_id], |r| {
            let options_str: String = r.get(1)?;
            let difficulty_str: String = r.get(4)?;
            Ok(Question {
                question: r.get(0)?,
                options: serde_json::from_str(&options_str).unwrap_or_default(),
                correct_index: r.get(2)?,
                explanation: r.get(3)?,
                difficulty: serde_json::from_str(&difficulty_str).unwrap_or(Difficulty::Medium),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Some(Quiz {
        id,
        lesson_id,
        user_id,
        status: status.parse().unwrap_or(QuizStatus::Failed),
        error,
        questions,
        created_at,
        updated_at,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_question_picks_a_distinct_correct_option() {
        let item = GeneratedItem { title: "Photosynthesis".into(), body: "plants convert light into chemical energy using chlorophyll".into() };
        let question = build_question(1, item);
        assert_eq!(question.options.len(), OPTIONS_PER_QUESTION);
        assert_eq!(question.correct_index, 1);
        assert!(question.options[question.correct_index as usize].contains("plants"));
    }

    #[test]
    fn difficulty_cycles_across_positions() {
        assert_eq!(Difficulty::for_position(0), Difficulty::Easy);
        assert_eq!(Difficulty::for_position(1), Difficulty::Medium);
        assert_eq!(Difficulty::for_position(2), Difficulty::Hard);
        assert_eq!(Difficulty::for_position(3), Difficulty::Easy);
    }
}
