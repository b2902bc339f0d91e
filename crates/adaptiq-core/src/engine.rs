//! Adaptive selection engine.
//!
//! Owns the shared question store and the open user sessions. Each session is
//! behind its own async mutex, so answers from one user are processed one at a
//! time while other users proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::difficulty::DifficultyPrior;
use crate::error::{EngineError, SimilarityError, ValidationError};
use crate::exam::ExamCatalog;
use crate::model::{
    ActiveQuestion, Grade, OptionLetter, Question, QuestionId, UserSession, UserStats,
};
use crate::scoring::{
    difference_score, rank, sanitize_similarity, RankedCandidate, ScoreBreakdown, ScoringWeights,
};
use crate::store::QuestionStore;
use crate::traits::{QuestionRepository, SimilarityProvider, UserRepository};

/// What to do when a user has answered every question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExhaustionPolicy {
    /// Surface [`EngineError::Exhausted`].
    #[default]
    Fail,
    /// Forget the answered history and start over.
    Reset,
}

/// Configuration for the selection engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub weights: ScoringWeights,
    /// Budget for one similarity call.
    pub similarity_timeout: Duration,
    /// Maximum similarity calls in flight during one scan.
    pub similarity_concurrency: usize,
    pub exhaustion: ExhaustionPolicy,
    /// Seed for first-question draws and bootstrap synthesis.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            similarity_timeout: Duration::from_secs(2),
            similarity_concurrency: 8,
            exhaustion: ExhaustionPolicy::Fail,
            seed: None,
        }
    }
}

/// The question chosen by a scan, with the score that won.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub question_id: QuestionId,
    pub breakdown: ScoreBreakdown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NextQuestion {
    Selected(Selection),
    Exhausted,
}

/// Result of a submitted answer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub correct_option: OptionLetter,
    pub next: NextQuestion,
}

type SessionHandle = Arc<tokio::sync::Mutex<UserSession>>;

/// The adaptive question-selection engine.
pub struct Engine {
    store: Arc<QuestionStore>,
    catalog: ExamCatalog,
    similarity: Arc<dyn SimilarityProvider>,
    questions: Arc<dyn QuestionRepository>,
    users: Arc<dyn UserRepository>,
    sessions: Mutex<HashMap<String, SessionHandle>>,
    rng: Mutex<StdRng>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(
        store: Arc<QuestionStore>,
        similarity: Arc<dyn SimilarityProvider>,
        questions: Arc<dyn QuestionRepository>,
        users: Arc<dyn UserRepository>,
        config: EngineConfig,
    ) -> Self {
        let catalog = ExamCatalog::with_extra(store.exam_names());
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            store,
            catalog,
            similarity,
            questions,
            users,
            sessions: Mutex::new(HashMap::new()),
            rng: Mutex::new(rng),
            config,
        }
    }

    /// Load the corpus, synthesize difficulty for questions without response
    /// data, and build an engine around the resulting store.
    #[instrument(skip_all, fields(similarity = similarity.name()))]
    pub async fn bootstrap(
        questions: Arc<dyn QuestionRepository>,
        users: Arc<dyn UserRepository>,
        similarity: Arc<dyn SimilarityProvider>,
        prior: &dyn DifficultyPrior,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let stored = questions
            .load_questions()
            .await
            .map_err(EngineError::Collaborator)?;

        // Offset so bootstrap and first-question draws use distinct streams.
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(0x5eed)),
            None => StdRng::from_entropy(),
        };

        let mut entries = Vec::with_capacity(stored.len());
        let mut synthesized = 0usize;
        for item in stored {
            let profile = match item.difficulty {
                Some(profile) => profile,
                None => {
                    let profile = prior.synthesize(item.question.grade_level, &mut rng);
                    if let Err(e) = questions.persist_profile(&item.question.id, &profile).await {
                        tracing::warn!(
                            question_id = %item.question.id,
                            "failed to persist bootstrapped difficulty: {e:#}"
                        );
                    }
                    synthesized += 1;
                    profile
                }
            };
            entries.push((item.question, profile));
        }

        let store = QuestionStore::new(entries)?;
        tracing::info!(questions = store.len(), synthesized, "question store ready");

        Ok(Self::new(Arc::new(store), similarity, questions, users, config))
    }

    pub fn store(&self) -> &QuestionStore {
        &self.store
    }

    pub fn catalog(&self) -> &ExamCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn session(&self, user_id: &str) -> Result<SessionHandle, EngineError> {
        self.sessions
            .lock()
            .get(user_id)
            .cloned()
            .ok_or_else(|| EngineError::SessionNotFound(user_id.to_string()))
    }

    fn question(&self, id: &str) -> Result<Arc<Question>, EngineError> {
        self.store
            .get(id)
            .ok_or_else(|| EngineError::QuestionNotFound(id.to_string()))
    }

    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    /// Log a user in, restoring persisted state when it exists, and draw a
    /// random first question outside their history.
    #[instrument(skip(self), fields(grade = %grade))]
    pub async fn start_session(
        &self,
        user_id: &str,
        grade: Grade,
        preferred_exam: &str,
    ) -> Result<ActiveQuestion, EngineError> {
        let exam = self
            .catalog
            .resolve(preferred_exam)
            .ok_or_else(|| ValidationError::UnknownExam(preferred_exam.to_string()))?;

        if let Some(open) = self.open_question(user_id).await {
            return open;
        }

        let session = match self
            .users
            .load_user(user_id)
            .await
            .map_err(EngineError::Collaborator)?
        {
            Some(record) => {
                if record.grade != grade {
                    tracing::warn!(
                        persisted = %record.grade,
                        requested = %grade,
                        "keeping persisted grade for returning user"
                    );
                }
                restored(record)
            }
            None => {
                tracing::info!("creating new user session");
                UserSession::new(user_id, grade, exam)
            }
        };

        self.open(session).await
    }

    /// Reopen a session from persisted state only.
    #[instrument(skip(self))]
    pub async fn resume_session(&self, user_id: &str) -> Result<ActiveQuestion, EngineError> {
        if let Some(open) = self.open_question(user_id).await {
            return open;
        }

        let record = self
            .users
            .load_user(user_id)
            .await
            .map_err(EngineError::Collaborator)?
            .ok_or_else(|| EngineError::UserNotFound(user_id.to_string()))?;

        self.open(restored(record)).await
    }

    /// The active question of an already open session, if there is one.
    async fn open_question(&self, user_id: &str) -> Option<Result<ActiveQuestion, EngineError>> {
        let handle = self.sessions.lock().get(user_id).cloned()?;
        let session = handle.lock().await;
        tracing::debug!("session already open");
        Some(self.active_view(&session))
    }

    async fn open(&self, mut session: UserSession) -> Result<ActiveQuestion, EngineError> {
        if self.store.is_empty() {
            return Err(EngineError::EmptyCorpus);
        }

        let first = self.draw_first(&mut session)?;
        self.install(&mut session, &first);
        tracing::info!(
            user_id = %session.user_id,
            answered = session.answered_count,
            question_id = %first.id,
            "session started"
        );
        self.persist_user(&session).await;

        let view = ActiveQuestion::from(first.as_ref());
        let user_id = session.user_id.clone();
        self.sessions
            .lock()
            .insert(user_id, Arc::new(tokio::sync::Mutex::new(session)));
        Ok(view)
    }

    /// Uniform draw over the questions this user has not answered.
    fn draw_first(&self, session: &mut UserSession) -> Result<Arc<Question>, EngineError> {
        let drawn = {
            let mut rng = self.rng.lock();
            self.store.random_excluding(&session.answered_ids, &mut *rng)
        };
        if let Some(q) = drawn {
            return Ok(q);
        }
        match self.config.exhaustion {
            ExhaustionPolicy::Fail => Err(EngineError::Exhausted {
                user_id: session.user_id.clone(),
            }),
            ExhaustionPolicy::Reset => {
                self.reset_history(session);
                let mut rng = self.rng.lock();
                self.store
                    .random_excluding(&session.answered_ids, &mut *rng)
                    .ok_or(EngineError::EmptyCorpus)
            }
        }
    }

    /// Install a specific question as the active one.
    #[instrument(skip(self))]
    pub async fn present_question(
        &self,
        user_id: &str,
        question_id: &str,
    ) -> Result<ActiveQuestion, EngineError> {
        let handle = self.session(user_id)?;
        let mut session = handle.lock().await;
        let question = self.question(question_id)?;
        if session.answered_ids.contains(question_id) {
            return Err(ValidationError::AlreadyAnswered {
                user_id: user_id.to_string(),
                question_id: question_id.to_string(),
            }
            .into());
        }
        self.install(&mut session, &question);
        Ok(ActiveQuestion::from(question.as_ref()))
    }

    /// Persist and close a session. Returns the final stats.
    #[instrument(skip(self))]
    pub async fn end_session(&self, user_id: &str) -> Result<UserStats, EngineError> {
        let handle = self
            .sessions
            .lock()
            .remove(user_id)
            .ok_or_else(|| EngineError::SessionNotFound(user_id.to_string()))?;
        let session = handle.lock().await;
        self.persist_user(&session).await;
        tracing::info!(answered = session.answered_count, "session ended");
        Ok(session.stats())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub async fn active_question(&self, user_id: &str) -> Result<ActiveQuestion, EngineError> {
        let handle = self.session(user_id)?;
        let session = handle.lock().await;
        self.active_view(&session)
    }

    fn active_view(&self, session: &UserSession) -> Result<ActiveQuestion, EngineError> {
        let id = session
            .active_question_id
            .as_deref()
            .ok_or_else(|| EngineError::NoActiveQuestion(session.user_id.clone()))?;
        Ok(ActiveQuestion::from(self.question(id)?.as_ref()))
    }

    pub async fn user_stats(&self, user_id: &str) -> Result<UserStats, EngineError> {
        let handle = self.session(user_id)?;
        let session = handle.lock().await;
        Ok(session.stats())
    }

    pub async fn last_question_difficulty(&self, user_id: &str) -> Result<f64, EngineError> {
        let handle = self.session(user_id)?;
        let session = handle.lock().await;
        Ok(session.last_question_difficulty)
    }

    /// A copy of the session record.
    pub async fn session_state(&self, user_id: &str) -> Result<UserSession, EngineError> {
        let handle = self.session(user_id)?;
        let session = handle.lock().await;
        Ok(session.clone())
    }

    /// All unanswered questions except the active one, best first, scored
    /// against the current state.
    #[instrument(skip(self))]
    pub async fn rank(&self, user_id: &str) -> Result<Vec<RankedCandidate>, EngineError> {
        let handle = self.session(user_id)?;
        let session = handle.lock().await;
        let anchor = self.anchor_text(&session);
        let active = session.active_question_id.clone();
        Ok(self.rank_locked(&session, &anchor, active.as_deref()).await)
    }

    // -----------------------------------------------------------------------
    // Answer processing and selection
    // -----------------------------------------------------------------------

    /// Grade an answer, update the user's accuracy and the question's
    /// difficulty, then select and install the next question.
    #[instrument(skip(self))]
    pub async fn submit_answer(
        &self,
        user_id: &str,
        letter: &str,
    ) -> Result<AnswerOutcome, EngineError> {
        let handle = self.session(user_id)?;
        let mut session = handle.lock().await;

        let active_id = session
            .active_question_id
            .clone()
            .ok_or_else(|| EngineError::NoActiveQuestion(user_id.to_string()))?;
        let question = self.question(&active_id)?;

        let letter: OptionLetter = letter.parse()?;
        if !question.has_option(letter) {
            return Err(ValidationError::InvalidOption {
                question_id: question.id.clone(),
                letter: letter.to_string(),
            }
            .into());
        }

        let correct = question.is_correct(letter);
        session.record_answer(correct);

        let grade = session.grade;
        let entry = self.store.record_answer(&question.id, grade, correct)?;
        if let Err(e) = self
            .questions
            .persist_difficulty_update(&question.id, grade, entry)
            .await
        {
            tracing::warn!(
                question_id = %question.id,
                grade = %grade,
                "failed to persist difficulty update: {e:#}"
            );
        }

        session.answered_ids.insert(question.id.clone());
        session.last_question_difficulty = entry.percent_correct();
        tracing::debug!(
            question_id = %question.id,
            correct,
            accuracy = session.running_accuracy(),
            percent_correct = entry.percent_correct(),
            respondents = entry.respondents,
            "answer recorded"
        );

        let next = match self.select_locked(&mut session, &question.text, None).await {
            Ok(selection) => NextQuestion::Selected(selection),
            Err(EngineError::Exhausted { .. }) => {
                tracing::info!("no unanswered questions remain");
                session.active_question_id = None;
                NextQuestion::Exhausted
            }
            Err(e) => return Err(e),
        };

        self.persist_user(&session).await;

        Ok(AnswerOutcome {
            correct,
            correct_option: question.correct_option,
            next,
        })
    }

    /// Re-run selection for an open session and install the result.
    #[instrument(skip(self))]
    pub async fn select_next(&self, user_id: &str) -> Result<Selection, EngineError> {
        let handle = self.session(user_id)?;
        let mut session = handle.lock().await;
        let anchor = self.anchor_text(&session);
        let active = session.active_question_id.clone();
        self.select_locked(&mut session, &anchor, active.as_deref()).await
    }

    fn anchor_text(&self, session: &UserSession) -> String {
        session
            .active_question_id
            .as_deref()
            .and_then(|id| self.store.get(id))
            .map(|q| q.text.clone())
            .unwrap_or_default()
    }

    /// `skip` names a question to pass over unless it is the only candidate.
    async fn select_locked(
        &self,
        session: &mut UserSession,
        anchor: &str,
        skip: Option<&str>,
    ) -> Result<Selection, EngineError> {
        let mut ranked = self.rank_locked(session, anchor, skip).await;

        if ranked.is_empty()
            && self.config.exhaustion == ExhaustionPolicy::Reset
            && !self.store.is_empty()
        {
            self.reset_history(session);
            ranked = self.rank_locked(session, anchor, skip).await;
        }

        let best = ranked
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::Exhausted {
                user_id: session.user_id.clone(),
            })?;
        let question = self.question(&best.question_id)?;
        self.install(session, &question);
        tracing::debug!(
            question_id = %best.question_id,
            score = best.breakdown.total,
            "selected next question"
        );

        Ok(Selection {
            question_id: best.question_id,
            breakdown: best.breakdown,
        })
    }

    /// Start a new pass over the corpus. The most recently answered question
    /// stays excluded unless it is the only one.
    fn reset_history(&self, session: &mut UserSession) {
        tracing::info!(user_id = %session.user_id, "history exhausted, resetting");
        let last = session.answered_ids.as_slice().last().cloned();
        session.answered_ids.clear();
        if self.store.len() > 1 {
            if let Some(id) = last {
                session.answered_ids.insert(id);
            }
        }
    }

    /// Score every question outside the answered history against one
    /// consistent snapshot of the store.
    async fn rank_locked(
        &self,
        session: &UserSession,
        anchor: &str,
        skip: Option<&str>,
    ) -> Vec<RankedCandidate> {
        let mut candidates: Vec<_> = self
            .store
            .snapshot(session.grade)
            .into_iter()
            .filter(|c| !session.answered_ids.contains(&c.question.id))
            .collect();
        if let Some(skip) = skip {
            if candidates.iter().any(|c| c.question.id != skip) {
                candidates.retain(|c| c.question.id != skip);
            }
        }

        let similarity_futures: Vec<_> = candidates
            .iter()
            .map(|c| self.similarity_or_zero(&c.question, anchor))
            .collect();
        let similarities: Vec<f64> = stream::iter(similarity_futures)
        .buffered(self.config.similarity_concurrency.max(1))
        .collect()
        .await;

        let scored = candidates
            .iter()
            .zip(similarities)
            .map(|(c, similarity)| RankedCandidate {
                question_id: c.question.id.clone(),
                breakdown: difference_score(
                    &self.config.weights,
                    session,
                    &c.question,
                    c.difficulty,
                    similarity,
                ),
            })
            .collect();

        rank(scored)
    }

    /// Similarity to the anchor text. A failed or slow call counts as zero
    /// similarity so the scan can continue.
    async fn similarity_or_zero(&self, candidate: &Question, anchor: &str) -> f64 {
        let call = self.similarity.similarity(&candidate.text, anchor);
        match tokio::time::timeout(self.config.similarity_timeout, call).await {
            Ok(Ok(value)) => sanitize_similarity(value),
            Ok(Err(e)) => {
                tracing::warn!(
                    question_id = %candidate.id,
                    provider = self.similarity.name(),
                    "similarity failed, scoring as dissimilar: {e:#}"
                );
                0.0
            }
            Err(_) => {
                let err =
                    SimilarityError::Timeout(self.config.similarity_timeout.as_millis() as u64);
                tracing::warn!(
                    question_id = %candidate.id,
                    provider = self.similarity.name(),
                    "{err}, scoring as dissimilar"
                );
                0.0
            }
        }
    }

    /// Make `question` the active one and refresh the difficulty anchor.
    fn install(&self, session: &mut UserSession, question: &Question) {
        session.active_question_id = Some(question.id.clone());
        if let Some(entry) = self.store.difficulty(&question.id, session.grade) {
            session.last_question_difficulty = entry.percent_correct();
        }
    }

    async fn persist_user(&self, session: &UserSession) {
        if let Err(e) = self.users.persist_user(session).await {
            tracing::warn!(user_id = %session.user_id, "failed to persist user: {e:#}");
        }
    }
}

/// Persisted state with the active question cleared; it is drawn afresh.
fn restored(mut record: UserSession) -> UserSession {
    record.active_question_id = None;
    record.correct_count = record.correct_count.min(record.answered_count);
    record
}
