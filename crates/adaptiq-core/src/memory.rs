//! In-memory repositories for tests, simulations, and ephemeral sessions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::model::{DifficultyEntry, DifficultyProfile, Grade, UserSession};
use crate::traits::{QuestionRepository, StoredQuestion, UserRepository};

/// Holds a fixed corpus and records every persisted update.
pub struct InMemoryQuestionRepository {
    questions: Mutex<Vec<StoredQuestion>>,
    updates: Mutex<Vec<(String, Grade, DifficultyEntry)>>,
    fail_writes: AtomicBool,
}

impl InMemoryQuestionRepository {
    pub fn new(questions: Vec<StoredQuestion>) -> Self {
        Self {
            questions: Mutex::new(questions),
            updates: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Difficulty updates persisted so far, in call order.
    pub fn updates(&self) -> Vec<(String, Grade, DifficultyEntry)> {
        self.updates.lock().clone()
    }

    /// Profile currently held for a question.
    pub fn profile(&self, question_id: &str) -> Option<DifficultyProfile> {
        self.questions
            .lock()
            .iter()
            .find(|q| q.question.id == question_id)
            .and_then(|q| q.difficulty)
    }
}

#[async_trait]
impl QuestionRepository for InMemoryQuestionRepository {
    async fn load_questions(&self) -> anyhow::Result<Vec<StoredQuestion>> {
        Ok(self.questions.lock().clone())
    }

    async fn persist_difficulty_update(
        &self,
        question_id: &str,
        grade: Grade,
        entry: DifficultyEntry,
    ) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            anyhow::bail!("injected write failure for {question_id}");
        }
        self.updates
            .lock()
            .push((question_id.to_string(), grade, entry));
        if let Some(stored) = self
            .questions
            .lock()
            .iter_mut()
            .find(|q| q.question.id == question_id)
        {
            let mut profile = stored.difficulty.unwrap_or_default();
            profile.set(grade, entry);
            stored.difficulty = Some(profile);
        }
        Ok(())
    }

    async fn persist_profile(
        &self,
        question_id: &str,
        profile: &DifficultyProfile,
    ) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            anyhow::bail!("injected write failure for {question_id}");
        }
        if let Some(stored) = self
            .questions
            .lock()
            .iter_mut()
            .find(|q| q.question.id == question_id)
        {
            stored.difficulty = Some(*profile);
        }
        Ok(())
    }
}

/// Keeps user records in a map.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<String, UserSession>>,
    fail_writes: AtomicBool,
    persist_count: AtomicU32,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a persisted record.
    pub fn with_user(self, session: UserSession) -> Self {
        self.users.lock().insert(session.user_id.clone(), session);
        self
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    pub fn get(&self, user_id: &str) -> Option<UserSession> {
        self.users.lock().get(user_id).cloned()
    }

    /// Number of successful `persist_user` calls.
    pub fn persist_count(&self) -> u32 {
        self.persist_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn load_user(&self, user_id: &str) -> anyhow::Result<Option<UserSession>> {
        Ok(self.users.lock().get(user_id).cloned())
    }

    async fn persist_user(&self, session: &UserSession) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            anyhow::bail!("injected write failure for {}", session.user_id);
        }
        self.users
            .lock()
            .insert(session.user_id.clone(), session.clone());
        self.persist_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
