//! One JSON file per user.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use adaptiq_core::model::UserSession;
use adaptiq_core::traits::UserRepository;

/// On-disk form of a user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(flatten)]
    pub session: UserSession,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

/// Stores user sessions as pretty JSON under a directory.
///
/// Writes go to a temporary file that is then renamed over the old record,
/// so a crash never leaves a half-written file behind.
#[derive(Debug, Clone)]
pub struct JsonUserStore {
    dir: PathBuf,
}

impl JsonUserStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create user directory: {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, user_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(user_id)))
    }

    /// Read a record, `None` when the user has never been saved.
    pub fn load(&self, user_id: &str) -> Result<Option<UserRecord>> {
        let path = self.path_for(user_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read user record: {}", path.display()))?;
        let record: UserRecord = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse user record: {}", path.display()))?;
        anyhow::ensure!(
            record.session.user_id == user_id,
            "user record {} belongs to {:?}",
            path.display(),
            record.session.user_id
        );
        Ok(Some(record))
    }

    pub fn save(&self, session: &UserSession) -> Result<()> {
        let record = UserRecord {
            session: session.clone(),
            updated_at: Utc::now(),
        };
        let json =
            serde_json::to_string_pretty(&record).context("failed to serialize user record")?;

        let path = self.path_for(&session.user_id);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("failed to write user record: {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("failed to replace user record: {}", path.display()))?;
        Ok(())
    }

    /// User ids of every stored record, sorted.
    pub fn list_users(&self) -> Result<Vec<String>> {
        let mut users = Vec::new();
        for entry in std::fs::read_dir(&self.dir)
            .with_context(|| format!("failed to read directory: {}", self.dir.display()))?
        {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let content = std::fs::read_to_string(&path)?;
                match serde_json::from_str::<UserRecord>(&content) {
                    Ok(record) => users.push(record.session.user_id),
                    Err(e) => tracing::warn!("skipping {}: {e}", path.display()),
                }
            }
        }
        users.sort();
        Ok(users)
    }
}

/// Map a user id onto a safe file name; anything outside `[A-Za-z0-9_-]` is
/// percent-encoded.
fn file_stem(user_id: &str) -> String {
    let mut stem = String::with_capacity(user_id.len());
    for b in user_id.bytes() {
        if b.is_ascii_alphanumeric() || b == b'_' || b == b'-' {
            stem.push(b as char);
        } else {
            stem.push_str(&format!("%{b:02X}"));
        }
    }
    stem
}

#[async_trait]
impl UserRepository for JsonUserStore {
    async fn load_user(&self, user_id: &str) -> anyhow::Result<Option<UserSession>> {
        Ok(self.load(user_id)?.map(|r| r.session))
    }

    async fn persist_user(&self, session: &UserSession) -> anyhow::Result<()> {
        self.save(session)
    }
}
