//! adaptiq-store: File-backed persistence.
//!
//! User records are pretty JSON files, one per user. Difficulty changes go to
//! an append-only JSON Lines journal that is replayed over the corpus at load.

pub mod journal;
pub mod questions;
pub mod users;

pub use journal::{DifficultyJournal, JournalRecord, ReplayStats};
pub use questions::FileQuestionRepository;
pub use users::{JsonUserStore, UserRecord};
