//! The `adaptiq stats` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use adaptiq_providers::load_config_from;
use adaptiq_store::JsonUserStore;

use super::{resolve_data_dir, USERS_DIR};

pub fn execute(user: String, data_dir: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let users_dir = resolve_data_dir(data_dir, &config).join(USERS_DIR);
    if !users_dir.is_dir() {
        anyhow::bail!("user not found: {user} (no user records in {})", users_dir.display());
    }

    let store = JsonUserStore::new(&users_dir)?;
    let Some(record) = store.load(&user)? else {
        anyhow::bail!("user not found: {user}");
    };
    let session = &record.session;
    let stats = session.stats();

    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);
    let rows: Vec<(&str, String)> = vec![
        ("User", session.user_id.clone()),
        ("Grade", session.grade.to_string()),
        ("Exam", session.preferred_exam.clone()),
        ("Answered", stats.answered_count.to_string()),
        ("Correct", session.correct_count.to_string()),
        ("Accuracy", format!("{:.1}%", stats.accuracy * 100.0)),
        (
            "Last difficulty",
            format!("{:.1}% correct", session.last_question_difficulty),
        ),
        (
            "Updated",
            record.updated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ),
    ];
    for (field, value) in rows {
        table.add_row(vec![Cell::new(field), Cell::new(value)]);
    }
    println!("{table}");

    Ok(())
}
