use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::path::Path;

use defectline::db::Database;
use defectline::policy::can_comment;
use defectline::Actor;

use super::load_visible;

/// Record attachment metadata for a file. The file itself is not copied.
pub fn run(db: &Database, actor: &Actor, id: i64, file: &Path) -> Result<()> {
    let defect = load_visible(db, actor, id)?;
    if !can_comment(actor, &defect, Utc::now()) {
        bail!("Access denied: {}s cannot attach files", actor.role);
    }

    let original_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .context("Attachment path has no file name")?;
    let stored_name = format!("{}_{}_{}", id, Utc::now().format("%Y%m%d%H%M%S"), original_name);

    let attachment_id = db.add_attachment(id, &stored_name, original_name)?;
    println!("Attached {} to defect #{} (#{})", original_name, id, attachment_id);
    Ok(())
}
