use anyhow::{bail, Result};
use chrono::Utc;
use serde_json::json;

use defectline::db::Database;
use defectline::Actor;

use super::load_visible;

pub fn run(db: &Database, actor: &Actor, id: i64, json: bool) -> Result<()> {
    load_visible(db, actor, id)?;
    let row = match db.get_defect_row(id)? {
        Some(r) => r,
        None => bail!("Defect #{} not found", id),
    };
    let comments = db.get_comments(id)?;
    let attachments = db.get_attachments(id)?;
    let item = row.into_item(Utc::now());

    if json {
        let mut value = serde_json::to_value(&item)?;
        value["comments"] = json!(comments);
        value["attachments"] = json!(attachments);
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let defect = &item.defect;
    println!("Defect #{}: {}", defect.id, defect.title);
    println!("Project: {}", item.project_name);
    println!("Status: {}", defect.status);
    println!("Priority: {}", defect.priority);
    println!("Creator: {}", item.creator);
    println!(
        "Assignee: {}",
        item.assignee.as_deref().unwrap_or("(unassigned)")
    );
    if let Some(due) = defect.due_date {
        let overdue = if item.is_overdue { " (overdue)" } else { "" };
        println!("Due: {}{}", due.format("%Y-%m-%d"), overdue);
    }
    println!("Created: {}", defect.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Updated: {}", defect.updated_at.format("%Y-%m-%d %H:%M:%S"));

    println!("\nDescription:");
    for line in defect.description.lines() {
        println!("  {}", line);
    }

    if !comments.is_empty() {
        println!("\nComments:");
        for comment in comments {
            println!(
                "  [{}] {} ({}): {}",
                comment.created_at.format("%Y-%m-%d %H:%M"),
                comment.author,
                comment.author_role,
                comment.text
            );
        }
    }

    if !attachments.is_empty() {
        println!("\nAttachments:");
        for attachment in attachments {
            println!("  #{} {}", attachment.id, attachment.original_name);
        }
    }

    Ok(())
}
