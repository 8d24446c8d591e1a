use anyhow::Result;

use defectline::db::Database;
use defectline::models::DefectItem;
use defectline::paginate::PageResult;
use defectline::{list_defects, Actor, ListQuery};

use super::truncate;

pub fn run(db: &Database, actor: &Actor, query: &ListQuery, json: bool) -> Result<PageResult<DefectItem>> {
    let page = list_defects(db, actor, query)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(page);
    }

    if page.items.is_empty() {
        println!("No defects found.");
        return Ok(page);
    }

    for item in &page.items {
        let status_display = format!("[{}]", item.defect.status);
        let due = item
            .defect
            .due_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        let overdue = if item.is_overdue { " OVERDUE" } else { "" };
        println!(
            "#{:<4} {:13} {:<40} {:6} {:<16} due {}{}",
            item.defect.id,
            status_display,
            truncate(&item.defect.title, 40),
            item.defect.priority,
            truncate(&item.project_name, 16),
            due,
            overdue
        );
    }
    println!(
        "\nPage {} of {} ({} defects)",
        page.current_page,
        page.pages.max(1),
        page.total
    );

    Ok(page)
}
