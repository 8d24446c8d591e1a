use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};

use defectline::db::Database;
use defectline::filter::Predicate;
use defectline::models::{Comment, DefectItem};
use defectline::policy::can_export;
use defectline::sort::SortSpec;
use defectline::store::DefectStore;
use defectline::Actor;

#[derive(Debug, Serialize)]
pub struct ExportedDefect {
    #[serde(flatten)]
    pub item: DefectItem,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Serialize)]
pub struct ExportData {
    pub version: i32,
    pub exported_at: String,
    pub defects: Vec<ExportedDefect>,
}

pub fn collect(db: &Database, actor: &Actor) -> Result<ExportData> {
    if !can_export(actor) {
        bail!("Access denied: only managers can export defects");
    }

    let now = Utc::now();
    let (rows, total) = db.query(&Predicate::all(), SortSpec::default(), 0, u64::MAX, now)?;
    let defects = rows
        .into_iter()
        .map(|row| {
            let comments = db.get_comments(row.defect.id)?;
            Ok(ExportedDefect {
                item: row.into_item(now),
                comments,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::info!(total, user_id = actor.user_id, "exported defects");
    Ok(ExportData {
        version: 1,
        exported_at: now.to_rfc3339(),
        defects,
    })
}

pub fn run(db: &Database, actor: &Actor, output_path: Option<&str>) -> Result<()> {
    let data = collect(db, actor)?;
    let json = serde_json::to_string_pretty(&data)?;

    match output_path {
        Some(path) => {
            fs::write(path, json).context("Failed to write export file")?;
            eprintln!("Exported {} defects to {}", data.defects.len(), path);
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", json)?;
        }
    }
    Ok(())
}
