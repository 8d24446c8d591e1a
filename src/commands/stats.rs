use anyhow::Result;

use defectline::db::Database;
use defectline::stats::Statistics;
use defectline::{get_statistics, Actor};

pub fn run(db: &Database, actor: &Actor, json: bool) -> Result<Statistics> {
    let stats = get_statistics(db, actor)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(stats);
    }

    let s = &stats.statistics;
    println!("Defects:       {}", s.total_defects);
    println!("In progress:   {}", s.in_progress);
    println!("Overdue:       {}", s.overdue);
    println!("In review:     {}", s.in_review);
    println!("High priority: {}", s.high_priority);
    println!("Closed:        {}", s.closed);

    if !stats.projects_stats.is_empty() {
        println!("\nBy project:");
        for p in &stats.projects_stats {
            println!(
                "  #{:<4} {:<30} total {:<4} in progress {:<4} closed {}",
                p.project_id,
                super::truncate(&p.project_name, 30),
                p.total_defects,
                p.in_progress,
                p.closed
            );
        }
    }

    Ok(stats)
}
