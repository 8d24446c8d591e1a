use anyhow::{bail, Result};

use defectline::db::Database;
use defectline::models::{parse_due_date, NewDefect, Priority};
use defectline::policy::can_create;
use defectline::Actor;

pub struct CreateArgs<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub priority: &'a str,
    pub project_id: i64,
    pub assignee_id: Option<i64>,
    pub due: Option<&'a str>,
}

pub fn run(db: &Database, actor: &Actor, args: &CreateArgs<'_>) -> Result<i64> {
    if !can_create(actor) {
        bail!("Access denied: {}s cannot create defects", actor.role);
    }

    let priority: Priority = args.priority.parse()?;
    let due_date = args.due.map(parse_due_date).transpose()?;

    let id = db.create_defect(&NewDefect {
        title: args.title.to_string(),
        description: args.description.to_string(),
        priority,
        project_id: args.project_id,
        creator_id: actor.user_id,
        assignee_id: args.assignee_id,
        due_date,
    })?;
    println!("Created defect #{}", id);
    Ok(id)
}
