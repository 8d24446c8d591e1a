use anyhow::{bail, Result};

use defectline::db::Database;
use defectline::models::{parse_due_date, DefectUpdate, Priority, Status};
use defectline::policy::can_update;
use defectline::Actor;

use super::load_visible;

#[derive(Default)]
pub struct UpdateArgs<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub priority: Option<&'a str>,
    pub status: Option<&'a str>,
    pub assignee_id: Option<i64>,
    pub unassign: bool,
    pub due: Option<&'a str>,
    pub clear_due: bool,
}

pub fn run(db: &Database, actor: &Actor, id: i64, args: &UpdateArgs<'_>) -> Result<()> {
    let update = DefectUpdate {
        title: args.title.map(str::to_string),
        description: args.description.map(str::to_string),
        priority: args.priority.map(str::parse::<Priority>).transpose()?,
        status: args.status.map(str::parse::<Status>).transpose()?,
        assignee_id: if args.unassign {
            Some(None)
        } else {
            args.assignee_id.map(Some)
        },
        due_date: if args.clear_due {
            Some(None)
        } else {
            args.due.map(parse_due_date).transpose()?.map(Some)
        },
    };

    if update.is_empty() {
        bail!("Nothing to update. Use --title, --description, --priority, --status, --assignee or --due");
    }

    let defect = load_visible(db, actor, id)?;
    if !can_update(actor, &defect) {
        bail!("Access denied: only a manager or the assignee may update defect #{}", id);
    }

    if db.update_defect(id, &update)? {
        println!("Updated defect #{}", id);
    } else {
        bail!("Defect #{} not found", id);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{assigned_defect, team};
    use proptest::prelude::*;

    // ==================== Unit Tests ====================

    #[test]
    fn test_assignee_updates_status() {
        let t = team();
        let id = assigned_defect(&t, "Crack");

        let args = UpdateArgs {
            status: Some("in_progress"),
            ..UpdateArgs::default()
        };
        run(&t.db, &t.engineer, id, &args).unwrap();

        let defect = t.db.get_defect(id).unwrap().unwrap();
        assert_eq!(defect.status, Status::InProgress);
        assert!(defect.updated_at >= defect.created_at);
    }

    #[test]
    fn test_update_nothing_fails() {
        let t = team();
        let id = assigned_defect(&t, "Crack");
        let err = run(&t.db, &t.manager, id, &UpdateArgs::default()).unwrap_err();
        assert!(err.to_string().contains("Nothing to update"));
    }

    #[test]
    fn test_creator_without_assignment_cannot_update() {
        let t = team();
        let id = t
            .db
            .create_defect(&defectline::models::NewDefect {
                title: "Own".to_string(),
                description: "Raised by engineer".to_string(),
                priority: Priority::Low,
                project_id: t.project,
                creator_id: t.engineer.user_id,
                assignee_id: Some(t.other_engineer.user_id),
                due_date: None,
            })
            .unwrap();

        let args = UpdateArgs {
            title: Some("Renamed"),
            ..UpdateArgs::default()
        };
        let err = run(&t.db, &t.engineer, id, &args).unwrap_err();
        assert!(err.to_string().contains("Access denied"));
        assert!(run(&t.db, &t.other_engineer, id, &args).is_ok());
    }

    #[test]
    fn test_hidden_defect_denied() {
        let t = team();
        let id = assigned_defect(&t, "Crack");
        let args = UpdateArgs {
            priority: Some("low"),
            ..UpdateArgs::default()
        };
        let err = run(&t.db, &t.other_engineer, id, &args).unwrap_err();
        assert!(err.to_string().contains("Access denied"));
    }

    #[test]
    fn test_unassign_and_clear_due() {
        let t = team();
        let id = assigned_defect(&t, "Crack");
        let args = UpdateArgs {
            due: Some("2031-05-05"),
            ..UpdateArgs::default()
        };
        run(&t.db, &t.manager, id, &args).unwrap();
        assert!(t.db.get_defect(id).unwrap().unwrap().due_date.is_some());

        let args = UpdateArgs {
            unassign: true,
            clear_due: true,
            ..UpdateArgs::default()
        };
        run(&t.db, &t.manager, id, &args).unwrap();
        let defect = t.db.get_defect(id).unwrap().unwrap();
        assert!(defect.assignee_id.is_none());
        assert!(defect.due_date.is_none());
    }

    #[test]
    fn test_update_invalid_status() {
        let t = team();
        let id = assigned_defect(&t, "Crack");
        let args = UpdateArgs {
            status: Some("done"),
            ..UpdateArgs::default()
        };
        let err = run(&t.db, &t.manager, id, &args).unwrap_err();
        assert!(err.to_string().contains("invalid status"));
    }

    #[test]
    fn test_update_nonexistent() {
        let t = team();
        let args = UpdateArgs {
            title: Some("x"),
            ..UpdateArgs::default()
        };
        let err = run(&t.db, &t.manager, 99999, &args).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    // ==================== Property-Based Tests ====================

    proptest! {
        #[test]
        fn prop_update_priority_valid(priority in "low|medium|high") {
            let t = team();
            let id = assigned_defect(&t, "Crack");
            let args = UpdateArgs { priority: Some(&priority), ..UpdateArgs::default() };
            prop_assert!(run(&t.db, &t.engineer, id, &args).is_ok());

            let defect = t.db.get_defect(id).unwrap().unwrap();
            prop_assert_eq!(defect.priority.as_str(), priority.as_str());
        }

        #[test]
        fn prop_update_priority_invalid(
            priority in "[a-zA-Z]{1,10}"
                .prop_filter("Exclude valid priorities", |s| {
                    !["low", "medium", "high"].contains(&s.as_str())
                })
        ) {
            let t = team();
            let id = assigned_defect(&t, "Crack");
            let args = UpdateArgs { priority: Some(&priority), ..UpdateArgs::default() };
            prop_assert!(run(&t.db, &t.manager, id, &args).is_err());
        }
    }
}
