use anyhow::{bail, Result};
use chrono::Utc;

use defectline::db::Database;
use defectline::policy::can_comment;
use defectline::Actor;

use super::load_visible;

pub fn run(db: &Database, actor: &Actor, id: i64, text: &str) -> Result<()> {
    let defect = load_visible(db, actor, id)?;
    if !can_comment(actor, &defect, Utc::now()) {
        bail!("Access denied: {}s cannot comment on defects", actor.role);
    }

    let comment_id = db.add_comment(id, actor.user_id, text)?;
    println!("Added comment #{} to defect #{}", comment_id, id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{assigned_defect, team};
    use defectline::models::DefectUpdate;
    use defectline::models::Status;

    #[test]
    fn test_assignee_comments() {
        let t = team();
        let id = assigned_defect(&t, "Crack");
        run(&t.db, &t.engineer, id, "Measured width: 3mm").unwrap();

        let comments = t.db.get_comments(id).unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].author_id, t.engineer.user_id);
    }

    #[test]
    fn test_observer_cannot_comment_even_when_visible() {
        let t = team();
        let id = assigned_defect(&t, "Crack");
        let close = DefectUpdate {
            status: Some(Status::Closed),
            ..DefectUpdate::default()
        };
        t.db.update_defect(id, &close).unwrap();

        let err = run(&t.db, &t.observer, id, "Looks fine").unwrap_err();
        assert!(err.to_string().contains("cannot comment"));
    }

    #[test]
    fn test_empty_comment_rejected() {
        let t = team();
        let id = assigned_defect(&t, "Crack");
        assert!(run(&t.db, &t.manager, id, "   ").is_err());
    }

    #[test]
    fn test_hidden_defect_denied() {
        let t = team();
        let id = assigned_defect(&t, "Crack");
        let err = run(&t.db, &t.other_engineer, id, "hello").unwrap_err();
        assert!(err.to_string().contains("Access denied"));
    }
}
