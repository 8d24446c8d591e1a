use anyhow::{bail, Result};
use std::io::{self, Write};

use defectline::db::Database;
use defectline::policy::can_delete;
use defectline::Actor;

use super::load_visible;

pub fn run(db: &Database, actor: &Actor, id: i64, force: bool) -> Result<()> {
    if !can_delete(actor) {
        bail!("Access denied: only managers can delete defects");
    }

    let defect = load_visible(db, actor, id)?;

    if !force {
        print!("Delete defect #{} \"{}\"? [y/N] ", id, defect.title);
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    if db.delete_defect(id)? {
        tracing::info!(id, user_id = actor.user_id, "deleted defect");
        println!("Deleted defect #{}", id);
    } else {
        bail!("Failed to delete defect #{}", id);
    }

    Ok(())
}

/// Internal function for testing without stdin interaction
#[cfg(test)]
pub fn run_force(db: &Database, actor: &Actor, id: i64) -> Result<()> {
    run(db, actor, id, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{assigned_defect, team};
    use proptest::prelude::*;

    // ==================== Unit Tests ====================

    #[test]
    fn test_manager_deletes_defect() {
        let t = team();
        let id = assigned_defect(&t, "To delete");

        run_force(&t.db, &t.manager, id).unwrap();
        assert!(t.db.get_defect(id).unwrap().is_none());
    }

    #[test]
    fn test_engineer_cannot_delete() {
        let t = team();
        let id = assigned_defect(&t, "Keep");

        let err = run_force(&t.db, &t.engineer, id).unwrap_err();
        assert!(err.to_string().contains("Access denied"));
        assert!(t.db.get_defect(id).unwrap().is_some());
    }

    #[test]
    fn test_delete_nonexistent_defect() {
        let t = team();
        let err = run_force(&t.db, &t.manager, 99999).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_delete_cascades_comments_and_attachments() {
        let t = team();
        let id = assigned_defect(&t, "Cascade");
        t.db.add_comment(id, t.engineer.user_id, "Comment 1").unwrap();
        t.db.add_comment(id, t.manager.user_id, "Comment 2").unwrap();
        t.db.add_attachment(id, "f1.jpg", "site.jpg").unwrap();

        run_force(&t.db, &t.manager, id).unwrap();

        assert!(t.db.get_comments(id).unwrap().is_empty());
        assert!(t.db.get_attachments(id).unwrap().is_empty());
    }

    #[test]
    fn test_delete_leaves_other_defects() {
        let t = team();
        let a = assigned_defect(&t, "A");
        let b = assigned_defect(&t, "B");

        run_force(&t.db, &t.manager, a).unwrap();
        assert!(t.db.get_defect(b).unwrap().is_some());
    }

    // ==================== Property-Based Tests ====================

    proptest! {
        #[test]
        fn prop_delete_removes_all_comments(count in 1usize..6) {
            let t = team();
            let id = assigned_defect(&t, "Many comments");
            for i in 0..count {
                t.db.add_comment(id, t.engineer.user_id, &format!("note {}", i)).unwrap();
            }
            run_force(&t.db, &t.manager, id).unwrap();
            prop_assert!(t.db.get_comments(id).unwrap().is_empty());
        }
    }
}
