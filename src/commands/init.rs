use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use defectline::db::Database;

pub const DATA_DIR: &str = ".defectline";
pub const DB_FILE: &str = "defects.db";

pub fn run(path: &Path) -> Result<()> {
    let data_dir = path.join(DATA_DIR);
    let db_path = data_dir.join(DB_FILE);

    if db_path.exists() {
        println!("Already initialized at {}", path.display());
        return Ok(());
    }

    fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;
    Database::open(&db_path).context("Failed to create database")?;
    tracing::info!(path = %db_path.display(), "initialized defect database");

    println!("Created {}", data_dir.display());
    println!("\nNext steps:");
    println!("  defectline user add boss@site.example Anna Smirnova --role manager");
    println!("  defectline project add \"Tower A\" --as 1");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_run_fresh_init() {
        let dir = tempdir().unwrap();
        let result = run(dir.path());
        assert!(result.is_ok());

        assert!(dir.path().join(DATA_DIR).exists());
        assert!(dir.path().join(DATA_DIR).join(DB_FILE).exists());
    }

    #[test]
    fn test_run_twice_is_noop() {
        let dir = tempdir().unwrap();
        run(dir.path()).unwrap();

        let db = Database::open(&dir.path().join(DATA_DIR).join(DB_FILE)).unwrap();
        db.create_user("a@b.c", "A", "B", defectline::models::Role::Manager)
            .unwrap();
        drop(db);

        run(dir.path()).unwrap();
        let db = Database::open(&dir.path().join(DATA_DIR).join(DB_FILE)).unwrap();
        assert_eq!(db.list_users(None).unwrap().len(), 1);
    }
}
