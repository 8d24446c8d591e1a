use anyhow::{bail, Result};

use defectline::db::Database;
use defectline::models::{Role, User};
use defectline::Actor;

/// The first user may be added by anyone; after that only managers add users.
pub fn add(
    db: &Database,
    actor: Option<&Actor>,
    email: &str,
    first_name: &str,
    last_name: &str,
    role: &str,
) -> Result<i64> {
    let bootstrapping = db.list_users(None)?.is_empty();
    if !bootstrapping && !matches!(actor, Some(a) if a.role == Role::Manager) {
        bail!("Access denied: only managers can add users");
    }

    let role: Role = role.parse()?;
    let id = db.create_user(email.trim(), first_name.trim(), last_name.trim(), role)?;
    println!("Created user #{} ({})", id, role);
    Ok(id)
}

pub fn list(db: &Database, role: Option<&str>, json: bool) -> Result<Vec<User>> {
    let role = role.map(str::parse::<Role>).transpose()?;
    let users = db.list_users(role)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&users)?);
        return Ok(users);
    }

    if users.is_empty() {
        println!("No users found.");
        return Ok(users);
    }

    for u in &users {
        println!("#{:<4} {:<9} {:<25} {}", u.id, u.role, super::truncate(&u.full_name(), 25), u.email);
    }
    Ok(users)
}
