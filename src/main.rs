mod commands;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use defectline::db::Database;
use defectline::filter::FilterParams;
use defectline::{Actor, ListQuery};

use commands::init::{DATA_DIR, DB_FILE};

#[derive(Parser)]
#[command(name = "defectline")]
#[command(about = "Defect tracking for construction projects")]
#[command(version)]
struct Cli {
    /// Path to the defect database (defaults to the nearest .defectline/defects.db)
    #[arg(long, global = true, env = "DEFECTLINE_DB")]
    db: Option<PathBuf>,

    /// User id to act as
    #[arg(long = "as", global = true, env = "DEFECTLINE_USER")]
    as_user: Option<i64>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true, env = "DEFECTLINE_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize defectline in the current directory
    Init,

    /// Manage users
    User {
        #[command(subcommand)]
        action: UserCommands,
    },

    /// Manage projects
    Project {
        #[command(subcommand)]
        action: ProjectCommands,
    },

    /// Report a new defect
    Create {
        /// Defect title
        title: String,
        /// What was found and where
        #[arg(short, long)]
        description: String,
        /// Project ID
        #[arg(long)]
        project: i64,
        /// Priority (low, medium, high)
        #[arg(short, long, default_value = "medium")]
        priority: String,
        /// Assignee user ID
        #[arg(short, long)]
        assignee: Option<i64>,
        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        due: Option<String>,
    },

    /// List defects visible to the acting user
    List {
        /// Filter by status (new, in_progress, review, closed)
        #[arg(short, long)]
        status: Option<String>,
        /// Filter by priority
        #[arg(short, long)]
        priority: Option<String>,
        /// Filter by project ID
        #[arg(long)]
        project: Option<String>,
        /// Filter by assignee user ID
        #[arg(short, long)]
        assignee: Option<String>,
        /// Case-insensitive search in title and description
        #[arg(short = 'q', long)]
        search: Option<String>,
        /// Only overdue defects (true/false; false applies no filter)
        #[arg(long)]
        overdue: Option<String>,
        /// Sort key (created_at, updated_at, due_date, priority, status, title)
        #[arg(long)]
        sort_by: Option<String>,
        /// Sort order (asc, desc)
        #[arg(long)]
        sort_order: Option<String>,
        #[arg(long)]
        page: Option<i64>,
        #[arg(long)]
        per_page: Option<i64>,
        /// Print the page as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show defect details
    Show {
        /// Defect ID
        id: i64,
        #[arg(long)]
        json: bool,
    },

    /// Update a defect
    Update {
        /// Defect ID
        id: i64,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        priority: Option<String>,
        #[arg(short, long)]
        status: Option<String>,
        /// New assignee user ID
        #[arg(short, long, conflicts_with = "unassign")]
        assignee: Option<i64>,
        /// Remove the assignee
        #[arg(long)]
        unassign: bool,
        /// New due date
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        /// Remove the due date
        #[arg(long)]
        clear_due: bool,
    },

    /// Delete a defect
    Delete {
        /// Defect ID
        id: i64,
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Add a comment to a defect
    Comment {
        /// Defect ID
        id: i64,
        /// Comment text
        text: String,
    },

    /// Record an attachment for a defect
    Attach {
        /// Defect ID
        id: i64,
        /// File to attach
        file: PathBuf,
    },

    /// Dashboard statistics for the acting user
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Export all defects as JSON
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Add a user
    Add {
        email: String,
        first_name: String,
        last_name: String,
        /// Role (manager, engineer, observer)
        #[arg(short, long, default_value = "engineer")]
        role: String,
    },
    /// List users
    List {
        /// Only users with this role
        #[arg(short, long)]
        role: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// Add a project
    Add {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        location: Option<String>,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
        /// Create the project as inactive
        #[arg(long)]
        inactive: bool,
    },
    /// List projects
    List {
        /// Include inactive projects
        #[arg(short, long)]
        all: bool,
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn find_data_dir() -> Result<PathBuf> {
    let mut current = env::current_dir()?;

    loop {
        let candidate = current.join(DATA_DIR);
        if candidate.is_dir() {
            return Ok(candidate);
        }

        if !current.pop() {
            bail!("Not a defectline directory (or any parent). Run 'defectline init' first.");
        }
    }
}

fn get_db(path: Option<&PathBuf>) -> Result<Database> {
    let db_path = match path {
        Some(p) => p.clone(),
        None => find_data_dir()?.join(DB_FILE),
    };
    Database::open(&db_path).context("Failed to open database")
}

fn get_actor(db: &Database, user_id: Option<i64>) -> Result<Actor> {
    let Some(id) = user_id else {
        bail!("No acting user. Pass --as <user-id> or set DEFECTLINE_USER.");
    };
    let user = match db.get_user(id)? {
        Some(u) => u,
        None => bail!("User #{} not found", id),
    };
    Ok(Actor::for_user(&user)?)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);
    dispatch(cli.db.as_ref(), cli.as_user, cli.command)
}

fn dispatch(db_path: Option<&PathBuf>, as_user: Option<i64>, command: Commands) -> Result<()> {
    match command {
        Commands::Init => {
            let cwd = env::current_dir()?;
            commands::init::run(&cwd)
        }

        Commands::User { action } => match action {
            UserCommands::Add {
                email,
                first_name,
                last_name,
                role,
            } => {
                let db = &get_db(db_path)?;
                let actor = as_user.map(|id| get_actor(db, Some(id))).transpose()?;
                commands::user::add(db, actor.as_ref(), &email, &first_name, &last_name, &role)?;
                Ok(())
            }
            UserCommands::List { role, json } => {
                let db = &get_db(db_path)?;
                commands::user::list(db, role.as_deref(), json)?;
                Ok(())
            }
        },

        Commands::Project { action } => match action {
            ProjectCommands::Add {
                name,
                description,
                location,
                start,
                end,
                inactive,
            } => {
                let db = &get_db(db_path)?;
                let actor = get_actor(db, as_user)?;
                let args = commands::project::AddArgs {
                    name: &name,
                    description: description.as_deref(),
                    location: location.as_deref(),
                    start: start.as_deref(),
                    end: end.as_deref(),
                    inactive,
                };
                commands::project::add(db, &actor, &args)?;
                Ok(())
            }
            ProjectCommands::List { all, json } => {
                let db = &get_db(db_path)?;
                commands::project::list(db, all, json)?;
                Ok(())
            }
        },

        Commands::Create {
            title,
            description,
            project,
            priority,
            assignee,
            due,
        } => {
            let db = &get_db(db_path)?;
            let actor = get_actor(db, as_user)?;
            let args = commands::create::CreateArgs {
                title: &title,
                description: &description,
                priority: &priority,
                project_id: project,
                assignee_id: assignee,
                due: due.as_deref(),
            };
            commands::create::run(db, &actor, &args)?;
            Ok(())
        }

        Commands::List {
            status,
            priority,
            project,
            assignee,
            search,
            overdue,
            sort_by,
            sort_order,
            page,
            per_page,
            json,
        } => {
            let db = &get_db(db_path)?;
            let actor = get_actor(db, as_user)?;
            let query = ListQuery {
                filters: FilterParams {
                    status,
                    priority,
                    project_id: project,
                    assignee_id: assignee,
                    search,
                    overdue,
                },
                sort_by,
                sort_order,
                page,
                per_page,
            };
            commands::list::run(db, &actor, &query, json)?;
            Ok(())
        }

        Commands::Show { id, json } => {
            let db = &get_db(db_path)?;
            let actor = get_actor(db, as_user)?;
            commands::show::run(db, &actor, id, json)
        }

        Commands::Update {
            id,
            title,
            description,
            priority,
            status,
            assignee,
            unassign,
            due,
            clear_due,
        } => {
            let db = &get_db(db_path)?;
            let actor = get_actor(db, as_user)?;
            let args = commands::update::UpdateArgs {
                title: title.as_deref(),
                description: description.as_deref(),
                priority: priority.as_deref(),
                status: status.as_deref(),
                assignee_id: assignee,
                unassign,
                due: due.as_deref(),
                clear_due,
            };
            commands::update::run(db, &actor, id, &args)
        }

        Commands::Delete { id, force } => {
            let db = &get_db(db_path)?;
            let actor = get_actor(db, as_user)?;
            commands::delete::run(db, &actor, id, force)
        }

        Commands::Comment { id, text } => {
            let db = &get_db(db_path)?;
            let actor = get_actor(db, as_user)?;
            commands::comment::run(db, &actor, id, &text)
        }

        Commands::Attach { id, file } => {
            let db = &get_db(db_path)?;
            let actor = get_actor(db, as_user)?;
            commands::attach::run(db, &actor, id, &file)
        }

        Commands::Stats { json } => {
            let db = &get_db(db_path)?;
            let actor = get_actor(db, as_user)?;
            commands::stats::run(db, &actor, json)?;
            Ok(())
        }

        Commands::Export { output } => {
            let db = &get_db(db_path)?;
            let actor = get_actor(db, as_user)?;
            commands::export::run(db, &actor, output.as_deref())
        }
    }
}
