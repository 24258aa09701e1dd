use clap::{Args, Parser, Subcommand};

use taskreport::{
    DateRange, ReportData, ReportEngine, ReportSnapshot, SnapshotKind, TeamReportData,
    WorkloadAnalysis,
};

#[derive(Parser)]
#[command(name = "taskreport", about = "Task and project reporting over a local warehouse")]
struct Cli {
    /// Database path (default: ~/.taskreport/taskreport.db)
    #[arg(long)]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load users, projects and tasks from a JSON export
    Import {
        /// Path to the JSON file
        file: String,
    },
    /// Generate a report
    Report {
        #[command(subcommand)]
        target: ReportTarget,
    },
    /// Estimate workload for a manager's team
    Workload {
        /// Manager user id
        manager_id: String,
        #[command(flatten)]
        range: RangeArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect saved reports
    Snapshot {
        #[command(subcommand)]
        action: SnapshotAction,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Clone)]
struct RangeArgs {
    /// Only tasks created on or after this date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<String>,
    /// Only tasks created on or before this date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<String>,
    /// Period shorthand instead of --from/--to (e.g. 2025-Q1, 2025-06, 30d, ytd)
    #[arg(long, conflicts_with_all = ["from", "to"])]
    period: Option<String>,
}

impl RangeArgs {
    fn resolve(&self, today: chrono::NaiveDate) -> taskreport::Result<DateRange> {
        match &self.period {
            Some(p) => DateRange::from_period(p, today),
            None => DateRange::parse(self.from.as_deref(), self.to.as_deref()),
        }
    }
}

#[derive(Args, Clone)]
struct ReportArgs {
    #[command(flatten)]
    range: RangeArgs,
    /// Output as JSON
    #[arg(long)]
    json: bool,
    /// Save the report as a snapshot
    #[arg(long)]
    save: bool,
}

#[derive(Subcommand)]
enum ReportTarget {
    /// Report for one user
    Personal {
        user_id: String,
        #[command(flatten)]
        args: ReportArgs,
    },
    /// Report for a manager's team
    Team {
        manager_id: String,
        #[command(flatten)]
        args: ReportArgs,
    },
    /// Report for a director's department
    Department {
        director_id: String,
        #[command(flatten)]
        args: ReportArgs,
    },
}

#[derive(Subcommand)]
enum SnapshotAction {
    /// List saved reports, newest first
    List {
        /// Only this kind: personal, team or department
        #[arg(long)]
        kind: Option<SnapshotKind>,
    },
    /// Show a saved report
    Show {
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let db = match &cli.db {
        Some(path) => taskreport::Database::open_at(path).await?,
        None => taskreport::Database::open().await?,
    };
    let engine = ReportEngine::new(db);

    match run(&engine, cli.command).await {
        Err(e) => match e.downcast_ref::<taskreport::Error>() {
            Some(err) if err.is_outward() => {
                eprintln!("{err}");
                std::process::exit(2);
            }
            _ => Err(e),
        },
        ok => ok,
    }
}

async fn run(engine: &ReportEngine, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Import { file } => {
            let json = std::fs::read_to_string(&file)
                .map_err(|e| anyhow::anyhow!("cannot read {file}: {e}"))?;
            let data = taskreport::Dataset::from_json(&json)?;
            let report = engine.import(data).await?;
            println!("Imported from {file}:");
            println!("  Departments: {}", report.departments);
            println!("  Teams:       {}", report.teams);
            println!("  Users:       {}", report.users);
            println!("  Projects:    {}", report.projects);
            println!("  Tasks:       {}", report.tasks);
        }
        Commands::Report { target } => {
            handle_report(engine, target).await?;
        }
        Commands::Workload {
            manager_id,
            range,
            json,
        } => {
            let range = range.resolve(engine.today())?;
            let (report, analysis) = engine.team_workload(&manager_id, range).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else {
                println!("Workload: {}", report.scope.name());
                print_workload(&analysis);
            }
        }
        Commands::Snapshot { action } => {
            handle_snapshot(engine, action).await?;
        }
        Commands::Config { action } => {
            handle_config(engine, action).await?;
        }
    }

    Ok(())
}

async fn handle_report(engine: &ReportEngine, target: ReportTarget) -> anyhow::Result<()> {
    let today = engine.today();
    match target {
        ReportTarget::Personal { user_id, args } => {
            let report = engine.personal_report(&user_id, args.range.resolve(today)?).await?;
            if args.save {
                let id = engine.save_snapshot(ReportSnapshot::personal(&report)?).await?;
                eprintln!("Saved as snapshot {id}");
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_personal(&report);
            }
        }
        ReportTarget::Team { manager_id, args } => {
            let report = engine.team_report(&manager_id, args.range.resolve(today)?).await?;
            emit_team(engine, &report, &args).await?;
        }
        ReportTarget::Department { director_id, args } => {
            let report = engine
                .department_report(&director_id, args.range.resolve(today)?)
                .await?;
            emit_team(engine, &report, &args).await?;
        }
    }
    Ok(())
}

async fn emit_team(
    engine: &ReportEngine,
    report: &TeamReportData,
    args: &ReportArgs,
) -> anyhow::Result<()> {
    if args.save {
        let id = engine
            .save_snapshot(ReportSnapshot::team(report, engine.today())?)
            .await?;
        eprintln!("Saved as snapshot {id}");
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print_team(report);
    }
    Ok(())
}

async fn handle_snapshot(engine: &ReportEngine, action: SnapshotAction) -> anyhow::Result<()> {
    match action {
        SnapshotAction::List { kind } => {
            let items = engine.list_snapshots(kind).await?;
            if items.is_empty() {
                println!("No saved reports.");
            }
            for s in items {
                println!(
                    "{:>5}  {:<10}  {}  {} ({})  saved {}",
                    s.id, s.kind, s.report_date, s.subject_name, s.subject_id, s.created_at
                );
            }
        }
        SnapshotAction::Show { id, json } => {
            let snapshot = engine
                .load_snapshot(id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("No snapshot with id {id}"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot.payload)?);
            } else if snapshot.kind == SnapshotKind::Personal {
                print_personal(&snapshot.personal_report()?);
            } else {
                print_team(&snapshot.team_report()?);
            }
        }
    }
    Ok(())
}

async fn handle_config(engine: &ReportEngine, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => match engine.config_get(&key).await? {
            Some(v) => println!("{key} = {v}"),
            None => println!("{key} is not set"),
        },
        ConfigAction::Set { key, value } => {
            engine.config_set(&key, &value).await?;
            println!("Config updated.");
        }
        ConfigAction::List => {
            let items = engine.config_list().await?;
            if items.is_empty() {
                println!("No configuration set.");
            } else {
                for (k, v) in items {
                    println!("{k} = {v}");
                }
            }
        }
    }
    Ok(())
}

fn fmt_days(avg: Option<f64>) -> String {
    avg.map(|d| format!("{d:.1} days"))
        .unwrap_or_else(|| "n/a".to_string())
}

fn print_personal(r: &ReportData) {
    println!("Report: {} ({}, {}) as of {}", r.user_name, r.user_id, r.role, r.report_date);
    if let Some(team) = &r.team_name {
        println!("  Team:        {team}");
    }
    println!("  Projects:    {}", r.total_projects);
    println!(
        "  Tasks:       {} total, {} completed ({:.1}%)",
        r.total_tasks, r.completed_tasks, r.completion_percentage
    );
    println!("  Overdue:     {} ({:.1}%)", r.overdue_tasks, r.overdue_percentage);
    println!("  Late:        {}", r.late_completions);
    println!("  Avg duration: {}", fmt_days(r.average_task_duration));
    for p in &r.projects_breakdown {
        let projected = match p.projected_completion_date {
            taskreport::Projection::Date(d) => d.to_string(),
            taskreport::Projection::Completed => "Completed".to_string(),
            taskreport::Projection::Unknown => "unknown".to_string(),
        };
        println!(
            "  - {}: {}/{} done ({:.1}%), {} overdue, projected {}",
            p.project_name, p.completed_tasks, p.total_tasks, p.completion_percentage,
            p.overdue_tasks, projected
        );
    }
}

fn print_team(r: &TeamReportData) {
    println!("Report: {} ({})", r.scope.name(), r.scope.id());
    println!("  Members:     {}", r.member_reports.len());
    println!(
        "  Tasks:       {} total, {} completed ({:.1}%)",
        r.total_team_tasks, r.completed_team_tasks, r.team_completion_percentage
    );
    println!(
        "  Overdue:     {} ({:.1}%)",
        r.overdue_team_tasks, r.team_overdue_percentage
    );
    println!("  Avg duration: {}", fmt_days(r.team_average_task_duration));
    println!("  Projects:");
    for p in &r.team_project_stats {
        println!(
            "    - {}: {}/{} done ({:.1}%), {} member(s)",
            p.project_name,
            p.completed_tasks,
            p.total_tasks,
            p.completion_percentage,
            p.member_involvement.len()
        );
    }
    for group in r.members_by_team() {
        println!("  {}:", group.team_name);
        for m in group.members {
            println!(
                "    - {}: {} tasks, {:.1}% complete, {} overdue",
                m.user_name, m.total_tasks, m.completion_percentage, m.overdue_tasks
            );
        }
    }
}

fn print_workload(a: &WorkloadAnalysis) {
    for m in &a.members {
        println!(
            "  {:<20} {:>5.1}h  score {:>5.1}  {}",
            m.member_name, m.estimated_weekly_hours, m.workload_score, m.availability_status
        );
        for c in &m.conflicts {
            println!("      ! {c}");
        }
    }
    let i = &a.insights;
    println!(
        "  Overloaded: {}  Busy: {}  Moderate: {}  Available: {}",
        i.overloaded_members, i.busy_members, i.moderate_members, i.available_members
    );
    for b in &i.bottleneck_projects {
        println!("  Single-owner project: {} ({})", b.project_name, b.member_name);
    }
    for note in &i.notes {
        println!("  - {note}");
    }
}
