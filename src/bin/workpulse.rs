use clap::{Args, Parser, Subcommand};

use workpulse::date_util::{parse_timestamp, yesterday_bounds};
use workpulse::{PoolConfig, ReportParams, WorkPulse};

#[derive(Parser)]
#[command(name = "workpulse", about = "Employee and project performance reports")]
struct Cli {
    /// Database path (default: ~/.workpulse/workpulse.db)
    #[arg(long)]
    db: Option<String>,

    /// Number of pooled database connections
    #[arg(long, default_value = "4")]
    pool_size: usize,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a performance report
    Report {
        #[command(subcommand)]
        target: ReportTarget,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show store status
    Status,
}

#[derive(Args)]
struct ReportArgs {
    /// Organization ID (default: config value `organization_id`)
    #[arg(long)]
    org: Option<String>,
    /// Measure windows from this instant instead of now
    /// (YYYY-MM-DD, "YYYY-MM-DD HH:MM:SS" UTC, or RFC 3339).
    /// Weekly points have no upper bound, so completions after this
    /// instant still count; daily figures stop at its midnight.
    #[arg(long)]
    as_of: Option<String>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum ReportTarget {
    /// Points per employee over the trailing 7 days
    Weekly {
        #[command(flatten)]
        args: ReportArgs,
    },
    /// Points and completed tasks per employee for yesterday
    Daily {
        #[command(flatten)]
        args: ReportArgs,
    },
    /// Point totals per active project
    Projects {
        #[command(flatten)]
        args: ReportArgs,
    },
    /// Ranked contributors per project
    Top {
        #[command(flatten)]
        args: ReportArgs,
        /// Keep only the first N per project
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Weekly and daily stats side by side
    Leaderboard {
        #[command(flatten)]
        args: ReportArgs,
    },
    /// Project totals with each project's leader
    Board {
        #[command(flatten)]
        args: ReportArgs,
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

    let config = pool_config(&cli);
    let pool = match &cli.db {
        Some(path) => workpulse::Pool::open_at(path, config).await?,
        None => workpulse::Pool::open_with(config).await?,
    };
    let wp = WorkPulse::new(pool);

    match cli.command {
        Commands::Report { target } => handle_report(&wp, target).await?,
        Commands::Config { action } => handle_config(&wp, action).await?,
        Commands::Status => print_status(&wp).await?,
    }

    Ok(())
}

fn pool_config(cli: &Cli) -> PoolConfig {
    PoolConfig {
        size: cli.pool_size,
        ..PoolConfig::default()
    }
}

async fn report_params(wp: &WorkPulse, args: &ReportArgs) -> anyhow::Result<ReportParams> {
    let org = wp.resolve_organization(args.org.as_deref()).await?;
    let params = match args.as_of.as_deref() {
        Some(ts) => ReportParams::new(org, parse_timestamp(ts)?),
        None => ReportParams::now(org),
    };
    Ok(params)
}

async fn handle_report(wp: &WorkPulse, target: ReportTarget) -> anyhow::Result<()> {
    match target {
        ReportTarget::Weekly { args } => {
            let params = report_params(wp, &args).await?;
            let rows = wp.weekly(&params).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!("Weekly points ({}, 7 days to {})", params.organization_id, params.as_of);
                for r in &rows {
                    println!("  {:<24} {:>8.2}", r.employee_id, r.weekly_points);
                }
            }
        }
        ReportTarget::Daily { args } => {
            let params = report_params(wp, &args).await?;
            let rows = wp.daily(&params).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                let (start, _) = yesterday_bounds(params.as_of);
                println!(
                    "Yesterday ({}, {})",
                    params.organization_id,
                    start.format("%Y-%m-%d")
                );
                for r in &rows {
                    println!(
                        "  {:<24} {:>8.2} pts  {:>3} tasks",
                        r.employee_id, r.yesterday_points, r.yesterday_task_count
                    );
                }
            }
        }
        ReportTarget::Projects { args } => {
            let params = report_params(wp, &args).await?;
            let rows = wp.projects(&params).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!("Projects ({})", params.organization_id);
                for r in &rows {
                    println!(
                        "  {:<24} total {:>6}  yesterday {:>6}",
                        r.project_id, r.total_points, r.yesterday_points
                    );
                }
            }
        }
        ReportTarget::Top { args, limit } => {
            let params = report_params(wp, &args).await?;
            let rows = wp.top_performers(&params, limit).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if rows.is_empty() {
                println!("No completed tasks.");
            } else {
                let mut current: Option<&str> = None;
                for r in &rows {
                    if current != Some(r.project_id.as_str()) {
                        println!("{}", r.project_id);
                        current = Some(r.project_id.as_str());
                    }
                    println!(
                        "  #{:<3} {} {} ({} pts)",
                        r.rank, r.first_name, r.last_name, r.points
                    );
                }
            }
        }
        ReportTarget::Leaderboard { args } => {
            let params = report_params(wp, &args).await?;
            let rows = wp.leaderboard(&params).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!("Leaderboard ({})", params.organization_id);
                for r in &rows {
                    println!(
                        "  {:>3}. {:<28} week {:>8.2}  yesterday {:>8.2} ({} tasks)",
                        r.position,
                        format!("{} {}", r.first_name, r.last_name),
                        r.weekly_points,
                        r.yesterday_points,
                        r.yesterday_task_count
                    );
                }
            }
        }
        ReportTarget::Board { args } => {
            let params = report_params(wp, &args).await?;
            let rows = wp.project_board(&params).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!("Project board ({})", params.organization_id);
                for r in &rows {
                    let leader = match &r.leader {
                        Some(l) => format!("{} {} ({} pts)", l.first_name, l.last_name, l.points),
                        None => "-".to_string(),
                    };
                    println!(
                        "  {:<28} total {:>6}  yesterday {:>6}  leader {}",
                        r.project_name, r.total_points, r.yesterday_points, leader
                    );
                }
            }
        }
    }
    Ok(())
}

async fn handle_config(wp: &WorkPulse, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => match wp.config_get(&key).await? {
            Some(v) => println!("{key} = {v}"),
            None => println!("{key} is not set"),
        },
        ConfigAction::Set { key, value } => {
            wp.config_set(&key, &value).await?;
            println!("Config updated.");
        }
        ConfigAction::List => {
            let entries = wp.config_list().await?;
            if entries.is_empty() {
                println!("No configuration set.");
            } else {
                for (k, v) in &entries {
                    println!("{k} = {v}");
                }
            }
        }
    }
    Ok(())
}

async fn print_status(wp: &WorkPulse) -> anyhow::Result<()> {
    let counts = wp.table_counts().await?;
    println!("Store Status");
    for (label, n) in counts {
        println!("  {:<14} {n}", format!("{label}:"));
    }
    println!(
        "  Pool:          {} connections ({} idle)",
        wp.pool().size(),
        wp.pool().idle_count()
    );
    Ok(())
}
