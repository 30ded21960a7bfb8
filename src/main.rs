use clap::{Parser, ValueEnum};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use jobdesk::config::ClientConfig;
use jobdesk::model::{Record, View};
use jobdesk::reorder::CommitOutcome;
use jobdesk::shutdown::install_shutdown_handler;
use jobdesk::DeskClient;

#[derive(Parser, Debug)]
#[command(name = "jobdesk")]
#[command(version)]
#[command(about = "Terminal client for the department job/ticket desk")]
#[command(propagate_version = true)]
struct Args {
    #[command(flatten)]
    client: ClientArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Ticket views
    Tickets {
        #[command(subcommand)]
        command: TicketCommands,
    },

    /// Job queue commands
    Jobs {
        #[command(subcommand)]
        command: JobCommands,
    },

    /// Follow live updates until interrupted
    Watch {
        /// Department to watch (defaults to the user's own)
        #[arg(long)]
        department: Option<u64>,
    },
}

// =============================================================================
// Client Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ClientArgs {
    /// REST API base URL
    #[arg(long, default_value = "http://127.0.0.1:8080/api")]
    api: String,

    /// Realtime WebSocket URL
    #[arg(long, default_value = "ws://127.0.0.1:8080/ws")]
    realtime: String,

    /// Login name
    #[arg(long, short = 'u')]
    username: String,

    /// Password
    #[arg(long, short = 'p')]
    password: String,

    /// Seconds to wait after the last move before committing the order
    #[arg(long, default_value = "5")]
    commit_delay_secs: u64,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TicketView {
    Tickets,
    Approvals,
    History,
}

impl From<TicketView> for View {
    fn from(view: TicketView) -> Self {
        match view {
            TicketView::Tickets => View::Tickets,
            TicketView::Approvals => View::Approvals,
            TicketView::History => View::History,
        }
    }
}

// =============================================================================
// Ticket and Job Commands
// =============================================================================

#[derive(clap::Subcommand, Debug)]
enum TicketCommands {
    /// List the tickets of a view
    List {
        #[arg(long, default_value = "tickets")]
        view: TicketView,

        #[arg(long)]
        department: Option<u64>,
    },
}

#[derive(clap::Subcommand, Debug)]
enum JobCommands {
    /// List the job queue in priority order
    List {
        #[arg(long)]
        department: Option<u64>,
    },
    /// Move a job within the queue and commit the new order
    Move {
        #[arg(long)]
        department: Option<u64>,

        /// Current position (0-based)
        #[arg(long)]
        from: usize,

        /// Target position (0-based)
        #[arg(long)]
        to: usize,
    },
}

// =============================================================================
// JSON Output Types
// =============================================================================

#[derive(Serialize)]
struct RecordListOutput<'a> {
    view: String,
    department_id: Option<u64>,
    records: &'a [Record],
}

#[derive(Serialize)]
struct MoveOutput {
    moved: bool,
    outcome: String,
}

// =============================================================================
// Helper Functions
// =============================================================================

fn outcome_to_string(outcome: &CommitOutcome) -> String {
    match outcome {
        CommitOutcome::Idle => "IDLE".to_string(),
        CommitOutcome::Skipped => "SKIPPED".to_string(),
        CommitOutcome::Committed => "COMMITTED".to_string(),
        CommitOutcome::RolledBack(e) => format!("ROLLED_BACK: {}", e),
        CommitOutcome::Discarded(e) => format!("DISCARDED: {}", e),
    }
}

fn print_records(
    view: View,
    department_id: Option<u64>,
    records: &[Record],
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match output_format {
        OutputFormat::Json => {
            let output = RecordListOutput {
                view: view.to_string(),
                department_id,
                records,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            if records.is_empty() {
                println!("No {} found.", view);
                return Ok(());
            }
            println!(
                "{:<4} {:<8} {:<9} {:<13} TITLE",
                "POS", "ID", "PRIORITY", "SECTION"
            );
            println!("{}", "-".repeat(70));
            for (pos, record) in records.iter().enumerate() {
                let title = if record.title.chars().count() > 32 {
                    format!("{}...", record.title.chars().take(29).collect::<String>())
                } else {
                    record.title.clone()
                };
                println!(
                    "{:<4} {:<8} {:<9} {:<13} {}",
                    pos,
                    record.id,
                    record.priority,
                    record.section.to_string(),
                    title
                );
            }
            println!();
            println!("{} {} in view", records.len(), view);
        }
    }
    Ok(())
}

async fn open_client(args: &ClientArgs) -> Result<DeskClient, Box<dyn std::error::Error>> {
    let config = ClientConfig::new(args.api.clone(), args.realtime.clone())
        .with_commit_debounce_ms(args.commit_delay_secs.saturating_mul(1000));
    let client = DeskClient::connect(config)?;
    let user = client.login(&args.username, &args.password).await?;
    tracing::info!(user = %user.name, department_id = ?user.department_id, "Signed in");
    Ok(client)
}

async fn select_department(client: &DeskClient, department: Option<u64>) {
    if let Some(id) = department {
        client.switch_department(id).await;
    }
}

// =============================================================================
// Command Handlers
// =============================================================================

async fn handle_list(
    client: &DeskClient,
    view: View,
    department: Option<u64>,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    select_department(client, department).await;
    client.refresh(view).await?;
    let store = client.store(view);
    let scope = store.scope().await;
    let records = store.records().await;
    print_records(view, scope.department_id, &records, output_format)
}

async fn handle_job_move(
    client: &DeskClient,
    department: Option<u64>,
    from: usize,
    to: usize,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    select_department(client, department).await;
    client.refresh(View::Jobs).await?;

    let reorder = client
        .reorder(View::Jobs)
        .ok_or("jobs view cannot be reordered")?;
    let moved = reorder.move_item(from, to).await?;
    let outcome = if moved {
        reorder.flush().await?
    } else {
        CommitOutcome::Idle
    };

    match output_format {
        OutputFormat::Json => {
            let output = MoveOutput {
                moved,
                outcome: outcome_to_string(&outcome),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            if !moved {
                eprintln!("Error: position out of range");
                std::process::exit(1);
            }
            match outcome {
                CommitOutcome::Committed => {
                    println!("Order saved.");
                    let records = client.store(View::Jobs).records().await;
                    let scope = client.store(View::Jobs).scope().await;
                    print_records(View::Jobs, scope.department_id, &records, output_format)?;
                }
                CommitOutcome::RolledBack(e) | CommitOutcome::Discarded(e) => {
                    eprintln!("Error: order not saved: {}", e);
                    std::process::exit(1);
                }
                other => println!("Nothing committed ({})", outcome_to_string(&other)),
            }
        }
    }
    Ok(())
}

async fn handle_watch(
    client: &DeskClient,
    department: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    select_department(client, department).await;
    let loaded = client.load_all().await;
    tracing::info!(views = loaded, "Initial load finished");

    let shutdown = install_shutdown_handler();
    let realtime = client.start_realtime(shutdown.clone());

    let mut notices = client.notifier().subscribe();
    let mut state = client.realtime().state();

    // One forwarder per store so the loop below can wait on a single channel.
    let (change_tx, mut change_rx) = mpsc::channel::<View>(32);
    for view in View::ALL {
        let mut revision = client.store(view).subscribe();
        let tx = change_tx.clone();
        tokio::spawn(async move {
            while revision.changed().await.is_ok() {
                if tx.send(view).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(change_tx);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            notice = notices.recv() => {
                if let Ok(notice) = notice {
                    println!("[{:?}] {}", notice.level, notice.message);
                }
            }
            result = state.changed() => {
                if result.is_err() {
                    break;
                }
                let current = *state.borrow();
                println!("realtime: {}", current);
            }
            Some(view) = change_rx.recv() => {
                let store = client.store(view);
                println!(
                    "{}: {} records ({})",
                    view,
                    store.records().await.len(),
                    store.status().await
                );
            }
        }
    }

    realtime.await?;
    client.logout().await;
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let client = open_client(&args.client).await?;

    match args.command {
        Commands::Tickets { command } => match command {
            TicketCommands::List { view, department } => {
                handle_list(&client, view.into(), department, &args.client.output).await?;
            }
        },
        Commands::Jobs { command } => match command {
            JobCommands::List { department } => {
                handle_list(&client, View::Jobs, department, &args.client.output).await?;
            }
            JobCommands::Move {
                department,
                from,
                to,
            } => {
                handle_job_move(&client, department, from, to, &args.client.output).await?;
            }
        },
        Commands::Watch { department } => {
            handle_watch(&client, department).await?;
        }
    }

    Ok(())
}
