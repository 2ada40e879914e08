use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use cssd_api::{
    clock::{Clock, SystemClock},
    config::{self, AppConfig},
    errors::{ErrorResponse, ServiceError},
    events,
    models::{
        request::RequestFilter, stock_item::NewStockItem, AvailableItem, IssuedItem, Kit,
        Priority, ProcessStatus, ReceiveItem, Request, RequestStatus,
        SterilizationProcess, StockItem,
    },
    repositories::CssdStore,
    services::{
        consumption::{NewConsumptionRecord, ReportFilter},
        kits::KitDraft,
        requests::RequestDraft,
        sterilization::StartSterilization,
        AppServices,
    },
};
use serde::Serialize;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let json = cli.json;

    match run(cli).await {
        Ok(()) => Ok(()),
        Err(err) => match err.downcast_ref::<ServiceError>() {
            Some(service_err) if json => {
                print_json(&ErrorResponse::from(service_err))?;
                std::process::exit(1);
            }
            _ => Err(err),
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let context = CliContext::initialize(cli.offline).await?;

    match cli.command {
        Commands::Requests(command) => handle_requests_command(&context, command, cli.json).await,
        Commands::Receive(command) => handle_receive_command(&context, command, cli.json).await,
        Commands::Sterilization(command) => {
            handle_sterilization_command(&context, command, cli.json).await
        }
        Commands::Issue(command) => handle_issue_command(&context, command, cli.json).await,
        Commands::Stock(command) => handle_stock_command(&context, command, cli.json).await,
        Commands::Kits(command) => handle_kits_command(&context, command, cli.json).await,
        Commands::Consumption(command) => {
            handle_consumption_command(&context, command, cli.json).await
        }
        Commands::Dashboard => {
            let stats = context.services.dashboard.stats().await?;
            if cli.json {
                print_json(&stats)?;
            } else {
                println!("Active requests:            {}", stats.active_requests);
                println!("Sterilization in progress:  {}", stats.sterilization_in_progress);
                println!("Items ready for issue:      {}", stats.items_ready);
                println!("Low stock items:            {}", stats.low_stock_items);
            }
            Ok(())
        }
    }
}

#[derive(Parser)]
#[command(name = "cssd", about = "CSSD request, sterilization and stock management", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Use an empty in-memory store instead of the configured backend"
    )]
    offline: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(subcommand)]
    Requests(RequestsCommands),
    #[command(subcommand)]
    Receive(ReceiveCommands),
    #[command(subcommand)]
    Sterilization(SterilizationCommands),
    #[command(subcommand)]
    Issue(IssueCommands),
    #[command(subcommand)]
    Stock(StockCommands),
    #[command(subcommand)]
    Kits(KitsCommands),
    #[command(subcommand)]
    Consumption(ConsumptionCommands),
    /// Headline counters
    Dashboard,
}

#[derive(Subcommand)]
enum RequestsCommands {
    Create(CreateRequestArgs),
    List(ListRequestsArgs),
    Show(IdArgs),
}

#[derive(Subcommand)]
enum ReceiveCommands {
    List(ListReceiveArgs),
    Approve(IdArgs),
    Reject(IdArgs),
    /// Repair receive items that disagree with their requests
    Reconcile,
}

#[derive(Subcommand)]
enum SterilizationCommands {
    Start(StartArgs),
    Pause(IdArgs),
    Resume(IdArgs),
    Complete(IdArgs),
    List(ListProcessesArgs),
    /// Machines and methods known to this process
    Machines,
    /// Auto-complete due runs until interrupted
    Watch,
}

#[derive(Subcommand)]
enum IssueCommands {
    Candidates(SearchArgs),
    Create(IssueArgs),
    List(SearchArgs),
}

#[derive(Subcommand)]
enum StockCommands {
    Add(StockArgs),
    Update(UpdateStockArgs),
    Delete(IdArgs),
    List(SearchArgs),
    Low,
}

#[derive(Subcommand)]
enum KitsCommands {
    Create(CreateKitArgs),
    List(SearchArgs),
}

#[derive(Subcommand)]
enum ConsumptionCommands {
    Add(AddConsumptionArgs),
    Report(ReportArgs),
}

#[derive(Args)]
struct IdArgs {
    #[arg(help = "Record identifier")]
    id: String,
}

#[derive(Args)]
struct SearchArgs {
    #[arg(long, default_value = "", help = "Case-insensitive search term")]
    search: String,
}

#[derive(Args)]
struct CreateRequestArgs {
    #[arg(long, help = "Requesting department")]
    department: String,
    #[arg(long, value_parser = Priority::parse, help = "High, Medium or Low")]
    priority: Priority,
    #[arg(long, default_value = "", help = "Person placing the request")]
    requested_by: String,
    #[arg(long, help = "Request date (YYYY-MM-DD); defaults to today")]
    date: Option<NaiveDate>,
    #[arg(
        long = "item",
        value_parser = parse_line,
        action = ArgAction::Append,
        help = "Line as name=quantity (e.g. Forceps=5); repeat for more lines"
    )]
    items: Vec<(String, String)>,
}

#[derive(Args)]
struct ListRequestsArgs {
    #[arg(long, default_value = "")]
    search: String,
    #[arg(long, default_value = "all", help = "Status filter, or 'all'")]
    status: String,
    #[arg(long, default_value = "all", help = "Priority filter, or 'all'")]
    priority: String,
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
    #[arg(long, default_value_t = 1)]
    page: u64,
}

#[derive(Args)]
struct ListReceiveArgs {
    #[arg(long, default_value = "")]
    search: String,
    #[arg(long, default_value = "all", help = "Status filter, or 'all'")]
    status: String,
}

#[derive(Args)]
struct StartArgs {
    #[arg(long)]
    machine: String,
    #[arg(long, help = "Steam, Chemical or Plasma")]
    method: String,
    #[arg(long)]
    request_id: String,
}

#[derive(Args)]
struct ListProcessesArgs {
    #[arg(long, default_value = "")]
    search: String,
    #[arg(long, default_value = "all", help = "Status filter, or 'all'")]
    status: String,
}

#[derive(Args)]
struct IssueArgs {
    #[arg(long, help = "Id of a sterilized item")]
    item_id: String,
    #[arg(long, help = "Receiving department")]
    department: String,
}

#[derive(Args)]
struct StockArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    category: String,
    #[arg(long)]
    quantity: i64,
    #[arg(long)]
    location: String,
    #[arg(long)]
    min_level: i64,
}

impl From<StockArgs> for NewStockItem {
    fn from(args: StockArgs) -> Self {
        NewStockItem {
            name: args.name,
            category: args.category,
            quantity: args.quantity,
            location: args.location,
            min_level: args.min_level,
        }
    }
}

#[derive(Args)]
struct UpdateStockArgs {
    #[arg(long)]
    id: String,
    #[command(flatten)]
    fields: StockArgs,
}

#[derive(Args)]
struct CreateKitArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    department: String,
    #[arg(long, value_parser = Priority::parse)]
    priority: Priority,
    #[arg(
        long = "item",
        value_parser = parse_line,
        action = ArgAction::Append,
        help = "Line as name=quantity; repeat for more lines"
    )]
    items: Vec<(String, String)>,
}

#[derive(Args)]
struct AddConsumptionArgs {
    #[arg(long, help = "Surgery id")]
    id: String,
    #[arg(long = "type", help = "Surgery type")]
    surgery_type: String,
    #[arg(long)]
    dept: String,
    #[arg(long)]
    date: Option<NaiveDate>,
    #[arg(long, help = "Instrument count before surgery")]
    before: Option<i64>,
    #[arg(long, help = "Instrument count after surgery")]
    after: Option<i64>,
    #[arg(long, help = "Defaults to before minus after")]
    used: Option<i64>,
    #[arg(long)]
    items: String,
}

#[derive(Args)]
struct ReportArgs {
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
    #[arg(long)]
    department: Option<String>,
}

struct CliContext {
    config: AppConfig,
    clock: Arc<dyn Clock>,
    services: AppServices,
}

impl CliContext {
    async fn initialize(offline: bool) -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let store = if offline {
            info!("Running against an in-memory store");
            CssdStore::in_memory()
        } else {
            CssdStore::http(&config).context("failed to configure backend client")?
        };

        let (event_sender, event_rx) = events::channel(config.event_channel_capacity);
        tokio::spawn(events::process_events(event_rx));

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let services = AppServices::new(
            Arc::new(store),
            Arc::new(event_sender),
            clock.clone(),
            &config,
        );
        debug!(backend = %config.backend_url, "CLI context ready");

        Ok(Self {
            config,
            clock,
            services,
        })
    }
}

async fn handle_requests_command(
    context: &CliContext,
    command: RequestsCommands,
    json: bool,
) -> Result<()> {
    let service = &context.services.requests;
    match command {
        RequestsCommands::Create(args) => {
            let date = args.date.unwrap_or_else(|| context.clock.today());
            let mut draft =
                RequestDraft::new(&args.department, args.priority, date, &args.requested_by);
            for (item, quantity) in &args.items {
                draft.add_line(item, quantity)?;
            }
            let request = service.save(&mut draft).await?;
            if json {
                print_json(&request)?;
            } else {
                println!("Created request {}", request.id);
                render_request(&request);
            }
        }
        RequestsCommands::List(args) => {
            let filter = RequestFilter {
                search: args.search,
                status: RequestStatus::parse_filter(&args.status)?,
                priority: Priority::parse_filter(&args.priority)?,
                date_from: args.from,
                date_to: args.to,
            };
            let page = service.list(&filter, args.page).await?;
            if json {
                print_json(&page)?;
            } else {
                for request in &page.items {
                    render_request(request);
                }
                println!(
                    "Page {} of {} ({} requests)",
                    page.page,
                    page.total_pages.max(1),
                    page.total
                );
            }
        }
        RequestsCommands::Show(args) => {
            let request = service.get(&args.id).await?;
            if json {
                print_json(&request)?;
            } else {
                render_request(&request);
            }
        }
    }
    Ok(())
}

async fn handle_receive_command(
    context: &CliContext,
    command: ReceiveCommands,
    json: bool,
) -> Result<()> {
    let service = &context.services.receiving;
    match command {
        ReceiveCommands::List(args) => {
            let status = RequestStatus::parse_filter(&args.status)?;
            let rows = service.list(&args.search, status).await?;
            print_rows(&rows, json, render_receive_item)?;
        }
        ReceiveCommands::Approve(args) => {
            let decision = service.approve(&args.id).await?;
            if json {
                print_json(&decision)?;
            } else {
                println!("Approved {} (request {})", decision.receive_item.id, decision.request.id);
            }
        }
        ReceiveCommands::Reject(args) => {
            let decision = service.reject(&args.id).await?;
            if json {
                print_json(&decision)?;
            } else {
                println!("Rejected {} (request {})", decision.receive_item.id, decision.request.id);
            }
        }
        ReceiveCommands::Reconcile => {
            let report = service.reconcile().await?;
            if json {
                print_json(&report)?;
            } else {
                println!(
                    "Repaired {}, recreated {}, orphaned {}",
                    report.repaired.len(),
                    report.recreated.len(),
                    report.orphaned.len()
                );
                for id in &report.orphaned {
                    println!("  orphaned receive item {}", id);
                }
            }
        }
    }
    Ok(())
}

async fn handle_sterilization_command(
    context: &CliContext,
    command: SterilizationCommands,
    json: bool,
) -> Result<()> {
    let service = &context.services.sterilization;
    match command {
        SterilizationCommands::Start(args) => {
            let process = service
                .start(StartSterilization {
                    machine: args.machine,
                    method: args.method,
                    request_id: args.request_id,
                })
                .await?;
            if json {
                print_json(&process)?;
            } else {
                println!("Started {}", process.id);
                render_process(&process);
            }
        }
        SterilizationCommands::Pause(args) => {
            let process = service.pause(&args.id).await?;
            print_one(&process, json, render_process)?;
        }
        SterilizationCommands::Resume(args) => {
            let process = service.resume(&args.id).await?;
            print_one(&process, json, render_process)?;
        }
        SterilizationCommands::Complete(args) => {
            let run = service.complete(&args.id).await?;
            if json {
                print_json(&run)?;
            } else if let Some(available) = &run.available_item {
                println!("Completed {}; {} is ready for issue", run.process.id, available.id);
            } else {
                println!("{} was already completed", run.process.id);
            }
        }
        SterilizationCommands::List(args) => {
            let status = ProcessStatus::parse_filter(&args.status)?;
            let rows = service.list(&args.search, status).await?;
            if json {
                print_json(&rows)?;
            } else {
                let summary = service.summary().await?;
                println!(
                    "In progress {} • paused {} • completed {} • machines in maintenance {}",
                    summary.in_progress, summary.paused, summary.completed, summary.maintenance_alerts
                );
                let now = context.clock.now();
                for process in &rows {
                    render_process(process);
                    if process.status != ProcessStatus::Completed {
                        println!(
                            "    running {} of {} min",
                            process.running_time(now).num_minutes(),
                            process.duration
                        );
                    }
                }
            }
        }
        SterilizationCommands::Machines => {
            let machines = service.machines().await;
            if json {
                print_json(&machines)?;
            } else {
                for machine in &machines {
                    println!("- {} {} • {}", machine.id, machine.name, machine.status);
                }
                for method in service.methods() {
                    println!("  method {} • {} min", method.name, method.duration);
                }
            }
        }
        SterilizationCommands::Watch => {
            let interval = context.config.auto_complete_interval();
            let handle = service.spawn_auto_completion(interval);
            println!(
                "Watching for due runs every {}s; press Ctrl-C to stop",
                interval.as_secs()
            );
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl-C")?;
            handle.abort();
            info!("Auto-completion stopped");
        }
    }
    Ok(())
}

async fn handle_issue_command(
    context: &CliContext,
    command: IssueCommands,
    json: bool,
) -> Result<()> {
    let service = &context.services.issuing;
    match command {
        IssueCommands::Candidates(args) => {
            let rows = service.candidates(&args.search).await?;
            print_rows(&rows, json, render_available)?;
        }
        IssueCommands::Create(args) => {
            let issued = service.issue(&args.item_id, &args.department).await?;
            if json {
                print_json(&issued)?;
            } else {
                println!("Issued {} as {}", issued.request_id, issued.id);
            }
        }
        IssueCommands::List(args) => {
            let rows = service.list_issued(&args.search).await?;
            print_rows(&rows, json, render_issued)?;
        }
    }
    Ok(())
}

async fn handle_stock_command(
    context: &CliContext,
    command: StockCommands,
    json: bool,
) -> Result<()> {
    let service = &context.services.stock;
    match command {
        StockCommands::Add(args) => {
            let item = service.add(args.into()).await?;
            print_one(&item, json, render_stock)?;
        }
        StockCommands::Update(args) => {
            let item = service.update(&args.id, args.fields.into()).await?;
            print_one(&item, json, render_stock)?;
        }
        StockCommands::Delete(args) => {
            service.delete(&args.id).await?;
            if !json {
                println!("Deleted {}", args.id);
            }
        }
        StockCommands::List(args) => {
            let rows = service.list(&args.search).await?;
            print_rows(&rows, json, render_stock)?;
        }
        StockCommands::Low => {
            let rows = service.low_stock().await?;
            print_rows(&rows, json, render_stock)?;
        }
    }
    Ok(())
}

async fn handle_kits_command(context: &CliContext, command: KitsCommands, json: bool) -> Result<()> {
    let service = &context.services.kits;
    match command {
        KitsCommands::Create(args) => {
            let mut draft = KitDraft::new(&args.name, &args.department, args.priority);
            for (item, quantity) in &args.items {
                draft.add_line(item, quantity)?;
            }
            let kit = service.save(&mut draft).await?;
            print_one(&kit, json, render_kit)?;
        }
        KitsCommands::List(args) => {
            let rows = service.list(&args.search).await?;
            print_rows(&rows, json, render_kit)?;
        }
    }
    Ok(())
}

async fn handle_consumption_command(
    context: &CliContext,
    command: ConsumptionCommands,
    json: bool,
) -> Result<()> {
    let service = &context.services.consumption;
    match command {
        ConsumptionCommands::Add(args) => {
            let record = service
                .add(NewConsumptionRecord {
                    id: args.id,
                    surgery_type: args.surgery_type,
                    dept: args.dept,
                    date: args.date,
                    before: args.before,
                    after: args.after,
                    used: args.used,
                    items: args.items,
                })
                .await?;
            if json {
                print_json(&record)?;
            } else {
                println!("Recorded {}: {} used", record.id, record.used);
            }
        }
        ConsumptionCommands::Report(args) => {
            let report = service
                .report(&ReportFilter {
                    date_from: args.from,
                    date_to: args.to,
                    department: args.department,
                })
                .await?;
            if json {
                print_json(&report)?;
            } else {
                println!(
                    "{} surgeries, {} instruments used, {:.1} per surgery",
                    report.total_surgeries, report.total_consumption, report.average_per_surgery
                );
                for dept in &report.by_department {
                    println!("  {} • {} used over {} surgeries", dept.department, dept.used, dept.surgeries);
                }
                for week in &report.by_week {
                    println!("  {} • {} used", week.week, week.used);
                }
            }
        }
    }
    Ok(())
}

fn parse_line(raw: &str) -> Result<(String, String), String> {
    let (item, quantity) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected name=quantity, got '{}'", raw))?;
    Ok((item.trim().to_string(), quantity.trim().to_string()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_one<T: Serialize>(value: &T, json: bool, render: fn(&T)) -> Result<()> {
    if json {
        print_json(value)
    } else {
        render(value);
        Ok(())
    }
}

fn print_rows<T: Serialize>(rows: &[T], json: bool, render: fn(&T)) -> Result<()> {
    if json {
        return print_json(&rows);
    }
    if rows.is_empty() {
        println!("No records found");
    }
    rows.iter().for_each(render);
    Ok(())
}

fn render_request(request: &Request) {
    println!(
        "- {} • {} • {} ({}) • {} • {} • {} {}",
        request.id,
        request.department,
        request.items,
        request.quantity,
        request.priority,
        request.status,
        request.date,
        request.time
    );
}

fn render_receive_item(item: &ReceiveItem) {
    println!(
        "- {} • request {} • {} • {} ({}) • {}",
        item.id, item.request_id, item.department, item.items, item.quantity, item.status
    );
}

fn render_process(process: &SterilizationProcess) {
    println!(
        "- {} • {} • {} • item {} • {} • started {}",
        process.id,
        process.machine,
        process.process,
        process.item_id,
        process.status,
        process
            .start_time
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    );
}

fn render_available(item: &AvailableItem) {
    println!(
        "- {} • {} • {} ({}) • ready {}",
        item.id, item.department, item.items, item.quantity, item.ready_time
    );
}

fn render_issued(item: &IssuedItem) {
    println!(
        "- {} • request {} • {} • {} ({}) • {} {}",
        item.id,
        item.request_id,
        item.department,
        item.items,
        item.quantity,
        item.issued_date,
        item.issued_time
    );
}

fn render_stock(item: &StockItem) {
    println!(
        "- {} • {} • {} • {} on hand (min {}) • {} • {}",
        item.id, item.name, item.category, item.quantity, item.min_level, item.location, item.status
    );
}

fn render_kit(kit: &Kit) {
    println!(
        "- {} • {} • {} • {} ({}) • {} • {}",
        kit.id, kit.name, kit.department, kit.items, kit.quantity, kit.priority, kit.status
    );
}
