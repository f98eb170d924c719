use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::{error, info};

use schooldesk::{
    aggregate::{self, ClassFilter, FetchMode},
    api::{ApiClient, ApiError, SchoolApi},
    commands::{Command, CommandBus, CommandOutcome},
    config::Config,
    export,
    models::{FormData, Record, Resource},
    session::{AuthState, Session, SessionStore},
    tui::{self, ui::truncate_string},
    view::{ListViewController, LoadState},
};

mod cli;

use cli::{Cli, Commands};

const COLUMN_WIDTH: usize = 18;

#[tokio::main]
async fn main() -> Result<()> {
    // Set default log level to INFO if not specified
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "schooldesk=info");
    }

    let cli = Cli::parse();

    // The terminal UI owns the screen, so it only logs to the file
    init_logging(!matches!(cli.command, Commands::Tui));

    let config = Config::from_env()?;
    config.validate()?;

    if let Err(e) = run(cli.command, config).await {
        error!("Command failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn init_logging(console: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let file_appender = tracing_appender::rolling::never(".", "schooldesk.log");

    let console_layer = console.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(EnvFilter::from_default_env())
    });

    tracing_subscriber::registry()
        .with(console_layer)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_filter(EnvFilter::from_default_env()),
        )
        .init();
}

/// Errors shown to the user carry the API's readable message
fn user_error(e: ApiError) -> anyhow::Error {
    anyhow!(e.user_message())
}

async fn run(command: Commands, config: Config) -> Result<()> {
    let session = Session::load(SessionStore::new(&config.session_file));
    let client = Arc::new(ApiClient::new(&config, session.clone())?);
    let bus = CommandBus::new(client.clone());
    let today = chrono::Local::now().date_naive();

    match command {
        Commands::Login { username, password } => {
            let password = match password {
                Some(password) => password,
                None => prompt("Password: ")?,
            };
            let user = client.login(&username, &password).await.map_err(user_error)?;
            info!("Logged in as {}", user.username);
            println!("Logged in as {} ({})", user.username, user.role.as_str());
        }

        Commands::Logout => {
            session.invalidate();
            println!("Logged out");
        }

        Commands::Whoami => match session.resolve(client.as_ref()).await {
            AuthState::Authenticated(user) => {
                println!("{} ({})", user.username, user.role.as_str());
                if let Some(email) = &user.email {
                    println!("Email:  {}", email);
                }
                if let Some(school) = &user.school_name {
                    println!("School: {}", school);
                }
            }
            AuthState::Unauthenticated => println!("Not logged in"),
            AuthState::Error(message) => bail!(message),
        },

        Commands::List { resource, search, page, page_size } => {
            let page_size = page_size.unwrap_or(config.view.page_size);
            let mut controller = ListViewController::new(bus, resource, page_size);
            load(&mut controller).await?;

            if let Some(term) = search {
                controller.set_search(&term);
            }
            controller.go_to_page(page);

            let rows = controller.page_rows();
            if rows.is_empty() {
                println!("No {} found.", resource.as_str());
                return Ok(());
            }
            print_table(resource, &rows);
            println!();
            println!(
                "Page {} of {} ({} {})",
                controller.page(),
                controller.total_pages(),
                controller.filtered().len(),
                resource.as_str()
            );
        }

        Commands::Show { resource, id } => {
            let record = client.get(resource, id).await.map_err(user_error)?;
            println!("{} #{}", resource.title(), record.id);
            println!("{}", "-".repeat(40));
            for (field, _) in &record.fields {
                println!("{:<20} {}", field, record.text(field));
            }
        }

        Commands::Create { resource, set } => {
            let form = FormData::from_assignments(&set).map_err(|e| anyhow!(e))?;
            let outcome = bus
                .execute(Command::Create { resource, form })
                .await
                .map_err(user_error)?;
            report(resource, "Created", &outcome);
        }

        Commands::Update { resource, id, set } => {
            let changes = FormData::from_assignments(&set).map_err(|e| anyhow!(e))?;
            let current = client.get(resource, id).await.map_err(user_error)?;
            let mut form = current.to_form(resource);
            for (field, value) in changes.iter() {
                form.set(field, value);
            }
            let outcome = bus
                .execute(Command::Update { resource, id, form })
                .await
                .map_err(user_error)?;
            report(resource, "Updated", &outcome);
        }

        Commands::Delete { resource, id, yes } => {
            if !yes {
                let answer = prompt(&format!("Delete {} #{}? [y/N] ", resource.title(), id))?;
                if !answer.eq_ignore_ascii_case("y") && !answer.eq_ignore_ascii_case("yes") {
                    println!("Cancelled");
                    return Ok(());
                }
            }
            bus.execute(Command::Delete { resource, id })
                .await
                .map_err(user_error)?;
            println!("Deleted {} #{}", resource.title(), id);
        }

        Commands::Upload { title, file } => {
            if !file.is_file() {
                bail!("File not found: {}", file.display());
            }
            let outcome = bus
                .execute(Command::Upload { title, path: file })
                .await
                .map_err(user_error)?;
            report(Resource::Documents, "Uploaded", &outcome);
        }

        Commands::Fees { as_of } => {
            let records = client.list(Resource::Fees).await.map_err(user_error)?;
            print_fees(&aggregate::summarize_fees(&records, as_of.unwrap_or(today)));
        }

        Commands::Timetable { class } => {
            let records = client.list(Resource::Timetable).await.map_err(user_error)?;
            let filter = class.as_deref().map(ClassFilter::parse);
            print_timetable(&aggregate::build_grid(&records, filter.as_ref()));
        }

        Commands::Dashboard { strict } => {
            let mode = if strict { FetchMode::Strict } else { FetchMode::Lenient };
            let data = aggregate::load_dashboard(client.as_ref(), mode, today)
                .await
                .map_err(user_error)?;
            print_dashboard(&data);
        }

        Commands::Export { resource, output, search } => {
            let mut controller = ListViewController::new(bus, resource, config.view.page_size);
            load(&mut controller).await?;
            if let Some(term) = search {
                controller.set_search(&term);
            }
            let count = export::export_to_path(&output, resource, &controller.filtered())?;
            println!("Exported {} {} to {}", count, resource.as_str(), output.display());
        }

        Commands::Tui => {
            info!("Launching TUI interface");
            tui::run(config).await?;
        }
    }

    Ok(())
}

async fn load(controller: &mut ListViewController) -> Result<()> {
    controller.refresh().await;
    match controller.load_state() {
        LoadState::Failed(message) => bail!(message.clone()),
        _ => Ok(()),
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

fn report(resource: Resource, verb: &str, outcome: &CommandOutcome) {
    match outcome.record() {
        Some(record) => println!("{} {} #{}", verb, resource.title(), record.id),
        None => println!("{} {}", verb, resource.title()),
    }
}

fn print_table(resource: Resource, rows: &[&Record]) {
    let columns = resource.columns();

    let mut header = format!("{:<6}", "ID");
    for (_, title) in columns {
        header.push_str(&truncate_string(title, COLUMN_WIDTH));
        header.push(' ');
    }
    println!("{}", header.trim_end());
    println!("{}", "-".repeat(6 + columns.len() * (COLUMN_WIDTH + 1)));

    for record in rows {
        let mut line = format!("{:<6}", record.id);
        for (field, _) in columns {
            line.push_str(&truncate_string(&record.text(field), COLUMN_WIDTH));
            line.push(' ');
        }
        println!("{}", line.trim_end());
    }
}

fn print_fees(summary: &aggregate::FeeSummary) {
    println!("Billed:      {:>12.2}", summary.total_billed);
    println!("Paid:        {:>12.2}", summary.total_paid);
    println!("Outstanding: {:>12.2}", summary.total_outstanding);
    println!("Collected:   {:>11.1}%", summary.collection_rate());
    println!();
    println!(
        "Paid {} | Partial {} | Unpaid {} | Overdue {}",
        summary.paid, summary.partial, summary.unpaid, summary.overdue
    );

    if !summary.by_student.is_empty() {
        println!();
        println!("{:<30} {:>6} {:>12}", "Student", "Fees", "Balance");
        println!("{}", "-".repeat(50));
        for balance in &summary.by_student {
            println!(
                "{} {:>6} {:>12.2}",
                truncate_string(&balance.student, 30),
                balance.fees,
                balance.outstanding
            );
        }
    }

    if summary.skipped > 0 {
        println!();
        println!("{} fee records without an amount were skipped", summary.skipped);
    }
}

fn print_timetable(grid: &aggregate::TimetableGrid) {
    if grid.days.is_empty() {
        println!("No timetable slots found.");
    }

    for (day, slots) in &grid.days {
        println!("{}", aggregate::timetable::day_name(*day));
        for slot in slots {
            println!(
                "  {}-{}  {} {} {} {}",
                slot.start.format("%H:%M"),
                slot.end.format("%H:%M"),
                truncate_string(&slot.class_name, 10),
                truncate_string(&slot.subject_name, 20),
                truncate_string(&slot.teacher_name, 20),
                slot.room
            );
        }
        println!();
    }

    for (a, b) in grid.conflicts() {
        println!("Warning: slots #{} and #{} overlap for the same class", a, b);
    }
    if grid.skipped > 0 {
        println!("{} slots without a valid day or time were skipped", grid.skipped);
    }
}

fn print_dashboard(data: &aggregate::DashboardData) {
    println!("Students: {}", data.students);
    println!("Teachers: {}", data.teachers);
    println!("Classes:  {}", data.classes);
    println!();
    println!(
        "Fees: {:.2} outstanding, {:.1}% collected, {} overdue",
        data.fees.total_outstanding,
        data.fees.collection_rate(),
        data.fees.overdue
    );

    if !data.recent_notices.is_empty() {
        println!();
        println!("Recent notices:");
        for notice in &data.recent_notices {
            let posted = notice.text("created_at");
            println!("  {}  {}", posted.get(..10).unwrap_or(&posted), notice.text("title"));
        }
    }

    if !data.degraded.is_empty() {
        let names: Vec<&str> = data.degraded.iter().map(|r| r.as_str()).collect();
        println!();
        println!("Could not load: {}", names.join(", "));
    }
}
