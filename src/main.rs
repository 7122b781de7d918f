mod adjust;
mod app;
mod config;
mod error;
mod stock;
mod theme;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::App;
use config::AppConfig;
use stock::Submission;

#[derive(Parser, Debug)]
#[command(name = "zaiko")]
#[command(version = "0.1.0")]
#[command(about = "A terminal stock panel with quick quantity adjustment")]
struct Args {
    /// Page layout to load instead of ~/.config/zaiko/page.toml
    #[arg(short, long)]
    page: Option<PathBuf>,

    /// Append submitted stock changes (JSON lines) here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the control-to-form bindings as JSON and exit
    #[arg(long)]
    bindings: bool,

    /// Validate the page layout and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays free for submissions
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config = AppConfig::load(args.page.as_deref())?;
    config.validate().context("Invalid page layout")?;

    if args.check {
        println!(
            "Page layout OK: {} categories, {} items",
            config.categories.len(),
            config.items().count()
        );
        return Ok(());
    }

    if args.bindings {
        return print_bindings(&config);
    }

    let submissions = run_tui(&config).await?;
    write_submissions(&submissions, args.output.as_deref()).await
}

fn print_bindings(config: &AppConfig) -> Result<()> {
    let (forms, bindings) = stock::bind_page(config);

    let output = serde_json::json!({
        "forms": forms.iter().map(|f| serde_json::json!({
            "form": f.form,
            "item_id": f.item_id,
            "item": f.name,
        })).collect::<Vec<_>>(),
        "controls": bindings.to_list(),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run_tui(config: &AppConfig) -> Result<Vec<Submission>> {
    let mut app = App::new(config)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result?;
    Ok(app.submissions)
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') if !app.captures_text() => return Ok(()),
                        KeyCode::Char('c') if key.modifiers.contains(event::KeyModifiers::CONTROL) => {
                            return Ok(())
                        }
                        _ => app.handle_key(key),
                    }
                }
            }
        }

        app.tick();
        tokio::task::yield_now().await;
    }
}

/// Hand the session's submissions to whatever applies them server-side
async fn write_submissions(submissions: &[Submission], output: Option<&Path>) -> Result<()> {
    if submissions.is_empty() {
        return Ok(());
    }

    let mut lines = String::new();
    for submission in submissions {
        lines.push_str(&serde_json::to_string(submission)?);
        lines.push('\n');
    }

    match output {
        Some(path) => {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            file.write_all(lines.as_bytes()).await?;
            tracing::info!("Wrote {} submissions to {}", submissions.len(), path.display());
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(lines.as_bytes()).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}
