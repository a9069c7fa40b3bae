#![forbid(unsafe_code)]

mod cli;
mod config;
mod constants;
mod host;
mod pattern;
mod profile;
mod slow_mover;
mod spots;
mod store;
mod title;
mod types;
mod x11_utils;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands};
use config::Settings;
use host::Desktop;
use spots::{PendingSelection, Scope, Selection, SpotService, WindowSave};
use x11_utils::X11Host;

fn init_logging(settings: &Settings, verbose: bool) -> Result<()> {
    let log_level = if verbose {
        TraceLevel::DEBUG
    } else {
        match std::env::var("LOG_LEVEL")
            .unwrap_or_else(|_| settings.log_level.clone())
            .to_lowercase()
            .as_str()
        {
            "trace" => TraceLevel::TRACE,
            "debug" => TraceLevel::DEBUG,
            "warn" => TraceLevel::WARN,
            "error" => TraceLevel::ERROR,
            _ => TraceLevel::INFO,
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to install log subscriber")
}

fn print_suggestions(window_title: &str, min_segment_length: usize) {
    let suggestions = title::suggest(window_title, min_segment_length);
    if suggestions.is_empty() {
        println!("No suggestions for {:?}", window_title);
        return;
    }
    for (i, suggestion) in suggestions.iter().enumerate() {
        println!(
            "{:>2}) [{}] {}: {}",
            i + 1,
            suggestion.kind,
            suggestion.description,
            suggestion.pattern.to_storage()
        );
    }
}

/// Ask on stdin until the user picks, types a pattern, or gives up
fn prompt_selection(service: &mut SpotService, mut session: PendingSelection) -> Result<bool> {
    let stdin = io::stdin();
    loop {
        println!("Pattern for '{}' at {}:", session.name(), session.point());
        println!("  0) global");
        for (i, suggestion) in session.suggestions().iter().enumerate() {
            println!("{:>3}) [{}] {}: {}", i + 1, suggestion.kind, suggestion.description, suggestion.pattern);
        }
        print!("Number, custom text, or empty to cancel: ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        stdin.lock().read_line(&mut line).context("Failed to read selection")?;
        let line = line.trim();

        if line.is_empty() {
            service.cancel(session);
            println!("Cancelled");
            return Ok(false);
        }

        let selection = match line.parse::<usize>() {
            Ok(choice) => service.confirm_pattern(session, choice)?,
            Err(_) => service.confirm_custom_pattern(session, line)?,
        };
        match selection {
            Selection::Saved { .. } => return Ok(true),
            Selection::Invalid(returned) => session = returned,
        }
    }
}

fn save_window(
    service: &mut SpotService,
    name: &str,
    choice: Option<usize>,
    pattern: Option<String>,
) -> Result<bool> {
    let session = match service.save_window_scoped(name)? {
        WindowSave::Saved { .. } => return Ok(true),
        WindowSave::Pending(session) => session,
    };

    let selection = match (choice, pattern) {
        (Some(choice), _) => service.confirm_pattern(session, choice)?,
        (None, Some(text)) => service.confirm_custom_pattern(session, &text)?,
        (None, None) => return prompt_selection(service, session),
    };
    Ok(matches!(selection, Selection::Saved { .. }))
}

fn list(service: &SpotService) {
    let listing = service.list_all();
    if listing.is_empty() {
        println!("No spots on the connected displays");
        return;
    }
    for entry in listing {
        let scope = match entry.scope {
            Scope::Global => "global".to_string(),
            Scope::App { matches } | Scope::Window { matches } => {
                format!("{}{}", entry.pattern, if matches { " *" } else { "" })
            }
        };
        println!("{:<20} {:<14} {:<24} {}", entry.name, entry.point.to_string(), entry.profile, scope);
    }
}

fn visible(service: &SpotService) {
    let spots = service.visible_spots();
    if spots.is_empty() {
        println!("No spots apply to this window");
        return;
    }
    for spot in spots {
        println!("{:<20} {}", spot.name, spot.point);
    }
}

fn run(cli: Cli, settings: Settings) -> Result<bool> {
    // Suggestions for an explicit title need no display
    if let Commands::Suggest { title: Some(text) } = &cli.command {
        print_suggestions(text, settings.min_segment_length);
        return Ok(true);
    }

    let host = Arc::new(X11Host::connect()?);
    let mut service = SpotService::new(host.clone(), host.clone(), &settings);
    debug!(profiles = ?service.active_profiles(), "Active profiles");

    let outcome = match cli.command {
        Commands::Save { name } => service.save(&name).map(|_| true),
        Commands::SaveWindow { name, choice, pattern } => save_window(&mut service, &name, choice, pattern),
        Commands::Move { name, window_only: false } => service.move_to(&name),
        Commands::Move { name, window_only: true } => service.move_to_window_only(&name),
        Commands::Click { name, window_only: false } => service.click(&name),
        Commands::Click { name, window_only: true } => service.click_window_only(&name),
        Commands::Drag { name, release } => service.drag(&name, release),
        Commands::Clear { name } => service.clear(&name),
        Commands::ClearAll => service.clear_all().map(|()| true),
        Commands::ClearWindow => service.clear_window().map(|_| true),
        Commands::List => {
            list(&service);
            Ok(true)
        }
        Commands::Visible => {
            visible(&service);
            Ok(true)
        }
        Commands::Edit => service.edit().map(|path| {
            println!("{}", path.display());
            true
        }),
        Commands::Suggest { title: None } => {
            print_suggestions(&host.window_title(), settings.min_segment_length);
            Ok(true)
        }
        Commands::Suggest { title: Some(_) } => Ok(true),
        Commands::Profiles => {
            for profile in service.active_profiles() {
                println!("{profile}");
            }
            Ok(true)
        }
        Commands::Reload => {
            service.reload();
            Ok(true)
        }
    };

    service.finish();
    outcome
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    init_logging(&settings, cli.verbose)?;

    if run(cli, settings)? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
