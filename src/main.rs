mod cli;
mod config;
mod db;
mod error;
mod logging;
mod models;
mod rules;

use anyhow::Context;
use clap::Parser;
use cli::{App, Cli, Commands};
use colored::*;
use config::Config;
use db::{Database, ReservationStore};
use dialoguer::{theme::ColorfulTheme, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;
use tracing::{error, info};

/// Opens the pool behind a spinner and creates the schema on first use.
async fn connect(config: &Config) -> error::Result<Database> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
    spinner.set_message("Connecting to database...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = async {
        let db = Database::new(&config.database_url, config.max_connections).await?;
        if !db.is_schema_initialized().await? {
            info!("Schema not found, creating it");
            db.init_schema().await?;
        }
        Ok::<_, error::AppError>(db)
    }
    .await;

    spinner.finish_and_clear();
    result
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_env()
        .context("invalid configuration")?
        .with_database_url(cli.database_url.clone());
    let _log_guard = logging::init(&config).context("failed to initialize logging")?;

    info!("Initializing airline reservation app...");

    let db = match connect(&config).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to initialize application: {:?}", e);
            println!(
                "{}",
                "Error: Failed to connect to the database. Check logs.".red()
            );
            return Err(e).context("database connection failed");
        },
    };
    let app = App::new(db);

    // One-shot mode: run the subcommand and exit.
    if let Some(command) = cli.command {
        return app
            .run_command(command)
            .await
            .context("command failed");
    }

    run_menu(&app).await?;
    Ok(())
}

async fn run_menu<S: ReservationStore>(app: &App<S>) -> anyhow::Result<()> {
    if !std::io::stdout().is_terminal() {
        return Err(error::AppError::Cli(
            "the interactive menu needs a terminal; pass a subcommand instead (see --help)"
                .to_string(),
        )
        .into());
    }

    println!(
        "{}",
        "Welcome to the Airline Reservation System!".cyan().bold()
    );

    let options = &[
        "Add Reservation",
        "View Available Flights",
        "View Current Reservations",
        "Edit a Reservation",
        "Cancel a Reservation",
        "Delete a Reservation",
        "Add a Flight",
        "Remove a Flight",
        "Initialize Database Schema",
        "Exit",
    ];

    loop {
        // A failed lookup should not block the menu.
        let banner = app.popular_airline_banner().await.unwrap_or_else(|e| {
            error!("Failed to look up popular airline: {:?}", e);
            "Currently Popular Airline: unavailable".to_string()
        });
        println!("{}", banner.magenta());

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("What would you like to do?")
            .items(options)
            .default(0)
            .interact_opt()?
            .unwrap_or(options.len() - 1); // Esc / Ctrl+C exits

        println!("\n---\n");

        let command_result = match selection {
            0 => app.interactive_add_reservation().await,
            1 => app.run_command(Commands::Flights { json: false }).await,
            2 => app.run_command(Commands::Reservations { json: false }).await,
            3 => app.interactive_edit_reservation().await,
            4 => app.interactive_cancel_reservation().await,
            5 => app.interactive_delete_reservation().await,
            6 => app.interactive_add_flight().await,
            7 => app.interactive_remove_flight().await,
            8 => app.run_command(Commands::InitDb).await,
            _ => {
                println!("{}", "Exiting the Airline Reservation System.".green());
                break;
            },
        };

        if let Err(e) = command_result {
            error!("Command execution failed: {:?}", e);
            println!("{} {}", "Error:".red(), e.to_string().red());
        }

        println!("\n---\n");
    }

    Ok(())
}
