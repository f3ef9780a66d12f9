use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use shop_notify::cli::args::{Cli, Commands};
use shop_notify::cli::commands::{self, Engine};
use shop_notify::config::{ColorSetting, Config};
use shop_notify::logging;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {:#}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match config.general.color {
        ColorSetting::Always => colored::control::set_override(true),
        ColorSetting::Never => colored::control::set_override(false),
        ColorSetting::Auto => {}
    }
    logging::init(cli.verbose, &config.logging.filter);

    let format = cli.output.unwrap_or(config.general.default_output);

    if let Commands::Completions { shell } = cli.command {
        print!("{}", commands::completions(shell)?);
        return Ok(());
    }

    let engine = Engine::open(cli.db.as_deref(), &config)?;
    let output = match cli.command {
        Commands::Registry { category } => commands::registry(&engine, category.as_deref(), format)?,
        Commands::Events { identifier } => commands::events(&engine, identifier.as_deref(), format)?,
        Commands::Script(args) => commands::script(&engine, args.command, format)?,
        Commands::Emit { event, shop, vars } => commands::emit(&engine, &event, shop, &vars, format)?,
        Commands::Outbox => commands::outbox(&engine, format)?,
        Commands::Notifications {
            shop,
            unread,
            mark_read,
        } => commands::notifications(&engine, shop, unread, mark_read, format)?,
        Commands::LogEntries {
            model,
            pk,
            identifier,
        } => commands::log_entries(&engine, &model, &pk, identifier.as_deref(), format)?,
        Commands::Completions { .. } => String::new(),
    };

    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
