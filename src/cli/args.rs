use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "shop-notify")]
#[command(about = "Event-driven notification scripts for multi-tenant shops")]
#[command(long_about = "shop-notify - notification rule engine for shops

Shops react to events (an order was received, a shipment was created, ...)
with scripts: ordered steps of conditions and actions such as sending an
email, adding a log entry to the order or notifying the shop admins.

QUICK START:
  shop-notify registry                         List conditions, actions, events
  shop-notify script create --template order_confirmation_email --enable
  shop-notify emit order_received --var order=1 --var customer_email=a@example.com
  shop-notify outbox                           Show the emails that were sent

OUTPUT FORMATS:
  --output pretty    Human-readable colored output (default)
  --output json      Machine-readable JSON for scripting

For more information on a specific command, run:
  shop-notify <command> --help")]
#[command(version, propagate_version = true)]
pub struct Cli {
    /// Output format for command results
    ///
    /// Use 'pretty' for human-readable colored output (default),
    /// or 'json' for machine-readable output suitable for scripting.
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Database file (default: ~/.shop-notify/notify.db)
    #[arg(long, global = true, env = "SHOP_NOTIFY_DB")]
    pub db: Option<PathBuf>,

    /// Config file (default: ~/.shop-notify/config.yaml)
    #[arg(long, global = true, env = "SHOP_NOTIFY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for command results.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable colored output.
    #[default]
    Pretty,
    /// Machine-readable JSON output.
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List registered providers
    ///
    /// Shows conditions, actions, events and script templates. Pass a
    /// category to show only that one.
    ///
    /// # Examples
    ///
    ///   shop-notify registry
    ///   shop-notify registry actions
    ///   shop-notify registry notify_condition
    #[command(alias = "reg")]
    Registry {
        /// Category: condition, action, event or template
        category: Option<String>,
    },

    /// Show events and the variables they publish
    ///
    /// Without an identifier every event is listed.
    Events {
        /// Event identifier
        identifier: Option<String>,
    },

    /// Manage scripts
    Script(ScriptArgs),

    /// Publish an event and run the scripts listening to it
    ///
    /// Variables are given as `name=value`. Values are parsed as JSON when
    /// possible, otherwise taken as text. Model variables accept a bare
    /// primary key or a JSON object with a `pk` field.
    ///
    /// # Examples
    ///
    ///   shop-notify emit order_received --var order=42 \
    ///       --var customer_email=jane@example.com --var language=fi
    ///   shop-notify emit order_received --shop 2 \
    ///       --var 'order={"pk": 42, "reference_number": "R-42"}'
    Emit {
        /// Event identifier
        event: String,

        /// Shop the event belongs to
        #[arg(long, default_value_t = 1)]
        shop: i64,

        /// Variable value as name=value (repeatable)
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,
    },

    /// Show emails waiting in the outbox
    Outbox,

    /// Show in-app notifications
    Notifications {
        /// Only notifications of this shop
        #[arg(long)]
        shop: Option<i64>,

        /// Only unread notifications
        #[arg(long)]
        unread: bool,

        /// Mark a notification read by id
        #[arg(long, value_name = "ID")]
        mark_read: Option<i64>,
    },

    /// Show log entries attached to an entity
    ///
    /// # Examples
    ///
    ///   shop-notify log-entries shop.order 42
    LogEntries {
        /// Model label, e.g. shop.order
        model: String,

        /// Primary key
        pk: String,

        /// Only entries with this identifier
        #[arg(long)]
        identifier: Option<String>,
    },

    /// Generate shell completions
    ///
    /// Example: shop-notify completions bash > ~/.bash_completion.d/shop-notify
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments for script management.
#[derive(Args)]
pub struct ScriptArgs {
    #[command(subcommand)]
    pub command: ScriptCommands,
}

/// Script subcommands.
#[derive(Subcommand)]
pub enum ScriptCommands {
    /// List scripts
    #[command(alias = "ls")]
    List {
        /// Only scripts of this shop
        #[arg(long)]
        shop: Option<i64>,
    },

    /// Show a script and its steps
    Show {
        /// Script identifier
        identifier: String,
    },

    /// Create a script, empty or from a script template
    ///
    /// # Examples
    ///
    ///   shop-notify script create --template order_confirmation_email
    ///   shop-notify script create --event order_received --name "Log orders"
    Create {
        /// Shop the script belongs to
        #[arg(long, default_value_t = 1)]
        shop: i64,

        /// Script template to start from
        #[arg(long, conflicts_with = "event")]
        template: Option<String>,

        /// Event the script listens to
        #[arg(long, required_unless_present = "template")]
        event: Option<String>,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Enable the script right away
        #[arg(long)]
        enable: bool,
    },

    /// Import a script from a JSON file ('-' reads stdin)
    ///
    /// A script of the same shop with the same identifier is replaced.
    /// Identifiers already used by another shop are rejected.
    Import {
        /// JSON file
        file: PathBuf,

        /// Shop the script belongs to
        #[arg(long, default_value_t = 1)]
        shop: i64,
    },

    /// Export a script as JSON
    Export {
        /// Script identifier
        identifier: String,
    },

    /// Enable a script
    Enable {
        /// Script identifier
        identifier: String,
    },

    /// Disable a script
    Disable {
        /// Script identifier
        identifier: String,
    },

    /// Delete a script
    #[command(alias = "rm")]
    Delete {
        /// Script identifier
        identifier: String,
    },

    /// Check a script's bindings against its event
    Check {
        /// Script identifier
        identifier: String,
    },
}
