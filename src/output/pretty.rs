use std::collections::BTreeMap;
use std::fmt::Write as _;

use colored::Colorize;
use serde::Serialize;

use crate::notify::{
    BindingValue, Category, EventSpec, LogEntry, Notification, OutboxMessage, Priority,
    ProviderInfo, RunReport, Script, StepRecord,
};

const RULE_WIDTH: usize = 60;

fn rule() -> String {
    "─".repeat(RULE_WIDTH)
}

/// Name a value has on the wire, e.g. `stop` for `StepNext::Stop`.
fn wire_name<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn category_title(category: Category) -> &'static str {
    match category {
        Category::Condition => "Conditions",
        Category::Action => "Actions",
        Category::Event => "Events",
        Category::ScriptTemplate => "Script Templates",
    }
}

/// Format registered providers grouped by category
pub fn format_providers_pretty(providers: &[ProviderInfo]) -> String {
    if providers.is_empty() {
        return "Registry (0)\n  Nothing registered".to_string();
    }

    let mut output = String::new();
    for category in Category::ALL {
        let group: Vec<_> = providers.iter().filter(|p| p.category == category).collect();
        if group.is_empty() {
            continue;
        }

        let _ = writeln!(output, "{} ({})", category_title(category).bold(), group.len());
        output.push_str(&rule());
        output.push('\n');
        for provider in group {
            let _ = write!(output, "{:<28} {}", provider.identifier.cyan(), provider.name);
            if !provider.description.is_empty() {
                let _ = write!(output, "  {}", provider.description.dimmed());
            }
            output.push('\n');
        }
        output.push('\n');
    }

    output.trim_end().to_string()
}

/// Format event declarations with their variables
pub fn format_events_pretty(events: &[&EventSpec]) -> String {
    if events.is_empty() {
        return "Events (0)\n  No events".to_string();
    }

    let mut output = format!("Events ({})\n", events.len());
    output.push_str(&rule());
    output.push('\n');

    for spec in events {
        let _ = writeln!(output, "{} {}", spec.identifier.cyan().bold(), spec.name);
        if !spec.description.is_empty() {
            let _ = writeln!(output, "  {}", spec.description.dimmed());
        }
        for variable in spec.variables() {
            let marker = if variable.required { "*" } else { " " };
            let mut line = format!("  {marker} {:<18} {}", variable.name, variable.ty.name().yellow());
            if spec.log_target_variable() == Some(variable.name.as_str()) {
                let _ = write!(line, "  {}", "(log target)".dimmed());
            }
            output.push_str(&line);
            output.push('\n');
        }
    }

    output.trim_end().to_string()
}

fn enabled_icon(enabled: bool) -> colored::ColoredString {
    if enabled {
        "[on] ".green()
    } else {
        "[off]".dimmed()
    }
}

/// Format a list of scripts as a table
pub fn format_scripts_pretty(scripts: &[Script]) -> String {
    if scripts.is_empty() {
        return "Scripts (0)\n  No scripts".to_string();
    }

    let mut output = format!("Scripts ({})\n", scripts.len());
    output.push_str(&rule());
    output.push('\n');

    for script in scripts {
        let _ = writeln!(
            output,
            "{} {}  {}  {}  {}",
            enabled_icon(script.enabled),
            script.name.bold(),
            script.event_identifier.cyan(),
            format!("shop {}", script.shop).dimmed(),
            script.identifier.dimmed()
        );
    }

    output.trim_end().to_string()
}

fn format_step(output: &mut String, index: usize, step: &StepRecord) {
    let mut header = format!("  Step {}", index + 1);
    if !step.enabled {
        header.push_str(" (disabled)");
    }
    let _ = writeln!(
        output,
        "{}  {} {}  {} {}",
        header.bold(),
        "if".dimmed(),
        wire_name(&step.cond_op),
        "then".dimmed(),
        wire_name(&step.next)
    );

    for condition in &step.conditions {
        let _ = writeln!(output, "    ? {}{}", condition.identifier.cyan(), bindings(&condition.data));
    }
    for action in &step.actions {
        let _ = writeln!(output, "    > {}{}", action.identifier.green(), bindings(&action.data));
        if let Some(templates) = &action.template_data {
            let languages: Vec<&str> = templates.keys().map(String::as_str).collect();
            let _ = writeln!(output, "      {} {}", "templates:".dimmed(), languages.join(", "));
        }
    }
}

fn bindings(data: &BTreeMap<String, BindingValue>) -> String {
    let parts: Vec<String> = data
        .iter()
        .filter_map(|(name, value)| {
            if let Some(variable) = &value.variable {
                Some(format!("{name}=${variable}"))
            } else {
                value.constant.as_ref().map(|c| format!("{name}={c}"))
            }
        })
        .collect();

    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

/// Format a single script with its steps
pub fn format_script_pretty(script: &Script) -> String {
    let mut output = format!("{} {}\n", enabled_icon(script.enabled), script.name.bold());
    let _ = writeln!(output, "  {}: {}", "Identifier".dimmed(), script.identifier);
    let _ = writeln!(output, "  {}: {}", "Shop".dimmed(), script.shop);
    let _ = writeln!(output, "  {}: {}", "Event".dimmed(), script.event_identifier);
    if let Some(template) = &script.template {
        let _ = writeln!(output, "  {}: {}", "Template".dimmed(), template);
    }
    let _ = writeln!(
        output,
        "  {}: {}",
        "Created".dimmed(),
        script.created_on.format("%Y-%m-%d %H:%M")
    );

    let steps = script.get_serialized_steps();
    if steps.is_empty() {
        let _ = writeln!(output, "  {}", "No steps".dimmed());
    }
    for (index, step) in steps.iter().enumerate() {
        format_step(&mut output, index, step);
    }

    output.trim_end().to_string()
}

/// Format binding problems of a script
pub fn format_problems_pretty(identifier: &str, problems: &[String]) -> String {
    if problems.is_empty() {
        return format!("{} {identifier}: no problems found", "ok".green().bold());
    }

    let mut output = format!("{} {identifier}: {} problem(s)\n", "!".yellow().bold(), problems.len());
    for problem in problems {
        let _ = writeln!(output, "  - {problem}");
    }
    output.trim_end().to_string()
}

/// Format the outcome of publishing an event
pub fn format_run_report_pretty(report: &RunReport) -> String {
    let mut output = format!(
        "{} {} for shop {}: {} script(s)\n",
        "Event".bold(),
        report.event_identifier.cyan(),
        report.shop,
        report.scripts.len()
    );
    if report.scripts.is_empty() {
        output.push_str("  No enabled scripts listen to this event");
        return output;
    }
    output.push_str(&rule());
    output.push('\n');

    for outcome in &report.scripts {
        match (&outcome.report, &outcome.error) {
            (Some(run), _) => {
                let _ = write!(
                    output,
                    "{} {}  {}/{} step(s) executed",
                    "ok".green(),
                    outcome.name.bold(),
                    run.steps_executed,
                    run.steps_evaluated
                );
                if let Some(step) = run.stopped_at {
                    let _ = write!(output, ", stopped at step {}", step + 1);
                }
                output.push('\n');
            }
            (None, error) => {
                let _ = writeln!(
                    output,
                    "{} {}  {}",
                    "failed".red(),
                    outcome.name.bold(),
                    error.as_deref().unwrap_or_default()
                );
            }
        }
        for message in &outcome.messages {
            let _ = writeln!(output, "    {}", message.dimmed());
        }
    }

    let _ = write!(
        output,
        "{} succeeded, {} failed",
        report.succeeded().to_string().green(),
        report.failed().to_string().red()
    );
    output
}

/// Format the mail outbox
pub fn format_outbox_pretty(messages: &[OutboxMessage]) -> String {
    if messages.is_empty() {
        return "Outbox (0)\n  No messages".to_string();
    }

    let mut output = format!("Outbox ({})\n", messages.len());
    output.push_str(&rule());
    output.push('\n');

    for queued in messages {
        let message = &queued.message;
        let _ = writeln!(
            output,
            "#{} {}  {}",
            queued.id,
            message.subject.bold(),
            queued.created_on.format("%Y-%m-%d %H:%M").to_string().dimmed()
        );
        let _ = writeln!(output, "  {}: {}", "To".dimmed(), message.to.join(", "));
        if let Some(from) = &message.from {
            let _ = writeln!(output, "  {}: {}", "From".dimmed(), from);
        }
        if !message.cc.is_empty() {
            let _ = writeln!(output, "  {}: {}", "Cc".dimmed(), message.cc.join(", "));
        }
        if !message.bcc.is_empty() {
            let _ = writeln!(output, "  {}: {}", "Bcc".dimmed(), message.bcc.join(", "));
        }
        if !message.reply_to.is_empty() {
            let _ = writeln!(output, "  {}: {}", "Reply-To".dimmed(), message.reply_to.join(", "));
        }
        for line in message.body.lines() {
            let _ = writeln!(output, "  | {line}");
        }
    }

    output.trim_end().to_string()
}

fn priority_label(priority: Priority) -> colored::ColoredString {
    match priority {
        Priority::Low => priority.display_name().dimmed(),
        Priority::Normal => priority.display_name().normal(),
        Priority::High => priority.display_name().yellow(),
        Priority::Critical => priority.display_name().red().bold(),
    }
}

/// Format in-app notifications
pub fn format_notifications_pretty(notifications: &[Notification]) -> String {
    if notifications.is_empty() {
        return "Notifications (0)\n  No notifications".to_string();
    }

    let mut output = format!("Notifications ({})\n", notifications.len());
    output.push_str(&rule());
    output.push('\n');

    for notification in notifications {
        let icon = if notification.read_on.is_some() { "[x]".dimmed() } else { "[ ]".white() };
        let recipient = notification
            .recipient
            .as_ref()
            .map_or_else(|| "admins".to_string(), ToString::to_string);
        let _ = write!(
            output,
            "{icon} #{} {}  {}  {}",
            notification.id,
            notification.message.bold(),
            priority_label(notification.priority),
            recipient.cyan()
        );
        if let Some(url) = &notification.url {
            let _ = write!(output, "  {}", url.dimmed());
        }
        output.push('\n');
    }

    output.trim_end().to_string()
}

/// Format log entries of one entity
pub fn format_log_entries_pretty(target: &str, entries: &[LogEntry]) -> String {
    if entries.is_empty() {
        return format!("Log entries of {target} (0)\n  No entries");
    }

    let mut output = format!("Log entries of {target} ({})\n", entries.len());
    output.push_str(&rule());
    output.push('\n');

    for entry in entries {
        let _ = write!(
            output,
            "{}  {:<8} {}",
            entry.created_on.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            entry.kind.as_str().yellow(),
            entry.message
        );
        if let Some(identifier) = &entry.identifier {
            let _ = write!(output, "  {}", identifier.cyan());
        }
        output.push('\n');
    }

    output.trim_end().to_string()
}
