use colored::Colorize;
use comfy_table::{Cell, Color, Table, presets::UTF8_FULL};
use std::collections::HashMap;

use crate::core::poller::UserPollOutcome;
use crate::db::ScheduleReplacement;
use crate::models::dose::{DoseEvent, DoseStatus};
use crate::models::medicine::{Medicine, format_time_slots};

const TS: &str = "%Y-%m-%d %H:%M";

fn status_color(s: DoseStatus) -> Color {
    match s {
        DoseStatus::Pending => Color::Yellow,
        DoseStatus::Sent => Color::Cyan,
        DoseStatus::Taken => Color::Green,
        DoseStatus::Missed => Color::Red,
    }
}

/// One-line summary of a medicine definition.
pub fn format_medicine(m: &Medicine) -> String {
    let mut line = format!(
        "{} | {} at {} from {} | {} doses",
        m.name.bold(),
        m.frequency,
        format_time_slots(&m.time_slots),
        m.start_date,
        m.total_quantity
    );
    if let Some(ref d) = m.dosage {
        line.push_str(&format!(" | {d}"));
    }
    if !m.reminders_enabled {
        line.push_str(" | reminders off");
    }
    if !m.active {
        line.push_str(&format!(" {}", "(stopped)".dimmed()));
    }
    line
}

pub fn format_medicine_added(m: &Medicine, scheduled: usize) -> String {
    format!(
        "Added {}\n{} dose event(s) scheduled (id {})",
        format_medicine(m),
        scheduled,
        m.id
    )
}

pub fn format_medicine_edited(m: &Medicine, r: &ScheduleReplacement) -> String {
    format!(
        "Updated {}\nReplaced {} upcoming dose(s) with {}",
        format_medicine(m),
        r.removed,
        r.inserted
    )
}

pub fn format_medicine_table(meds: &[Medicine]) -> String {
    if meds.is_empty() {
        return "No medicines.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Name", "Dosage", "Frequency", "Times", "Start", "Qty", "Status",
    ]);
    for m in meds {
        let status = if m.active {
            Cell::new("active").fg(Color::Green)
        } else {
            Cell::new("stopped").fg(Color::DarkGrey)
        };
        table.add_row(vec![
            Cell::new(&m.name),
            Cell::new(m.dosage.as_deref().unwrap_or("-")),
            Cell::new(m.frequency.to_string()),
            Cell::new(format_time_slots(&m.time_slots)),
            Cell::new(m.start_date.to_string()),
            Cell::new(m.total_quantity),
            status,
        ]);
    }
    table.to_string()
}

/// Dose events as a table; `names` maps medicine ids to display names.
pub fn format_dose_table(doses: &[DoseEvent], names: &HashMap<String, String>) -> String {
    if doses.is_empty() {
        return "No dose events.".to_string();
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Scheduled", "Medicine", "Status", "Acted", "Id"]);
    for d in doses {
        let name = names
            .get(&d.medicine_id)
            .map(String::as_str)
            .unwrap_or("?");
        let mut scheduled = d.scheduled_at.format(TS).to_string();
        if d.snooze_count > 0 {
            scheduled.push_str(&format!(" (snoozed x{})", d.snooze_count));
        }
        table.add_row(vec![
            Cell::new(scheduled),
            Cell::new(name),
            Cell::new(d.status.to_string()).fg(status_color(d.status)),
            Cell::new(
                d.action_at
                    .map(|t| t.format(TS).to_string())
                    .unwrap_or_else(|| "-".into()),
            ),
            Cell::new(&d.id),
        ]);
    }
    table.to_string()
}

pub fn format_dose_change(d: &DoseEvent, medicine: &str) -> String {
    let status = match d.status {
        DoseStatus::Taken => "taken".green(),
        DoseStatus::Missed => "missed".red(),
        DoseStatus::Sent => "sent".cyan(),
        DoseStatus::Pending => "pending".yellow(),
    };
    match d.status {
        DoseStatus::Pending => format!(
            "{} {} -> reminder at {}",
            medicine,
            status,
            d.scheduled_at.format(TS)
        ),
        _ => format!(
            "{} {} ({} dose)",
            medicine,
            status,
            d.original_scheduled_at.format(TS)
        ),
    }
}

pub fn format_poll(outcomes: &[UserPollOutcome]) -> String {
    if outcomes.is_empty() {
        return "No reminders due.".to_string();
    }
    let mut lines = Vec::new();
    for o in outcomes {
        match (&o.report, &o.error) {
            (Some(r), _) => {
                let mut line = format!(
                    "{}: {} due, {} sent, {} failed",
                    o.user_id, r.due, r.sent, r.failed
                );
                if r.aborted {
                    line.push_str(&format!(" {}", "(scan timed out)".yellow()));
                }
                lines.push(line);
            }
            (None, Some(e)) => lines.push(format!("{}: {}", o.user_id, e.message.red())),
            (None, None) => lines.push(format!("{}: nothing to do", o.user_id)),
        }
    }
    lines.join("\n")
}
