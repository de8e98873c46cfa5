//! Calendar event commands for CLI.
//!
//! Only fixed commitments are added by hand; managed events come from
//! scheduling runs.

use chrono::{DateTime, NaiveDateTime, Utc};
use clap::Subcommand;
use timeblock_core::Event;

#[derive(Subcommand)]
pub enum EventAction {
    /// Add a fixed event
    Add {
        /// Event ID
        id: String,
        /// Event title
        title: String,
        /// Start, UTC (YYYY-MM-DDTHH:MM or RFC 3339)
        #[arg(long, value_parser = parse_instant)]
        start: DateTime<Utc>,
        /// End, UTC (YYYY-MM-DDTHH:MM or RFC 3339)
        #[arg(long, value_parser = parse_instant)]
        end: DateTime<Utc>,
    },
    /// List stored events in start order
    List {
        /// Only managed events
        #[arg(long, conflicts_with = "fixed")]
        managed: bool,
        /// Only fixed events
        #[arg(long)]
        fixed: bool,
    },
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid instant '{raw}' (expected YYYY-MM-DDTHH:MM)"))
}

pub fn run(action: EventAction) -> Result<(), Box<dyn std::error::Error>> {
    let (_, store) = super::open_store()?;

    match action {
        EventAction::Add {
            id,
            title,
            start,
            end,
        } => {
            let event = Event::fixed(id, title, start, end)?;
            store.insert_event(&event)?;
            println!("Event added: {}", event.id);
        }
        EventAction::List { managed, fixed } => {
            let mut events: Vec<Event> = store
                .events()?
                .into_iter()
                .filter(|e| (!managed || e.is_managed()) && (!fixed || e.is_fixed()))
                .collect();
            events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
            super::print_json(&events)?;
        }
    }
    Ok(())
}
