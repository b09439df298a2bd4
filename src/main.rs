use anyhow::{anyhow, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use findlife::config::AppConfig;
use findlife::domain::schedule::ScheduleTab;
use findlife::repository::{database, Repository};
use findlife::services::{HttpCallGateway, SessionManager};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let expert_id: Uuid = args
        .next()
        .ok_or_else(|| anyhow!("usage: findlife <expert-uuid> [today|upcoming|history]"))?
        .parse()?;
    let tab = match args.next().as_deref() {
        None => ScheduleTab::Today,
        Some(s) => {
            ScheduleTab::parse(s).ok_or_else(|| anyhow!("unknown tab '{}', expected today|upcoming|history", s))?
        }
    };

    let config = AppConfig::load()?;
    let pool = database::init_database(&config.database_path).await?;
    let repository = Arc::new(Repository::new(pool));
    let gateway = Arc::new(HttpCallGateway::new(&config.gateway)?);
    let manager = SessionManager::new(repository, gateway);

    let now = Utc::now();
    let today = now.date_naive();
    let snapshot = manager.schedule(expert_id, tab, today, now).await?;

    for rejected in &snapshot.rejected {
        warn!("Skipped malformed slot: {}", rejected.reason);
    }

    if snapshot.views.is_empty() {
        println!("No sessions ({} tab).", tab.as_str());
        return Ok(());
    }

    for view in &snapshot.views {
        let session = &view.session;
        println!(
            "{}  {} - {}  {:>3} min  [{}]{}{}",
            session.expert_date,
            session.combined_start.format("%H:%M"),
            session.combined_end.format("%H:%M"),
            session.combined_duration_minutes,
            view.status.as_str(),
            if view.can_start { "  (startable)" } else { "" },
            if session.is_combined() {
                format!("  ({} slots)", session.member_ids.len())
            } else {
                String::new()
            },
        );
    }

    Ok(())
}
