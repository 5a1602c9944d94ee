//! In-process replacement for the external cron. Only started when `DG_RUN_SCHEDULER` is set.
use std::time::Duration;

use chrono::Utc;
use deposit_engine::{events::EventProducers, ReminderApi, SqliteDatabase, SweeperApi};
use log::*;
use tokio::task::JoinHandle;

use crate::integrations::expo::ServerPushNotifier;

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);
pub const REMINDER_INTERVAL: Duration = Duration::from_secs(3 * 60 * 60);

/// Starts the hourly sweeper: lapsed reservations are recovered and expired trials are closed. Do not await the
/// returned JoinHandle, as it will run indefinitely.
pub fn start_sweeper(db: SqliteDatabase, producers: EventProducers) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(SWEEP_INTERVAL);
        let api = SweeperApi::new(db, producers);
        info!("🕰️ Reservation sweeper started");
        loop {
            timer.tick().await;
            info!("🕰️ Running reservation recovery job");
            match api.recover_expired_reservations(Utc::now()).await {
                Ok(result) => {
                    info!("🕰️ {} reservations recovered, {} notified", result.recovered_count(), result.notified);
                    debug!("🕰️ {} units returned to listings", result.units_released());
                },
                Err(e) => error!("🕰️ Error running reservation recovery job: {e}"),
            }
            match api.expire_trials(Utc::now()).await {
                Ok(result) => info!("🕰️ {} trials expired", result.count()),
                Err(e) => error!("🕰️ Error running trial expiry job: {e}"),
            }
        }
    })
}

/// Starts the reminder dispatcher, which runs every three hours. Do not await the returned JoinHandle.
pub fn start_reminders(db: SqliteDatabase, push: ServerPushNotifier) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(REMINDER_INTERVAL);
        let api = ReminderApi::new(db, push);
        info!("🕰️ Reminder dispatcher started");
        loop {
            timer.tick().await;
            match api.send_deposit_reminders(Utc::now()).await {
                Ok(report) => debug!("🕰️ Reminder run sent {} reminders", report.total()),
                Err(e) => error!("🕰️ Error running reminder job: {e}"),
            }
        }
    })
}
