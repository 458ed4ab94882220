use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use time::{Date, OffsetDateTime, Time};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::{
    alerts::{self, AlertFlags, AlertOutcome},
    templates,
};
use crate::{
    email_config::{
        dto::{parse_summary_time, DEFAULT_SUMMARY_TIME},
        repo_types::EmailConfig,
    },
    state::AppState,
};

/// Longest single sleep, so configuration changes are picked up.
const MAX_NAP: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    #[serde(serialize_with = "iso_date")]
    pub date: Date,
    pub in_stock: i64,
    pub low_stock: i64,
    pub out_of_stock: i64,
    pub today_transactions: i64,
    pub stock_in: i64,
    pub stock_out: i64,
    pub purchases: i64,
    pub revenue: Decimal,
}

fn iso_date<S: serde::Serializer>(date: &Date, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(date)
}

impl DailySummary {
    /// Stock levels right now, and activity during `date` (UTC).
    pub async fn compute(db: &PgPool, date: Date) -> sqlx::Result<DailySummary> {
        let (in_stock, low_stock, out_of_stock): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FILTER (WHERE stock > min_stock),
                   COUNT(*) FILTER (WHERE stock > 0 AND stock <= min_stock),
                   COUNT(*) FILTER (WHERE stock = 0)
            FROM products
            "#,
        )
        .fetch_one(db)
        .await?;

        let start = date.midnight().assume_utc();
        let end = start + time::Duration::days(1);
        let (today_transactions, stock_in, stock_out, purchases, revenue): (i64, i64, i64, i64, Decimal) =
            sqlx::query_as(
                r#"
                SELECT COUNT(*),
                       COUNT(*) FILTER (WHERE kind = 'stock-in'),
                       COUNT(*) FILTER (WHERE kind = 'stock-out'),
                       COUNT(*) FILTER (WHERE kind = 'purchase'),
                       COALESCE(SUM(amount) FILTER (WHERE kind = 'purchase'), 0)
                FROM transactions
                WHERE created_at >= $1 AND created_at < $2
                "#,
            )
            .bind(start)
            .bind(end)
            .fetch_one(db)
            .await?;

        Ok(DailySummary {
            date,
            in_stock,
            low_stock,
            out_of_stock,
            today_transactions,
            stock_in,
            stock_out,
            purchases,
            revenue,
        })
    }
}

/// Compute today's summary and email it to the admin recipients.
pub async fn send_daily_summary(state: &AppState) -> anyhow::Result<(DailySummary, AlertOutcome)> {
    let summary = DailySummary::compute(&state.db, OffsetDateTime::now_utc().date()).await?;
    let to = alerts::recipients(state).await?;
    let outcome = alerts::deliver(&state.mailer, true, to, |to| {
        templates::daily_summary(&summary, to)
    })
    .await;
    Ok((summary, outcome))
}

/// Next time strictly after `now` at which the summary is due.
pub fn next_fire(now: OffsetDateTime, at: Time) -> OffsetDateTime {
    let today = now.replace_time(at);
    if today > now {
        today
    } else {
        today + time::Duration::days(1)
    }
}

fn configured_time(cfg: Option<&EmailConfig>) -> Time {
    cfg.and_then(|c| parse_summary_time(&c.daily_summary_time))
        .or_else(|| parse_summary_time(DEFAULT_SUMMARY_TIME))
        .unwrap_or(Time::MIDNIGHT)
}

pub fn spawn_scheduler(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("daily summary scheduler started");
        let mut due: Option<OffsetDateTime> = None;
        loop {
            let cfg = match EmailConfig::active(&state.db).await {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!(error = %e, "daily summary: could not load configuration");
                    None
                }
            };
            let now = OffsetDateTime::now_utc();

            if let Some(at) = due.filter(|at| *at <= now) {
                if AlertFlags::from(cfg.as_ref()).daily_summary {
                    match send_daily_summary(&state).await {
                        Ok((_, outcome)) => info!(scheduled = %at, outcome = outcome.status(), "daily summary run"),
                        Err(e) => error!(error = %e, "daily summary failed"),
                    }
                }
            }

            let next = next_fire(OffsetDateTime::now_utc(), configured_time(cfg.as_ref()));
            due = Some(next);
            let wait = Duration::try_from(next - OffsetDateTime::now_utc()).unwrap_or(Duration::ZERO);
            tokio::time::sleep(wait.min(MAX_NAP)).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use time::macros::{datetime, time};

    use super::*;

    #[test]
    fn fires_later_today_when_time_is_ahead() {
        let now = datetime!(2024-05-02 09:30 UTC);
        assert_eq!(next_fire(now, time!(18:00)), datetime!(2024-05-02 18:00 UTC));
    }

    #[test]
    fn rolls_to_tomorrow_when_time_has_passed() {
        let now = datetime!(2024-05-02 18:00 UTC);
        assert_eq!(next_fire(now, time!(18:00)), datetime!(2024-05-03 18:00 UTC));

        let now = datetime!(2024-12-31 23:59 UTC);
        assert_eq!(next_fire(now, time!(0:00)), datetime!(2025-01-01 0:00 UTC));
    }

    #[test]
    fn falls_back_to_default_time() {
        assert_eq!(configured_time(None), time!(18:00));
    }
}
