//! Dashboard data: several collections fetched concurrently

use chrono::NaiveDate;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::fees::{summarize_fees, FeeSummary};
use crate::api::{ApiError, SchoolApi};
use crate::models::{Record, Resource};

const RECENT_NOTICES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Any failed fetch fails the whole dashboard
    Strict,
    /// Failed fetches degrade to empty collections
    Lenient,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardData {
    pub students: usize,
    pub teachers: usize,
    pub classes: usize,
    pub fees: FeeSummary,
    pub recent_notices: Vec<Record>,
    /// Collections that could not be loaded in lenient mode
    pub degraded: Vec<Resource>,
}

pub async fn load_dashboard(
    api: &dyn SchoolApi,
    mode: FetchMode,
    today: NaiveDate,
) -> Result<DashboardData, ApiError> {
    let (students, teachers, classes, fees, notices) = match mode {
        FetchMode::Strict => futures::try_join!(
            api.list(Resource::Students),
            api.list(Resource::Teachers),
            api.list(Resource::Classes),
            api.list(Resource::Fees),
            api.list(Resource::Notices),
        )?,
        FetchMode::Lenient => {
            let (students, teachers, classes, fees, notices) = futures::join!(
                api.list(Resource::Students),
                api.list(Resource::Teachers),
                api.list(Resource::Classes),
                api.list(Resource::Fees),
                api.list(Resource::Notices),
            );
            let mut degraded = Vec::new();
            let data = (
                or_empty(Resource::Students, students, &mut degraded)?,
                or_empty(Resource::Teachers, teachers, &mut degraded)?,
                or_empty(Resource::Classes, classes, &mut degraded)?,
                or_empty(Resource::Fees, fees, &mut degraded)?,
                or_empty(Resource::Notices, notices, &mut degraded)?,
            );
            let mut dashboard = assemble(data, today);
            dashboard.degraded = degraded;
            return Ok(dashboard);
        }
    };

    Ok(assemble((students, teachers, classes, fees, notices), today))
}

type Collections = (Vec<Record>, Vec<Record>, Vec<Record>, Vec<Record>, Vec<Record>);

fn assemble(
    (students, teachers, classes, fees, mut notices): Collections,
    today: NaiveDate,
) -> DashboardData {
    // ISO timestamps sort chronologically as text
    notices.sort_by(|a, b| {
        b.text("created_at")
            .cmp(&a.text("created_at"))
            .then(b.id.cmp(&a.id))
    });
    notices.truncate(RECENT_NOTICES);

    info!(
        "Dashboard loaded: {} students, {} teachers, {} classes, {} fees",
        students.len(),
        teachers.len(),
        classes.len(),
        fees.len()
    );

    DashboardData {
        students: students.len(),
        teachers: teachers.len(),
        classes: classes.len(),
        fees: summarize_fees(&fees, today),
        recent_notices: notices,
        degraded: Vec::new(),
    }
}

/// A lost session still fails the dashboard so the user is sent to log in
fn or_empty(
    resource: Resource,
    result: Result<Vec<Record>, ApiError>,
    degraded: &mut Vec<Resource>,
) -> Result<Vec<Record>, ApiError> {
    match result {
        Ok(records) => Ok(records),
        Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized),
        Err(e) => {
            warn!("Dashboard could not load {}: {}", resource, e);
            degraded.push(resource);
            Ok(Vec::new())
        }
    }
}

/// Fixed-interval refresh schedule, no backoff
#[derive(Debug, Clone)]
pub struct RefreshTimer {
    interval: Duration,
    last: Option<Instant>,
}

impl RefreshTimer {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last: None }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match self.last {
            None => true,
            Some(last) => now.duration_since(last) >= self.interval,
        }
    }

    pub fn mark(&mut self, now: Instant) {
        self.last = Some(now);
    }
}
