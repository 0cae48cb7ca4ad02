//! Analytics events and error reports.
//!
//! Callers pass an explicit [`SessionContext`] instead of relying on ambient
//! session state. Recording never fails the caller: storage problems are
//! logged and swallowed.

use crate::storage::{events, Database};
use common::model::admin::ErrorSeverity;
use log::{error, info, warn};
use serde_json::Value;

pub const MAP_CREATION_STARTED: &str = "map_creation_started";
pub const MAP_CREATION_COMPLETED: &str = "map_creation_completed";
pub const MAP_CREATION_ERROR: &str = "map_creation_error";
pub const MAP_DOWNLOAD_COMPLETED: &str = "map_download_completed";

/// Identity of the browser session an action belongs to, if known.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    session_id: Option<String>,
}

impl SessionContext {
    pub fn new(session_id: Option<String>) -> Self {
        Self {
            session_id: session_id.filter(|s| !s.trim().is_empty()),
        }
    }

    #[cfg(test)]
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }
}

#[derive(Clone)]
pub struct Instrumentation {
    db: Database,
}

impl Instrumentation {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn track(&self, ctx: &SessionContext, event_name: &str, data: Value) {
        info!("event {} (session {:?})", event_name, ctx.session_id());
        let result = self
            .db
            .open()
            .and_then(|conn| events::insert_event(&conn, ctx.session_id(), event_name, &data));
        if let Err(e) = result {
            warn!("Could not record event {}: {}", event_name, e);
        }
    }

    pub fn report_error(
        &self,
        ctx: &SessionContext,
        category: &str,
        severity: ErrorSeverity,
        message: &str,
        metadata: Value,
    ) {
        match severity {
            ErrorSeverity::Low | ErrorSeverity::Medium => {
                warn!("[{}] {} (session {:?})", category, message, ctx.session_id())
            }
            ErrorSeverity::High | ErrorSeverity::Critical => {
                error!("[{}] {} (session {:?})", category, message, ctx.session_id())
            }
        }
        let result = self.db.open().and_then(|conn| {
            events::insert_error_report(
                &conn,
                ctx.session_id(),
                category,
                severity,
                message,
                &metadata,
            )
        });
        if let Err(e) = result {
            warn!("Could not record error report: {}", e);
        }
    }
}
