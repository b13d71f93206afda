use kindred_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Block, NewBlock, NewReport, Report, ReportStatus};
use crate::services::accounts;
use crate::store::{Store, StoreError};

/// Fails with `UserBlocked` if either user has blocked the other.
pub fn ensure_not_blocked(store: &dyn Store, a: i32, b: i32) -> AppResult<()> {
    if store.find_block(a, b)?.is_some() || store.find_block(b, a)?.is_some() {
        return Err(AppError::new(
            ErrorCode::UserBlocked,
            "interaction is not allowed between these users",
        ));
    }
    Ok(())
}

pub fn block_user(
    store: &dyn Store,
    blocker_id: i32,
    blocked_id: i32,
    reason: Option<String>,
) -> AppResult<Block> {
    if blocker_id == blocked_id {
        return Err(AppError::new(ErrorCode::CannotBlockSelf, "you cannot block yourself"));
    }
    accounts::require_user(store, blocker_id)?;
    accounts::require_user(store, blocked_id)?;

    let block = store
        .create_block(NewBlock {
            blocker_id,
            blocked_id,
            reason: reason.filter(|r| !r.trim().is_empty()),
        })
        .map_err(|e| match e {
            StoreError::Conflict(_) => {
                AppError::new(ErrorCode::AlreadyBlocked, "user is already blocked")
            }
            other => other.into(),
        })?;

    tracing::info!(block_id = block.id, blocker_id, blocked_id, "user blocked");
    Ok(block)
}

pub fn blocks_for_user(store: &dyn Store, user_id: i32) -> AppResult<Vec<Block>> {
    Ok(store.blocks_by(user_id)?)
}

pub fn report_user(
    store: &dyn Store,
    reporter_id: i32,
    reported_id: i32,
    reason: String,
    description: Option<String>,
) -> AppResult<Report> {
    if reporter_id == reported_id {
        return Err(AppError::new(ErrorCode::CannotReportSelf, "you cannot report yourself"));
    }
    if reason.trim().is_empty() {
        return Err(AppError::validation("report reason is required"));
    }
    accounts::require_user(store, reporter_id)?;
    accounts::require_user(store, reported_id)?;

    let report = store.create_report(NewReport {
        reporter_id,
        reported_id,
        reason,
        description: description.filter(|d| !d.trim().is_empty()),
        status: ReportStatus::Pending.as_str().to_string(),
    })?;

    tracing::info!(report_id = report.id, reporter_id, reported_id, "report filed");
    Ok(report)
}

pub fn reports_by_user(store: &dyn Store, user_id: i32) -> AppResult<Vec<Report>> {
    Ok(store.reports_by(user_id)?)
}

/// Moves a report forward to `next`. The write only lands if the status is
/// still the one that was checked; if another update got there first the
/// transition is re-checked against the new status.
pub fn update_report_status(store: &dyn Store, id: i32, next: ReportStatus) -> AppResult<Report> {
    loop {
        let report = store
            .get_report(id)?
            .ok_or_else(|| AppError::new(ErrorCode::ReportNotFound, format!("report {id} not found")))?;

        let current: ReportStatus = report
            .status
            .parse()
            .map_err(|e: String| AppError::internal(format!("report {id}: {e}")))?;

        if !current.can_advance_to(next) {
            return Err(AppError::new(
                ErrorCode::InvalidReportTransition,
                format!("report cannot move from {current} to {next}"),
            ));
        }

        if let Some(updated) = store.advance_report_status(id, current.as_str(), next.as_str())? {
            tracing::info!(report_id = id, from = %current, to = %next, "report status changed");
            return Ok(updated);
        }
        tracing::debug!(report_id = id, "report status changed concurrently, re-checking");
    }
}
