//! Refresh Service
//!
//! Recomputes signal records for the whole security universe: fetches bars
//! per batch, runs the detector over every bar, estimates sell returns, and
//! upserts one security's signal rows per transaction. Batches run on
//! bounded blocking workers; symbols partition disjointly across batches, so
//! no two workers ever touch the same bar.

use crate::config::RefreshConfig;
use crate::db::sqlite::models::{Bar, SignalRecord};
use crate::db::sqlite::SqliteDb;
use crate::error::{AppError, Result};
use crate::signal::{detect, estimate_sell_return};
use crate::state::AppState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Refresh request options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshOptions {
    /// Trailing trading dates to cover
    pub lookback_days: usize,
    /// Symbols per batch
    pub batch_size: usize,
    /// Concurrent batch workers
    pub concurrency: usize,
    /// Detector look-back width in trading days
    pub window: usize,
    /// Scan every symbol, not just those with bars inside the window.
    /// Catches securities whose trading resumed, at higher cost.
    pub exhaustive: bool,
}

impl RefreshOptions {
    pub fn from_config(config: &RefreshConfig) -> Self {
        Self {
            lookback_days: config.lookback_days,
            batch_size: config.batch_size,
            concurrency: config.concurrency,
            window: config.window,
            exhaustive: false,
        }
    }
}

/// Outcome of a refresh run
#[derive(Debug, Clone, Serialize)]
pub struct RefreshSummary {
    pub total_symbols: usize,
    pub processed_symbols: usize,
    /// Symbols present in the universe but without in-window bars
    pub skipped_symbols: usize,
    pub symbols_with_signals: usize,
    /// Signal rows upserted across all processed symbols
    pub signals_written: usize,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Cooperative cancellation for a refresh run.
///
/// Cancelling stops the run between batches; committed batches stay durable.
#[derive(Debug, Clone, Default)]
pub struct RefreshHandle {
    cancelled: Arc<AtomicBool>,
}

impl RefreshHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct BatchOutcome {
    processed: usize,
    skipped: usize,
    with_signals: usize,
    signals_written: usize,
}

/// Refresh service for business logic
pub struct RefreshService;

impl RefreshService {
    /// Recompute signal records across the universe.
    pub async fn refresh(state: &AppState, options: RefreshOptions) -> Result<RefreshSummary> {
        Self::refresh_with_handle(state, options, &RefreshHandle::new()).await
    }

    /// Recompute with an external cancellation handle.
    pub async fn refresh_with_handle(
        state: &AppState,
        options: RefreshOptions,
        handle: &RefreshHandle,
    ) -> Result<RefreshSummary> {
        let started_at = Utc::now();

        let dates = state.sqlite.latest_trading_dates(options.lookback_days)?;
        let cutoff = match dates.last() {
            Some(date) => date.clone(),
            None => return Err(AppError::NoTradingDates),
        };
        info!(
            "Refreshing signals over {} trading dates, cutoff {}",
            dates.len(),
            cutoff
        );

        let symbols = if options.exhaustive {
            state.sqlite.list_symbols()?
        } else {
            state.sqlite.list_active_symbols(&cutoff)?
        };
        let total_symbols = symbols.len();
        info!(
            "{} symbols to process ({} mode), batch size {}",
            total_symbols,
            if options.exhaustive { "exhaustive" } else { "active-only" },
            options.batch_size
        );

        let batch_size = options.batch_size.max(1);
        let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
        let mut workers = Vec::new();

        for (batch_idx, batch) in symbols.chunks(batch_size).enumerate() {
            if handle.is_cancelled() {
                info!("Refresh cancelled before batch {}", batch_idx + 1);
                break;
            }

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| AppError::Internal(format!("Worker pool closed: {e}")))?;

            let db = Arc::clone(&state.sqlite);
            let batch: Vec<String> = batch.to_vec();
            let cutoff = cutoff.clone();
            let cancelled = Arc::clone(&handle.cancelled);

            let window = options.window;
            workers.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                if cancelled.load(Ordering::SeqCst) {
                    return Ok(None);
                }
                match process_batch(&db, &batch, &cutoff, window, batch_idx) {
                    Ok(outcome) => Ok::<_, AppError>(Some(outcome)),
                    Err(e) => {
                        // Flag before the permit drops so no later batch
                        // starts once a batch has hit storage trouble
                        cancelled.store(true, Ordering::SeqCst);
                        Err(e)
                    }
                }
            }));
        }

        let mut summary = RefreshSummary {
            total_symbols,
            processed_symbols: 0,
            skipped_symbols: 0,
            symbols_with_signals: 0,
            signals_written: 0,
            cancelled: false,
            started_at,
            finished_at: started_at,
        };
        let mut first_error = None;

        for worker in workers {
            let result = worker
                .await
                .map_err(|e| AppError::Internal(format!("Batch worker panicked: {e}")))?;

            match result {
                Ok(Some(outcome)) => {
                    summary.processed_symbols += outcome.processed;
                    summary.skipped_symbols += outcome.skipped;
                    summary.symbols_with_signals += outcome.with_signals;
                    summary.signals_written += outcome.signals_written;
                }
                Ok(None) => {}
                Err(e) => {
                    // Fatal for the remainder of the run; committed batches
                    // stay durable. The failing worker already raised the
                    // cancellation flag.
                    warn!("Batch aborted: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        summary.cancelled = handle.is_cancelled();
        summary.finished_at = Utc::now();
        info!(
            "Refresh complete: {}/{} symbols processed, {} with signals, {} rows written{}",
            summary.processed_symbols,
            summary.total_symbols,
            summary.symbols_with_signals,
            summary.signals_written,
            if summary.cancelled { " (cancelled)" } else { "" }
        );

        Ok(summary)
    }
}

/// Fetch one batch's bars, compute signals per symbol, and commit each
/// symbol's rows as a unit.
fn process_batch(
    db: &SqliteDb,
    symbols: &[String],
    cutoff: &str,
    window: usize,
    batch_idx: usize,
) -> Result<BatchOutcome> {
    let bars = db.fetch_bars(symbols, cutoff)?;
    let groups = group_by_symbol(bars);

    let mut outcome = BatchOutcome {
        skipped: symbols.len() - groups.len(),
        ..BatchOutcome::default()
    };
    if outcome.skipped > 0 {
        debug!(
            "Batch {}: {} symbols without in-window bars, skipped",
            batch_idx + 1,
            outcome.skipped
        );
    }

    for (symbol, symbol_bars) in groups {
        let records = compute_symbol_signals(&symbol_bars, window);

        // One transaction per symbol, signal or not; an empty commit has
        // nothing to undo.
        db.upsert_signals(&records)?;

        outcome.processed += 1;
        if records.iter().any(|r| r.buy_price > 0.0 || r.sell_price > 0.0) {
            outcome.with_signals += 1;
            debug!("{}: {} signal rows committed", symbol, records.len());
        }
        outcome.signals_written += records.len();
    }

    Ok(outcome)
}

/// Group a symbol-then-date ordered bar list into per-symbol runs,
/// preserving date order within each run.
fn group_by_symbol(bars: Vec<Bar>) -> Vec<(String, Vec<Bar>)> {
    let mut groups: Vec<(String, Vec<Bar>)> = Vec::new();

    for bar in bars {
        match groups.last_mut() {
            Some((symbol, group)) if *symbol == bar.symbol => group.push(bar),
            _ => groups.push((bar.symbol.clone(), vec![bar])),
        }
    }

    groups
}

/// Run the detector at every index of one symbol's bar sequence and attach
/// return estimates to sells.
fn compute_symbol_signals(bars: &[Bar], window: usize) -> Vec<SignalRecord> {
    let mut records = Vec::new();

    for (i, bar) in bars.iter().enumerate() {
        let detection = detect(bars, i, window);
        if !detection.fired() {
            continue;
        }

        // The detector only fires on a fully populated window
        let close = bar.close.unwrap_or_default();
        let earnings_rate = if detection.sell {
            estimate_sell_return(bars, i)
        } else {
            0.0
        };

        records.push(SignalRecord {
            bar_id: bar.id,
            buy_price: if detection.buy { close } else { 0.0 },
            sell_price: if detection.sell { close } else { 0.0 },
            earnings_rate,
        });
    }

    records
}
