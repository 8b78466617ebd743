//! Backward pagination over the full-transactions endpoint.
//!
//! The cursor, the dedup set and the accumulator live in one `FetchSession`
//! value, so a session depends on nothing but the `KaspaApi` it is driven with.

use crate::datasource::{KaspaApi, KaspaApiError, PageQuery, TransactionPage, MAX_PAGE_SIZE};
use crate::domain::{Address, TimeMs, TransactionRecord};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_TRANSACTIONS: usize = 10_000;

/// Inclusive block-time bounds; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
    pub from: Option<TimeMs>,
    pub to: Option<TimeMs>,
}

impl DateWindow {
    pub fn new(from: Option<TimeMs>, to: Option<TimeMs>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, t: TimeMs) -> bool {
        self.from.map_or(true, |from| t >= from) && self.to.map_or(true, |to| t <= to)
    }

    pub fn is_valid(&self) -> bool {
        match (self.from, self.to) {
            (Some(from), Some(to)) => from <= to,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub page_size: usize,
    pub max_transactions: usize,
    pub window: DateWindow,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            max_transactions: DEFAULT_MAX_TRANSACTIONS,
            window: DateWindow::default(),
        }
    }
}

/// Why a session stopped before the history was exhausted.
#[derive(Debug, Clone)]
pub enum FetchInterruption {
    /// A page request still failed after the client's retries.
    Api(KaspaApiError),
    Cancelled,
}

impl std::fmt::Display for FetchInterruption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchInterruption::Api(e) => write!(f, "page fetch failed: {}", e),
            FetchInterruption::Cancelled => write!(f, "session cancelled"),
        }
    }
}

/// Result of a fetch session. `transactions` is sorted by block time ascending.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub transactions: Vec<TransactionRecord>,
    pub pages: usize,
    pub malformed: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub out_of_window: usize,
    pub capped: bool,
    pub interruption: Option<FetchInterruption>,
}

/// What one admitted page did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    pub admitted: usize,
    pub done: bool,
}

#[derive(Debug)]
pub struct FetchSession {
    options: FetchOptions,
    cursor: Option<TimeMs>,
    seen: HashSet<String>,
    accumulated: Vec<TransactionRecord>,
    pages: usize,
    malformed: usize,
    duplicates: usize,
    rejected: usize,
    out_of_window: usize,
    capped: bool,
}

impl FetchSession {
    pub fn new(options: FetchOptions) -> Self {
        Self {
            options,
            cursor: None,
            seen: HashSet::new(),
            accumulated: Vec::new(),
            pages: 0,
            malformed: 0,
            duplicates: 0,
            rejected: 0,
            out_of_window: 0,
            capped: false,
        }
    }

    /// Query for the next page.
    ///
    /// Before the first admitted page the window end seeds the `before`
    /// cursor. The window start is never sent; `admit_page` filters on it and
    /// the first page that falls wholly before it ends the session.
    pub fn next_query(&self) -> PageQuery {
        let window = self.options.window;
        PageQuery {
            limit: self.options.page_size.clamp(1, MAX_PAGE_SIZE),
            before: self
                .cursor
                .or_else(|| window.to.map(|to| TimeMs::new(to.as_ms().saturating_add(1)))),
        }
    }

    /// Fold one page into the session.
    pub fn admit_page(&mut self, page: TransactionPage) -> PageProgress {
        self.pages += 1;
        self.malformed += page.malformed;

        let mut admitted = 0;
        let mut page_min: Option<TimeMs> = None;
        for tx in page.transactions {
            if self.seen.contains(&tx.transaction_id) {
                self.duplicates += 1;
                continue;
            }
            if !tx.is_accepted {
                self.rejected += 1;
                continue;
            }
            if !self.options.window.contains(tx.block_time) {
                self.out_of_window += 1;
                continue;
            }
            page_min = Some(page_min.map_or(tx.block_time, |m| m.min(tx.block_time)));
            self.seen.insert(tx.transaction_id.clone());
            self.accumulated.push(tx);
            admitted += 1;
        }

        if admitted == 0 {
            return PageProgress { admitted, done: true };
        }
        self.cursor = page_min;

        if self.accumulated.len() >= self.options.max_transactions {
            self.capped = true;
            return PageProgress { admitted, done: true };
        }
        PageProgress { admitted, done: false }
    }

    /// Page until the history, the cap, or the caller's patience runs out.
    pub async fn run(
        mut self,
        api: &dyn KaspaApi,
        address: &Address,
        cancel: &AtomicBool,
    ) -> FetchOutcome {
        let interruption = loop {
            if cancel.load(Ordering::SeqCst) {
                warn!("Fetch for {} cancelled after {} pages", address, self.pages);
                break Some(FetchInterruption::Cancelled);
            }

            let query = self.next_query();
            let page = match api.fetch_transactions_page(address, &query).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(
                        "Fetch for {} interrupted after {} pages: {}",
                        address, self.pages, e
                    );
                    break Some(FetchInterruption::Api(e));
                }
            };

            let returned = page.transactions.len();
            let progress = self.admit_page(page);
            info!(
                "Page {} complete: {} returned, {} admitted, cursor {:?}",
                self.pages,
                returned,
                progress.admitted,
                self.cursor.map(|c| c.as_ms())
            );
            if progress.done {
                break None;
            }
        };

        if self.capped {
            info!(
                "Stopped at transaction cap {} for {}",
                self.options.max_transactions, address
            );
        }
        debug!(
            "Fetch summary: {} duplicates, {} rejected, {} outside window",
            self.duplicates, self.rejected, self.out_of_window
        );

        self.finish(interruption)
    }

    fn finish(mut self, interruption: Option<FetchInterruption>) -> FetchOutcome {
        self.accumulated.sort_by(|a, b| {
            a.block_time
                .cmp(&b.block_time)
                .then_with(|| a.transaction_id.cmp(&b.transaction_id))
        });
        FetchOutcome {
            transactions: self.accumulated,
            pages: self.pages,
            malformed: self.malformed,
            duplicates: self.duplicates,
            rejected: self.rejected,
            out_of_window: self.out_of_window,
            capped: self.capped,
            interruption,
        }
    }
}
