//! crates/convaudit_core/src/loader.rs
//!
//! The progressive report loader: accumulates report pages into one ordered
//! row list while the UI renders 20-row batches as they arrive.
//!
//! Every load owns a generation stamp. Pages are only accepted when they
//! carry the stamp of the most recently started load; a page from an
//! abandoned load arriving late is discarded instead of writing into state
//! it no longer owns.

use uuid::Uuid;

use crate::domain::{ReportPage, ReportRow};
use crate::ports::{PortResult, ReportPageSource};

/// Rows per rendered batch and per pagination-control page.
pub const RENDER_BATCH_ROWS: usize = 20;

/// Hard cap on page iterations for one load, guaranteeing termination even
/// if the upstream cursor loops.
pub const MAX_PAGE_ITERATIONS: u32 = 100;

/// State of one button in the pagination control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageButton {
    /// The rows for this page have been accumulated.
    Ready,
    /// The rows are beyond what has arrived so far, but within the projected
    /// total while the background fetch continues.
    Loading,
    /// Beyond any known or projected page.
    Disabled,
}

/// Where the loader is in its `Idle → Fetching(n) → Done` cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    Fetching { page: u32 },
    Done,
}

/// The outcome of offering one fetched page to the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Accepted { has_more: bool },
    /// The page belonged to a load that has since been superseded.
    Stale,
}

/// Aggregate counters for a completed load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub row_count: usize,
    pub pages_fetched: u32,
    pub participation_count: u64,
    pub processed_count: u64,
    pub error_count: u64,
    pub intercom_total_count: u64,
    /// True when the load stopped at [`MAX_PAGE_ITERATIONS`] rather than at
    /// the natural end of pagination.
    pub capped: bool,
}

#[derive(Debug)]
pub struct ProgressiveLoader {
    generation: Option<Uuid>,
    phase: LoadPhase,
    rows: Vec<ReportRow>,
    next_cursor: Option<String>,
    pages_fetched: u32,
    /// Upstream's estimate of the candidate total, used to project how many
    /// pagination pages may still fill in.
    projected_total: u64,
    participation_count: u64,
    processed_count: u64,
    error_count: u64,
    capped: bool,
}

impl Default for ProgressiveLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressiveLoader {
    pub fn new() -> Self {
        Self {
            generation: None,
            phase: LoadPhase::Idle,
            rows: Vec::new(),
            next_cursor: None,
            pages_fetched: 0,
            projected_total: 0,
            participation_count: 0,
            processed_count: 0,
            error_count: 0,
            capped: false,
        }
    }

    /// Starts a fresh load, discarding all accumulated state and returning
    /// the new load's generation stamp. Any page still in flight from an
    /// earlier load will be rejected as [`Applied::Stale`].
    pub fn begin(&mut self) -> Uuid {
        let generation = Uuid::new_v4();
        *self = Self::new();
        self.generation = Some(generation);
        self.phase = LoadPhase::Fetching { page: 1 };
        generation
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn next_cursor(&self) -> Option<&str> {
        self.next_cursor.as_deref()
    }

    pub fn is_done(&self) -> bool {
        self.phase == LoadPhase::Done
    }

    /// Offers one fetched page to the loader.
    pub fn apply_page(&mut self, generation: Uuid, page: &ReportPage) -> Applied {
        if self.generation != Some(generation) || self.phase == LoadPhase::Done {
            return Applied::Stale;
        }

        self.rows.extend(page.conversations.iter().cloned());
        self.pages_fetched += 1;
        self.participation_count += page.participation_count;
        self.processed_count += page.processed_count;
        self.error_count += page.error_count;
        self.projected_total = self.projected_total.max(page.intercom_total_count);

        let mut has_more = page.has_more && page.next_cursor.is_some();
        if has_more && self.pages_fetched >= MAX_PAGE_ITERATIONS {
            self.capped = true;
            has_more = false;
        }

        if has_more {
            self.next_cursor = page.next_cursor.clone();
            self.phase = LoadPhase::Fetching {
                page: self.pages_fetched + 1,
            };
        } else {
            self.next_cursor = None;
            self.phase = LoadPhase::Done;
        }

        Applied::Accepted { has_more }
    }

    /// Computes the state of the 1-based `page_index` button in a
    /// 20-rows-per-page pagination control.
    pub fn page_button(&self, page_index: usize) -> PageButton {
        if page_index == 0 {
            return PageButton::Disabled;
        }
        let start = (page_index - 1) * RENDER_BATCH_ROWS;
        let end = page_index * RENDER_BATCH_ROWS;

        match self.phase {
            LoadPhase::Done => {
                if start < self.rows.len() {
                    PageButton::Ready
                } else {
                    PageButton::Disabled
                }
            }
            LoadPhase::Fetching { .. } => {
                if end <= self.rows.len() {
                    PageButton::Ready
                } else if start < self.projected_total as usize {
                    PageButton::Loading
                } else {
                    PageButton::Disabled
                }
            }
            LoadPhase::Idle => PageButton::Disabled,
        }
    }

    pub fn summary(&self) -> LoadSummary {
        LoadSummary {
            row_count: self.rows.len(),
            pages_fetched: self.pages_fetched,
            participation_count: self.participation_count,
            processed_count: self.processed_count,
            error_count: self.error_count,
            intercom_total_count: self.projected_total,
            capped: self.capped,
        }
    }

    /// Drives a full load against `source`, invoking `on_rows` with each
    /// newly arrived batch of at most [`RENDER_BATCH_ROWS`] rows so a UI can
    /// render progressively.
    ///
    /// A discovery-stage failure on any page aborts the load and propagates;
    /// per-conversation failures have already been absorbed server-side and
    /// only show up in the summary's `error_count`.
    pub async fn load_all<S>(
        &mut self,
        source: &S,
        admin_id: &str,
        date: &str,
        mut on_rows: impl FnMut(&[ReportRow]),
    ) -> PortResult<LoadSummary>
    where
        S: ReportPageSource + ?Sized,
    {
        let generation = self.begin();
        let mut cursor: Option<String> = None;

        loop {
            let page = source
                .fetch_report_page(admin_id, date, cursor.as_deref())
                .await?;
            let already_rendered = self.rows.len();

            match self.apply_page(generation, &page) {
                Applied::Stale => break,
                Applied::Accepted { has_more } => {
                    for batch in self.rows[already_rendered..].chunks(RENDER_BATCH_ROWS) {
                        on_rows(batch);
                    }
                    if !has_more {
                        break;
                    }
                    cursor = self.next_cursor.as_ref().map(|c| c.to_string());
                }
            }
        }

        Ok(self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{PortError, PortResult};
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn row(n: usize) -> ReportRow {
        ReportRow {
            id: format!("c{n}"),
            created_at: 1700000000 + n as i64,
            updated_at: 1700000000 + n as i64,
            created_at_iso: String::new(),
            updated_at_iso: String::new(),
            state: None,
            subject: None,
            source_author_name: None,
            rating: None,
            participation_part_count: 1,
        }
    }

    fn page(rows: usize, total: u64, next: Option<&str>) -> ReportPage {
        ReportPage {
            conversations: (0..rows).map(row).collect(),
            total_count: rows as u64,
            intercom_total_count: total,
            has_more: next.is_some(),
            next_cursor: next.map(str::to_string),
            admin_id: "8742044".to_string(),
            date: "2025-11-10".to_string(),
            participation_count: rows as u64,
            processed_count: rows as u64,
            error_count: 0,
        }
    }

    struct ScriptedSource {
        pages: Mutex<Vec<ReportPage>>,
    }

    #[async_trait]
    impl ReportPageSource for ScriptedSource {
        async fn fetch_report_page(
            &self,
            _admin_id: &str,
            _date: &str,
            _cursor: Option<&str>,
        ) -> PortResult<ReportPage> {
            let mut pages = self.pages.lock().unwrap();
            if pages.is_empty() {
                return Err(PortError::Unexpected("scripted source exhausted".into()));
            }
            Ok(pages.remove(0))
        }
    }

    #[test]
    fn accumulates_45_45_10_before_done() {
        let mut loader = ProgressiveLoader::new();
        let generation = loader.begin();

        assert_eq!(
            loader.apply_page(generation, &page(45, 100, Some("a"))),
            Applied::Accepted { has_more: true }
        );
        // Page 3 (rows 41-60) is not fully covered by 45 rows yet, but is
        // within the projected total of 100 while fetching continues.
        assert_eq!(loader.page_button(3), PageButton::Loading);
        assert_eq!(loader.page_button(2), PageButton::Ready);
        assert_eq!(loader.page_button(6), PageButton::Disabled);

        assert_eq!(
            loader.apply_page(generation, &page(45, 100, Some("b"))),
            Applied::Accepted { has_more: true }
        );
        // 90 rows accumulated: page 3 is ready even though the next fetch
        // is still in flight.
        assert!(!loader.is_done());
        assert_eq!(loader.page_button(3), PageButton::Ready);
        assert_eq!(loader.page_button(5), PageButton::Loading);

        assert_eq!(
            loader.apply_page(generation, &page(10, 100, None)),
            Applied::Accepted { has_more: false }
        );
        assert!(loader.is_done());
        assert_eq!(loader.rows().len(), 100);
        assert_eq!(loader.page_button(5), PageButton::Ready);
        assert_eq!(loader.page_button(6), PageButton::Disabled);
    }

    #[test]
    fn stale_generation_pages_are_discarded() {
        let mut loader = ProgressiveLoader::new();
        let old_generation = loader.begin();
        loader.apply_page(old_generation, &page(20, 40, Some("a")));

        // A fresh load resets the state and invalidates the old stamp.
        let new_generation = loader.begin();
        assert!(loader.rows().is_empty());
        assert_eq!(
            loader.apply_page(old_generation, &page(20, 40, Some("b"))),
            Applied::Stale
        );
        assert!(loader.rows().is_empty());

        assert_eq!(
            loader.apply_page(new_generation, &page(5, 5, None)),
            Applied::Accepted { has_more: false }
        );
        assert_eq!(loader.rows().len(), 5);
    }

    #[test]
    fn iteration_cap_forces_termination() {
        let mut loader = ProgressiveLoader::new();
        let generation = loader.begin();
        for i in 0..MAX_PAGE_ITERATIONS {
            let applied = loader.apply_page(generation, &page(1, 10_000, Some("loop")));
            if i + 1 == MAX_PAGE_ITERATIONS {
                assert_eq!(applied, Applied::Accepted { has_more: false });
            } else {
                assert_eq!(applied, Applied::Accepted { has_more: true });
            }
        }
        assert!(loader.is_done());
        assert!(loader.summary().capped);
        // Nothing more is accepted after the cap.
        assert_eq!(
            loader.apply_page(generation, &page(1, 10_000, None)),
            Applied::Stale
        );
    }

    #[test]
    fn missing_cursor_terminates_even_when_has_more_is_set() {
        let mut loader = ProgressiveLoader::new();
        let generation = loader.begin();
        let mut p = page(3, 50, None);
        p.has_more = true; // server flagged more, but the cursor failed to parse
        assert_eq!(
            loader.apply_page(generation, &p),
            Applied::Accepted { has_more: false }
        );
        assert!(loader.is_done());
    }

    #[test]
    fn load_all_renders_in_20_row_batches() {
        let source = ScriptedSource {
            pages: Mutex::new(vec![
                page(45, 100, Some("a")),
                page(45, 100, Some("b")),
                page(10, 100, None),
            ]),
        };
        let mut loader = ProgressiveLoader::new();
        let mut batches = Vec::new();
        let summary = futures::executor::block_on(loader.load_all(
            &source,
            "8742044",
            "2025-11-10",
            |batch| batches.push(batch.len()),
        ))
        .unwrap();

        assert_eq!(summary.row_count, 100);
        assert_eq!(summary.pages_fetched, 3);
        assert_eq!(summary.participation_count, 100);
        assert!(!summary.capped);
        assert!(batches.iter().all(|len| *len <= RENDER_BATCH_ROWS));
        assert_eq!(batches.iter().sum::<usize>(), 100);
        // First render batch is available as soon as the first page lands.
        assert_eq!(batches[0], 20);
    }

    #[test]
    fn load_all_propagates_discovery_failure() {
        let source = ScriptedSource {
            pages: Mutex::new(vec![]),
        };
        let mut loader = ProgressiveLoader::new();
        let result = futures::executor::block_on(loader.load_all(
            &source,
            "8742044",
            "2025-11-10",
            |_| {},
        ));
        assert!(result.is_err());
    }
}
