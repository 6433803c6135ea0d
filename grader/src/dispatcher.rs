//! # Batch dispatcher
//!
//! Grades every portfolio of an assignment through a [`GradingClient`] and
//! reconciles the results into the result store.
//!
//! - At most `concurrency` grading calls are in flight (default 1, i.e.
//!   sequential, which keeps the scoring service from being flooded).
//! - A failing portfolio never aborts the batch; it becomes a failed outcome.
//! - Only successful grades are upserted, so a failed re-grade leaves the
//!   previously stored result untouched.
//! - Outcomes are slotted by enumeration index, so the report order does not
//!   depend on completion order.
//! - Cancelling the batch stops portfolios that have not started yet; those
//!   are reported as `cancelled`. Calls already in flight run to completion
//!   or to their timeout. Dropping the batch future counts as cancelling it.

use crate::client::GradingClient;
use crate::error::GradingError;
use crate::report::{BatchReport, GradingOutcome};
use crate::request::GradeRequest;
use crate::store::{GradingStore, PortfolioRecord, ResultStore, StoredResult};
use futures::stream::{FuturesUnordered, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use util::config::AppConfig;
use util::paths;

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Maximum grading calls in flight. Never below 1.
    pub concurrency: usize,
    /// Absolute directory that portfolio links are resolved against.
    pub storage_root: PathBuf,
}

impl DispatchConfig {
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            concurrency: 1,
            storage_root: storage_root.into(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

impl From<&AppConfig> for DispatchConfig {
    fn from(cfg: &AppConfig) -> Self {
        DispatchConfig::new(cfg.storage_root_path()).with_concurrency(cfg.grading_concurrency)
    }
}

pub struct BatchDispatcher<C, S> {
    client: Arc<C>,
    store: Arc<S>,
    config: DispatchConfig,
}

impl<C, S> BatchDispatcher<C, S>
where
    C: GradingClient + 'static,
    S: GradingStore + 'static,
{
    pub fn new(client: Arc<C>, store: Arc<S>, config: DispatchConfig) -> Self {
        Self {
            client,
            store,
            config,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Grade every portfolio of `assignment_id`.
    ///
    /// Returns an error only when the batch cannot start (bad id, unknown
    /// assignment, store unreachable). Per-portfolio failures are in the report.
    pub async fn grade_assignment(&self, assignment_id: i64) -> Result<BatchReport, GradingError> {
        self.grade_assignment_with_cancel(assignment_id, CancellationToken::new())
            .await
    }

    pub async fn grade_assignment_with_cancel(
        &self,
        assignment_id: i64,
        cancel: CancellationToken,
    ) -> Result<BatchReport, GradingError> {
        if assignment_id <= 0 {
            return Err(GradingError::Validation(format!(
                "assignment id must be positive, got {assignment_id}"
            )));
        }
        if !self.store.assignment_exists(assignment_id).await? {
            return Err(GradingError::NotFound(format!(
                "assignment {assignment_id} not found"
            )));
        }

        let portfolios = self.store.list_for_assignment(assignment_id).await?;
        let rubric_text = self.store.latest_rubric_text(assignment_id).await?;

        tracing::info!(
            assignment_id,
            portfolios = portfolios.len(),
            concurrency = self.config.concurrency,
            has_rubric = rubric_text.is_some(),
            "starting batch grading"
        );

        if portfolios.is_empty() {
            return Ok(BatchReport::empty(assignment_id));
        }

        // Dropping this future (caller timeout, abort) cancels whatever has not started.
        let batch_cancel = cancel.child_token();
        let _cancel_on_drop = batch_cancel.clone().drop_guard();

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut running = FuturesUnordered::new();

        for (index, portfolio) in portfolios.iter().cloned().enumerate() {
            let portfolio_id = portfolio.portfolio_id;
            let client = Arc::clone(&self.client);
            let store = Arc::clone(&self.store);
            let semaphore = Arc::clone(&semaphore);
            let cancel = batch_cancel.clone();
            let storage_root = self.config.storage_root.clone();
            let rubric_text = rubric_text.clone();

            let task = tokio::spawn(async move {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::debug!(portfolio_id, "skipping portfolio, batch cancelled");
                        GradingOutcome::failure(portfolio_id, &GradingError::Cancelled)
                    }
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(_permit) => {
                            grade_portfolio(
                                client.as_ref(),
                                store.as_ref(),
                                &storage_root,
                                &portfolio,
                                rubric_text,
                            )
                            .await
                        }
                        Err(_) => GradingOutcome::failure(
                            portfolio_id,
                            &GradingError::Internal("dispatch slots closed".into()),
                        ),
                    },
                }
            });

            running.push(async move { (index, portfolio_id, task.await) });
        }

        let mut slots: Vec<Option<GradingOutcome>> = vec![None; portfolios.len()];
        while let Some((index, portfolio_id, joined)) = running.next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(portfolio_id, error = %e, "grading task did not finish");
                    GradingOutcome::failure(portfolio_id, &GradingError::Internal(e.to_string()))
                }
            };
            slots[index] = Some(outcome);
        }

        let outcomes: Vec<GradingOutcome> = slots
            .into_iter()
            .zip(&portfolios)
            .map(|(slot, p)| {
                slot.unwrap_or_else(|| {
                    GradingOutcome::failure(
                        p.portfolio_id,
                        &GradingError::Internal("no outcome recorded".into()),
                    )
                })
            })
            .collect();

        let report = BatchReport {
            assignment_id,
            outcomes,
        };
        tracing::info!(
            assignment_id,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "batch grading finished"
        );
        Ok(report)
    }

    /// Grade a single portfolio.
    ///
    /// An unknown portfolio is a [`GradingError::NotFound`]; grading failures
    /// come back as a failed outcome, as they would in a batch.
    pub async fn grade_one(&self, portfolio_id: i64) -> Result<GradingOutcome, GradingError> {
        if portfolio_id <= 0 {
            return Err(GradingError::Validation(format!(
                "portfolio id must be positive, got {portfolio_id}"
            )));
        }
        let portfolio = self
            .store
            .find(portfolio_id)
            .await?
            .ok_or_else(|| GradingError::NotFound(format!("portfolio {portfolio_id} not found")))?;
        let rubric_text = self.store.latest_rubric_text(portfolio.assignment_id).await?;

        Ok(grade_portfolio(
            self.client.as_ref(),
            self.store.as_ref(),
            &self.config.storage_root,
            &portfolio,
            rubric_text,
        )
        .await)
    }
}

async fn grade_portfolio<C, S>(
    client: &C,
    store: &S,
    storage_root: &Path,
    portfolio: &PortfolioRecord,
    rubric_text: Option<String>,
) -> GradingOutcome
where
    C: GradingClient + ?Sized,
    S: ResultStore + ?Sized,
{
    let portfolio_id = portfolio.portfolio_id;
    match grade_and_store(client, store, storage_root, portfolio, rubric_text).await {
        Ok(stored) => {
            tracing::info!(portfolio_id, ai_grade = ?stored.ai_grade, "portfolio graded");
            GradingOutcome::success(stored)
        }
        Err(err) => {
            tracing::warn!(
                portfolio_id,
                kind = ?err.failure_kind(),
                error = %err,
                "portfolio grading failed"
            );
            GradingOutcome::failure(portfolio_id, &err)
        }
    }
}

async fn grade_and_store<C, S>(
    client: &C,
    store: &S,
    storage_root: &Path,
    portfolio: &PortfolioRecord,
    rubric_text: Option<String>,
) -> Result<StoredResult, GradingError>
where
    C: GradingClient + ?Sized,
    S: ResultStore + ?Sized,
{
    let file_path = paths::portfolio_path(storage_root, &portfolio.portfolio_link);
    match tokio::fs::try_exists(&file_path).await {
        Ok(true) => {}
        Ok(false) => return Err(GradingError::FileMissing(file_path)),
        Err(source) => {
            return Err(GradingError::FileAccess {
                path: file_path,
                source,
            });
        }
    }

    let request = GradeRequest::new(portfolio.portfolio_id, file_path, rubric_text);
    let result = client.grade(&request).await?;

    store
        .upsert(portfolio.portfolio_id, &result)
        .await
        .map_err(GradingError::Persistence)
}
