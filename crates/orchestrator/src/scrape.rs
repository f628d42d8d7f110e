//! The scrape session worker.
//!
//! Drives exactly one running session end to end: fetch a page through the
//! platform driver, persist the new prospects, publish progress, then loop
//! until the listing is exhausted or a pause/stop/quota gate fires.
//! Workers are exclusive process-wide via [`WorkerSlot`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use db::{ProspectRepository, SessionRepository, UsageRepository};
use events::{Event, EventBus};
use outreach_core::policy::{ActionType, PacingPolicy};
use outreach_core::{CoreError, ScrapeSession, SessionEvent};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::backoff::backoff_delay;
use crate::controls::{ControlRegistry, ControlSignal, SlotGuard, WorkerSlot};
use crate::driver::{DriverError, PlatformDriver};
use crate::error::{OrchestratorError, Result};

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Bound on a single driver call.
    pub page_timeout: Duration,
    /// Transient retries per page before the session fails.
    pub max_page_retries: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    /// Polite spacing between page fetches.
    pub page_delay: Duration,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            page_timeout: Duration::from_secs(30),
            max_page_retries: 3,
            retry_base_delay: Duration::from_secs(2),
            retry_max_delay: Duration::from_secs(60),
            page_delay: Duration::from_secs(5),
        }
    }
}

#[derive(Clone)]
pub struct ScrapeDeps {
    pub sessions: SessionRepository,
    pub prospects: ProspectRepository,
    pub usage: UsageRepository,
    pub driver: Arc<dyn PlatformDriver>,
    pub bus: EventBus,
    pub policy: PacingPolicy,
    pub controls: ControlRegistry,
    pub slot: WorkerSlot,
}

/// Result of launching a worker. The session is already `running`; the
/// join handle finishes when the worker parks or terminates.
#[derive(Debug)]
pub struct ScrapeHandle {
    pub session: ScrapeSession,
    pub worker: JoinHandle<()>,
}

pub struct ScrapeRunner;

impl ScrapeRunner {
    /// Create a session and start scraping it.
    pub async fn start(
        name: &str,
        source_url: &str,
        config: ScrapeConfig,
        deps: ScrapeDeps,
    ) -> Result<ScrapeHandle> {
        let session = deps.sessions.create(name, source_url).await?;
        Self::launch(session.id, SessionEvent::Start, config, deps).await
    }

    /// Resume a paused session from its preserved page position.
    pub async fn resume(
        session_id: Uuid,
        config: ScrapeConfig,
        deps: ScrapeDeps,
    ) -> Result<ScrapeHandle> {
        Self::launch(session_id, SessionEvent::Resume, config, deps).await
    }

    /// Pause: the store flips immediately, the worker winds down after the
    /// page fetch in flight.
    pub async fn pause(session_id: Uuid, deps: &ScrapeDeps) -> Result<ScrapeSession> {
        let session = Self::command_transition(session_id, SessionEvent::Pause, deps).await?;
        deps.controls.signal(session_id, ControlSignal::Pause);
        Ok(session)
    }

    /// Stop: terminal, accumulated prospects are retained.
    pub async fn stop(session_id: Uuid, deps: &ScrapeDeps) -> Result<ScrapeSession> {
        let session = Self::command_transition(session_id, SessionEvent::Stop, deps).await?;
        deps.controls.signal(session_id, ControlSignal::Stop);
        Ok(session)
    }

    /// Boot-time crash consistency: sessions persisted as `running` could
    /// not have survived the restart, so they come back `paused` and can
    /// be resumed without refetching completed pages.
    pub async fn recover_on_boot(deps: &ScrapeDeps) -> Result<Vec<Uuid>> {
        let recovered = deps.sessions.recover_interrupted().await?;
        for session_id in &recovered {
            warn!(session_id = %session_id, "Recovered interrupted session as paused");
            deps.bus.emit(Event::SessionStatusChanged {
                session_id: *session_id,
                from: "running".to_string(),
                to: "paused".to_string(),
            });
        }
        Ok(recovered)
    }

    async fn launch(
        session_id: Uuid,
        event: SessionEvent,
        config: ScrapeConfig,
        deps: ScrapeDeps,
    ) -> Result<ScrapeHandle> {
        // Claim before transitioning so a second launcher is rejected even
        // while the store write is still in flight. The guard travels into
        // the worker and releases on every exit path. A freshly paused
        // worker may still be winding down, so the claim waits briefly
        // before giving up.
        let mut guard = deps.slot.try_claim(session_id);
        for _ in 0..20 {
            if guard.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
            guard = deps.slot.try_claim(session_id);
        }
        let guard = guard.ok_or(OrchestratorError::SlotBusy)?;

        let session = Self::command_transition(session_id, event, &deps).await?;

        let rx = deps.controls.register(session_id);
        info!(
            session_id = %session_id,
            source_url = %session.source_url,
            page = session.current_page,
            "Scrape worker started"
        );

        let worker = tokio::spawn(Self::run_loop(session.clone(), config, deps.clone(), rx, guard));

        Ok(ScrapeHandle { session, worker })
    }

    /// Command-surface transition: errors propagate, success is published.
    async fn command_transition(
        session_id: Uuid,
        event: SessionEvent,
        deps: &ScrapeDeps,
    ) -> Result<ScrapeSession> {
        let before = deps
            .sessions
            .find_by_id(session_id)
            .await?
            .ok_or(db::DbError::SessionNotFound(session_id))?;
        let after = deps.sessions.transition(session_id, event).await?;
        deps.bus.emit(Event::SessionStatusChanged {
            session_id,
            from: before.status.as_str().to_string(),
            to: after.status.as_str().to_string(),
        });
        Ok(after)
    }

    /// Worker-internal transition: a guard miss means a command beat us to
    /// it (for instance pause landing right before our complete), which is
    /// not an error for the loop.
    async fn transition_quietly(session_id: Uuid, event: SessionEvent, deps: &ScrapeDeps) {
        let before = match deps.sessions.find_by_id(session_id).await {
            Ok(Some(session)) => session.status,
            _ => return,
        };
        match deps.sessions.transition(session_id, event).await {
            Ok(after) => {
                deps.bus.emit(Event::SessionStatusChanged {
                    session_id,
                    from: before.as_str().to_string(),
                    to: after.status.as_str().to_string(),
                });
            }
            Err(db::DbError::Core(CoreError::InvalidTransition { .. })) => {
                debug!(
                    session_id = %session_id,
                    event = event.as_str(),
                    "Worker transition lost to a concurrent command"
                );
            }
            Err(err) => {
                error!(session_id = %session_id, error = %err, "Worker transition failed");
            }
        }
    }

    async fn run_loop(
        session: ScrapeSession,
        config: ScrapeConfig,
        deps: ScrapeDeps,
        mut rx: watch::Receiver<ControlSignal>,
        guard: SlotGuard,
    ) {
        let session_id = session.id;

        if let Err(err) = Self::drive(session, &config, &deps, &mut rx).await {
            error!(session_id = %session_id, error = %err, "Scrape worker aborted");
            Self::fail(session_id, &err.to_string(), &deps).await;
        }

        deps.controls.remove(session_id);
        drop(guard);
        debug!(session_id = %session_id, "Scrape worker finished");
    }

    async fn drive(
        session: ScrapeSession,
        config: &ScrapeConfig,
        deps: &ScrapeDeps,
        rx: &mut watch::Receiver<ControlSignal>,
    ) -> Result<()> {
        let session_id = session.id;
        let source_url = session.source_url.clone();
        // `current_page` is the last fully persisted page; never refetch it.
        let mut page = session.current_page;
        let mut retries: u32 = 0;

        loop {
            match *rx.borrow() {
                ControlSignal::Run => {}
                signal => {
                    info!(session_id = %session_id, ?signal, "Worker winding down");
                    break;
                }
            }

            let now = Utc::now();
            let day = deps.policy.quota_day(now);
            let used = deps.usage.used(day, ActionType::ProspectScrape).await?;
            if !deps.policy.can_act(ActionType::ProspectScrape, now, used) {
                info!(
                    session_id = %session_id,
                    used = used,
                    "Daily scrape quota exhausted, pausing session"
                );
                Self::transition_quietly(session_id, SessionEvent::Pause, deps).await;
                break;
            }

            let next_page = page + 1;
            debug!(session_id = %session_id, page = next_page, "Fetching prospect page");

            let fetched = match tokio::time::timeout(
                config.page_timeout,
                deps.driver.fetch_prospect_page(&source_url, next_page),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(DriverError::transient("page fetch timed out")),
            };

            match fetched {
                Ok(page_data) => {
                    retries = 0;

                    let inserted = deps
                        .prospects
                        .insert_batch(session_id, &page_data.prospects)
                        .await?;
                    if inserted > 0 {
                        deps.usage
                            .record(day, ActionType::ProspectScrape, inserted as u32)
                            .await?;
                    }

                    let last_name = page_data.prospects.last().map(|p| {
                        format!("{} {}", p.first_name, p.last_name).trim().to_string()
                    });
                    let updated = deps
                        .sessions
                        .update_progress(
                            session_id,
                            next_page,
                            inserted as i64,
                            last_name.as_deref(),
                            page_data.total,
                        )
                        .await?;

                    deps.bus.emit(Event::SessionProgress {
                        session_id,
                        scraped_profiles: updated.scraped_prospects_count,
                        current_page: updated.current_page,
                        total_prospects_count: updated.total_prospects_count,
                        last_prospect_name: updated.last_prospect_name.clone(),
                    });

                    page = next_page;

                    if !page_data.has_more {
                        // A pause/stop that landed during the fetch wins
                        // over completion.
                        if matches!(*rx.borrow(), ControlSignal::Run) {
                            Self::transition_quietly(session_id, SessionEvent::Complete, deps)
                                .await;
                        }
                        break;
                    }
                }
                Err(err) if err.is_transient() => {
                    retries += 1;
                    if retries > config.max_page_retries {
                        error!(
                            session_id = %session_id,
                            page = next_page,
                            attempts = retries,
                            error = %err,
                            "Page fetch retries exhausted"
                        );
                        Self::fail(
                            session_id,
                            &format!("page {} failed after {} attempts: {}", next_page, retries, err),
                            deps,
                        )
                        .await;
                        break;
                    }
                    let delay = backoff_delay(
                        config.retry_base_delay,
                        config.retry_max_delay,
                        retries - 1,
                    );
                    warn!(
                        session_id = %session_id,
                        page = next_page,
                        attempt = retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient page fetch failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(err) => {
                    error!(session_id = %session_id, page = next_page, error = %err, "Fatal driver failure");
                    Self::fail(session_id, &err.to_string(), deps).await;
                    break;
                }
            }

            if !config.page_delay.is_zero() {
                tokio::time::sleep(config.page_delay).await;
            }
        }

        Ok(())
    }

    async fn fail(session_id: Uuid, reason: &str, deps: &ScrapeDeps) {
        Self::transition_quietly(session_id, SessionEvent::Fail, deps).await;
        deps.bus.emit(Event::Error {
            message: reason.to_string(),
            context: Some(format!("session {}", session_id)),
        });
    }
}
