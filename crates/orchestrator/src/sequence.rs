//! The sequence send scheduler.
//!
//! A recurring pass over due enrollments. Each pass re-checks the quota
//! and window policy, caps sends to the remaining per-type daily quota,
//! and spaces outbound actions with a jittered delay so a pass never
//! bursts. One enrollment's failure never aborts the pass; only a fatal
//! driver error does.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use db::{EnrollmentRepository, ProspectRepository, SequenceRepository, UsageRepository};
use events::{Event, EventBus};
use outreach_core::policy::{ActionType, PacingPolicy};
use outreach_core::{ConnectionStatus, Enrollment};
use rand::Rng;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::driver::{DriverError, DriverErrorKind, PlatformDriver, ProspectRef};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct SequenceSchedulerConfig {
    pub pass_interval: Duration,
    /// Upper bound on enrollments examined per pass, before quota caps.
    pub batch_limit: i64,
    /// Bound on a single driver send.
    pub send_timeout: Duration,
    /// Push-back applied after a transient send failure.
    pub transient_backoff: Duration,
    /// Consecutive transient failures tolerated per step before the
    /// enrollment is failed outright.
    pub max_transient_attempts: u32,
    /// How long a fresh invitation defers the first message step.
    pub connection_grace: Duration,
}

impl Default for SequenceSchedulerConfig {
    fn default() -> Self {
        Self {
            pass_interval: Duration::from_secs(60),
            batch_limit: 50,
            send_timeout: Duration::from_secs(30),
            transient_backoff: Duration::from_secs(15 * 60),
            max_transient_attempts: 5,
            connection_grace: Duration::from_secs(24 * 60 * 60),
        }
    }
}

#[derive(Clone)]
pub struct SequenceDeps {
    pub sequences: SequenceRepository,
    pub enrollments: EnrollmentRepository,
    pub prospects: ProspectRepository,
    pub usage: UsageRepository,
    pub driver: Arc<dyn PlatformDriver>,
    pub bus: EventBus,
    pub policy: PacingPolicy,
}

/// What one pass did, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub messages_sent: u32,
    pub connections_sent: u32,
    pub deferred: u32,
    pub failed: u32,
    pub skipped: u32,
}

impl PassSummary {
    pub fn total_sent(&self) -> u32 {
        self.messages_sent + self.connections_sent
    }
}

enum Outcome {
    SentMessage,
    SentConnection,
    Deferred,
    Failed,
    Skipped,
    /// The driver itself looks down; stop hammering it this pass.
    DriverDown,
}

pub struct SequenceScheduler {
    config: SequenceSchedulerConfig,
    deps: SequenceDeps,
}

impl SequenceScheduler {
    pub fn new(config: SequenceSchedulerConfig, deps: SequenceDeps) -> Self {
        Self { config, deps }
    }

    /// Recurring pass loop; returns when `shutdown` flips to true.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.pass_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(
            interval_secs = self.config.pass_interval.as_secs(),
            "Sequence scheduler started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.run_pass(Utc::now()).await {
                        Ok(summary) if summary.total_sent() > 0 || summary.failed > 0 => {
                            info!(
                                messages = summary.messages_sent,
                                connections = summary.connections_sent,
                                deferred = summary.deferred,
                                failed = summary.failed,
                                "Sequence pass finished"
                            );
                        }
                        Ok(_) => {}
                        Err(err) => error!(error = %err, "Sequence pass failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Sequence scheduler shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One pass over due enrollments at `now`.
    pub async fn run_pass(&self, now: DateTime<Utc>) -> Result<PassSummary> {
        let mut summary = PassSummary::default();

        if !self.deps.policy.in_window(now) {
            debug!("Outside the send window, pass skipped");
            return Ok(summary);
        }

        let day = self.deps.policy.quota_day(now);
        let mut remaining_messages = self.deps.policy.remaining(
            ActionType::Message,
            self.deps.usage.used(day, ActionType::Message).await?,
        );
        let mut remaining_connections = self.deps.policy.remaining(
            ActionType::ConnectionRequest,
            self.deps
                .usage
                .used(day, ActionType::ConnectionRequest)
                .await?,
        );

        if remaining_messages == 0 && remaining_connections == 0 {
            debug!("Daily send quotas exhausted, pass skipped");
            return Ok(summary);
        }

        let due = self
            .deps
            .enrollments
            .due(now, self.config.batch_limit)
            .await?;
        if due.is_empty() {
            return Ok(summary);
        }
        debug!(due = due.len(), "Processing due enrollments");

        let mut actions_taken: u32 = 0;

        for enrollment in &due {
            if remaining_messages == 0 && remaining_connections == 0 {
                break;
            }

            let outcome = match self
                .process_enrollment(
                    enrollment,
                    now,
                    day,
                    &mut remaining_messages,
                    &mut remaining_connections,
                    &mut actions_taken,
                )
                .await
            {
                Ok(outcome) => outcome,
                Err(err) => {
                    // Failures are isolated per enrollment.
                    error!(
                        enrollment_id = %enrollment.id,
                        error = %err,
                        "Enrollment processing failed"
                    );
                    continue;
                }
            };

            match outcome {
                Outcome::SentMessage => summary.messages_sent += 1,
                Outcome::SentConnection => summary.connections_sent += 1,
                Outcome::Deferred => summary.deferred += 1,
                Outcome::Failed => summary.failed += 1,
                Outcome::Skipped => summary.skipped += 1,
                Outcome::DriverDown => {
                    summary.deferred += 1;
                    warn!("Driver reported fatal failure, aborting pass");
                    break;
                }
            }
        }

        Ok(summary)
    }

    async fn process_enrollment(
        &self,
        enrollment: &Enrollment,
        now: DateTime<Utc>,
        day: chrono::NaiveDate,
        remaining_messages: &mut u32,
        remaining_connections: &mut u32,
        actions_taken: &mut u32,
    ) -> Result<Outcome> {
        let Some(prospect) = self.deps.prospects.find_by_id(enrollment.prospect_id).await? else {
            self.deps.enrollments.mark_failed(enrollment.id).await?;
            self.deps.bus.emit(Event::EnrollmentFailed {
                enrollment_id: enrollment.id,
                sequence_id: enrollment.sequence_id,
                reason: "prospect no longer exists".to_string(),
            });
            return Ok(Outcome::Failed);
        };

        let prospect_ref = ProspectRef {
            prospect_id: prospect.id,
            profile_url: prospect.profile_url.clone(),
        };

        // Not-yet-connected prospects get a connection request before any
        // message step goes out.
        if enrollment.connection_status == ConnectionStatus::NotConnected {
            if *remaining_connections == 0 {
                return Ok(Outcome::Skipped);
            }
            return self
                .send_connection(enrollment, &prospect_ref, now, day, remaining_connections, actions_taken)
                .await;
        }

        if *remaining_messages == 0 {
            return Ok(Outcome::Skipped);
        }
        self.send_step(enrollment, &prospect_ref, now, day, remaining_messages, actions_taken)
            .await
    }

    async fn send_connection(
        &self,
        enrollment: &Enrollment,
        prospect_ref: &ProspectRef,
        now: DateTime<Utc>,
        day: chrono::NaiveDate,
        remaining_connections: &mut u32,
        actions_taken: &mut u32,
    ) -> Result<Outcome> {
        self.pace(actions_taken).await;

        match self
            .bounded(self.deps.driver.send_connection_request(prospect_ref))
            .await
        {
            Ok(()) => {
                self.deps
                    .usage
                    .record(day, ActionType::ConnectionRequest, 1)
                    .await?;
                *remaining_connections -= 1;
                self.deps
                    .enrollments
                    .set_connection_status(enrollment.id, ConnectionStatus::InvitationSent)
                    .await?;
                let grace =
                    chrono::Duration::from_std(self.config.connection_grace).unwrap_or_default();
                self.deps
                    .enrollments
                    .reschedule(enrollment.id, now + grace)
                    .await?;
                self.deps.bus.emit(Event::ConnectionRequested {
                    enrollment_id: enrollment.id,
                    prospect_id: enrollment.prospect_id,
                });
                debug!(enrollment_id = %enrollment.id, "Connection request sent");
                Ok(Outcome::SentConnection)
            }
            Err(err) => self.handle_send_failure(enrollment, now, err).await,
        }
    }

    async fn send_step(
        &self,
        enrollment: &Enrollment,
        prospect_ref: &ProspectRef,
        now: DateTime<Utc>,
        day: chrono::NaiveDate,
        remaining_messages: &mut u32,
        actions_taken: &mut u32,
    ) -> Result<Outcome> {
        let messages = self.deps.sequences.messages(enrollment.sequence_id).await?;
        if messages.is_empty() {
            return Ok(Outcome::Skipped);
        }

        let step_index = enrollment.current_step.max(0) as usize;
        if step_index >= messages.len() {
            // Steps were deleted under this enrollment; close it out.
            self.deps
                .enrollments
                .advance(enrollment.id, enrollment.current_step, None, true)
                .await?;
            self.deps.bus.emit(Event::EnrollmentAdvanced {
                enrollment_id: enrollment.id,
                sequence_id: enrollment.sequence_id,
                prospect_id: enrollment.prospect_id,
                step: enrollment.current_step,
                completed: true,
            });
            return Ok(Outcome::Skipped);
        }

        let message = &messages[step_index];
        self.pace(actions_taken).await;

        match self
            .bounded(self.deps.driver.send_message(prospect_ref, &message.content))
            .await
        {
            Ok(()) => {
                self.deps.usage.record(day, ActionType::Message, 1).await?;
                *remaining_messages -= 1;

                let completed = step_index + 1 >= messages.len();
                let next_due = (!completed).then(|| {
                    now + chrono::Duration::hours(messages[step_index + 1].delay_hours)
                });

                let applied = self
                    .deps
                    .enrollments
                    .advance(enrollment.id, enrollment.current_step, next_due, completed)
                    .await?;
                if !applied {
                    warn!(
                        enrollment_id = %enrollment.id,
                        "Advance lost to a concurrent pass"
                    );
                }

                let step = (step_index + 1) as i64;
                self.deps.bus.emit(Event::EnrollmentAdvanced {
                    enrollment_id: enrollment.id,
                    sequence_id: enrollment.sequence_id,
                    prospect_id: enrollment.prospect_id,
                    step,
                    completed,
                });
                debug!(
                    enrollment_id = %enrollment.id,
                    step = step,
                    completed = completed,
                    "Message step sent"
                );
                Ok(Outcome::SentMessage)
            }
            Err(err) => self.handle_send_failure(enrollment, now, err).await,
        }
    }

    async fn handle_send_failure(
        &self,
        enrollment: &Enrollment,
        now: DateTime<Utc>,
        err: DriverError,
    ) -> Result<Outcome> {
        match err.kind {
            DriverErrorKind::Transient => {
                let backoff =
                    chrono::Duration::from_std(self.config.transient_backoff).unwrap_or_default();
                let attempts = self
                    .deps
                    .enrollments
                    .defer(enrollment.id, now + backoff)
                    .await?;
                if attempts >= self.config.max_transient_attempts as i64 {
                    // Bounded retries: escalate instead of deferring forever.
                    self.deps.enrollments.mark_failed(enrollment.id).await?;
                    self.deps.bus.emit(Event::EnrollmentFailed {
                        enrollment_id: enrollment.id,
                        sequence_id: enrollment.sequence_id,
                        reason: format!("gave up after {} transient failures: {}", attempts, err),
                    });
                    return Ok(Outcome::Failed);
                }
                debug!(
                    enrollment_id = %enrollment.id,
                    attempts = attempts,
                    error = %err,
                    "Transient send failure, deferred"
                );
                Ok(Outcome::Deferred)
            }
            DriverErrorKind::Permanent => {
                self.deps.enrollments.mark_failed(enrollment.id).await?;
                self.deps.bus.emit(Event::EnrollmentFailed {
                    enrollment_id: enrollment.id,
                    sequence_id: enrollment.sequence_id,
                    reason: err.to_string(),
                });
                Ok(Outcome::Failed)
            }
            DriverErrorKind::Fatal => {
                // The driver is sick, not the enrollment; reschedule
                // without burning an attempt.
                let backoff =
                    chrono::Duration::from_std(self.config.transient_backoff).unwrap_or_default();
                self.deps
                    .enrollments
                    .reschedule(enrollment.id, now + backoff)
                    .await?;
                Ok(Outcome::DriverDown)
            }
        }
    }

    /// Humanized spacing between consecutive outbound actions in a pass.
    async fn pace(&self, actions_taken: &mut u32) {
        if *actions_taken > 0 {
            let min = self.deps.policy.min_action_delay_secs;
            let max = self.deps.policy.max_action_delay_secs.max(min);
            if max > 0 {
                let secs = if min == max {
                    min
                } else {
                    rand::thread_rng().gen_range(min..=max)
                };
                tokio::time::sleep(Duration::from_secs(secs)).await;
            }
        }
        *actions_taken += 1;
    }

    async fn bounded<F>(&self, fut: F) -> std::result::Result<(), DriverError>
    where
        F: Future<Output = std::result::Result<(), DriverError>>,
    {
        match tokio::time::timeout(self.config.send_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(DriverError::transient("send timed out")),
        }
    }
}
