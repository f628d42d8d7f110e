use std::sync::{Arc, RwLock};

use db::{
    EnrollmentRepository, ProspectRepository, SequenceRepository, SessionRepository, SqlitePool,
    UsageRepository,
};
use events::EventBus;
use orchestrator::{
    ControlRegistry, PlatformDriver, ScrapeConfig, ScrapeDeps, SequenceDeps, WorkerSlot,
};

use crate::config::OutreachConfig;
use crate::routes::sse::{EventBuffer, SharedEventBuffer, DEFAULT_EVENT_BUFFER_SIZE};

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionRepository,
    pub sequences: SequenceRepository,
    pub enrollments: EnrollmentRepository,
    pub prospects: ProspectRepository,
    pub usage: UsageRepository,
    pub event_bus: EventBus,
    pub event_buffer: SharedEventBuffer,
    pub scrape_deps: ScrapeDeps,
    pub scrape_config: ScrapeConfig,
}

impl AppState {
    pub fn new(pool: SqlitePool, driver: Arc<dyn PlatformDriver>, config: &OutreachConfig) -> Self {
        let sessions = SessionRepository::new(pool.clone());
        let sequences = SequenceRepository::new(pool.clone());
        let enrollments = EnrollmentRepository::new(pool.clone());
        let prospects = ProspectRepository::new(pool.clone());
        let usage = UsageRepository::new(pool);

        let event_bus = EventBus::new();
        let event_buffer = Arc::new(RwLock::new(EventBuffer::new(DEFAULT_EVENT_BUFFER_SIZE)));

        let scrape_deps = ScrapeDeps {
            sessions: sessions.clone(),
            prospects: prospects.clone(),
            usage: usage.clone(),
            driver,
            bus: event_bus.clone(),
            policy: config.pacing.clone(),
            controls: ControlRegistry::new(),
            slot: WorkerSlot::new(),
        };

        Self {
            sessions,
            sequences,
            enrollments,
            prospects,
            usage,
            event_bus,
            event_buffer,
            scrape_deps,
            scrape_config: config.scrape_config(),
        }
    }

    /// Dependencies for the background sequence scheduler; shares the bus,
    /// driver and policy with the scrape side.
    pub fn sequence_deps(&self) -> SequenceDeps {
        SequenceDeps {
            sequences: self.sequences.clone(),
            enrollments: self.enrollments.clone(),
            prospects: self.prospects.clone(),
            usage: self.usage.clone(),
            driver: self.scrape_deps.driver.clone(),
            bus: self.event_bus.clone(),
            policy: self.scrape_deps.policy.clone(),
        }
    }
}
