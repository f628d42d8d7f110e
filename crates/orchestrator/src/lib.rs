//! Campaign orchestration: the scrape session worker and the sequence
//! send scheduler, plus the platform driver boundary they talk through.
//!
//! Both schedulers mutate state only through the store's atomic
//! operations; the in-process pieces here (worker slot, control signals)
//! exist so pause/stop are observed promptly and only one scrape worker
//! ever runs.

mod backoff;
mod controls;
mod driver;
mod error;
mod http_driver;
mod scrape;
mod sequence;

pub use backoff::backoff_delay;
pub use controls::{ControlRegistry, ControlSignal, SlotGuard, WorkerSlot};
pub use driver::{DriverError, DriverErrorKind, PlatformDriver, ProspectPage, ProspectRef};
pub use error::{OrchestratorError, Result};
pub use http_driver::HttpDriver;
pub use scrape::{ScrapeConfig, ScrapeDeps, ScrapeHandle, ScrapeRunner};
pub use sequence::{PassSummary, SequenceDeps, SequenceScheduler, SequenceSchedulerConfig};

#[cfg(test)]
pub(crate) mod test_driver;
