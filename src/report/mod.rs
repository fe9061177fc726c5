mod model;
mod normalize;
mod recovery;
mod service;

pub use model::{coerce_cost, DamageReport, PartDamage, ReportRecord};
pub use normalize::normalize;
pub use recovery::{recover, Recovered, RecoveryTier, UnrecoverableFormat};
pub use service::{ReportOutcome, ReportService};
