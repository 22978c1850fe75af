// Download strategies, tried in this order by the orchestrator

pub mod emergency;
pub mod primary;
pub mod secondary;

pub use emergency::EmergencyStrategy;
pub use primary::PrimaryStrategy;
pub use secondary::SecondaryStrategy;
