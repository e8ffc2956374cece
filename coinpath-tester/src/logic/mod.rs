pub mod policy;
pub mod reports;
pub mod seeds;
pub mod simulation;
pub mod tester;

pub use policy::SaverStrategy;
pub use seeds::resolve_seed_inputs;
pub use simulation::{JourneySimulator, SharedNarrator, SimulationPlan, SimulationSummary};
pub use tester::*;
