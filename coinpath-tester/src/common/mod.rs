pub mod scenario;
pub mod util;

pub use util::{load_journey_config, split_csv};
