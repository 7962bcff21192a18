pub mod availability;
pub mod project_state;
pub mod skills;

pub use availability::{AvailabilityError, AvailabilityMap, Interval, SlotStatus};
pub use project_state::{parse_amount, AmountError, ProjectState, TransitionError};
pub use skills::{Skill, Skills, SkillsError};
