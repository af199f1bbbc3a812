pub mod event;
pub mod history;
pub mod intent;
pub mod preference;
pub mod trace;

pub use event::{EventRecord, PriceRange};
pub use history::{Feedback, QueryRecord};
pub use intent::SearchIntent;
pub use preference::Preference;
pub use trace::{StepName, WorkflowStep, WorkflowStepRow};
