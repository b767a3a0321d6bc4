pub mod cli; // skipcq: RS-D1001

pub mod clock; // skipcq: RS-D1001

pub mod engine; // skipcq: RS-D1001

pub mod errors; // skipcq: RS-D1001

pub mod executor; // skipcq: RS-D1001

pub mod job; // skipcq: RS-D1001

pub mod logging; // skipcq: RS-D1001

pub mod registry; // skipcq: RS-D1001

pub mod schedule; // skipcq: RS-D1001

pub mod scheduler; // skipcq: RS-D1001

pub mod suspend; // skipcq: RS-D1001

pub mod task; // skipcq: RS-D1001

pub mod utils; // skipcq: RS-D1001

pub mod prelude {
    pub use crate::clock::{AdvanceableScheduleClock, SchedulerClock, SystemClock, VirtualClock};
    pub use crate::engine::{BatchReport, Engine, JobReport};
    pub use crate::errors::{BoxError, EaseError, HandlerResult, JobValidationError, SharedError};
    pub use crate::executor::{JobOutcome, TaskOutcome};
    pub use crate::job::{JobContext, JobHandler, JobInfo, JobOptions};
    pub use crate::schedule::{Schedule, ScheduleOptions};
    pub use crate::task::{HookKind, TaskContext, TaskHandler, TaskLogger};
}
