pub mod clock; // skipcq: RS-D1001

pub mod errors; // skipcq: RS-D1001

pub mod executor; // skipcq: RS-D1001

pub mod listener; // skipcq: RS-D1001

pub mod monitor; // skipcq: RS-D1001

pub mod options; // skipcq: RS-D1001

pub mod schedule; // skipcq: RS-D1001

pub mod status; // skipcq: RS-D1001

pub mod prelude {
    // Core
    pub use crate::listener::{MAX_TIMER_INTERVAL, TimerListener};
    pub use crate::status::{NEVER, ScheduleStatus};

    // Schedules
    pub use crate::schedule::{ConstantSchedule, CronSchedule, TimerSchedule};

    // Monitoring
    pub use crate::monitor::{
        FileScheduleMonitor,
        InMemoryScheduleMonitor,
        ScheduleMonitor,
    };

    // Execution
    pub use crate::executor::{ExecutionResult, TimerExecutor, TimerInfo};

    // Host configuration
    pub use crate::options::{
        NameResolver,
        TimerTriggerOptions,
        resolve_schedule_expression,
    };

    // Clocks
    pub use crate::clock::{
        AdvanceableTimerClock,
        SystemClock,
        TimerClock,
        VirtualClock,
    };

    // Errors
    pub use crate::errors::{ListenerError, MonitorError, ScheduleError};
} // skipcq: RS-D1001
