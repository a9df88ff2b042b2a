//! log macro's for planner logging

/// Writes a debug! message to the app::planner logger
#[macro_export]
macro_rules! planner_debug {
    ($($arg:tt)+) => {
        log::debug!(target: "app::planner", $($arg)+)
    };
}

/// Writes an info! message to the app::planner logger
#[macro_export]
macro_rules! planner_info {
    ($($arg:tt)+) => {
        log::info!(target: "app::planner", $($arg)+)
    };
}

/// Writes an warn! message to the app::planner logger
#[macro_export]
macro_rules! planner_warn {
    ($($arg:tt)+) => {
        log::warn!(target: "app::planner", $($arg)+)
    };
}

/// Writes an error! message to the app::planner logger
#[macro_export]
macro_rules! planner_error {
    ($($arg:tt)+) => {
        log::error!(target: "app::planner", $($arg)+)
    };
}
