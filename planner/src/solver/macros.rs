//! log macro's for solver logging

/// Writes a debug! message to the app::solver logger
#[macro_export]
macro_rules! solver_debug {
    ($($arg:tt)+) => {
        log::debug!(target: "app::solver", $($arg)+)
    };
}

/// Writes an info! message to the app::solver logger
#[macro_export]
macro_rules! solver_info {
    ($($arg:tt)+) => {
        log::info!(target: "app::solver", $($arg)+)
    };
}

/// Writes an warn! message to the app::solver logger
#[macro_export]
macro_rules! solver_warn {
    ($($arg:tt)+) => {
        log::warn!(target: "app::solver", $($arg)+)
    };
}

/// Writes an error! message to the app::solver logger
#[macro_export]
macro_rules! solver_error {
    ($($arg:tt)+) => {
        log::error!(target: "app::solver", $($arg)+)
    };
}
