//! log macro's for instance logging

/// Writes a debug! message to the app::instance logger
#[macro_export]
macro_rules! instance_debug {
    ($($arg:tt)+) => {
        log::debug!(target: "app::instance", $($arg)+)
    };
}

/// Writes an info! message to the app::instance logger
#[macro_export]
macro_rules! instance_info {
    ($($arg:tt)+) => {
        log::info!(target: "app::instance", $($arg)+)
    };
}

/// Writes an warn! message to the app::instance logger
#[macro_export]
macro_rules! instance_warn {
    ($($arg:tt)+) => {
        log::warn!(target: "app::instance", $($arg)+)
    };
}

/// Writes an error! message to the app::instance logger
#[macro_export]
macro_rules! instance_error {
    ($($arg:tt)+) => {
        log::error!(target: "app::instance", $($arg)+)
    };
}
