//! log macro's for model logging

/// Writes a debug! message to the app::model logger
#[macro_export]
macro_rules! model_debug {
    ($($arg:tt)+) => {
        log::debug!(target: "app::model", $($arg)+)
    };
}

/// Writes an info! message to the app::model logger
#[macro_export]
macro_rules! model_info {
    ($($arg:tt)+) => {
        log::info!(target: "app::model", $($arg)+)
    };
}

/// Writes an warn! message to the app::model logger
#[macro_export]
macro_rules! model_warn {
    ($($arg:tt)+) => {
        log::warn!(target: "app::model", $($arg)+)
    };
}

/// Writes an error! message to the app::model logger
#[macro_export]
macro_rules! model_error {
    ($($arg:tt)+) => {
        log::error!(target: "app::model", $($arg)+)
    };
}
