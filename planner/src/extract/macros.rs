//! log macro's for extract logging

/// Writes a debug! message to the app::extract logger
#[macro_export]
macro_rules! extract_debug {
    ($($arg:tt)+) => {
        log::debug!(target: "app::extract", $($arg)+)
    };
}

/// Writes an info! message to the app::extract logger
#[macro_export]
macro_rules! extract_info {
    ($($arg:tt)+) => {
        log::info!(target: "app::extract", $($arg)+)
    };
}

/// Writes an warn! message to the app::extract logger
#[macro_export]
macro_rules! extract_warn {
    ($($arg:tt)+) => {
        log::warn!(target: "app::extract", $($arg)+)
    };
}

/// Writes an error! message to the app::extract logger
#[macro_export]
macro_rules! extract_error {
    ($($arg:tt)+) => {
        log::error!(target: "app::extract", $($arg)+)
    };
}
