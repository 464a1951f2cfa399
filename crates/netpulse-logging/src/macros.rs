//! ---
//! np_section: "03-logging"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Structured logging context and macros."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
/// Shared expansion for the `np_*` macros.
#[doc(hidden)]
#[macro_export]
macro_rules! __np_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx: &$crate::LogContext = &$ctx;
        $crate::__tracing::event!(
            $level,
            population = ctx.population.unwrap_or(""),
            device = ctx.device.unwrap_or(""),
            tick = ctx.tick.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational event enriched with population context.
#[macro_export]
macro_rules! np_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__np_event!($crate::__tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__np_event!($crate::__tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning event enriched with population context.
#[macro_export]
macro_rules! np_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__np_event!($crate::__tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__np_event!($crate::__tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an error event enriched with population context.
#[macro_export]
macro_rules! np_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__np_event!($crate::__tracing::Level::ERROR, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__np_event!($crate::__tracing::Level::ERROR, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug event enriched with population context.
#[macro_export]
macro_rules! np_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__np_event!($crate::__tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__np_event!($crate::__tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}
