//! ---
//! pid_section: "03-persistence-logging"
//! pid_subsection: "module"
//! pid_type: "source"
//! pid_scope: "code"
//! pid_description: "Structured logging adapters and sinks."
//! pid_version: "v0.0.0-prealpha"
//! pid_owner: "tbd"
//! ---
/// Emit an informational log enriched with enrollment context.
#[macro_export]
macro_rules! pid_info {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::INFO,
            role = ctx.role.unwrap_or(""),
            patient_id = ctx.patient_id.unwrap_or(""),
            operation = ctx.operation.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::pid_info!(context = $crate::LogContext::default(), $($arg)+)
    }};
}

/// Emit a warning enriched with enrollment context.
#[macro_export]
macro_rules! pid_warn {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::WARN,
            role = ctx.role.unwrap_or(""),
            patient_id = ctx.patient_id.unwrap_or(""),
            operation = ctx.operation.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::pid_warn!(context = $crate::LogContext::default(), $($arg)+)
    }};
}

/// Emit an error log enriched with enrollment context.
#[macro_export]
macro_rules! pid_error {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::ERROR,
            role = ctx.role.unwrap_or(""),
            patient_id = ctx.patient_id.unwrap_or(""),
            operation = ctx.operation.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::pid_error!(context = $crate::LogContext::default(), $($arg)+)
    }};
}
