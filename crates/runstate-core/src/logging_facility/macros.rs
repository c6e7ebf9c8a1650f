//! Canonical logging macros
//!
//! These macros provide a structured, consistent way to log operations.
//! Callers need `tracing` and `runstate_core_types` in scope as dependencies.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use runstate_core::log_op_start;
/// log_op_start!("persist_dataset_state");
/// log_op_start!("persist_dataset_state", job_name = "ingest1");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = runstate_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = runstate_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use runstate_core::log_op_end;
/// log_op_end!("persist_dataset_state", duration_ms = 42);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = runstate_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = runstate_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation error
///
/// `$err` must convert into [`RsError`](crate::errors::RsError).
///
/// # Example
///
/// ```
/// # use runstate_core::{log_op_error, errors::RunStateError};
/// let err = RunStateError::not_found("ingest1", "current.dstate");
/// log_op_error!("get_latest_dataset_state", err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let rs_err: $crate::errors::RsError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = runstate_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?rs_err.kind(),
            err_code = rs_err.code(),
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let rs_err: $crate::errors::RsError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = runstate_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?rs_err.kind(),
            err_code = rs_err.code(),
            $($field)*
        );
    }};
}
