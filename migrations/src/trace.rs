//! Tracing utilities for migration observability.
//!
//! Enable the `tracing` feature to emit events via the `tracing` crate.
//! These macros no-op when the feature is disabled, avoiding `#[cfg]` boilerplate
//! at every call site.

/// Emit a debug-level tracing event with the SQL text and parameter count.
///
/// ```ignore
/// tabula_trace_sql!(&sql, params.len());
/// ```
#[macro_export]
macro_rules! tabula_trace_sql {
    ($sql:expr, $param_count:expr) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(sql = %$sql, params = $param_count, "tabula.sql");
    };
}

/// Emit an info-level tracing event for transaction lifecycle (begin, commit,
/// rollback, retry) on a given table.
///
/// ```ignore
/// tabula_trace_tx!("commit", table);
/// ```
#[macro_export]
macro_rules! tabula_trace_tx {
    ($event:literal, $table:expr) => {
        #[cfg(feature = "tracing")]
        tracing::info!(event = $event, table = %$table, "tabula.transaction");
    };
}

/// Emit a warn-level event for failures that are logged and swallowed.
///
/// ```ignore
/// tabula_warn!("catalog resync failed", error = %e);
/// ```
#[macro_export]
macro_rules! tabula_warn {
    ($msg:literal $(, $key:ident = %$val:expr)* $(,)?) => {
        #[cfg(feature = "tracing")]
        tracing::warn!($($key = %$val,)* $msg);
        #[cfg(not(feature = "tracing"))]
        {
            $(let _ = &$val;)*
        }
    };
}
