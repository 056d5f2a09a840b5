/// Contractual exit codes and the stderr error line format.
///
/// Every failing command emits exactly one JSON line
/// `{"status":"...","error_code":"...","detail":"..."}` on stderr.
use rostra_core::SolveError;

pub const EXIT_OK: i32 = 0;
pub const EXIT_WARN: i32 = 1;
pub const EXIT_FAIL: i32 = 2;

pub fn emit_error(error_code: &str, detail: &str) {
    let line = serde_json::json!({
        "status": "ERROR",
        "error_code": error_code,
        "detail": detail,
    });
    eprintln!("{line}");
}

/// Map a solver error to its code and emit the stderr line.
pub fn emit_solve_error(err: &SolveError) {
    emit_error(err.error_code(), &err.to_string());
}

pub fn emit_anyhow(err: &anyhow::Error) {
    match err.downcast_ref::<SolveError>() {
        Some(solve_err) => emit_solve_error(solve_err),
        None => emit_error("INTERNAL", &err.to_string()),
    }
}
