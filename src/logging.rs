//! One-time `env_logger` setup shared by the integration tests
//! (SPEC_FULL.md §A.1), matching the teacher's `init_log`/`Once` pattern.

use std::io::Write;
use std::sync::Once;

use env_logger::Builder;

static INIT: Once = Once::new();

/// Initializes `env_logger` exactly once per test binary. Safe to call from
/// every test; later calls are no-ops.
pub fn init_for_tests() {
    INIT.call_once(|| {
        let mut builder = Builder::from_default_env();
        builder
            .format_timestamp_micros()
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{} {}] [{}:{}] {}",
                    record.level(),
                    record.target(),
                    record.file().unwrap_or("?"),
                    record.line().unwrap_or(0),
                    record.args()
                )
            })
            .init();
    });
}
