//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT call sleep methods. Threads wait on
//! their queues (`blocking_recv`) or on a `WaitIndicator`, never on a timer.
//!
//! **Exceptions**: test code (`#[cfg(test)]` modules and `tests/` dirs).

use architectural_enforcement::{find_violations, rust_files};

const PRODUCTION_DIRS: &[&str] = &["tandem/core/src", "console/src"];

const SLEEP_PATTERNS: &[&str] = &["::sleep(", ".sleep(", "sleep_ms("];

/// Test that production code does not contain sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let violations = find_violations(PRODUCTION_DIRS, SLEEP_PATTERNS);

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Sleep calls found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n❌ FORBIDDEN:");
        eprintln!("  - Sleep in polling loops");
        eprintln!("  - Sleep as poor man's synchronization");
        eprintln!("\n✅ Use instead: WaitIndicator::sync, blocking_recv on a channel");

        panic!(
            "\nFound {} sleep violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

#[test]
fn test_production_sources_are_scanned() {
    for dir in PRODUCTION_DIRS {
        assert!(!rust_files(dir).is_empty(), "no sources found under {dir}");
    }
}
