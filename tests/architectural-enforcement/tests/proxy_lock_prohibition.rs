//! Integration Test: Lock Prohibition in Proxies
//!
//! **Policy**: Proxy modules MUST NOT use locks. A proxy lives on the UI
//! thread and reaches session state only through requests; shared state in a
//! proxy means it is bypassing the actor.
//!
//! **Exceptions**: none. Signals keep their own bookkeeping inside the core
//! crate.

use architectural_enforcement::{find_violations, rust_files};

const PROXY_DIRS: &[&str] = &["console/src/proxy"];

const LOCK_PATTERNS: &[&str] = &["Mutex", "RwLock", "Condvar"];

/// Test that proxy code does not contain locks
#[test]
fn test_no_locks_in_proxy_modules() {
    let violations = find_violations(PROXY_DIRS, LOCK_PATTERNS);

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Locks found in proxy code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ Use instead:");
        eprintln!("  - ProxyBase::call for synchronous queries");
        eprintln!("  - ProxyBase::post_with_reply plus a Signal for async results");

        panic!(
            "\nFound {} lock violation(s) in proxy code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// The scan must actually see the proxy sources
#[test]
fn test_proxy_sources_are_scanned() {
    let files = rust_files("console/src/proxy");
    assert!(
        files.len() >= 4,
        "expected the proxy modules to be found, got {files:?}"
    );
}
