//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `tasknest_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    // Why: keep a tiny CLI probe to validate core crate wiring independently
    // from any host-app embedding.
    println!("tasknest_core ping={}", tasknest_core::ping());
    println!("tasknest_core version={}", tasknest_core::core_version());
}
