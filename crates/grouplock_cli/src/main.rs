//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `grouplock_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("grouplock_core ping={}", grouplock_core::ping());
    println!("grouplock_core version={}", grouplock_core::core_version());
}
