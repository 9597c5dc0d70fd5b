pub mod backend;
pub mod identity;
pub mod format;
pub mod device;
pub mod server;
pub mod error;
pub mod cli;

// Test-only printing helper: expands to eprintln! during tests/debug and is absent otherwise.
// Usage: jprintln!("debug: {}", value);
#[cfg(any(test, debug_assertions))]
#[macro_export]
macro_rules! jprintln {
    ($($arg:tt)*) => ( eprintln!($($arg)*) );
}

// In non-test builds, provide a no-op jprintln! so calls compile without effect.
#[cfg(not(any(test, debug_assertions)))]
#[macro_export]
macro_rules! jprintln {
    ($($arg:tt)*) => ({
        // Preserve formatting checks in release without producing code
        if false { let _ = format!($($arg)*); }
    });
}
