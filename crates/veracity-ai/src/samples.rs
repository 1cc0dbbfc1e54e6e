//! Sample inputs for smoke-testing a bundle: a wire-service report and a
//! partisan opinion piece.

/// Sourced wire-style report; expected to classify as REAL.
pub const REAL_EXAMPLE: &str = include_str!("../samples/real.txt");

/// Partisan opinion-style paragraph; expected to classify as FAKE.
pub const FAKE_EXAMPLE: &str = include_str!("../samples/fake.txt");
