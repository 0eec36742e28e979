//! Property-based tests: invariants that must hold for any input, not just
//! the fixtures the unit tests pin down.

mod generators;
mod invariants;
