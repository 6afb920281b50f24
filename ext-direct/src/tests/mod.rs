//! Crate-level tests exercising routing and invocation end to end.

mod router_tests;
