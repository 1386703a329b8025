//! AVQ Test Modules
//!
//! Property tests over the lattice, the gain search and the multiplexer, and
//! scenario tests for the documented allocation cases.

mod scenario_tests;
