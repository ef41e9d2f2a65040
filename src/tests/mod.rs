//! Scenario tests for the scheduler
//!
//! Organized by instruction shape / feature area

mod helpers;

mod capture_tests;
mod lookup_tests;
