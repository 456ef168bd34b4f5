//! Integration tests

mod e2e_test;
mod orchestrator_test;
mod session_test;
mod support;
