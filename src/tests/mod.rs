//! Session-level scenario tests.
//!
//! These drive the loader against an in-memory API with `pollster` and check
//! the engine's behaviour across loading, editing and navigation.

mod navigation_tests;
mod support;
