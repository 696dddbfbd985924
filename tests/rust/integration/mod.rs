//! Integration tests - join trees, generated selects, hydration and loading
//! exercised together through the public API.


mod hydration_tests;
mod loader_tests;
mod mapping_config_tests;
mod projection_tests;
mod query_alias_tests;
