#[cfg(feature = "definitions")]
mod definitions_tests;
mod history_tests;
mod response_tests;
