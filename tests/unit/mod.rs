mod cache_tests;
mod config_tests;
mod editor_tests;
mod multistatus_tests;
mod query_body_tests;
mod retry_tests;
mod transform_tests;
