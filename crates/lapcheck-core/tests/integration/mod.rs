pub mod common;
mod rerun_tests;
mod scenario_file_tests;
