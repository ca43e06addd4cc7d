pub mod scenario_tests;
pub mod shutdown_tests;
