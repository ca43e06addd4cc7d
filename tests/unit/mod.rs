pub mod catalog_tests;
pub mod persistence_tests;
pub mod driver_tests;
