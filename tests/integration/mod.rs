//! Integration tests

pub mod replica_tests;
