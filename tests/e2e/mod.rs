#![allow(dead_code)]

mod harness;
pub use harness::*;

mod check_tests;
mod digest_tests;
