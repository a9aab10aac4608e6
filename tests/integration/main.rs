//! Integration tests for Sumi-Trawl

mod interrupt_tests;
mod trawl_tests;
