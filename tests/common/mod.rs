//! Shared helpers for the test binaries.

#![allow(dead_code)]

pub mod fixtures;
