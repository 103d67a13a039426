//! Unit test suite for codevar
//!
//! Cross-module tests of the resolution engine against in-memory
//! collaborators from `codevar::test_utils`. Nothing here touches the disk or
//! the network.
//!
//! ```bash
//! cargo test --test unit
//! ```
//!
//! - **loader_properties**: Graph-level guarantees of variant resolution
//! - **validation_cases**: Rejection of malformed loader and variant data
//! - **transform_round_trip**: Transforms computed during loading replay exactly

mod loader_properties;
mod transform_round_trip;
mod validation_cases;
