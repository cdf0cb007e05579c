//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the scripted mock transport. All tests run on the host with no
//! controller attached.

mod mock_transport;
mod nvm_tests;
mod power_tests;
mod timeout_tests;
