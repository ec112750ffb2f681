//! Release scripts: publish the version recorded in the changelog, or
//! generate the changelog entry for the next one.
pub mod args;
pub mod config;
pub mod logging;
pub mod pipeline;
pub mod release;
pub mod tools;
