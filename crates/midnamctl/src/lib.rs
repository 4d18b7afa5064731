//! Command implementations for `midnamctl`.

pub mod cmd_details;
pub mod cmd_info;
pub mod cmd_merge;
pub mod cmd_normalize;
pub mod cmd_patch;
pub mod cmd_validate;
pub mod common;
