//! # Utils
//!
//! Small helpers shared by embeds and commands: compact number formatting,
//! human readable durations, ordinals, random tokens and snowflake ids.

pub mod format;
pub mod tokens;

pub use format::{
    format_number, number_to_ordinal, seconds_to_hms, seconds_to_hms_str, simple_time_format,
    upper_case_to_space, upper_case_to_space_all,
};
pub use tokens::{random_token, Epoch, Snowflake, TokenEncoding};
