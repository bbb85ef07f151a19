#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod error;
#[cfg(feature = "feeds")]
pub mod feeds;
#[cfg(feature = "feeds")]
pub(crate) mod serde_helpers;
pub mod ws;

use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Environment variable the demos read the HTTP API base URL from.
pub const API_URL_VAR: &str = "ATH_API_URL";
