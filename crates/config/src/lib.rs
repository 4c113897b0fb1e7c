//! The ini-style configuration file and its typed per-role schema.
//!
//! # Overview
//!
//! [`ini::Ini`] parses the raw `[section] key = value` text; [`schema::ShardConfig`]
//! validates and types every section the core consumes, matching the
//! layout in the protocol design's configuration surface section.

pub mod error;
pub mod ini;
pub mod schema;

pub use error::ConfigError;
pub use ini::Ini;
pub use schema::{
    ClientSection, CryptRoleKeys, DbSection, LobbySection, LogLevel, LogSection, PeerSection,
    ShardConfig,
};
