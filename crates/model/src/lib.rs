#![deny(unsafe_code)]
#![deny(unused_must_use)]
#![deny(unused_features)]
#![warn(unused_crate_dependencies)]

//! Data types shared between image moderation, the sanction engine,
//! the database and the HTTP API.

pub mod account;
pub mod macros;
pub mod moderation;
pub mod sanction;
pub mod schema;
pub mod time;

pub use account::*;
pub use moderation::*;
pub use sanction::*;
pub use time::*;

pub type Db = diesel::sqlite::Sqlite;
