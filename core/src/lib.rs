extern crate bincode;
extern crate serde;
extern crate serde_json;
extern crate time as timelib;

#[macro_use]
extern crate maplit;

#[macro_use]
extern crate serde_derive;

#[macro_use]
extern crate log;

pub mod collision;
pub mod config;
pub mod env;
pub mod error;
pub mod events;
pub mod geometry;
pub mod host;
pub mod mutator;
pub mod outline;
pub mod pending;
pub mod primitives;
pub mod service;
pub mod storage;
pub mod time;
pub mod timed;

pub use error::{Error, MutationError, ValidationError};
pub use service::PlotService;
