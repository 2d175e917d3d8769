use bincode;
use geometry::IntegrityIssue;
use primitives::{Money, PlotId};
use serde_json;
use std::error::Error as StdErr;
use std::fmt;
use std::io;

#[derive(Debug)]
pub enum Error {
    Validation(ValidationError), // request refused; nothing changed
    Mutation(MutationError), // the region authority refused or half-applied a change
    StaleReference(PlotId), // the plot no longer exists
    Integrity { plot: PlotId, issue: IntegrityIssue }, // stored bounds break the level rules
    Storage(String), // persisted state could not be read or written
    Config(String), // the configuration cannot be used
}

/// Reasons a request is refused before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Collision { conflicts: Vec<PlotId> },
    CapExceeded { limit: usize },
    InsufficientFunds { needed: Money, balance: Money },
    LevelNotIncreasing { current: u32, requested: u32 },
    LevelOutOfRange { requested: u32, max: u32 },
    OutsideWorld,
    DurationTooShort { minimum_secs: u64 },
    UnknownFlag(String),
    UnknownPlayer,
    NotOwner,
    NoPendingOperation,
    /// The timed feature being deactivated or renewed is not running.
    NotActive,
}

/// Outcomes of a failed remove-then-recreate commit on the region authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    /// The plot was not present to begin with.
    Stale(PlotId),
    /// The authority refused to remove the plot; nothing changed.
    Rejected { id: PlotId, reason: String },
    /// The replacement could not be added, the original was put back.
    RolledBack { id: PlotId, reason: String },
    /// The replacement could not be added and the original could not be restored either. The plot
    /// is gone from the authority and needs manual intervention.
    Unrecoverable { id: PlotId, reason: String },
}

impl Error {
    /// True for failures which left the region authority as it was, so the same change can simply
    /// be tried again.
    pub fn left_unchanged(&self) -> bool {
        match *self {
            Error::Mutation(MutationError::Rejected { .. }) |
            Error::Mutation(MutationError::RolledBack { .. }) => true,
            _ => false
        }
    }
}

impl StdErr for Error {
    fn source(&self) -> Option<&(dyn StdErr + 'static)> {
        match *self {
            Error::Validation(ref e) => Some(e),
            Error::Mutation(ref e) => Some(e),
            Error::StaleReference(_) => None,
            Error::Integrity { .. } => None,
            Error::Storage(_) => None,
            Error::Config(_) => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Validation(ref e) => write!(f, "Request refused: {}", e),
            Error::Mutation(ref e) => write!(f, "Region change failed: {}", e),
            Error::StaleReference(ref id) => write!(f, "Plot '{}' no longer exists.", id),
            Error::Integrity { ref plot, issue } => write!(f, "Plot '{}' is malformed: {}", plot, issue),
            Error::Storage(ref s) => write!(f, "Storage error: {}", s),
            Error::Config(ref s) => write!(f, "Invalid configuration: {}", s),
        }
    }
}

impl StdErr for ValidationError {}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::ValidationError::*;
        match *self {
            Collision { ref conflicts } => write!(f, "overlaps plot(s) {}", conflicts.join(", ")),
            CapExceeded { limit } => write!(f, "owner already holds the maximum of {} plot(s)", limit),
            InsufficientFunds { needed, balance } =>
                write!(f, "costs {} but only {} is available", needed, balance),
            LevelNotIncreasing { current, requested } =>
                write!(f, "plot is already at level {}, cannot go to {}", current, requested),
            LevelOutOfRange { requested, max } =>
                write!(f, "level {} is beyond the maximum level {}", requested, max),
            OutsideWorld => f.write_str("bounds reach outside the world height"),
            DurationTooShort { minimum_secs } =>
                write!(f, "duration must be at least {} seconds", minimum_secs),
            UnknownFlag(ref name) => write!(f, "flag '{}' cannot be rented", name),
            UnknownPlayer => f.write_str("player is unknown"),
            NotOwner => f.write_str("only the owner may do that"),
            NoPendingOperation => f.write_str("nothing is waiting for confirmation"),
            NotActive => f.write_str("that feature is not active on this plot"),
        }
    }
}

impl StdErr for MutationError {}

impl fmt::Display for MutationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            MutationError::Stale(ref id) => write!(f, "plot '{}' does not exist", id),
            MutationError::Rejected { ref id, ref reason } =>
                write!(f, "plot '{}' could not be removed for replacement: {}", id, reason),
            MutationError::RolledBack { ref id, ref reason } =>
                write!(f, "plot '{}' was restored after a failed change: {}", id, reason),
            MutationError::Unrecoverable { ref id, ref reason } =>
                write!(f, "plot '{}' was lost and could not be restored: {}", id, reason),
        }
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self { Error::Validation(e) }
}

impl From<MutationError> for Error {
    fn from(e: MutationError) -> Self {
        match e {
            MutationError::Stale(id) => Error::StaleReference(id),
            e => Error::Mutation(e)
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self { Error::Storage(e.to_string()) }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self { Error::Storage(e.to_string()) }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self { Error::Storage(e.to_string()) }
}
