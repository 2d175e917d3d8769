use primitives::{Money, PlotId};
use std::fmt;

/// The three independently timed plot features.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimedKind {
    Lifetime,
    VerticalExpansion,
    FlagRental,
}

impl TimedKind {
    pub fn label(self) -> &'static str {
        match self {
            TimedKind::Lifetime => "lifetime",
            TimedKind::VerticalExpansion => "vertical expansion",
            TimedKind::FlagRental => "flag rental",
        }
    }
}

impl fmt::Display for TimedKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}


/// Something a player should be told about. Presentation layers decide how it is worded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A timed feature is about to run out.
    ExpiryWarning { kind: TimedKind, plot: PlotId, flag: Option<String>, minutes: u64 },
    /// A timed feature ran out and its effect was reverted (or the plot reclaimed).
    Expired { kind: TimedKind, plot: PlotId, flag: Option<String> },
    /// A confirmation was not given in time and has been discarded.
    ConfirmationTimedOut { what: String },
    /// Money was returned after a failed operation.
    Refunded { amount: Money, reason: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Notice::ExpiryWarning { kind, ref plot, ref flag, minutes } => match *flag {
                Some(ref flag) => write!(f, "The {} of '{}' on plot {} ends in {} minute(s).", kind, flag, plot, minutes),
                None => write!(f, "The {} of plot {} ends in {} minute(s).", kind, plot, minutes),
            },
            Notice::Expired { kind, ref plot, ref flag } => match *flag {
                Some(ref flag) => write!(f, "The {} of '{}' on plot {} has ended.", kind, flag, plot),
                None => write!(f, "The {} of plot {} has ended.", kind, plot),
            },
            Notice::ConfirmationTimedOut { ref what } =>
                write!(f, "Confirmation for {} timed out.", what),
            Notice::Refunded { amount, ref reason } =>
                write!(f, "{} has been refunded: {}", amount, reason),
        }
    }
}
