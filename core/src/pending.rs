use primitives::{Money, OwnerId, PlotId};
use std::collections::BTreeMap;
use std::fmt;
use time::Time;

/// Something bought with money, quoted first and paid on confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Purchase {
    Expand { plot: PlotId, level: u32 },
    VerticalExpansion { plot: PlotId, seconds: u64 },
    FlagRental { plot: PlotId, flag: String, seconds: u64 },
    LifetimeRenewal { plot: PlotId, seconds: u64 },
}

impl Purchase {
    pub fn plot(&self) -> &str {
        match *self {
            Purchase::Expand { ref plot, .. } |
            Purchase::VerticalExpansion { ref plot, .. } |
            Purchase::FlagRental { ref plot, .. } |
            Purchase::LifetimeRenewal { ref plot, .. } => plot
        }
    }
}

impl fmt::Display for Purchase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Purchase::Expand { ref plot, level } => write!(f, "expanding {} to level {}", plot, level),
            Purchase::VerticalExpansion { ref plot, seconds } =>
                write!(f, "vertical expansion of {} for {}s", plot, seconds),
            Purchase::FlagRental { ref plot, ref flag, seconds } =>
                write!(f, "renting '{}' on {} for {}s", flag, plot, seconds),
            Purchase::LifetimeRenewal { ref plot, seconds } =>
                write!(f, "extending the lifetime of {} by {}s", plot, seconds),
        }
    }
}

/// An operation waiting for its player to confirm it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingOp {
    Delete { plot: PlotId },
    Purchase { purchase: Purchase, price: Money },
}

impl fmt::Display for PendingOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            PendingOp::Delete { ref plot } => write!(f, "deleting {}", plot),
            PendingOp::Purchase { ref purchase, price } => write!(f, "{} (price {})", purchase, price),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    op: PendingOp,
    expires_at: Time,
}

/// At most one operation per player awaits confirmation. A new request replaces the previous one;
/// a token which timed out can no longer be confirmed.
#[derive(Debug, Default)]
pub struct PendingOperations {
    tokens: BTreeMap<OwnerId, Token>,
}

impl PendingOperations {
    pub fn new() -> PendingOperations {
        PendingOperations::default()
    }

    /// Returns the operation this one replaced, if any.
    pub fn request(&mut self, owner: &OwnerId, op: PendingOp, expires_at: Time) -> Option<PendingOp> {
        self.tokens.insert(owner.clone(), Token { op, expires_at }).map(|t| t.op)
    }

    pub fn get(&self, owner: &OwnerId, now: Time) -> Option<&PendingOp> {
        self.tokens.get(owner)
            .filter(|t| now < t.expires_at)
            .map(|t| &t.op)
    }

    /// Take the operation for confirmation. Nothing is returned once it has timed out.
    pub fn take(&mut self, owner: &OwnerId, now: Time) -> Option<PendingOp> {
        match self.tokens.remove(owner) {
            Some(ref t) if now >= t.expires_at => None,
            Some(t) => Some(t.op),
            None => None
        }
    }

    pub fn cancel(&mut self, owner: &OwnerId) -> Option<PendingOp> {
        self.tokens.remove(owner).map(|t| t.op)
    }

    /// Remove every token which timed out at `now`.
    pub fn expire(&mut self, now: Time) -> Vec<(OwnerId, PendingOp)> {
        let owners: Vec<OwnerId> = self.tokens.iter()
            .filter(|&(_, t)| now >= t.expires_at)
            .map(|(o, _)| o.clone())
            .collect();

        owners.into_iter()
            .filter_map(|o| self.tokens.remove(&o).map(|t| (o, t.op)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn delete(plot: &str) -> PendingOp {
        PendingOp::Delete { plot: plot.into() }
    }

    #[test]
    fn one_token_per_player() {
        let mut pending = PendingOperations::new();
        let alice: OwnerId = "alice".into();
        let t = Time::from_seconds(60);
        assert_eq!(pending.request(&alice, delete("alice_1"), t), None);
        assert_eq!(pending.request(&alice, delete("alice_2"), t), Some(delete("alice_1")));
        assert_eq!(pending.len(), 1);
        assert_eq!(pending.take(&alice, Time::from_seconds(10)), Some(delete("alice_2")));
        assert_eq!(pending.take(&alice, Time::from_seconds(10)), None);
    }

    #[test]
    fn timed_out_tokens_cannot_be_confirmed() {
        let mut pending = PendingOperations::new();
        let alice: OwnerId = "alice".into();
        pending.request(&alice, delete("alice_1"), Time::from_seconds(60));
        assert!(pending.get(&alice, Time::from_seconds(59)).is_some());
        assert!(pending.get(&alice, Time::from_seconds(60)).is_none());
        assert_eq!(pending.take(&alice, Time::from_seconds(61)), None);
        assert!(pending.is_empty());
    }

    #[test]
    fn expire_reports_owners() {
        let mut pending = PendingOperations::new();
        let (alice, bob): (OwnerId, OwnerId) = ("alice".into(), "bob".into());
        pending.request(&alice, delete("alice_1"), Time::from_seconds(30));
        let buy = PendingOp::Purchase {
            purchase: Purchase::Expand { plot: "bob_1".into(), level: 2 },
            price: 1500,
        };
        pending.request(&bob, buy.clone(), Time::from_seconds(90));

        assert_eq!(pending.expire(Time::from_seconds(30)), vec![(alice, delete("alice_1"))]);
        assert_eq!(pending.get(&bob, Time::from_seconds(30)), Some(&buy));
        assert_eq!(format!("{}", buy), "expanding bob_1 to level 2 (price 1500)");
    }
}
