//! Completion signatures: the static description of how a sender may complete.
//!
//! A [`Signature`] names one channel together with the payload type it
//! carries. A [`CompletionSignatures`] is a sorted set of them with no
//! duplicates, and [`Signatures`] adds the "not yet known" state reported by
//! senders whose behavior depends on the receiver's environment.
//!
//! # Algebraic Laws
//!
//! ```text
//! union(a, b)        = union(b, a)
//! union(a, a)        = a
//! union(a, Dependent) = Dependent
//! map_values::<U>(s) sends value(U) iff s sends any value
//! without(c, s)      sends nothing on channel c
//! ```
//!
//! Senders compute their sets in associated functions without `self`, so
//! asking twice always yields the same answer.

use crate::env::EnvShape;
use crate::error::Error;
use crate::protocol::Sender;
use crate::types::Channel;
use core::fmt;
use smallvec::SmallVec;
use std::any::{type_name, TypeId};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// One possible completion: a channel plus its payload type.
#[derive(Clone, Copy)]
pub struct Signature {
    channel: Channel,
    payload: TypeId,
    payload_name: &'static str,
}

impl Signature {
    /// A value completion carrying `V`.
    #[must_use]
    pub fn value<V: 'static>() -> Self {
        Self {
            channel: Channel::Value,
            payload: TypeId::of::<V>(),
            payload_name: type_name::<V>(),
        }
    }

    /// An error completion; the payload is always [`Error`].
    #[must_use]
    pub fn error() -> Self {
        Self {
            channel: Channel::Error,
            payload: TypeId::of::<Error>(),
            payload_name: type_name::<Error>(),
        }
    }

    /// A stopped completion; it carries no payload.
    #[must_use]
    pub fn stopped() -> Self {
        Self {
            channel: Channel::Stopped,
            payload: TypeId::of::<()>(),
            payload_name: type_name::<()>(),
        }
    }

    /// Returns the channel.
    #[must_use]
    pub const fn channel(&self) -> Channel {
        self.channel
    }

    /// Returns the payload type's name.
    #[must_use]
    pub const fn payload_name(&self) -> &'static str {
        self.payload_name
    }

    /// Returns true if this is a value completion carrying exactly `V`.
    #[must_use]
    pub fn is_value_of<V: 'static>(&self) -> bool {
        self.channel == Channel::Value && self.payload == TypeId::of::<V>()
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.channel == other.channel && self.payload == other.payload
    }
}

impl Eq for Signature {}

impl PartialOrd for Signature {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Signature {
    fn cmp(&self, other: &Self) -> Ordering {
        self.channel
            .cmp(&other.channel)
            .then_with(|| self.payload.cmp(&other.payload))
    }
}

impl Hash for Signature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.channel.hash(state);
        self.payload.hash(state);
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.channel {
            Channel::Value => write!(f, "value({})", self.payload_name),
            Channel::Error => write!(f, "error"),
            Channel::Stopped => write!(f, "stopped"),
        }
    }
}

/// A set of completion signatures with no duplicates.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct CompletionSignatures {
    sigs: SmallVec<[Signature; 4]>,
}

impl CompletionSignatures {
    /// The empty set: the sender never completes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `{value(V)}`.
    #[must_use]
    pub fn value<V: 'static>() -> Self {
        Self::new().with_value::<V>()
    }

    /// `{error}`.
    #[must_use]
    pub fn error() -> Self {
        Self::new().with_error()
    }

    /// `{stopped}`.
    #[must_use]
    pub fn stopped() -> Self {
        Self::new().with_stopped()
    }

    /// Inserts a signature, returning false if it was already present.
    pub fn insert(&mut self, sig: Signature) -> bool {
        match self.sigs.binary_search(&sig) {
            Ok(_) => false,
            Err(pos) => {
                self.sigs.insert(pos, sig);
                true
            }
        }
    }

    /// Adds `sig` to the set.
    #[must_use]
    pub fn with(mut self, sig: Signature) -> Self {
        self.insert(sig);
        self
    }

    /// Adds `value(V)`.
    #[must_use]
    pub fn with_value<V: 'static>(self) -> Self {
        self.with(Signature::value::<V>())
    }

    /// Adds `error`.
    #[must_use]
    pub fn with_error(self) -> Self {
        self.with(Signature::error())
    }

    /// Adds `stopped`.
    #[must_use]
    pub fn with_stopped(self) -> Self {
        self.with(Signature::stopped())
    }

    /// Set union.
    #[must_use]
    pub fn union(mut self, other: &Self) -> Self {
        for sig in &other.sigs {
            self.insert(*sig);
        }
        self
    }

    /// Removes every signature on `channel`.
    #[must_use]
    pub fn without(mut self, channel: Channel) -> Self {
        self.sigs.retain(|sig| sig.channel != channel);
        self
    }

    /// Replaces all value signatures by `value(U)`, if there were any.
    #[must_use]
    pub fn map_values<U: 'static>(self) -> Self {
        if self.sends(Channel::Value) {
            self.without(Channel::Value).with_value::<U>()
        } else {
            self
        }
    }

    /// Returns true if some signature uses `channel`.
    #[must_use]
    pub fn sends(&self, channel: Channel) -> bool {
        self.sigs.iter().any(|sig| sig.channel == channel)
    }

    /// Returns true if `sig` is in the set.
    #[must_use]
    pub fn contains(&self, sig: &Signature) -> bool {
        self.sigs.binary_search(sig).is_ok()
    }

    /// Returns true if the set contains `value(V)`.
    #[must_use]
    pub fn sends_value_of<V: 'static>(&self) -> bool {
        self.sigs.iter().any(Signature::is_value_of::<V>)
    }

    /// Number of distinct signatures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sigs.len()
    }

    /// Returns true if the sender can never complete.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sigs.is_empty()
    }

    /// Iterates the signatures in their canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &Signature> {
        self.sigs.iter()
    }
}

impl fmt::Debug for CompletionSignatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.sigs.iter()).finish()
    }
}

/// The result of asking a sender type for its completion signatures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Signatures {
    /// The set is known.
    Resolved(CompletionSignatures),
    /// The set depends on an environment that was not supplied.
    Dependent,
}

impl Signatures {
    /// Returns true if the set is not yet known.
    #[must_use]
    pub const fn is_dependent(&self) -> bool {
        matches!(self, Self::Dependent)
    }

    /// Returns the resolved set, if known.
    #[must_use]
    pub const fn as_resolved(&self) -> Option<&CompletionSignatures> {
        match self {
            Self::Resolved(sigs) => Some(sigs),
            Self::Dependent => None,
        }
    }

    /// Transforms a resolved set; `Dependent` stays dependent.
    #[must_use]
    pub fn map(self, f: impl FnOnce(CompletionSignatures) -> CompletionSignatures) -> Self {
        match self {
            Self::Resolved(sigs) => Self::Resolved(f(sigs)),
            Self::Dependent => Self::Dependent,
        }
    }

    /// Chains a computation that may itself be dependent.
    #[must_use]
    pub fn and_then(self, f: impl FnOnce(CompletionSignatures) -> Self) -> Self {
        match self {
            Self::Resolved(sigs) => f(sigs),
            Self::Dependent => Self::Dependent,
        }
    }

    /// Union of two results; dependent if either side is.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        match (self, other) {
            (Self::Resolved(a), Self::Resolved(b)) => Self::Resolved(a.union(&b)),
            _ => Self::Dependent,
        }
    }
}

impl From<CompletionSignatures> for Signatures {
    fn from(sigs: CompletionSignatures) -> Self {
        Self::Resolved(sigs)
    }
}

/// Resolves `S`'s signatures against a concrete environment shape.
///
/// # Panics
///
/// Panics if `S` still reports a dependent set for a concrete environment, or
/// if its environment-independent set disagrees with the concrete one. Both
/// indicate a broken `Sender` implementation.
#[must_use]
pub fn resolve_signatures<S: Sender>(env: EnvShape) -> CompletionSignatures {
    let Signatures::Resolved(concrete) = S::signatures(Some(env)) else {
        panic!(
            "sender `{}` reported dependent signatures for a concrete environment",
            type_name::<S>()
        );
    };
    if let Signatures::Resolved(independent) = S::signatures(None) {
        assert!(
            independent == concrete,
            "sender `{}` has inconsistent signatures: {independent:?} without an environment, \
             {concrete:?} with {env:?}",
            type_name::<S>()
        );
    }
    concrete
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_deduplicates() {
        let mut sigs = CompletionSignatures::new();
        assert!(sigs.insert(Signature::error()));
        assert!(!sigs.insert(Signature::error()));
        assert_eq!(sigs.len(), 1);
    }

    #[test]
    fn order_is_canonical() {
        let a = CompletionSignatures::new()
            .with_stopped()
            .with_error()
            .with_value::<i32>();
        let b = CompletionSignatures::value::<i32>()
            .with_stopped()
            .with_error();
        assert_eq!(a, b);
        let channels: Vec<_> = a.iter().map(Signature::channel).collect();
        assert_eq!(channels, vec![Channel::Value, Channel::Error, Channel::Stopped]);
    }

    #[test]
    fn distinct_value_payloads_are_distinct() {
        let sigs = CompletionSignatures::value::<i32>().with_value::<String>();
        assert_eq!(sigs.len(), 2);
        assert!(sigs.sends_value_of::<i32>());
        assert!(sigs.sends_value_of::<String>());
        assert!(!sigs.sends_value_of::<u8>());
    }

    #[test]
    fn union_is_commutative_and_idempotent() {
        let a = CompletionSignatures::value::<i32>().with_error();
        let b = CompletionSignatures::stopped().with_error();
        assert_eq!(a.clone().union(&b), b.clone().union(&a));
        assert_eq!(a.clone().union(&a), a);
    }

    #[test]
    fn map_values_rewrites_only_when_values_exist() {
        let sigs = CompletionSignatures::value::<i32>().with_stopped();
        let mapped = sigs.map_values::<String>();
        assert!(mapped.sends_value_of::<String>());
        assert!(!mapped.sends_value_of::<i32>());
        assert!(mapped.sends(Channel::Stopped));

        let no_values = CompletionSignatures::error().map_values::<String>();
        assert_eq!(no_values, CompletionSignatures::error());
    }

    #[test]
    fn without_removes_channel() {
        let sigs = CompletionSignatures::value::<i32>()
            .with_error()
            .with_stopped()
            .without(Channel::Stopped);
        assert!(!sigs.sends(Channel::Stopped));
        assert!(sigs.sends(Channel::Error));
    }

    #[test]
    fn dependent_absorbs_union() {
        let resolved = Signatures::from(CompletionSignatures::error());
        assert!(resolved.clone().union(Signatures::Dependent).is_dependent());
        assert!(Signatures::Dependent.union(resolved.clone()).is_dependent());
        assert_eq!(
            resolved.clone().union(resolved.clone()),
            resolved
        );
    }

    #[test]
    fn debug_format_is_readable() {
        let sigs = CompletionSignatures::value::<i32>().with_error().with_stopped();
        assert_eq!(format!("{sigs:?}"), "{value(i32), error, stopped}");
    }
}
