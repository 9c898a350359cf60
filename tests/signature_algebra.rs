//! Completion-signature algebra.
//!
//! Laws tested:
//! - Union is commutative, associative and idempotent; duplicates collapse
//! - `without` removes exactly one channel
//! - Combinator signatures are stable across repeated queries
//! - Resolving against a concrete environment agrees with the
//!   environment-independent set whenever the latter is known
//! - Dependent sets propagate through every adaptor until resolved

#[macro_use]
mod common;

use common::*;
use proptest::prelude::*;
use sendkit::sequence::from_senders;
use sendkit::types::Signature;
use sendkit::{
    complete_on, ensure_started, ignore_all, iterate, just, just_error, just_stopped, let_error,
    let_stopped, let_value, on, read_scheduler, read_stop_token, resolve_signatures, split,
    stopped_as_error, stopped_as_optional, then, transfer, transform_each, upon_error,
    upon_stopped, when_all, when_all_vec, Channel, CompletionSignatures, EnvShape, Error,
    OperationState, Receiver, RunLoop, Sender, Signatures, StopToken,
};

fn sigs_of<S: Sender>(_sender: &S, env: Option<EnvShape>) -> Signatures {
    S::signatures(env)
}

fn resolved_of<S: Sender>(_sender: &S, env: EnvShape) -> CompletionSignatures {
    resolve_signatures::<S>(env)
}

// ============================================================================
// Set laws
// ============================================================================

fn arb_sigs() -> impl Strategy<Value = CompletionSignatures> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(int_value, string_value, error, stopped)| {
            let mut sigs = CompletionSignatures::new();
            if int_value {
                sigs.insert(Signature::value::<i32>());
            }
            if string_value {
                sigs.insert(Signature::value::<String>());
            }
            if error {
                sigs.insert(Signature::error());
            }
            if stopped {
                sigs.insert(Signature::stopped());
            }
            sigs
        },
    )
}

fn arb_channel() -> impl Strategy<Value = Channel> {
    prop_oneof![
        Just(Channel::Value),
        Just(Channel::Error),
        Just(Channel::Stopped),
    ]
}

proptest! {
    #![proptest_config(test_proptest_config(128))]

    #[test]
    fn union_is_commutative(a in arb_sigs(), b in arb_sigs()) {
        prop_assert_eq!(a.clone().union(&b), b.union(&a));
    }

    #[test]
    fn union_is_associative(a in arb_sigs(), b in arb_sigs(), c in arb_sigs()) {
        let left = a.clone().union(&b).union(&c);
        let right = a.union(&b.union(&c));
        prop_assert_eq!(left, right);
    }

    #[test]
    fn union_is_idempotent(a in arb_sigs()) {
        prop_assert_eq!(a.clone().union(&a), a);
    }

    #[test]
    fn without_removes_only_that_channel(a in arb_sigs(), channel in arb_channel()) {
        let trimmed = a.clone().without(channel);
        prop_assert!(!trimmed.sends(channel));
        for sig in a.iter() {
            prop_assert_eq!(trimmed.contains(sig), sig.channel() != channel);
        }
    }

    #[test]
    fn dependent_absorbs_union(a in arb_sigs()) {
        let resolved = Signatures::Resolved(a);
        prop_assert!(resolved.clone().union(Signatures::Dependent).is_dependent());
        prop_assert!(Signatures::Dependent.union(resolved).is_dependent());
    }
}

#[test]
fn duplicate_signatures_collapse() {
    init_test("duplicate_signatures_collapse");
    let mut sigs = CompletionSignatures::value::<i32>();
    assert!(!sigs.insert(Signature::value::<i32>()));
    assert!(sigs.insert(Signature::value::<u8>()));
    let sigs = sigs.with_error().with_error().with_stopped().with_stopped();
    assert_eq!(sigs.len(), 4);
    test_complete!("duplicate_signatures_collapse");
}

// ============================================================================
// Combinator signatures
// ============================================================================

#[test]
fn leaf_and_adaptor_signatures() {
    init_test("leaf_and_adaptor_signatures");

    test_section!("then");
    assert_eq!(
        sigs_of(&then(just(1), |v: i32| v.to_string()), None),
        Signatures::Resolved(CompletionSignatures::value::<String>().with_error())
    );
    assert_eq!(
        sigs_of(&then(just_stopped::<i32>(), |v: i32| v), None),
        Signatures::Resolved(CompletionSignatures::stopped())
    );

    test_section!("upon");
    assert_eq!(
        sigs_of(&upon_error(just_error::<i32>(Error::msg("x")), |_| 0), None),
        Signatures::Resolved(CompletionSignatures::value::<i32>().with_error())
    );
    assert_eq!(
        sigs_of(&upon_stopped(just(1), || 0), None),
        Signatures::Resolved(CompletionSignatures::value::<i32>())
    );

    test_section!("stopped_as");
    assert_eq!(
        sigs_of(&stopped_as_optional(just_stopped::<i32>()), None),
        Signatures::Resolved(CompletionSignatures::value::<Option<i32>>())
    );
    assert_eq!(
        sigs_of(&stopped_as_error(just_stopped::<i32>(), Error::msg("s")), None),
        Signatures::Resolved(CompletionSignatures::error())
    );

    test_section!("let");
    assert_eq!(
        sigs_of(&let_value(just(1), |v: i32| just(v > 0)), None),
        Signatures::Resolved(CompletionSignatures::value::<bool>().with_error())
    );
    assert_eq!(
        sigs_of(&let_error(just(1), |_| just(0)), None),
        Signatures::Resolved(CompletionSignatures::value::<i32>())
    );
    assert_eq!(
        sigs_of(&let_stopped(just_stopped::<i32>(), || just_error::<i32>(Error::msg("e"))), None),
        Signatures::Resolved(CompletionSignatures::error())
    );
    test_complete!("leaf_and_adaptor_signatures");
}

#[test]
fn join_signatures_union_non_value_channels() {
    init_test("join_signatures_union_non_value_channels");
    assert_eq!(
        sigs_of(&when_all(just(1), just("a")), None),
        Signatures::Resolved(CompletionSignatures::value::<(i32, &str)>().with_stopped())
    );
    assert_eq!(
        sigs_of(&when_all(just(1), just_error::<u8>(Error::msg("e"))), None),
        Signatures::Resolved(CompletionSignatures::error().with_stopped())
    );
    assert_eq!(
        sigs_of(&when_all_vec(vec![just_stopped::<i32>()]), None),
        Signatures::Resolved(CompletionSignatures::value::<Vec<i32>>().with_stopped())
    );
    test_complete!("join_signatures_union_non_value_channels");
}

#[test]
fn shared_senders_always_report_error_and_stopped() {
    init_test("shared_senders_always_report_error_and_stopped");
    let expected = CompletionSignatures::value::<i32>().with_error().with_stopped();
    assert_eq!(sigs_of(&split(just(1)), None), Signatures::Resolved(expected.clone()));
    assert_eq!(
        sigs_of(&ensure_started(just(1)), None),
        Signatures::Resolved(expected)
    );
    test_complete!("shared_senders_always_report_error_and_stopped");
}

#[test]
fn scheduler_adaptors_add_the_hop() {
    init_test("scheduler_adaptors_add_the_hop");
    let run_loop = RunLoop::new();

    assert_eq!(
        sigs_of(&transfer(just(1), run_loop.scheduler()), None),
        Signatures::Resolved(CompletionSignatures::value::<i32>().with_stopped())
    );

    let hop = on(run_loop.scheduler(), just(1));
    assert!(sigs_of(&hop, None).is_dependent());
    assert_eq!(
        resolved_of(&hop, EnvShape::new()),
        CompletionSignatures::value::<i32>().with_stopped()
    );

    let installed = complete_on(read_scheduler(), run_loop.scheduler());
    let sigs = resolved_of(&installed, EnvShape::new());
    assert!(sigs.sends(Channel::Value));
    assert!(!sigs.sends(Channel::Error));
    test_complete!("scheduler_adaptors_add_the_hop");
}

#[test]
fn dependent_sets_resolve_against_the_environment() {
    init_test("dependent_sets_resolve_against_the_environment");
    let query = then(read_scheduler(), |scheduler| scheduler.name());
    assert!(sigs_of(&query, None).is_dependent());
    assert_eq!(
        resolved_of(&query, EnvShape::new()),
        CompletionSignatures::error()
    );
    assert_eq!(
        resolved_of(&query, EnvShape::new().with_scheduler()),
        CompletionSignatures::value::<&'static str>().with_error()
    );

    let joined = when_all(just(1), read_scheduler());
    assert!(sigs_of(&joined, None).is_dependent());
    assert!(sigs_of(&joined, Some(EnvShape::new().with_scheduler())).as_resolved().is_some());

    // The stop token is always provided.
    assert_eq!(
        sigs_of(&read_stop_token(), None),
        Signatures::Resolved(CompletionSignatures::value::<StopToken>())
    );
    test_complete!("dependent_sets_resolve_against_the_environment");
}

#[test]
fn sequence_reduction_signatures() {
    init_test("sequence_reduction_signatures");
    assert_eq!(
        sigs_of(&ignore_all(iterate(vec![1, 2, 3])), None),
        Signatures::Resolved(CompletionSignatures::value::<()>().with_stopped())
    );
    let adapted = transform_each(from_senders(vec![just(1)]), |item| {
        then(item, |v: i32| v + 1)
    });
    assert_eq!(
        sigs_of(&ignore_all(adapted), None),
        Signatures::Resolved(CompletionSignatures::value::<()>().with_error().with_stopped())
    );
    test_complete!("sequence_reduction_signatures");
}

#[test]
fn repeated_queries_are_stable() {
    init_test("repeated_queries_are_stable");
    let run_loop = RunLoop::new();
    let pipeline = let_value(
        when_all(transfer(just(2), run_loop.scheduler()), read_scheduler()),
        |(v, _)| stopped_as_optional(just(v)),
    );
    let shape = EnvShape::new().with_scheduler();
    let first = resolved_of(&pipeline, shape);
    let second = resolved_of(&pipeline, shape);
    assert_eq!(first, second);
    assert!(first.sends_value_of::<Option<i32>>());
    test_complete!("repeated_queries_are_stable");
}

// ============================================================================
// Resolution diagnostics
// ============================================================================

/// A sender whose environment-independent set disagrees with the concrete one.
struct Inconsistent;

impl Sender for Inconsistent {
    type Value = ();

    fn signatures(env: Option<EnvShape>) -> Signatures {
        match env {
            None => CompletionSignatures::value::<()>().into(),
            Some(_) => CompletionSignatures::stopped().into(),
        }
    }

    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<()>,
    {
        InconsistentOperation { receiver }
    }
}

struct InconsistentOperation<R> {
    receiver: R,
}

impl<R: Receiver<()>> OperationState for InconsistentOperation<R> {
    fn start(self) {
        self.receiver.set_stopped();
    }
}

#[test]
#[should_panic(expected = "inconsistent signatures")]
fn inconsistent_sender_is_rejected() {
    let _ = resolve_signatures::<Inconsistent>(EnvShape::new());
}

#[test]
#[should_panic(expected = "dependent signatures")]
fn unresolvable_sender_is_rejected() {
    struct AlwaysDependent;

    impl Sender for AlwaysDependent {
        type Value = ();

        fn signatures(_env: Option<EnvShape>) -> Signatures {
            Signatures::Dependent
        }

        fn connect<R>(self, receiver: R) -> impl OperationState
        where
            R: Receiver<()>,
        {
            InconsistentOperation { receiver }
        }
    }

    let _ = resolve_signatures::<AlwaysDependent>(EnvShape::new());
}
