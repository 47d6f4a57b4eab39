//! Property-based tests for the link session manager
//!
//! Random operation sequences are replayed against a simple reference
//! model of token lifetimes.

use super::*;
use crate::testing::MockClock;
use chrono::Duration;
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

const TTL_SECS: i64 = 300;

#[derive(Debug, Clone)]
enum Op {
    Issue(i64),
    Advance(i64),
    Consume(usize),
    Invalidate(usize),
    Sweep,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0i64..5).prop_map(Op::Issue),
        2 => (0i64..200).prop_map(Op::Advance),
        3 => any::<usize>().prop_map(Op::Consume),
        1 => any::<usize>().prop_map(Op::Invalidate),
        1 => Just(Op::Sweep),
    ]
}

/// Reference model entry; `issued_at` is seconds since the start of the run
struct ModelToken {
    value: String,
    subject: SubjectId,
    issued_at: i64,
    held: bool,
}

impl ModelToken {
    fn fresh(&self, now: i64) -> bool {
        now - self.issued_at <= TTL_SECS
    }
}

fn setup() -> (LinkSessionManager, Arc<MockClock>) {
    let clock = Arc::new(MockClock::new());
    let links = LinkSessionManager::new(
        Arc::new(MemoryLinkStore::new()),
        clock.clone(),
        Duration::seconds(TTL_SECS),
        "https://example.com/link",
    );
    (links, clock)
}

/// Mark every held token past its TTL as gone, returning how many were
fn model_sweep(model: &mut [ModelToken], now: i64) -> usize {
    let mut removed = 0;
    for token in model.iter_mut().filter(|t| t.held && !t.fresh(now)) {
        token.held = false;
        removed += 1;
    }
    removed
}

proptest! {
    #[test]
    fn prop_manager_matches_model(ops in prop::collection::vec(arb_op(), 1..60)) {
        let (links, clock) = setup();
        let mut model: Vec<ModelToken> = Vec::new();
        let mut now = 0i64;

        for op in ops {
            match op {
                Op::Issue(subject) => {
                    model_sweep(&mut model, now);
                    let token = links.issue_token(SubjectId(subject));
                    prop_assert_eq!(token.subject_id, SubjectId(subject));
                    model.push(ModelToken {
                        value: token.value,
                        subject: SubjectId(subject),
                        issued_at: now,
                        held: true,
                    });
                }
                Op::Advance(secs) => {
                    clock.advance(Duration::seconds(secs));
                    now += secs;
                }
                Op::Consume(idx) => {
                    if model.is_empty() {
                        prop_assert_eq!(links.consume("missing"), Err(LinkError::TokenNotFound));
                        continue;
                    }
                    let i = idx % model.len();
                    let entry = &mut model[i];
                    let expected = if entry.held && entry.fresh(now) {
                        Ok(entry.subject)
                    } else {
                        Err(LinkError::TokenNotFound)
                    };
                    entry.held = false;
                    prop_assert_eq!(links.consume(&entry.value), expected);
                }
                Op::Invalidate(idx) => {
                    if model.is_empty() {
                        continue;
                    }
                    let i = idx % model.len();
                    let entry = &mut model[i];
                    let expected = entry.held && entry.fresh(now);
                    entry.held = false;
                    prop_assert_eq!(links.invalidate(&entry.value), expected);
                }
                Op::Sweep => {
                    let expected = model_sweep(&mut model, now);
                    prop_assert_eq!(links.sweep_expired_now(), expected);
                }
            }

            let held = model.iter().filter(|t| t.held).count();
            prop_assert_eq!(links.live_tokens(), held);
        }
    }

    #[test]
    fn prop_linked_set_is_monotonic(
        marks in prop::collection::vec(0i64..20, 0..40),
        probes in prop::collection::vec(0i64..20, 0..40),
    ) {
        let (links, _clock) = setup();
        let mut expected = HashSet::new();

        for (i, subject) in marks.iter().enumerate() {
            links.mark_linked(SubjectId(*subject));
            expected.insert(*subject);

            // Everything marked so far stays linked
            for probe in probes.iter().take(i + 1) {
                prop_assert_eq!(links.is_linked(SubjectId(*probe)), expected.contains(probe));
            }
        }
    }

    #[test]
    fn prop_token_issue_never_links(subject in any::<i64>()) {
        let (links, _clock) = setup();
        let token = links.issue_token(SubjectId(subject));
        prop_assert!(!links.is_linked(SubjectId(subject)));
        prop_assert_eq!(links.consume(&token.value), Ok(SubjectId(subject)));
        prop_assert!(!links.is_linked(SubjectId(subject)));
    }
}
