//! Property-based tests for SubscriberRegistry and AdmissionController
//!
//! Random operation sequences are checked against a simple model: a set of
//! subscribed IDs, and a count of held permits.

use std::collections::HashSet;

use proptest::prelude::*;
use roomcast_core::{AdmissionController, ConnectionId, LineSink, SubscriberRegistry};

#[derive(Debug, Clone)]
enum RegistryOp {
    Subscribe(u8),
    Unsubscribe(u8),
    Publish,
}

fn registry_op() -> impl Strategy<Value = RegistryOp> {
    prop_oneof![
        (0u8..8).prop_map(RegistryOp::Subscribe),
        (0u8..8).prop_map(RegistryOp::Unsubscribe),
        Just(RegistryOp::Publish),
    ]
}

fn conn(n: u8) -> ConnectionId {
    ConnectionId::new(format!("127.0.0.1:{}", 40_000 + u16::from(n)))
}

#[derive(Debug, Clone, Copy)]
enum GateOp {
    Acquire,
    Release(usize),
}

fn gate_op() -> impl Strategy<Value = GateOp> {
    prop_oneof![Just(GateOp::Acquire), (0usize..16).prop_map(GateOp::Release)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: Registry membership always matches a set model, and
    /// subscribe/unsubscribe report exactly the model's transitions
    #[test]
    fn prop_registry_matches_set_model(ops in prop::collection::vec(registry_op(), 0..64)) {
        let registry = SubscriberRegistry::new();
        let mut model: HashSet<u8> = HashSet::new();
        let mut receivers = Vec::new();

        for op in ops {
            match op {
                RegistryOp::Subscribe(n) => {
                    let (sink, rx) = LineSink::channel(64);
                    receivers.push(rx);
                    prop_assert_eq!(registry.subscribe(conn(n), sink), model.insert(n));
                },
                RegistryOp::Unsubscribe(n) => {
                    prop_assert_eq!(registry.unsubscribe(&conn(n)), model.remove(&n));
                },
                RegistryOp::Publish => {
                    let report = registry.publish("tick");
                    prop_assert_eq!(report.delivered + report.failed, model.len());
                },
            }

            prop_assert_eq!(registry.len(), model.len());
            for n in 0u8..8 {
                prop_assert_eq!(registry.is_subscribed(&conn(n)), model.contains(&n));
            }
        }
    }

    /// Property: Held permits never exceed capacity, every acquire beyond
    /// capacity is refused, and every release frees exactly one slot
    #[test]
    fn prop_admission_never_exceeds_capacity(
        capacity in 0usize..6,
        ops in prop::collection::vec(gate_op(), 0..64)
    ) {
        let gate = AdmissionController::new(capacity);
        let mut held = Vec::new();

        for op in ops {
            match op {
                GateOp::Acquire => {
                    let result = gate.try_acquire();
                    prop_assert_eq!(result.is_ok(), held.len() < capacity);
                    if let Ok(permit) = result {
                        held.push(permit);
                    }
                },
                GateOp::Release(i) => {
                    if !held.is_empty() {
                        let permit = held.swap_remove(i % held.len());
                        permit.release();
                    }
                },
            }

            prop_assert!(gate.active() <= capacity);
            prop_assert_eq!(gate.active(), held.len());
        }
    }
}
