//! Property tests: the subscription always mirrors the owner's live state.

use lifebound::{
    Callbacks, HandlerConfig, LifeSpan, LifecycleHandler, LifecycleOwner, LifecycleRegistry,
    LifecycleState, Subject,
};
use proptest::prelude::*;
use std::sync::Arc;

fn target_strategy() -> impl Strategy<Value = LifecycleState> {
    prop_oneof![
        4 => Just(LifecycleState::Created),
        4 => Just(LifecycleState::Started),
        4 => Just(LifecycleState::Resumed),
        1 => Just(LifecycleState::Destroyed),
    ]
}

fn span_strategy() -> impl Strategy<Value = LifeSpan> {
    prop_oneof![
        Just(LifeSpan::Created),
        Just(LifeSpan::Started),
        Just(LifeSpan::Resumed),
    ]
}

fn expected_subscribers(state: LifecycleState, span: LifeSpan) -> usize {
    usize::from(!state.is_terminal() && state.is_at_least(span.active_state()))
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn subscriber_count_tracks_owner_state(
        span in span_strategy(),
        start in target_strategy(),
        moves in prop::collection::vec(target_strategy(), 0..24),
    ) {
        let registry = Arc::new(LifecycleRegistry::new());
        registry.move_to(start).unwrap();
        let owner: Arc<dyn LifecycleOwner> = registry.clone();

        let subject = Subject::<u32>::publish();
        let handler = LifecycleHandler::new(HandlerConfig { life_span: span });
        handler.observe(subject.clone()).bind(&owner, Callbacks::new(|_| {}));
        prop_assert_eq!(subject.subscriber_count(), expected_subscribers(start, span));

        for target in moves {
            registry.move_to(target).unwrap();
            let state = registry.current_state();
            prop_assert_eq!(subject.subscriber_count(), expected_subscribers(state, span));
        }

        if registry.current_state().is_terminal() {
            prop_assert_eq!(registry.observer_count(), 0);
        }
    }

    #[test]
    fn destroyed_is_absorbing(moves in prop::collection::vec(target_strategy(), 0..16)) {
        let registry = LifecycleRegistry::new();
        registry.move_to(LifecycleState::Destroyed).unwrap();

        for target in moves {
            registry.move_to(target).unwrap();
            prop_assert_eq!(registry.current_state(), LifecycleState::Destroyed);
        }
    }
}
