//! Property tests for the in-memory learning unit store

use chrono::Utc;
use proptest::prelude::*;

use ebbinghaus_algo::ReviewOffsets;
use ebbinghaus_backend::db::{LearningUnitStore, NewPlan};

#[derive(Debug, Clone)]
enum Op {
    Learn(u32),
    Review(u32, u32),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u32..=6).prop_map(Op::Learn),
        (1u32..=6, 1u32..=5).prop_map(|(unit, order)| Op::Review(unit, order)),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Stored reviews never leave a gap below a higher round.
    #[test]
    fn prop_reviews_are_backfilled(ops in prop::collection::vec(op_strategy(), 1..40)) {
        runtime().block_on(async {
            let store = LearningUnitStore::memory();
            let plan = store
                .create_plan(NewPlan {
                    user_id: "u".to_string(),
                    wordbook_id: None,
                    total_words: 60,
                    target_words: None,
                    words_per_day: 10,
                    review_offsets: ReviewOffsets::default(),
                })
                .await
                .unwrap();

            for op in &ops {
                let _ = match *op {
                    Op::Learn(unit) => store.mark_unit_learned(&plan.id, unit, Utc::now()).await,
                    Op::Review(unit, order) => {
                        store.complete_review(&plan.id, unit, order, Utc::now()).await
                    }
                };
            }

            for unit in store.list_units(&plan.id).await.unwrap() {
                prop_assert!(unit.is_learned);
                for (index, review) in unit.reviews.iter().enumerate() {
                    prop_assert_eq!(review.review_order as usize, index + 1);
                    prop_assert!(review.is_completed);
                }
            }
            Ok(())
        })?;
    }

    /// Replaying the same operations changes nothing.
    #[test]
    fn prop_replay_is_noop(ops in prop::collection::vec(op_strategy(), 1..20)) {
        runtime().block_on(async {
            let store = LearningUnitStore::memory();
            let plan = store
                .create_plan(NewPlan {
                    user_id: "u".to_string(),
                    wordbook_id: None,
                    total_words: 60,
                    target_words: None,
                    words_per_day: 10,
                    review_offsets: ReviewOffsets::default(),
                })
                .await
                .unwrap();

            let apply = |op: Op| {
                let store = store.clone();
                let plan_id = plan.id.clone();
                async move {
                    match op {
                        Op::Learn(unit) => store.mark_unit_learned(&plan_id, unit, Utc::now()).await,
                        Op::Review(unit, order) => {
                            store.complete_review(&plan_id, unit, order, Utc::now()).await
                        }
                    }
                }
            };

            for op in ops.clone() {
                apply(op).await.unwrap();
            }
            let before = store.list_units(&plan.id).await.unwrap();

            for op in ops {
                prop_assert!(!apply(op).await.unwrap().changed);
            }
            prop_assert_eq!(store.list_units(&plan.id).await.unwrap(), before);
            Ok(())
        })?;
    }
}
