use escrow_engine::application::engine::{Deployment, EscrowStateMachine};
use escrow_engine::domain::account::{AccountId, AssetId, Role};
use escrow_engine::domain::command::Command;
use escrow_engine::domain::ports::{AssetLedger, EventLog};
use escrow_engine::domain::status::EscrowStatus;
use escrow_engine::error::EscrowError;
use escrow_engine::infrastructure::in_memory::{
    InMemoryAssetLedger, InMemoryEscrowStore, InMemoryEventLog,
};
use proptest::prelude::*;

const PRICE: u128 = 1_000_000;

fn command() -> impl Strategy<Value = Command> {
    prop_oneof![
        Just(Command::Pay),
        Just(Command::Deliver),
        Just(Command::Complete),
        Just(Command::Dispute),
        any::<bool>().prop_map(|release| Command::Resolve { release }),
    ]
}

fn caller() -> impl Strategy<Value = AccountId> {
    prop_oneof![
        Just(AccountId::new("buyer")),
        Just(AccountId::new("seller")),
        Just(AccountId::new("arbitrator")),
        Just(AccountId::new("mallory")),
    ]
}

struct Outcome {
    custody: u128,
    seller: u128,
    buyer: u128,
    status: EscrowStatus,
    events: usize,
    successes: usize,
}

fn run(steps: Vec<(AccountId, Command)>) -> Result<Outcome, TestCaseError> {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async move {
        let ledger = InMemoryAssetLedger::new(AssetId::new("TST"));
        let log = InMemoryEventLog::new();
        let buyer = AccountId::new("buyer");
        let custody = AccountId::new("escrow");
        ledger.mint(&buyer, PRICE).await.unwrap();
        ledger.approve(&buyer, &custody, PRICE).await.unwrap();

        let machine = EscrowStateMachine::deploy(
            Deployment {
                custody: custody.clone(),
                buyer: buyer.clone(),
                seller: AccountId::new("seller"),
                arbitrator: AccountId::new("arbitrator"),
                price: PRICE,
            },
            Box::new(ledger.clone()),
            Box::new(InMemoryEscrowStore::new()),
            Box::new(log.clone()),
        )
        .await
        .unwrap();

        let mut successes = 0;
        for (caller, command) in steps {
            let Some(transition) = command.transition() else {
                continue;
            };
            let before = machine.status().await;
            let authorized = machine.snapshot().await.holder(transition.role()) == &caller;
            let result = machine.apply(&caller, transition).await;
            let after = machine.status().await;
            match result {
                Ok(_) => {
                    prop_assert!(authorized);
                    prop_assert_eq!(transition.target(before), Some(after));
                    successes += 1;
                }
                Err(EscrowError::Unauthorized(role)) => {
                    prop_assert!(!authorized);
                    prop_assert_eq!(role, transition.role());
                    prop_assert_eq!(after, before);
                }
                Err(EscrowError::InvalidStatus(status)) => {
                    prop_assert!(authorized);
                    prop_assert_eq!(status, before);
                    prop_assert!(transition.target(before).is_none());
                    prop_assert_eq!(after, before);
                }
                Err(other) => prop_assert!(false, "unexpected error {other}"),
            }
            prop_assert!(machine.receive_native(&caller, 1).is_err());
        }

        Ok(Outcome {
            custody: ledger.balance_of(&custody).await.unwrap(),
            seller: ledger.balance_of(&AccountId::new("seller")).await.unwrap(),
            buyer: ledger.balance_of(&buyer).await.unwrap(),
            status: machine.status().await,
            events: log.events().await.unwrap().len(),
            successes,
        })
    })
}

proptest! {
    /// Custody holds the price exactly while the escrow is funded and unsettled.
    #[test]
    fn custody_tracks_status(steps in prop::collection::vec((caller(), command()), 0..40)) {
        let outcome = run(steps)?;
        let expected_custody = if outcome.status.holds_funds() { PRICE } else { 0 };
        prop_assert_eq!(outcome.custody, expected_custody);
        prop_assert_eq!(outcome.custody + outcome.seller + outcome.buyer, PRICE);
        if outcome.status.is_rest_state() {
            prop_assert_eq!(outcome.seller, PRICE);
        } else {
            prop_assert_eq!(outcome.seller, 0);
        }
    }

    /// Exactly one event is emitted per successful transition.
    #[test]
    fn one_event_per_success(steps in prop::collection::vec((caller(), command()), 0..40)) {
        let outcome = run(steps)?;
        prop_assert_eq!(outcome.events, outcome.successes);
    }

    /// A reopened dispute leaves custody and status as they were before it.
    #[test]
    fn rejected_dispute_round_trip(cycles in 1usize..5) {
        let arbitrator = AccountId::new("arbitrator");
        let buyer = AccountId::new("buyer");
        let mut steps = vec![(buyer.clone(), Command::Pay)];
        for _ in 0..cycles {
            steps.push((buyer.clone(), Command::Dispute));
            steps.push((arbitrator.clone(), Command::Resolve { release: false }));
        }
        let outcome = run(steps)?;
        prop_assert_eq!(outcome.status, EscrowStatus::Paid);
        prop_assert_eq!(outcome.custody, PRICE);
        prop_assert_eq!(outcome.successes, 1 + 2 * cycles);
    }
}

#[test]
fn unauthorized_role_names_the_missing_role() {
    let err = EscrowError::Unauthorized(Role::Buyer);
    assert_eq!(err.to_string(), "You are not the buyer");
}
