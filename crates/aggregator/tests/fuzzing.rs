//! Fuzzing suite for the vault, debt manager and gateway
//!
//! Run with: cargo test -p aggregator --features fuzz
//! Increase cases: PROPTEST_CASES=1000 cargo test -p aggregator --features fuzz
//!
//! Covers:
//! - Snapshot-based "no mutation on error" checking
//! - Global invariants (debt ledger, live backing, share supply, shutdown latch)
//! - Action-based state machine fuzzer
//! - Focused property tests on rounding and batch atomicity

#![cfg(feature = "fuzz")]

mod common;

use aggregator::*;
use common::*;
use proptest::prelude::*;

const USERS: [AccountId; 5] = [USER1, USER2, USER3, USER4, USER5];

// ============================================================================
// SECTION 1: SNAPSHOT FOR "NO MUTATION ON ERROR" CHECKING
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
struct Snapshot {
    total_idle: u128,
    total_debt: u128,
    total_supply: u128,
    is_shutdown: bool,
    balances: Vec<u128>,
    /// (recorded debt, live assets) per lender
    lenders: Vec<(u128, u128)>,
}

impl Snapshot {
    fn take(env: &Env) -> Self {
        let lenders = [env.crv, env.cvx]
            .iter()
            .map(|id| {
                let debt = env.vault.get_lender_data(id).map(|e| e.current_debt).unwrap_or(0);
                let live = env.pool.get(*id).map(|l| l.total_assets()).unwrap_or(0);
                (debt, live)
            })
            .collect();
        Self {
            total_idle: env.vault.total_idle(),
            total_debt: env.vault.total_debt(),
            total_supply: env.vault.total_supply(),
            is_shutdown: env.vault.is_shutdown(),
            balances: USERS.iter().map(|u| env.vault.balance_of(u)).collect(),
            lenders,
        }
    }
}

// ============================================================================
// SECTION 2: GLOBAL INVARIANTS
// ============================================================================

fn assert_invariants(env: &Env, context: &str) {
    assert!(env.vault.check_debt_ledger(), "debt ledger broken: {}", context);
    assert_eq!(
        env.vault.total_assets(),
        env.vault.total_idle() + env.vault.total_debt(),
        "total assets mismatch: {}",
        context
    );

    let held: u128 = env.vault.shares().holders().map(|(_, b)| *b).sum();
    assert_eq!(held, env.vault.total_supply(), "share supply mismatch: {}", context);

    // recorded debt never exceeds what the lender holds, absent unreported losses
    assert!(env.vault.check_backing(&env.pool), "debt above live assets: {}", context);
}

// ============================================================================
// SECTION 3: ACTIONS
// ============================================================================

#[derive(Clone, Debug)]
enum Action {
    Deposit { user: usize, amount: u128 },
    Withdraw { user: usize, amount: u128 },
    Redeem { user: usize, shares: u128 },
    Allocate { crv: u128, cvx: u128, cvx_first: bool },
    Accrue { lender: usize, secs: u64 },
    Report { lender: usize },
    Borrow { amount: u128 },
    Shutdown,
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        10 => (0usize..5, 0u128..20_000).prop_map(|(user, amount)| Action::Deposit { user, amount }),
        5 => (0usize..5, 0u128..10_000).prop_map(|(user, amount)| Action::Withdraw { user, amount }),
        3 => (0usize..5, 0u128..10_000).prop_map(|(user, shares)| Action::Redeem { user, shares }),
        6 => (0u128..10_000, 0u128..30_000, any::<bool>())
            .prop_map(|(crv, cvx, cvx_first)| Action::Allocate { crv, cvx, cvx_first }),
        3 => (0usize..2, 0u64..ONE_YEAR).prop_map(|(lender, secs)| Action::Accrue { lender, secs }),
        3 => (0usize..2).prop_map(|lender| Action::Report { lender }),
        2 => (1u128..20_000).prop_map(|amount| Action::Borrow { amount }),
        1 => Just(Action::Shutdown),
    ]
}

struct FuzzState {
    env: Env,
    gateway: LiquidityGateway,
}

impl FuzzState {
    fn new() -> Self {
        let mut env = setup();
        env.manager
            .set_whitelisted_gateway(ADMIN, &env.vault, GATEWAY, true)
            .unwrap();
        let gateway = LiquidityGateway::new(GATEWAY, ADMIN, 8_000).unwrap();
        Self { env, gateway }
    }

    fn lender(&self, idx: usize) -> LenderId {
        if idx == 0 {
            self.env.crv
        } else {
            self.env.cvx
        }
    }

    fn execute(&mut self, action: &Action, step: usize) {
        let before = Snapshot::take(&self.env);
        let context = format!("step {} {:?}", step, action);

        let result: Result<()> = match action {
            Action::Deposit { user, amount } => {
                let user = USERS[*user];
                self.env.vault.deposit(user, *amount, user).map(|_| ())
            }
            Action::Withdraw { user, amount } => {
                let user = USERS[*user];
                self.env.vault.withdraw(user, *amount, user, user).map(|_| ())
            }
            Action::Redeem { user, shares } => {
                let user = USERS[*user];
                self.env.vault.redeem(user, *shares, user, user).map(|_| ())
            }
            Action::Allocate { crv, cvx, cvx_first } => {
                let (crv_id, cvx_id) = (self.env.crv, self.env.cvx);
                let positions = if *cvx_first {
                    [(cvx_id, *cvx), (crv_id, *crv)]
                } else {
                    [(crv_id, *crv), (cvx_id, *cvx)]
                };
                self.env.allocate(&positions).map(|_| ())
            }
            Action::Accrue { lender, secs } => {
                let id = self.lender(*lender);
                self.env.accrue(id, *secs);
                Ok(())
            }
            Action::Report { lender } => {
                let id = self.lender(*lender);
                self.env.vault.process_report(ADMIN, &self.env.pool, id).map(|_| ())
            }
            Action::Borrow { amount } => {
                let crv = self.env.crv;
                self.gateway
                    .borrow(&self.env.manager, &mut self.env.vault, &mut self.env.pool, crv, *amount)
                    .map(|_| ())
            }
            Action::Shutdown => self.env.vault.set_shutdown(ADMIN, true),
        };

        if result.is_err() {
            assert_eq!(before, Snapshot::take(&self.env), "mutation on error: {}", context);
        }
        if before.is_shutdown {
            assert!(self.env.vault.is_shutdown(), "shutdown cleared: {}", context);
        }
        assert_invariants(&self.env, &context);
    }
}

// ============================================================================
// SECTION 4: STATE MACHINE
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn fuzz_state_machine(
        seed_deposit in 1u128..50_000,
        actions in prop::collection::vec(action_strategy(), 20..80)
    ) {
        let mut state = FuzzState::new();
        state.env.deposit(USER1, seed_deposit);

        for (step, action) in actions.iter().enumerate() {
            state.execute(action, step);
        }
    }
}

// ============================================================================
// SECTION 5: FOCUSED PROPERTIES
// ============================================================================

proptest! {
    // Depositing then redeeming everything never returns more than was put in
    #[test]
    fn fuzz_prop_deposit_redeem_not_profitable(
        seed in 1u128..1_000_000,
        gain_secs in 0u64..ONE_YEAR,
        amount in 1u128..1_000_000
    ) {
        let mut env = setup();
        env.deposit(USER1, seed);
        let _ = env.allocate(&[(env.crv, 8_000)]);
        env.accrue(env.crv, gain_secs);
        env.vault.process_report(ADMIN, &env.pool, env.crv).unwrap();

        let idle_before = env.vault.total_idle();
        if let Ok(shares) = env.vault.deposit(USER2, amount, USER2) {
            let back = env.vault.redeem(USER2, shares, USER2, USER2).unwrap_or(0);
            prop_assert!(back <= amount);
            prop_assert!(env.vault.total_idle() >= idle_before);
        }
    }

    // Withdrawing burns at least the shares a deposit of the same size mints
    #[test]
    fn fuzz_prop_withdraw_rounds_up(
        seed in 1u128..1_000_000,
        gain_secs in 0u64..ONE_YEAR,
        assets in 1u128..100_000
    ) {
        let mut env = setup();
        env.deposit(USER1, seed);
        let _ = env.allocate(&[(env.crv, 8_000)]);
        env.accrue(env.crv, gain_secs);
        env.vault.process_report(ADMIN, &env.pool, env.crv).unwrap();

        let burned = env.vault.preview_withdraw(assets).unwrap();
        let minted = env.vault.preview_deposit(assets).unwrap();
        prop_assert!(burned >= minted);
        prop_assert!(env.vault.preview_redeem(burned).unwrap() >= assets);
    }

    // A batch with one position above its cap changes nothing
    #[test]
    fn fuzz_prop_capped_batch_atomic(
        deposit in 10_000u128..100_000,
        cvx_target in 0u128..50_000,
        excess in 1u128..10_000
    ) {
        let mut env = setup();
        env.deposit(USER1, deposit);
        let before = Snapshot::take(&env);

        let result = env.allocate(&[(env.cvx, cvx_target), (env.crv, 8_000 + excess)]);
        prop_assert_eq!(result, Err(VaultError::CapExceeded));
        prop_assert_eq!(before, Snapshot::take(&env));
    }

    // Allocation never draws idle below the floor
    #[test]
    fn fuzz_prop_allocation_respects_idle_floor(
        deposit in 0u128..50_000,
        crv in 0u128..8_000,
        cvx in 0u128..100_000
    ) {
        let mut env = setup();
        if deposit > 0 {
            env.deposit(USER1, deposit);
        }
        env.allocate(&[(env.crv, crv), (env.cvx, cvx)]).unwrap();

        let floor = env.vault.minimum_total_idle();
        prop_assert!(env.vault.total_idle() >= floor.min(deposit));
        prop_assert_eq!(env.vault.total_assets(), deposit);
    }

    // After shutdown every lender can be drained back to idle
    #[test]
    fn fuzz_prop_shutdown_drains(
        deposit in 2_000u128..100_000,
        crv in 0u128..8_000,
        cvx in 0u128..100_000,
        target in 0u128..200_000
    ) {
        let mut env = setup();
        env.deposit(USER1, deposit);
        env.allocate(&[(env.crv, crv), (env.cvx, cvx)]).unwrap();
        env.vault.set_shutdown(ADMIN, true).unwrap();

        for id in [env.crv, env.cvx] {
            let current = env.debt(id);
            let result = env.vault.update_debt(ADMIN, &mut env.pool, id, target);
            if target > current {
                prop_assert_eq!(result, Err(VaultError::Shutdown));
                env.vault.update_debt(ADMIN, &mut env.pool, id, 0).unwrap();
            }
            prop_assert_eq!(env.debt(id), 0);
        }
        prop_assert_eq!(env.vault.total_idle(), deposit);
    }
}
