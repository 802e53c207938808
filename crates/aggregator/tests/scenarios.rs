//! End-to-end vault flows: deposits, allocation, reporting, removal and the
//! just-in-time liquidity path.

mod common;

use aggregator::*;
use common::*;

// ============================================================================
// Allocation
// ============================================================================

#[test]
fn test_deposits_then_allocation_leaves_idle() {
    let mut env = setup();
    assert_eq!(env.deposit(USER1, 5_000), 5_000);
    assert_eq!(env.deposit(USER2, 10_000), 10_000);

    let moved = env.allocate(&[(env.crv, 8_000), (env.cvx, 0)]).unwrap();
    assert_eq!(moved, vec![8_000, 0]);

    assert_eq!(env.vault.total_idle(), 7_000);
    assert_eq!(env.vault.total_debt(), 8_000);
    assert_eq!(env.vault.total_assets(), 15_000);
    assert_eq!(env.debt(env.crv), 8_000);
    assert_eq!(env.live_assets(env.crv), 8_000);
    assert!(env.vault.check_debt_ledger());
    assert!(env.vault.check_backing(&env.pool));
}

#[test]
fn test_allocation_stops_at_minimum_idle() {
    let mut env = setup();
    env.deposit(USER1, 15_000);
    env.allocate(&[(env.crv, 8_000)]).unwrap();

    // cvx is uncapped; only the idle floor limits it
    let moved = env.allocate(&[(env.cvx, 9_000)]).unwrap();
    assert_eq!(moved, vec![6_000]);
    assert_eq!(env.vault.total_idle(), env.vault.minimum_total_idle());
    assert_eq!(env.debt(env.cvx), 6_000);
}

#[test]
fn test_allocation_over_cap_rejected_without_moving_funds() {
    let mut env = setup();
    env.deposit(USER1, 15_000);

    let result = env.allocate(&[(env.cvx, 2_000), (env.crv, 8_001)]);
    assert_eq!(result, Err(VaultError::CapExceeded));
    assert_eq!(env.vault.total_idle(), 15_000);
    assert_eq!(env.debt(env.cvx), 0);
    assert_eq!(env.live_assets(env.cvx), 0);
}

#[test]
fn test_reallocation_moves_between_lenders() {
    let mut env = setup();
    env.deposit(USER1, 15_000);
    env.allocate(&[(env.crv, 8_000), (env.cvx, 6_000)]).unwrap();
    assert_eq!(env.vault.total_idle(), 1_000);

    // decrease first frees idle for the increase
    let moved = env.allocate(&[(env.crv, 2_000), (env.cvx, 12_000)]).unwrap();
    assert_eq!(moved, vec![6_000, 6_000]);
    assert_eq!(env.vault.total_idle(), 1_000);
    assert_eq!(env.vault.total_assets(), 15_000);
}

// ============================================================================
// Reporting
// ============================================================================

#[test]
fn test_report_gain_mints_fees_and_lifts_share_price() {
    let mut env = setup();
    env.deposit(USER1, 5_000);
    env.deposit(USER2, 10_000);
    env.allocate(&[(env.crv, 8_000)]).unwrap();

    let gained = env.accrue(env.crv, ONE_YEAR);
    assert!(gained > 0);

    let report = env.vault.process_report(ADMIN, &env.pool, env.crv).unwrap();
    assert_eq!(report.gain, gained);
    assert_eq!(report.loss, 0);
    assert_eq!(report.current_debt, 8_000 + gained);
    assert!(report.admin_fee_shares > 0);
    assert!(report.protocol_fee_shares > 0);

    assert_eq!(env.vault.balance_of(&ADMIN), report.admin_fee_shares);
    assert_eq!(env.vault.balance_of(&TREASURY), report.protocol_fee_shares);
    // holders keep their shares, each share is worth more
    assert_eq!(env.vault.balance_of(&USER1), 5_000);
    assert_eq!(env.vault.balance_of(&USER2), 10_000);
    assert!(env.vault.convert_to_assets(5_000).unwrap() > 5_000);
    assert_eq!(env.vault.total_assets(), 15_000 + gained);

    // nothing changed since
    let again = env.vault.process_report(ADMIN, &env.pool, env.crv).unwrap();
    assert_eq!(again.gain, 0);
    assert_eq!(again.admin_fee_shares, 0);
}

#[test]
fn test_report_loss_lowers_share_price() {
    let mut env = setup();
    env.deposit(USER1, 15_000);
    env.allocate(&[(env.crv, 8_000)]).unwrap();

    let lost = env
        .pool
        .get_mut(env.crv)
        .unwrap()
        .as_market_mut()
        .unwrap()
        .write_off(70_000)
        .unwrap();
    assert!(lost > 0);
    assert!(env.vault.check_debt_ledger());
    assert!(!env.vault.check_backing(&env.pool));

    let supply = env.vault.total_supply();
    let report = env.vault.process_report(ADMIN, &env.pool, env.crv).unwrap();
    assert_eq!(report.loss, lost);
    assert_eq!(env.vault.total_supply(), supply);
    assert_eq!(env.vault.total_assets(), 15_000 - lost);
    assert!(env.vault.convert_to_assets(15_000).unwrap() < 15_000);
    assert!(env.vault.check_backing(&env.pool));
}

#[test]
fn test_report_requires_admin() {
    let mut env = setup();
    assert_eq!(
        env.vault.process_report(MANAGER, &env.pool, env.crv),
        Err(VaultError::Unauthorized)
    );
}

// ============================================================================
// Removal
// ============================================================================

#[test]
fn test_remove_lender_with_debt_needs_drain() {
    let mut env = setup();
    env.deposit(USER1, 15_000);
    env.allocate(&[(env.crv, 8_000)]).unwrap();

    assert_eq!(
        env.vault.remove_lender(ADMIN, &env.pool, env.crv, false),
        Err(VaultError::NonZeroDebt)
    );
    // live assets still there, force does not help
    assert_eq!(
        env.vault.remove_lender(ADMIN, &env.pool, env.crv, true),
        Err(VaultError::NonZeroDebt)
    );

    env.vault.update_debt(ADMIN, &mut env.pool, env.crv, 0).unwrap();
    env.vault.process_report(ADMIN, &env.pool, env.crv).unwrap();
    env.vault.remove_lender(ADMIN, &env.pool, env.crv, false).unwrap();

    assert_eq!(env.vault.get_lenders(), vec![env.cvx]);
    assert_eq!(env.vault.total_idle(), 15_000);
    assert!(env.vault.check_debt_ledger());
    assert!(env.vault.check_backing(&env.pool));
}

#[test]
fn test_force_remove_books_loss_of_emptied_lender() {
    let (mut vault, manager, mut pool, ids) = setup_fixed(&[(500, 0)]);
    vault.deposit(USER1, 10_000, USER1).unwrap();
    manager
        .manual_allocation(ADMIN, &mut vault, &mut pool, &[AllocationPosition::new(ids[0], 4_000)])
        .unwrap();

    // the source loses everything it held
    pool.get_mut(ids[0]).unwrap().withdraw(4_000).unwrap();

    // writing the debt off is the admin's call
    assert_eq!(
        vault.remove_lender(MANAGER, &pool, ids[0], true),
        Err(VaultError::Unauthorized)
    );
    assert_eq!(vault.total_debt(), 4_000);
    assert!(!vault.check_backing(&pool));

    vault.remove_lender(ADMIN, &pool, ids[0], true).unwrap();
    assert!(vault.get_lenders().is_empty());
    assert_eq!(vault.total_debt(), 0);
    assert_eq!(vault.total_assets(), 6_000);
}

// ============================================================================
// Just-in-time liquidity
// ============================================================================

fn gateway_env() -> (Env, LiquidityGateway) {
    let mut env = setup();
    env.vault.update_max_debt_for_lender(ADMIN, env.crv, 20_000).unwrap();
    env.manager
        .set_whitelisted_gateway(ADMIN, &env.vault, GATEWAY, true)
        .unwrap();
    env.deposit(USER1, 15_000);
    env.allocate(&[(env.crv, 8_000)]).unwrap();
    let gateway = LiquidityGateway::new(GATEWAY, ADMIN, 8_000).unwrap();
    (env, gateway)
}

#[test]
fn test_borrow_below_limit_needs_no_top_up() {
    let (mut env, gateway) = gateway_env();
    let outcome = gateway
        .borrow(&env.manager, &mut env.vault, &mut env.pool, env.crv, 5_000)
        .unwrap();
    assert_eq!(outcome, BorrowOutcome { borrowed: 5_000, topped_up: 0 });
    assert_eq!(env.vault.total_idle(), 7_000);
}

#[test]
fn test_borrow_above_limit_tops_up_to_idle_floor() {
    let (mut env, gateway) = gateway_env();
    gateway
        .borrow(&env.manager, &mut env.vault, &mut env.pool, env.crv, 5_000)
        .unwrap();

    // 95k borrowed of 108k supplied: 10_750 short of 80%, only 6k above the floor
    let outcome = gateway
        .borrow(&env.manager, &mut env.vault, &mut env.pool, env.crv, 20_000)
        .unwrap();
    assert_eq!(outcome.borrowed, 20_000);
    assert_eq!(outcome.topped_up, 6_000);
    assert_eq!(env.vault.total_idle(), 1_000);
    assert_eq!(env.debt(env.crv), 14_000);

    // the floor is reached, further top-ups provide nothing
    let outcome = gateway
        .borrow(&env.manager, &mut env.vault, &mut env.pool, env.crv, 1_000)
        .unwrap();
    assert_eq!(outcome.topped_up, 0);
    assert!(env.vault.check_debt_ledger());
    assert!(env.vault.check_backing(&env.pool));
}

#[test]
fn test_failed_borrow_rolls_back_top_up() {
    let (mut env, gateway) = gateway_env();
    let result = gateway.borrow(&env.manager, &mut env.vault, &mut env.pool, env.crv, 50_000);
    assert!(matches!(
        result,
        Err(VaultError::Adapter(AdapterError::InsufficientLiquidity { requested: 50_000, .. }))
    ));
    assert_eq!(env.vault.total_idle(), 7_000);
    assert_eq!(env.debt(env.crv), 8_000);
    assert_eq!(env.live_assets(env.crv), 8_000);
}

#[test]
fn test_unlisted_gateway_cannot_request_liquidity() {
    let (mut env, _) = gateway_env();
    let rogue = LiquidityGateway::new(AccountId::from_byte(0x66), ADMIN, 8_000).unwrap();
    assert_eq!(
        rogue.borrow(&env.manager, &mut env.vault, &mut env.pool, env.crv, 40_000),
        Err(VaultError::Unauthorized)
    );
    assert_eq!(env.vault.total_idle(), 7_000);
}

#[test]
fn test_shut_down_vault_serves_borrow_without_top_up() {
    let (mut env, gateway) = gateway_env();
    env.vault.set_shutdown(ADMIN, true).unwrap();
    let outcome = gateway
        .borrow(&env.manager, &mut env.vault, &mut env.pool, env.crv, 30_000)
        .unwrap();
    assert_eq!(outcome, BorrowOutcome { borrowed: 30_000, topped_up: 0 });
    assert_eq!(env.vault.total_idle(), 7_000);
}
