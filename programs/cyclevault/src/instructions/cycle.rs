// programs/cyclevault/src/instructions/cycle.rs
//
// The cycle transition is the sole serialization point of the fund: one
// atomic pricing event per invocation. Every precondition failure aborts
// the whole transaction, so no request, claim or cancel can ever observe
// a half-applied transition.

use crate::errors::VaultError;
use crate::events::EnterNextCycle as EnterNextCycleEvent;
use crate::fees::{compute_cycle, CycleComputation, CycleInputs};
use crate::state::{CycleState, FeeConfig, FundConfig, GlobalState};
use anchor_lang::prelude::*;
use anchor_spl::token::{self, Mint, Token, TokenAccount};

#[derive(AnchorSerialize, AnchorDeserialize)]
pub struct EnterNextCycleParams {
    /// Must equal the current cycle index; fails the call otherwise
    pub expected_index: u32,
    /// Externally observed NAV of the strategy holdings
    pub fund_value: u64,
    pub new_deposit_limit: u64,
    /// Ceiling on converted withdrawal assets; conversions are clamped to
    /// it so a stale NAV cannot drain more than the operator intends
    pub withdraw_amount: u64,
    /// Start of the new cycle; bounded by the previous start and now
    pub cycle_start_timestamp: i64,
    pub next_lock_timestamp: i64,
    /// One-way: prices all remaining value for direct liquidation
    pub close_fund: bool,
}

#[derive(Accounts)]
pub struct EnterCycle<'info> {
    #[account(
        seeds = [FundConfig::SEED_PREFIX],
        bump = fund_config.bump,
        constraint = fund_config.is_auditor(&auditor.key()) @ VaultError::OnlyAvailableToAuditors
    )]
    pub fund_config: Account<'info, FundConfig>,

    #[account(
        mut,
        seeds = [GlobalState::SEED_PREFIX],
        bump = global_state.bump,
    )]
    pub global_state: Account<'info, GlobalState>,

    #[account(
        seeds = [FeeConfig::SEED_PREFIX],
        bump = fee_config.bump,
    )]
    pub fee_config: Account<'info, FeeConfig>,

    /// Snapshot of the closing cycle, written exactly once here
    #[account(
        init,
        payer = auditor,
        space = 8 + CycleState::INIT_SPACE,
        seeds = [CycleState::SEED_PREFIX, &global_state.cycle_index.to_le_bytes()],
        bump
    )]
    pub cycle_state: Account<'info, CycleState>,

    #[account(mut, address = fund_config.share_mint)]
    pub share_mint: Account<'info, Mint>,

    #[account(mut, address = fund_config.share_escrow)]
    pub share_escrow: Account<'info, TokenAccount>,

    #[account(mut, address = fund_config.fund_vault)]
    pub fund_vault: Account<'info, TokenAccount>,

    #[account(mut, address = fund_config.strategy_vault)]
    pub strategy_vault: Account<'info, TokenAccount>,

    #[account(mut, address = fee_config.platform_vault)]
    pub platform_vault: Account<'info, TokenAccount>,

    #[account(mut, address = fee_config.manager_vault)]
    pub manager_vault: Account<'info, TokenAccount>,

    /// CHECK: PDA signing for all vault token operations
    #[account(
        seeds = [FundConfig::VAULT_AUTHORITY_SEED],
        bump = fund_config.vault_authority_bump
    )]
    pub vault_authority: UncheckedAccount<'info>,

    #[account(mut)]
    pub auditor: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

/// Guards shared by nothing else: a transition must target the live
/// cycle of an open fund, and its start must fall between the previous
/// start and the on-chain clock.
fn check_transition_preconditions(
    state: &GlobalState,
    expected_index: u32,
    cycle_start_timestamp: i64,
    now: i64,
) -> Result<()> {
    require!(!state.fund_closed, VaultError::FundIsClosed);
    require!(
        expected_index == state.cycle_index,
        VaultError::IncorrectCycleIndex
    );
    require!(
        cycle_start_timestamp >= state.cycle_start_timestamp
            && cycle_start_timestamp <= now,
        VaultError::IncorrectCycleStartTimestamp
    );
    Ok(())
}

/// Applies a computed transition to the global state: the request queue
/// hands its deposits to the fund and receives the withdrawal cohort's
/// payable assets, counters reset, and the index bumps. On a closing
/// transition the remaining value is added to the locked pool and the
/// liquidation price is frozen.
fn settle_global_state(
    state: &mut GlobalState,
    params: &EnterNextCycleParams,
    outcome: &CycleComputation,
    total_supply: u64,
) -> Result<()> {
    let mut locked = state
        .locked_assets
        .checked_sub(state.requested_deposits)
        .ok_or(VaultError::MathOverflow)?
        .checked_add(outcome.payable_withdrawals)
        .ok_or(VaultError::MathOverflow)?;

    if params.close_fund {
        locked = locked
            .checked_add(outcome.fund_value_after_requests)
            .ok_or(VaultError::MathOverflow)?;
        let remaining_supply = total_supply
            .checked_sub(state.requested_withdrawals)
            .and_then(|s| s.checked_add(outcome.converted_deposits))
            .ok_or(VaultError::MathOverflow)?;
        state.fund_closed = true;
        state.closure_price_numerator = outcome.fund_value_after_requests;
        state.closure_price_denominator = remaining_supply;
    }

    state.locked_assets = locked;
    state.deposit_limit = params.new_deposit_limit;
    state.cycle_start_timestamp = params.cycle_start_timestamp;
    state.funding_lock_timestamp = params.next_lock_timestamp;
    state.fund_value_after_requests = outcome.fund_value_after_requests;
    state.requested_deposits = 0;
    state.requested_withdrawals = 0;
    state.cycle_index = state
        .cycle_index
        .checked_add(1)
        .ok_or(VaultError::MathOverflow)?;
    Ok(())
}

pub fn enter_next_cycle(
    ctx: Context<EnterCycle>,
    params: EnterNextCycleParams,
) -> Result<CycleComputation> {
    let clock = Clock::get()?;
    let config = &ctx.accounts.fund_config;
    let state = &mut ctx.accounts.global_state;

    check_transition_preconditions(
        state,
        params.expected_index,
        params.cycle_start_timestamp,
        clock.unix_timestamp,
    )?;

    let elapsed = (params.cycle_start_timestamp - state.cycle_start_timestamp) as u64;
    let total_supply = ctx.accounts.share_mint.supply;

    let outcome = compute_cycle(
        &CycleInputs {
            fund_value: params.fund_value,
            previous_fund_value_after_requests: state.fund_value_after_requests,
            elapsed,
            total_supply,
            requested_deposits: state.requested_deposits,
            requested_withdrawals: state.requested_withdrawals,
            withdraw_ceiling: params.withdraw_amount,
            initial_price_numerator: config.initial_price_numerator,
            initial_price_denominator: config.initial_price_denominator,
        },
        &ctx.accounts.fee_config.rates(),
    )?;

    let price_denominator_value = outcome
        .fund_value_after_requests
        .checked_sub(outcome.depositable)
        .ok_or(VaultError::MathOverflow)?;

    let authority_seeds: &[&[u8]] = &[
        FundConfig::VAULT_AUTHORITY_SEED,
        &[config.vault_authority_bump],
    ];
    let signer_seeds: &[&[&[u8]]] = &[authority_seeds];

    // pull what this transition settles out of the strategy: fees and the
    // withdrawal cohort's assets; on a closing transition everything comes
    // back so remaining positions liquidate from the fund vault
    let pull_from_strategy = if params.close_fund {
        params.fund_value
    } else {
        params
            .fund_value
            .checked_sub(price_denominator_value)
            .ok_or(VaultError::MathOverflow)?
    };
    if pull_from_strategy > 0 {
        token::transfer(
            CpiContext::new_with_signer(
                ctx.accounts.token_program.to_account_info(),
                token::Transfer {
                    from: ctx.accounts.strategy_vault.to_account_info(),
                    to: ctx.accounts.fund_vault.to_account_info(),
                    authority: ctx.accounts.vault_authority.to_account_info(),
                },
                signer_seeds,
            ),
            pull_from_strategy,
        )?;
    }

    // disburse all six fee legs to the two destinations
    let platform_total = outcome.fees.platform_total();
    if platform_total > 0 {
        token::transfer(
            CpiContext::new_with_signer(
                ctx.accounts.token_program.to_account_info(),
                token::Transfer {
                    from: ctx.accounts.fund_vault.to_account_info(),
                    to: ctx.accounts.platform_vault.to_account_info(),
                    authority: ctx.accounts.vault_authority.to_account_info(),
                },
                signer_seeds,
            ),
            platform_total,
        )?;
    }
    let manager_total = outcome.fees.manager_total();
    if manager_total > 0 {
        token::transfer(
            CpiContext::new_with_signer(
                ctx.accounts.token_program.to_account_info(),
                token::Transfer {
                    from: ctx.accounts.fund_vault.to_account_info(),
                    to: ctx.accounts.manager_vault.to_account_info(),
                    authority: ctx.accounts.vault_authority.to_account_info(),
                },
                signer_seeds,
            ),
            manager_total,
        )?;
    }

    // net new deposits start working in the strategy, unless the fund is
    // closing and everything stays claimable
    if !params.close_fund && outcome.depositable > 0 {
        token::transfer(
            CpiContext::new_with_signer(
                ctx.accounts.token_program.to_account_info(),
                token::Transfer {
                    from: ctx.accounts.fund_vault.to_account_info(),
                    to: ctx.accounts.strategy_vault.to_account_info(),
                    authority: ctx.accounts.vault_authority.to_account_info(),
                },
                signer_seeds,
            ),
            outcome.depositable,
        )?;
    }

    // withdrawal cohort's escrowed shares leave the supply
    if state.requested_withdrawals > 0 {
        token::burn(
            CpiContext::new_with_signer(
                ctx.accounts.token_program.to_account_info(),
                token::Burn {
                    mint: ctx.accounts.share_mint.to_account_info(),
                    from: ctx.accounts.share_escrow.to_account_info(),
                    authority: ctx.accounts.vault_authority.to_account_info(),
                },
                signer_seeds,
            ),
            state.requested_withdrawals,
        )?;
    }

    // deposit cohort's shares are minted into escrow for lazy claims
    if outcome.converted_deposits > 0 {
        token::mint_to(
            CpiContext::new_with_signer(
                ctx.accounts.token_program.to_account_info(),
                token::MintTo {
                    mint: ctx.accounts.share_mint.to_account_info(),
                    to: ctx.accounts.share_escrow.to_account_info(),
                    authority: ctx.accounts.vault_authority.to_account_info(),
                },
                signer_seeds,
            ),
            outcome.converted_deposits,
        )?;
    }

    // persist the immutable snapshot of the closed cycle
    let cycle_state = &mut ctx.accounts.cycle_state;
    cycle_state.cycle_index = state.cycle_index;
    cycle_state.start_timestamp = params.cycle_start_timestamp;
    cycle_state.total_fund_value = params.fund_value;
    cycle_state.fund_value_after_requests = outcome.fund_value_after_requests;
    cycle_state.requested_deposits = state.requested_deposits;
    cycle_state.converted_deposits = outcome.converted_deposits;
    cycle_state.requested_withdrawals = state.requested_withdrawals;
    // net of exit fees: claims hand out this pool with the cohort ratio
    cycle_state.converted_withdrawals = outcome.payable_withdrawals;
    cycle_state.bump = ctx.bumps.cycle_state;

    settle_global_state(state, &params, &outcome, total_supply)?;

    emit!(EnterNextCycleEvent {
        cycle_index: cycle_state.cycle_index,
        fund_value: params.fund_value,
        fund_value_after_requests: outcome.fund_value_after_requests,
        price_numerator: outcome.price_numerator,
        price_denominator: outcome.price_denominator,
        requested_deposits: cycle_state.requested_deposits,
        converted_deposits: outcome.converted_deposits,
        requested_withdrawals: cycle_state.requested_withdrawals,
        converted_withdrawals: outcome.payable_withdrawals,
        fees: outcome.fees,
        deposit_limit: params.new_deposit_limit,
        start_timestamp: params.cycle_start_timestamp,
        lock_timestamp: params.next_lock_timestamp,
        fund_closed: params.close_fund,
        timestamp: clock.unix_timestamp,
    });

    Ok(outcome)
}

// ==================== PREVIEW ====================

#[derive(Accounts)]
pub struct PreviewCycle<'info> {
    #[account(
        seeds = [FundConfig::SEED_PREFIX],
        bump = fund_config.bump,
    )]
    pub fund_config: Account<'info, FundConfig>,

    #[account(
        seeds = [GlobalState::SEED_PREFIX],
        bump = global_state.bump,
    )]
    pub global_state: Account<'info, GlobalState>,

    #[account(
        seeds = [FeeConfig::SEED_PREFIX],
        bump = fee_config.bump,
    )]
    pub fee_config: Account<'info, FeeConfig>,

    #[account(address = fund_config.share_mint)]
    pub share_mint: Account<'info, Mint>,
}

/// Runs the pricing algorithm without mutating anything. Fee totals and
/// converted amounts are bit-identical to what enter_next_cycle would
/// settle given the same state and arguments - both run compute_cycle.
pub fn preview_next_cycle(
    ctx: Context<PreviewCycle>,
    fund_value: u64,
    timestamp: i64,
    withdraw_ceiling: u64,
) -> Result<CycleComputation> {
    let state = &ctx.accounts.global_state;
    let config = &ctx.accounts.fund_config;

    require!(
        timestamp >= state.cycle_start_timestamp,
        VaultError::IncorrectCycleStartTimestamp
    );
    let elapsed = (timestamp - state.cycle_start_timestamp) as u64;

    compute_cycle(
        &CycleInputs {
            fund_value,
            previous_fund_value_after_requests: state.fund_value_after_requests,
            elapsed,
            total_supply: ctx.accounts.share_mint.supply,
            requested_deposits: state.requested_deposits,
            requested_withdrawals: state.requested_withdrawals,
            withdraw_ceiling,
            initial_price_numerator: config.initial_price_numerator,
            initial_price_denominator: config.initial_price_denominator,
        },
        &ctx.accounts.fee_config.rates(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FeeRates;

    fn open_state() -> GlobalState {
        GlobalState {
            deposit_limit: 1_000_000_000_000,
            locked_assets: 300_000_000_000,
            cycle_index: 3,
            cycle_start_timestamp: 1_700_000_000,
            funding_lock_timestamp: 1_700_080_000,
            fund_closed: false,
            closure_price_numerator: 0,
            closure_price_denominator: 0,
            fund_value_after_requests: 299_700_000_000,
            requested_deposits: 100_000_000_000,
            requested_withdrawals: 990_000_000,
            bump: 255,
        }
    }

    fn transition_params(state: &GlobalState) -> EnterNextCycleParams {
        EnterNextCycleParams {
            expected_index: state.cycle_index,
            fund_value: 400_000_000_000,
            new_deposit_limit: 2_000_000_000_000,
            withdraw_amount: u64::MAX,
            cycle_start_timestamp: state.cycle_start_timestamp + 86400,
            next_lock_timestamp: state.cycle_start_timestamp + 160_000,
            close_fund: false,
        }
    }

    fn test_rates() -> FeeRates {
        FeeRates {
            platform_entry_fee: 300,
            manager_entry_fee: 700,
            platform_exit_fee: 600,
            manager_exit_fee: 1400,
            platform_performance_fee: 10000,
            manager_performance_fee: 90000,
            platform_management_fee: 2000,
            manager_management_fee: 8000,
        }
    }

    fn outcome_for(state: &GlobalState, params: &EnterNextCycleParams) -> CycleComputation {
        let elapsed = (params.cycle_start_timestamp - state.cycle_start_timestamp) as u64;
        compute_cycle(
            &CycleInputs {
                fund_value: params.fund_value,
                previous_fund_value_after_requests: state.fund_value_after_requests,
                elapsed,
                total_supply: 2_997_000_000,
                requested_deposits: state.requested_deposits,
                requested_withdrawals: state.requested_withdrawals,
                withdraw_ceiling: params.withdraw_amount,
                initial_price_numerator: 100,
                initial_price_denominator: 1,
            },
            &test_rates(),
        )
        .unwrap()
    }

    #[test]
    fn test_wrong_expected_index_rejected() {
        let state = open_state();
        let now = state.cycle_start_timestamp + 86400;
        let result = check_transition_preconditions(&state, state.cycle_index + 1, now, now);
        assert_eq!(result, Err(VaultError::IncorrectCycleIndex.into()));
        let result = check_transition_preconditions(&state, state.cycle_index - 1, now, now);
        assert_eq!(result, Err(VaultError::IncorrectCycleIndex.into()));
    }

    #[test]
    fn test_start_timestamp_bounded_by_previous_start_and_clock() {
        let state = open_state();
        let now = state.cycle_start_timestamp + 86400;
        // earlier than the previous start
        let result = check_transition_preconditions(
            &state,
            state.cycle_index,
            state.cycle_start_timestamp - 1,
            now,
        );
        assert_eq!(result, Err(VaultError::IncorrectCycleStartTimestamp.into()));
        // in the future
        let result =
            check_transition_preconditions(&state, state.cycle_index, now + 1, now);
        assert_eq!(result, Err(VaultError::IncorrectCycleStartTimestamp.into()));
        // both boundaries are inclusive
        assert!(check_transition_preconditions(
            &state,
            state.cycle_index,
            state.cycle_start_timestamp,
            now
        )
        .is_ok());
        assert!(check_transition_preconditions(&state, state.cycle_index, now, now).is_ok());
    }

    #[test]
    fn test_closed_fund_rejects_transition() {
        let mut state = open_state();
        state.fund_closed = true;
        let now = state.cycle_start_timestamp + 86400;
        let result = check_transition_preconditions(&state, state.cycle_index, now, now);
        assert_eq!(result, Err(VaultError::FundIsClosed.into()));
    }

    #[test]
    fn test_settlement_bumps_index_and_resets_counters() {
        let mut state = open_state();
        let params = transition_params(&state);
        let outcome = outcome_for(&state, &params);
        let prior_locked = state.locked_assets;
        let prior_deposits = state.requested_deposits;

        settle_global_state(&mut state, &params, &outcome, 2_997_000_000).unwrap();

        assert_eq!(state.cycle_index, 4);
        assert_eq!(state.requested_deposits, 0);
        assert_eq!(state.requested_withdrawals, 0);
        assert_eq!(
            state.locked_assets,
            prior_locked - prior_deposits + outcome.payable_withdrawals
        );
        assert_eq!(state.deposit_limit, params.new_deposit_limit);
        assert_eq!(state.cycle_start_timestamp, params.cycle_start_timestamp);
        assert_eq!(state.funding_lock_timestamp, params.next_lock_timestamp);
        assert!(!state.fund_closed);
    }

    #[test]
    fn test_settlement_persists_previewed_amounts() {
        // the figures settled into state are exactly the ones a preview of
        // the same state and arguments returns
        let mut state = open_state();
        let params = transition_params(&state);
        let previewed = outcome_for(&state, &params);
        let executed = outcome_for(&state, &params);
        assert_eq!(previewed, executed);

        settle_global_state(&mut state, &params, &executed, 2_997_000_000).unwrap();
        assert_eq!(
            state.fund_value_after_requests,
            previewed.fund_value_after_requests
        );
    }

    #[test]
    fn test_closing_settlement_freezes_liquidation_price() {
        let mut state = open_state();
        let mut params = transition_params(&state);
        params.close_fund = true;
        let outcome = outcome_for(&state, &params);
        let total_supply = 2_997_000_000u64;
        let prior_locked = state.locked_assets;
        let prior_deposits = state.requested_deposits;
        let prior_withdrawals = state.requested_withdrawals;

        settle_global_state(&mut state, &params, &outcome, total_supply).unwrap();

        assert!(state.fund_closed);
        assert_eq!(
            state.closure_price_numerator,
            outcome.fund_value_after_requests
        );
        assert_eq!(
            state.closure_price_denominator,
            total_supply - prior_withdrawals + outcome.converted_deposits
        );
        // everything remaining is claimable from the fund vault
        assert_eq!(
            state.locked_assets,
            prior_locked - prior_deposits
                + outcome.payable_withdrawals
                + outcome.fund_value_after_requests
        );
        assert_eq!(state.cycle_index, 4);
    }
}
