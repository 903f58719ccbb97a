// programs/cyclevault/src/events.rs
//
// The four event families below (fund lifecycle, requests, claims, cycle
// transitions) are the complete input of the offline historical
// reconstructor - anything it needs must be carried here.

use crate::fees::CycleFees;
use crate::state::FeeRates;
use anchor_lang::prelude::*;

/// Emitted once when the fund is created
#[event]
pub struct FundInitialized {
    pub admin: Pubkey,
    pub asset_mint: Pubkey,
    pub share_mint: Pubkey,
    pub initial_price_numerator: u64,
    pub initial_price_denominator: u64,
    pub start_timestamp: i64,
    pub timestamp: i64,
}

/// Emitted when an investor queues a deposit
#[event]
pub struct DepositRequested {
    pub caller: Pubkey,
    pub investor: Pubkey,
    pub cycle_index: u32,
    pub assets: u64,
    pub timestamp: i64,
}

/// Emitted when a queued deposit is cancelled
#[event]
pub struct DepositCanceled {
    pub investor: Pubkey,
    pub cycle_index: u32,
    pub assets: u64,
    pub timestamp: i64,
}

/// Emitted when an investor (or approved spender) queues a withdrawal
#[event]
pub struct WithdrawalRequested {
    pub caller: Pubkey,
    pub investor: Pubkey,
    pub cycle_index: u32,
    pub shares: u64,
    pub timestamp: i64,
}

/// Emitted when a queued withdrawal is cancelled
#[event]
pub struct WithdrawalCanceled {
    pub investor: Pubkey,
    pub cycle_index: u32,
    pub shares: u64,
    pub timestamp: i64,
}

/// Emitted when owed shares are paid out
#[event]
pub struct SharesClaimed {
    pub investor: Pubkey,
    pub shares: u64,
    pub timestamp: i64,
}

/// Emitted when owed assets are paid out
#[event]
pub struct AssetsClaimed {
    pub investor: Pubkey,
    pub assets: u64,
    pub timestamp: i64,
}

/// Emitted when a position is liquidated after fund closure
#[event]
pub struct PositionClosed {
    pub caller: Pubkey,
    pub investor: Pubkey,
    pub shares: u64,
    pub assets: u64,
    pub timestamp: i64,
}

/// Emitted by every successful cycle transition, with the full fee
/// breakdown and the converted/requested totals of the closed cycle
#[event]
pub struct EnterNextCycle {
    pub cycle_index: u32,
    pub fund_value: u64,
    pub fund_value_after_requests: u64,
    pub price_numerator: u64,
    pub price_denominator: u64,
    pub requested_deposits: u64,
    pub converted_deposits: u64,
    pub requested_withdrawals: u64,
    /// Net of exit fees, matching the snapshot the claim path prices from
    pub converted_withdrawals: u64,
    pub fees: CycleFees,
    pub deposit_limit: u64,
    pub start_timestamp: i64,
    pub lock_timestamp: i64,
    pub fund_closed: bool,
    pub timestamp: i64,
}

/// Emitted when the fee configuration changes; takes effect for the
/// cycle carried here
#[event]
pub struct FeeConfigChanged {
    pub cycle_index: u32,
    pub platform_vault: Pubkey,
    pub manager_vault: Pubkey,
    pub rates: FeeRates,
    pub timestamp: i64,
}

/// Emitted when the deposit limit changes outside a transition
#[event]
pub struct DepositLimitUpdated {
    pub cycle_index: u32,
    pub deposit_limit: u64,
    pub timestamp: i64,
}

/// Emitted when the funding lock timestamp changes
#[event]
pub struct FundLockingTimestampUpdated {
    pub cycle_index: u32,
    pub funding_lock_timestamp: i64,
    pub timestamp: i64,
}

/// Emitted when the four funding toggles change
#[event]
pub struct FundingToggles {
    pub disable_deposit: bool,
    pub disable_withdraw: bool,
    pub disable_cancel_deposit: bool,
    pub disable_cancel_withdraw: bool,
    pub timestamp: i64,
}

/// Emitted when the auditor set changes
#[event]
pub struct AuditorAdded {
    pub auditor: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct AuditorRemoved {
    pub auditor: Pubkey,
    pub timestamp: i64,
}

/// Emitted when the strategy vault account changes
#[event]
pub struct StrategyVaultUpdated {
    pub strategy_vault: Pubkey,
    pub timestamp: i64,
}

/// Emitted when the eligibility gate changes
#[event]
pub struct EligibilityUpdated {
    pub eligibility_mint: Pubkey,
    pub disable_eligibility_checks: bool,
    pub timestamp: i64,
}

/// Emitted when an auditor moves working capital between the fund vault
/// and the strategy vault
#[event]
pub struct FundsMovedToStrategy {
    pub amount: u64,
    pub timestamp: i64,
}

#[event]
pub struct FundsMovedFromStrategy {
    pub amount: u64,
    pub timestamp: i64,
}
