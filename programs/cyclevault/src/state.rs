// programs/cyclevault/src/state.rs

use anchor_lang::prelude::*;

/// Seconds in a year, used for pro-rata management fee accrual
pub const SECONDS_IN_A_YEAR: u64 = 365 * 86400;

/// Fee rates are expressed in parts-per-million
pub const FEE_DENOMINATOR: u64 = 1_000_000;

/// Fund configuration - identity of the fund, role assignments and toggles
/// PDA seeds: ["fund_config"]
#[account]
#[derive(InitSpace)]
pub struct FundConfig {
    /// Admin authority (fee config, roles, strategy vault, eligibility)
    pub admin: Pubkey,

    /// Auditors authorized to run cycle transitions, limits and locks.
    /// Explicit role list - every privileged operation checks membership here.
    #[max_len(8)]
    pub auditors: Vec<Pubkey>,

    /// Mint of the pooled asset (e.g. USDC)
    pub asset_mint: Pubkey,

    /// Mint of the fund share token, authority is the vault authority PDA
    pub share_mint: Pubkey,

    /// Program-owned asset token account holding locked assets
    /// (pending deposits, unclaimed withdrawal proceeds)
    pub fund_vault: Pubkey,

    /// Program-owned share token account holding escrowed withdrawal-request
    /// shares and minted-but-unclaimed deposit shares
    pub share_escrow: Pubkey,

    /// External custody token account funds are parked in between cycles.
    /// The strategy operating on it is an external collaborator.
    pub strategy_vault: Pubkey,

    /// Initial share price, assets per shares, used while total supply is zero
    pub initial_price_numerator: u64,
    pub initial_price_denominator: u64,

    /// Independent funding toggles
    pub disable_deposit: bool,
    pub disable_withdraw: bool,
    pub disable_cancel_deposit: bool,
    pub disable_cancel_withdraw: bool,

    /// Eligibility gate: depositors must hold at least one token of
    /// `eligibility_mint` unless checks are disabled
    pub disable_eligibility_checks: bool,
    pub eligibility_mint: Pubkey,

    /// Bump seeds
    pub bump: u8,
    pub vault_authority_bump: u8,
}

impl FundConfig {
    pub const SEED_PREFIX: &'static [u8] = b"fund_config";
    pub const VAULT_AUTHORITY_SEED: &'static [u8] = b"vault_authority";
    pub const MAX_AUDITORS: usize = 8;

    pub fn is_admin(&self, key: &Pubkey) -> bool {
        self.admin == *key
    }

    pub fn is_auditor(&self, key: &Pubkey) -> bool {
        self.auditors.iter().any(|a| a == key)
    }
}

/// Global mutable fund state
/// PDA seeds: ["global_state"]
#[account]
#[derive(InitSpace)]
pub struct GlobalState {
    /// Maximum total locked assets accepted into the request queue
    pub deposit_limit: u64,

    /// Assets held in the fund vault on behalf of the request queue:
    /// pending deposits plus unclaimed withdrawal proceeds
    pub locked_assets: u64,

    /// Monotonic cycle counter, +1 per successful transition
    pub cycle_index: u32,

    /// Start timestamp of the current (open) cycle
    pub cycle_start_timestamp: i64,

    /// Requests are rejected from this timestamp until the next transition
    pub funding_lock_timestamp: i64,

    /// One-way flag, set by a closing transition
    pub fund_closed: bool,

    /// Share price frozen at closure, assets per share, for close_position
    pub closure_price_numerator: u64,
    pub closure_price_denominator: u64,

    /// NAV net of fees and queued flows as of the last closed cycle
    pub fund_value_after_requests: u64,

    /// Per-cycle request aggregates, reset on transition
    pub requested_deposits: u64,
    pub requested_withdrawals: u64,

    /// Bump seed
    pub bump: u8,
}

impl GlobalState {
    pub const SEED_PREFIX: &'static [u8] = b"global_state";
}

/// Fee configuration - destinations and six independent ppm rates,
/// applied separately to platform and manager
/// PDA seeds: ["fee_config"]
#[account]
#[derive(InitSpace)]
pub struct FeeConfig {
    /// Platform fee destination token account
    pub platform_vault: Pubkey,

    /// Manager fee destination token account
    pub manager_vault: Pubkey,

    /// Entry fee on requested deposit assets (ppm)
    pub platform_entry_fee: u32,
    pub manager_entry_fee: u32,

    /// Exit fee on converted withdrawal assets (ppm)
    pub platform_exit_fee: u32,
    pub manager_exit_fee: u32,

    /// Performance fee on profit above the previous cycle's
    /// fund value after requests (ppm)
    pub platform_performance_fee: u32,
    pub manager_performance_fee: u32,

    /// Management fee on reported fund value, pro-rated per year (ppm)
    pub platform_management_fee: u32,
    pub manager_management_fee: u32,

    /// Bump seed
    pub bump: u8,
}

impl FeeConfig {
    pub const SEED_PREFIX: &'static [u8] = b"fee_config";

    /// Each combined rate must stay below 100%
    pub fn validate(&self) -> bool {
        (self.platform_entry_fee as u64 + self.manager_entry_fee as u64) < FEE_DENOMINATOR
            && (self.platform_exit_fee as u64 + self.manager_exit_fee as u64) < FEE_DENOMINATOR
            && (self.platform_performance_fee as u64 + self.manager_performance_fee as u64)
                < FEE_DENOMINATOR
            && (self.platform_management_fee as u64 + self.manager_management_fee as u64)
                < FEE_DENOMINATOR
    }

    pub fn rates(&self) -> FeeRates {
        FeeRates {
            platform_entry_fee: self.platform_entry_fee,
            manager_entry_fee: self.manager_entry_fee,
            platform_exit_fee: self.platform_exit_fee,
            manager_exit_fee: self.manager_exit_fee,
            platform_performance_fee: self.platform_performance_fee,
            manager_performance_fee: self.manager_performance_fee,
            platform_management_fee: self.platform_management_fee,
            manager_management_fee: self.manager_management_fee,
        }
    }
}

/// Plain copy of the fee rates for pure computation and event payloads
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeeRates {
    pub platform_entry_fee: u32,
    pub manager_entry_fee: u32,
    pub platform_exit_fee: u32,
    pub manager_exit_fee: u32,
    pub platform_performance_fee: u32,
    pub manager_performance_fee: u32,
    pub platform_management_fee: u32,
    pub manager_management_fee: u32,
}

/// Closed-cycle snapshot - written exactly once at the cycle transition,
/// immutable afterward
/// PDA seeds: ["cycle_state", cycle_index]
#[account]
#[derive(InitSpace)]
pub struct CycleState {
    /// Index of the cycle this snapshot closes
    pub cycle_index: u32,

    /// Start timestamp reported for this cycle's transition
    pub start_timestamp: i64,

    /// Externally reported NAV at transition
    pub total_fund_value: u64,

    /// NAV net of fees and queued flows
    pub fund_value_after_requests: u64,

    /// Deposit assets queued during the cycle
    pub requested_deposits: u64,

    /// Shares minted for the deposit cohort
    pub converted_deposits: u64,

    /// Shares queued for withdrawal during the cycle
    pub requested_withdrawals: u64,

    /// Assets paid to the withdrawal cohort, net of exit fees
    pub converted_withdrawals: u64,

    /// Bump seed
    pub bump: u8,
}

impl CycleState {
    pub const SEED_PREFIX: &'static [u8] = b"cycle_state";

    /// Uniform cohort conversion: amount * converted / requested.
    /// The same ratio applies to every participant of the cycle so
    /// rounding stays consistent across the cohort.
    pub fn convert_deposit(&self, pending_assets: u64) -> Option<u64> {
        if self.requested_deposits == 0 {
            return Some(0);
        }
        let shares = (pending_assets as u128)
            .checked_mul(self.converted_deposits as u128)?
            .checked_div(self.requested_deposits as u128)?;
        u64::try_from(shares).ok()
    }

    pub fn convert_withdrawal(&self, pending_shares: u64) -> Option<u64> {
        if self.requested_withdrawals == 0 {
            return Some(0);
        }
        let assets = (pending_shares as u128)
            .checked_mul(self.converted_withdrawals as u128)?
            .checked_div(self.requested_withdrawals as u128)?;
        u64::try_from(assets).ok()
    }
}

/// Per-investor request ledger and owed record, resolved lazily.
/// Pending amounts accumulate between cycle boundaries and are frozen the
/// instant a transition occurs; owed balances are realized on claim without
/// rescanning historical cycles.
/// PDA seeds: ["investor_ledger", investor]
#[account]
#[derive(InitSpace)]
pub struct InvestorLedger {
    /// The investor this ledger belongs to
    pub investor: Pubkey,

    /// Deposit assets queued in `pending_deposit_cycle`
    pub pending_deposit_assets: u64,
    pub pending_deposit_cycle: u32,

    /// Shares escrowed for withdrawal in `pending_withdraw_cycle`
    pub pending_withdraw_shares: u64,
    pub pending_withdraw_cycle: u32,

    /// Converted but unclaimed balances from past transitions.
    /// Payable withdrawal assets are net of exit fees already.
    pub owed_shares: u64,
    pub owed_assets: u64,

    /// Bump seed
    pub bump: u8,
}

impl InvestorLedger {
    pub const SEED_PREFIX: &'static [u8] = b"investor_ledger";

    /// A deposit request from a closed cycle must be resolved before a
    /// new one can be filed
    pub fn has_stale_deposit(&self, current_cycle: u32) -> bool {
        self.pending_deposit_assets > 0 && self.pending_deposit_cycle != current_cycle
    }

    pub fn has_stale_withdrawal(&self, current_cycle: u32) -> bool {
        self.pending_withdraw_shares > 0 && self.pending_withdraw_cycle != current_cycle
    }
}

// ==================== UNIT TESTS ====================
