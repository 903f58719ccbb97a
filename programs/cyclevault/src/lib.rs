// programs/cyclevault/src/lib.rs
//
// CycleVault Program
// ==================
// Batch-cycle pooled fund vault:
// - Investors queue deposits and withdrawals between cycle boundaries
// - An auditor reports fund value and runs atomic cycle transitions that
//   price every queued request at one uniform ratio
// - Management, performance, entry and exit fees are assessed at the
//   transition in a fixed order, split between platform and manager
// - Converted balances are claimed lazily against immutable per-cycle
//   snapshots
// - A closing transition freezes the share price for direct liquidation

use anchor_lang::prelude::*;

pub mod errors;
pub mod events;
pub mod fees;
pub mod instructions;
pub mod state;

use fees::CycleComputation;
use instructions::*;
use state::FeeRates;

declare_id!("CyVLT7qfwvVvoUQFc3dqLBsQ31NrZyLZHEXFCnCPMRW1");

#[program]
pub mod cyclevault {
    use super::*;

    // ==================== INITIALIZATION ====================

    /// Initialize the fund: config, global state, fee config, share mint
    /// and the program-owned vaults
    pub fn initialize_fund(
        ctx: Context<InitializeFund>,
        params: InitializeFundParams,
    ) -> Result<()> {
        instructions::initialize::handler(ctx, params)
    }

    // ==================== ADMIN ====================

    /// Replace the fee schedule; takes effect from the next transition
    pub fn set_fee_config(ctx: Context<SetFeeConfig>, rates: FeeRates) -> Result<()> {
        instructions::admin::set_fee_config(ctx, rates)
    }

    /// Grant the auditor role
    pub fn add_auditor(ctx: Context<AdminUpdateConfig>, auditor: Pubkey) -> Result<()> {
        instructions::admin::add_auditor(ctx, auditor)
    }

    /// Revoke the auditor role
    pub fn remove_auditor(ctx: Context<AdminUpdateConfig>, auditor: Pubkey) -> Result<()> {
        instructions::admin::remove_auditor(ctx, auditor)
    }

    /// Point the fund at a different strategy custody account
    pub fn set_strategy_vault(ctx: Context<SetStrategyVault>) -> Result<()> {
        instructions::admin::set_strategy_vault(ctx)
    }

    /// Configure the depositor eligibility gate
    pub fn set_eligibility(
        ctx: Context<AdminUpdateConfig>,
        eligibility_mint: Pubkey,
        disable_checks: bool,
    ) -> Result<()> {
        instructions::admin::set_eligibility(ctx, eligibility_mint, disable_checks)
    }

    // ==================== AUDITOR CONTROLS ====================

    /// Cap the total locked assets accepted into the request queue
    pub fn set_deposit_limit(ctx: Context<AuditorUpdateState>, deposit_limit: u64) -> Result<()> {
        instructions::admin::set_deposit_limit(ctx, deposit_limit)
    }

    /// Move the funding lock of the open cycle
    pub fn set_fund_locking_timestamp(
        ctx: Context<AuditorUpdateState>,
        timestamp: i64,
    ) -> Result<()> {
        instructions::admin::set_fund_locking_timestamp(ctx, timestamp)
    }

    /// Flip the four independent funding toggles
    pub fn set_disable_funding(
        ctx: Context<AuditorUpdateToggles>,
        disable_deposit: bool,
        disable_withdraw: bool,
        disable_cancel_deposit: bool,
        disable_cancel_withdraw: bool,
    ) -> Result<()> {
        instructions::admin::set_disable_funding(
            ctx,
            disable_deposit,
            disable_withdraw,
            disable_cancel_deposit,
            disable_cancel_withdraw,
        )
    }

    /// Push working capital from the fund vault to the strategy vault
    pub fn deposit_to_strategy(ctx: Context<MoveStrategyFunds>, amount: u64) -> Result<()> {
        instructions::admin::deposit_to_strategy(ctx, amount)
    }

    /// Pull assets back from the strategy vault ahead of a transition
    pub fn withdraw_from_strategy(ctx: Context<MoveStrategyFunds>, amount: u64) -> Result<()> {
        instructions::admin::withdraw_from_strategy(ctx, amount)
    }

    // ==================== FUNDING REQUESTS ====================

    /// Queue a deposit for the open cycle
    pub fn request_deposit(ctx: Context<RequestDeposit>, assets: u64) -> Result<()> {
        instructions::requests::request_deposit(ctx, assets)
    }

    /// Take back part or all of a deposit queued in the open cycle
    pub fn cancel_deposit(ctx: Context<CancelDeposit>, assets: u64) -> Result<()> {
        instructions::requests::cancel_deposit(ctx, assets)
    }

    /// Queue a withdrawal for the open cycle; shares go to escrow
    pub fn request_withdraw(ctx: Context<RequestWithdraw>, shares: u64) -> Result<()> {
        instructions::requests::request_withdraw(ctx, shares)
    }

    /// Take back part or all of a withdrawal queued in the open cycle
    pub fn cancel_withdraw(ctx: Context<CancelWithdraw>, shares: u64) -> Result<()> {
        instructions::requests::cancel_withdraw(ctx, shares)
    }

    // ==================== CYCLE TRANSITIONS ====================

    /// Close the open cycle: assess fees, price every queued request,
    /// settle with the strategy vault and snapshot the conversion ratios
    pub fn enter_next_cycle(
        ctx: Context<EnterCycle>,
        params: EnterNextCycleParams,
    ) -> Result<CycleComputation> {
        instructions::cycle::enter_next_cycle(ctx, params)
    }

    /// Dry-run the transition pricing without mutating anything
    pub fn preview_next_cycle(
        ctx: Context<PreviewCycle>,
        fund_value: u64,
        timestamp: i64,
        withdraw_ceiling: u64,
    ) -> Result<CycleComputation> {
        instructions::cycle::preview_next_cycle(ctx, fund_value, timestamp, withdraw_ceiling)
    }

    // ==================== CLAIMS ====================

    /// Pay out shares owed from matured deposit requests
    pub fn claim_owed_shares(ctx: Context<ClaimOwedShares>) -> Result<u64> {
        instructions::claims::claim_owed_shares(ctx)
    }

    /// Pay out assets owed from matured withdrawal requests
    pub fn claim_owed_assets(ctx: Context<ClaimOwedAssets>) -> Result<u64> {
        instructions::claims::claim_owed_assets(ctx)
    }

    /// Pay out both owed sides in one call
    pub fn claim_owed_funds(ctx: Context<ClaimOwedFunds>) -> Result<ClaimedFunds> {
        instructions::claims::claim_owed_funds(ctx)
    }

    /// Claim matured withdrawal proceeds, then queue a fresh deposit
    pub fn claim_and_request_deposit(
        ctx: Context<ClaimAndRequestDeposit>,
        assets: u64,
    ) -> Result<()> {
        instructions::claims::claim_and_request_deposit(ctx, assets)
    }

    /// Claim matured deposit shares, then queue a withdrawal of them
    pub fn claim_and_request_withdraw(
        ctx: Context<ClaimAndRequestWithdraw>,
        shares: u64,
    ) -> Result<()> {
        instructions::claims::claim_and_request_withdraw(ctx, shares)
    }

    // ==================== CLOSURE ====================

    /// Liquidate shares at the closure price once the fund is closed
    pub fn close_position(ctx: Context<ClosePosition>, shares: u64) -> Result<u64> {
        instructions::claims::close_position(ctx, shares)
    }

    /// Liquidate the full share balance and pay out all owed assets
    pub fn close_position_and_claim(ctx: Context<ClosePositionAndClaim>) -> Result<u64> {
        instructions::claims::close_position_and_claim(ctx)
    }
}
