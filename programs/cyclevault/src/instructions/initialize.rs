// programs/cyclevault/src/instructions/initialize.rs

use crate::errors::VaultError;
use crate::events::FundInitialized;
use crate::state::{FeeConfig, FundConfig, GlobalState};
use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};

#[derive(Accounts)]
pub struct InitializeFund<'info> {
    #[account(
        init,
        payer = admin,
        space = 8 + FundConfig::INIT_SPACE,
        seeds = [FundConfig::SEED_PREFIX],
        bump
    )]
    pub fund_config: Account<'info, FundConfig>,

    #[account(
        init,
        payer = admin,
        space = 8 + GlobalState::INIT_SPACE,
        seeds = [GlobalState::SEED_PREFIX],
        bump
    )]
    pub global_state: Account<'info, GlobalState>,

    #[account(
        init,
        payer = admin,
        space = 8 + FeeConfig::INIT_SPACE,
        seeds = [FeeConfig::SEED_PREFIX],
        bump
    )]
    pub fee_config: Account<'info, FeeConfig>,

    pub asset_mint: Account<'info, Mint>,

    /// Share mint controlled by the vault authority PDA
    #[account(
        init,
        payer = admin,
        mint::decimals = asset_mint.decimals,
        mint::authority = vault_authority,
    )]
    pub share_mint: Account<'info, Mint>,

    /// CHECK: PDA signing for all vault token operations
    #[account(
        seeds = [FundConfig::VAULT_AUTHORITY_SEED],
        bump
    )]
    pub vault_authority: UncheckedAccount<'info>,

    /// Asset custody for the request queue (locked assets)
    #[account(
        init,
        payer = admin,
        token::mint = asset_mint,
        token::authority = vault_authority,
    )]
    pub fund_vault: Account<'info, TokenAccount>,

    /// Escrow for requested-withdrawal shares and unclaimed minted shares
    #[account(
        init,
        payer = admin,
        token::mint = share_mint,
        token::authority = vault_authority,
    )]
    pub share_escrow: Account<'info, TokenAccount>,

    /// External custody the fund parks working capital in between cycles
    #[account(
        token::mint = asset_mint,
        token::authority = vault_authority,
    )]
    pub strategy_vault: Account<'info, TokenAccount>,

    #[account(mut)]
    pub admin: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

#[derive(AnchorSerialize, AnchorDeserialize)]
pub struct InitializeFundParams {
    /// Assets per shares before any shares exist
    pub initial_price_numerator: u64,
    pub initial_price_denominator: u64,
    /// Start of cycle 0; must not lie in the future
    pub start_timestamp: i64,
    pub platform_vault: Pubkey,
    pub manager_vault: Pubkey,
    pub eligibility_mint: Pubkey,
    pub disable_eligibility_checks: bool,
}

pub fn handler(ctx: Context<InitializeFund>, params: InitializeFundParams) -> Result<()> {
    let clock = Clock::get()?;

    require!(
        params.initial_price_numerator > 0 && params.initial_price_denominator > 0,
        VaultError::ZeroAmount
    );
    require!(
        params.start_timestamp <= clock.unix_timestamp,
        VaultError::IncorrectCycleStartTimestamp
    );

    let config = &mut ctx.accounts.fund_config;
    config.admin = ctx.accounts.admin.key();
    config.auditors = Vec::new();
    config.asset_mint = ctx.accounts.asset_mint.key();
    config.share_mint = ctx.accounts.share_mint.key();
    config.fund_vault = ctx.accounts.fund_vault.key();
    config.share_escrow = ctx.accounts.share_escrow.key();
    config.strategy_vault = ctx.accounts.strategy_vault.key();
    config.initial_price_numerator = params.initial_price_numerator;
    config.initial_price_denominator = params.initial_price_denominator;
    config.disable_deposit = false;
    config.disable_withdraw = false;
    config.disable_cancel_deposit = false;
    config.disable_cancel_withdraw = false;
    config.disable_eligibility_checks = params.disable_eligibility_checks;
    config.eligibility_mint = params.eligibility_mint;
    config.bump = ctx.bumps.fund_config;
    config.vault_authority_bump = ctx.bumps.vault_authority;

    let state = &mut ctx.accounts.global_state;
    state.deposit_limit = 0;
    state.locked_assets = 0;
    state.cycle_index = 0;
    state.cycle_start_timestamp = params.start_timestamp;
    state.funding_lock_timestamp = 0;
    state.fund_closed = false;
    state.closure_price_numerator = 0;
    state.closure_price_denominator = 0;
    state.fund_value_after_requests = 0;
    state.requested_deposits = 0;
    state.requested_withdrawals = 0;
    state.bump = ctx.bumps.global_state;

    // fee destinations are fixed here, rates start at zero and are set by
    // the admin through set_fee_config
    let fees = &mut ctx.accounts.fee_config;
    fees.platform_vault = params.platform_vault;
    fees.manager_vault = params.manager_vault;
    fees.platform_entry_fee = 0;
    fees.manager_entry_fee = 0;
    fees.platform_exit_fee = 0;
    fees.manager_exit_fee = 0;
    fees.platform_performance_fee = 0;
    fees.manager_performance_fee = 0;
    fees.platform_management_fee = 0;
    fees.manager_management_fee = 0;
    fees.bump = ctx.bumps.fee_config;

    emit!(FundInitialized {
        admin: ctx.accounts.admin.key(),
        asset_mint: ctx.accounts.asset_mint.key(),
        share_mint: ctx.accounts.share_mint.key(),
        initial_price_numerator: params.initial_price_numerator,
        initial_price_denominator: params.initial_price_denominator,
        start_timestamp: params.start_timestamp,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
