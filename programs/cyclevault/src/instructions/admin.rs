// programs/cyclevault/src/instructions/admin.rs
//
// Admin tier: fee configuration, role assignment, strategy vault and the
// eligibility gate. Auditor tier: deposit limit, funding lock, funding
// toggles and working-capital moves between fund and strategy vaults.

use crate::errors::VaultError;
use crate::events::{
    AuditorAdded, AuditorRemoved, DepositLimitUpdated, EligibilityUpdated, FeeConfigChanged,
    FundingToggles, FundLockingTimestampUpdated, FundsMovedFromStrategy, FundsMovedToStrategy,
    StrategyVaultUpdated,
};
use crate::state::{FeeConfig, FeeRates, FundConfig, GlobalState};
use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount};

// ==================== ADMIN OPERATIONS ====================

#[derive(Accounts)]
pub struct AdminUpdateConfig<'info> {
    #[account(
        mut,
        seeds = [FundConfig::SEED_PREFIX],
        bump = fund_config.bump,
        constraint = fund_config.is_admin(&admin.key()) @ VaultError::OnlyAvailableToAdmins
    )]
    pub fund_config: Account<'info, FundConfig>,

    pub admin: Signer<'info>,
}

#[derive(Accounts)]
pub struct SetFeeConfig<'info> {
    #[account(
        seeds = [FundConfig::SEED_PREFIX],
        bump = fund_config.bump,
        constraint = fund_config.is_admin(&admin.key()) @ VaultError::OnlyAvailableToAdmins
    )]
    pub fund_config: Account<'info, FundConfig>,

    #[account(
        seeds = [GlobalState::SEED_PREFIX],
        bump = global_state.bump,
    )]
    pub global_state: Account<'info, GlobalState>,

    #[account(
        mut,
        seeds = [FeeConfig::SEED_PREFIX],
        bump = fee_config.bump,
    )]
    pub fee_config: Account<'info, FeeConfig>,

    #[account(token::mint = fund_config.asset_mint)]
    pub platform_vault: Account<'info, TokenAccount>,

    #[account(token::mint = fund_config.asset_mint)]
    pub manager_vault: Account<'info, TokenAccount>,

    pub admin: Signer<'info>,
}

pub fn set_fee_config(ctx: Context<SetFeeConfig>, rates: FeeRates) -> Result<()> {
    let clock = Clock::get()?;
    let fee_config = &mut ctx.accounts.fee_config;

    fee_config.platform_vault = ctx.accounts.platform_vault.key();
    fee_config.manager_vault = ctx.accounts.manager_vault.key();
    fee_config.platform_entry_fee = rates.platform_entry_fee;
    fee_config.manager_entry_fee = rates.manager_entry_fee;
    fee_config.platform_exit_fee = rates.platform_exit_fee;
    fee_config.manager_exit_fee = rates.manager_exit_fee;
    fee_config.platform_performance_fee = rates.platform_performance_fee;
    fee_config.manager_performance_fee = rates.manager_performance_fee;
    fee_config.platform_management_fee = rates.platform_management_fee;
    fee_config.manager_management_fee = rates.manager_management_fee;

    require!(fee_config.validate(), VaultError::InvalidFeeRate);

    emit!(FeeConfigChanged {
        cycle_index: ctx.accounts.global_state.cycle_index,
        platform_vault: fee_config.platform_vault,
        manager_vault: fee_config.manager_vault,
        rates,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}

pub fn add_auditor(ctx: Context<AdminUpdateConfig>, auditor: Pubkey) -> Result<()> {
    let clock = Clock::get()?;
    let config = &mut ctx.accounts.fund_config;

    require!(!config.is_auditor(&auditor), VaultError::AuditorAlreadyAdded);
    require!(
        config.auditors.len() < FundConfig::MAX_AUDITORS,
        VaultError::TooManyAuditors
    );
    config.auditors.push(auditor);

    emit!(AuditorAdded {
        auditor,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}

pub fn remove_auditor(ctx: Context<AdminUpdateConfig>, auditor: Pubkey) -> Result<()> {
    let clock = Clock::get()?;
    let config = &mut ctx.accounts.fund_config;

    let position = config
        .auditors
        .iter()
        .position(|a| a == &auditor)
        .ok_or(VaultError::AuditorNotFound)?;
    config.auditors.remove(position);

    emit!(AuditorRemoved {
        auditor,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}

#[derive(Accounts)]
pub struct SetStrategyVault<'info> {
    #[account(
        mut,
        seeds = [FundConfig::SEED_PREFIX],
        bump = fund_config.bump,
        constraint = fund_config.is_admin(&admin.key()) @ VaultError::OnlyAvailableToAdmins
    )]
    pub fund_config: Account<'info, FundConfig>,

    #[account(
        token::mint = fund_config.asset_mint,
        token::authority = vault_authority,
    )]
    pub strategy_vault: Account<'info, TokenAccount>,

    /// CHECK: PDA signing for all vault token operations
    #[account(
        seeds = [FundConfig::VAULT_AUTHORITY_SEED],
        bump = fund_config.vault_authority_bump
    )]
    pub vault_authority: UncheckedAccount<'info>,

    pub admin: Signer<'info>,
}

pub fn set_strategy_vault(ctx: Context<SetStrategyVault>) -> Result<()> {
    let clock = Clock::get()?;
    let config = &mut ctx.accounts.fund_config;
    config.strategy_vault = ctx.accounts.strategy_vault.key();

    emit!(StrategyVaultUpdated {
        strategy_vault: config.strategy_vault,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}

pub fn set_eligibility(
    ctx: Context<AdminUpdateConfig>,
    eligibility_mint: Pubkey,
    disable_checks: bool,
) -> Result<()> {
    let clock = Clock::get()?;
    let config = &mut ctx.accounts.fund_config;
    config.eligibility_mint = eligibility_mint;
    config.disable_eligibility_checks = disable_checks;

    emit!(EligibilityUpdated {
        eligibility_mint,
        disable_eligibility_checks: disable_checks,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}

// ==================== AUDITOR OPERATIONS ====================

#[derive(Accounts)]
pub struct AuditorUpdateState<'info> {
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

    pub auditor: Signer<'info>,
}

#[derive(Accounts)]
pub struct AuditorUpdateToggles<'info> {
    #[account(
        mut,
        seeds = [FundConfig::SEED_PREFIX],
        bump = fund_config.bump,
        constraint = fund_config.is_auditor(&auditor.key()) @ VaultError::OnlyAvailableToAuditors
    )]
    pub fund_config: Account<'info, FundConfig>,

    pub auditor: Signer<'info>,
}

pub fn set_deposit_limit(ctx: Context<AuditorUpdateState>, deposit_limit: u64) -> Result<()> {
    let clock = Clock::get()?;
    let state = &mut ctx.accounts.global_state;
    state.deposit_limit = deposit_limit;

    emit!(DepositLimitUpdated {
        cycle_index: state.cycle_index,
        deposit_limit,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}

pub fn set_fund_locking_timestamp(
    ctx: Context<AuditorUpdateState>,
    funding_lock_timestamp: i64,
) -> Result<()> {
    let clock = Clock::get()?;
    let state = &mut ctx.accounts.global_state;
    state.funding_lock_timestamp = funding_lock_timestamp;

    emit!(FundLockingTimestampUpdated {
        cycle_index: state.cycle_index,
        funding_lock_timestamp,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}

pub fn set_disable_funding(
    ctx: Context<AuditorUpdateToggles>,
    disable_deposit: bool,
    disable_withdraw: bool,
    disable_cancel_deposit: bool,
    disable_cancel_withdraw: bool,
) -> Result<()> {
    let clock = Clock::get()?;
    let config = &mut ctx.accounts.fund_config;
    config.disable_deposit = disable_deposit;
    config.disable_withdraw = disable_withdraw;
    config.disable_cancel_deposit = disable_cancel_deposit;
    config.disable_cancel_withdraw = disable_cancel_withdraw;

    emit!(FundingToggles {
        disable_deposit,
        disable_withdraw,
        disable_cancel_deposit,
        disable_cancel_withdraw,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}

/// Working-capital moves between the fund vault and the strategy vault.
/// These do not touch locked_assets - the request queue's assets and the
/// fund's working capital are separate pools inside the same account.
#[derive(Accounts)]
pub struct MoveStrategyFunds<'info> {
    #[account(
        seeds = [FundConfig::SEED_PREFIX],
        bump = fund_config.bump,
        constraint = fund_config.is_auditor(&auditor.key()) @ VaultError::OnlyAvailableToAuditors
    )]
    pub fund_config: Account<'info, FundConfig>,

    #[account(
        mut,
        address = fund_config.fund_vault,
    )]
    pub fund_vault: Account<'info, TokenAccount>,

    #[account(
        mut,
        address = fund_config.strategy_vault,
    )]
    pub strategy_vault: Account<'info, TokenAccount>,

    /// CHECK: PDA signing for all vault token operations
    #[account(
        seeds = [FundConfig::VAULT_AUTHORITY_SEED],
        bump = fund_config.vault_authority_bump
    )]
    pub vault_authority: UncheckedAccount<'info>,

    pub auditor: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

pub fn deposit_to_strategy(ctx: Context<MoveStrategyFunds>, amount: u64) -> Result<()> {
    let clock = Clock::get()?;
    require!(amount > 0, VaultError::ZeroAmount);

    let authority_seeds: &[&[u8]] = &[
        FundConfig::VAULT_AUTHORITY_SEED,
        &[ctx.accounts.fund_config.vault_authority_bump],
    ];
    token::transfer(
        CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            token::Transfer {
                from: ctx.accounts.fund_vault.to_account_info(),
                to: ctx.accounts.strategy_vault.to_account_info(),
                authority: ctx.accounts.vault_authority.to_account_info(),
            },
            &[authority_seeds],
        ),
        amount,
    )?;

    emit!(FundsMovedToStrategy {
        amount,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}

pub fn withdraw_from_strategy(ctx: Context<MoveStrategyFunds>, amount: u64) -> Result<()> {
    let clock = Clock::get()?;
    require!(amount > 0, VaultError::ZeroAmount);

    let authority_seeds: &[&[u8]] = &[
        FundConfig::VAULT_AUTHORITY_SEED,
        &[ctx.accounts.fund_config.vault_authority_bump],
    ];
    token::transfer(
        CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            token::Transfer {
                from: ctx.accounts.strategy_vault.to_account_info(),
                to: ctx.accounts.fund_vault.to_account_info(),
                authority: ctx.accounts.vault_authority.to_account_info(),
            },
            &[authority_seeds],
        ),
        amount,
    )?;

    emit!(FundsMovedFromStrategy {
        amount,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
