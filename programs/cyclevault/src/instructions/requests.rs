// programs/cyclevault/src/instructions/requests.rs
//
// Request ledger: deposits and withdrawals queue between cycle boundaries
// and are frozen the instant a transition occurs. Withdrawal shares are
// escrowed rather than burned so a cancel can hand them back.

use crate::errors::VaultError;
use crate::events::{DepositCanceled, DepositRequested, WithdrawalCanceled, WithdrawalRequested};
use crate::state::{FundConfig, GlobalState, InvestorLedger};
use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount};

/// Funding-window and toggle checks shared by the plain and the
/// claim-composed request paths
pub fn check_deposit_allowed(config: &FundConfig, state: &GlobalState, now: i64) -> Result<()> {
    require!(!state.fund_closed, VaultError::FundIsClosed);
    require!(!config.disable_deposit, VaultError::DepositDisabled);
    require!(
        now < state.funding_lock_timestamp,
        VaultError::FundingLocked
    );
    Ok(())
}

pub fn check_withdraw_allowed(config: &FundConfig, state: &GlobalState, now: i64) -> Result<()> {
    require!(!state.fund_closed, VaultError::FundIsClosed);
    require!(!config.disable_withdraw, VaultError::WithdrawDisabled);
    require!(
        now < state.funding_lock_timestamp,
        VaultError::FundingLocked
    );
    Ok(())
}

/// The external membership gate: the investor must hold at least one token
/// of the eligibility mint unless checks are disabled
pub fn check_eligibility(
    config: &FundConfig,
    investor: &Pubkey,
    eligibility_account: Option<&Account<TokenAccount>>,
) -> Result<()> {
    if config.disable_eligibility_checks {
        return Ok(());
    }
    let account = eligibility_account.ok_or(VaultError::NotEligible)?;
    require!(
        account.mint == config.eligibility_mint
            && account.owner == *investor
            && account.amount > 0,
        VaultError::NotEligible
    );
    Ok(())
}

/// Ledger-side deposit accounting; token movement stays with the caller
pub fn apply_deposit_request(
    ledger: &mut InvestorLedger,
    state: &mut GlobalState,
    assets: u64,
) -> Result<()> {
    require!(assets > 0, VaultError::ZeroAmount);
    require!(
        !ledger.has_stale_deposit(state.cycle_index),
        VaultError::ClaimPending
    );
    let locked = state
        .locked_assets
        .checked_add(assets)
        .ok_or(VaultError::MathOverflow)?;
    require!(locked <= state.deposit_limit, VaultError::ExceedDepositLimit);

    ledger.pending_deposit_assets = ledger
        .pending_deposit_assets
        .checked_add(assets)
        .ok_or(VaultError::MathOverflow)?;
    ledger.pending_deposit_cycle = state.cycle_index;
    state.locked_assets = locked;
    state.requested_deposits = state
        .requested_deposits
        .checked_add(assets)
        .ok_or(VaultError::MathOverflow)?;
    Ok(())
}

pub fn apply_withdraw_request(
    ledger: &mut InvestorLedger,
    state: &mut GlobalState,
    shares: u64,
) -> Result<()> {
    require!(shares > 0, VaultError::ZeroAmount);
    require!(
        !ledger.has_stale_withdrawal(state.cycle_index),
        VaultError::ClaimPending
    );

    ledger.pending_withdraw_shares = ledger
        .pending_withdraw_shares
        .checked_add(shares)
        .ok_or(VaultError::MathOverflow)?;
    ledger.pending_withdraw_cycle = state.cycle_index;
    state.requested_withdrawals = state
        .requested_withdrawals
        .checked_add(shares)
        .ok_or(VaultError::MathOverflow)?;
    Ok(())
}

// ==================== REQUEST DEPOSIT ====================

#[derive(Accounts)]
pub struct RequestDeposit<'info> {
    #[account(
        seeds = [FundConfig::SEED_PREFIX],
        bump = fund_config.bump,
    )]
    pub fund_config: Account<'info, FundConfig>,

    #[account(
        mut,
        seeds = [GlobalState::SEED_PREFIX],
        bump = global_state.bump,
    )]
    pub global_state: Account<'info, GlobalState>,

    #[account(
        init_if_needed,
        payer = investor,
        space = 8 + InvestorLedger::INIT_SPACE,
        seeds = [InvestorLedger::SEED_PREFIX, investor.key().as_ref()],
        bump
    )]
    pub investor_ledger: Account<'info, InvestorLedger>,

    #[account(
        mut,
        token::mint = fund_config.asset_mint,
        constraint = investor_asset_account.owner == investor.key() @ VaultError::NotEligible
    )]
    pub investor_asset_account: Account<'info, TokenAccount>,

    #[account(mut, address = fund_config.fund_vault)]
    pub fund_vault: Account<'info, TokenAccount>,

    /// Membership token account, required while eligibility checks are on
    pub eligibility_token_account: Option<Account<'info, TokenAccount>>,

    #[account(mut)]
    pub investor: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

pub fn request_deposit(ctx: Context<RequestDeposit>, assets: u64) -> Result<()> {
    let clock = Clock::get()?;
    let config = &ctx.accounts.fund_config;
    let state = &mut ctx.accounts.global_state;
    let ledger = &mut ctx.accounts.investor_ledger;

    check_deposit_allowed(config, state, clock.unix_timestamp)?;
    check_eligibility(
        config,
        &ctx.accounts.investor.key(),
        ctx.accounts.eligibility_token_account.as_ref(),
    )?;

    if ledger.investor == Pubkey::default() {
        ledger.investor = ctx.accounts.investor.key();
        ledger.bump = ctx.bumps.investor_ledger;
    }

    apply_deposit_request(ledger, state, assets)?;

    token::transfer(
        CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            token::Transfer {
                from: ctx.accounts.investor_asset_account.to_account_info(),
                to: ctx.accounts.fund_vault.to_account_info(),
                authority: ctx.accounts.investor.to_account_info(),
            },
        ),
        assets,
    )?;

    emit!(DepositRequested {
        caller: ctx.accounts.investor.key(),
        investor: ctx.accounts.investor.key(),
        cycle_index: state.cycle_index,
        assets,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}

// ==================== CANCEL DEPOSIT ====================

#[derive(Accounts)]
pub struct CancelDeposit<'info> {
    #[account(
        seeds = [FundConfig::SEED_PREFIX],
        bump = fund_config.bump,
    )]
    pub fund_config: Account<'info, FundConfig>,

    #[account(
        mut,
        seeds = [GlobalState::SEED_PREFIX],
        bump = global_state.bump,
    )]
    pub global_state: Account<'info, GlobalState>,

    #[account(
        mut,
        seeds = [InvestorLedger::SEED_PREFIX, investor.key().as_ref()],
        bump = investor_ledger.bump,
        constraint = investor_ledger.investor == investor.key() @ VaultError::NotEnoughDeposits
    )]
    pub investor_ledger: Account<'info, InvestorLedger>,

    #[account(
        mut,
        token::mint = fund_config.asset_mint,
        constraint = investor_asset_account.owner == investor.key() @ VaultError::NotEligible
    )]
    pub investor_asset_account: Account<'info, TokenAccount>,

    #[account(mut, address = fund_config.fund_vault)]
    pub fund_vault: Account<'info, TokenAccount>,

    /// CHECK: PDA signing for all vault token operations
    #[account(
        seeds = [FundConfig::VAULT_AUTHORITY_SEED],
        bump = fund_config.vault_authority_bump
    )]
    pub vault_authority: UncheckedAccount<'info>,

    pub investor: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

pub fn cancel_deposit(ctx: Context<CancelDeposit>, assets: u64) -> Result<()> {
    let clock = Clock::get()?;
    let config = &ctx.accounts.fund_config;
    let state = &mut ctx.accounts.global_state;
    let ledger = &mut ctx.accounts.investor_ledger;

    require!(!config.disable_cancel_deposit, VaultError::CancelDepositDisabled);
    require!(assets > 0, VaultError::ZeroAmount);

    // only the still-open cycle can be cancelled
    require!(
        ledger.pending_deposit_cycle == state.cycle_index
            && ledger.pending_deposit_assets >= assets,
        VaultError::NotEnoughDeposits
    );

    ledger.pending_deposit_assets -= assets;
    state.locked_assets = state
        .locked_assets
        .checked_sub(assets)
        .ok_or(VaultError::MathOverflow)?;
    state.requested_deposits = state
        .requested_deposits
        .checked_sub(assets)
        .ok_or(VaultError::MathOverflow)?;

    let authority_seeds: &[&[u8]] = &[
        FundConfig::VAULT_AUTHORITY_SEED,
        &[config.vault_authority_bump],
    ];
    token::transfer(
        CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            token::Transfer {
                from: ctx.accounts.fund_vault.to_account_info(),
                to: ctx.accounts.investor_asset_account.to_account_info(),
                authority: ctx.accounts.vault_authority.to_account_info(),
            },
            &[authority_seeds],
        ),
        assets,
    )?;

    emit!(DepositCanceled {
        investor: ctx.accounts.investor.key(),
        cycle_index: state.cycle_index,
        assets,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}

// ==================== REQUEST WITHDRAW ====================

#[derive(Accounts)]
pub struct RequestWithdraw<'info> {
    #[account(
        seeds = [FundConfig::SEED_PREFIX],
        bump = fund_config.bump,
    )]
    pub fund_config: Account<'info, FundConfig>,

    #[account(
        mut,
        seeds = [GlobalState::SEED_PREFIX],
        bump = global_state.bump,
    )]
    pub global_state: Account<'info, GlobalState>,

    #[account(
        init_if_needed,
        payer = caller,
        space = 8 + InvestorLedger::INIT_SPACE,
        seeds = [InvestorLedger::SEED_PREFIX, investor.key().as_ref()],
        bump
    )]
    pub investor_ledger: Account<'info, InvestorLedger>,

    /// CHECK: share holder; the caller may be the holder or a delegate
    /// approved on the holder's share account
    pub investor: UncheckedAccount<'info>,

    #[account(
        mut,
        token::mint = fund_config.share_mint,
        constraint = investor_share_account.owner == investor.key() @ VaultError::NotEnoughWithdrawals
    )]
    pub investor_share_account: Account<'info, TokenAccount>,

    #[account(mut, address = fund_config.share_escrow)]
    pub share_escrow: Account<'info, TokenAccount>,

    /// Holder, or approved spender consuming a delegate allowance
    #[account(mut)]
    pub caller: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

pub fn request_withdraw(ctx: Context<RequestWithdraw>, shares: u64) -> Result<()> {
    let clock = Clock::get()?;
    let config = &ctx.accounts.fund_config;
    let state = &mut ctx.accounts.global_state;
    let ledger = &mut ctx.accounts.investor_ledger;

    check_withdraw_allowed(config, state, clock.unix_timestamp)?;

    if ledger.investor == Pubkey::default() {
        ledger.investor = ctx.accounts.investor.key();
        ledger.bump = ctx.bumps.investor_ledger;
    }

    apply_withdraw_request(ledger, state, shares)?;

    // escrow the shares; the SPL token program enforces the delegate
    // allowance when the caller is not the holder
    token::transfer(
        CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            token::Transfer {
                from: ctx.accounts.investor_share_account.to_account_info(),
                to: ctx.accounts.share_escrow.to_account_info(),
                authority: ctx.accounts.caller.to_account_info(),
            },
        ),
        shares,
    )?;

    emit!(WithdrawalRequested {
        caller: ctx.accounts.caller.key(),
        investor: ctx.accounts.investor.key(),
        cycle_index: state.cycle_index,
        shares,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}

// ==================== CANCEL WITHDRAW ====================

#[derive(Accounts)]
pub struct CancelWithdraw<'info> {
    #[account(
        seeds = [FundConfig::SEED_PREFIX],
        bump = fund_config.bump,
    )]
    pub fund_config: Account<'info, FundConfig>,

    #[account(
        mut,
        seeds = [GlobalState::SEED_PREFIX],
        bump = global_state.bump,
    )]
    pub global_state: Account<'info, GlobalState>,

    #[account(
        mut,
        seeds = [InvestorLedger::SEED_PREFIX, investor.key().as_ref()],
        bump = investor_ledger.bump,
        constraint = investor_ledger.investor == investor.key() @ VaultError::NotEnoughWithdrawals
    )]
    pub investor_ledger: Account<'info, InvestorLedger>,

    #[account(
        mut,
        token::mint = fund_config.share_mint,
        constraint = investor_share_account.owner == investor.key() @ VaultError::NotEnoughWithdrawals
    )]
    pub investor_share_account: Account<'info, TokenAccount>,

    #[account(mut, address = fund_config.share_escrow)]
    pub share_escrow: Account<'info, TokenAccount>,

    /// CHECK: PDA signing for all vault token operations
    #[account(
        seeds = [FundConfig::VAULT_AUTHORITY_SEED],
        bump = fund_config.vault_authority_bump
    )]
    pub vault_authority: UncheckedAccount<'info>,

    pub investor: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

pub fn cancel_withdraw(ctx: Context<CancelWithdraw>, shares: u64) -> Result<()> {
    let clock = Clock::get()?;
    let config = &ctx.accounts.fund_config;
    let state = &mut ctx.accounts.global_state;
    let ledger = &mut ctx.accounts.investor_ledger;

    require!(
        !config.disable_cancel_withdraw,
        VaultError::CancelWithdrawDisabled
    );
    require!(shares > 0, VaultError::ZeroAmount);
    require!(
        ledger.pending_withdraw_cycle == state.cycle_index
            && ledger.pending_withdraw_shares >= shares,
        VaultError::NotEnoughWithdrawals
    );

    ledger.pending_withdraw_shares -= shares;
    state.requested_withdrawals = state
        .requested_withdrawals
        .checked_sub(shares)
        .ok_or(VaultError::MathOverflow)?;

    let authority_seeds: &[&[u8]] = &[
        FundConfig::VAULT_AUTHORITY_SEED,
        &[config.vault_authority_bump],
    ];
    token::transfer(
        CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            token::Transfer {
                from: ctx.accounts.share_escrow.to_account_info(),
                to: ctx.accounts.investor_share_account.to_account_info(),
                authority: ctx.accounts.vault_authority.to_account_info(),
            },
            &[authority_seeds],
        ),
        shares,
    )?;

    emit!(WithdrawalCanceled {
        investor: ctx.accounts.investor.key(),
        cycle_index: state.cycle_index,
        shares,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}

// ==================== UNIT TESTS ====================
