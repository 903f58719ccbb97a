// programs/cyclevault/src/instructions/claims.rs
//
// Claim resolver: a pending request whose cycle has closed is realized
// lazily into owed shares/assets using that cycle's uniform conversion
// ratio, then paid out. Claims with nothing pending are no-ops, so
// repeated calls are idempotent.

use crate::errors::VaultError;
use crate::events::{
    AssetsClaimed, DepositRequested, PositionClosed, SharesClaimed, WithdrawalRequested,
};
use crate::fees::{mul_div, ppm_fee};
use crate::instructions::requests::{
    apply_deposit_request, apply_withdraw_request, check_deposit_allowed, check_eligibility,
    check_withdraw_allowed,
};
use crate::state::{CycleState, FeeConfig, FundConfig, GlobalState, InvestorLedger};
use anchor_lang::prelude::*;
use anchor_spl::token::{self, Mint, Token, TokenAccount};

/// Fold a closed-cycle deposit request into owed shares. The cycle's
/// ratio is applied as pending * converted / requested so rounding stays
/// uniform across the whole cohort.
pub fn resolve_pending_deposit(
    ledger: &mut InvestorLedger,
    current_cycle: u32,
    cycle_state: Option<&CycleState>,
) -> Result<()> {
    if ledger.pending_deposit_assets == 0 || ledger.pending_deposit_cycle == current_cycle {
        return Ok(());
    }
    let cycle = cycle_state.ok_or(VaultError::IncorrectCycleState)?;
    require!(
        cycle.cycle_index == ledger.pending_deposit_cycle,
        VaultError::IncorrectCycleState
    );

    let shares = cycle
        .convert_deposit(ledger.pending_deposit_assets)
        .ok_or(VaultError::MathOverflow)?;
    ledger.owed_shares = ledger
        .owed_shares
        .checked_add(shares)
        .ok_or(VaultError::MathOverflow)?;
    ledger.pending_deposit_assets = 0;
    Ok(())
}

/// Fold a closed-cycle withdrawal request into owed assets
pub fn resolve_pending_withdrawal(
    ledger: &mut InvestorLedger,
    current_cycle: u32,
    cycle_state: Option<&CycleState>,
) -> Result<()> {
    if ledger.pending_withdraw_shares == 0 || ledger.pending_withdraw_cycle == current_cycle {
        return Ok(());
    }
    let cycle = cycle_state.ok_or(VaultError::IncorrectCycleState)?;
    require!(
        cycle.cycle_index == ledger.pending_withdraw_cycle,
        VaultError::IncorrectCycleState
    );

    let assets = cycle
        .convert_withdrawal(ledger.pending_withdraw_shares)
        .ok_or(VaultError::MathOverflow)?;
    ledger.owed_assets = ledger
        .owed_assets
        .checked_add(assets)
        .ok_or(VaultError::MathOverflow)?;
    ledger.pending_withdraw_shares = 0;
    Ok(())
}

// ==================== CLAIM OWED SHARES ====================

#[derive(Accounts)]
pub struct ClaimOwedShares<'info> {
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
        mut,
        seeds = [InvestorLedger::SEED_PREFIX, investor.key().as_ref()],
        bump = investor_ledger.bump,
    )]
    pub investor_ledger: Account<'info, InvestorLedger>,

    /// Snapshot of the cycle the pending deposit belongs to; only needed
    /// when such a request exists
    pub deposit_cycle_state: Option<Account<'info, CycleState>>,

    /// CHECK: the investor the ledger belongs to; anyone may trigger the
    /// claim, the payout goes to the investor's account
    pub investor: UncheckedAccount<'info>,

    #[account(
        mut,
        token::mint = fund_config.share_mint,
        constraint = investor_share_account.owner == investor.key() @ VaultError::NotEligible
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

    pub token_program: Program<'info, Token>,
}

pub fn claim_owed_shares(ctx: Context<ClaimOwedShares>) -> Result<u64> {
    let clock = Clock::get()?;
    let ledger = &mut ctx.accounts.investor_ledger;

    resolve_pending_deposit(
        ledger,
        ctx.accounts.global_state.cycle_index,
        ctx.accounts.deposit_cycle_state.as_deref(),
    )?;

    let shares = ledger.owed_shares;
    if shares == 0 {
        return Ok(0);
    }
    ledger.owed_shares = 0;

    let authority_seeds: &[&[u8]] = &[
        FundConfig::VAULT_AUTHORITY_SEED,
        &[ctx.accounts.fund_config.vault_authority_bump],
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

    emit!(SharesClaimed {
        investor: ctx.accounts.investor.key(),
        shares,
        timestamp: clock.unix_timestamp,
    });

    Ok(shares)
}

// ==================== CLAIM OWED ASSETS ====================

#[derive(Accounts)]
pub struct ClaimOwedAssets<'info> {
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
    )]
    pub investor_ledger: Account<'info, InvestorLedger>,

    /// Snapshot of the cycle the pending withdrawal belongs to
    pub withdraw_cycle_state: Option<Account<'info, CycleState>>,

    /// CHECK: the investor the ledger belongs to
    pub investor: UncheckedAccount<'info>,

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

    pub token_program: Program<'info, Token>,
}

pub fn claim_owed_assets(ctx: Context<ClaimOwedAssets>) -> Result<u64> {
    let clock = Clock::get()?;
    let state = &mut ctx.accounts.global_state;
    let ledger = &mut ctx.accounts.investor_ledger;

    resolve_pending_withdrawal(
        ledger,
        state.cycle_index,
        ctx.accounts.withdraw_cycle_state.as_deref(),
    )?;

    let assets = ledger.owed_assets;
    if assets == 0 {
        return Ok(0);
    }
    ledger.owed_assets = 0;
    state.locked_assets = state
        .locked_assets
        .checked_sub(assets)
        .ok_or(VaultError::MathOverflow)?;

    let authority_seeds: &[&[u8]] = &[
        FundConfig::VAULT_AUTHORITY_SEED,
        &[ctx.accounts.fund_config.vault_authority_bump],
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

    emit!(AssetsClaimed {
        investor: ctx.accounts.investor.key(),
        assets,
        timestamp: clock.unix_timestamp,
    });

    Ok(assets)
}

// ==================== CLAIM OWED FUNDS (both sides) ====================

#[derive(Accounts)]
pub struct ClaimOwedFunds<'info> {
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
    )]
    pub investor_ledger: Account<'info, InvestorLedger>,

    pub deposit_cycle_state: Option<Account<'info, CycleState>>,
    pub withdraw_cycle_state: Option<Account<'info, CycleState>>,

    /// CHECK: the investor the ledger belongs to
    pub investor: UncheckedAccount<'info>,

    #[account(
        mut,
        token::mint = fund_config.share_mint,
        constraint = investor_share_account.owner == investor.key() @ VaultError::NotEligible
    )]
    pub investor_share_account: Account<'info, TokenAccount>,

    #[account(
        mut,
        token::mint = fund_config.asset_mint,
        constraint = investor_asset_account.owner == investor.key() @ VaultError::NotEligible
    )]
    pub investor_asset_account: Account<'info, TokenAccount>,

    #[account(mut, address = fund_config.share_escrow)]
    pub share_escrow: Account<'info, TokenAccount>,

    #[account(mut, address = fund_config.fund_vault)]
    pub fund_vault: Account<'info, TokenAccount>,

    /// CHECK: PDA signing for all vault token operations
    #[account(
        seeds = [FundConfig::VAULT_AUTHORITY_SEED],
        bump = fund_config.vault_authority_bump
    )]
    pub vault_authority: UncheckedAccount<'info>,

    pub token_program: Program<'info, Token>,
}

/// Shares and assets claimed in one call
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default)]
pub struct ClaimedFunds {
    pub shares: u64,
    pub assets: u64,
}

pub fn claim_owed_funds(ctx: Context<ClaimOwedFunds>) -> Result<ClaimedFunds> {
    let clock = Clock::get()?;
    let state = &mut ctx.accounts.global_state;
    let ledger = &mut ctx.accounts.investor_ledger;

    resolve_pending_deposit(
        ledger,
        state.cycle_index,
        ctx.accounts.deposit_cycle_state.as_deref(),
    )?;
    resolve_pending_withdrawal(
        ledger,
        state.cycle_index,
        ctx.accounts.withdraw_cycle_state.as_deref(),
    )?;

    let claimed = ClaimedFunds {
        shares: ledger.owed_shares,
        assets: ledger.owed_assets,
    };
    ledger.owed_shares = 0;
    ledger.owed_assets = 0;
    if claimed.assets > 0 {
        state.locked_assets = state
            .locked_assets
            .checked_sub(claimed.assets)
            .ok_or(VaultError::MathOverflow)?;
    }

    let authority_seeds: &[&[u8]] = &[
        FundConfig::VAULT_AUTHORITY_SEED,
        &[ctx.accounts.fund_config.vault_authority_bump],
    ];
    let signer_seeds: &[&[&[u8]]] = &[authority_seeds];

    if claimed.shares > 0 {
        token::transfer(
            CpiContext::new_with_signer(
                ctx.accounts.token_program.to_account_info(),
                token::Transfer {
                    from: ctx.accounts.share_escrow.to_account_info(),
                    to: ctx.accounts.investor_share_account.to_account_info(),
                    authority: ctx.accounts.vault_authority.to_account_info(),
                },
                signer_seeds,
            ),
            claimed.shares,
        )?;
        emit!(SharesClaimed {
            investor: ctx.accounts.investor.key(),
            shares: claimed.shares,
            timestamp: clock.unix_timestamp,
        });
    }
    if claimed.assets > 0 {
        token::transfer(
            CpiContext::new_with_signer(
                ctx.accounts.token_program.to_account_info(),
                token::Transfer {
                    from: ctx.accounts.fund_vault.to_account_info(),
                    to: ctx.accounts.investor_asset_account.to_account_info(),
                    authority: ctx.accounts.vault_authority.to_account_info(),
                },
                signer_seeds,
            ),
            claimed.assets,
        )?;
        emit!(AssetsClaimed {
            investor: ctx.accounts.investor.key(),
            assets: claimed.assets,
            timestamp: clock.unix_timestamp,
        });
    }

    Ok(claimed)
}

// ==================== CLAIM AND REQUEST DEPOSIT ====================

#[derive(Accounts)]
pub struct ClaimAndRequestDeposit<'info> {
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

    pub withdraw_cycle_state: Option<Account<'info, CycleState>>,

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

    /// CHECK: PDA signing for all vault token operations
    #[account(
        seeds = [FundConfig::VAULT_AUTHORITY_SEED],
        bump = fund_config.vault_authority_bump
    )]
    pub vault_authority: UncheckedAccount<'info>,

    #[account(mut)]
    pub investor: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

/// Claim matured withdrawal proceeds and file a fresh deposit in one call.
/// The claim always lands before the deposit-limit check.
pub fn claim_and_request_deposit(ctx: Context<ClaimAndRequestDeposit>, assets: u64) -> Result<()> {
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

    resolve_pending_withdrawal(
        ledger,
        state.cycle_index,
        ctx.accounts.withdraw_cycle_state.as_deref(),
    )?;

    let authority_seeds: &[&[u8]] = &[
        FundConfig::VAULT_AUTHORITY_SEED,
        &[config.vault_authority_bump],
    ];

    let claimed = ledger.owed_assets;
    if claimed > 0 {
        ledger.owed_assets = 0;
        state.locked_assets = state
            .locked_assets
            .checked_sub(claimed)
            .ok_or(VaultError::MathOverflow)?;
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
            claimed,
        )?;
        emit!(AssetsClaimed {
            investor: ctx.accounts.investor.key(),
            assets: claimed,
            timestamp: clock.unix_timestamp,
        });
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

// ==================== CLAIM AND REQUEST WITHDRAW ====================

#[derive(Accounts)]
pub struct ClaimAndRequestWithdraw<'info> {
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

    pub deposit_cycle_state: Option<Account<'info, CycleState>>,

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

/// Claim matured deposit shares and queue a withdrawal of them in one call
pub fn claim_and_request_withdraw(
    ctx: Context<ClaimAndRequestWithdraw>,
    shares: u64,
) -> Result<()> {
    let clock = Clock::get()?;
    let config = &ctx.accounts.fund_config;
    let state = &mut ctx.accounts.global_state;
    let ledger = &mut ctx.accounts.investor_ledger;

    check_withdraw_allowed(config, state, clock.unix_timestamp)?;

    resolve_pending_deposit(
        ledger,
        state.cycle_index,
        ctx.accounts.deposit_cycle_state.as_deref(),
    )?;

    let authority_seeds: &[&[u8]] = &[
        FundConfig::VAULT_AUTHORITY_SEED,
        &[config.vault_authority_bump],
    ];

    let claimed = ledger.owed_shares;
    if claimed > 0 {
        ledger.owed_shares = 0;
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
            claimed,
        )?;
        emit!(SharesClaimed {
            investor: ctx.accounts.investor.key(),
            shares: claimed,
            timestamp: clock.unix_timestamp,
        });
    }

    apply_withdraw_request(ledger, state, shares)?;

    token::transfer(
        CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            token::Transfer {
                from: ctx.accounts.investor_share_account.to_account_info(),
                to: ctx.accounts.share_escrow.to_account_info(),
                authority: ctx.accounts.investor.to_account_info(),
            },
        ),
        shares,
    )?;

    emit!(WithdrawalRequested {
        caller: ctx.accounts.investor.key(),
        investor: ctx.accounts.investor.key(),
        cycle_index: state.cycle_index,
        shares,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}

// ==================== CLOSE POSITION ====================

#[derive(Accounts)]
pub struct ClosePosition<'info> {
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
        seeds = [FeeConfig::SEED_PREFIX],
        bump = fee_config.bump,
    )]
    pub fee_config: Account<'info, FeeConfig>,

    #[account(
        mut,
        seeds = [InvestorLedger::SEED_PREFIX, investor.key().as_ref()],
        bump = investor_ledger.bump,
    )]
    pub investor_ledger: Account<'info, InvestorLedger>,

    /// CHECK: share holder; the caller may be the holder or a delegate
    /// approved on the holder's share account
    pub investor: UncheckedAccount<'info>,

    #[account(
        mut,
        token::mint = fund_config.share_mint,
        constraint = investor_share_account.owner == investor.key() @ VaultError::NotEligible
    )]
    pub investor_share_account: Account<'info, TokenAccount>,

    #[account(mut, address = fund_config.share_mint)]
    pub share_mint: Account<'info, Mint>,

    #[account(mut, address = fund_config.fund_vault)]
    pub fund_vault: Account<'info, TokenAccount>,

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

    /// Holder, or approved spender consuming a delegate allowance
    pub caller: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

/// Direct liquidation once the fund is closed: burns shares at the price
/// frozen at closure, minus exit fees, independent of the request queue.
/// The proceeds land in owed assets and are paid out by a claim.
pub fn close_position(ctx: Context<ClosePosition>, shares: u64) -> Result<u64> {
    let clock = Clock::get()?;
    let state = &mut ctx.accounts.global_state;
    let fee_config = &ctx.accounts.fee_config;
    let ledger = &mut ctx.accounts.investor_ledger;

    require!(state.fund_closed, VaultError::FundIsNotClosed);
    require!(shares > 0, VaultError::ZeroAmount);

    let assets = mul_div(
        shares,
        state.closure_price_numerator,
        state.closure_price_denominator,
    )?;
    let platform_fee = ppm_fee(assets, fee_config.platform_exit_fee)?;
    let manager_fee = ppm_fee(assets, fee_config.manager_exit_fee)?;
    let payable = assets
        .checked_sub(platform_fee)
        .and_then(|v| v.checked_sub(manager_fee))
        .ok_or(VaultError::MathOverflow)?;

    // burn first; the SPL token program enforces ownership or a delegate
    // allowance for the caller
    token::burn(
        CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            token::Burn {
                mint: ctx.accounts.share_mint.to_account_info(),
                from: ctx.accounts.investor_share_account.to_account_info(),
                authority: ctx.accounts.caller.to_account_info(),
            },
        ),
        shares,
    )?;

    let authority_seeds: &[&[u8]] = &[
        FundConfig::VAULT_AUTHORITY_SEED,
        &[ctx.accounts.fund_config.vault_authority_bump],
    ];
    let signer_seeds: &[&[&[u8]]] = &[authority_seeds];
    if platform_fee > 0 {
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
            platform_fee,
        )?;
    }
    if manager_fee > 0 {
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
            manager_fee,
        )?;
    }

    // fees left the locked pool; the payable remainder stays locked until
    // claimed
    state.locked_assets = state
        .locked_assets
        .checked_sub(platform_fee)
        .and_then(|v| v.checked_sub(manager_fee))
        .ok_or(VaultError::MathOverflow)?;
    ledger.owed_assets = ledger
        .owed_assets
        .checked_add(payable)
        .ok_or(VaultError::MathOverflow)?;

    emit!(PositionClosed {
        caller: ctx.accounts.caller.key(),
        investor: ctx.accounts.investor.key(),
        shares,
        assets: payable,
        timestamp: clock.unix_timestamp,
    });

    Ok(payable)
}

// ==================== CLOSE POSITION AND CLAIM ====================

#[derive(Accounts)]
pub struct ClosePositionAndClaim<'info> {
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
        seeds = [FeeConfig::SEED_PREFIX],
        bump = fee_config.bump,
    )]
    pub fee_config: Account<'info, FeeConfig>,

    #[account(
        mut,
        seeds = [InvestorLedger::SEED_PREFIX, investor.key().as_ref()],
        bump = investor_ledger.bump,
    )]
    pub investor_ledger: Account<'info, InvestorLedger>,

    pub withdraw_cycle_state: Option<Account<'info, CycleState>>,

    /// CHECK: share holder
    pub investor: UncheckedAccount<'info>,

    #[account(
        mut,
        token::mint = fund_config.share_mint,
        constraint = investor_share_account.owner == investor.key() @ VaultError::NotEligible
    )]
    pub investor_share_account: Account<'info, TokenAccount>,

    #[account(
        mut,
        token::mint = fund_config.asset_mint,
        constraint = investor_asset_account.owner == investor.key() @ VaultError::NotEligible
    )]
    pub investor_asset_account: Account<'info, TokenAccount>,

    #[account(mut, address = fund_config.share_mint)]
    pub share_mint: Account<'info, Mint>,

    #[account(mut, address = fund_config.fund_vault)]
    pub fund_vault: Account<'info, TokenAccount>,

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

    pub caller: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

/// Close the investor's entire share balance and pay out all owed assets,
/// including proceeds from earlier withdrawals, in one call
pub fn close_position_and_claim(ctx: Context<ClosePositionAndClaim>) -> Result<u64> {
    let clock = Clock::get()?;
    let state = &mut ctx.accounts.global_state;
    let fee_config = &ctx.accounts.fee_config;
    let ledger = &mut ctx.accounts.investor_ledger;

    require!(state.fund_closed, VaultError::FundIsNotClosed);

    resolve_pending_withdrawal(
        ledger,
        state.cycle_index,
        ctx.accounts.withdraw_cycle_state.as_deref(),
    )?;

    let authority_seeds: &[&[u8]] = &[
        FundConfig::VAULT_AUTHORITY_SEED,
        &[ctx.accounts.fund_config.vault_authority_bump],
    ];
    let signer_seeds: &[&[&[u8]]] = &[authority_seeds];

    let shares = ctx.accounts.investor_share_account.amount;
    if shares > 0 {
        let assets = mul_div(
            shares,
            state.closure_price_numerator,
            state.closure_price_denominator,
        )?;
        let platform_fee = ppm_fee(assets, fee_config.platform_exit_fee)?;
        let manager_fee = ppm_fee(assets, fee_config.manager_exit_fee)?;
        let payable = assets
            .checked_sub(platform_fee)
            .and_then(|v| v.checked_sub(manager_fee))
            .ok_or(VaultError::MathOverflow)?;

        token::burn(
            CpiContext::new(
                ctx.accounts.token_program.to_account_info(),
                token::Burn {
                    mint: ctx.accounts.share_mint.to_account_info(),
                    from: ctx.accounts.investor_share_account.to_account_info(),
                    authority: ctx.accounts.caller.to_account_info(),
                },
            ),
            shares,
        )?;

        if platform_fee > 0 {
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
                platform_fee,
            )?;
        }
        if manager_fee > 0 {
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
                manager_fee,
            )?;
        }

        state.locked_assets = state
            .locked_assets
            .checked_sub(platform_fee)
            .and_then(|v| v.checked_sub(manager_fee))
            .ok_or(VaultError::MathOverflow)?;
        ledger.owed_assets = ledger
            .owed_assets
            .checked_add(payable)
            .ok_or(VaultError::MathOverflow)?;

        emit!(PositionClosed {
            caller: ctx.accounts.caller.key(),
            investor: ctx.accounts.investor.key(),
            shares,
            assets: payable,
            timestamp: clock.unix_timestamp,
        });
    }

    let assets = ledger.owed_assets;
    if assets > 0 {
        ledger.owed_assets = 0;
        state.locked_assets = state
            .locked_assets
            .checked_sub(assets)
            .ok_or(VaultError::MathOverflow)?;
        token::transfer(
            CpiContext::new_with_signer(
                ctx.accounts.token_program.to_account_info(),
                token::Transfer {
                    from: ctx.accounts.fund_vault.to_account_info(),
                    to: ctx.accounts.investor_asset_account.to_account_info(),
                    authority: ctx.accounts.vault_authority.to_account_info(),
                },
                signer_seeds,
            ),
            assets,
        )?;
        emit!(AssetsClaimed {
            investor: ctx.accounts.investor.key(),
            assets,
            timestamp: clock.unix_timestamp,
        });
    }

    Ok(assets)
}

// ==================== UNIT TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_with(pending_deposit: u64, deposit_cycle: u32) -> InvestorLedger {
        InvestorLedger {
            investor: Pubkey::new_unique(),
            pending_deposit_assets: pending_deposit,
            pending_deposit_cycle: deposit_cycle,
            pending_withdraw_shares: 0,
            pending_withdraw_cycle: 0,
            owed_shares: 0,
            owed_assets: 0,
            bump: 255,
        }
    }

    fn cycle_snapshot() -> CycleState {
        CycleState {
            cycle_index: 0,
            start_timestamp: 0,
            total_fund_value: 0,
            fund_value_after_requests: 299_700_000_000,
            requested_deposits: 300_000_000_000,
            converted_deposits: 2_997_000_000,
            requested_withdrawals: 1_000_000_000,
            converted_withdrawals: 99_800_000_000,
            bump: 255,
        }
    }

    #[test]
    fn test_resolve_deposit_after_cycle_close() {
        let mut ledger = ledger_with(100_000_000_000, 0);
        let cycle = cycle_snapshot();

        resolve_pending_deposit(&mut ledger, 1, Some(&cycle)).unwrap();
        assert_eq!(ledger.owed_shares, 999_000_000);
        assert_eq!(ledger.pending_deposit_assets, 0);

        // second resolution is a no-op
        resolve_pending_deposit(&mut ledger, 1, Some(&cycle)).unwrap();
        assert_eq!(ledger.owed_shares, 999_000_000);
    }

    #[test]
    fn test_resolve_deposit_cycle_still_open() {
        let mut ledger = ledger_with(100, 1);
        // same cycle index: request not priced yet, nothing changes
        resolve_pending_deposit(&mut ledger, 1, None).unwrap();
        assert_eq!(ledger.pending_deposit_assets, 100);
        assert_eq!(ledger.owed_shares, 0);
    }

    #[test]
    fn test_resolve_deposit_requires_matching_snapshot() {
        let mut ledger = ledger_with(100, 0);
        let mut cycle = cycle_snapshot();
        cycle.cycle_index = 5;

        assert!(resolve_pending_deposit(&mut ledger, 1, Some(&cycle)).is_err());
        assert!(resolve_pending_deposit(&mut ledger, 1, None).is_err());
    }

    #[test]
    fn test_resolve_withdrawal_uniform_ratio() {
        let mut ledger = ledger_with(0, 0);
        ledger.pending_withdraw_shares = 250_000_000;
        ledger.pending_withdraw_cycle = 0;
        let cycle = cycle_snapshot();

        resolve_pending_withdrawal(&mut ledger, 2, Some(&cycle)).unwrap();
        // 0.25 of the cohort's net payout pool
        assert_eq!(ledger.owed_assets, 24_950_000_000);
        assert_eq!(ledger.pending_withdraw_shares, 0);
    }
}
