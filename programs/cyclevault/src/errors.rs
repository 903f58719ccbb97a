// programs/cyclevault/src/errors.rs

use anchor_lang::prelude::*;

#[error_code]
pub enum VaultError {
    #[msg("Only available to admins")]
    OnlyAvailableToAdmins,

    #[msg("Only available to auditors")]
    OnlyAvailableToAuditors,

    #[msg("Incorrect cycle index")]
    IncorrectCycleIndex,

    #[msg("Incorrect cycle start timestamp")]
    IncorrectCycleStartTimestamp,

    #[msg("Fund is closed")]
    FundIsClosed,

    #[msg("Fund is not closed")]
    FundIsNotClosed,

    #[msg("Funding is locked until the next cycle")]
    FundingLocked,

    #[msg("A request from a closed cycle must be claimed first")]
    ClaimPending,

    #[msg("Deposit limit exceeded")]
    ExceedDepositLimit,

    #[msg("No deposits to price against")]
    NoDeposits,

    #[msg("Withdrawals drain the value needed to price queued deposits")]
    ExcessiveWithdrawal,

    #[msg("Invalid fee rate configuration")]
    InvalidFeeRate,

    #[msg("Not enough deposits in the open cycle to cancel")]
    NotEnoughDeposits,

    #[msg("Not enough withdrawals in the open cycle to cancel")]
    NotEnoughWithdrawals,

    #[msg("Amount must be greater than zero")]
    ZeroAmount,

    #[msg("Deposits are disabled")]
    DepositDisabled,

    #[msg("Withdrawals are disabled")]
    WithdrawDisabled,

    #[msg("Deposit cancellation is disabled")]
    CancelDepositDisabled,

    #[msg("Withdrawal cancellation is disabled")]
    CancelWithdrawDisabled,

    #[msg("Receiver does not pass the eligibility gate")]
    NotEligible,

    #[msg("Cycle state account does not match the pending request")]
    IncorrectCycleState,

    #[msg("Too many auditors")]
    TooManyAuditors,

    #[msg("Auditor already registered")]
    AuditorAlreadyAdded,

    #[msg("Auditor not found")]
    AuditorNotFound,

    #[msg("Arithmetic overflow")]
    MathOverflow,
}
