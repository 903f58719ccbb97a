// crates/cyclevault-history/src/lib.rs
//
// Offline historical reconstructor for cyclevault funds. Replays an
// ordered program event log and rebuilds per-investor holdings, cost
// basis and fee attribution cycle by cycle. Runs entirely off-chain
// against archived logs; the chain is never queried.

use anchor_lang::prelude::Pubkey;
use serde::Serialize;
use thiserror::Error;

pub mod replay;

pub use replay::Reconstructor;

// Same year length and ppm denominator the program accrues fees with
pub use cyclevault::state::{FEE_DENOMINATOR, SECONDS_IN_A_YEAR};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("cycle record {got} arrived while replaying cycle {expected}")]
    CycleOutOfOrder { expected: u32, got: u32 },

    #[error("cancel of {amount} exceeds the pending request of {investor}")]
    CancelExceedsPending { investor: Pubkey, amount: u64 },

    #[error("transfer of {amount} shares exceeds the balance of {from}")]
    TransferExceedsBalance { from: Pubkey, amount: u64 },

    #[error("withdrawal of {shares} shares exceeds the balance of {investor}")]
    WithdrawalExceedsBalance { investor: Pubkey, shares: u64 },

    #[error("cycle {cycle_index} records no requested deposits but the log queued some")]
    MissingDepositCohort { cycle_index: u32 },

    #[error("cycle {cycle_index} records no requested withdrawals but the log queued some")]
    MissingWithdrawalCohort { cycle_index: u32 },

    #[error("arithmetic overflow while replaying cycle {cycle_index}")]
    Overflow { cycle_index: u32 },
}

/// One entry of the ordered event log. Mirrors the program's emitted
/// events plus raw share-token transfers pulled from the ledger, which
/// the program itself never sees.
#[derive(Debug, Clone)]
pub enum VaultLogEvent {
    DepositRequested {
        investor: Pubkey,
        assets: u64,
    },
    DepositCanceled {
        investor: Pubkey,
        assets: u64,
    },
    WithdrawalRequested {
        investor: Pubkey,
        shares: u64,
    },
    WithdrawalCanceled {
        investor: Pubkey,
        shares: u64,
    },
    /// SPL transfer of the share token between wallets. Legs touching
    /// the escrow or mint show up here too and are filtered out during
    /// replay.
    ShareTransfer {
        from: Pubkey,
        to: Pubkey,
        amount: u64,
    },
    CycleClosed(CycleRecord),
}

/// The data of one EnterNextCycle event, as archived from the log
#[derive(Debug, Clone)]
pub struct CycleRecord {
    pub cycle_index: u32,

    /// NAV the auditor reported for the transition; holdings are valued
    /// at fund_value / price_denominator, the gross pre-fee price
    pub fund_value: u64,

    /// Share price settled by the transition, assets per share. The
    /// denominator is the share supply the cycle closed with, except on
    /// a genesis transition (nobody held shares going in), where the
    /// pair is the fund's configured initial price. Replay values
    /// genesis-cycle positions at this pair rather than fund_value over
    /// the denominator, since a seeded fund_value with no supply would
    /// price against a unit denominator.
    pub price_numerator: u64,
    pub price_denominator: u64,

    /// Cohort totals: the uniform conversion ratios of the cycle
    pub requested_deposits: u64,
    pub converted_deposits: u64,
    pub requested_withdrawals: u64,
    /// Net of exit fees, same figure the claim path prices from
    pub converted_withdrawals: u64,

    /// Combined platform + manager rates in force for this cycle (ppm)
    pub entry_fee: u32,
    pub performance_fee: u32,

    /// Fee totals the pool actually paid at this transition, combined
    /// platform + manager, straight from the event's fee breakdown
    pub pooled_management_fee: u64,
    pub pooled_performance_fee: u64,
}

impl CycleRecord {
    /// Build the record from an archived transition event plus the fee
    /// schedule in force, taken from the most recent FeeConfigChanged
    /// event at or before this transition
    pub fn from_event(
        event: &cyclevault::events::EnterNextCycle,
        rates: &cyclevault::state::FeeRates,
    ) -> Self {
        Self {
            cycle_index: event.cycle_index,
            fund_value: event.fund_value,
            price_numerator: event.price_numerator,
            price_denominator: event.price_denominator,
            requested_deposits: event.requested_deposits,
            converted_deposits: event.converted_deposits,
            requested_withdrawals: event.requested_withdrawals,
            converted_withdrawals: event.converted_withdrawals,
            entry_fee: rates.platform_entry_fee + rates.manager_entry_fee,
            performance_fee: rates.platform_performance_fee + rates.manager_performance_fee,
            pooled_management_fee: event.fees.platform_management + event.fees.manager_management,
            pooled_performance_fee: event.fees.platform_performance
                + event.fees.manager_performance,
        }
    }
}

/// Rebuilt holdings of one investor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserLedger {
    /// Free share balance (escrowed withdrawal shares excluded)
    pub shares: u64,

    /// Assets put in net of entry fees, reduced pro-rata on outflows
    pub cost_basis: u64,

    /// High-water mark: largest profit over cost basis seen at any
    /// cycle boundary, used to attribute performance fees
    pub max_profit: u64,
}

/// Per-investor row of a cycle report
#[derive(Debug, Clone, Serialize)]
pub struct UserReport {
    pub investor: String,
    pub shares: u64,
    pub cost_basis: u64,
    /// Holdings valued at the reported NAV
    pub value: u64,
    /// Performance fee an individual high-water mark would have charged
    pub hwm_fee: u64,
    pub deposited: u64,
    pub withdrawn: u64,
}

/// Reconstruction of one closed cycle: who held what, plus the pooled
/// fee totals next to what a per-investor high-water mark would have
/// charged instead
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_index: u32,
    pub fund_value: u64,
    pub price_numerator: u64,
    pub price_denominator: u64,
    pub pooled_management_fee: u64,
    pub pooled_performance_fee: u64,
    pub simulated_hwm_fee: u64,
    pub rows: Vec<UserReport>,
}
