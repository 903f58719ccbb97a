// programs/cyclevault/src/fees.rs
//
// Pure cycle pricing and fee calculator. The multiply-then-divide order in
// here is contractual: reassociating any step changes floor-rounding results
// and therefore settlement amounts. Both preview_next_cycle and
// enter_next_cycle run this exact code, which is what makes the preview
// bit-identical to the mutating call.

use crate::errors::VaultError;
use crate::state::{FeeRates, FEE_DENOMINATOR, SECONDS_IN_A_YEAR};
use anchor_lang::prelude::*;

/// floor(a * b / denominator) with u128 intermediates
pub fn mul_div(a: u64, b: u64, denominator: u64) -> Result<u64> {
    let value = (a as u128)
        .checked_mul(b as u128)
        .ok_or(VaultError::MathOverflow)?
        .checked_div(denominator as u128)
        .ok_or(VaultError::MathOverflow)?;
    u64::try_from(value).map_err(|_| VaultError::MathOverflow.into())
}

/// floor(value * rate_ppm * elapsed / (SECONDS_IN_A_YEAR * 1e6))
fn annualized_fee(value: u64, rate_ppm: u32, elapsed: u64) -> Result<u64> {
    let fee = (value as u128)
        .checked_mul(rate_ppm as u128)
        .ok_or(VaultError::MathOverflow)?
        .checked_mul(elapsed as u128)
        .ok_or(VaultError::MathOverflow)?
        / (SECONDS_IN_A_YEAR as u128 * FEE_DENOMINATOR as u128);
    u64::try_from(fee).map_err(|_| VaultError::MathOverflow.into())
}

/// floor(value * rate_ppm / 1e6)
pub fn ppm_fee(value: u64, rate_ppm: u32) -> Result<u64> {
    mul_div(value, rate_ppm as u64, FEE_DENOMINATOR)
}

/// All six fee legs of one transition
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleFees {
    pub platform_entry: u64,
    pub manager_entry: u64,
    pub platform_exit: u64,
    pub manager_exit: u64,
    pub platform_performance: u64,
    pub manager_performance: u64,
    pub platform_management: u64,
    pub manager_management: u64,
}

impl CycleFees {
    pub fn platform_total(&self) -> u64 {
        self.platform_entry
            .saturating_add(self.platform_exit)
            .saturating_add(self.platform_performance)
            .saturating_add(self.platform_management)
    }

    pub fn manager_total(&self) -> u64 {
        self.manager_entry
            .saturating_add(self.manager_exit)
            .saturating_add(self.manager_performance)
            .saturating_add(self.manager_management)
    }
}

/// Everything a transition needs to know, computed without mutation
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleComputation {
    pub fees: CycleFees,

    /// Shares minted for the deposit cohort
    pub converted_deposits: u64,

    /// Assets the withdrawal cohort converted to, pre exit fee
    pub converted_withdrawals: u64,

    /// Withdrawal assets owed to investors, net of exit fees
    pub payable_withdrawals: u64,

    /// Deposit assets entering the fund, net of entry fees
    pub depositable: u64,

    /// NAV net of fees and queued flows
    pub fund_value_after_requests: u64,

    /// Share price discovered by this transition, assets per shares
    pub price_numerator: u64,
    pub price_denominator: u64,
}

/// Inputs to one cycle transition, captured before any mutation
#[derive(Clone, Copy, Debug)]
pub struct CycleInputs {
    /// Externally reported NAV
    pub fund_value: u64,
    /// fund_value_after_requests of the previous closed cycle (0 for cycle 0)
    pub previous_fund_value_after_requests: u64,
    /// Seconds between the previous cycle start and this one
    pub elapsed: u64,
    /// Share supply before this transition (escrowed shares included)
    pub total_supply: u64,
    /// Deposit assets queued during the closing cycle
    pub requested_deposits: u64,
    /// Shares queued for withdrawal during the closing cycle
    pub requested_withdrawals: u64,
    /// Operator-supplied ceiling on converted withdrawal assets; guards
    /// against pricing against a stale NAV. Conversions are clamped to it.
    pub withdraw_ceiling: u64,
    /// Assets per shares while total supply is zero
    pub initial_price_numerator: u64,
    pub initial_price_denominator: u64,
}

/// Steps 1-9 of the transition algorithm. Performs no mutation; the caller
/// persists the outcome and moves tokens.
pub fn compute_cycle(inputs: &CycleInputs, rates: &FeeRates) -> Result<CycleComputation> {
    // a fund with no shares outstanding must be seeded with value or deposits
    if inputs.total_supply == 0
        && inputs.fund_value == 0
        && inputs.requested_deposits == 0
    {
        return err!(VaultError::NoDeposits);
    }

    // management fees accrue on reported NAV over elapsed time
    let platform_management =
        annualized_fee(inputs.fund_value, rates.platform_management_fee, inputs.elapsed)?;
    let manager_management =
        annualized_fee(inputs.fund_value, rates.manager_management_fee, inputs.elapsed)?;

    // performance fees on profit above the previous cycle's net value
    let profit = inputs
        .fund_value
        .saturating_sub(inputs.previous_fund_value_after_requests);
    let platform_performance = ppm_fee(profit, rates.platform_performance_fee)?;
    let manager_performance = ppm_fee(profit, rates.manager_performance_fee)?;

    let net_value = inputs
        .fund_value
        .checked_sub(platform_management)
        .and_then(|v| v.checked_sub(manager_management))
        .and_then(|v| v.checked_sub(platform_performance))
        .and_then(|v| v.checked_sub(manager_performance))
        .ok_or(VaultError::MathOverflow)?;

    // withdrawal cohort converts at net value over previous supply
    let converted_withdrawals = if inputs.total_supply == 0 {
        0
    } else {
        mul_div(inputs.requested_withdrawals, net_value, inputs.total_supply)?
            .min(inputs.withdraw_ceiling)
    };

    let platform_exit = ppm_fee(converted_withdrawals, rates.platform_exit_fee)?;
    let manager_exit = ppm_fee(converted_withdrawals, rates.manager_exit_fee)?;
    let payable_withdrawals = converted_withdrawals
        .checked_sub(platform_exit)
        .and_then(|v| v.checked_sub(manager_exit))
        .ok_or(VaultError::MathOverflow)?;

    let price_denominator_value = net_value
        .checked_sub(converted_withdrawals)
        .ok_or(VaultError::MathOverflow)?;

    // deposit cohort enters net of entry fees at the discovered price
    let platform_entry = ppm_fee(inputs.requested_deposits, rates.platform_entry_fee)?;
    let manager_entry = ppm_fee(inputs.requested_deposits, rates.manager_entry_fee)?;
    let depositable = inputs
        .requested_deposits
        .checked_sub(platform_entry)
        .and_then(|v| v.checked_sub(manager_entry))
        .ok_or(VaultError::MathOverflow)?;

    let converted_deposits = if inputs.total_supply == 0 {
        mul_div(
            depositable,
            inputs.initial_price_denominator,
            inputs.initial_price_numerator,
        )?
    } else if depositable == 0 {
        0
    } else if price_denominator_value == 0 {
        // all remaining value was withdrawn, nothing to price deposits against
        return err!(VaultError::ExcessiveWithdrawal);
    } else {
        mul_div(depositable, inputs.total_supply, price_denominator_value)?
    };

    let fund_value_after_requests = price_denominator_value
        .checked_add(depositable)
        .ok_or(VaultError::MathOverflow)?;

    let (price_numerator, price_denominator) = if inputs.total_supply == 0 {
        (
            inputs.initial_price_numerator,
            inputs.initial_price_denominator,
        )
    } else {
        (net_value, inputs.total_supply)
    };

    Ok(CycleComputation {
        fees: CycleFees {
            platform_entry,
            manager_entry,
            platform_exit,
            manager_exit,
            platform_performance,
            manager_performance,
            platform_management,
            manager_management,
        },
        converted_deposits,
        converted_withdrawals,
        payable_withdrawals,
        depositable,
        fund_value_after_requests,
        price_numerator,
        price_denominator,
    })
}

// ==================== UNIT TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;

    // amounts below use 9 decimals, e.g. 100 units = 100_000_000_000

    fn test_rates() -> FeeRates {
        FeeRates {
            platform_entry_fee: 300,       // 0.03%
            manager_entry_fee: 700,        // 0.07%
            platform_exit_fee: 600,        // 0.06%
            manager_exit_fee: 1400,        // 0.14%
            platform_performance_fee: 10000, // 1%
            manager_performance_fee: 90000,  // 9%
            platform_management_fee: 2000,   // 0.2% yearly
            manager_management_fee: 8000,    // 0.8% yearly
        }
    }

    fn first_cycle_inputs() -> CycleInputs {
        CycleInputs {
            fund_value: 0,
            previous_fund_value_after_requests: 0,
            elapsed: 3600,
            total_supply: 0,
            requested_deposits: 300_000_000_000,
            requested_withdrawals: 0,
            withdraw_ceiling: 0,
            initial_price_numerator: 100,
            initial_price_denominator: 1,
        }
    }

    #[test]
    fn test_first_cycle_deposits_300() {
        // two investors deposited 100 and 200 units, no prior cycle
        let outcome = compute_cycle(&first_cycle_inputs(), &test_rates()).unwrap();

        assert_eq!(outcome.fees.platform_entry, 90_000_000); // 0.09
        assert_eq!(outcome.fees.manager_entry, 210_000_000); // 0.21
        assert_eq!(outcome.fees.platform_total(), 90_000_000);
        assert_eq!(outcome.fees.manager_total(), 210_000_000);
        assert_eq!(outcome.depositable, 299_700_000_000);
        // 299.7 assets at 100:1 initial price
        assert_eq!(outcome.converted_deposits, 2_997_000_000);
        assert_eq!(outcome.converted_withdrawals, 0);
        assert_eq!(outcome.fund_value_after_requests, 299_700_000_000);
        assert_eq!(outcome.price_numerator, 100);
        assert_eq!(outcome.price_denominator, 1);
    }

    #[test]
    fn test_no_deposits_on_empty_fund() {
        let inputs = CycleInputs {
            requested_deposits: 0,
            ..first_cycle_inputs()
        };
        let result = compute_cycle(&inputs, &test_rates());
        assert_eq!(result, Err(VaultError::NoDeposits.into()));
    }

    #[test]
    fn test_second_cycle_full_fee_stack() {
        // state after the first cycle: 2.997 shares, 299.7 net value;
        // fund grew to 400, 0.99 shares requested out, 100 assets requested in
        let elapsed = 86400u64;
        let inputs = CycleInputs {
            fund_value: 400_000_000_000,
            previous_fund_value_after_requests: 299_700_000_000,
            elapsed,
            total_supply: 2_997_000_000,
            requested_deposits: 100_000_000_000,
            requested_withdrawals: 990_000_000,
            withdraw_ceiling: u64::MAX,
            initial_price_numerator: 100,
            initial_price_denominator: 1,
        };
        let outcome = compute_cycle(&inputs, &test_rates()).unwrap();

        // reference math mirrors the fixed operation order
        let pm = 400_000_000_000u128 * 2000 * elapsed as u128
            / (SECONDS_IN_A_YEAR as u128 * 1_000_000);
        let mm = 400_000_000_000u128 * 8000 * elapsed as u128
            / (SECONDS_IN_A_YEAR as u128 * 1_000_000);
        assert_eq!(outcome.fees.platform_management, pm as u64);
        assert_eq!(outcome.fees.manager_management, mm as u64);

        let profit = 400_000_000_000u128 - 299_700_000_000;
        assert_eq!(outcome.fees.platform_performance, (profit / 100) as u64);
        assert_eq!(outcome.fees.manager_performance, (profit * 9 / 100) as u64);

        let net = 400_000_000_000u128
            - pm
            - mm
            - profit / 100
            - profit * 9 / 100;
        let converted_w = 990_000_000u128 * net / 2_997_000_000;
        assert_eq!(outcome.converted_withdrawals, converted_w as u64);
        assert_eq!(outcome.fees.platform_exit, (converted_w * 600 / 1_000_000) as u64);
        assert_eq!(outcome.fees.manager_exit, (converted_w * 1400 / 1_000_000) as u64);

        let depositable = 100_000_000_000u128
            - 100_000_000_000 * 300 / 1_000_000
            - 100_000_000_000 * 700 / 1_000_000;
        assert_eq!(outcome.depositable, depositable as u64);
        let converted_d = depositable * 2_997_000_000 / (net - converted_w);
        assert_eq!(outcome.converted_deposits, converted_d as u64);

        assert_eq!(
            outcome.fund_value_after_requests,
            (net - converted_w + depositable) as u64
        );
        assert_eq!(outcome.price_numerator, net as u64);
        assert_eq!(outcome.price_denominator, 2_997_000_000);
    }

    #[test]
    fn test_no_performance_fee_below_prior_net_value() {
        let inputs = CycleInputs {
            fund_value: 250_000_000_000,
            previous_fund_value_after_requests: 299_700_000_000,
            elapsed: 86400,
            total_supply: 2_997_000_000,
            requested_deposits: 0,
            requested_withdrawals: 0,
            withdraw_ceiling: 0,
            initial_price_numerator: 100,
            initial_price_denominator: 1,
        };
        let outcome = compute_cycle(&inputs, &test_rates()).unwrap();
        assert_eq!(outcome.fees.platform_performance, 0);
        assert_eq!(outcome.fees.manager_performance, 0);
        // management fees still accrue on a losing cycle
        assert!(outcome.fees.platform_management > 0);
    }

    #[test]
    fn test_zero_elapsed_accrues_no_management_fee() {
        let inputs = CycleInputs {
            fund_value: 300_000_000_000,
            previous_fund_value_after_requests: 299_700_000_000,
            elapsed: 0,
            total_supply: 2_997_000_000,
            requested_deposits: 0,
            requested_withdrawals: 0,
            withdraw_ceiling: 0,
            initial_price_numerator: 100,
            initial_price_denominator: 1,
        };
        let outcome = compute_cycle(&inputs, &test_rates()).unwrap();
        assert_eq!(outcome.fees.platform_management, 0);
        assert_eq!(outcome.fees.manager_management, 0);
    }

    #[test]
    fn test_withdraw_ceiling_clamps_conversion() {
        let inputs = CycleInputs {
            fund_value: 400_000_000_000,
            previous_fund_value_after_requests: 400_000_000_000,
            elapsed: 0,
            total_supply: 2_997_000_000,
            requested_deposits: 0,
            requested_withdrawals: 990_000_000,
            withdraw_ceiling: 50_000_000_000,
            initial_price_numerator: 100,
            initial_price_denominator: 1,
        };
        let outcome = compute_cycle(&inputs, &test_rates()).unwrap();
        // unclamped conversion would exceed 50 units
        assert_eq!(outcome.converted_withdrawals, 50_000_000_000);
    }

    #[test]
    fn test_fee_totals_sum_every_leg() {
        let inputs = CycleInputs {
            fund_value: 123_456_789_012,
            previous_fund_value_after_requests: 100_000_000_000,
            elapsed: 12345,
            total_supply: 1_234_567_890,
            requested_deposits: 55_555_555_555,
            requested_withdrawals: 123_456_789,
            withdraw_ceiling: u64::MAX,
            initial_price_numerator: 100,
            initial_price_denominator: 1,
        };
        let fees = compute_cycle(&inputs, &test_rates()).unwrap().fees;
        assert_eq!(
            fees.platform_total(),
            fees.platform_entry
                + fees.platform_exit
                + fees.platform_performance
                + fees.platform_management
        );
        assert_eq!(
            fees.manager_total(),
            fees.manager_entry
                + fees.manager_exit
                + fees.manager_performance
                + fees.manager_management
        );
    }

    #[test]
    fn test_full_withdrawal_with_new_deposits_fails() {
        // everyone withdraws everything while fresh deposits are queued;
        // there is no value left to price the deposits against
        let inputs = CycleInputs {
            fund_value: 100_000_000_000,
            previous_fund_value_after_requests: 100_000_000_000,
            elapsed: 0,
            total_supply: 1_000_000_000,
            requested_deposits: 10_000_000_000,
            requested_withdrawals: 1_000_000_000,
            withdraw_ceiling: u64::MAX,
            initial_price_numerator: 100,
            initial_price_denominator: 1,
        };
        // zero-fee config so withdrawals drain net value exactly
        let rates = FeeRates::default();
        let result = compute_cycle(&inputs, &rates);
        assert_eq!(result, Err(VaultError::ExcessiveWithdrawal.into()));
    }

    #[test]
    fn test_mul_div_floor_rounding() {
        assert_eq!(mul_div(10, 3, 4).unwrap(), 7); // floor(30/4)
        assert_eq!(mul_div(0, 3, 4).unwrap(), 0);
        assert!(mul_div(u64::MAX, u64::MAX, 1).is_err());
    }
}
