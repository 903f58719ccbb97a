// crates/cyclevault-history/src/replay.rs
//
// Event-log replay. Requests and share transfers are buffered while a
// cycle is open and folded in a fixed order when its CycleClosed record
// arrives: fee simulation on the holders that sat through the cycle,
// then the deposit cohort, then wallet-to-wallet transfers, then the
// withdrawal cohort. An ordering the program could never have produced
// is a hard error, not a best-effort guess.

use std::collections::HashMap;

use anchor_lang::prelude::Pubkey;

use crate::{
    CycleRecord, CycleReport, ReplayError, UserLedger, UserReport, VaultLogEvent, FEE_DENOMINATOR,
};

fn mul_div(a: u64, b: u64, denominator: u64, cycle_index: u32) -> Result<u64, ReplayError> {
    let value = (a as u128)
        .checked_mul(b as u128)
        .ok_or(ReplayError::Overflow { cycle_index })?
        .checked_div(denominator as u128)
        .ok_or(ReplayError::Overflow { cycle_index })?;
    u64::try_from(value).map_err(|_| ReplayError::Overflow { cycle_index })
}

/// Replays a fund's event log from genesis and accumulates one
/// CycleReport per closed cycle
pub struct Reconstructor {
    share_escrow: Pubkey,
    cycle_index: u32,
    users: HashMap<Pubkey, UserLedger>,
    pending_deposits: HashMap<Pubkey, u64>,
    pending_withdrawals: HashMap<Pubkey, u64>,
    transfers: Vec<(Pubkey, Pubkey, u64)>,
    reports: Vec<CycleReport>,
}

impl Reconstructor {
    /// `share_escrow` is the program's escrow token account; share
    /// transfers touching it (or the mint, keyed as the default pubkey)
    /// are program-internal legs and excluded from wallet accounting
    pub fn new(share_escrow: Pubkey) -> Self {
        Self {
            share_escrow,
            cycle_index: 0,
            users: HashMap::new(),
            pending_deposits: HashMap::new(),
            pending_withdrawals: HashMap::new(),
            transfers: Vec::new(),
            reports: Vec::new(),
        }
    }

    pub fn cycle_index(&self) -> u32 {
        self.cycle_index
    }

    pub fn reports(&self) -> &[CycleReport] {
        &self.reports
    }

    pub fn ledger(&self, investor: &Pubkey) -> Option<&UserLedger> {
        self.users.get(investor)
    }

    pub fn replay<I>(&mut self, events: I) -> Result<(), ReplayError>
    where
        I: IntoIterator<Item = VaultLogEvent>,
    {
        for event in events {
            self.apply(event)?;
        }
        Ok(())
    }

    pub fn apply(&mut self, event: VaultLogEvent) -> Result<(), ReplayError> {
        match event {
            VaultLogEvent::DepositRequested { investor, assets } => {
                let pending = self.pending_deposits.entry(investor).or_default();
                *pending = pending
                    .checked_add(assets)
                    .ok_or(ReplayError::Overflow {
                        cycle_index: self.cycle_index,
                    })?;
            }
            VaultLogEvent::DepositCanceled { investor, assets } => {
                let pending = self.pending_deposits.entry(investor).or_default();
                *pending = pending
                    .checked_sub(assets)
                    .ok_or(ReplayError::CancelExceedsPending {
                        investor,
                        amount: assets,
                    })?;
            }
            VaultLogEvent::WithdrawalRequested { investor, shares } => {
                // shares received by transfer earlier in this cycle are
                // spendable at the boundary, so buffered transfers count
                // toward (and against) the requestable balance
                let held = self.users.get(&investor).map_or(0, |u| u.shares) as u128;
                let incoming: u128 = self
                    .transfers
                    .iter()
                    .filter(|(_, to, _)| *to == investor)
                    .map(|(_, _, amount)| *amount as u128)
                    .sum();
                let outgoing: u128 = self
                    .transfers
                    .iter()
                    .filter(|(from, _, _)| *from == investor)
                    .map(|(_, _, amount)| *amount as u128)
                    .sum();
                let available = (held + incoming).saturating_sub(outgoing);
                let pending = self.pending_withdrawals.entry(investor).or_default();
                let total = pending
                    .checked_add(shares)
                    .ok_or(ReplayError::Overflow {
                        cycle_index: self.cycle_index,
                    })?;
                if (total as u128) > available {
                    return Err(ReplayError::WithdrawalExceedsBalance { investor, shares });
                }
                *pending = total;
            }
            VaultLogEvent::WithdrawalCanceled { investor, shares } => {
                let pending = self.pending_withdrawals.entry(investor).or_default();
                *pending = pending
                    .checked_sub(shares)
                    .ok_or(ReplayError::CancelExceedsPending {
                        investor,
                        amount: shares,
                    })?;
            }
            VaultLogEvent::ShareTransfer { from, to, amount } => {
                // escrow and mint/burn legs are the program moving its
                // own inventory, not investor flows
                if from == self.share_escrow
                    || to == self.share_escrow
                    || from == Pubkey::default()
                    || to == Pubkey::default()
                {
                    return Ok(());
                }
                self.transfers.push((from, to, amount));
            }
            VaultLogEvent::CycleClosed(record) => {
                if record.cycle_index != self.cycle_index {
                    return Err(ReplayError::CycleOutOfOrder {
                        expected: self.cycle_index,
                        got: record.cycle_index,
                    });
                }
                self.close_cycle(record)?;
            }
        }
        Ok(())
    }

    fn close_cycle(&mut self, record: CycleRecord) -> Result<(), ReplayError> {
        let ix = record.cycle_index;
        let total_supply = record.price_denominator;
        // a cycle nobody held through (genesis, possibly with seeded
        // value) prices positions at the recorded pair, not value/supply
        let had_supply = self.users.values().any(|u| u.shares > 0);
        let mut hwm_fees: HashMap<Pubkey, u64> = HashMap::new();
        let mut deposited: HashMap<Pubkey, u64> = HashMap::new();
        let mut withdrawn: HashMap<Pubkey, u64> = HashMap::new();

        // 1. Fee simulation on holders that sat through the cycle: what
        //    an individual high-water mark would have charged each of
        //    them. This cycle's deposit cohort joins afterwards.
        let mut simulated_hwm_fee = 0u64;
        for (user, ledger) in self.users.iter_mut() {
            if ledger.shares == 0 {
                continue;
            }
            let value = mul_div(ledger.shares, record.fund_value, total_supply, ix)?;
            let profit = value.saturating_sub(ledger.cost_basis);
            if profit > ledger.max_profit {
                let gain = profit - ledger.max_profit;
                let fee = mul_div(gain, record.performance_fee as u64, FEE_DENOMINATOR, ix)?;
                if fee > 0 {
                    hwm_fees.insert(*user, fee);
                    simulated_hwm_fee = simulated_hwm_fee
                        .checked_add(fee)
                        .ok_or(ReplayError::Overflow { cycle_index: ix })?;
                }
                ledger.max_profit = profit;
            }
        }

        // The pooled management fee plus the simulated performance fee
        // drag every holder's cost basis down, prorated by share count
        let total_fee_drag = record
            .pooled_management_fee
            .checked_add(simulated_hwm_fee)
            .ok_or(ReplayError::Overflow { cycle_index: ix })?;
        if total_fee_drag > 0 {
            for ledger in self.users.values_mut() {
                if ledger.shares == 0 {
                    continue;
                }
                let drag = mul_div(ledger.shares, total_fee_drag, total_supply, ix)?;
                ledger.cost_basis = ledger.cost_basis.saturating_sub(drag);
            }
        }

        // 2. Deposit cohort, at the cycle's uniform ratio; cost basis
        //    grows net of the entry fee
        let deposits: Vec<(Pubkey, u64)> = self
            .pending_deposits
            .drain()
            .filter(|(_, a)| *a > 0)
            .collect();
        for (investor, assets) in deposits {
            if record.requested_deposits == 0 {
                return Err(ReplayError::MissingDepositCohort { cycle_index: ix });
            }
            let gained = mul_div(assets, record.converted_deposits, record.requested_deposits, ix)?;
            let entry_fee = mul_div(assets, record.entry_fee as u64, FEE_DENOMINATOR, ix)?;
            // a corrupt record can carry a fee rate above the denominator
            let net = assets
                .checked_sub(entry_fee)
                .ok_or(ReplayError::Overflow { cycle_index: ix })?;
            let ledger = self.users.entry(investor).or_default();
            ledger.shares = ledger
                .shares
                .checked_add(gained)
                .ok_or(ReplayError::Overflow { cycle_index: ix })?;
            ledger.cost_basis = ledger
                .cost_basis
                .checked_add(net)
                .ok_or(ReplayError::Overflow { cycle_index: ix })?;
            deposited.insert(investor, assets);
        }

        // 3. Wallet-to-wallet transfers, in log order: cost basis and
        //    high-water mark move with a proportional slice of the shares
        let transfers = std::mem::take(&mut self.transfers);
        for (from, to, amount) in transfers {
            let source = self.users.get_mut(&from).filter(|u| u.shares >= amount);
            let Some(source) = source else {
                return Err(ReplayError::TransferExceedsBalance { from, amount });
            };
            let moved_basis = mul_div(source.cost_basis, amount, source.shares, ix)?;
            let moved_max = mul_div(source.max_profit, amount, source.shares, ix)?;
            source.shares -= amount;
            source.cost_basis -= moved_basis;
            source.max_profit -= moved_max;

            let target = self.users.entry(to).or_default();
            target.shares = target
                .shares
                .checked_add(amount)
                .ok_or(ReplayError::Overflow { cycle_index: ix })?;
            target.cost_basis = target
                .cost_basis
                .checked_add(moved_basis)
                .ok_or(ReplayError::Overflow { cycle_index: ix })?;
            target.max_profit = target
                .max_profit
                .checked_add(moved_max)
                .ok_or(ReplayError::Overflow { cycle_index: ix })?;
        }

        // 4. Withdrawal cohort, paid from the net pool at the uniform
        //    ratio. Only the cost basis shrinks with the position; the
        //    high-water mark stays where it was.
        let withdrawals: Vec<(Pubkey, u64)> = self
            .pending_withdrawals
            .drain()
            .filter(|(_, s)| *s > 0)
            .collect();
        for (investor, shares) in withdrawals {
            if record.requested_withdrawals == 0 {
                return Err(ReplayError::MissingWithdrawalCohort { cycle_index: ix });
            }
            let assets = mul_div(
                shares,
                record.converted_withdrawals,
                record.requested_withdrawals,
                ix,
            )?;
            let ledger = self
                .users
                .get_mut(&investor)
                .filter(|u| u.shares >= shares)
                .ok_or(ReplayError::WithdrawalExceedsBalance { investor, shares })?;
            let basis_out = mul_div(ledger.cost_basis, shares, ledger.shares, ix)?;
            ledger.shares -= shares;
            ledger.cost_basis -= basis_out;
            withdrawn.insert(investor, assets);
        }

        // 5. Report rows, sorted for stable output
        let mut participants: Vec<Pubkey> = self
            .users
            .keys()
            .copied()
            .chain(withdrawn.keys().copied())
            .collect();
        participants.sort();
        participants.dedup();

        let mut rows = Vec::with_capacity(participants.len());
        for user in participants {
            let ledger = self.users.get(&user).cloned().unwrap_or_default();
            let hwm_fee = hwm_fees.get(&user).copied().unwrap_or(0);
            if ledger == UserLedger::default()
                && hwm_fee == 0
                && !deposited.contains_key(&user)
                && !withdrawn.contains_key(&user)
            {
                continue;
            }
            let value = if had_supply {
                mul_div(ledger.shares, record.fund_value, total_supply, ix)?
            } else {
                mul_div(
                    ledger.shares,
                    record.price_numerator,
                    record.price_denominator,
                    ix,
                )?
            };
            rows.push(UserReport {
                investor: user.to_string(),
                shares: ledger.shares,
                cost_basis: ledger.cost_basis,
                value,
                hwm_fee,
                deposited: deposited.get(&user).copied().unwrap_or(0),
                withdrawn: withdrawn.get(&user).copied().unwrap_or(0),
            });
        }

        self.reports.push(CycleReport {
            cycle_index: ix,
            fund_value: record.fund_value,
            price_numerator: record.price_numerator,
            price_denominator: record.price_denominator,
            pooled_management_fee: record.pooled_management_fee,
            pooled_performance_fee: record.pooled_performance_fee,
            simulated_hwm_fee,
            rows,
        });
        self.cycle_index += 1;
        Ok(())
    }
}

// ==================== UNIT TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;

    fn first_cycle_record() -> CycleRecord {
        // 300 units queued, 0.1% combined entry fee, 100:1 initial price
        CycleRecord {
            cycle_index: 0,
            fund_value: 0,
            price_numerator: 100,
            price_denominator: 1,
            requested_deposits: 300_000_000_000,
            converted_deposits: 2_997_000_000,
            requested_withdrawals: 0,
            converted_withdrawals: 0,
            entry_fee: 1000,
            performance_fee: 100_000,
            pooled_management_fee: 0,
            pooled_performance_fee: 0,
        }
    }

    #[test]
    fn test_first_cycle_deposit_cohort() {
        let escrow = Pubkey::new_unique();
        let alice = Pubkey::new_unique();
        let bob = Pubkey::new_unique();
        let mut rec = Reconstructor::new(escrow);

        rec.replay([
            VaultLogEvent::DepositRequested {
                investor: alice,
                assets: 100_000_000_000,
            },
            VaultLogEvent::DepositRequested {
                investor: bob,
                assets: 200_000_000_000,
            },
            VaultLogEvent::CycleClosed(first_cycle_record()),
        ])
        .unwrap();

        let a = rec.ledger(&alice).unwrap();
        assert_eq!(a.shares, 999_000_000);
        assert_eq!(a.cost_basis, 99_900_000_000);
        let b = rec.ledger(&bob).unwrap();
        assert_eq!(b.shares, 1_998_000_000);
        assert_eq!(b.cost_basis, 199_800_000_000);

        let report = &rec.reports()[0];
        assert_eq!(report.cycle_index, 0);
        assert_eq!(report.simulated_hwm_fee, 0);
        assert_eq!(report.rows.len(), 2);
    }

    #[test]
    fn test_cancel_shrinks_pending() {
        let escrow = Pubkey::new_unique();
        let alice = Pubkey::new_unique();
        let mut rec = Reconstructor::new(escrow);

        let mut record = first_cycle_record();
        record.requested_deposits = 60_000_000_000;
        record.converted_deposits = 599_400_000;

        rec.replay([
            VaultLogEvent::DepositRequested {
                investor: alice,
                assets: 100_000_000_000,
            },
            VaultLogEvent::DepositCanceled {
                investor: alice,
                assets: 40_000_000_000,
            },
            VaultLogEvent::CycleClosed(record),
        ])
        .unwrap();

        assert_eq!(rec.ledger(&alice).unwrap().shares, 599_400_000);
    }

    #[test]
    fn test_cancel_exceeding_pending_is_hard_error() {
        let escrow = Pubkey::new_unique();
        let alice = Pubkey::new_unique();
        let mut rec = Reconstructor::new(escrow);

        let result = rec.replay([
            VaultLogEvent::DepositRequested {
                investor: alice,
                assets: 100,
            },
            VaultLogEvent::DepositCanceled {
                investor: alice,
                assets: 200,
            },
        ]);
        assert!(matches!(
            result,
            Err(ReplayError::CancelExceedsPending { amount: 200, .. })
        ));
    }

    #[test]
    fn test_cycle_out_of_order_is_hard_error() {
        let escrow = Pubkey::new_unique();
        let mut rec = Reconstructor::new(escrow);

        let mut record = first_cycle_record();
        record.cycle_index = 3;
        let result = rec.apply(VaultLogEvent::CycleClosed(record));
        assert!(matches!(
            result,
            Err(ReplayError::CycleOutOfOrder {
                expected: 0,
                got: 3
            })
        ));
    }

    #[test]
    fn test_transfer_moves_proportional_basis() {
        let escrow = Pubkey::new_unique();
        let alice = Pubkey::new_unique();
        let carol = Pubkey::new_unique();
        let mut rec = Reconstructor::new(escrow);

        rec.replay([
            VaultLogEvent::DepositRequested {
                investor: alice,
                assets: 100_000_000_000,
            },
            VaultLogEvent::CycleClosed(CycleRecord {
                requested_deposits: 100_000_000_000,
                converted_deposits: 999_000_000,
                ..first_cycle_record()
            }),
        ])
        .unwrap();

        // half the position moves in the next cycle and is folded at
        // its boundary; flat value so no high-water mark movement
        rec.apply(VaultLogEvent::ShareTransfer {
            from: alice,
            to: carol,
            amount: 499_500_000,
        })
        .unwrap();
        rec.apply(VaultLogEvent::CycleClosed(CycleRecord {
            cycle_index: 1,
            fund_value: 99_900_000_000,
            price_numerator: 100,
            price_denominator: 999_000_000,
            requested_deposits: 0,
            converted_deposits: 0,
            ..first_cycle_record()
        }))
        .unwrap();

        let a = rec.ledger(&alice).unwrap();
        let c = rec.ledger(&carol).unwrap();
        assert_eq!(a.shares, 499_500_000);
        assert_eq!(c.shares, 499_500_000);
        assert_eq!(a.cost_basis + c.cost_basis, 99_900_000_000);
        assert_eq!(c.cost_basis, 49_950_000_000);
    }

    #[test]
    fn test_escrow_and_mint_legs_skipped() {
        let escrow = Pubkey::new_unique();
        let alice = Pubkey::new_unique();
        let mut rec = Reconstructor::new(escrow);

        rec.apply(VaultLogEvent::ShareTransfer {
            from: alice,
            to: escrow,
            amount: 42,
        })
        .unwrap();
        rec.apply(VaultLogEvent::ShareTransfer {
            from: Pubkey::default(),
            to: alice,
            amount: 42,
        })
        .unwrap();
        // nothing buffered, so the boundary folds cleanly
        rec.apply(VaultLogEvent::CycleClosed(CycleRecord {
            requested_deposits: 0,
            converted_deposits: 0,
            ..first_cycle_record()
        }))
        .unwrap();
        assert!(rec.ledger(&alice).is_none());
    }

    #[test]
    fn test_hwm_simulation_and_fee_drag() {
        let escrow = Pubkey::new_unique();
        let alice = Pubkey::new_unique();
        let mut rec = Reconstructor::new(escrow);

        rec.replay([
            VaultLogEvent::DepositRequested {
                investor: alice,
                assets: 100_000_000_000,
            },
            VaultLogEvent::CycleClosed(CycleRecord {
                requested_deposits: 100_000_000_000,
                converted_deposits: 999_000_000,
                ..first_cycle_record()
            }),
        ])
        .unwrap();

        // fund doubled; alice cashes out half at the boundary
        rec.replay([
            VaultLogEvent::WithdrawalRequested {
                investor: alice,
                shares: 499_500_000,
            },
            VaultLogEvent::CycleClosed(CycleRecord {
                cycle_index: 1,
                fund_value: 199_800_000_000,
                price_numerator: 200,
                price_denominator: 999_000_000,
                requested_deposits: 0,
                converted_deposits: 0,
                requested_withdrawals: 499_500_000,
                converted_withdrawals: 99_600_000_000,
                entry_fee: 1000,
                performance_fee: 100_000,
                pooled_management_fee: 999_000_000,
                pooled_performance_fee: 9_990_000_000,
            }),
        ])
        .unwrap();

        let report = &rec.reports()[1];
        // profit 99_900_000_000 over a zero high-water mark, 10% rate
        assert_eq!(report.simulated_hwm_fee, 9_990_000_000);
        assert_eq!(report.pooled_management_fee, 999_000_000);

        // full holder, so the whole drag comes out of alice's basis:
        // 99_900_000_000 - (999_000_000 + 9_990_000_000), then cashing
        // out half the shares removes half the basis
        let a = rec.ledger(&alice).unwrap();
        assert_eq!(a.shares, 499_500_000);
        assert_eq!(a.cost_basis, 44_455_500_000);
        assert_eq!(a.max_profit, 99_900_000_000);

        let row = &report.rows[0];
        assert_eq!(row.withdrawn, 99_600_000_000);
        assert_eq!(row.hwm_fee, 9_990_000_000);
    }

    #[test]
    fn test_no_hwm_fee_below_previous_peak() {
        let escrow = Pubkey::new_unique();
        let alice = Pubkey::new_unique();
        let mut rec = Reconstructor::new(escrow);

        rec.replay([
            VaultLogEvent::DepositRequested {
                investor: alice,
                assets: 100_000_000_000,
            },
            VaultLogEvent::CycleClosed(CycleRecord {
                requested_deposits: 100_000_000_000,
                converted_deposits: 999_000_000,
                ..first_cycle_record()
            }),
            // peak at double
            VaultLogEvent::CycleClosed(CycleRecord {
                cycle_index: 1,
                fund_value: 199_800_000_000,
                price_numerator: 200,
                price_denominator: 999_000_000,
                requested_deposits: 0,
                converted_deposits: 0,
                ..first_cycle_record()
            }),
            // back down; still above basis but below the peak
            VaultLogEvent::CycleClosed(CycleRecord {
                cycle_index: 2,
                fund_value: 149_850_000_000,
                price_numerator: 150,
                price_denominator: 999_000_000,
                requested_deposits: 0,
                converted_deposits: 0,
                ..first_cycle_record()
            }),
        ])
        .unwrap();

        assert!(rec.reports()[1].simulated_hwm_fee > 0);
        assert_eq!(rec.reports()[2].simulated_hwm_fee, 0);
    }

    #[test]
    fn test_transfer_then_withdraw_in_same_cycle() {
        let escrow = Pubkey::new_unique();
        let alice = Pubkey::new_unique();
        let carol = Pubkey::new_unique();
        let mut rec = Reconstructor::new(escrow);

        rec.replay([
            VaultLogEvent::DepositRequested {
                investor: alice,
                assets: 100_000_000_000,
            },
            VaultLogEvent::CycleClosed(CycleRecord {
                requested_deposits: 100_000_000_000,
                converted_deposits: 999_000_000,
                ..first_cycle_record()
            }),
        ])
        .unwrap();

        // carol holds nothing yet, but alice's transfer lands at the
        // same boundary, before the withdrawal folds
        rec.replay([
            VaultLogEvent::ShareTransfer {
                from: alice,
                to: carol,
                amount: 999_000_000,
            },
            VaultLogEvent::WithdrawalRequested {
                investor: carol,
                shares: 999_000_000,
            },
            VaultLogEvent::CycleClosed(CycleRecord {
                cycle_index: 1,
                fund_value: 99_900_000_000,
                price_numerator: 100,
                price_denominator: 999_000_000,
                requested_deposits: 0,
                converted_deposits: 0,
                requested_withdrawals: 999_000_000,
                converted_withdrawals: 99_800_000_000,
                ..first_cycle_record()
            }),
        ])
        .unwrap();

        assert_eq!(rec.ledger(&alice).unwrap().shares, 0);
        assert_eq!(rec.ledger(&carol).unwrap().shares, 0);
        let report = &rec.reports()[1];
        let row = report
            .rows
            .iter()
            .find(|r| r.investor == carol.to_string())
            .unwrap();
        assert_eq!(row.withdrawn, 99_800_000_000);
    }

    #[test]
    fn test_withdraw_more_than_held_plus_transfers_is_hard_error() {
        let escrow = Pubkey::new_unique();
        let alice = Pubkey::new_unique();
        let carol = Pubkey::new_unique();
        let mut rec = Reconstructor::new(escrow);

        rec.replay([
            VaultLogEvent::DepositRequested {
                investor: alice,
                assets: 100_000_000_000,
            },
            VaultLogEvent::CycleClosed(CycleRecord {
                requested_deposits: 100_000_000_000,
                converted_deposits: 999_000_000,
                ..first_cycle_record()
            }),
            VaultLogEvent::ShareTransfer {
                from: alice,
                to: carol,
                amount: 500_000_000,
            },
        ])
        .unwrap();

        let result = rec.apply(VaultLogEvent::WithdrawalRequested {
            investor: carol,
            shares: 500_000_001,
        });
        assert!(matches!(
            result,
            Err(ReplayError::WithdrawalExceedsBalance { .. })
        ));
        // and the sender's spendable balance shrank by the transfer
        let result = rec.apply(VaultLogEvent::WithdrawalRequested {
            investor: alice,
            shares: 499_000_001,
        });
        assert!(matches!(
            result,
            Err(ReplayError::WithdrawalExceedsBalance { .. })
        ));
    }

    #[test]
    fn test_corrupt_entry_fee_is_hard_error() {
        let escrow = Pubkey::new_unique();
        let alice = Pubkey::new_unique();
        let mut rec = Reconstructor::new(escrow);

        // a fee rate above the denominator would make the net negative
        let mut record = first_cycle_record();
        record.entry_fee = 2_000_000;

        let result = rec.replay([
            VaultLogEvent::DepositRequested {
                investor: alice,
                assets: 100_000_000_000,
            },
            VaultLogEvent::CycleClosed(record),
        ]);
        assert!(matches!(
            result,
            Err(ReplayError::Overflow { cycle_index: 0 })
        ));
    }

    #[test]
    fn test_seeded_genesis_valued_at_initial_price() {
        let escrow = Pubkey::new_unique();
        let alice = Pubkey::new_unique();
        let mut rec = Reconstructor::new(escrow);

        // value seeded before anyone held shares; rows price at the
        // recorded 100:1 pair instead of fund_value over a unit supply
        rec.replay([
            VaultLogEvent::DepositRequested {
                investor: alice,
                assets: 100_000_000_000,
            },
            VaultLogEvent::CycleClosed(CycleRecord {
                fund_value: 50_000_000_000,
                requested_deposits: 100_000_000_000,
                converted_deposits: 999_000_000,
                ..first_cycle_record()
            }),
        ])
        .unwrap();

        let row = &rec.reports()[0].rows[0];
        assert_eq!(row.shares, 999_000_000);
        assert_eq!(row.value, 99_900_000_000);
    }

    #[test]
    fn test_withdrawal_without_balance_is_hard_error() {
        let escrow = Pubkey::new_unique();
        let alice = Pubkey::new_unique();
        let mut rec = Reconstructor::new(escrow);

        let result = rec.apply(VaultLogEvent::WithdrawalRequested {
            investor: alice,
            shares: 1,
        });
        assert!(matches!(
            result,
            Err(ReplayError::WithdrawalExceedsBalance { shares: 1, .. })
        ));
    }
}
