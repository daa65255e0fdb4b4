use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Amount, Expense, Member, MemberId, SETTLEMENT_EPSILON};

/// Net balance per member id. Positive means the group owes this member,
/// negative means this member owes the group.
pub type Balances = HashMap<MemberId, Amount>;

/// A suggested settlement transfer: `from` pays `to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    pub from: MemberId,
    pub to: MemberId,
    pub amount: Amount,
}

/// Compute each member's net balance from a group's expense history.
///
/// Every expense credits its payer with the full amount and debits each
/// split's member by that split's share. Expense order never affects the
/// result. Ids referenced by an expense but absent from `members` (stale
/// data after a member removal) still get a balance entry; it is the
/// presentation layer's job to render those without a name.
///
/// When every expense's splits sum to its amount, the returned balances sum
/// to zero up to floating-point rounding. A splits/amount mismatch shows up
/// as a nonzero total; that is a data-quality signal for the caller, not a
/// failure here.
pub fn compute_balances(members: &[Member], expenses: &[Expense]) -> Balances {
    let mut balances: Balances = members.iter().map(|m| (m.id, 0.0)).collect();

    for expense in expenses {
        *balances.entry(expense.paid_by).or_insert(0.0) += expense.amount;
        for split in &expense.splits {
            *balances.entry(split.member_id).or_insert(0.0) -= split.amount;
        }
    }

    balances
}

struct Outstanding {
    id: MemberId,
    remaining: Amount,
}

/// Reduce a balance table to a short list of settlement transfers.
///
/// Members within [`SETTLEMENT_EPSILON`] of zero are already settled and
/// never appear in a transfer. The rest are split into debtors and
/// creditors, each sorted by descending magnitude, and matched greedily:
/// the largest remaining debtor pays the largest remaining creditor
/// `min(debtor, creditor)`, and whichever side drops to the epsilon or
/// below advances. This emits at most `debtors + creditors - 1` transfers.
///
/// The greedy pairing is a deliberate trade-off: finding a true minimum
/// transaction set is NP-hard in general, and the heuristic keeps output
/// stable and cheap. Swapping in an exact solver would change every emitted
/// plan the tests pin down.
pub fn simplify_debts(balances: &Balances) -> Vec<Debt> {
    let mut debtors = Vec::new();
    let mut creditors = Vec::new();

    for (&id, &balance) in balances {
        if balance < -SETTLEMENT_EPSILON {
            debtors.push(Outstanding {
                id,
                remaining: balance.abs(),
            });
        } else if balance > SETTLEMENT_EPSILON {
            creditors.push(Outstanding {
                id,
                remaining: balance,
            });
        }
    }

    // Largest obligations first. Ties break on the id so the plan is stable
    // across runs; the map above iterates in randomized order.
    let by_magnitude = |a: &Outstanding, b: &Outstanding| {
        b.remaining
            .partial_cmp(&a.remaining)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    };
    debtors.sort_by(by_magnitude);
    creditors.sort_by(by_magnitude);

    let mut debts = Vec::new();
    let mut d_idx = 0;
    let mut c_idx = 0;

    while d_idx < debtors.len() && c_idx < creditors.len() {
        let settled = debtors[d_idx].remaining.min(creditors[c_idx].remaining);

        debts.push(Debt {
            from: debtors[d_idx].id,
            to: creditors[c_idx].id,
            amount: settled,
        });

        debtors[d_idx].remaining -= settled;
        creditors[c_idx].remaining -= settled;

        if debtors[d_idx].remaining <= SETTLEMENT_EPSILON {
            d_idx += 1;
        }
        if creditors[c_idx].remaining <= SETTLEMENT_EPSILON {
            c_idx += 1;
        }
    }

    debts
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::domain::Split;

    fn make_members(names: &[&str]) -> Vec<Member> {
        names.iter().map(|n| Member::new((*n).to_string())).collect()
    }

    fn make_expense(paid_by: MemberId, amount: Amount, shares: &[(MemberId, Amount)]) -> Expense {
        Expense::new("test expense".into(), amount, paid_by, Utc::now()).with_splits(
            shares
                .iter()
                .map(|&(member_id, amount)| Split { member_id, amount })
                .collect(),
        )
    }

    #[test]
    fn test_empty_inputs_produce_zero_balances_and_no_debts() {
        let balances = compute_balances(&[], &[]);
        assert!(balances.is_empty());
        assert!(simplify_debts(&balances).is_empty());

        let members = make_members(&["Alice", "Bob"]);
        let balances = compute_balances(&members, &[]);
        assert_eq!(balances.len(), 2);
        assert!(balances.values().all(|&b| b == 0.0));
        assert!(simplify_debts(&balances).is_empty());
    }

    #[test]
    fn test_single_payer_even_split() {
        // A fronts 30, split 10 each across A, B, C.
        let members = make_members(&["A", "B", "C"]);
        let (a, b, c) = (members[0].id, members[1].id, members[2].id);
        let expenses = vec![make_expense(a, 30.0, &[(a, 10.0), (b, 10.0), (c, 10.0)])];

        let balances = compute_balances(&members, &expenses);
        assert!((balances[&a] - 20.0).abs() < 1e-9);
        assert!((balances[&b] + 10.0).abs() < 1e-9);
        assert!((balances[&c] + 10.0).abs() < 1e-9);

        let debts = simplify_debts(&balances);
        assert_eq!(debts.len(), 2);
        for debt in &debts {
            assert_eq!(debt.to, a);
            assert!((debt.amount - 10.0).abs() < 1e-9);
        }
        let payers: Vec<MemberId> = debts.iter().map(|d| d.from).collect();
        assert!(payers.contains(&b) && payers.contains(&c));
    }

    #[test]
    fn test_cross_payments_net_to_single_transfer() {
        // A pays 100 split 50/50, B pays 40 split 20/20.
        let members = make_members(&["A", "B"]);
        let (a, b) = (members[0].id, members[1].id);
        let expenses = vec![
            make_expense(a, 100.0, &[(a, 50.0), (b, 50.0)]),
            make_expense(b, 40.0, &[(a, 20.0), (b, 20.0)]),
        ];

        let balances = compute_balances(&members, &expenses);
        assert!((balances[&a] - 30.0).abs() < 1e-9);
        assert!((balances[&b] + 30.0).abs() < 1e-9);

        let debts = simplify_debts(&balances);
        assert_eq!(debts.len(), 1);
        assert_eq!(debts[0].from, b);
        assert_eq!(debts[0].to, a);
        assert!((debts[0].amount - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_largest_debtor_settles_first_against_single_creditor() {
        // One creditor (+60) and three unequal debtors (-30, -20, -10).
        // The greedy pass must pair B first, then C, then D: exactly three
        // transfers, each fully settling one debtor.
        let members = make_members(&["A", "B", "C", "D"]);
        let (a, b, c, d) = (members[0].id, members[1].id, members[2].id, members[3].id);
        let expenses = vec![make_expense(
            a,
            60.0,
            &[(b, 30.0), (c, 20.0), (d, 10.0)],
        )];

        let balances = compute_balances(&members, &expenses);
        let debts = simplify_debts(&balances);

        let expected = vec![(b, a, 30.0), (c, a, 20.0), (d, a, 10.0)];
        assert_eq!(debts.len(), expected.len());
        for (debt, (from, to, amount)) in debts.iter().zip(expected) {
            assert_eq!(debt.from, from);
            assert_eq!(debt.to, to);
            assert!((debt.amount - amount).abs() < 1e-9);
        }
    }

    #[test]
    fn test_balances_sum_to_zero_when_splits_cover_amounts() {
        let members = make_members(&["A", "B", "C", "D"]);
        let ids: Vec<MemberId> = members.iter().map(|m| m.id).collect();
        let expenses = vec![
            make_expense(ids[0], 99.99, &[(ids[0], 33.33), (ids[1], 33.33), (ids[2], 33.33)]),
            make_expense(ids[1], 10.0, &[(ids[2], 2.5), (ids[3], 7.5)]),
            make_expense(ids[3], 0.07, &[(ids[0], 0.07)]),
        ];

        let balances = compute_balances(&members, &expenses);
        let total: Amount = balances.values().sum();
        assert!(total.abs() < 1e-6, "balances must sum to zero, got {}", total);
    }

    #[test]
    fn test_expense_order_does_not_affect_balances() {
        let members = make_members(&["A", "B", "C"]);
        let ids: Vec<MemberId> = members.iter().map(|m| m.id).collect();
        let expenses = vec![
            make_expense(ids[0], 90.0, &[(ids[0], 30.0), (ids[1], 30.0), (ids[2], 30.0)]),
            make_expense(ids[1], 12.5, &[(ids[0], 6.25), (ids[2], 6.25)]),
            make_expense(ids[2], 40.0, &[(ids[1], 40.0)]),
        ];

        let forward = compute_balances(&members, &expenses);
        let mut reversed_input = expenses.clone();
        reversed_input.reverse();
        let reversed = compute_balances(&members, &reversed_input);

        assert_eq!(forward.len(), reversed.len());
        for (id, balance) in &forward {
            assert!((balance - reversed[id]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_settlement_conserves_outstanding_credit() {
        let members = make_members(&["A", "B", "C", "D", "E"]);
        let ids: Vec<MemberId> = members.iter().map(|m| m.id).collect();
        let expenses = vec![
            make_expense(ids[0], 120.0, &[(ids[1], 40.0), (ids[2], 40.0), (ids[3], 40.0)]),
            make_expense(ids[4], 55.0, &[(ids[0], 11.0), (ids[1], 11.0), (ids[2], 11.0), (ids[3], 11.0), (ids[4], 11.0)]),
        ];

        let balances = compute_balances(&members, &expenses);
        let debts = simplify_debts(&balances);

        let credit_total: Amount = balances.values().filter(|&&b| b > SETTLEMENT_EPSILON).sum();
        let emitted_total: Amount = debts.iter().map(|d| d.amount).sum();
        assert!(
            (credit_total - emitted_total).abs() < 1e-6,
            "emitted {} but {} was owed",
            emitted_total,
            credit_total
        );
    }

    #[test]
    fn test_no_debt_at_or_below_epsilon() {
        let members = make_members(&["A", "B", "C"]);
        let ids: Vec<MemberId> = members.iter().map(|m| m.id).collect();
        // Amounts chosen so one remainder lands near the epsilon.
        let expenses = vec![
            make_expense(ids[0], 50.0, &[(ids[1], 25.005), (ids[2], 24.995)]),
            make_expense(ids[1], 25.0, &[(ids[0], 25.0)]),
        ];

        let balances = compute_balances(&members, &expenses);
        for debt in simplify_debts(&balances) {
            assert!(debt.amount > SETTLEMENT_EPSILON);
        }
    }

    #[test]
    fn test_transfer_count_upper_bound() {
        let members = make_members(&["A", "B", "C", "D", "E", "F"]);
        let ids: Vec<MemberId> = members.iter().map(|m| m.id).collect();
        let expenses = vec![
            make_expense(ids[0], 70.0, &[(ids[2], 20.0), (ids[3], 25.0), (ids[4], 25.0)]),
            make_expense(ids[1], 33.0, &[(ids[4], 3.0), (ids[5], 30.0)]),
        ];

        let balances = compute_balances(&members, &expenses);
        let debtors = balances.values().filter(|&&b| b < -SETTLEMENT_EPSILON).count();
        let creditors = balances.values().filter(|&&b| b > SETTLEMENT_EPSILON).count();

        let debts = simplify_debts(&balances);
        assert!(debts.len() <= debtors + creditors - 1);
    }

    #[test]
    fn test_settled_members_appear_in_no_transfer() {
        let members = make_members(&["A", "B", "C"]);
        let (a, b, c) = (members[0].id, members[1].id, members[2].id);
        // C participates but comes out dead even.
        let expenses = vec![
            make_expense(a, 20.0, &[(b, 10.0), (c, 10.0)]),
            make_expense(c, 10.0, &[(a, 10.0)]),
        ];

        let balances = compute_balances(&members, &expenses);
        assert!(balances[&c].abs() <= SETTLEMENT_EPSILON);

        for debt in simplify_debts(&balances) {
            assert_ne!(debt.from, c);
            assert_ne!(debt.to, c);
        }
    }

    #[test]
    fn test_unknown_ids_get_transient_balances() {
        // Payer and one split member were removed from the group; the
        // resolver still books them rather than failing.
        let members = make_members(&["A"]);
        let a = members[0].id;
        let ghost_payer = Uuid::new_v4();
        let ghost_debtor = Uuid::new_v4();
        let expenses = vec![make_expense(
            ghost_payer,
            30.0,
            &[(a, 15.0), (ghost_debtor, 15.0)],
        )];

        let balances = compute_balances(&members, &expenses);
        assert_eq!(balances.len(), 3);
        assert!((balances[&ghost_payer] - 30.0).abs() < 1e-9);
        assert!((balances[&ghost_debtor] + 15.0).abs() < 1e-9);
        assert!((balances[&a] + 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_split_mismatch_surfaces_as_nonzero_total() {
        let members = make_members(&["A", "B"]);
        let (a, b) = (members[0].id, members[1].id);
        // Splits only cover 20 of the 30 paid.
        let expenses = vec![make_expense(a, 30.0, &[(a, 10.0), (b, 10.0)])];

        let balances = compute_balances(&members, &expenses);
        let total: Amount = balances.values().sum();
        assert!((total - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_settlement_chain() {
        // Two creditors, two debtors with amounts forcing a partial match:
        // debtor B (-50) first pays creditor A (+40) in full, then the
        // remainder goes to creditor D (+30); debtor C (-20) finishes D.
        let members = make_members(&["A", "B", "C", "D"]);
        let (a, b, c, d) = (members[0].id, members[1].id, members[2].id, members[3].id);
        let mut balances = Balances::new();
        balances.insert(a, 40.0);
        balances.insert(b, -50.0);
        balances.insert(c, -20.0);
        balances.insert(d, 30.0);

        let debts = simplify_debts(&balances);
        let expected = vec![(b, a, 40.0), (b, d, 10.0), (c, d, 20.0)];
        assert_eq!(debts.len(), expected.len());
        for (debt, (from, to, amount)) in debts.iter().zip(expected) {
            assert_eq!(debt.from, from);
            assert_eq!(debt.to, to);
            assert!((debt.amount - amount).abs() < 1e-9);
        }
    }
}
