//! End-to-end sale scenarios
//!
//! Replays the full lifecycle: whitelist, window gating, per-participant
//! bounds, reserved-pool cap walls, vesting across quarters, the one-time
//! remainder merge and the reconciliation-gated finalize.

use lib_issuance::{
    IssuanceError, IssuanceResult, PoolId, RecordingSink, SaleConfig, SaleEvent, SaleState,
    SaleStateMachine, SettlementGateway, QUARTER_DURATION_SECS,
};
use lib_types::{Address, Amount, Timestamp};

const DAY: u64 = 86_400;
const START: Timestamp = 1_000_000;
const END: Timestamp = START + 60 * DAY;
const CAP: Amount = 600_000_000;
const RATE: Amount = 500;

fn addr(b: u8) -> Address {
    Address::new([b; 32])
}

fn operator() -> Address {
    addr(0x01)
}

fn wallet() -> Address {
    addr(0x02)
}

#[derive(Default)]
struct LedgerSettlement {
    wallet_balance: Amount,
    calls: u32,
}

impl SettlementGateway for LedgerSettlement {
    fn forward(&mut self, amount: Amount, _destination: &Address) -> IssuanceResult<()> {
        self.wallet_balance += amount;
        self.calls += 1;
        Ok(())
    }
}

struct Harness {
    sale: SaleStateMachine,
    sink: RecordingSink,
    settlement: LedgerSettlement,
}

impl Harness {
    fn new(rate: Amount) -> Self {
        let config = SaleConfig {
            rate,
            global_cap: CAP,
            ..SaleConfig::canonical(START, END, wallet(), operator())
        };
        Self {
            sale: SaleStateMachine::new(config).unwrap(),
            sink: RecordingSink::default(),
            settlement: LedgerSettlement::default(),
        }
    }

    fn whitelist(&mut self, participant: Address, min: Amount, max: Amount) {
        self.sale
            .add_to_whitelist(operator(), participant, min, max, &mut self.sink)
            .unwrap();
    }

    fn finalize(&mut self, caller: Address, now: Timestamp) -> IssuanceResult<()> {
        self.sale
            .finalize(caller, now, &mut self.settlement, &mut self.sink)
    }
}

#[test]
fn contribution_lifecycle_with_held_proceeds() {
    let mut h = Harness::new(RATE);
    let contributor = addr(0x10);
    let impostor = addr(0x11);

    h.whitelist(contributor, 1, 1_000_000);
    assert!(h.sale.whitelist().is_listed(&contributor));
    assert!(!h.sale.whitelist().is_listed(&impostor));

    // Token starts paused, sale starts pending.
    assert!(h.sale.asset().is_paused());
    assert_eq!(h.sale.state(START - 100), SaleState::Pending);

    // No contributions outside the window, listed or not.
    assert_eq!(
        h.sale.contribute(contributor, 100, START - 100, &mut h.sink),
        Err(IssuanceError::WrongState)
    );
    assert_eq!(
        h.sale.contribute(impostor, 100, START + DAY, &mut h.sink),
        Err(IssuanceError::NotListed)
    );

    // A listed contributor buys at the configured rate.
    let tokens = h
        .sale
        .contribute(contributor, 100, START + DAY, &mut h.sink)
        .unwrap();
    assert_eq!(tokens, 100 * RATE);
    assert_eq!(h.sale.asset().balance_of(&contributor), 100 * RATE);

    // The payment is held, not forwarded, until finalize.
    assert_eq!(h.sale.held_funds(), 100);
    assert_eq!(h.settlement.wallet_balance, 0);

    // Transfers stay locked through the sale.
    assert_eq!(
        h.sale.transfer(contributor, impostor, 1),
        Err(IssuanceError::Paused)
    );

    h.finalize(operator(), END + 30).unwrap();
    assert_eq!(h.settlement.wallet_balance, 100);
    assert_eq!(h.settlement.calls, 1);
    assert!(h.sale.asset().minting_finished());

    // Blocked transfers succeed immediately after finalize.
    h.sale.transfer(contributor, impostor, 1).unwrap();
    assert_eq!(h.sale.asset().balance_of(&impostor), 1);

    // Late contributions stay impossible.
    assert_eq!(
        h.sale.contribute(contributor, 100, END + 31, &mut h.sink),
        Err(IssuanceError::WrongState)
    );
}

#[test]
fn min_max_bounds_track_cumulative_contribution() {
    let mut h = Harness::new(1);
    let contributor = addr(0x10);
    h.whitelist(contributor, 3, 5);
    let now = START + 100;

    assert!(matches!(
        h.sale.contribute(contributor, 2, now, &mut h.sink),
        Err(IssuanceError::BelowMinCap { .. })
    ));
    assert!(matches!(
        h.sale.contribute(contributor, 6, now, &mut h.sink),
        Err(IssuanceError::AboveMaxCap { .. })
    ));
    h.sale.contribute(contributor, 5, now, &mut h.sink).unwrap();
    assert!(matches!(
        h.sale.contribute(contributor, 5, now, &mut h.sink),
        Err(IssuanceError::AboveMaxCap { .. })
    ));

    assert_eq!(h.sale.contribution_of(&contributor), 5);
    assert_eq!(h.sale.asset().balance_of(&contributor), 5);
}

#[test]
fn every_pool_fills_to_its_cap_and_not_past_it() {
    let mut h = Harness::new(1);
    let investor = addr(0x20);
    let contributor = addr(0x21);
    h.whitelist(contributor, 1, CAP);
    let now = START + 100;

    let expected_percent: [(u8, Amount); 6] = [
        (0, 27), // strategic
        (1, 10), // reserve
        (2, 20), // adoption
        (3, 3),  // team
        (4, 3),  // advisors
        (5, 3),  // promo
    ];
    for (index, percent) in expected_percent {
        let pool = PoolId::from_reserved_index(index).unwrap();
        let cap = h.sale.pools().cap(pool);
        assert_eq!(cap, CAP * percent / 100);

        h.sale
            .mint_tokens_for(operator(), investor, cap, index, now, &mut h.sink)
            .unwrap();
        assert!(matches!(
            h.sale
                .mint_tokens_for(operator(), investor, 1, index, now, &mut h.sink),
            Err(IssuanceError::PoolCapExceeded { .. })
        ));
    }

    // The sale pool takes the remaining 34%.
    let sale_cap = h.sale.pools().cap(PoolId::Sale);
    assert_eq!(sale_cap, CAP * 34 / 100);
    h.sale
        .contribute(contributor, sale_cap, now, &mut h.sink)
        .unwrap();

    assert_eq!(h.sale.asset().total_supply(), CAP);
    assert_eq!(h.sale.pools().total_minted(), CAP);
    assert_eq!(
        h.sale.contribute(contributor, 1, now, &mut h.sink),
        Err(IssuanceError::SaleCapReached)
    );
}

#[test]
fn vesting_releases_quarter_by_quarter_after_finalize() {
    let mut h = Harness::new(RATE);
    let beneficiary = addr(0x30);
    let amount = 100;
    let quarters = 3;

    let fund_id = h
        .sale
        .create_vest_fund_for(
            operator(),
            beneficiary,
            amount,
            quarters,
            1,
            START,
            &mut h.sink,
        )
        .unwrap();

    // The creation event carries the fund parameters.
    let created = h
        .sink
        .events
        .iter()
        .find(|e| matches!(e, SaleEvent::FundCreated { .. }))
        .unwrap();
    assert_eq!(
        *created,
        SaleEvent::FundCreated {
            fund_id,
            beneficiary,
            amount,
            quarter_count: quarters,
            pool: PoolId::Reserve,
        }
    );

    // The fund holding was pre-funded; nothing vested yet.
    let fund = h.sale.vesting().fund(fund_id).unwrap().clone();
    assert_eq!(h.sale.asset().balance_of(&fund.holding), amount);
    assert_eq!(h.sale.vesting().vested_amount(fund_id, START + DAY).unwrap(), 0);

    // Even past the window, nothing vests until finalize anchors the clock.
    assert_eq!(
        h.sale
            .vesting()
            .vested_amount(fund_id, END + QUARTER_DURATION_SECS)
            .unwrap(),
        0
    );

    h.finalize(operator(), END + 30).unwrap();
    let anchor = END + 30;

    let mut total_released = 0;
    for quarter in 1..=quarters as u64 {
        let now = anchor + quarter * QUARTER_DURATION_SECS;
        let expected_vested = amount * quarter as Amount / quarters as Amount;
        assert_eq!(
            h.sale.vesting().vested_amount(fund_id, now).unwrap(),
            expected_vested
        );

        total_released += h.sale.release_vested(fund_id, now).unwrap();
        assert_eq!(h.sale.asset().balance_of(&beneficiary), expected_vested);
        // Releasing twice at the same instant moves nothing more.
        assert_eq!(h.sale.release_vested(fund_id, now).unwrap(), 0);
    }
    assert_eq!(total_released, amount);
    assert_eq!(h.sale.asset().balance_of(&fund.holding), 0);
}

#[test]
fn remainder_merge_unlocks_adoption_capacity() {
    let mut h = Harness::new(1);
    let beneficiary = addr(0x40);
    let beneficiary2 = addr(0x41);
    let now = START + 100;

    let adoption_cap = h.sale.pools().cap(PoolId::Adoption);
    let sale_cap = h.sale.pools().cap(PoolId::Sale);

    // Fill the adoption pool (index 2) with a vest fund; one more unit fails.
    h.sale
        .create_vest_fund_for(operator(), beneficiary, adoption_cap, 3, 2, now, &mut h.sink)
        .unwrap();
    assert!(matches!(
        h.sale
            .create_vest_fund_for(operator(), beneficiary, sale_cap, 3, 2, now, &mut h.sink),
        Err(IssuanceError::PoolCapExceeded { .. })
    ));

    // Merge is gated on the window having closed.
    assert_eq!(
        h.sale.transfer_sale_remainder_to_adoption(operator(), END - 1),
        Err(IssuanceError::WrongState)
    );
    let moved = h
        .sale
        .transfer_sale_remainder_to_adoption(operator(), END + 30)
        .unwrap();
    assert_eq!(moved, sale_cap);

    // The merged remainder now backs an ordinary adoption-pool fund.
    h.sale
        .create_vest_fund_for(operator(), beneficiary2, sale_cap, 3, 2, END + 30, &mut h.sink)
        .unwrap();
    assert_eq!(
        h.sale.transfer_sale_remainder_to_adoption(operator(), END + 30),
        Err(IssuanceError::AlreadyReconciled)
    );
}

#[test]
fn reconciliation_date_gates_third_party_finalize() {
    let mut h = Harness::new(RATE);
    let other_guy = addr(0x50);
    let after_end = END + 30;

    // Without a reconciliation date, a third party cannot finalize.
    assert_eq!(h.finalize(other_guy, after_end), Err(IssuanceError::Unauthorized));

    let reconciliation = after_end + 30 * DAY;
    h.sale
        .set_reconciliation_date(operator(), reconciliation)
        .unwrap();

    // Not even the operator may finalize before the date.
    assert_eq!(
        h.finalize(operator(), after_end),
        Err(IssuanceError::ReconciliationPending {
            date: reconciliation,
            now: after_end,
        })
    );

    // Once the date passes, anyone may trigger the single finalize.
    h.finalize(other_guy, reconciliation + 100).unwrap();
    assert!(!h.sale.asset().is_paused());
    assert_eq!(
        h.finalize(operator(), reconciliation + 200),
        Err(IssuanceError::AlreadyFinalized)
    );
    assert_eq!(h.settlement.calls, 1);

    assert!(matches!(
        h.sink.events.last(),
        Some(SaleEvent::Finalized { settled: true, .. })
    ));
}

#[test]
fn events_record_the_accepted_operations() {
    let mut h = Harness::new(RATE);
    let contributor = addr(0x60);
    h.whitelist(contributor, 1, 1000);
    h.sale
        .contribute(contributor, 10, START + 1, &mut h.sink)
        .unwrap();
    h.sale
        .mint_tokens_for(operator(), contributor, 7, 3, START + 2, &mut h.sink)
        .unwrap();

    let kinds: Vec<&SaleEvent> = h.sink.events.iter().collect();
    assert!(matches!(kinds[0], SaleEvent::WhitelistUpdated { .. }));
    assert!(matches!(
        kinds[1],
        SaleEvent::ContributionAccepted {
            payment: 10,
            token_amount: 5000,
            ..
        }
    ));
    assert!(matches!(
        kinds[2],
        SaleEvent::TokensMinted {
            amount: 7,
            pool: PoolId::Team,
            ..
        }
    ));
}
