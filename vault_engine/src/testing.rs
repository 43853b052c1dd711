//! Stateful fakes of the external collaborators, shared by the unit tests

use std::sync::{
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    Arc, Mutex,
};

use alloy_primitives::U256;

use crate::{
    clock::{Clock, ManualClock},
    constants::{bps_denominator, scale, BPS_DENOMINATOR},
    providers::{LiquidityVenue, SwapExecutor, ValuationOracle, VenueDeposit},
    types::{AssetAmounts, AssetId, Ratio},
    utils::{
        common::{apply_bps, mul_div},
        error::{VaultError, VaultResult},
    },
};

pub fn amounts(a: u64, b: u64) -> AssetAmounts {
    AssetAmounts::new(U256::from(a), U256::from(b))
}

/// Oracle with settable prices, expressed in `SCALE` units per token unit
pub struct FakeOracle {
    prices: Mutex<(U256, U256)>,
    stale: AtomicBool,
}

impl FakeOracle {
    pub fn unit_prices() -> Self {
        Self::with_prices(1, 1)
    }

    /// Whole-number prices per token unit
    pub fn with_prices(price_a: u64, price_b: u64) -> Self {
        Self {
            prices: Mutex::new((
                U256::from(price_a) * scale(),
                U256::from(price_b) * scale(),
            )),
            stale: AtomicBool::new(false),
        }
    }

    pub fn set_prices(&self, price_a: u64, price_b: u64) {
        *self.prices.lock().unwrap() = (
            U256::from(price_a) * scale(),
            U256::from(price_b) * scale(),
        );
    }

    pub fn set_stale(&self, stale: bool) {
        self.stale.store(stale, Ordering::SeqCst);
    }

    fn price(&self, asset: AssetId) -> U256 {
        let prices = self.prices.lock().unwrap();
        match asset {
            AssetId::A => prices.0,
            AssetId::B => prices.1,
        }
    }
}

impl ValuationOracle for FakeOracle {
    fn valuation(&self, asset: AssetId, amount: U256) -> VaultResult<U256> {
        if self.stale.load(Ordering::SeqCst) {
            return Err(VaultError::StaleValuation("fake feed is stale".to_string()));
        }
        mul_div(amount, self.price(asset), scale())
    }
}

/// Swap executor that trades at oracle prices minus a configurable impact
pub struct FakeSwap {
    oracle: Arc<FakeOracle>,
    impact_bps: AtomicU64,
    clock: Arc<ManualClock>,
    delay: AtomicU64,
    pub swaps: AtomicUsize,
}

impl FakeSwap {
    pub fn new(oracle: Arc<FakeOracle>, clock: Arc<ManualClock>) -> Self {
        Self {
            oracle,
            impact_bps: AtomicU64::new(0),
            clock,
            delay: AtomicU64::new(0),
            swaps: AtomicUsize::new(0),
        }
    }

    pub fn set_impact_bps(&self, impact_bps: u64) {
        self.impact_bps.store(impact_bps, Ordering::SeqCst);
    }

    /// Seconds a swap takes to settle
    pub fn set_delay(&self, delay: u64) {
        self.delay.store(delay, Ordering::SeqCst);
    }

    pub fn swap_count(&self) -> usize {
        self.swaps.load(Ordering::SeqCst)
    }
}

impl SwapExecutor for FakeSwap {
    fn quote(&self, asset_in: AssetId, asset_out: AssetId, amount_in: U256) -> VaultResult<U256> {
        let value_in = self.oracle.valuation(asset_in, amount_in)?;
        let out = mul_div(value_in, scale(), self.oracle.price(asset_out))?;
        let impact = apply_bps(out, self.impact_bps.load(Ordering::SeqCst))?;
        Ok(out - impact)
    }

    fn swap(
        &self,
        asset_in: AssetId,
        asset_out: AssetId,
        amount_in: U256,
        min_amount_out: U256,
        deadline: u64,
    ) -> VaultResult<U256> {
        if self.clock.now() + self.delay.load(Ordering::SeqCst) > deadline {
            return Err(VaultError::DeadlineExceeded);
        }
        let out = self.quote(asset_in, asset_out, amount_in)?;
        if out < min_amount_out {
            return Err(VaultError::VenueRejected("insufficient output".to_string()));
        }
        self.swaps.fetch_add(1, Ordering::SeqCst);
        Ok(out)
    }
}

struct VenueState {
    reserves: AssetAmounts,
    total_units: U256,
    accept_bps: u64,
    locked_bps: u64,
    reject: bool,
    unpriced: bool,
    clock: Option<Arc<ManualClock>>,
    delay: u64,
    deposits: usize,
}

/// Constant-ratio pool. Clones share the same pool, so a test can keep a handle on
/// a venue it handed to a strategy.
#[derive(Clone)]
pub struct FakeVenue {
    state: Arc<Mutex<VenueState>>,
}

impl FakeVenue {
    pub fn new(reserves: AssetAmounts) -> Self {
        Self {
            state: Arc::new(Mutex::new(VenueState {
                reserves,
                total_units: reserves.a,
                accept_bps: BPS_DENOMINATOR,
                locked_bps: 0,
                reject: false,
                unpriced: false,
                clock: None,
                delay: 0,
                deposits: 0,
            })),
        }
    }

    /// Portion of a ratio-matched offer the venue takes, e.g. because of price-range limits
    pub fn set_accept_bps(&self, accept_bps: u64) {
        self.state.lock().unwrap().accept_bps = accept_bps;
    }

    /// Portion of any position that cannot be redeemed right now
    pub fn set_locked_bps(&self, locked_bps: u64) {
        self.state.lock().unwrap().locked_bps = locked_bps;
    }

    pub fn set_reject(&self, reject: bool) {
        self.state.lock().unwrap().reject = reject;
    }

    /// Makes position valuation fail, as when the pool's reporting is down
    pub fn set_unpriced(&self, unpriced: bool) {
        self.state.lock().unwrap().unpriced = unpriced;
    }

    pub fn set_clock(&self, clock: Arc<ManualClock>, delay: u64) {
        let mut state = self.state.lock().unwrap();
        state.clock = Some(clock);
        state.delay = delay;
    }

    /// Adds assets to the pool without issuing units, i.e. yield for every holder
    pub fn accrue(&self, extra: AssetAmounts) {
        let mut state = self.state.lock().unwrap();
        state.reserves = state.reserves.checked_add(&extra).unwrap();
    }

    pub fn deposit_count(&self) -> usize {
        self.state.lock().unwrap().deposits
    }

    pub fn reserves(&self) -> AssetAmounts {
        self.state.lock().unwrap().reserves
    }
}

impl LiquidityVenue for FakeVenue {
    fn deposit(
        &mut self,
        amount_a: U256,
        amount_b: U256,
        min_amount_a: U256,
        min_amount_b: U256,
        deadline: u64,
    ) -> VaultResult<VenueDeposit> {
        let mut state = self.state.lock().unwrap();
        if let Some(clock) = &state.clock {
            if clock.now() + state.delay > deadline {
                return Err(VaultError::DeadlineExceeded);
            }
        }
        if state.reject {
            return Err(VaultError::VenueRejected("pool closed".to_string()));
        }

        let reserves = state.reserves;
        let (mut consumed_a, mut consumed_b) = if amount_a * reserves.b <= amount_b * reserves.a {
            (amount_a, mul_div(amount_a, reserves.b, reserves.a)?)
        } else {
            (mul_div(amount_b, reserves.a, reserves.b)?, amount_b)
        };
        consumed_a = apply_bps(consumed_a, state.accept_bps)?;
        consumed_b = apply_bps(consumed_b, state.accept_bps)?;

        if consumed_a < min_amount_a || consumed_b < min_amount_b {
            return Err(VaultError::VenueRejected("below minimum amounts".to_string()));
        }

        let units = mul_div(state.total_units, consumed_a, reserves.a)?;
        state.reserves = reserves.checked_add(&AssetAmounts::new(consumed_a, consumed_b))?;
        state.total_units += units;
        state.deposits += 1;

        Ok(VenueDeposit {
            consumed: AssetAmounts::new(consumed_a, consumed_b),
            position_units: units,
        })
    }

    fn withdraw(&mut self, position_units: U256, deadline: u64) -> VaultResult<AssetAmounts> {
        let amounts = self.total_position_value(position_units)?;
        let mut state = self.state.lock().unwrap();
        if let Some(clock) = &state.clock {
            if clock.now() + state.delay > deadline {
                return Err(VaultError::DeadlineExceeded);
            }
        }
        if state.reject {
            return Err(VaultError::VenueRejected("pool closed".to_string()));
        }
        state.reserves = state.reserves.checked_sub(&amounts)?;
        state.total_units -= position_units;
        Ok(amounts)
    }

    fn current_ratio(&self) -> VaultResult<Ratio> {
        let state = self.state.lock().unwrap();
        Ok(Ratio::new(state.reserves.a, state.reserves.b))
    }

    fn total_position_value(&self, position_units: U256) -> VaultResult<AssetAmounts> {
        let state = self.state.lock().unwrap();
        if state.unpriced {
            return Err(VaultError::StaleValuation("pool reporting is down".to_string()));
        }
        Ok(AssetAmounts::new(
            mul_div(state.reserves.a, position_units, state.total_units)?,
            mul_div(state.reserves.b, position_units, state.total_units)?,
        ))
    }

    fn withdrawable_units(&self, position_units: U256) -> VaultResult<U256> {
        let state = self.state.lock().unwrap();
        let locked = mul_div(position_units, U256::from(state.locked_bps), bps_denominator())?;
        Ok(position_units - locked)
    }
}
