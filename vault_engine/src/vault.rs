//! Vault engine
//!
//! One `Vault` owns all accounting state of a vault instance: idle balances, the
//! share ledger, the strategy registry, the deployment scheduler, the pause switch
//! and the journal. Every mutation goes through `&mut self`, and every external call
//! made on its behalf carries a deadline derived from the configured timeout.

use std::sync::Arc;

use alloy_primitives::{Address, U256};

use crate::{
    clock::Clock,
    config::{VaultConfig, VaultConfigInput},
    constants::scale,
    halt::Halt,
    journal::{Journal, JournalCollection, LogType},
    ledger::{pro_rata, ShareLedger},
    nav,
    providers::{value_of, SwapExecutor, ValuationOracle},
    rebalancer::Rebalancer,
    registry::StrategyRegistry,
    scheduler::{allocate, DeploymentScheduler, GateInput},
    state::{StableBalance, StableStrategy, StableVault},
    strategy::{Strategy, StrategyData},
    types::{
        AssetAmounts, BurnReceipt, DeploymentReport, MintReceipt, NavReport, StrategyDeployment,
        StrategyId, ValuationStatus, VaultQuery,
    },
    utils::{
        common::{checked_add, mul_div, u256_to_nat},
        error::{VaultError, VaultResult},
    },
};

/// External collaborators a vault runs against
#[derive(Clone)]
pub struct Collaborators {
    pub oracle: Arc<dyn ValuationOracle>,
    pub swap: Arc<dyn SwapExecutor>,
    pub clock: Arc<dyn Clock>,
}

pub struct Vault {
    config: VaultConfig,
    idle: AssetAmounts,
    ledger: ShareLedger,
    registry: StrategyRegistry,
    scheduler: DeploymentScheduler,
    halt: Halt,
    journal: Journal,
    last_deployment_report: Option<DeploymentReport>,
    oracle: Arc<dyn ValuationOracle>,
    swap: Arc<dyn SwapExecutor>,
    clock: Arc<dyn Clock>,
}

impl Vault {
    pub fn new(config: VaultConfig, collaborators: Collaborators) -> VaultResult<Self> {
        config.validate()?;
        Ok(Self {
            journal: Journal::with_capacity(config.journal_capacity),
            config,
            idle: AssetAmounts::zero(),
            ledger: ShareLedger::default(),
            registry: StrategyRegistry::default(),
            scheduler: DeploymentScheduler::default(),
            halt: Halt::default(),
            last_deployment_report: None,
            oracle: collaborators.oracle,
            swap: collaborators.swap,
            clock: collaborators.clock,
        })
    }

    /// Rebuilds a vault from its persisted form.
    ///
    /// `build_strategy` is called once per persisted strategy, in key order, and must
    /// return the implementation bound to that key.
    pub fn restore<F>(
        stable: &StableVault,
        collaborators: Collaborators,
        mut build_strategy: F,
    ) -> VaultResult<Self>
    where
        F: FnMut(&StableStrategy) -> VaultResult<Box<dyn Strategy>>,
    {
        let config = VaultConfig::try_from(stable.config.clone())?;
        let mut vault = Self::new(config, collaborators)?;

        vault.idle = stable.idle()?;
        vault.ledger = ShareLedger::from_balances(stable.decoded_balances()?)?;
        if u256_to_nat(&vault.ledger.total_shares()) != stable.total_shares {
            return Err(VaultError::DecodingError(
                "Persisted share supply does not match the holder balances.".to_string(),
            ));
        }
        vault.scheduler = DeploymentScheduler::new(stable.last_deployment_timestamp);
        vault.halt = stable.halt.clone();

        for stable_strategy in &stable.strategies {
            let strategy = build_strategy(stable_strategy)?;
            let data = StrategyData::try_from(stable_strategy)?;
            vault
                .registry
                .restore(stable_strategy.settings.clone(), data, strategy)?;
        }

        let now = vault.clock.now();
        let mut journal = JournalCollection::open(now, None);
        journal.append_note(
            Ok(()),
            LogType::Info,
            format!(
                "Restored vault with {} strategies and {} holders.",
                vault.registry.len(),
                stable.balances.len()
            ),
        );
        vault.commit(journal);
        Ok(vault)
    }

    /// Persisted form of the vault
    pub fn snapshot(&self) -> StableVault {
        let mut balances: Vec<StableBalance> = self
            .ledger
            .holders()
            .map(|(holder, shares)| StableBalance {
                holder: holder.to_string(),
                shares: u256_to_nat(shares),
            })
            .collect();
        balances.sort_by(|a, b| a.holder.cmp(&b.holder));

        let strategies = self
            .registry
            .iter()
            .map(|(_, entry)| {
                let mut stable = StableStrategy::default();
                stable.settings(entry.settings.clone()).data(&entry.data);
                stable
            })
            .collect();

        StableVault {
            config: VaultConfigInput::from(&self.config),
            idle_a: u256_to_nat(&self.idle.a),
            idle_b: u256_to_nat(&self.idle.b),
            total_shares: u256_to_nat(&self.ledger.total_shares()),
            balances,
            last_deployment_timestamp: self.scheduler.last_deployment_timestamp(),
            halt: self.halt.clone(),
            strategies,
        }
    }

    fn now(&self) -> u64 {
        self.clock.now()
    }

    fn deadline(&self) -> u64 {
        self.now().saturating_add(self.config.external_call_timeout)
    }

    fn commit(&mut self, mut collection: JournalCollection) {
        let now = self.now();
        collection.close(now);
        self.journal.commit(collection);
    }

    fn ensure_functional(&self) -> VaultResult<()> {
        if !self.halt.is_functional() {
            return Err(VaultError::VaultPaused);
        }
        Ok(())
    }

    // Depositor surface

    /// Deposits both assets and issues shares against the NAV taken before the deposit.
    /// May run a deployment pass if the gate opens.
    pub fn mint(&mut self, depositor: Address, deposit: AssetAmounts) -> VaultResult<MintReceipt> {
        let mut journal = JournalCollection::open(self.now(), None);
        let result = self.mint_inner(depositor, deposit, &mut journal);
        if let Err(err) = &result {
            journal.append_note(
                Err(err.clone()),
                LogType::Deposit,
                format!("Deposit of {:?} by {} failed.", deposit, depositor),
            );
        }
        self.commit(journal);
        result
    }

    fn mint_inner(
        &mut self,
        depositor: Address,
        deposit: AssetAmounts,
        journal: &mut JournalCollection,
    ) -> VaultResult<MintReceipt> {
        self.ensure_functional()?;
        if deposit.is_zero() {
            return Err(VaultError::ZeroDeposit);
        }

        // Snapshot taken once; nothing below reads the balances for pricing again.
        let nav_before = self.nav_report()?;
        let deposit_value = nav::idle_value(&deposit, self.oracle.as_ref())?;
        let shares = self
            .ledger
            .shares_for_deposit(deposit_value, nav_before.total)?;
        if shares.is_zero() {
            return Err(VaultError::ZeroDeposit);
        }

        let idle = self.idle.checked_add(&deposit)?;
        self.ledger.credit(depositor, shares)?;
        self.idle = idle;
        journal_stale(journal, &nav_before);

        journal.append_note(
            Ok(()),
            LogType::Deposit,
            format!(
                "{} deposited {:?} worth {} for {} shares.",
                depositor, deposit, deposit_value, shares
            ),
        );

        let deployment = match self.run_deployment(false, journal) {
            Ok(report) => report,
            Err(err) => {
                // The deposit stands; the funds wait in idle for the next pass.
                journal.append_note(
                    Err(err),
                    LogType::Deployment,
                    "Deployment check after deposit failed.",
                );
                None
            }
        };
        self.refresh_last_known(journal);

        Ok(MintReceipt {
            shares_issued: shares,
            deployment,
        })
    }

    /// Burns shares and pays their entitlement at the current NAV, from idle first and
    /// then from strategies in registry order. All-or-nothing.
    pub fn burn(&mut self, holder: Address, shares: U256) -> VaultResult<BurnReceipt> {
        let mut journal = JournalCollection::open(self.now(), None);
        let result = self.burn_inner(holder, shares, &mut journal);
        if let Err(err) = &result {
            journal.append_note(
                Err(err.clone()),
                LogType::Redemption,
                format!("Redemption of {} shares by {} failed.", shares, holder),
            );
        }
        self.commit(journal);
        result
    }

    fn burn_inner(
        &mut self,
        holder: Address,
        shares: U256,
        journal: &mut JournalCollection,
    ) -> VaultResult<BurnReceipt> {
        self.ledger.ensure_balance(&holder, shares)?;
        if shares.is_zero() {
            return Ok(BurnReceipt {
                shares_burned: U256::ZERO,
                paid: AssetAmounts::zero(),
                pulled_from_strategies: AssetAmounts::zero(),
            });
        }

        let report = self.nav_report()?;
        journal_stale(journal, &report);
        let entitlement = self.ledger.value_of_shares(shares, report.total)?;

        let pulls = if entitlement > report.idle_value {
            self.pull_from_strategies(entitlement - report.idle_value, journal)?
        } else {
            Vec::new()
        };
        let settled = pulls
            .iter()
            .try_fold(AssetAmounts::zero(), |total, (_, amounts)| {
                total.checked_add(amounts)
            })
            .and_then(|pulled| {
                let paid = self.settle_burn(holder, shares, entitlement)?;
                Ok((paid, pulled))
            });
        let (paid, pulled) = match settled {
            Ok(settled) => settled,
            Err(err) => {
                // No share is burned, so whatever left the strategies goes back
                self.return_pulled(pulls, journal);
                return Err(err);
            }
        };
        if !pulls.is_empty() {
            self.refresh_last_known(journal);
        }

        journal.append_note(
            Ok(()),
            LogType::Redemption,
            format!(
                "{} burned {} shares worth {} for {:?}.",
                holder, shares, entitlement, paid
            ),
        );

        Ok(BurnReceipt {
            shares_burned: shares,
            paid,
            pulled_from_strategies: pulled,
        })
    }

    /// Pays `entitlement` out of idle and burns the shares
    fn settle_burn(
        &mut self,
        holder: Address,
        shares: U256,
        entitlement: U256,
    ) -> VaultResult<AssetAmounts> {
        let idle_value = nav::idle_value(&self.idle, self.oracle.as_ref())?;
        if idle_value < entitlement {
            return Err(VaultError::InsufficientLiquidity);
        }
        let paid = pro_rata(&self.idle, entitlement, idle_value)?;
        let idle = self.idle.checked_sub(&paid)?;
        self.ledger.debit(&holder, shares)?;
        self.idle = idle;
        Ok(paid)
    }

    /// Moves at least `shortfall` worth of assets from active strategies to idle and
    /// returns what came from each. Checks what the strategies can supply before calling
    /// any of them. On failure every amount already pulled is handed back.
    fn pull_from_strategies(
        &mut self,
        shortfall: U256,
        journal: &mut JournalCollection,
    ) -> VaultResult<Vec<(StrategyId, AssetAmounts)>> {
        let oracle = self.oracle.clone();
        let keys = self.registry.active_keys();

        let mut available = Vec::with_capacity(keys.len());
        let mut total_available = U256::ZERO;
        for key in keys {
            let withdrawable = match self.registry.get(key)?.strategy.withdrawable() {
                Ok(withdrawable) => withdrawable,
                Err(err) => {
                    journal.append_note(
                        Err(err),
                        LogType::Redemption,
                        format!("Strategy {} cannot report its withdrawable amounts.", key),
                    );
                    continue;
                }
            };
            let value = value_of(oracle.as_ref(), &withdrawable)?;
            total_available = checked_add(total_available, value, "Withdrawable value")?;
            available.push((key, value));
        }
        if total_available < shortfall {
            return Err(VaultError::InsufficientLiquidity);
        }

        let mut pulls = Vec::with_capacity(available.len());
        if let Err(err) = self.pull_each(&available, shortfall, &mut pulls, journal) {
            self.return_pulled(pulls, journal);
            return Err(err);
        }
        Ok(pulls)
    }

    fn pull_each(
        &mut self,
        available: &[(StrategyId, U256)],
        shortfall: U256,
        pulls: &mut Vec<(StrategyId, AssetAmounts)>,
        journal: &mut JournalCollection,
    ) -> VaultResult<()> {
        let oracle = self.oracle.clone();
        let deadline = self.deadline();
        let mut remaining = shortfall;
        for &(key, value) in available {
            if remaining.is_zero() {
                break;
            }
            let target = remaining.min(value);
            if target.is_zero() {
                continue;
            }

            let entry = self.registry.get_mut(key)?;
            let withdrawn = match entry.strategy.withdraw(target, oracle.as_ref(), deadline) {
                Ok(withdrawn) => withdrawn,
                Err(err) => {
                    journal.append_note(
                        Err(err),
                        LogType::Redemption,
                        format!("Strategy {} failed to withdraw {}.", key, target),
                    );
                    return Err(VaultError::InsufficientLiquidity);
                }
            };
            let idle = self.idle.checked_add(&withdrawn)?;
            self.idle = idle;
            pulls.push((key, withdrawn));

            journal.append_note(
                Ok(()),
                LogType::Redemption,
                format!("Pulled {:?} from strategy {}.", withdrawn, key),
            );
            let withdrawn_value = value_of(oracle.as_ref(), &withdrawn)?;
            remaining = remaining.saturating_sub(withdrawn_value);
        }

        if !remaining.is_zero() {
            return Err(VaultError::InsufficientLiquidity);
        }
        Ok(())
    }

    /// Hands pulled amounts back to the strategies they came from, latest first.
    /// Whatever a strategy cannot take back stays idle and is journaled.
    fn return_pulled(
        &mut self,
        pulls: Vec<(StrategyId, AssetAmounts)>,
        journal: &mut JournalCollection,
    ) {
        let deadline = self.deadline();
        for (key, amounts) in pulls.into_iter().rev() {
            let idle = match self.idle.checked_sub(&amounts) {
                Ok(idle) => idle,
                Err(err) => {
                    journal.append_note(
                        Err(err),
                        LogType::Redemption,
                        format!("{:?} pulled from strategy {} is no longer idle.", amounts, key),
                    );
                    continue;
                }
            };
            let result = self
                .registry
                .get_mut(key)
                .and_then(|entry| entry.strategy.reinstate(amounts, deadline));
            match result {
                Ok(()) => {
                    self.idle = idle;
                    journal.append_note(
                        Ok(()),
                        LogType::Redemption,
                        format!("Returned {:?} to strategy {}.", amounts, key),
                    );
                }
                Err(err) => {
                    journal.append_note(
                        Err(err),
                        LogType::Redemption,
                        format!("{:?} pulled from strategy {} stays idle.", amounts, key),
                    );
                }
            }
        }
    }

    // Deployment

    /// Checks the gate and, if it is open, deploys idle funds to every deployable
    /// strategy by weight. Per-strategy failures are recorded in the report.
    fn run_deployment(
        &mut self,
        forced: bool,
        journal: &mut JournalCollection,
    ) -> VaultResult<Option<DeploymentReport>> {
        let now = self.now();
        let idle_value = nav::idle_value(&self.idle, self.oracle.as_ref())?;
        let decision = self.scheduler.check(&GateInput {
            idle_value,
            threshold: self.config.deployment_threshold,
            now,
            min_interval: self.config.min_deployment_interval,
            has_deployable: self.registry.has_deployable(),
            forced,
        });
        if !decision.is_ready() {
            journal.append_note(
                Ok(()),
                LogType::Deployment,
                format!("Deployment skipped: {:?}.", decision),
            );
            return Ok(None);
        }

        self.scheduler.begin()?;
        let report = match self.deploy_all(now, forced, journal) {
            Ok(report) => report,
            Err(err) => {
                self.scheduler.abort();
                return Err(err);
            }
        };
        // A pass where every strategy failed does not restart the interval
        if report.pushed_funds() {
            self.scheduler.finish(now);
        } else {
            self.scheduler.abort();
        }

        self.last_deployment_report = Some(report.clone());
        Ok(Some(report))
    }

    fn deploy_all(
        &mut self,
        now: u64,
        forced: bool,
        journal: &mut JournalCollection,
    ) -> VaultResult<DeploymentReport> {
        let allocations = allocate(&self.idle, &self.registry.deployable())?;
        let deadline = self.deadline();
        let rebalancer = Rebalancer::new(
            self.oracle.as_ref(),
            self.swap.as_ref(),
            self.clock.as_ref(),
            self.config.max_slippage_bps,
        );

        let mut report = DeploymentReport {
            started_at: now,
            forced,
            deployments: Vec::with_capacity(allocations.len()),
        };
        for (key, requested) in allocations {
            if requested.is_zero() {
                continue;
            }
            let entry = self.registry.get_mut(key)?;
            let result = rebalancer.deploy(
                entry.strategy.as_mut(),
                &mut self.idle,
                requested,
                deadline,
                journal,
            );
            match &result {
                Ok(deployment) => {
                    entry.data.last_deployment_at(now);
                    journal.append_note(
                        Ok(()),
                        LogType::Deployment,
                        format!(
                            "Strategy {} took {:?} of {:?}.",
                            key,
                            deployment.consumed(),
                            requested
                        ),
                    );
                }
                Err(err) => {
                    journal.append_note(
                        Err(err.clone()),
                        LogType::Deployment,
                        format!("Deployment of {:?} to strategy {} failed.", requested, key),
                    );
                }
            }
            report.deployments.push(StrategyDeployment {
                strategy: key,
                result,
            });
        }
        Ok(report)
    }

    /// Runs a deployment pass regardless of the time since the last one. The threshold
    /// and the strategy requirement still apply; `None` means the gate stayed shut.
    pub fn force_deployment(&mut self) -> VaultResult<Option<DeploymentReport>> {
        let mut journal = JournalCollection::open(self.now(), None);
        let result = self
            .ensure_functional()
            .and_then(|_| self.run_deployment(true, &mut journal));
        if let Ok(Some(_)) = &result {
            self.refresh_last_known(&mut journal);
        }
        journal.append_note(
            result.as_ref().map(|_| ()).map_err(Clone::clone),
            LogType::Operator,
            "Forced deployment pass.",
        );
        self.commit(journal);
        result
    }

    /// Stores the current fresh strategy values as their last known ones, so a later
    /// reporting failure falls back to what the strategies held after this operation
    fn refresh_last_known(&mut self, journal: &mut JournalCollection) {
        let now = self.now();
        let result = self
            .nav_report()
            .and_then(|report| nav::record(&report, &mut self.registry, now));
        if let Err(err) = result {
            journal.append_note(
                Err(err),
                LogType::Valuation,
                "Could not refresh last known strategy values.",
            );
        }
    }

    // Operator surface

    fn operator_action<T, F>(
        &mut self,
        strategy: Option<StrategyId>,
        note: String,
        action: F,
    ) -> VaultResult<T>
    where
        F: FnOnce(&mut Self, &mut JournalCollection) -> VaultResult<T>,
    {
        let mut journal = JournalCollection::open(self.now(), strategy);
        let result = action(self, &mut journal);
        journal.append_note(
            result.as_ref().map(|_| ()).map_err(Clone::clone),
            LogType::Operator,
            note,
        );
        self.commit(journal);
        result
    }

    pub fn register_strategy<S: AsRef<str>>(
        &mut self,
        name: S,
        weight_bps: u64,
        strategy: Box<dyn Strategy>,
    ) -> VaultResult<StrategyId> {
        let note = format!("Register strategy {} at {} bps.", name.as_ref(), weight_bps);
        self.operator_action(None, note, |vault, _| {
            vault.registry.register(name, weight_bps, strategy)
        })
    }

    /// Removes a strategy; refused with `StrategyNotRemovable` while it holds anything
    pub fn deregister_strategy(&mut self, key: StrategyId) -> VaultResult<()> {
        self.operator_action(Some(key), format!("Deregister strategy {}.", key), |vault, _| {
            vault.registry.remove(key).map(|_| ())
        })
    }

    pub fn set_strategy_weight(&mut self, key: StrategyId, weight_bps: u64) -> VaultResult<()> {
        let note = format!("Set weight of strategy {} to {} bps.", key, weight_bps);
        self.operator_action(Some(key), note, |vault, _| {
            vault.registry.set_weight(key, weight_bps)
        })
    }

    /// Withdraws a strategy's whole position and loose balance back to idle
    pub fn sweep_strategy(&mut self, key: StrategyId) -> VaultResult<AssetAmounts> {
        self.operator_action(Some(key), format!("Sweep strategy {}.", key), |vault, _| {
            vault.sweep(key)
        })
    }

    fn sweep(&mut self, key: StrategyId) -> VaultResult<AssetAmounts> {
        let deadline = self.deadline();
        let now = self.now();
        let entry = self.registry.get_mut(key)?;
        let swept = entry.strategy.withdraw_all(deadline)?;
        entry.data.last_known_value(U256::ZERO, now);
        self.idle = self.idle.checked_add(&swept)?;
        Ok(swept)
    }

    /// Sweeps the strategy, then takes it out of NAV and deployment passes
    pub fn deactivate_strategy(&mut self, key: StrategyId) -> VaultResult<AssetAmounts> {
        self.operator_action(Some(key), format!("Deactivate strategy {}.", key), |vault, _| {
            let swept = vault.sweep(key)?;
            vault.registry.set_active(key, false)?;
            Ok(swept)
        })
    }

    pub fn activate_strategy(&mut self, key: StrategyId) -> VaultResult<()> {
        self.operator_action(Some(key), format!("Activate strategy {}.", key), |vault, _| {
            vault.registry.set_active(key, true)
        })
    }

    pub fn set_deployment_threshold(&mut self, threshold: U256) -> VaultResult<()> {
        let note = format!("Set deployment threshold to {}.", threshold);
        self.operator_action(None, note, |vault, _| {
            vault.config.deployment_threshold(threshold);
            Ok(())
        })
    }

    pub fn set_min_deployment_interval(&mut self, seconds: u64) -> VaultResult<()> {
        let note = format!("Set minimum deployment interval to {}s.", seconds);
        self.operator_action(None, note, |vault, _| {
            vault.config.min_deployment_interval(seconds);
            Ok(())
        })
    }

    pub fn set_max_slippage_bps(&mut self, max_slippage_bps: u64) -> VaultResult<()> {
        let note = format!("Set slippage bound to {} bps.", max_slippage_bps);
        self.operator_action(None, note, |vault, _| {
            let mut config = vault.config.clone();
            config.max_slippage_bps(max_slippage_bps).validate()?;
            vault.config = config;
            Ok(())
        })
    }

    /// Replaces the whole configuration
    pub fn update_config(&mut self, config: VaultConfig) -> VaultResult<()> {
        self.operator_action(None, "Update configuration.".to_string(), |vault, _| {
            config.validate()?;
            vault.journal.set_capacity(config.journal_capacity);
            vault.config = config;
            Ok(())
        })
    }

    /// Stops deposits and deployment passes. Redemptions stay open.
    pub fn pause(&mut self, message: Option<String>) -> VaultResult<()> {
        let now = self.now();
        self.operator_action(None, format!("Pause: {:?}.", message), |vault, _| {
            vault.halt.pause(now, message);
            Ok(())
        })
    }

    pub fn unpause(&mut self) -> VaultResult<()> {
        self.operator_action(None, "Unpause.".to_string(), |vault, _| {
            vault.halt.unpause();
            Ok(())
        })
    }

    // Reads

    /// Aggregated NAV with one line per active strategy
    pub fn nav_report(&self) -> VaultResult<NavReport> {
        nav::aggregate(&self.idle, &self.registry, self.oracle.as_ref())
    }

    pub fn total_assets(&self) -> VaultResult<U256> {
        Ok(self.nav_report()?.total)
    }

    /// Value of one share scaled by `SCALE`. An empty vault prices a share at one unit.
    pub fn share_price(&self) -> VaultResult<U256> {
        let total_shares = self.ledger.total_shares();
        if total_shares.is_zero() {
            return Ok(scale());
        }
        mul_div(self.total_assets()?, scale(), total_shares)
    }

    /// Shares a deposit would be issued right now
    pub fn preview_mint(&self, deposit: &AssetAmounts) -> VaultResult<U256> {
        let nav_before = self.total_assets()?;
        let deposit_value = nav::idle_value(deposit, self.oracle.as_ref())?;
        self.ledger.shares_for_deposit(deposit_value, nav_before)
    }

    /// Value `shares` would redeem for right now
    pub fn preview_burn(&self, shares: U256) -> VaultResult<U256> {
        self.ledger.value_of_shares(shares, self.total_assets()?)
    }

    pub fn balance_of(&self, holder: &Address) -> U256 {
        self.ledger.balance_of(holder)
    }

    pub fn idle(&self) -> AssetAmounts {
        self.idle
    }

    pub fn total_shares(&self) -> U256 {
        self.ledger.total_shares()
    }

    pub fn last_deployment_timestamp(&self) -> u64 {
        self.scheduler.last_deployment_timestamp()
    }

    pub fn last_deployment_report(&self) -> Option<&DeploymentReport> {
        self.last_deployment_report.as_ref()
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn halt(&self) -> &Halt {
        &self.halt
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Query view for external callers
    pub fn query(&self) -> VaultResult<VaultQuery> {
        let report = self.nav_report()?;
        Ok(VaultQuery::new(
            &self.idle,
            &self.ledger.total_shares(),
            &report,
            self.scheduler.last_deployment_timestamp(),
            !self.halt.is_functional(),
        ))
    }
}

/// Records every stale strategy of a NAV report
fn journal_stale(journal: &mut JournalCollection, report: &NavReport) {
    for valuation in &report.strategies {
        if let ValuationStatus::Stale(err) = &valuation.status {
            journal.append_note(
                Err(err.clone()),
                LogType::Valuation,
                format!(
                    "Strategy {} priced at its last known value {}.",
                    valuation.strategy, valuation.value
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::providers::{MockLiquidityVenue, MockSwapExecutor};
    use crate::strategy::{LiquidityPosition, LiquidityStrategy, Strategy};
    use crate::testing::{amounts, FakeOracle, FakeSwap, FakeVenue};
    use alloy_primitives::address;
    use candid::Nat;
    use proptest::prelude::*;

    const ALICE: Address = address!("00000000000000000000000000000000000000a1");
    const BOB: Address = address!("00000000000000000000000000000000000000b0");

    struct Harness {
        oracle: Arc<FakeOracle>,
        swap: Arc<FakeSwap>,
        clock: Arc<ManualClock>,
        vault: Vault,
    }

    fn harness(threshold: u64) -> Harness {
        let oracle = Arc::new(FakeOracle::unit_prices());
        let clock = Arc::new(ManualClock::new(10_000));
        let swap = Arc::new(FakeSwap::new(oracle.clone(), clock.clone()));
        let mut config = VaultConfig::default();
        config
            .deployment_threshold(U256::from(threshold))
            .min_deployment_interval(600)
            .max_slippage_bps(100)
            .external_call_timeout(60);
        let vault = Vault::new(
            config,
            Collaborators {
                oracle: oracle.clone(),
                swap: swap.clone(),
                clock: clock.clone(),
            },
        )
        .unwrap();
        Harness {
            oracle,
            swap,
            clock,
            vault,
        }
    }

    fn add_venue(h: &mut Harness, weight_bps: u64) -> (StrategyId, FakeVenue) {
        let venue = FakeVenue::new(amounts(1_000_000, 1_000_000));
        let strategy = LiquidityStrategy::new(Box::new(venue.clone()));
        let key = h
            .vault
            .register_strategy("pool", weight_bps, Box::new(strategy))
            .unwrap();
        (key, venue)
    }

    #[test]
    fn test_round_trip_without_strategies_is_exact() {
        let mut h = harness(u64::MAX);
        let receipt = h.vault.mint(ALICE, amounts(123, 457)).unwrap();
        assert_eq!(receipt.shares_issued, U256::from(580u64));
        assert_eq!(receipt.deployment, None);

        let burn = h.vault.burn(ALICE, receipt.shares_issued).unwrap();
        assert_eq!(burn.paid, amounts(123, 457));
        assert_eq!(h.vault.idle(), AssetAmounts::zero());
        assert_eq!(h.vault.total_shares(), U256::ZERO);
    }

    #[test]
    fn test_mint_uses_nav_before_the_deposit() {
        let mut h = harness(u64::MAX);
        h.vault.mint(ALICE, amounts(100, 100)).unwrap();
        // Value doubles outside of any deposit
        h.oracle.set_prices(3, 1);

        let receipt = h.vault.mint(BOB, amounts(100, 100)).unwrap();
        // NAV before: 300 + 100 = 400 for 200 shares; deposit worth 400 -> 200 shares
        assert_eq!(receipt.shares_issued, U256::from(200u64));
        assert_eq!(h.vault.preview_burn(U256::from(200u64)).unwrap(), U256::from(400u64));
    }

    #[test]
    fn test_zero_and_paused_deposits_are_refused() {
        let mut h = harness(u64::MAX);
        assert_eq!(
            h.vault.mint(ALICE, AssetAmounts::zero()),
            Err(VaultError::ZeroDeposit)
        );

        h.vault.mint(ALICE, amounts(10, 10)).unwrap();
        h.vault.pause(Some("incident".to_string())).unwrap();
        assert_eq!(h.vault.mint(BOB, amounts(1, 1)), Err(VaultError::VaultPaused));
        assert_eq!(h.vault.force_deployment(), Err(VaultError::VaultPaused));

        // Redemptions stay open
        assert!(h.vault.burn(ALICE, U256::from(20u64)).is_ok());
        h.vault.unpause().unwrap();
        assert!(h.vault.mint(BOB, amounts(1, 1)).is_ok());
    }

    #[test]
    fn test_burn_more_than_owned_is_refused() {
        let mut h = harness(u64::MAX);
        h.vault.mint(ALICE, amounts(10, 0)).unwrap();
        assert_eq!(
            h.vault.burn(BOB, U256::from(1u64)),
            Err(VaultError::InsufficientShares)
        );
        assert_eq!(
            h.vault.burn(ALICE, U256::from(11u64)),
            Err(VaultError::InsufficientShares)
        );
    }

    #[test]
    fn test_threshold_gating_scenario() {
        let mut h = harness(100);
        let (key, venue) = add_venue(&mut h, 10_000);

        assert!(h.vault.mint(ALICE, amounts(20, 20)).unwrap().deployment.is_none());
        assert!(h.vault.mint(ALICE, amounts(20, 20)).unwrap().deployment.is_none());
        assert_eq!(venue.deposit_count(), 0);

        let receipt = h.vault.mint(BOB, amounts(15, 15)).unwrap();
        let report = receipt.deployment.expect("110 crosses the threshold of 100");
        assert_eq!(report.deployments.len(), 1);
        assert_eq!(report.deployments[0].strategy, key);
        assert!(report.failures().is_empty());
        assert_eq!(h.vault.idle(), AssetAmounts::zero());
        assert_eq!(h.vault.last_deployment_timestamp(), h.clock.now());
        assert_eq!(h.vault.total_assets().unwrap(), U256::from(110u64));
    }

    #[test]
    fn test_interval_gate_and_forced_pass() {
        let mut h = harness(10);
        let (_, venue) = add_venue(&mut h, 5_000);

        h.vault.mint(ALICE, amounts(100, 100)).unwrap();
        assert_eq!(venue.deposit_count(), 1);

        // Within the interval: the deposit stays idle
        h.clock.advance(60);
        let receipt = h.vault.mint(ALICE, amounts(100, 100)).unwrap();
        assert!(receipt.deployment.is_none());
        assert_eq!(h.vault.idle(), amounts(150, 150));

        let report = h.vault.force_deployment().unwrap().unwrap();
        assert!(report.forced);
        assert_eq!(venue.deposit_count(), 2);
        assert_eq!(h.vault.idle(), amounts(75, 75));

        // Forcing does not bypass the threshold
        h.vault.set_deployment_threshold(U256::from(1_000u64)).unwrap();
        assert_eq!(h.vault.force_deployment().unwrap(), None);
    }

    #[test]
    fn test_weighted_split_keeps_remainder_idle() {
        let mut h = harness(1);
        let (first, _) = add_venue(&mut h, 6_000);
        let (second, _) = add_venue(&mut h, 2_000);

        h.vault.mint(ALICE, amounts(500, 500)).unwrap();

        let report = h.vault.last_deployment_report().unwrap();
        let consumed: Vec<_> = report
            .deployments
            .iter()
            .map(|d| (d.strategy, d.result.clone().unwrap().consumed()))
            .collect();
        assert_eq!(
            consumed,
            vec![(first, amounts(300, 300)), (second, amounts(100, 100))]
        );
        assert_eq!(h.vault.idle(), amounts(100, 100));
        assert_eq!(h.vault.total_assets().unwrap(), U256::from(1_000u64));
    }

    #[test]
    fn test_failed_strategy_does_not_roll_back_others() {
        let mut h = harness(1);
        let (_, good) = add_venue(&mut h, 5_000);
        let (bad_key, bad) = add_venue(&mut h, 5_000);
        bad.set_reject(true);

        let receipt = h.vault.mint(ALICE, amounts(200, 200)).unwrap();
        let report = receipt.deployment.unwrap();

        assert_eq!(good.deposit_count(), 1);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].0, bad_key);
        assert_eq!(h.vault.idle(), amounts(100, 100), "Undeployed share stays idle");
        assert_eq!(h.vault.total_assets().unwrap(), U256::from(400u64));
        assert!(h.vault.journal().last().unwrap().has_errors());
    }

    #[test]
    fn test_partial_acceptance_returns_leftovers_to_idle() {
        let mut h = harness(1);
        let (_, venue) = add_venue(&mut h, 10_000);
        venue.set_accept_bps(7_500);

        h.vault.mint(ALICE, amounts(400, 0)).unwrap();

        let report = h.vault.last_deployment_report().unwrap();
        let result = report.deployments[0].result.clone().unwrap();
        assert!(result.is_conserved());
        assert_eq!(result.consumed(), amounts(150, 150));
        assert_eq!(h.vault.idle(), amounts(50, 50));
        assert_eq!(h.swap.swap_count(), 1);
        assert_eq!(h.vault.total_assets().unwrap(), U256::from(400u64));
    }

    #[test]
    fn test_slippage_breach_leaves_idle_untouched() {
        let mut h = harness(1);
        let (_, venue) = add_venue(&mut h, 10_000);
        h.swap.set_impact_bps(300);

        let receipt = h.vault.mint(ALICE, amounts(400, 0)).unwrap();

        let failures = receipt.deployment.unwrap().failures();
        assert_eq!(failures[0].1, VaultError::SlippageExceeded);
        assert_eq!(venue.deposit_count(), 0);
        assert_eq!(h.vault.idle(), amounts(400, 0));
    }

    #[test]
    fn test_stalled_venue_hits_the_deadline() {
        let mut h = harness(1);
        let (_, venue) = add_venue(&mut h, 10_000);
        venue.set_clock(h.clock.clone(), 3_600);

        let receipt = h.vault.mint(ALICE, amounts(50, 50)).unwrap();

        let failures = receipt.deployment.unwrap().failures();
        assert_eq!(failures[0].1, VaultError::DeadlineExceeded);
        assert_eq!(h.vault.idle(), amounts(50, 50));
    }

    #[test]
    fn test_redemption_pulls_from_strategies_in_registry_order() {
        let mut h = harness(1);
        let (first, first_venue) = add_venue(&mut h, 5_000);
        let (_second, second_venue) = add_venue(&mut h, 5_000);
        h.vault.mint(ALICE, amounts(100, 100)).unwrap();
        h.vault.set_deployment_threshold(U256::MAX).unwrap();
        h.vault.mint(BOB, amounts(10, 10)).unwrap();
        assert_eq!(h.vault.idle(), amounts(10, 10));

        let burn = h.vault.burn(ALICE, U256::from(100u64)).unwrap();

        // 100 owed, 20 idle: 80 pulled from the first strategy only
        assert_eq!(burn.pulled_from_strategies, amounts(40, 40));
        assert_eq!(burn.paid.a + burn.paid.b, U256::from(100u64));
        assert!(first_venue.reserves().a < second_venue.reserves().a);
        assert!(h.vault.registry().get(first).is_ok());
        assert_eq!(h.vault.total_assets().unwrap(), U256::from(120u64));
        // 10 of 50 units left, worth 20
        assert_eq!(
            h.vault.registry().get(first).unwrap().data.last_known_value,
            U256::from(20u64)
        );
    }

    #[test]
    fn test_failed_withdrawal_hands_pulled_funds_back() {
        let mut h = harness(1);
        let (first, _) = add_venue(&mut h, 5_000);
        let (_, second_venue) = add_venue(&mut h, 5_000);
        h.vault.mint(ALICE, amounts(100, 100)).unwrap();
        assert_eq!(h.vault.idle(), AssetAmounts::zero());
        second_venue.set_reject(true);

        let before = h.vault.snapshot();
        let result = h.vault.burn(ALICE, U256::from(200u64));

        assert_eq!(result, Err(VaultError::InsufficientLiquidity));
        assert_eq!(h.vault.snapshot(), before);
        assert_eq!(h.vault.idle(), AssetAmounts::zero());
        assert_eq!(h.vault.balance_of(&ALICE), U256::from(200u64));
        assert_eq!(
            h.vault
                .registry()
                .get(first)
                .unwrap()
                .strategy
                .current_holdings()
                .unwrap(),
            amounts(50, 50)
        );
        assert_eq!(h.vault.total_assets().unwrap(), U256::from(200u64));

        second_venue.set_reject(false);
        assert!(h.vault.burn(ALICE, U256::from(200u64)).is_ok());
    }

    #[test]
    fn test_unreported_strategy_keeps_its_post_deployment_value() {
        let mut h = harness(1);
        let (key, venue) = add_venue(&mut h, 5_000);
        h.vault.mint(ALICE, amounts(100, 100)).unwrap();
        assert_eq!(
            h.vault.registry().get(key).unwrap().data.last_known_value,
            U256::from(100u64)
        );

        venue.set_unpriced(true);
        let report = h.vault.nav_report().unwrap();
        assert!(matches!(report.strategies[0].status, ValuationStatus::Stale(_)));
        assert_eq!(report.total, U256::from(200u64));

        let receipt = h.vault.mint(BOB, amounts(100, 100)).unwrap();
        assert_eq!(receipt.shares_issued, U256::from(200u64));
        assert_eq!(h.vault.balance_of(&ALICE), h.vault.balance_of(&BOB));
    }

    #[test]
    fn test_pass_without_funds_moved_keeps_the_interval_open() {
        let mut h = harness(1);
        let (_, venue) = add_venue(&mut h, 10_000);
        venue.set_reject(true);

        let receipt = h.vault.mint(ALICE, amounts(100, 100)).unwrap();
        assert_eq!(receipt.deployment.unwrap().failures().len(), 1);
        assert_eq!(h.vault.last_deployment_timestamp(), 0);

        venue.set_reject(false);
        h.clock.advance(60);
        let report = h.vault.mint(BOB, amounts(10, 10)).unwrap().deployment.unwrap();
        assert!(report.failures().is_empty());
        assert_eq!(h.vault.idle(), AssetAmounts::zero());
        assert_eq!(h.vault.last_deployment_timestamp(), h.clock.now());
    }

    #[test]
    fn test_redemption_shortfall_changes_nothing() {
        let mut h = harness(1);
        let (_, venue) = add_venue(&mut h, 10_000);
        h.vault.mint(ALICE, amounts(100, 100)).unwrap();
        venue.set_locked_bps(5_000);

        let before = h.vault.snapshot();
        let result = h.vault.burn(ALICE, U256::from(200u64));

        assert_eq!(result, Err(VaultError::InsufficientLiquidity));
        assert_eq!(h.vault.snapshot(), before);
        assert_eq!(h.vault.balance_of(&ALICE), U256::from(200u64));

        // Half of the position is liquid
        assert!(h.vault.burn(ALICE, U256::from(100u64)).is_ok());
    }

    #[test]
    fn test_strategy_removal_guard() {
        let mut h = harness(1);
        let (key, _) = add_venue(&mut h, 10_000);
        h.vault.mint(ALICE, amounts(100, 100)).unwrap();

        assert_eq!(
            h.vault.deregister_strategy(key),
            Err(VaultError::StrategyNotRemovable)
        );

        let swept = h.vault.sweep_strategy(key).unwrap();
        assert_eq!(swept, amounts(100, 100));
        assert_eq!(h.vault.idle(), amounts(100, 100));
        assert!(h.vault.deregister_strategy(key).is_ok());
        assert!(h.vault.registry().is_empty());
        assert_eq!(h.vault.total_assets().unwrap(), U256::from(200u64));
    }

    #[test]
    fn test_deactivation_sweeps_first() {
        let mut h = harness(1);
        let (key, _) = add_venue(&mut h, 10_000);
        h.vault.mint(ALICE, amounts(100, 100)).unwrap();

        h.vault.deactivate_strategy(key).unwrap();

        assert!(!h.vault.registry().get(key).unwrap().settings.active);
        assert_eq!(h.vault.idle(), amounts(100, 100));
        assert_eq!(h.vault.total_assets().unwrap(), U256::from(200u64));
        h.vault.activate_strategy(key).unwrap();
        assert!(h.vault.registry().get(key).unwrap().settings.active);
    }

    #[test]
    fn test_stale_strategy_is_flagged_not_zeroed() {
        let h = harness(u64::MAX);
        let mut venue = MockLiquidityVenue::new();
        venue
            .expect_total_position_value()
            .returning(|_| Err(VaultError::StaleValuation("venue feed".to_string())));
        let strategy = LiquidityStrategy::from_position(
            Box::new(venue),
            &LiquidityPosition {
                position_units: Nat::from(5u64),
                held_a: Nat::from(0u64),
                held_b: Nat::from(0u64),
            },
        )
        .unwrap();
        let stable = {
            let mut snapshot = h.vault.snapshot();
            let mut entry = StableStrategy::default();
            let mut settings = crate::strategy::StrategySettings::default();
            settings.key(0).name("stale").weight_bps(0).active(true);
            let mut data = StrategyData::default();
            data.last_known_value(U256::from(50u64), 1);
            entry.settings(settings).data(&data);
            snapshot.strategies.push(entry);
            snapshot
        };
        let mut strategy = Some(Box::new(strategy) as Box<dyn Strategy>);
        let mut vault = Vault::restore(
            &stable,
            Collaborators {
                oracle: h.oracle.clone(),
                swap: h.swap.clone(),
                clock: h.clock.clone(),
            },
            |_| strategy.take().ok_or(VaultError::NonExistentValue),
        )
        .unwrap();

        let report = vault.nav_report().unwrap();
        assert_eq!(report.total, U256::from(50u64));
        assert!(matches!(report.strategies[0].status, ValuationStatus::Stale(_)));

        // Minting still works against the last known value
        vault.mint(ALICE, amounts(25, 25)).unwrap();
        assert_eq!(vault.query().unwrap().stale_strategies, vec![0]);
        assert!(vault
            .journal()
            .iter()
            .flat_map(|collection| collection.entries.iter())
            .any(|entry| entry.log_type == LogType::Valuation));
    }

    #[test]
    fn test_stale_idle_price_blocks_mint() {
        let mut h = harness(u64::MAX);
        h.vault.mint(ALICE, amounts(10, 10)).unwrap();
        h.oracle.set_stale(true);
        assert!(matches!(
            h.vault.mint(BOB, amounts(10, 10)),
            Err(VaultError::StaleValuation(_))
        ));
        assert_eq!(h.vault.total_shares(), U256::from(20u64));
    }

    #[test]
    fn test_share_price_and_previews() {
        let mut h = harness(u64::MAX);
        assert_eq!(h.vault.share_price().unwrap(), scale());

        h.vault.mint(ALICE, amounts(100, 100)).unwrap();
        h.oracle.set_prices(2, 2);
        assert_eq!(h.vault.share_price().unwrap(), U256::from(2u64) * scale());
        assert_eq!(
            h.vault.preview_mint(&amounts(10, 0)).unwrap(),
            U256::from(10u64)
        );
        assert_eq!(
            h.vault.preview_burn(U256::from(50u64)).unwrap(),
            U256::from(100u64)
        );
    }

    #[test]
    fn test_operator_settings_are_validated_and_journaled() {
        let mut h = harness(1);
        let (key, _) = add_venue(&mut h, 4_000);

        assert!(matches!(
            h.vault.set_strategy_weight(key, 10_001),
            Err(VaultError::InvalidConfiguration(_))
        ));
        assert!(h.vault.set_max_slippage_bps(10_000).is_err());
        assert_eq!(h.vault.config().max_slippage_bps, 100);
        h.vault.set_min_deployment_interval(5).unwrap();
        assert_eq!(h.vault.config().min_deployment_interval, 5);

        let last = h.vault.journal().last().unwrap();
        assert_eq!(last.entries[0].log_type, LogType::Operator);
        assert_eq!(h.vault.journal().for_strategy(key).len(), 1);
        assert_eq!(
            h.vault.deregister_strategy(99),
            Err(VaultError::NonExistentValue)
        );
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let mut h = harness(1);
        let (_, venue) = add_venue(&mut h, 5_000);
        h.vault.mint(ALICE, amounts(300, 100)).unwrap();
        h.vault.mint(BOB, amounts(50, 50)).unwrap();
        h.vault.pause(None).unwrap();

        let bytes = h.vault.snapshot().to_bytes().unwrap();
        let stable = StableVault::from_bytes(&bytes).unwrap();

        let position = {
            let entry = h.vault.registry().get(0).unwrap();
            let value = entry.strategy.current_holdings().unwrap();
            assert!(!value.is_zero());
            value
        };
        let restored_venue = venue.clone();

        let restored = Vault::restore(
            &stable,
            Collaborators {
                oracle: h.oracle.clone(),
                swap: h.swap.clone(),
                clock: h.clock.clone(),
            },
            |_| {
                let mut strategy = LiquidityStrategy::new(Box::new(restored_venue.clone()));
                strategy.credit_held(position)?;
                Ok(Box::new(strategy) as Box<dyn Strategy>)
            },
        )
        .unwrap();

        assert_eq!(restored.idle(), h.vault.idle());
        assert_eq!(restored.total_shares(), h.vault.total_shares());
        assert_eq!(restored.balance_of(&BOB), h.vault.balance_of(&BOB));
        assert_eq!(
            restored.last_deployment_timestamp(),
            h.vault.last_deployment_timestamp()
        );
        assert!(!restored.halt().is_functional());
        assert_eq!(restored.snapshot(), h.vault.snapshot());
    }

    #[test]
    fn test_restore_rejects_inconsistent_supply() {
        let mut h = harness(u64::MAX);
        h.vault.mint(ALICE, amounts(10, 10)).unwrap();
        let mut stable = h.vault.snapshot();
        stable.total_shares = Nat::from(21u64);

        let result = Vault::restore(
            &stable,
            Collaborators {
                oracle: h.oracle.clone(),
                swap: h.swap.clone(),
                clock: h.clock.clone(),
            },
            |_| Err(VaultError::NonExistentValue),
        );
        assert!(matches!(result, Err(VaultError::DecodingError(_))));
    }

    #[test]
    fn test_swap_failure_is_recorded_per_strategy() {
        let oracle = Arc::new(FakeOracle::unit_prices());
        let clock = Arc::new(ManualClock::new(10_000));
        let mut swap = MockSwapExecutor::new();
        swap.expect_quote().returning(|_, _, amount| Ok(amount));
        swap.expect_swap()
            .returning(|_, _, _, _, _| Err(VaultError::VenueRejected("no route".to_string())));
        let mut config = VaultConfig::default();
        config.deployment_threshold(U256::from(1u64));
        let mut vault = Vault::new(
            config,
            Collaborators {
                oracle,
                swap: Arc::new(swap),
                clock,
            },
        )
        .unwrap();
        let venue = FakeVenue::new(amounts(1_000, 1_000));
        vault
            .register_strategy("pool", 10_000, Box::new(LiquidityStrategy::new(Box::new(venue))))
            .unwrap();

        let receipt = vault.mint(ALICE, amounts(100, 0)).unwrap();

        assert!(matches!(
            receipt.deployment.unwrap().failures()[0].1,
            VaultError::VenueRejected(_)
        ));
        assert_eq!(vault.idle(), amounts(100, 0));
    }

    proptest! {
        #[test]
        fn test_share_price_is_not_diluted_by_mint_and_burn(
            ops in proptest::collection::vec((any::<bool>(), 1_000u64..1_000_000, 0u64..1_000_000), 1..20)
        ) {
            let mut h = harness(u64::MAX);
            h.vault.mint(ALICE, amounts(1_000, 1_000)).unwrap();
            let price = h.vault.share_price().unwrap();

            for (is_mint, a, b) in ops {
                if is_mint {
                    h.vault.mint(BOB, amounts(a, b)).unwrap();
                } else {
                    let shares = h.vault.balance_of(&BOB).min(U256::from(a));
                    h.vault.burn(BOB, shares).unwrap();
                }
                // Rounding favours the vault, so the price can only stay or creep up
                prop_assert!(h.vault.share_price().unwrap() >= price);
            }
        }

        #[test]
        fn test_deployments_preserve_total_assets(
            a in 1u64..1_000_000,
            b in 0u64..1_000_000,
            accept_bps in 0u64..=10_000,
            weight in 1u64..=10_000,
        ) {
            let mut h = harness(1);
            let (_, venue) = add_venue(&mut h, weight);
            venue.set_accept_bps(accept_bps);

            h.vault.mint(ALICE, amounts(a, b)).unwrap();
            let first = h.vault.total_assets().unwrap();
            let second = h.vault.total_assets().unwrap();

            prop_assert_eq!(first, second);
            prop_assert!(first <= U256::from(a + b));
            if let Some(report) = h.vault.last_deployment_report() {
                for deployment in &report.deployments {
                    if let Ok(result) = &deployment.result {
                        prop_assert!(result.is_conserved());
                    }
                }
            }
        }
    }
}
