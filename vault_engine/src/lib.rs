mod clock;
mod config;
mod constants;
mod guard;
mod halt;
mod journal;
mod ledger;
mod nav;
mod providers;
mod rebalancer;
mod registry;
mod scheduler;
mod shared;
mod state;
mod strategy;
mod types;
mod utils;
mod vault;

#[cfg(test)]
mod testing;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{VaultConfig, VaultConfigInput};
pub use constants::{BPS_DENOMINATOR, SCALE};
pub use halt::{Halt, HaltStatus};
pub use journal::{Journal, JournalCollection, JournalEntry, LogType};
pub use providers::{LiquidityVenue, SwapExecutor, ValuationOracle, VenueDeposit};
pub use rebalancer::{plan_ratio_match, RatioPlan, SwapLeg};
pub use registry::{StrategyEntry, StrategyRegistry};
pub use scheduler::{GateDecision, SchedulerState};
pub use shared::SharedVault;
pub use state::{StableBalance, StableStrategy, StableVault};
pub use strategy::{LiquidityPosition, LiquidityStrategy, Strategy, StrategyData, StrategySettings};
pub use types::*;
pub use utils::error::{VaultError, VaultResult};
pub use vault::{Collaborators, Vault};
