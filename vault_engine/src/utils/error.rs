use candid::CandidType;
use serde::Deserialize;

/// Vault engine result
pub type VaultResult<T> = Result<T, VaultError>;

/// Vault engine errors
#[derive(Clone, CandidType, Debug, Deserialize, PartialEq)]
pub enum VaultError {
    /// Both deposited amounts are zero, or they are worth zero shares
    ZeroDeposit,
    /// The vault is paused by the operator
    VaultPaused,
    /// The holder does not own enough shares
    InsufficientShares,
    /// A redemption could not be fully satisfied from idle funds and strategies
    InsufficientLiquidity,
    /// A swap quote breached the configured price impact bound
    SlippageExceeded,
    /// An external venue or swap executor reverted the call
    VenueRejected(String),
    /// The oracle or a strategy could not report a fresh value
    StaleValuation(String),
    /// A strategy still reports holdings and cannot be deregistered
    StrategyNotRemovable,
    /// A mutating call arrived while another one is in progress on the same vault
    ReentrantCall,
    /// A requested value does not exist
    NonExistentValue,
    /// Configuration values are out of bounds
    InvalidConfiguration(String),
    /// An external call was not started or not answered before its deadline
    DeadlineExceeded,
    /// A strategy broke the leftover reconciliation post-condition
    AccountingViolation(String),
    /// Arithmetic error
    Arithmetic(String),
    /// Decoding issue
    DecodingError(String),
    /// Unknown/Custom error
    Custom(String),
}

pub fn arithmetic_err<S: AsRef<str>>(s: S) -> VaultError {
    VaultError::Arithmetic(format!("{:#?}", s.as_ref()))
}
