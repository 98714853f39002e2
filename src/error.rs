// Autoraffle - Errors
use solana_program::{decode_error::DecodeError, program_error::ProgramError};
use thiserror::Error;

/// Errors that may be returned by the Autoraffle program
#[derive(Error, Debug, Copy, Clone, PartialEq)]
pub enum RaffleError {
    /// Invalid instruction data passed
    #[error("Invalid instruction data")]
    InvalidInstruction,

    /// Raffle account is already initialized
    #[error("Raffle already initialized")]
    AlreadyInitialized,

    /// Raffle account is not initialized
    #[error("Raffle not initialized")]
    NotInitialized,

    /// Entry payment is below the entrance fee
    #[error("Payment is below the entrance fee")]
    InsufficientPayment,

    /// Entries are only accepted while the raffle is open
    #[error("Raffle is not open")]
    RaffleNotOpen,

    /// The upkeep eligibility predicate does not hold
    #[error("Upkeep is not needed")]
    UpkeepNotNeeded,

    /// No pending randomness request matches the supplied request id
    #[error("No matching pending randomness request")]
    RequestNotFound,

    /// Prize payout could not be performed
    #[error("Prize transfer failed")]
    TransferFailed,

    /// Player list is at capacity for this round
    #[error("Raffle player list is full")]
    RaffleFull,

    /// Supplied winner account does not match the selected player
    #[error("Winner account does not match the selected player")]
    WinnerMismatch,

    /// Account does not match the configured oracle
    #[error("Account does not match the configured oracle")]
    OracleMismatch,

    /// Arithmetic overflow while accumulating the pool
    #[error("Amount overflow")]
    AmountOverflow,
}

impl From<RaffleError> for ProgramError {
    fn from(e: RaffleError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for RaffleError {
    fn type_of() -> &'static str {
        "Raffle Error"
    }
}
