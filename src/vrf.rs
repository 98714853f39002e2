// VRF coordinator integration for the Autoraffle program
use solana_program::{
    account_info::AccountInfo,
    entrypoint::ProgramResult,
    instruction::{AccountMeta, Instruction},
    msg,
    program::invoke,
};

use crate::error::RaffleError;
use crate::state::OracleConfig;

/// Instruction tag the coordinator understands for a random-words request
const REQUEST_RANDOM_WORDS_TAG: u8 = 1;

/// Submit a randomness request to the configured VRF coordinator.
///
/// The request carries the raffle's fixed oracle parameters plus the
/// request id the callback must echo back. Accounts: the raffle account
/// identifies the consumer, the payer funds whatever the coordinator
/// charges.
pub fn request_random_words<'a>(
    coordinator_info: &AccountInfo<'a>,
    raffle_info: &AccountInfo<'a>,
    payer_info: &AccountInfo<'a>,
    config: &OracleConfig,
    request_id: u64,
) -> ProgramResult {
    if coordinator_info.key != &config.coordinator {
        msg!("VRF coordinator account does not match the configured oracle");
        return Err(RaffleError::OracleMismatch.into());
    }

    let mut data = Vec::with_capacity(1 + 32 + 8 + 2 + 4 + 4 + 8);
    data.push(REQUEST_RANDOM_WORDS_TAG);
    data.extend_from_slice(&config.gas_lane);
    data.extend_from_slice(&config.subscription_id.to_le_bytes());
    data.extend_from_slice(&config.request_confirmations.to_le_bytes());
    data.extend_from_slice(&config.callback_gas_limit.to_le_bytes());
    data.extend_from_slice(&config.num_words.to_le_bytes());
    data.extend_from_slice(&request_id.to_le_bytes());

    invoke(
        &Instruction {
            program_id: config.coordinator,
            accounts: vec![
                AccountMeta::new_readonly(*raffle_info.key, false),
                AccountMeta::new_readonly(*payer_info.key, true),
            ],
            data,
        },
        &[
            raffle_info.clone(),
            payer_info.clone(),
            coordinator_info.clone(),
        ],
    )?;

    msg!("VRF randomness request submitted: request_id={}", request_id);
    Ok(())
}
