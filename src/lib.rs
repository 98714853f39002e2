// Autoraffle
// A time-gated raffle settled by verifiable randomness: players pay a fixed
// entrance fee into a pool, a permissionless upkeep call requests randomness
// from a VRF coordinator once the interval has elapsed, and the oracle's
// callback pays the full pool to one player and opens the next round.

pub mod error;
pub mod instruction;
pub mod processor;
pub mod state;
pub mod vrf;

#[cfg(not(feature = "no-entrypoint"))]
pub mod entrypoint;

use solana_program::{
    account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey,
};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::Processor::process(program_id, accounts, instruction_data)
}
