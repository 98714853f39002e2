// Autoraffle - Instructions
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};
use std::convert::TryInto;
use std::mem::size_of;

use crate::error::RaffleError;

#[derive(Clone, Debug, PartialEq)]
pub enum RaffleInstruction {
    /// Initialize a raffle with its immutable configuration
    ///
    /// Accounts expected:
    /// 0. `[signer]` The authority paying for and configuring the raffle
    /// 1. `[writable]` The raffle account, pre-created with `Raffle::LEN`
    ///    bytes and owned by this program
    /// 2. `[]` The VRF coordinator program randomness requests go to
    /// 3. `[]` The oracle authority allowed to deliver fulfillments
    Initialize {
        /// Minimum payment per entry, in lamports
        entrance_fee: u64,
        /// Seconds between settlements
        interval: i64,
        /// Gas lane identifier forwarded to the oracle
        gas_lane: [u8; 32],
        /// Oracle subscription funding the requests
        subscription_id: u64,
        /// Confirmations the oracle waits for before responding
        request_confirmations: u16,
        /// Compute budget granted to the callback
        callback_gas_limit: u32,
    },

    /// Enter the raffle by paying at least the entrance fee
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The entering player (pays the fee)
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The system program
    Enter {
        /// Payment attached to the entry, in lamports
        amount: u64,
    },

    /// Trigger settlement once the upkeep predicate holds (anyone may call)
    ///
    /// Accounts expected:
    /// 0. `[signer]` Any caller (the automation actor)
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The VRF coordinator program
    PerformUpkeep {},

    /// Deliver randomness for the outstanding request (oracle only)
    ///
    /// Accounts expected:
    /// 0. `[signer]` The configured oracle fulfillment authority
    /// 1. `[writable]` The raffle account
    /// 2. `[writable]` The selected winner's account
    FulfillRandomWords {
        /// Identifier of the request being fulfilled
        request_id: u64,
        /// Random words supplied by the oracle (at least one)
        random_words: Vec<u64>,
    },
}

impl RaffleInstruction {
    /// Unpacks a byte buffer into a RaffleInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (tag, rest) = input
            .split_first()
            .ok_or(RaffleError::InvalidInstruction)?;

        Ok(match tag {
            0 => {
                let (entrance_fee, rest) = Self::unpack_u64(rest)?;
                let (interval, rest) = Self::unpack_i64(rest)?;
                let (gas_lane, rest) = Self::unpack_bytes32(rest)?;
                let (subscription_id, rest) = Self::unpack_u64(rest)?;
                let (request_confirmations, rest) = Self::unpack_u16(rest)?;
                let (callback_gas_limit, _) = Self::unpack_u32(rest)?;
                Self::Initialize {
                    entrance_fee,
                    interval,
                    gas_lane,
                    subscription_id,
                    request_confirmations,
                    callback_gas_limit,
                }
            }
            1 => {
                let (amount, _) = Self::unpack_u64(rest)?;
                Self::Enter { amount }
            }
            2 => Self::PerformUpkeep {},
            3 => {
                let (request_id, rest) = Self::unpack_u64(rest)?;
                let (count, mut rest) = Self::unpack_u32(rest)?;
                if rest.len() < count as usize * 8 {
                    return Err(RaffleError::InvalidInstruction.into());
                }
                let mut random_words = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let (word, tail) = Self::unpack_u64(rest)?;
                    random_words.push(word);
                    rest = tail;
                }
                Self::FulfillRandomWords {
                    request_id,
                    random_words,
                }
            }
            _ => return Err(RaffleError::InvalidInstruction.into()),
        })
    }

    /// Packs a RaffleInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(size_of::<Self>());
        match self {
            Self::Initialize {
                entrance_fee,
                interval,
                gas_lane,
                subscription_id,
                request_confirmations,
                callback_gas_limit,
            } => {
                buf.push(0);
                buf.extend_from_slice(&entrance_fee.to_le_bytes());
                buf.extend_from_slice(&interval.to_le_bytes());
                buf.extend_from_slice(gas_lane);
                buf.extend_from_slice(&subscription_id.to_le_bytes());
                buf.extend_from_slice(&request_confirmations.to_le_bytes());
                buf.extend_from_slice(&callback_gas_limit.to_le_bytes());
            }
            Self::Enter { amount } => {
                buf.push(1);
                buf.extend_from_slice(&amount.to_le_bytes());
            }
            Self::PerformUpkeep {} => buf.push(2),
            Self::FulfillRandomWords {
                request_id,
                random_words,
            } => {
                buf.push(3);
                buf.extend_from_slice(&request_id.to_le_bytes());
                buf.extend_from_slice(&(random_words.len() as u32).to_le_bytes());
                for word in random_words {
                    buf.extend_from_slice(&word.to_le_bytes());
                }
            }
        }
        buf
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
        let value = input
            .get(..8)
            .and_then(|slice| slice.try_into().ok())
            .map(u64::from_le_bytes)
            .ok_or(RaffleError::InvalidInstruction)?;
        Ok((value, &input[8..]))
    }

    fn unpack_i64(input: &[u8]) -> Result<(i64, &[u8]), ProgramError> {
        let value = input
            .get(..8)
            .and_then(|slice| slice.try_into().ok())
            .map(i64::from_le_bytes)
            .ok_or(RaffleError::InvalidInstruction)?;
        Ok((value, &input[8..]))
    }

    fn unpack_u32(input: &[u8]) -> Result<(u32, &[u8]), ProgramError> {
        let value = input
            .get(..4)
            .and_then(|slice| slice.try_into().ok())
            .map(u32::from_le_bytes)
            .ok_or(RaffleError::InvalidInstruction)?;
        Ok((value, &input[4..]))
    }

    fn unpack_u16(input: &[u8]) -> Result<(u16, &[u8]), ProgramError> {
        let value = input
            .get(..2)
            .and_then(|slice| slice.try_into().ok())
            .map(u16::from_le_bytes)
            .ok_or(RaffleError::InvalidInstruction)?;
        Ok((value, &input[2..]))
    }

    fn unpack_bytes32(input: &[u8]) -> Result<([u8; 32], &[u8]), ProgramError> {
        let value: [u8; 32] = input
            .get(..32)
            .and_then(|slice| slice.try_into().ok())
            .ok_or(RaffleError::InvalidInstruction)?;
        Ok((value, &input[32..]))
    }
}

/// Create an initialize instruction
#[allow(clippy::too_many_arguments)]
pub fn initialize(
    program_id: &Pubkey,
    authority: &Pubkey,
    raffle_account: &Pubkey,
    vrf_coordinator: &Pubkey,
    fulfill_authority: &Pubkey,
    entrance_fee: u64,
    interval: i64,
    gas_lane: [u8; 32],
    subscription_id: u64,
    request_confirmations: u16,
    callback_gas_limit: u32,
) -> Instruction {
    let data = RaffleInstruction::Initialize {
        entrance_fee,
        interval,
        gas_lane,
        subscription_id,
        request_confirmations,
        callback_gas_limit,
    }
    .pack();

    let accounts = vec![
        AccountMeta::new(*authority, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new_readonly(*vrf_coordinator, false),
        AccountMeta::new_readonly(*fulfill_authority, false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

/// Create an enter instruction
pub fn enter(
    program_id: &Pubkey,
    player: &Pubkey,
    raffle_account: &Pubkey,
    amount: u64,
) -> Instruction {
    let data = RaffleInstruction::Enter { amount }.pack();

    let accounts = vec![
        AccountMeta::new(*player, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

/// Create a perform_upkeep instruction
pub fn perform_upkeep(
    program_id: &Pubkey,
    caller: &Pubkey,
    raffle_account: &Pubkey,
    vrf_coordinator: &Pubkey,
) -> Instruction {
    let data = RaffleInstruction::PerformUpkeep {}.pack();

    let accounts = vec![
        AccountMeta::new(*caller, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new_readonly(*vrf_coordinator, false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

/// Create a fulfill_random_words instruction
pub fn fulfill_random_words(
    program_id: &Pubkey,
    fulfill_authority: &Pubkey,
    raffle_account: &Pubkey,
    winner: &Pubkey,
    request_id: u64,
    random_words: Vec<u64>,
) -> Instruction {
    let data = RaffleInstruction::FulfillRandomWords {
        request_id,
        random_words,
    }
    .pack();

    let accounts = vec![
        AccountMeta::new_readonly(*fulfill_authority, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new(*winner, false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_round_trips() {
        let cases = vec![
            RaffleInstruction::Initialize {
                entrance_fee: 10_000_000,
                interval: 30,
                gas_lane: [0xAB; 32],
                subscription_id: 2196,
                request_confirmations: 3,
                callback_gas_limit: 500_000,
            },
            RaffleInstruction::Enter { amount: 10_000_000 },
            RaffleInstruction::PerformUpkeep {},
            RaffleInstruction::FulfillRandomWords {
                request_id: 1,
                random_words: vec![7],
            },
        ];
        for case in cases {
            assert_eq!(RaffleInstruction::unpack(&case.pack()).unwrap(), case);
        }
    }

    #[test]
    fn unpack_rejects_truncated_data() {
        assert!(RaffleInstruction::unpack(&[]).is_err());
        assert!(RaffleInstruction::unpack(&[1, 0, 0]).is_err());
        assert!(RaffleInstruction::unpack(&[3, 1, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0]).is_err());
    }

    #[test]
    fn unpack_rejects_unknown_tag() {
        assert!(RaffleInstruction::unpack(&[9]).is_err());
    }
}
