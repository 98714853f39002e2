// Autoraffle - Instruction Processor
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::invoke,
    program_error::ProgramError,
    pubkey::Pubkey,
    system_instruction,
    sysvar::{clock::Clock, Sysvar},
};

use crate::error::RaffleError;
use crate::instruction::RaffleInstruction;
use crate::state::{OracleConfig, Raffle};
use crate::vrf;

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = RaffleInstruction::unpack(instruction_data)?;

        match instruction {
            RaffleInstruction::Initialize {
                entrance_fee,
                interval,
                gas_lane,
                subscription_id,
                request_confirmations,
                callback_gas_limit,
            } => {
                msg!("Instruction: Initialize");
                Self::process_initialize(
                    accounts,
                    entrance_fee,
                    interval,
                    gas_lane,
                    subscription_id,
                    request_confirmations,
                    callback_gas_limit,
                    program_id,
                )
            }
            RaffleInstruction::Enter { amount } => {
                msg!("Instruction: Enter");
                Self::process_enter(accounts, amount, program_id)
            }
            RaffleInstruction::PerformUpkeep {} => {
                msg!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(accounts, program_id)
            }
            RaffleInstruction::FulfillRandomWords {
                request_id,
                random_words,
            } => {
                msg!("Instruction: Fulfill Random Words");
                Self::process_fulfill_random_words(accounts, request_id, &random_words, program_id)
            }
        }
    }

    /// Write the immutable configuration and open the first round.
    #[allow(clippy::too_many_arguments)]
    fn process_initialize(
        accounts: &[AccountInfo],
        entrance_fee: u64,
        interval: i64,
        gas_lane: [u8; 32],
        subscription_id: u64,
        request_confirmations: u16,
        callback_gas_limit: u32,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;
        let fulfill_authority_info = next_account_info(account_info_iter)?;

        if !authority_info.is_signer {
            msg!("Authority must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        if raffle_info.owner != program_id {
            msg!("Raffle account must be owned by this program");
            return Err(ProgramError::IncorrectProgramId);
        }

        if raffle_info.data_len() < Raffle::LEN {
            msg!("Raffle account needs {} bytes", Raffle::LEN);
            return Err(ProgramError::AccountDataTooSmall);
        }

        if entrance_fee == 0 || interval <= 0 {
            msg!("Entrance fee and interval must be positive");
            return Err(ProgramError::InvalidArgument);
        }

        let existing = Self::load_raffle(raffle_info)?;
        if existing.is_initialized {
            msg!("Raffle account is already initialized");
            return Err(RaffleError::AlreadyInitialized.into());
        }

        let clock = Clock::get()?;
        let oracle = OracleConfig {
            coordinator: *coordinator_info.key,
            fulfill_authority: *fulfill_authority_info.key,
            gas_lane,
            subscription_id,
            request_confirmations,
            callback_gas_limit,
            num_words: 1,
        };
        let raffle = Raffle::new(entrance_fee, interval, oracle, clock.unix_timestamp);
        Self::store_raffle(raffle_info, &raffle)?;

        msg!(
            "Raffle initialized: EntranceFee={}, Interval={}s, Coordinator={}",
            entrance_fee,
            interval,
            coordinator_info.key
        );
        Ok(())
    }

    /// Record a paid entry and pull the payment into the pool.
    fn process_enter(
        accounts: &[AccountInfo],
        amount: u64,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let player_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !player_info.is_signer {
            msg!("Player must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        if raffle_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }

        let mut raffle = Self::load_raffle(raffle_info)?;
        if !raffle.is_initialized {
            return Err(RaffleError::NotInitialized.into());
        }

        // Every check happens before any lamport moves; a rejected entry
        // leaves both the ledger and the player's balance untouched.
        raffle.record_entry(*player_info.key, amount)?;

        invoke(
            &system_instruction::transfer(player_info.key, raffle_info.key, amount),
            &[
                player_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        Self::store_raffle(raffle_info, &raffle)?;

        msg!(
            "EnteredRaffle: player={} amount={} players={} pool={}",
            player_info.key,
            amount,
            raffle.player_count(),
            raffle.pool_lamports
        );
        Ok(())
    }

    /// Move the raffle into settlement and request randomness. Anyone may
    /// call this; eligibility is re-derived from on-chain state.
    fn process_perform_upkeep(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;

        if !caller_info.is_signer {
            msg!("Upkeep caller must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        if raffle_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }

        let mut raffle = Self::load_raffle(raffle_info)?;
        if !raffle.is_initialized {
            return Err(RaffleError::NotInitialized.into());
        }

        let clock = Clock::get()?;
        let request_id = raffle.begin_calculating(clock.unix_timestamp)?;

        vrf::request_random_words(
            coordinator_info,
            raffle_info,
            caller_info,
            &raffle.oracle,
            request_id,
        )?;

        Self::store_raffle(raffle_info, &raffle)?;

        msg!("RequestedRaffleWinner: request_id={}", request_id);
        Ok(())
    }

    /// Oracle callback: resolve the pending request, pay the winner, reset.
    fn process_fulfill_random_words(
        accounts: &[AccountInfo],
        request_id: u64,
        random_words: &[u64],
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let fulfill_authority_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;

        if !fulfill_authority_info.is_signer {
            msg!("Oracle authority must sign the fulfillment");
            return Err(ProgramError::MissingRequiredSignature);
        }

        if raffle_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }

        let mut raffle = Self::load_raffle(raffle_info)?;
        if !raffle.is_initialized {
            return Err(RaffleError::NotInitialized.into());
        }

        if fulfill_authority_info.key != &raffle.oracle.fulfill_authority {
            msg!("Fulfillment signed by an account that is not the configured oracle");
            return Err(RaffleError::OracleMismatch.into());
        }

        let random_word = *random_words
            .first()
            .ok_or(RaffleError::InvalidInstruction)?;

        let (winner_index, winner, prize) = raffle.select_winner(request_id, random_word)?;
        msg!("Winner index: {} of {}", winner_index, raffle.player_count());

        // The state machine picked the winner; the supplied account is only
        // plumbing and must match it.
        if winner_info.key != &winner {
            msg!("Winner account {} does not match selected player {}", winner_info.key, winner);
            return Err(RaffleError::WinnerMismatch.into());
        }

        // Pay out the full pool. The rent-exempt reserve stays behind since
        // the pool is tracked separately from the account balance.
        let new_raffle_lamports = raffle_info
            .lamports()
            .checked_sub(prize)
            .ok_or(RaffleError::TransferFailed)?;
        let new_winner_lamports = winner_info
            .lamports()
            .checked_add(prize)
            .ok_or(RaffleError::TransferFailed)?;
        **raffle_info.try_borrow_mut_lamports()? = new_raffle_lamports;
        **winner_info.try_borrow_mut_lamports()? = new_winner_lamports;

        let clock = Clock::get()?;
        raffle.settle(winner, clock.unix_timestamp);
        Self::store_raffle(raffle_info, &raffle)?;

        msg!("WinnerPicked: winner={} prize={}", winner, prize);
        Ok(())
    }

    fn load_raffle(raffle_info: &AccountInfo) -> Result<Raffle, ProgramError> {
        let data = raffle_info.data.borrow();
        Raffle::deserialize(&mut &data[..]).map_err(|_| ProgramError::InvalidAccountData)
    }

    fn store_raffle(raffle_info: &AccountInfo, raffle: &Raffle) -> ProgramResult {
        let mut data = raffle_info.data.borrow_mut();
        raffle
            .serialize(&mut &mut data[..])
            .map_err(|_| ProgramError::AccountDataTooSmall)
    }
}
