use {
    lighthouse_common::{Error, Result},
    solana_sdk::{instruction::Instruction, program_pack::Pack, pubkey::Pubkey, system_instruction},
    spl_associated_token_account::{
        get_associated_token_address, instruction::create_associated_token_account_idempotent,
    },
    spl_token::{instruction::AuthorityType, state::Mint},
};

/// Size of an SPL token mint account
pub const MINT_LEN: usize = Mint::LEN;

/// Append the instructions creating and initializing `mint`, returning the
/// number of lamports the new account is funded with.
pub fn with_create_mint(
    instructions: &mut Vec<Instruction>,
    payer: &Pubkey,
    mint: &Pubkey,
    mint_authority: &Pubkey,
    decimals: u8,
    rent_lamports: u64,
) -> Result<u64> {
    instructions.push(system_instruction::create_account(
        payer,
        mint,
        rent_lamports,
        MINT_LEN as u64,
        &spl_token::id(),
    ));
    instructions.push(
        spl_token::instruction::initialize_mint(
            &spl_token::id(),
            mint,
            mint_authority,
            None,
            decimals,
        )
        .map_err(token_error)?,
    );
    Ok(rent_lamports)
}

/// Append an idempotent associated token account creation and return the ATA.
pub fn with_create_associated_token_account(
    instructions: &mut Vec<Instruction>,
    payer: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
) -> Pubkey {
    instructions.push(create_associated_token_account_idempotent(
        payer,
        owner,
        mint,
        &spl_token::id(),
    ));
    get_associated_token_address(owner, mint)
}

pub fn with_mint_to(
    instructions: &mut Vec<Instruction>,
    mint: &Pubkey,
    destination: &Pubkey,
    mint_authority: &Pubkey,
    amount: u64,
) -> Result<()> {
    instructions.push(
        spl_token::instruction::mint_to(
            &spl_token::id(),
            mint,
            destination,
            mint_authority,
            &[],
            amount,
        )
        .map_err(token_error)?,
    );
    Ok(())
}

/// Hand the mint authority of `mint` to `new_authority`.
pub fn with_set_mint_authority(
    instructions: &mut Vec<Instruction>,
    mint: &Pubkey,
    current_authority: &Pubkey,
    new_authority: &Pubkey,
) -> Result<()> {
    instructions.push(
        spl_token::instruction::set_authority(
            &spl_token::id(),
            mint,
            Some(new_authority),
            AuthorityType::MintTokens,
            current_authority,
            &[],
        )
        .map_err(token_error)?,
    );
    Ok(())
}

/// Mint exactly one token (zero-decimal mint) to `owner`, creating the ATA
/// first when needed. Returns the ATA.
pub fn with_mint_single_token(
    instructions: &mut Vec<Instruction>,
    payer: &Pubkey,
    mint: &Pubkey,
    mint_authority: &Pubkey,
    owner: &Pubkey,
) -> Result<Pubkey> {
    let ata = with_create_associated_token_account(instructions, payer, owner, mint);
    with_mint_to(instructions, mint, &ata, mint_authority, 1)?;
    Ok(ata)
}

/// Convert a UI amount into base units for a mint with `decimals`.
pub fn mint_natural_amount(amount: f64, decimals: u8) -> Result<u64> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::Validation(format!("invalid token amount {}", amount)));
    }

    let scaled = (amount * 10f64.powi(decimals as i32)).round();
    // u64::MAX rounds up to 2^64 as f64
    if scaled >= u64::MAX as f64 {
        return Err(Error::Validation(format!("token amount {} overflows", amount)));
    }
    Ok(scaled as u64)
}

fn token_error(e: solana_sdk::program_error::ProgramError) -> Error {
    Error::Transaction(format!("failed to build token instruction: {}", e))
}
