use vestige_account::{Launch, seeds};
use vestige_pubkey::Pubkey;

use crate::error::{Result, VestigeError};
use crate::helpers::AccountInfo;

#[inline(always)]
pub fn check_signer(account: &AccountInfo) -> Result<()> {
    if !account.is_signer {
        return Err(VestigeError::MissingSigner);
    }
    Ok(())
}

#[inline(always)]
pub fn check_key(account: &AccountInfo, expected: &Pubkey) -> Result<()> {
    if &account.key != expected {
        return Err(VestigeError::InvalidSeeds);
    }
    Ok(())
}

/// Load the launch and make sure it sits at its canonical address.
pub fn load_launch(account: &AccountInfo) -> Result<Launch> {
    let launch: Launch = account.load()?;
    let (expected, _) = seeds::derive_launch_pda(&launch.creator, &launch.token_mint);
    check_key(account, &expected)?;
    Ok(launch)
}

pub fn check_creator(launch: &Launch, signer: &AccountInfo) -> Result<()> {
    check_signer(signer)?;
    if launch.creator != signer.key {
        return Err(VestigeError::Unauthorized);
    }
    Ok(())
}

pub fn check_amount(amount: u64) -> Result<()> {
    if amount == 0 {
        return Err(VestigeError::InvalidAmount);
    }
    Ok(())
}
