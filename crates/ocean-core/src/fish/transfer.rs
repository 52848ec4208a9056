//! Ownership transfer.

use ocean_types::{Fish, UserId};

use super::{bump, check_alive, check_owner, check_version, clear_mark};
use crate::error::FishError;

/// Hand `fish` to `new_owner`.
///
/// Identity and history survive; any mark on the creature is cleared.
/// The pool is unaffected.
pub fn transfer(
    fish: &Fish,
    actor: UserId,
    new_owner: UserId,
    expected_version: u64,
) -> Result<Fish, FishError> {
    check_version(fish, expected_version)?;
    check_owner(fish, actor)?;
    check_alive(fish)?;
    if new_owner == fish.owner_user_id {
        return Err(FishError::SelfTransfer(fish.id));
    }

    let mut next = fish.clone();
    next.owner_user_id = new_owner;
    clear_mark(&mut next);
    bump(&mut next)?;
    Ok(next)
}
