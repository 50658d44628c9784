//! # custodian-dac: Discretionary Access Control
//!
//! Resource owners decide who else may touch their resources.
//!
//! - The owner is always allowed, whatever grants exist.
//! - Anyone else needs an explicit [`Grant`](custodian_store::Grant) for the
//!   `(resource, actor)` pair, and the grant must carry the bit for the action:
//!
//! | Action   | Required bit |
//! |----------|--------------|
//! | `view`   | `can_view`   |
//! | `edit`   | `can_edit`   |
//! | `share`  | `can_share`  |
//! | `delete` | `can_edit`   |
//!
//! There is no separate delete bit.
//!
//! Grants are upserted (one row per pair, the latest write wins) and revoking
//! a grant that does not exist is a no-op.

mod checker;

pub use checker::{
    NO_GRANT_REASON, OWNER_REASON, RESOURCE_NOT_FOUND_REASON, evaluate, evaluate_record, grant,
    is_owner, list_grants, permits, revoke,
};
