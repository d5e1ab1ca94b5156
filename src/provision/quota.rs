//! Quota policy for new filesets
//!
//! Soft limits sit at hard / 1.05 (about 95% of the hard limit), rounded
//! down. Computed in integers as `hard * 100 / 105` so the result is exact.

use crate::config::QuotaDefaults;
use crate::domain::ports::QuotaLimits;
use std::time::Duration;

/// Grace period for user quotas on new filesets: 7 days
pub const USER_GRACE_PERIOD: Duration = Duration::from_secs(604_800);

/// `hard / SOFT_RATIO` gives the soft limit, as a fraction 105/100
const SOFT_RATIO_NUMERATOR: u128 = 105;
const SOFT_RATIO_DENOMINATOR: u128 = 100;

/// Soft limit matching a hard limit
pub fn soft_limit(hard: u64) -> u64 {
    (u128::from(hard) * SOFT_RATIO_DENOMINATOR / SOFT_RATIO_NUMERATOR) as u64
}

/// Limits derived from hard block and inode caps
pub fn limits_for(block_hard: u64, inode_hard: u64) -> QuotaLimits {
    QuotaLimits {
        block_soft: soft_limit(block_hard),
        block_hard,
        inode_soft: soft_limit(inode_hard),
        inode_hard,
    }
}

/// Limits applied to `"*"` on every new fileset
pub fn user_limits(defaults: &QuotaDefaults) -> QuotaLimits {
    limits_for(defaults.user_block, defaults.user_inode)
}

/// Limits applied to the path of a new project fileset
pub fn project_limits(defaults: &QuotaDefaults) -> QuotaLimits {
    limits_for(defaults.project_block, defaults.project_inode)
}
