//! Bounds applied to provisioning requests and host probes.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so request limits are duplicated in `tenant.rs`. Keep both in sync when modifying.

/// Tenant display name max length.
pub const MAX_TENANT_NAME_LEN: usize = 200;

/// Host identifier max length (NetBIOS computer name limit).
pub const MAX_HOST_IDENTIFIER_LEN: usize = 15;

/// Maximum accounts created by a single call.
pub const MAX_ACCOUNTS_PER_CALL: u32 = 500;

/// Default reachability probe budget in milliseconds.
pub const DEFAULT_REACHABILITY_TIMEOUT_MS: u64 = 500;

/// Default budget for each remote inventory query in milliseconds.
pub const DEFAULT_REMOTE_QUERY_TIMEOUT_MS: u64 = 2_000;

/// Default deadline for a whole provisioning call in seconds.
///
/// Must stay well above the probe budgets so a slow host never eats the
/// directory work's time.
pub const DEFAULT_JOB_DEADLINE_SECS: u64 = 120;
