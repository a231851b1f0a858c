// handlers/elevated/mod.rs - Dev-only endpoints
//
// Route Prefix: /api/admin/users, /api/admin/audit-logs
// The services reject any role other than `dev` with 401.

pub mod audit_logs;
pub mod users;
