//! Shared constants for end-to-end tests
//!
//! When test data changes (user credentials, secrets, timeouts),
//! update only this file.

// ============================================================================
// Test User Credentials
// ============================================================================

pub const ALICE_EMAIL: &str = "alice@example.com";
pub const ALICE_PASS: &str = "alicepass123";
pub const ALICE_NAME: &str = "Alice";

pub const BOB_EMAIL: &str = "bob@example.com";
pub const BOB_PASS: &str = "bobpass123";
pub const BOB_NAME: &str = "Bob";

// ============================================================================
// Server Configuration
// ============================================================================

/// Secret the test server signs tokens with
pub const TEST_JWT_SECRET: &str = "e2e-test-secret";

/// Maximum time to wait for the server to accept requests
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Delay between readiness polls
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;

/// Per-request timeout of the test client
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
