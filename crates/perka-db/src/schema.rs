//! SQL schema definitions.

/// Complete schema for the Perka v1 database.
///
/// The `accounts` CHECK constraints are a hard backstop for the core
/// invariant that both balances stay non-negative: a bug that would drive
/// either below zero fails the statement instead of corrupting state.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Off-chain account balances
-- ============================================================

CREATE TABLE IF NOT EXISTS accounts (
    address TEXT PRIMARY KEY,
    available_balance INTEGER NOT NULL DEFAULT 0
        CHECK (available_balance >= 0),
    pending_mint_balance INTEGER NOT NULL DEFAULT 0
        CHECK (pending_mint_balance >= 0),
    lifetime_earned INTEGER NOT NULL DEFAULT 0,
    lifetime_redeemed INTEGER NOT NULL DEFAULT 0,
    last_sync_at INTEGER
);

-- ============================================================
-- Shops & accumulated purchases
-- ============================================================

CREATE TABLE IF NOT EXISTS shops (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    payout_address TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS purchases (
    id TEXT PRIMARY KEY,
    shop_id TEXT NOT NULL REFERENCES shops(id),
    amount INTEGER NOT NULL CHECK (amount > 0),
    status TEXT NOT NULL DEFAULT 'pending',
    minted_at INTEGER,
    transaction_hash TEXT
);

CREATE INDEX IF NOT EXISTS idx_purchases_unminted
    ON purchases(shop_id) WHERE status = 'completed' AND minted_at IS NULL;

-- ============================================================
-- Append-only transaction ledger
-- ============================================================

CREATE TABLE IF NOT EXISTS ledger_transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tx_type TEXT NOT NULL,
    address TEXT NOT NULL,
    shop_id TEXT,
    amount INTEGER NOT NULL,
    transaction_hash TEXT,
    status TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    metadata TEXT
);

CREATE INDEX IF NOT EXISTS idx_ledger_address
    ON ledger_transactions(address, timestamp);

-- ============================================================
-- Key/value settings
-- ============================================================

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;
