//! Embedded schema migrations.
//!
//! Statements are idempotent; `run` executes them in order on startup.

use sqlx::SqlitePool;

use crate::domain::errors::CoreResult;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS sources (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        provider_type TEXT NOT NULL,
        config TEXT NOT NULL DEFAULT '{}',
        installation_id TEXT,
        enabled INTEGER NOT NULL DEFAULT 1,
        selected_containers TEXT NOT NULL DEFAULT '[]',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS installations (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        provider_type TEXT NOT NULL,
        auth_method TEXT NOT NULL,
        account_id TEXT NOT NULL,
        access_token TEXT NOT NULL DEFAULT '',
        refresh_token TEXT,
        oauth_expiry TEXT,
        scopes TEXT NOT NULL DEFAULT '[]',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (provider_type, account_id)
    )",
    "CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        source_id TEXT NOT NULL,
        external_id TEXT NOT NULL,
        title TEXT NOT NULL DEFAULT '',
        mime_type TEXT NOT NULL DEFAULT 'text/plain',
        content TEXT NOT NULL DEFAULT '',
        metadata TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        indexed_at TEXT,
        UNIQUE (source_id, external_id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_documents_source ON documents (source_id)",
    "CREATE TABLE IF NOT EXISTS chunks (
        id TEXT PRIMARY KEY,
        document_id TEXT NOT NULL,
        source_id TEXT NOT NULL,
        content TEXT NOT NULL,
        position INTEGER NOT NULL,
        start_char INTEGER NOT NULL DEFAULT 0,
        end_char INTEGER NOT NULL DEFAULT 0,
        embedding TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks (document_id)",
    "CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks (source_id)",
    "CREATE TABLE IF NOT EXISTS sync_states (
        source_id TEXT PRIMARY KEY,
        status TEXT NOT NULL DEFAULT 'idle',
        cursor TEXT,
        started_at TEXT,
        completed_at TEXT,
        last_sync_at TEXT,
        stats TEXT NOT NULL DEFAULT '{}',
        error TEXT
    )",
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL,
        password_hash TEXT NOT NULL DEFAULT '',
        name TEXT NOT NULL DEFAULT '',
        role TEXT NOT NULL DEFAULT 'member',
        team_id TEXT NOT NULL,
        active INTEGER NOT NULL DEFAULT 1,
        last_login TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (email, team_id)
    )",
    "CREATE TABLE IF NOT EXISTS sessions (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        token TEXT NOT NULL,
        refresh_token TEXT NOT NULL UNIQUE,
        expires_at TEXT NOT NULL,
        created_at TEXT NOT NULL,
        user_agent TEXT,
        ip_address TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions (user_id)",
    "CREATE TABLE IF NOT EXISTS scheduled_tasks (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        task_type TEXT NOT NULL,
        team_id TEXT,
        interval_secs INTEGER NOT NULL,
        enabled INTEGER NOT NULL DEFAULT 1,
        payload TEXT NOT NULL DEFAULT '{}',
        next_run TEXT NOT NULL,
        last_run TEXT,
        last_error TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_scheduled_tasks_due ON scheduled_tasks (enabled, next_run)",
    "CREATE TABLE IF NOT EXISTS tasks (
        id TEXT PRIMARY KEY,
        task_type TEXT NOT NULL,
        team_id TEXT,
        payload TEXT NOT NULL DEFAULT '{}',
        status TEXT NOT NULL DEFAULT 'pending',
        attempts INTEGER NOT NULL DEFAULT 0,
        last_error TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks (status, created_at)",
];

/// Apply all schema statements.
pub async fn run(pool: &SqlitePool) -> CoreResult<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
