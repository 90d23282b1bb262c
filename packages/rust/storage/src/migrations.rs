//! SQL migration definitions for the lead store.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: leads, research_log",
        sql: r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per unique contact; key is lowercase first|last|org
CREATE TABLE IF NOT EXISTS leads (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    dedup_key        TEXT NOT NULL UNIQUE,
    first_name       TEXT NOT NULL,
    last_name        TEXT NOT NULL,
    title            TEXT NOT NULL,
    email            TEXT NOT NULL,
    email_confidence TEXT NOT NULL,
    work_phone       TEXT NOT NULL,
    account          TEXT NOT NULL,
    org_name         TEXT NOT NULL,
    region           TEXT NOT NULL,
    source_url       TEXT NOT NULL,
    notes            TEXT NOT NULL,
    date_found       TEXT NOT NULL,
    created_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_leads_org ON leads(org_name);
CREATE INDEX IF NOT EXISTS idx_leads_email ON leads(email);

-- One row per finished research job
CREATE TABLE IF NOT EXISTS research_log (
    id              TEXT PRIMARY KEY,
    logged_at       TEXT NOT NULL,
    org_name        TEXT NOT NULL,
    region          TEXT NOT NULL,
    stages          TEXT NOT NULL,
    total           INTEGER NOT NULL,
    with_email      INTEGER NOT NULL,
    no_email        INTEGER NOT NULL,
    notes           TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_research_log_time ON research_log(logged_at);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
