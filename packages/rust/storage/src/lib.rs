//! Embedded libSQL lead store.
//!
//! The [`LeadStore`] keeps every contact LeadScout has ever found, keyed by
//! the same `first|last|org` dedup key the research pipeline uses, plus a log
//! of research runs. Writing a contact whose key already exists is a no-op,
//! so re-researching an organization only adds people not seen before.

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use leadscout_shared::{ContactRecord, LeadScoutError, ResearchSummary, Result};
use libsql::{Connection, Database, params};
use tracing::{debug, info};
use uuid::Uuid;

fn storage_err(e: libsql::Error) -> LeadScoutError {
    LeadScoutError::Storage(e.to_string())
}

/// Outcome of [`LeadStore::write_contacts`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub written_with_email: usize,
    pub written_no_email: usize,
    /// Contacts whose dedup key was already stored.
    pub skipped_existing: usize,
}

/// Stored lead totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeadCounts {
    pub with_email: usize,
    pub no_email: usize,
    pub total: usize,
}

/// One row of the research log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchLogEntry {
    pub id: String,
    pub logged_at: DateTime<Utc>,
    pub org_name: String,
    pub region: String,
    /// Stage tags in execution order.
    pub stages: Vec<String>,
    pub total: usize,
    pub with_email: usize,
    pub no_email: usize,
    pub notes: String,
}

/// Storage handle wrapping a libSQL database.
pub struct LeadStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl LeadStore {
    /// Open or create a database at `path`, applying pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LeadScoutError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        let store = Self { db, conn };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        LeadScoutError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 before the first migration.
    async fn schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Leads
    // -----------------------------------------------------------------------

    /// Insert every contact whose dedup key is not stored yet.
    pub async fn write_contacts(&self, contacts: &[ContactRecord]) -> Result<WriteStats> {
        let mut stats = WriteStats::default();
        let now = Utc::now().to_rfc3339();

        for contact in contacts {
            let inserted = self
                .conn
                .execute(
                    "INSERT INTO leads (dedup_key, first_name, last_name, title, email,
                        email_confidence, work_phone, account, org_name, region,
                        source_url, notes, date_found, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                     ON CONFLICT(dedup_key) DO NOTHING",
                    params![
                        contact.dedup_key(),
                        contact.first_name.as_str(),
                        contact.last_name.as_str(),
                        contact.title.as_str(),
                        contact.email.as_str(),
                        contact.email_confidence.as_str(),
                        contact.work_phone.as_str(),
                        contact.account.as_str(),
                        contact.org_name.as_str(),
                        contact.region.as_str(),
                        contact.source_url.as_str(),
                        contact.notes.as_str(),
                        contact.date_found.to_string(),
                        now.as_str()
                    ],
                )
                .await
                .map_err(storage_err)?;

            match (inserted, contact.has_email()) {
                (0, _) => stats.skipped_existing += 1,
                (_, true) => stats.written_with_email += 1,
                (_, false) => stats.written_no_email += 1,
            }
        }

        debug!(?stats, "contacts written");
        Ok(stats)
    }

    /// Totals over every stored lead.
    pub async fn count_leads(&self) -> Result<LeadCounts> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*),
                        COALESCE(SUM(CASE WHEN email <> '' THEN 1 ELSE 0 END), 0)
                 FROM leads",
                params![],
            )
            .await
            .map_err(storage_err)?;

        let Some(row) = rows.next().await.map_err(storage_err)? else {
            return Ok(LeadCounts::default());
        };
        let total = row.get::<i64>(0).map_err(storage_err)? as usize;
        let with_email = row.get::<i64>(1).map_err(storage_err)? as usize;

        Ok(LeadCounts {
            with_email,
            no_email: total - with_email,
            total,
        })
    }

    // -----------------------------------------------------------------------
    // Research log
    // -----------------------------------------------------------------------

    /// Append one row describing a finished research job. Returns its id.
    pub async fn log_research(&self, summary: &ResearchSummary, notes: &str) -> Result<String> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        let stages = summary.stages_executed.join(",");

        self.conn
            .execute(
                "INSERT INTO research_log (id, logged_at, org_name, region, stages,
                    total, with_email, no_email, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    id.as_str(),
                    now.as_str(),
                    summary.org_name.as_str(),
                    summary.region.as_str(),
                    stages.as_str(),
                    summary.total as i64,
                    summary.with_email_count as i64,
                    summary.no_email_count as i64,
                    notes
                ],
            )
            .await
            .map_err(storage_err)?;

        Ok(id)
    }

    /// Most recent research runs, newest first.
    pub async fn recent_research(&self, limit: usize) -> Result<Vec<ResearchLogEntry>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, logged_at, org_name, region, stages, total, with_email, no_email, notes
                 FROM research_log
                 ORDER BY logged_at DESC, id DESC
                 LIMIT ?1",
                params![limit as i64],
            )
            .await
            .map_err(storage_err)?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            entries.push(row_to_log_entry(&row)?);
        }
        Ok(entries)
    }
}

fn row_to_log_entry(row: &libsql::Row) -> Result<ResearchLogEntry> {
    let logged_at: String = row.get(1).map_err(storage_err)?;
    let stages: String = row.get(4).map_err(storage_err)?;

    Ok(ResearchLogEntry {
        id: row.get(0).map_err(storage_err)?,
        logged_at: DateTime::parse_from_rfc3339(&logged_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| LeadScoutError::Storage(format!("invalid date: {e}")))?,
        org_name: row.get(2).map_err(storage_err)?,
        region: row.get(3).map_err(storage_err)?,
        stages: stages
            .split(',')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        total: row.get::<i64>(5).map_err(storage_err)? as usize,
        with_email: row.get::<i64>(6).map_err(storage_err)? as usize,
        no_email: row.get::<i64>(7).map_err(storage_err)? as usize,
        notes: row.get(8).map_err(storage_err)?,
    })
}
