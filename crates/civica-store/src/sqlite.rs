use crate::{
    ComplaintPage, ComplaintQuery, DocumentStore, StoreError, UnvoteOutcome, VoteOutcome,
};
use async_trait::async_trait;
use civica_model::{
    ActivityCounts, Category, Complaint, ComplaintId, ComplaintStatus, Description, EmailAddress,
    Feedback, FeedbackText, Location, RewardsProfile, Role, Title, User, UserId,
};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tokio::sync::Mutex;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users(
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL,
    name TEXT NOT NULL,
    role TEXT NOT NULL,
    active INTEGER NOT NULL,
    created_ms INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
CREATE TABLE IF NOT EXISTS complaints(
    id TEXT PRIMARY KEY,
    owner TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    category TEXT NOT NULL,
    status TEXT NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    address TEXT NOT NULL,
    image_urls TEXT NOT NULL,
    votes INTEGER NOT NULL,
    is_fake INTEGER NOT NULL,
    is_visible INTEGER NOT NULL,
    reported INTEGER NOT NULL,
    created_ms INTEGER NOT NULL,
    updated_ms INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_complaints_owner ON complaints(owner);
CREATE INDEX IF NOT EXISTS idx_complaints_status ON complaints(status);
CREATE INDEX IF NOT EXISTS idx_complaints_category ON complaints(category);
CREATE INDEX IF NOT EXISTS idx_complaints_created ON complaints(created_ms);
CREATE TABLE IF NOT EXISTS votes(
    complaint_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    created_ms INTEGER NOT NULL,
    PRIMARY KEY(complaint_id, user_id)
);
CREATE TABLE IF NOT EXISTS feedback(
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    complaint_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    text TEXT NOT NULL,
    created_ms INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_feedback_complaint ON feedback(complaint_id);
CREATE TABLE IF NOT EXISTS rewards(
    user_id TEXT PRIMARY KEY,
    profile TEXT NOT NULL
);
";

/// Durable backend. The vote pair and the denormalized counter are
/// written inside one transaction; the unique (complaint, user) key
/// backs duplicate detection instead of a pre-check query.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError(format!("open failed: {e}")))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError(format!("open failed: {e}")))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| StoreError(format!("pragma failed: {e}")))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| StoreError(format!("schema bootstrap failed: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError(format!("sqlite error: {e}"))
}

fn user_from_row(row: &Row<'_>) -> Result<User, StoreError> {
    let id: String = row.get(0).map_err(db_err)?;
    let email: String = row.get(1).map_err(db_err)?;
    let name: String = row.get(2).map_err(db_err)?;
    let role: String = row.get(3).map_err(db_err)?;
    let active: i64 = row.get(4).map_err(db_err)?;
    let created_ms: i64 = row.get(5).map_err(db_err)?;
    Ok(User {
        id: UserId::parse(&id).map_err(|e| StoreError(format!("stored user id: {e}")))?,
        email: EmailAddress::parse(&email)
            .map_err(|e| StoreError(format!("stored email: {e}")))?,
        name,
        role: Role::parse(&role).map_err(|e| StoreError(format!("stored role: {e}")))?,
        active: active != 0,
        created_ms: created_ms as u64,
    })
}

fn complaint_from_row(row: &Row<'_>) -> Result<Complaint, StoreError> {
    let id: String = row.get(0).map_err(db_err)?;
    let owner: String = row.get(1).map_err(db_err)?;
    let title: String = row.get(2).map_err(db_err)?;
    let description: String = row.get(3).map_err(db_err)?;
    let category: String = row.get(4).map_err(db_err)?;
    let status: String = row.get(5).map_err(db_err)?;
    let latitude: f64 = row.get(6).map_err(db_err)?;
    let longitude: f64 = row.get(7).map_err(db_err)?;
    let address: String = row.get(8).map_err(db_err)?;
    let image_urls: String = row.get(9).map_err(db_err)?;
    let votes: i64 = row.get(10).map_err(db_err)?;
    let is_fake: i64 = row.get(11).map_err(db_err)?;
    let is_visible: i64 = row.get(12).map_err(db_err)?;
    let reported: i64 = row.get(13).map_err(db_err)?;
    let created_ms: i64 = row.get(14).map_err(db_err)?;
    let updated_ms: i64 = row.get(15).map_err(db_err)?;
    Ok(Complaint {
        id: ComplaintId::parse(&id)
            .map_err(|e| StoreError(format!("stored complaint id: {e}")))?,
        owner: UserId::parse(&owner).map_err(|e| StoreError(format!("stored owner: {e}")))?,
        title: Title::parse(&title).map_err(|e| StoreError(format!("stored title: {e}")))?,
        description: Description::parse(&description)
            .map_err(|e| StoreError(format!("stored description: {e}")))?,
        category: Category::parse(&category)
            .map_err(|e| StoreError(format!("stored category: {e}")))?,
        status: ComplaintStatus::parse(&status)
            .map_err(|e| StoreError(format!("stored status: {e}")))?,
        location: Location {
            latitude,
            longitude,
            address,
        },
        image_urls: serde_json::from_str(&image_urls)
            .map_err(|e| StoreError(format!("stored image urls: {e}")))?,
        votes: votes.max(0) as u64,
        is_fake: is_fake != 0,
        is_visible: is_visible != 0,
        reported_to_super_admin: reported != 0,
        created_ms: created_ms as u64,
        updated_ms: updated_ms as u64,
    })
}

const COMPLAINT_COLUMNS: &str = "id, owner, title, description, category, status, latitude, \
     longitude, address, image_urls, votes, is_fake, is_visible, reported, created_ms, updated_ms";

fn build_filter(query: &ComplaintQuery) -> (String, Vec<SqlValue>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut binds: Vec<SqlValue> = Vec::new();
    if let Some(category) = query.category {
        clauses.push("category = ?".to_string());
        binds.push(SqlValue::Text(category.as_str().to_string()));
    }
    if let Some(status) = query.status {
        clauses.push("status = ?".to_string());
        binds.push(SqlValue::Text(status.as_str().to_string()));
    }
    if let Some(owner) = &query.owner {
        clauses.push("owner = ?".to_string());
        binds.push(SqlValue::Text(owner.as_str().to_string()));
    }
    if query.visible_only {
        if let Some(include) = &query.include_owner {
            clauses.push("(is_visible = 1 OR owner = ?)".to_string());
            binds.push(SqlValue::Text(include.as_str().to_string()));
        } else {
            clauses.push("is_visible = 1".to_string());
        }
    }
    if let Some(text) = &query.text {
        clauses.push("(instr(lower(title), ?) > 0 OR instr(lower(description), ?) > 0)".to_string());
        let needle = text.to_ascii_lowercase();
        binds.push(SqlValue::Text(needle.clone()));
        binds.push(SqlValue::Text(needle));
    }
    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    (where_sql, binds)
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn upsert_user(&self, user: User) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO users(id, email, name, role, active, created_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                 email = excluded.email,
                 name = excluded.name,
                 role = excluded.role,
                 active = excluded.active",
            params![
                user.id.as_str(),
                user.email.as_str(),
                user.name,
                user.role.as_str(),
                user.active as i64,
                user.created_ms as i64,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    async fn user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, email, name, role, active, created_ms FROM users WHERE id = ?1",
            params![id.as_str()],
            |row| Ok(user_from_row(row)),
        )
        .optional()
        .map_err(db_err)?
        .transpose()
    }

    async fn user_by_email(&self, email: &EmailAddress) -> Result<Option<User>, StoreError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, email, name, role, active, created_ms FROM users WHERE email = ?1
             ORDER BY id LIMIT 1",
            params![email.as_str()],
            |row| Ok(user_from_row(row)),
        )
        .optional()
        .map_err(db_err)?
        .transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT id, email, name, role, active, created_ms FROM users ORDER BY id")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| Ok(user_from_row(row)))
            .map_err(db_err)?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row.map_err(db_err)??);
        }
        Ok(users)
    }

    async fn set_role(&self, id: &UserId, role: Role) -> Result<bool, StoreError> {
        let conn = self.conn.lock().await;
        let changed = conn
            .execute(
                "UPDATE users SET role = ?1 WHERE id = ?2",
                params![role.as_str(), id.as_str()],
            )
            .map_err(db_err)?;
        Ok(changed > 0)
    }

    async fn set_active(&self, id: &UserId, active: bool) -> Result<bool, StoreError> {
        let conn = self.conn.lock().await;
        let changed = conn
            .execute(
                "UPDATE users SET active = ?1 WHERE id = ?2",
                params![active as i64, id.as_str()],
            )
            .map_err(db_err)?;
        Ok(changed > 0)
    }

    async fn delete_user(&self, id: &UserId) -> Result<bool, StoreError> {
        let conn = self.conn.lock().await;
        let changed = conn
            .execute("DELETE FROM users WHERE id = ?1", params![id.as_str()])
            .map_err(db_err)?;
        Ok(changed > 0)
    }

    async fn insert_complaint(&self, complaint: Complaint) -> Result<(), StoreError> {
        let image_urls = serde_json::to_string(&complaint.image_urls)
            .map_err(|e| StoreError(format!("image urls encode failed: {e}")))?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO complaints(
                 id, owner, title, description, category, status, latitude, longitude,
                 address, image_urls, votes, is_fake, is_visible, reported,
                 created_ms, updated_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                complaint.id.as_str(),
                complaint.owner.as_str(),
                complaint.title.as_str(),
                complaint.description.as_str(),
                complaint.category.as_str(),
                complaint.status.as_str(),
                complaint.location.latitude,
                complaint.location.longitude,
                complaint.location.address,
                image_urls,
                complaint.votes as i64,
                complaint.is_fake as i64,
                complaint.is_visible as i64,
                complaint.reported_to_super_admin as i64,
                complaint.created_ms as i64,
                complaint.updated_ms as i64,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    async fn complaint(&self, id: &ComplaintId) -> Result<Option<Complaint>, StoreError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            &format!("SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE id = ?1"),
            params![id.as_str()],
            |row| Ok(complaint_from_row(row)),
        )
        .optional()
        .map_err(db_err)?
        .transpose()
    }

    async fn update_complaint(&self, complaint: Complaint) -> Result<bool, StoreError> {
        let image_urls = serde_json::to_string(&complaint.image_urls)
            .map_err(|e| StoreError(format!("image urls encode failed: {e}")))?;
        let conn = self.conn.lock().await;
        let changed = conn
            .execute(
                "UPDATE complaints SET
                     owner = ?2, title = ?3, description = ?4, category = ?5, status = ?6,
                     latitude = ?7, longitude = ?8, address = ?9, image_urls = ?10,
                     votes = ?11, is_fake = ?12, is_visible = ?13, reported = ?14,
                     created_ms = ?15, updated_ms = ?16
                 WHERE id = ?1",
                params![
                    complaint.id.as_str(),
                    complaint.owner.as_str(),
                    complaint.title.as_str(),
                    complaint.description.as_str(),
                    complaint.category.as_str(),
                    complaint.status.as_str(),
                    complaint.location.latitude,
                    complaint.location.longitude,
                    complaint.location.address,
                    image_urls,
                    complaint.votes as i64,
                    complaint.is_fake as i64,
                    complaint.is_visible as i64,
                    complaint.reported_to_super_admin as i64,
                    complaint.created_ms as i64,
                    complaint.updated_ms as i64,
                ],
            )
            .map_err(db_err)?;
        Ok(changed > 0)
    }

    async fn delete_complaint(&self, id: &ComplaintId) -> Result<bool, StoreError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction().map_err(db_err)?;
        let changed = tx
            .execute("DELETE FROM complaints WHERE id = ?1", params![id.as_str()])
            .map_err(db_err)?;
        tx.execute(
            "DELETE FROM votes WHERE complaint_id = ?1",
            params![id.as_str()],
        )
        .map_err(db_err)?;
        tx.execute(
            "DELETE FROM feedback WHERE complaint_id = ?1",
            params![id.as_str()],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        Ok(changed > 0)
    }

    async fn list_complaints(&self, query: &ComplaintQuery) -> Result<ComplaintPage, StoreError> {
        let (where_sql, binds) = build_filter(query);
        let conn = self.conn.lock().await;

        let count_sql = format!("SELECT COUNT(*) FROM complaints{where_sql}");
        let total: i64 = conn
            .query_row(
                &count_sql,
                rusqlite::params_from_iter(binds.iter()),
                |row| row.get(0),
            )
            .map_err(db_err)?;

        let page_sql = format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaints{where_sql}
             ORDER BY created_ms DESC, id DESC LIMIT ?{} OFFSET ?{}",
            binds.len() + 1,
            binds.len() + 2
        );
        let mut page_binds = binds;
        page_binds.push(SqlValue::Integer(
            i64::try_from(query.limit).unwrap_or(i64::MAX),
        ));
        page_binds.push(SqlValue::Integer(
            i64::try_from(query.offset).unwrap_or(i64::MAX),
        ));

        let mut stmt = conn.prepare(&page_sql).map_err(db_err)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(page_binds.iter()), |row| {
                Ok(complaint_from_row(row))
            })
            .map_err(db_err)?;
        let mut complaints = Vec::new();
        for row in rows {
            complaints.push(row.map_err(db_err)??);
        }
        Ok(ComplaintPage {
            complaints,
            total: total.max(0) as u64,
        })
    }

    async fn count_by_status(&self) -> Result<Vec<(ComplaintStatus, u64)>, StoreError> {
        let conn = self.conn.lock().await;
        let mut out = Vec::with_capacity(4);
        for status in ComplaintStatus::all() {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM complaints WHERE status = ?1",
                    params![status.as_str()],
                    |row| row.get(0),
                )
                .map_err(db_err)?;
            out.push((status, count.max(0) as u64));
        }
        Ok(out)
    }

    async fn count_long_pending(&self, created_before_ms: u64) -> Result<u64, StoreError> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM complaints
                 WHERE status IN ('pending', 'in-progress') AND created_ms <= ?1",
                params![i64::try_from(created_before_ms).unwrap_or(i64::MAX)],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(count.max(0) as u64)
    }

    async fn add_vote(
        &self,
        complaint: &ComplaintId,
        user: &UserId,
        now_ms: u64,
    ) -> Result<VoteOutcome, StoreError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction().map_err(db_err)?;
        let exists: Option<i64> = tx
            .query_row(
                "SELECT votes FROM complaints WHERE id = ?1",
                params![complaint.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        if exists.is_none() {
            return Ok(VoteOutcome::MissingComplaint);
        }
        let inserted = tx
            .execute(
                "INSERT OR IGNORE INTO votes(complaint_id, user_id, created_ms)
                 VALUES (?1, ?2, ?3)",
                params![complaint.as_str(), user.as_str(), now_ms as i64],
            )
            .map_err(db_err)?;
        if inserted == 0 {
            return Ok(VoteOutcome::Duplicate);
        }
        tx.execute(
            "UPDATE complaints SET votes = votes + 1, updated_ms = ?2 WHERE id = ?1",
            params![complaint.as_str(), now_ms as i64],
        )
        .map_err(db_err)?;
        let votes: i64 = tx
            .query_row(
                "SELECT votes FROM complaints WHERE id = ?1",
                params![complaint.as_str()],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        Ok(VoteOutcome::Added {
            votes: votes.max(0) as u64,
        })
    }

    async fn remove_vote(
        &self,
        complaint: &ComplaintId,
        user: &UserId,
    ) -> Result<UnvoteOutcome, StoreError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction().map_err(db_err)?;
        let exists: Option<i64> = tx
            .query_row(
                "SELECT votes FROM complaints WHERE id = ?1",
                params![complaint.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        if exists.is_none() {
            return Ok(UnvoteOutcome::MissingComplaint);
        }
        let removed = tx
            .execute(
                "DELETE FROM votes WHERE complaint_id = ?1 AND user_id = ?2",
                params![complaint.as_str(), user.as_str()],
            )
            .map_err(db_err)?;
        if removed == 0 {
            return Ok(UnvoteOutcome::Missing);
        }
        tx.execute(
            "UPDATE complaints SET votes = MAX(votes - 1, 0) WHERE id = ?1",
            params![complaint.as_str()],
        )
        .map_err(db_err)?;
        let votes: i64 = tx
            .query_row(
                "SELECT votes FROM complaints WHERE id = ?1",
                params![complaint.as_str()],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        Ok(UnvoteOutcome::Removed {
            votes: votes.max(0) as u64,
        })
    }

    async fn count_votes(&self, complaint: &ComplaintId) -> Result<u64, StoreError> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM votes WHERE complaint_id = ?1",
                params![complaint.as_str()],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(count.max(0) as u64)
    }

    async fn insert_feedback(
        &self,
        complaint: &ComplaintId,
        user: &UserId,
        text: FeedbackText,
        now_ms: u64,
    ) -> Result<Feedback, StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO feedback(complaint_id, user_id, text, created_ms)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                complaint.as_str(),
                user.as_str(),
                text.as_str(),
                now_ms as i64
            ],
        )
        .map_err(db_err)?;
        let id = conn.last_insert_rowid();
        Ok(Feedback {
            id: id.max(0) as u64,
            complaint: complaint.clone(),
            user: user.clone(),
            text,
            created_ms: now_ms,
        })
    }

    async fn list_feedback(&self, complaint: &ComplaintId) -> Result<Vec<Feedback>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT id, complaint_id, user_id, text, created_ms FROM feedback
                 WHERE complaint_id = ?1 ORDER BY created_ms DESC, id DESC",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![complaint.as_str()], |row| {
                let id: i64 = row.get(0)?;
                let complaint_id: String = row.get(1)?;
                let user_id: String = row.get(2)?;
                let text: String = row.get(3)?;
                let created_ms: i64 = row.get(4)?;
                Ok((id, complaint_id, user_id, text, created_ms))
            })
            .map_err(db_err)?;
        let mut entries = Vec::new();
        for row in rows {
            let (id, complaint_id, user_id, text, created_ms) = row.map_err(db_err)?;
            entries.push(Feedback {
                id: id.max(0) as u64,
                complaint: ComplaintId::parse(&complaint_id)
                    .map_err(|e| StoreError(format!("stored complaint id: {e}")))?,
                user: UserId::parse(&user_id)
                    .map_err(|e| StoreError(format!("stored user id: {e}")))?,
                text: FeedbackText::parse(&text)
                    .map_err(|e| StoreError(format!("stored feedback text: {e}")))?,
                created_ms: created_ms.max(0) as u64,
            });
        }
        Ok(entries)
    }

    async fn rewards(&self, user: &UserId) -> Result<Option<RewardsProfile>, StoreError> {
        let conn = self.conn.lock().await;
        let raw: Option<String> = conn
            .query_row(
                "SELECT profile FROM rewards WHERE user_id = ?1",
                params![user.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        match raw {
            None => Ok(None),
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| StoreError(format!("stored rewards profile: {e}"))),
        }
    }

    async fn put_rewards(&self, profile: RewardsProfile) -> Result<(), StoreError> {
        let json = serde_json::to_string(&profile)
            .map_err(|e| StoreError(format!("rewards encode failed: {e}")))?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO rewards(user_id, profile) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET profile = excluded.profile",
            params![profile.user.as_str(), json],
        )
        .map_err(db_err)?;
        Ok(())
    }

    async fn user_activity_counts(&self, user: &UserId) -> Result<ActivityCounts, StoreError> {
        let conn = self.conn.lock().await;
        let complaints: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM complaints WHERE owner = ?1",
                params![user.as_str()],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        let completed: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM complaints WHERE owner = ?1 AND status = 'completed'",
                params![user.as_str()],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        let comments: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM feedback WHERE user_id = ?1",
                params![user.as_str()],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        let votes_received: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM votes v JOIN complaints c ON v.complaint_id = c.id
                 WHERE c.owner = ?1",
                params![user.as_str()],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(ActivityCounts {
            complaints: complaints.max(0) as u64,
            completed_complaints: completed.max(0) as u64,
            comments: comments.max(0) as u64,
            votes_received: votes_received.max(0) as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civica_model::{Category, Description, Location, Title};

    fn complaint(seed: u64, owner: &str, now_ms: u64) -> Complaint {
        Complaint::submit(
            ComplaintId::from_seed(seed),
            UserId::parse(owner).unwrap(),
            Title::parse(&format!("pothole {seed}")).unwrap(),
            Description::parse("deep pothole near the school crossing").unwrap(),
            Category::Pothole,
            Location {
                latitude: 10.0,
                longitude: 20.0,
                address: "School Rd".to_string(),
            },
            vec!["https://img.example/p.jpg".to_string()],
            now_ms,
        )
    }

    #[tokio::test]
    async fn complaint_round_trips_through_sqlite() {
        let store = SqliteStore::open_in_memory().unwrap();
        let c = complaint(1, "alice", 100);
        store.insert_complaint(c.clone()).await.unwrap();
        let loaded = store.complaint(&c.id).await.unwrap().unwrap();
        assert_eq!(loaded, c);
    }

    #[tokio::test]
    async fn duplicate_vote_is_rejected_by_unique_key() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_complaint(complaint(1, "alice", 100)).await.unwrap();
        let id = ComplaintId::from_seed(1);
        let bob = UserId::parse("bob").unwrap();

        assert_eq!(
            store.add_vote(&id, &bob, 101).await.unwrap(),
            VoteOutcome::Added { votes: 1 }
        );
        assert_eq!(
            store.add_vote(&id, &bob, 102).await.unwrap(),
            VoteOutcome::Duplicate
        );
        // Counter equals the record count after the rejected duplicate.
        assert_eq!(store.count_votes(&id).await.unwrap(), 1);
        assert_eq!(store.complaint(&id).await.unwrap().unwrap().votes, 1);

        assert_eq!(
            store.remove_vote(&id, &bob).await.unwrap(),
            UnvoteOutcome::Removed { votes: 0 }
        );
        assert_eq!(
            store.remove_vote(&id, &bob).await.unwrap(),
            UnvoteOutcome::Missing
        );
    }

    #[tokio::test]
    async fn list_filters_match_memory_semantics() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_complaint(complaint(1, "alice", 10)).await.unwrap();
        let mut hidden = complaint(2, "bob", 20);
        hidden.is_visible = false;
        store.insert_complaint(hidden).await.unwrap();

        let page = store
            .list_complaints(&ComplaintQuery {
                visible_only: true,
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.complaints[0].id, ComplaintId::from_seed(1));

        let page = store
            .list_complaints(&ComplaintQuery {
                text: Some("POTHOLE 2".to_string()),
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.complaints[0].id, ComplaintId::from_seed(2));

        // A saturated offset pages past everything instead of wrapping.
        let page = store
            .list_complaints(&ComplaintQuery {
                offset: usize::MAX,
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert!(page.complaints.is_empty());
    }

    #[tokio::test]
    async fn long_pending_count_skips_terminal_complaints() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_complaint(complaint(1, "alice", 10)).await.unwrap();
        let mut done = complaint(2, "alice", 10);
        done.status = ComplaintStatus::Completed;
        store.insert_complaint(done).await.unwrap();
        store.insert_complaint(complaint(3, "bob", 500)).await.unwrap();

        assert_eq!(store.count_long_pending(100).await.unwrap(), 1);
        assert_eq!(store.count_long_pending(500).await.unwrap(), 2);
        assert_eq!(store.count_long_pending(5).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rewards_document_round_trips() {
        let store = SqliteStore::open_in_memory().unwrap();
        let user = UserId::parse("alice").unwrap();
        assert!(store.rewards(&user).await.unwrap().is_none());
        let mut profile = RewardsProfile::new(user.clone(), 5);
        profile.apply_event(civica_model::RewardEvent::SubmittedComplaint, 6);
        store.put_rewards(profile.clone()).await.unwrap();
        assert_eq!(store.rewards(&user).await.unwrap().unwrap(), profile);
    }
}
