use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use coral_core::{Activity, ConversationLog, Employee, Reservation, ShiftChange};
use parking_lot::RwLock;
use sqlx::{Row, SqlitePool};

/// Guest reservation lookups. Matching is case-insensitive substring on the
/// guest name, first match wins -- the behavior of the CRM `LIKE` query this
/// port fronts.
pub trait ReservationRepository: Send + Sync {
    async fn find_reservation(&self, guest: &str) -> Result<Option<Reservation>>;
    async fn upsert_reservation(&self, reservation: Reservation) -> Result<()>;
}

pub trait ScheduleRepository: Send + Sync {
    async fn get_employee(&self, employee_id: &str) -> Result<Option<Employee>>;
    /// Write-through shift update; unknown employees are an error.
    async fn update_employee_schedule(
        &self,
        employee_id: &str,
        change: &ShiftChange,
    ) -> Result<Employee>;
}

pub trait ActivityRepository: Send + Sync {
    async fn find_activities(&self, preference: &str) -> Result<Vec<Activity>>;
    async fn upsert_activity(&self, activity: Activity) -> Result<()>;
}

pub trait ConversationRepository: Send + Sync {
    async fn load_log(&self, session_id: &str) -> Result<Option<ConversationLog>>;
    async fn upsert_log(&self, log: &ConversationLog) -> Result<()>;
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    reservations: Arc<RwLock<Vec<Reservation>>>,
    employees: Arc<RwLock<HashMap<String, Employee>>>,
    activities: Arc<RwLock<Vec<Activity>>>,
    logs: Arc<RwLock<HashMap<String, ConversationLog>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Demo fixtures: the sample guests, staff, and activities used by the
    /// CLI and the default API setup.
    pub fn seeded() -> Self {
        let store = Self::new();

        {
            let mut reservations = store.reservations.write();
            reservations.push(reservation("Sarah Johnson", "205", "2024-11-18", "2024-11-24"));
            reservations.push(reservation("John Smith", "303", "2024-11-20", "2024-11-25"));
            reservations.push(reservation("David Wilson", "402", "2024-11-22", "2024-11-28"));
        }

        {
            let mut employees = store.employees.write();
            for (id, name, department, shift) in [
                ("EMP001", "Alice Johnson", "Housekeeping", "Morning"),
                ("EMP002", "Bob Wilson", "Front Desk", "Evening"),
                ("EMP003", "Carol Davis", "Maintenance", "Day"),
                ("EMP004", "David Brown", "Concierge", "Morning"),
            ] {
                employees.insert(
                    id.to_string(),
                    Employee {
                        employee_id: id.to_string(),
                        name: name.to_string(),
                        department: department.to_string(),
                        shift: shift.to_string(),
                        scheduled_date: None,
                    },
                );
            }
        }

        {
            let mut activities = store.activities.write();
            for (name, description, category) in [
                (
                    "Snorkeling Tour",
                    "Guided reef snorkeling with equipment included",
                    "Water Sports",
                ),
                (
                    "Sunset Kayaking",
                    "Kayak rental along the lagoon at golden hour",
                    "Water Sports",
                ),
                (
                    "Paddleboarding",
                    "Stand-up paddleboard session for all levels",
                    "Water Sports",
                ),
                (
                    "Kids Treasure Hunt",
                    "Supervised beach treasure hunt for children",
                    "Family Activities",
                ),
                (
                    "Family Bike Ride",
                    "Guided ride along the coastal trail",
                    "Family Activities",
                ),
                (
                    "Catamaran Cruise",
                    "Evening cruise with drinks and live music",
                    "Leisure",
                ),
            ] {
                activities.push(Activity {
                    name: name.to_string(),
                    description: description.to_string(),
                    category: category.to_string(),
                });
            }
        }

        store
    }
}

fn reservation(guest: &str, room: &str, check_in: &str, check_out: &str) -> Reservation {
    Reservation {
        guest_name: guest.to_string(),
        room: room.to_string(),
        check_in: check_in.to_string(),
        check_out: check_out.to_string(),
        status: "Confirmed".to_string(),
    }
}

impl ReservationRepository for MemoryStore {
    async fn find_reservation(&self, guest: &str) -> Result<Option<Reservation>> {
        let needle = guest.to_lowercase();
        Ok(self
            .reservations
            .read()
            .iter()
            .find(|reservation| reservation.guest_name.to_lowercase().contains(&needle))
            .cloned())
    }

    async fn upsert_reservation(&self, reservation: Reservation) -> Result<()> {
        let mut reservations = self.reservations.write();
        if let Some(existing) = reservations
            .iter_mut()
            .find(|existing| existing.guest_name == reservation.guest_name)
        {
            *existing = reservation;
        } else {
            reservations.push(reservation);
        }
        Ok(())
    }
}

impl ScheduleRepository for MemoryStore {
    async fn get_employee(&self, employee_id: &str) -> Result<Option<Employee>> {
        Ok(self.employees.read().get(employee_id).cloned())
    }

    async fn update_employee_schedule(
        &self,
        employee_id: &str,
        change: &ShiftChange,
    ) -> Result<Employee> {
        let mut employees = self.employees.write();
        let Some(employee) = employees.get_mut(employee_id) else {
            bail!("Employee {} not found", employee_id);
        };

        employee.shift = change.shift_type.clone();
        employee.scheduled_date = Some(change.date.clone());
        Ok(employee.clone())
    }
}

impl ActivityRepository for MemoryStore {
    async fn find_activities(&self, preference: &str) -> Result<Vec<Activity>> {
        let needle = preference.to_lowercase();
        Ok(self
            .activities
            .read()
            .iter()
            .filter(|activity| {
                activity.category.to_lowercase().contains(&needle)
                    || activity.name.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }

    async fn upsert_activity(&self, activity: Activity) -> Result<()> {
        let mut activities = self.activities.write();
        if let Some(existing) = activities
            .iter_mut()
            .find(|existing| existing.name == activity.name)
        {
            *existing = activity;
        } else {
            activities.push(activity);
        }
        Ok(())
    }
}

impl ConversationRepository for MemoryStore {
    async fn load_log(&self, session_id: &str) -> Result<Option<ConversationLog>> {
        Ok(self.logs.read().get(session_id).cloned())
    }

    async fn upsert_log(&self, log: &ConversationLog) -> Result<()> {
        self.logs.write().insert(log.session_id.clone(), log.clone());
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut removed = 0_u64;
        self.logs.write().retain(|_, log| {
            let keep = log.expires_at > now;
            if !keep {
                removed += 1;
            }
            keep
        });

        Ok(removed)
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .with_context(|| format!("failed connecting to sqlite at {}", database_url))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reservations (
              guest_name TEXT PRIMARY KEY,
              room TEXT NOT NULL,
              check_in TEXT NOT NULL,
              check_out TEXT NOT NULL,
              status TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS employees (
              employee_id TEXT PRIMARY KEY,
              name TEXT NOT NULL,
              department TEXT NOT NULL,
              shift TEXT NOT NULL,
              scheduled_date TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS activities (
              name TEXT PRIMARY KEY,
              description TEXT NOT NULL,
              category TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
              session_id TEXT PRIMARY KEY,
              guest_id TEXT,
              expires_at TEXT NOT NULL,
              turns_json TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl ReservationRepository for SqliteStore {
    async fn find_reservation(&self, guest: &str) -> Result<Option<Reservation>> {
        let row = sqlx::query(
            r#"
            SELECT guest_name, room, check_in, check_out, status
            FROM reservations
            WHERE lower(guest_name) LIKE '%' || ?1 || '%'
            ORDER BY guest_name
            LIMIT 1
            "#,
        )
        .bind(guest.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Reservation {
            guest_name: row.get("guest_name"),
            room: row.get("room"),
            check_in: row.get("check_in"),
            check_out: row.get("check_out"),
            status: row.get("status"),
        }))
    }

    async fn upsert_reservation(&self, reservation: Reservation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reservations (guest_name, room, check_in, check_out, status)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(guest_name) DO UPDATE SET
              room=excluded.room,
              check_in=excluded.check_in,
              check_out=excluded.check_out,
              status=excluded.status
            "#,
        )
        .bind(&reservation.guest_name)
        .bind(&reservation.room)
        .bind(&reservation.check_in)
        .bind(&reservation.check_out)
        .bind(&reservation.status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl ScheduleRepository for SqliteStore {
    async fn get_employee(&self, employee_id: &str) -> Result<Option<Employee>> {
        let row = sqlx::query(
            r#"
            SELECT employee_id, name, department, shift, scheduled_date
            FROM employees
            WHERE employee_id = ?1
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Employee {
            employee_id: row.get("employee_id"),
            name: row.get("name"),
            department: row.get("department"),
            shift: row.get("shift"),
            scheduled_date: row.get("scheduled_date"),
        }))
    }

    async fn update_employee_schedule(
        &self,
        employee_id: &str,
        change: &ShiftChange,
    ) -> Result<Employee> {
        let result = sqlx::query(
            r#"
            UPDATE employees
            SET shift = ?2, scheduled_date = ?3
            WHERE employee_id = ?1
            "#,
        )
        .bind(employee_id)
        .bind(&change.shift_type)
        .bind(&change.date)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            bail!("Employee {} not found", employee_id);
        }

        self.get_employee(employee_id)
            .await?
            .with_context(|| format!("employee {} vanished mid-update", employee_id))
    }
}

impl ActivityRepository for SqliteStore {
    async fn find_activities(&self, preference: &str) -> Result<Vec<Activity>> {
        let needle = preference.to_lowercase();
        let rows = sqlx::query(
            r#"
            SELECT name, description, category
            FROM activities
            WHERE lower(category) LIKE '%' || ?1 || '%'
               OR lower(name) LIKE '%' || ?1 || '%'
            ORDER BY name
            "#,
        )
        .bind(needle)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Activity {
                name: row.get("name"),
                description: row.get("description"),
                category: row.get("category"),
            })
            .collect())
    }

    async fn upsert_activity(&self, activity: Activity) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO activities (name, description, category)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(name) DO UPDATE SET
              description=excluded.description,
              category=excluded.category
            "#,
        )
        .bind(&activity.name)
        .bind(&activity.description)
        .bind(&activity.category)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl ConversationRepository for SqliteStore {
    async fn load_log(&self, session_id: &str) -> Result<Option<ConversationLog>> {
        let row = sqlx::query(
            r#"
            SELECT session_id, guest_id, expires_at, turns_json
            FROM conversations
            WHERE session_id = ?1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let turns_json: String = row.get("turns_json");
        let turns = serde_json::from_str(&turns_json).unwrap_or_default();

        Ok(Some(ConversationLog {
            session_id: row.get("session_id"),
            guest_id: row.get("guest_id"),
            expires_at: row
                .get::<String, _>("expires_at")
                .parse()
                .unwrap_or_else(|_| Utc::now()),
            turns,
        }))
    }

    async fn upsert_log(&self, log: &ConversationLog) -> Result<()> {
        let turns_json = serde_json::to_string(&log.turns)?;

        sqlx::query(
            r#"
            INSERT INTO conversations (session_id, guest_id, expires_at, turns_json)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(session_id) DO UPDATE SET
              guest_id=excluded.guest_id,
              expires_at=excluded.expires_at,
              turns_json=excluded.turns_json
            "#,
        )
        .bind(&log.session_id)
        .bind(&log.guest_id)
        .bind(log.expires_at.to_rfc3339())
        .bind(turns_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM conversations WHERE expires_at < ?1")
            .bind(now.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Backing store selected at construction time, never via runtime probing.
#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl Store {
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::seeded())
    }

    pub async fn sqlite(database_url: &str) -> Result<Self> {
        let sqlite = SqliteStore::connect(database_url).await?;
        Ok(Self::Sqlite(sqlite))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Store::Memory(_) => "memory",
            Store::Sqlite(_) => "sqlite",
        }
    }
}

impl ReservationRepository for Store {
    async fn find_reservation(&self, guest: &str) -> Result<Option<Reservation>> {
        match self {
            Store::Memory(store) => store.find_reservation(guest).await,
            Store::Sqlite(store) => store.find_reservation(guest).await,
        }
    }

    async fn upsert_reservation(&self, reservation: Reservation) -> Result<()> {
        match self {
            Store::Memory(store) => store.upsert_reservation(reservation).await,
            Store::Sqlite(store) => store.upsert_reservation(reservation).await,
        }
    }
}

impl ScheduleRepository for Store {
    async fn get_employee(&self, employee_id: &str) -> Result<Option<Employee>> {
        match self {
            Store::Memory(store) => store.get_employee(employee_id).await,
            Store::Sqlite(store) => store.get_employee(employee_id).await,
        }
    }

    async fn update_employee_schedule(
        &self,
        employee_id: &str,
        change: &ShiftChange,
    ) -> Result<Employee> {
        match self {
            Store::Memory(store) => store.update_employee_schedule(employee_id, change).await,
            Store::Sqlite(store) => store.update_employee_schedule(employee_id, change).await,
        }
    }
}

impl ActivityRepository for Store {
    async fn find_activities(&self, preference: &str) -> Result<Vec<Activity>> {
        match self {
            Store::Memory(store) => store.find_activities(preference).await,
            Store::Sqlite(store) => store.find_activities(preference).await,
        }
    }

    async fn upsert_activity(&self, activity: Activity) -> Result<()> {
        match self {
            Store::Memory(store) => store.upsert_activity(activity).await,
            Store::Sqlite(store) => store.upsert_activity(activity).await,
        }
    }
}

impl ConversationRepository for Store {
    async fn load_log(&self, session_id: &str) -> Result<Option<ConversationLog>> {
        match self {
            Store::Memory(store) => store.load_log(session_id).await,
            Store::Sqlite(store) => store.load_log(session_id).await,
        }
    }

    async fn upsert_log(&self, log: &ConversationLog) -> Result<()> {
        match self {
            Store::Memory(store) => store.upsert_log(log).await,
            Store::Sqlite(store) => store.upsert_log(log).await,
        }
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        match self {
            Store::Memory(store) => store.purge_expired(now).await,
            Store::Sqlite(store) => store.purge_expired(now).await,
        }
    }
}
