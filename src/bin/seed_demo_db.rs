// Dev utility: reset a database and fill it with deterministic demo work requests.
//
// Usage:
//   cargo run --bin seed_demo_db -- [db_path] [record_count]
//
// The existing file (if any) is backed up next to itself before being replaced.

use chrono::{Duration, Local, NaiveDate};
use rusqlite::{params, Connection};
use std::error::Error;
use std::fs;
use std::path::Path;

use ops_console::app::get_default_db_path;
use ops_console::config::config_keys;
use ops_console::db::{ensure_schema, open_sqlite_connection};
use ops_console::domain::RecordStatus;

const DEFAULT_RECORD_COUNT: i64 = 600;
const HISTORY_DAYS: i64 = 400;

const AREAS: [&str; 5] = ["Eléctrica", "Mecánica", "Civil", "Climatización", "Sanitaria"];
const SUPERVISORS: [&str; 4] = ["Rojas", "Fuentes", "Muñoz", "Soto"];
const INSTALLATIONS: [&str; 6] = [
    "Planta Norte",
    "Planta Sur",
    "Bodega Central",
    "Oficinas",
    "Laboratorio",
    "",
];
const LOCATIONS: [&str; 4] = ["Piso 1", "Piso 2", "Patio", "Subterráneo"];
const DESCRIPTIONS: [&str; 5] = [
    "Cambio de luminaria",
    "Fuga de agua",
    "Revisión de tablero",
    "Reparación de puerta",
    "Mantención preventiva",
];

fn main() -> Result<(), Box<dyn Error>> {
    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(get_default_db_path);

    let record_count = std::env::args()
        .nth(2)
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(DEFAULT_RECORD_COUNT)
        .max(1);

    backup_and_reset_db(&db_path)?;

    let conn = open_sqlite_connection(&db_path)?;
    ensure_schema(&conn)?;

    let today = Local::now().date_naive();
    seed_records(&conn, today, record_count)?;
    seed_config(&conn)?;
    print_quick_counts(&conn)?;

    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

/// Status mix skews older records towards closed states so the stalled panel stays small.
fn status_for(i: i64, age_days: i64) -> RecordStatus {
    match (i % 10, age_days > 30) {
        (0, _) => RecordStatus::Cancelada,
        (1..=5, true) => RecordStatus::Ejecutada,
        (6, true) => RecordStatus::Cerrada,
        (1..=3, false) => RecordStatus::Ejecutada,
        (4 | 5, false) => RecordStatus::EnProceso,
        (7, _) => RecordStatus::Pendiente,
        _ => RecordStatus::Activa,
    }
}

fn seed_records(conn: &Connection, today: NaiveDate, record_count: i64) -> Result<(), Box<dyn Error>> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO work_request
                (id, record_date, location, installation, area, supervisor, description, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;

        for i in 0..record_count {
            // Spread ids over the history window; higher ids are more recent.
            let age_days = HISTORY_DAYS - (i * HISTORY_DAYS / record_count);
            let record_date = today - Duration::days(age_days);
            let idx = i as usize;
            stmt.execute(params![
                i + 1,
                record_date.format("%Y-%m-%d").to_string(),
                LOCATIONS[idx % LOCATIONS.len()],
                INSTALLATIONS[(idx * 7) % INSTALLATIONS.len()],
                AREAS[(idx * 3) % AREAS.len()],
                SUPERVISORS[(idx / 2) % SUPERVISORS.len()],
                DESCRIPTIONS[(idx * 5) % DESCRIPTIONS.len()],
                status_for(i, age_days).as_str(),
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

fn seed_config(conn: &Connection) -> Result<(), Box<dyn Error>> {
    for (key, value) in [
        (config_keys::PAGE_SIZE, "20"),
        (config_keys::STALE_THRESHOLD_DAYS, "10"),
        (config_keys::STALLED_CAP, "6"),
        (config_keys::DEBOUNCE_MS, "500"),
    ] {
        conn.execute(
            "INSERT OR REPLACE INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)",
            params![key, value],
        )?;
    }
    Ok(())
}

fn print_quick_counts(conn: &Connection) -> Result<(), Box<dyn Error>> {
    let mut stmt =
        conn.prepare("SELECT status, COUNT(*) FROM work_request GROUP BY status ORDER BY status")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
    for row in rows {
        let (status, count) = row?;
        println!("{:<12} {}", status, count);
    }
    Ok(())
}
