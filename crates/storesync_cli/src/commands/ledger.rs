//! Immigrant ledger commands.

use serde::Serialize;
use std::path::Path;
use storesync_core::CoreError;
use storesync_migration::ledger::{self, ImmigrantTickRow, LedgerScan};
use storesync_storage::{FileBackend, StorageBackend};

/// Ledger row representation for output.
#[derive(Debug, Serialize)]
pub struct RowInfo {
    /// Destination component.
    pub component: String,
    /// Device that issued the source version.
    pub origin_device: String,
    /// Source tick.
    pub origin_tick: u64,
    /// Device that re-issued the version.
    pub immigrant_device: String,
    /// Re-issued tick.
    pub immigrant_tick: u64,
}

impl From<&ImmigrantTickRow> for RowInfo {
    fn from(row: &ImmigrantTickRow) -> Self {
        Self {
            component: row.socid.to_string(),
            origin_device: row.origin_device.to_text(),
            origin_tick: row.origin_tick.as_u64(),
            immigrant_device: row.immigrant_device.to_text(),
            immigrant_tick: row.immigrant_tick.as_u64(),
        }
    }
}

fn read(path: &Path) -> Result<LedgerScan, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("ledger file {} not found", path.display()).into());
    }
    let backend = FileBackend::open_read_only(path)?;
    Ok(ledger::scan(&backend.read_all()?)?)
}

/// Runs the ledger dump command.
pub fn dump(
    path: &Path,
    limit: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let scanned = read(path)?;
    let rows = collect_rows(&scanned, limit);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        _ => {
            print_text_output(&rows);
        }
    }
    if scanned.torn_bytes > 0 {
        eprintln!(
            "warning: {} trailing bytes after offset {} form an incomplete frame",
            scanned.torn_bytes, scanned.valid_len
        );
    }
    Ok(())
}

fn collect_rows(scanned: &LedgerScan, limit: Option<usize>) -> Vec<RowInfo> {
    scanned
        .rows
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(RowInfo::from)
        .collect()
}

fn print_text_output(rows: &[RowInfo]) {
    if rows.is_empty() {
        println!("No ledger rows");
        return;
    }
    println!(
        "{:<44} {:<32} {:>8} {:<32} {:>8}",
        "COMPONENT", "ORIGIN DEVICE", "TICK", "IMMIGRANT DEVICE", "TICK"
    );
    for row in rows {
        println!(
            "{:<44} {:<32} {:>8} {:<32} {:>8}",
            row.component,
            row.origin_device,
            row.origin_tick,
            row.immigrant_device,
            row.immigrant_tick
        );
    }
    println!();
    println!("{} rows", rows.len());
}

/// Runs the ledger verify command.
pub fn verify(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying ledger at {:?}", path);
    println!();

    match read(path) {
        Ok(scanned) => {
            println!("  Frames: {}", scanned.frames);
            println!("  Rows: {}", scanned.rows.len());
            println!("  Valid bytes: {}", scanned.valid_len);
            if scanned.torn_bytes > 0 {
                println!(
                    "  Torn tail: {} bytes (dropped on next open)",
                    scanned.torn_bytes
                );
            }
            println!();
            println!("✓ Ledger verification passed");
            Ok(())
        }
        Err(err) => {
            if let Some(CoreError::LedgerCorruption { offset, message }) =
                err.downcast_ref::<CoreError>()
            {
                println!("  Damaged frame at offset {offset}: {message}");
            }
            println!();
            println!("✗ Ledger verification failed");
            Err(err)
        }
    }
}
