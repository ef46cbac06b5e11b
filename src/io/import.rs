//! External raster import collaborator.
//!
//! Discovery registers every matched band with a spatial-database-backed
//! raster store by shelling out to `raster2pgsql` piped into `psql`. The
//! invocation is blocking and sequential per band, and success or failure is
//! read off the process exit status. Credentials travel via `PGPASSWORD` in
//! the child environment, never on the command line.
use std::path::Path;
use std::process::Command;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Failed to spawn import command: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Import command exited with status {status} for table {table}")]
    Failed { table: String, status: String },
}

/// Imports a raster file into an external store under a table name.
pub trait RasterImporter: Send + Sync {
    fn import(&self, source: &Path, table: &str, srid: u32) -> Result<(), ImportError>;
}

/// Connection settings for the raster database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    #[serde(skip_serializing, default)]
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        DbConfig {
            host: "localhost".to_string(),
            port: 5432,
            name: "postgres".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
        }
    }
}

/// Importer invoking `raster2pgsql | psql` once per band.
///
/// raster2pgsql options: -I spatial index, -C raster constraints, -F filename
/// column, -t auto tile size.
pub struct Raster2PgsqlImporter {
    pub db: DbConfig,
}

impl Raster2PgsqlImporter {
    pub fn new(db: DbConfig) -> Self {
        Raster2PgsqlImporter { db }
    }

    fn command_line(&self, source: &Path, table: &str, srid: u32) -> String {
        format!(
            "raster2pgsql -s {srid} -I -C -F -t auto '{src}' public.{table} | psql -U {user} -d {db} -h {host} -p {port}",
            srid = srid,
            src = source.display(),
            table = table,
            user = self.db.user,
            db = self.db.name,
            host = self.db.host,
            port = self.db.port,
        )
    }
}

impl RasterImporter for Raster2PgsqlImporter {
    fn import(&self, source: &Path, table: &str, srid: u32) -> Result<(), ImportError> {
        let command_line = self.command_line(source, table, srid);
        debug!(table, command = %command_line, "running raster import");

        let status = Command::new("sh")
            .arg("-c")
            .arg(&command_line)
            .env("PGPASSWORD", &self.db.password)
            .status()?;

        if !status.success() {
            return Err(ImportError::Failed {
                table: table.to_string(),
                status: status.to_string(),
            });
        }
        info!(table, source = %source.display(), "imported raster");
        Ok(())
    }
}

/// Importer that logs what would run and succeeds; used for dry runs and
/// deployments without a raster database.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunImporter;

impl RasterImporter for DryRunImporter {
    fn import(&self, source: &Path, table: &str, srid: u32) -> Result<(), ImportError> {
        warn!(
            table,
            srid,
            source = %source.display(),
            "dry run: raster import skipped"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_shape() {
        let importer = Raster2PgsqlImporter::new(DbConfig {
            host: "db".into(),
            port: 5433,
            name: "dews".into(),
            user: "ingest".into(),
            password: "secret".into(),
        });
        let cmd = importer.command_line(Path::new("/data/b04.jp2"), "s2b_r1_b04", 4326);
        assert!(cmd.starts_with("raster2pgsql -s 4326 -I -C -F -t auto '/data/b04.jp2' public.s2b_r1_b04"));
        assert!(cmd.contains("psql -U ingest -d dews -h db -p 5433"));
        assert!(!cmd.contains("secret"));
    }
}
