use clap::Parser;
use std::path::PathBuf;

use satdex::{IndexKind, Mission};

#[derive(Parser)]
#[command(name = "satdex", version, about = "SATDEX ingestion CLI")]
pub struct CliArgs {
    /// Extracted product directory (single product mode)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Directory containing extracted product subdirectories (batch mode)
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// Mission hint; inferred from the directory name when omitted
    #[arg(short, long, value_enum)]
    pub mission: Option<Mission>,

    /// Record id; a fresh UUID when omitted
    #[arg(long)]
    pub id: Option<String>,

    /// Indices to compute after band discovery
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = vec![IndexKind::Ndvi, IndexKind::Smi, IndexKind::Rgb])]
    pub indices: Vec<IndexKind>,

    /// Spatial reference id for raster imports
    #[arg(long, default_value_t = 4326)]
    pub srid: u32,

    /// Directory for rendered index images (defaults to the input directory)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Long-side pixel target for smooth renders (original size when omitted)
    #[arg(long)]
    pub render_size: Option<usize>,

    /// Raster database host
    #[arg(long, default_value = "localhost")]
    pub db_host: String,

    /// Raster database port
    #[arg(long, default_value_t = 5432)]
    pub db_port: u16,

    /// Raster database name
    #[arg(long)]
    pub db_name: Option<String>,

    /// Raster database user (password is read from PGPASSWORD)
    #[arg(long)]
    pub db_user: Option<String>,

    /// Skip raster imports (no database required)
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Enable logging
    #[arg(long, default_value_t = false)]
    pub log: bool,
}
