//! Fuelboard CLI - fuel log dashboard backend
//!
//! # Main Commands
//!
//! ```bash
//! fuelboard serve                         # Start HTTP server (port 3000)
//! fuelboard report frota.csv --placa ABC1D23
//! fuelboard export frota.xlsx -o filtrado.xlsx --combustivel Diesel
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! fuelboard parse frota.csv               # Raw parsed table as JSON
//! ```

use clap::{Args, Parser, Subcommand};
use fuelboard::{
    dashboard, export_file, filter, parse_file_auto, process_file, Facet, FacetSelections,
    ServerConfig,
};
use std::collections::BTreeSet;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "fuelboard")]
#[command(about = "Fuel log dashboard: derive mileage, filter, aggregate, export", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on (default: FUELBOARD_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind (default: FUELBOARD_HOST or 0.0.0.0)
        #[arg(long)]
        host: Option<IpAddr>,
    },

    /// Parse a CSV/XLSX file and output the raw table as JSON
    Parse {
        /// Input file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Metrics and chart series for a file, optionally filtered
    Report {
        /// Input file
        input: PathBuf,

        #[command(flatten)]
        facets: FacetArgs,

        /// Include the filtered rows
        #[arg(long)]
        rows: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the filtered rows to XLSX (or CSV when the output ends in .csv)
    Export {
        /// Input file
        input: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        facets: FacetArgs,
    },
}

/// Facet filters; repeat a flag to accept several values.
#[derive(Args, Debug, Default)]
struct FacetArgs {
    /// Vehicle plate
    #[arg(long)]
    placa: Vec<String>,

    /// Driver
    #[arg(long)]
    motorista: Vec<String>,

    /// Fuel station
    #[arg(long)]
    posto: Vec<String>,

    /// Fuel type
    #[arg(long)]
    combustivel: Vec<String>,

    /// State
    #[arg(long)]
    estado: Vec<String>,

    /// Month
    #[arg(long)]
    mes: Vec<String>,

    /// Year
    #[arg(long)]
    ano: Vec<String>,
}

impl FacetArgs {
    fn selections(self) -> FacetSelections {
        [
            (Facet::Placa, self.placa),
            (Facet::Motorista, self.motorista),
            (Facet::Posto, self.posto),
            (Facet::Combustivel, self.combustivel),
            (Facet::Estado, self.estado),
            (Facet::Mes, self.mes),
            (Facet::Ano, self.ano),
        ]
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(facet, values)| (facet, values.into_iter().collect::<BTreeSet<String>>()))
        .collect()
    }
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { port, host } => cmd_serve(port, host).await,

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Report {
            input,
            facets,
            rows,
            output,
        } => cmd_report(&input, facets.selections(), rows, output.as_deref()),

        Commands::Export {
            input,
            output,
            facets,
        } => cmd_export(&input, &output, facets.selections()),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn cmd_serve(port: Option<u16>, host: Option<IpAddr>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ServerConfig::from_env()?;
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(host) = host {
        config.host = host;
    }
    fuelboard::server::start_server(config).await
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing: {}", input.display());

    let result = parse_file_auto(input)?;

    if let Some(encoding) = &result.encoding {
        eprintln!("   Encoding: {}", encoding);
    }
    if let Some(delimiter) = result.delimiter {
        eprintln!("   Delimiter: '{}'", format_delimiter(delimiter));
    }
    eprintln!("   Columns: {}", result.table.headers.join(", "));
    eprintln!("✅ Parsed {} rows", result.row_count());

    let json = serde_json::to_string_pretty(&result.table)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_report(
    input: &Path,
    selections: FacetSelections,
    rows: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let processed = process_file(input)?;
    let view = dashboard(&processed.log, &selections, rows);

    eprintln!(
        "📊 {} of {} rows match the filters",
        view.filtered_rows, view.total_rows
    );

    let json = serde_json::to_string_pretty(&view)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_export(
    input: &Path,
    output: &Path,
    selections: FacetSelections,
) -> Result<(), Box<dyn std::error::Error>> {
    let processed = process_file(input)?;
    let filtered = filter(&processed.log, &selections);

    export_file(&filtered, output)?;
    eprintln!("💾 {} rows written to: {}", filtered.len(), output.display());

    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
