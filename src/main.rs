// Entry point and high-level CLI flow.
//
// - The sample sheet is loaded and validated once at startup.
// - `--section` renders one page and exits; without it the user picks pages
//   from a menu and can go back after each one.
// - Every render recomputes its aggregates from the loaded table.
use anyhow::{Context, Result};
use clap::Parser;
use nicu_dashboard::aliases::SubjectAliases;
use nicu_dashboard::config::{DashboardConfig, Section, DEFAULT_HISTOGRAM_BINS};
use nicu_dashboard::dashboard::render_section;
use nicu_dashboard::loader;
use nicu_dashboard::types::SampleRow;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nicu-dashboard")]
#[command(about = "Descriptive statistics for the NICU sample sheet", long_about = None)]
struct Cli {
    /// Sample sheet (.xlsx, .xls or .csv)
    #[arg(short, long, default_value = "cleaned_nicu_data.xlsx")]
    data: PathBuf,

    /// Render one section and exit: overview, milk, growth or dol
    #[arg(short, long)]
    section: Option<Section>,

    /// Lower bound of the aliquot filter (clamped to the data)
    #[arg(long)]
    aliquot_min: Option<f64>,

    /// Upper bound of the aliquot filter (clamped to the data)
    #[arg(long)]
    aliquot_max: Option<f64>,

    /// Subjects to plot on the growth page (default: every eligible subject)
    #[arg(long, value_delimiter = ',')]
    subjects: Vec<String>,

    /// Fold the known duplicate subject IDs into one subject each
    #[arg(long, default_value_t = false)]
    merge_aliases: bool,

    /// Write each rendered table as CSV, plus summary.json, into this directory
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Rows shown per table preview
    #[arg(long, default_value_t = 10)]
    preview_rows: usize,

    /// Number of histogram bins for the aliquot distribution
    #[arg(long, default_value_t = DEFAULT_HISTOGRAM_BINS)]
    bins: usize,

    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> DashboardConfig {
        let subjects = if self.subjects.is_empty() {
            None
        } else {
            Some(
                self.subjects
                    .iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            )
        };
        DashboardConfig {
            data_path: self.data.clone(),
            merge_aliases: self.merge_aliases,
            aliquot_range: (self.aliquot_min, self.aliquot_max),
            subjects,
            histogram_bins: self.bins,
            preview_rows: self.preview_rows,
            export_dir: self.export.clone(),
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
fn read_choice() -> Option<String> {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Ask whether to go back to the section menu. EOF counts as "no".
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Section Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        if matches!(io::stdin().read_line(&mut buf), Ok(0) | Err(_)) {
            return false;
        }
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn run_menu(data: &[SampleRow], config: &DashboardConfig) {
    loop {
        println!("Go to section:");
        for (i, section) in Section::ALL.iter().enumerate() {
            println!("[{}] {}", i + 1, section);
        }
        println!();
        let Some(choice) = read_choice() else {
            break;
        };
        match Section::from_menu(&choice) {
            Some(section) => {
                println!();
                render_section(data, section, config);
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            None => println!("Invalid choice. Please enter 1-{}.\n", Section::ALL.len()),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = cli.config();

    let (rows, report) = loader::load_dataset(&config.data_path)
        .with_context(|| format!("failed to load {}", config.data_path.display()))?;
    for note in report.notes() {
        println!("{note}");
    }

    let data = if config.merge_aliases {
        SubjectAliases::known().merge(&rows)
    } else {
        rows
    };
    info!(rows = data.len(), "table ready");

    match cli.section {
        Some(section) => render_section(&data, section, &config),
        None => run_menu(&data, &config),
    }
    Ok(())
}
