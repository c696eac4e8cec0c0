//! Marks CLI - distribution and agreement analysis of exam marks
//!
//! # Commands
//!
//! ```bash
//! marks breakdown marks.xlsx --by examiner --mark initial   # Per-examiner table + KS test
//! marks breakdown marks.xlsx --by paper --board AQA --board OCR
//! marks examiners marks.xlsx                                # Initial vs agreed deviations
//! marks papers marks.xlsx --mark agreed                     # Paper x examiner panels
//! marks agreement marks.xlsx                                # Agree/Differ counts only
//! marks sheets marks.xlsx                                   # List sheet names
//! ```

use clap::{Args, Parser, Subcommand};
use marks_analysis::logs::log_error;
use marks_analysis::{
    analyze_all_examiners, analyze_data, analyze_paper_examiner_distribution, check_agreed_marks,
    load_records, sheet_names, AnalysisOptions, BoardFilter, GroupBy, InputSource, MarkColumn,
    MarkRecord,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "marks")]
#[command(about = "Analyse exam mark distributions and examiner agreement", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Marker workbooks (.xlsx, .xls, .ods) or CSV files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Sheets to read (default: every sheet)
    #[arg(short, long)]
    sheet: Vec<String>,
}

#[derive(Args)]
struct OutputArgs {
    /// Output root for files/ and figures/ (default: current directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip chart rendering
    #[arg(long)]
    no_figures: bool,

    /// Load analysis options from a JSON file
    #[arg(long)]
    options: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Summary table per group with KS p-values against the rest
    Breakdown {
        #[command(flatten)]
        input: InputArgs,

        /// Grouping dimension: examiner, paper, board, candidate
        #[arg(long, value_parser = parse_group_by, default_value = "examiner")]
        by: GroupBy,

        /// Mark column: initial or agreed
        #[arg(long, value_parser = parse_mark_column, default_value = "initial")]
        mark: MarkColumn,

        /// Restrict to an exam board (repeatable; default: all boards)
        #[arg(short, long)]
        board: Vec<String>,

        /// Annotate the chart with per-group counts
        #[arg(long)]
        counts: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Agreed mark consistency and examiner deviation ranking
    Examiners {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Per-paper distribution of each examiner's marks
    Papers {
        #[command(flatten)]
        input: InputArgs,

        /// Mark column: initial or agreed
        #[arg(long, value_parser = parse_mark_column, default_value = "initial")]
        mark: MarkColumn,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Count scripts whose agreed marks agree or differ
    Agreement {
        #[command(flatten)]
        input: InputArgs,
    },

    /// List the sheets of a workbook
    Sheets {
        /// Workbook to inspect
        input: PathBuf,
    },
}

fn parse_group_by(s: &str) -> Result<GroupBy, String> {
    GroupBy::parse(s).ok_or_else(|| format!("unknown grouping '{}' (examiner, paper, board, candidate)", s))
}

fn parse_mark_column(s: &str) -> Result<MarkColumn, String> {
    MarkColumn::parse(s).ok_or_else(|| format!("unknown mark column '{}' (initial, agreed)", s))
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Breakdown { input, by, mark, board, counts, output } => {
            cmd_breakdown(&input, by, mark, &board, counts, &output)
        }

        Commands::Examiners { input, output } => cmd_examiners(&input, &output),

        Commands::Papers { input, mark, output } => cmd_papers(&input, mark, &output),

        Commands::Agreement { input } => cmd_agreement(&input),

        Commands::Sheets { input } => cmd_sheets(&input),
    };

    if let Err(e) = result {
        log_error(format!("Error: {}", e));
        std::process::exit(1);
    }
}

fn load(input: &InputArgs) -> Result<Vec<MarkRecord>, Box<dyn std::error::Error>> {
    let sources: Vec<InputSource> = input
        .inputs
        .iter()
        .map(|path| InputSource::new(path).with_sheets(input.sheet.iter().cloned()))
        .collect();
    Ok(load_records(&sources)?)
}

/// Options file first, then command-line overrides.
fn resolve_options(output: &OutputArgs) -> Result<AnalysisOptions, Box<dyn std::error::Error>> {
    let mut options = match &output.options {
        Some(path) => AnalysisOptions::from_json_file(path)?,
        None => AnalysisOptions::default(),
    };
    if let Some(dir) = &output.output {
        options.output_dir = dir.clone();
    }
    if output.no_figures {
        options.figures = false;
    }
    Ok(options)
}

fn cmd_breakdown(
    input: &InputArgs,
    by: GroupBy,
    mark: MarkColumn,
    boards: &[String],
    counts: bool,
    output: &OutputArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📊 Breakdown of {} by {}", mark, by);

    let mut options = resolve_options(output)?;
    options.counts |= counts;

    let records = load(input)?;
    let boards: Vec<BoardFilter> = boards.iter().cloned().map(BoardFilter::Board).collect();

    let breakdowns = analyze_data(&records, by, mark, &boards, &options)?;

    eprintln!("\n✨ Done! {} table(s) in {}", breakdowns.len(), options.dirs().files.display());
    Ok(())
}

fn cmd_examiners(input: &InputArgs, output: &OutputArgs) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("🧑‍🏫 Examiner agreement analysis");

    let options = resolve_options(output)?;
    let records = load(input)?;

    match analyze_all_examiners(&records, &options)? {
        Some(report) => {
            eprintln!("\n📋 Ranking ({} examiners):", report.ranking.len());
            for (i, deviation) in report.ranking.iter().enumerate() {
                println!("{:3}. {} ({})", i + 1, deviation.examiner, deviation.total_absolute);
            }
            eprintln!("\n✨ Done! Ranking saved to {}", report.ranking_path.display());
        }
        None => eprintln!("\n✨ Done (nothing to compare)"),
    }
    Ok(())
}

fn cmd_papers(
    input: &InputArgs,
    mark: MarkColumn,
    output: &OutputArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 {} by paper and examiner", mark);

    let options = resolve_options(output)?;
    let records = load(input)?;

    let panels = analyze_paper_examiner_distribution(&records, mark, &options)?;

    eprintln!("\n✨ Done! {} paper(s)", panels.len());
    Ok(())
}

fn cmd_agreement(input: &InputArgs) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("🤝 Checking agreed marks");

    let records = load(input)?;
    let counts = check_agreed_marks(&records);

    if counts.total() == 0 {
        eprintln!("   No agreed marks found");
    }
    println!("{}", counts);
    Ok(())
}

fn cmd_sheets(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📖 Sheets in {}", input.display());

    for name in sheet_names(input)? {
        println!("{}", name);
    }
    Ok(())
}
