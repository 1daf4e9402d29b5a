mod db;
mod openai;
mod pipeline;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::warn;

use pipeline::LookupTable;

#[derive(Parser)]
#[command(name = "halal_scanner", about = "Halal ingredient analysis against a reference dataset")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import the ingredient reference CSV into the local database
    Import {
        /// CSV with ingred_name, canonical_name, halal_non_halal_doubtful columns
        csv: PathBuf,
    },
    /// Classify ingredient text (inline, from --file, or stdin)
    Check {
        /// Ingredient text to classify
        text: Option<String>,
        /// Read the text from a file instead
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Ask the advisory model about unidentified ingredients
        #[arg(long)]
        advice: bool,
    },
    /// Extract ingredient text from a label photo, then classify it
    Scan {
        /// Path to the label image
        image: PathBuf,
        /// Ask the advisory model about unidentified ingredients
        #[arg(long)]
        advice: bool,
    },
    /// Classify every *.txt label in a directory
    Batch {
        dir: PathBuf,
        /// Max labels to process (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Dataset and scan statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Import { csv } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let file = std::fs::File::open(&csv)
                .with_context(|| format!("opening {}", csv.display()))?;
            let records = db::parse_records(file)?;
            let total = db::import_records(&conn, &records)?;
            println!("Imported {} rows ({} ingredients in table)", records.len(), total);
            Ok(())
        }
        Commands::Check { text, file, advice } => {
            let raw = match (text, file) {
                (Some(t), _) => t,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                (None, None) => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            run_check(raw, "text".to_string(), advice).await
        }
        Commands::Scan { image, advice } => {
            let raw = openai::extract_ingredients_from_image(&image).await?;
            println!("Extracted text:\n{}\n", raw.trim());
            run_check(raw, image.display().to_string(), advice).await
        }
        Commands::Batch { dir, limit } => run_batch(&dir, limit),
        Commands::Stats => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Ingredients: {}", s.ingredients);
            println!("  halal:     {}", s.halal);
            println!("  non-halal: {}", s.non_halal);
            println!("  doubtful:  {}", s.doubtful);
            println!("Scans:       {}", s.scans);
            println!("  flagged:   {}", s.flagged_scans);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

fn load_table(conn: &rusqlite::Connection) -> anyhow::Result<LookupTable> {
    let records = db::load_records(conn)?;
    let table = LookupTable::build(&records);
    tracing::debug!("Lookup table built with {} entries", table.len());
    Ok(table)
}

async fn run_check(raw: String, source: String, advice: bool) -> anyhow::Result<()> {
    let conn = db::connect()?;
    db::init_schema(&conn)?;
    let table = load_table(&conn)?;
    if table.is_empty() {
        println!("Reference table is empty. Run 'import' first.");
        return Ok(());
    }

    let analysis = pipeline::analyze(&raw, &table);
    if analysis.ingredients.is_empty() {
        println!("No ingredients detected.");
        db::save_scan(
            &conn,
            &db::ScanRow {
                source,
                raw_text: raw,
                verdict: "empty".to_string(),
                ingredient_count: 0,
                unknown: Vec::new(),
                advice: None,
            },
        )?;
        return Ok(());
    }

    println!("{} ingredients:", analysis.ingredients.len());
    for name in &analysis.ingredients {
        let status = table
            .status_of(name)
            .map(|s| s.as_str())
            .unwrap_or("unknown");
        println!("  {:<44} {}", truncate(name, 44), status);
    }

    let c = &analysis.classification;
    println!("\nVerdict: {}", c.verdict.as_str());
    if !c.unknown.is_empty() {
        println!(
            "{} ingredients could not be identified: {}",
            c.unknown.len(),
            c.unknown.join(", ")
        );
    }

    let advice_text = if advice && !c.unknown.is_empty() {
        match openai::advisory_opinion(&c.unknown).await {
            Ok(text) => {
                println!("\nAdvisory (not a ruling):\n{}", text);
                Some(text)
            }
            Err(e) => {
                warn!("Advisory request failed: {}", e);
                None
            }
        }
    } else {
        None
    };

    db::save_scan(
        &conn,
        &db::ScanRow {
            source,
            raw_text: raw,
            verdict: c.verdict.as_str().to_string(),
            ingredient_count: analysis.ingredients.len(),
            unknown: c.unknown.clone(),
            advice: advice_text,
        },
    )?;
    Ok(())
}

struct BatchCounts {
    halal: usize,
    non_halal: usize,
    doubtful: usize,
    empty: usize,
}

impl BatchCounts {
    fn print(&self) {
        println!(
            "Done: {} halal, {} non-halal, {} doubtful, {} with no ingredients.",
            self.halal, self.non_halal, self.doubtful, self.empty,
        );
    }
}

fn run_batch(dir: &Path, limit: Option<usize>) -> anyhow::Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let conn = db::connect()?;
    db::init_schema(&conn)?;
    let table = load_table(&conn)?;
    if table.is_empty() {
        println!("Reference table is empty. Run 'import' first.");
        return Ok(());
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    files.sort();
    if let Some(n) = limit {
        files.truncate(n);
    }
    if files.is_empty() {
        println!("No .txt labels in {}", dir.display());
        return Ok(());
    }

    let labels: Vec<(String, String)> = files
        .iter()
        .map(|path| {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Ok((path.display().to_string(), raw))
        })
        .collect::<anyhow::Result<_>>()?;

    println!("Classifying {} labels...", labels.len());
    let pb = ProgressBar::new(labels.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec})")?
            .progress_chars("=> "),
    );

    let mut counts = BatchCounts {
        halal: 0,
        non_halal: 0,
        doubtful: 0,
        empty: 0,
    };

    // The table is immutable after build, so chunks classify in parallel
    // against the shared reference.
    for chunk in labels.chunks(100) {
        let rows: Vec<db::ScanRow> = chunk
            .par_iter()
            .map(|(source, raw)| {
                let analysis = pipeline::analyze(raw, &table);
                let verdict = if analysis.ingredients.is_empty() {
                    "empty".to_string()
                } else {
                    analysis.classification.verdict.as_str().to_string()
                };
                db::ScanRow {
                    source: source.clone(),
                    raw_text: raw.clone(),
                    verdict,
                    ingredient_count: analysis.ingredients.len(),
                    unknown: analysis.classification.unknown,
                    advice: None,
                }
            })
            .collect();

        for row in &rows {
            match row.verdict.as_str() {
                "halal" => counts.halal += 1,
                "non-halal" => counts.non_halal += 1,
                "doubtful" => counts.doubtful += 1,
                _ => counts.empty += 1,
            }
        }
        db::save_scans(&conn, &rows)?;
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    counts.print();
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}
