//! Seeds the "puzzles" collection from a Lichess puzzle CSV export.
//!
//! Usage:
//!   import-puzzles <csv-path> [--theme <tag>] [--min-popularity <n>] [--max-rating <n>]
//!
//! Keeps only two-ply puzzles (one opponent move, one winning move), which
//! is what the pattern trainer serves.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use tracing_subscriber::fmt::init;

use chess_patterns_api::config::Config;
use chess_patterns_api::models::Puzzle;

const BATCH_SIZE: usize = 1000;

struct ImportOptions {
    csv_path: String,
    theme: Option<String>,
    min_popularity: i32,
    max_rating: i32,
}

fn parse_args() -> Result<ImportOptions> {
    let mut args = std::env::args().skip(1);

    let csv_path = args
        .next()
        .context("Usage: import-puzzles <csv-path> [--theme <tag>] [--min-popularity <n>] [--max-rating <n>]")?;

    let mut options = ImportOptions {
        csv_path,
        theme: None,
        min_popularity: 90,
        max_rating: 1500,
    };

    while let Some(flag) = args.next() {
        let value = args
            .next()
            .with_context(|| format!("Missing value for {}", flag))?;
        match flag.as_str() {
            "--theme" => options.theme = Some(value),
            "--min-popularity" => options.min_popularity = value.parse()?,
            "--max-rating" => options.max_rating = value.parse()?,
            other => anyhow::bail!("Unknown flag: {}", other),
        }
    }

    Ok(options)
}

#[tokio::main]
async fn main() -> Result<()> {
    init();

    let options = parse_args()?;

    let config = Config::load().expect("Failed to load configuration");
    let mongo_client = mongodb::Client::with_uri_str(&config.mongo_uri)
        .await
        .expect("Failed to connect to MongoDB");
    let collection = mongo_client
        .database(&config.mongo_database)
        .collection::<Puzzle>("puzzles");

    let file = File::open(&options.csv_path)
        .with_context(|| format!("Failed to open {}", options.csv_path))?;
    let reader = BufReader::new(file);

    let mut batch: Vec<Puzzle> = Vec::with_capacity(BATCH_SIZE);
    let mut scanned = 0usize;
    let mut imported = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;

        // Skip the header row and blank lines.
        if index == 0 || line.trim().is_empty() {
            continue;
        }
        scanned += 1;

        let Some(puzzle) = parse_row(&line, &options) else {
            continue;
        };

        batch.push(puzzle);
        if batch.len() >= BATCH_SIZE {
            imported += flush(&collection, &mut batch).await?;
        }
    }
    imported += flush(&collection, &mut batch).await?;

    tracing::info!("Scanned {} rows, imported {} puzzles", scanned, imported);
    println!("Imported {} of {} puzzles", imported, scanned);

    Ok(())
}

/// One CSV row -> Puzzle, or None when the row fails the filters. Columns:
/// PuzzleId,FEN,Moves,Rating,RatingDeviation,Popularity,NbPlays,Themes,...
fn parse_row(line: &str, options: &ImportOptions) -> Option<Puzzle> {
    let columns: Vec<&str> = line.split(',').collect();
    if columns.len() < 8 {
        return None;
    }

    let moves = columns[2];
    let rating: i32 = columns[3].parse().ok()?;
    let popularity: i32 = columns[5].parse().ok()?;
    let themes = columns[7];

    // Exactly one space in Moves = a two-ply puzzle.
    if moves.matches(' ').count() != 1 {
        return None;
    }
    if rating > options.max_rating || popularity < options.min_popularity {
        return None;
    }
    if let Some(theme) = &options.theme {
        if !themes.contains(theme.as_str()) {
            return None;
        }
    }

    Some(Puzzle {
        id: columns[0].to_string(),
        fen: columns[1].to_string(),
        moves: moves.to_string(),
        rating: Some(rating),
        themes: themes.to_string(),
    })
}

async fn flush(
    collection: &mongodb::Collection<Puzzle>,
    batch: &mut Vec<Puzzle>,
) -> Result<usize> {
    if batch.is_empty() {
        return Ok(0);
    }

    // Unordered insert keeps going past duplicate ids on re-import.
    let result = collection
        .insert_many(batch.iter())
        .with_options(mongodb::options::InsertManyOptions::builder().ordered(false).build())
        .await;

    let inserted = match result {
        Ok(outcome) => outcome.inserted_ids.len(),
        Err(e) => {
            tracing::warn!("Batch insert reported errors (duplicates?): {}", e);
            0
        }
    };

    batch.clear();
    Ok(inserted)
}
