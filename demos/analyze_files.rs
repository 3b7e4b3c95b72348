//! Example: Detect chord progressions in audio files
//!
//! Usage:
//!   cargo run --release --example analyze_files -- [--simplicity X] [--bpm N] [--jobs N] [--json] <file1> <file2> ...
//!
//! Notes:
//! - Files are analyzed in parallel; each analysis is single-threaded.
//! - All workers share one engine, so the sequence model loads once.
//! - Set RUST_LOG=debug to see per-stage logging.

use rayon::prelude::*;
use std::env;
use std::time::Instant;
use stratum_chords::io::decode_audio;
use stratum_chords::{compute_confidence, AnalysisConfig, ChordEngine, Progression};

fn default_jobs() -> usize {
    let n = std::thread::available_parallelism().map(|v| v.get()).unwrap_or(1);
    std::cmp::max(1, n.saturating_sub(1))
}

fn print_timeline(path: &str, progression: &Progression) {
    let confidence = compute_confidence(progression);
    println!(
        "{}: {:.1}s, {:.1} BPM ({:?}), {}, {} chords ({} unique), confidence {} ({:.2})",
        path,
        progression.duration_seconds,
        progression.bpm,
        progression.metadata.tempo_source,
        progression.time_signature,
        progression.metadata.total_chords,
        progression.metadata.unique_chords,
        confidence.confidence_level(),
        confidence.overall_confidence
    );
    for segment in &progression.segments {
        println!(
            "  {:>8.2}s  {:<8} {:>3} beats  beat {}  {:?}  ({:.2})",
            segment.start_time,
            segment.chord_name(),
            segment.beats,
            segment.beat_position,
            segment.role,
            segment.confidence
        );
    }
    for warning in &progression.metadata.warnings {
        println!("  warning: {}", warning);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut json = false;
    let mut jobs: Option<usize> = None;
    let mut config = AnalysisConfig::default();
    let mut paths: Vec<String> = Vec::new();

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--json" => json = true,
            "--jobs" => {
                let v = args
                    .first()
                    .ok_or("--jobs requires a value")?
                    .parse::<usize>()?;
                args.remove(0);
                jobs = Some(std::cmp::max(1, v));
            }
            "--simplicity" => {
                let v = args
                    .first()
                    .ok_or("--simplicity requires a value")?
                    .parse::<f32>()?;
                args.remove(0);
                config = config.with_simplicity(v);
            }
            "--bpm" => {
                let v = args
                    .first()
                    .ok_or("--bpm requires a value")?
                    .parse::<f32>()?;
                args.remove(0);
                config = config.with_bpm_override(v);
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: analyze_files [--simplicity X] [--bpm N] [--jobs N] [--json] <file1> <file2> ...\n\
                     \n\
                     --simplicity X  0 = keep harmonic detail, 1 = simplest progression (default: 0.5)\n\
                     --bpm N         Tempo override in [40, 220]\n\
                     --jobs N        Parallel workers (default: CPU-1)\n\
                     --json          Emit one JSON object per file (JSONL)\n"
                );
                return Ok(());
            }
            _ => paths.push(a),
        }
    }

    if paths.is_empty() {
        eprintln!("ERROR: Provide at least one audio file path. Use --help for usage.");
        std::process::exit(2);
    }

    let jobs = jobs.unwrap_or_else(default_jobs);
    eprintln!("Analyzing {} files, jobs={}", paths.len(), jobs);

    let engine = ChordEngine::new();
    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;

    let t0 = Instant::now();
    let results: Vec<(String, Result<Progression, String>)> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| {
                let result = decode_audio(path)
                    .map_err(|e| format!("decode failed: {e}"))
                    .and_then(|audio| {
                        engine
                            .analyze(&audio.samples, audio.sample_rate, &config)
                            .map_err(|e| format!("analysis failed: {e}"))
                    });
                (path.clone(), result)
            })
            .collect()
    });

    let mut failures = 0usize;
    for (path, result) in &results {
        match result {
            Ok(progression) if json => {
                println!(
                    "{{\"file\":{},\"bpm\":{:.2},\"chords\":{}}}",
                    serde_json::to_string(path)?,
                    progression.bpm,
                    serde_json::to_string(&progression.to_events())?
                );
            }
            Ok(progression) => print_timeline(path, progression),
            Err(e) => {
                failures += 1;
                if json {
                    println!(
                        "{{\"file\":{},\"error\":{}}}",
                        serde_json::to_string(path)?,
                        serde_json::to_string(e)?
                    );
                } else {
                    eprintln!("{}: {}", path, e);
                }
            }
        }
    }

    eprintln!(
        "Done: {} ok, {} failed in {:.2}s",
        results.len() - failures,
        failures,
        t0.elapsed().as_secs_f32()
    );
    Ok(())
}
