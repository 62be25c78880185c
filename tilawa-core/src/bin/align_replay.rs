//! Offline alignment replay.
//!
//! Feeds recognizer hypotheses (one per line) through an `Aligner` and writes
//! a JSON report of every step, for tuning normalization against real
//! recognizer output.

fn main() {
    if let Err(e) = run() {
        eprintln!("align_replay failed: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    use serde::Serialize;
    use std::path::PathBuf;
    use tilawa_core::{text::passage::AL_FATIHA, Aligner, ReferenceText, SessionStatus};

    #[derive(Debug)]
    struct Args {
        reference: Option<PathBuf>,
        hypotheses: PathBuf,
        output: Option<PathBuf>,
    }

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    struct StepResult {
        line: usize,
        hypothesis: String,
        normalized: String,
        newly_matched_up_to: Option<usize>,
        status: SessionStatus,
        recognized_prefix: String,
    }

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Summary {
        reference_words: usize,
        hypotheses: usize,
        advancing_hypotheses: usize,
        matched_words: usize,
        completed: bool,
        steps: Vec<StepResult>,
    }

    fn parse_args() -> Result<Args, String> {
        let mut reference: Option<PathBuf> = None;
        let mut hypotheses: Option<PathBuf> = None;
        let mut output: Option<PathBuf> = None;

        let mut it = std::env::args().skip(1);
        while let Some(arg) = it.next() {
            match arg.as_str() {
                "--reference" => {
                    let Some(v) = it.next() else {
                        return Err("missing value for --reference".into());
                    };
                    reference = Some(PathBuf::from(v));
                }
                "--hypotheses" => {
                    let Some(v) = it.next() else {
                        return Err("missing value for --hypotheses".into());
                    };
                    hypotheses = Some(PathBuf::from(v));
                }
                "--output" => {
                    let Some(v) = it.next() else {
                        return Err("missing value for --output".into());
                    };
                    output = Some(PathBuf::from(v));
                }
                "--help" | "-h" => {
                    println!(
                        "Usage: cargo run -p tilawa-core --bin align_replay -- \\
  --hypotheses <file.txt> [--reference <passage.txt>] [--output <file.json>]"
                    );
                    std::process::exit(0);
                }
                other => {
                    return Err(format!("unknown argument: {other}"));
                }
            }
        }

        let hypotheses = hypotheses.ok_or("missing required --hypotheses <file>")?;
        Ok(Args {
            reference,
            hypotheses,
            output,
        })
    }

    let args = parse_args()?;

    let passage = match &args.reference {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?,
        None => AL_FATIHA.to_string(),
    };
    let reference = ReferenceText::new(&passage).map_err(|e| e.to_string())?;
    let reference_words = reference.len();
    let mut aligner = Aligner::new(reference);

    let raw = std::fs::read_to_string(&args.hypotheses)
        .map_err(|e| format!("failed to read {}: {e}", args.hypotheses.display()))?;

    let mut steps = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        let hypothesis = line.trim();
        if hypothesis.is_empty() {
            continue;
        }
        let result = aligner.feed(hypothesis);
        steps.push(StepResult {
            line: idx + 1,
            hypothesis: hypothesis.to_string(),
            normalized: tilawa_core::normalize(hypothesis),
            newly_matched_up_to: result.newly_matched_up_to,
            status: result.status,
            recognized_prefix: result.recognized_prefix,
        });
    }

    let summary = Summary {
        reference_words,
        hypotheses: steps.len(),
        advancing_hypotheses: steps
            .iter()
            .filter(|s| s.newly_matched_up_to.is_some())
            .count(),
        matched_words: aligner.progress().matched_words,
        completed: aligner.is_complete(),
        steps,
    };

    let json = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, json)
                .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
            eprintln!(
                "matched {}/{} words over {} hypotheses → {}",
                summary.matched_words,
                summary.reference_words,
                summary.hypotheses,
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}
