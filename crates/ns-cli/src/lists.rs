use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, warn};
use ns_compiler::{compile_lists, ParseSummary};
use ns_core::RuleSet;
use ns_loader::FilterSource;

pub struct CompiledLists {
    pub rule_set: RuleSet,
    pub summaries: Vec<ParseSummary>,
    pub total_ms: f64,
}

pub fn compile_files(inputs: &[String], verbose: bool) -> Result<CompiledLists, String> {
    if inputs.is_empty() {
        return Err("No input files specified".to_string());
    }

    let start = Instant::now();
    let mut texts = Vec::with_capacity(inputs.len());
    for path in inputs {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read '{}': {}", path, e))?;
        texts.push(content);
    }

    let (rule_set, summaries) = compile_lists(&texts);

    if verbose {
        for (list_id, (path, summary)) in inputs.iter().zip(&summaries).enumerate() {
            println!(
                "  [{}] {} - {} lines, {} rules, {} skipped",
                list_id,
                Path::new(path).file_name().unwrap_or_default().to_string_lossy(),
                summary.lines,
                summary.rules,
                summary.skipped()
            );
            for (reason, count) in &summary.rejected {
                println!("        {:>6}  {}", count, reason);
            }
        }
    }

    Ok(CompiledLists {
        rule_set,
        summaries,
        total_ms: start.elapsed().as_secs_f64() * 1000.0,
    })
}

/// File holding the cached text of one source.
pub fn cache_path(dir: &Path, source: &FilterSource) -> PathBuf {
    let name: String = source
        .name()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    dir.join(format!("{:03}-{}.txt", source.list_id(), name))
}

/// Seed each source with its cached text, if a cache file exists.
pub fn load_cache(dir: &Path, sources: Vec<FilterSource>) -> Vec<FilterSource> {
    sources
        .into_iter()
        .map(|source| {
            let path = cache_path(dir, &source);
            match fs::read_to_string(&path) {
                Ok(text) => {
                    debug!("Using cached text from {}", path.display());
                    source.with_cached_text(&text)
                }
                Err(_) => source,
            }
        })
        .collect()
}

pub fn store_cache(dir: &Path, sources: &[FilterSource]) -> Result<(), String> {
    fs::create_dir_all(dir).map_err(|e| format!("Failed to create '{}': {}", dir.display(), e))?;
    for source in sources {
        let Some(text) = source.cached_raw_text() else {
            continue;
        };
        let path = cache_path(dir, source);
        if let Err(e) = fs::write(&path, text.as_bytes()) {
            warn!("Failed to write '{}': {}", path.display(), e);
        }
    }
    Ok(())
}
