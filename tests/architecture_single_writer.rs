use std::fs;
use std::path::{Path, PathBuf};

/// Files allowed to mutate the exporter metric state
const ALLOWED_STATE_WRITERS: &[&str] = &["src/services/exporter.rs", "src/services/metrics.rs"];

fn collect_rust_files(root: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(root) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_rust_files(&path, out);
            continue;
        }
        if path.extension().and_then(|s| s.to_str()) == Some("rs") {
            out.push(path);
        }
    }
}

fn sources() -> Vec<(String, String)> {
    let repo_root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut files = Vec::new();
    collect_rust_files(&repo_root.join("src"), &mut files);

    files
        .into_iter()
        .map(|file| {
            let rel = file
                .strip_prefix(repo_root)
                .unwrap_or(&file)
                .to_string_lossy()
                .replace('\\', "/");
            let content = fs::read_to_string(&file).unwrap_or_default();
            (rel, content)
        })
        .collect()
}

#[test]
fn cycle_folds_happen_only_in_the_orchestrator() {
    let mut offenders = Vec::new();
    for (rel, content) in sources() {
        if ALLOWED_STATE_WRITERS.contains(&rel.as_str()) {
            continue;
        }
        for (idx, line) in content.lines().enumerate() {
            if line.contains("begin_cycle(") || line.contains(".fold(") || line.contains("fold_liveness(") {
                offenders.push(format!("{}:{}", rel, idx + 1));
            }
        }
    }

    assert!(
        offenders.is_empty(),
        "metric state folded outside the orchestrator:\n{}",
        offenders.join("\n")
    );
}

#[test]
fn probes_do_not_depend_on_services() {
    let mut offenders = Vec::new();
    for (rel, content) in sources() {
        if !rel.starts_with("src/probes/") {
            continue;
        }
        for (idx, line) in content.lines().enumerate() {
            if line.contains("crate::services") || line.contains("MetricState") {
                offenders.push(format!("{}:{}", rel, idx + 1));
            }
        }
    }

    assert!(
        offenders.is_empty(),
        "probes must only talk to the transport and their sample sink:\n{}",
        offenders.join("\n")
    );
}
