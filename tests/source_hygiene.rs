use std::fs;
use std::path::{Path, PathBuf};

/// a flagged source line: file, 1-based line number, text
type Finding = (PathBuf, usize, String);

#[test]
fn no_unfinished_work_markers() {
    let findings = scan_sources(|line| {
        comment_of(line).is_some_and(|comment| {
            let comment = comment.to_uppercase();
            comment.contains("TODO") || comment.contains("FIXME")
        })
    });
    report(&findings, "TODO/FIXME comment(s) must be resolved before tests pass");
}

#[test]
fn no_leftover_debug_macros() {
    let findings = scan_sources(|line| {
        let code = comment_of(line).map_or(line, |comment| &line[..line.len() - comment.len()]);
        code.contains("dbg!(")
    });
    report(&findings, "dbg! calls must be removed before tests pass");
}

#[test]
fn comment_detection() {
    assert_eq!(comment_of("let x = 1; // todo"), Some("// todo"));
    assert_eq!(comment_of("    * fixme later"), Some("* fixme later"));
    assert_eq!(comment_of("/* block */"), Some("/* block */"));
    assert_eq!(comment_of("let marker = \"*/ %%% // gitdiff\";"), None);
    assert_eq!(comment_of("let plain = 2;"), None);
    assert_eq!(comment_of("if b == b'\"' { // quote"), Some("// quote"));
}

fn report(findings: &[Finding], message: &str) {
    if findings.is_empty() {
        return;
    }
    eprintln!("\nfound {} offending line(s):", findings.len());
    for (file, line_number, line) in findings {
        eprintln!("  {}:{}: {}", file.display(), line_number, line.trim());
    }
    panic!("{}", message);
}

fn scan_sources(flagged: impl Fn(&str) -> bool) -> Vec<Finding> {
    let mut files = Vec::new();
    collect_rust_files(Path::new("src"), &mut files);
    assert!(!files.is_empty(), "no rust sources found under src/");

    let mut findings = Vec::new();
    for path in files {
        let content = fs::read_to_string(&path).unwrap();
        for (index, line) in content.lines().enumerate() {
            if flagged(line) {
                findings.push((path.clone(), index + 1, line.to_string()));
            }
        }
    }
    findings
}

fn collect_rust_files(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_rust_files(&path, files);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            files.push(path);
        }
    }
}

/// the comment part of a line, ignoring comment markers inside string literals
fn comment_of(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    // continuation line of a block comment
    if trimmed.starts_with('*') && !trimmed.starts_with("*/") {
        return Some(trimmed);
    }

    // a `'"'` char literal would otherwise open a string
    let masked = line.replace("'\"'", "'_'");
    let bytes = masked.as_bytes();
    let mut in_string = false;
    let mut escaped = false;
    for (index, &byte) in bytes.iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
        } else if byte == b'"' {
            in_string = true;
        } else if byte == b'/' && matches!(bytes.get(index + 1), Some(b'/' | b'*')) {
            return Some(&line[index..]);
        }
    }
    None
}
