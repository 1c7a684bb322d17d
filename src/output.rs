//! CLI output formatting, chapter selection and file writing helpers.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use mangadl_core::{AdapterDescriptor, DocumentArtifact, ListingItem, SubItem};

/// Fuzzy match threshold (0.0–1.0); titles at or above this are shown.
pub const FILTER_FUZZY_THRESHOLD: f64 = 0.75;

/// Parses a selection such as `1-3,7` into zero-based indices.
///
/// Positions are 1-based and must lie within `1..=total`. The result is
/// sorted and free of duplicates.
pub fn parse_selection(spec: &str, total: usize) -> Result<Vec<usize>> {
    let mut indices = Vec::new();
    for part in spec.split(',').map(str::trim) {
        if part.is_empty() {
            bail!("Empty entry in chapter selection '{spec}'");
        }
        let (start, end) = match part.split_once('-') {
            Some((start, end)) => (parse_position(start)?, parse_position(end)?),
            None => {
                let position = parse_position(part)?;
                (position, position)
            }
        };
        if start > end {
            bail!("Invalid range '{part}': start is after end");
        }
        if end > total {
            bail!("Chapter {end} is out of range: the series has {total} chapter(s)");
        }
        indices.extend(start - 1..end);
    }
    indices.sort_unstable();
    indices.dedup();
    Ok(indices)
}

fn parse_position(raw: &str) -> Result<usize> {
    let position: usize = raw
        .trim()
        .parse()
        .with_context(|| format!("Invalid chapter position '{}'", raw.trim()))?;
    if position == 0 {
        bail!("Chapter positions start at 1");
    }
    Ok(position)
}

/// Keeps the chapters at `indices`.
pub fn select_chapters(chapters: &[SubItem], indices: &[usize]) -> Vec<SubItem> {
    indices
        .iter()
        .filter_map(|index| chapters.get(*index).cloned())
        .collect()
}

/// Reads a chapter list written by `chapters --json`.
pub fn read_chapters_json(path: &Path) -> Result<Vec<SubItem>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read chapter list '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse chapter list '{}'", path.display()))
}

/// Returns series whose title matches `query`, best match first.
///
/// Exact and substring matches rank above fuzzy ones; fuzzy matches need a
/// similarity of at least [`FILTER_FUZZY_THRESHOLD`].
pub fn filter_series(query: &str, items: Vec<ListingItem>) -> Vec<ListingItem> {
    let query_norm = normalize_text(query);
    if query_norm.is_empty() {
        return items;
    }

    let mut ranked: Vec<(u8, f64, ListingItem)> = items
        .into_iter()
        .filter_map(|item| {
            let title = normalize_text(&item.title);
            let (rank, similarity) = if title == query_norm {
                (2, 1.0)
            } else if title.contains(&query_norm) {
                (1, query_norm.chars().count() as f64 / title.chars().count() as f64)
            } else {
                let similarity = fuzzy_similarity(&query_norm, &title);
                if similarity < FILTER_FUZZY_THRESHOLD {
                    return None;
                }
                (0, similarity)
            };
            Some((rank, similarity, item))
        })
        .collect();

    ranked.sort_by(|left, right| {
        right
            .0
            .cmp(&left.0)
            .then_with(|| right.1.partial_cmp(&left.1).unwrap_or(Ordering::Equal))
    });
    ranked.into_iter().map(|(_, _, item)| item).collect()
}

/// Best similarity between the query and the title or any word in it.
fn fuzzy_similarity(query_norm: &str, title_norm: &str) -> f64 {
    let mut best = strsim::normalized_levenshtein(query_norm, title_norm);
    for token in title_norm.split(|ch: char| !ch.is_alphanumeric()) {
        if token.chars().count() < 3 {
            continue;
        }
        best = best.max(strsim::normalized_levenshtein(query_norm, token));
    }
    best
}

/// Normalizes text for matching: collapse whitespace and lowercase.
fn normalize_text(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Resolves a path in `dir` that does not exist yet.
///
/// Example: `Chapter 1.pdf`, then `Chapter 1_1.pdf`, `Chapter 1_2.pdf`, ...
pub fn resolve_unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let base_path = dir.join(file_name);
    if !base_path.exists() {
        return base_path;
    }

    let (stem, ext) = match file_name.rfind('.') {
        Some(pos) if pos > 0 => (&file_name[..pos], &file_name[pos..]),
        _ => (file_name, ""),
    };
    let mut suffix = 1usize;
    loop {
        let candidate = dir.join(format!("{stem}_{suffix}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
        suffix += 1;
    }
}

/// Writes `artifact` into `dir` without overwriting existing files.
pub fn write_artifact(dir: &Path, artifact: &DocumentArtifact) -> Result<PathBuf> {
    let path = resolve_unique_path(dir, &artifact.file_name);
    fs::write(&path, &artifact.data)
        .with_context(|| format!("Failed to write '{}'", path.display()))?;
    Ok(path)
}

/// Prints adapter descriptors as a table.
pub fn print_sites(sites: &[AdapterDescriptor]) {
    for site in sites {
        let capabilities: Vec<String> = site.capabilities.iter().map(ToString::to_string).collect();
        println!("{:<20} {}", site.name, capabilities.join(", "));
    }
}

/// Prints series, one per line.
pub fn print_series(items: &[ListingItem]) {
    if items.is_empty() {
        println!("No series found.");
        return;
    }
    for item in items {
        println!("{}\n    {}", item.title, item.url);
    }
}

/// Prints chapters with their 1-based selection position.
pub fn print_chapters(chapters: &[SubItem]) {
    if chapters.is_empty() {
        println!("No chapters found.");
        return;
    }
    let width = chapters.len().to_string().len();
    for (index, chapter) in chapters.iter().enumerate() {
        let date = chapter
            .published_at
            .as_deref()
            .map(|d| format!("  ({d})"))
            .unwrap_or_default();
        println!("{:>width$}. {}{date}", index + 1, chapter.title);
    }
}

/// Prints any serializable value as pretty JSON.
pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn listing(title: &str) -> ListingItem {
        ListingItem {
            title: title.to_string(),
            url: format!("https://x/{}", title.len()),
            cover_url: None,
        }
    }

    #[test]
    fn test_parse_selection_ranges_and_singles() {
        assert_eq!(parse_selection("1-3,7", 10).unwrap(), vec![0, 1, 2, 6]);
        assert_eq!(parse_selection(" 2 , 2-3 ", 3).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_parse_selection_rejects_bad_input() {
        assert!(parse_selection("0", 5).is_err());
        assert!(parse_selection("4-2", 5).is_err());
        assert!(parse_selection("1,,2", 5).is_err());
        assert!(parse_selection("abc", 5).is_err());
        let err = parse_selection("6", 5).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_select_chapters_keeps_order() {
        let chapters: Vec<SubItem> = (1..=4)
            .map(|i| SubItem::new(format!("Chapter {i}"), format!("https://x/c{i}")))
            .collect();
        let picked = select_chapters(&chapters, &[0, 3]);
        assert_eq!(picked[0].title, "Chapter 1");
        assert_eq!(picked[1].title, "Chapter 4");
    }

    #[test]
    fn test_filter_series_ranks_exact_then_substring_then_fuzzy() {
        let items = vec![
            listing("Solo Levelling"),
            listing("The Solo Leveling Side Story"),
            listing("Solo Leveling"),
            listing("Tower of God"),
        ];
        let titles: Vec<String> = filter_series("solo leveling", items)
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(
            titles,
            vec![
                "Solo Leveling",
                "The Solo Leveling Side Story",
                "Solo Levelling"
            ]
        );
    }

    #[test]
    fn test_filter_series_empty_query_keeps_everything() {
        let items = vec![listing("A"), listing("B")];
        assert_eq!(filter_series("  ", items).len(), 2);
    }

    #[test]
    fn test_resolve_unique_path_adds_numeric_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let first = resolve_unique_path(dir.path(), "Chapter 1.pdf");
        assert_eq!(first, dir.path().join("Chapter 1.pdf"));
        fs::write(&first, b"x").unwrap();

        let second = resolve_unique_path(dir.path(), "Chapter 1.pdf");
        assert_eq!(second, dir.path().join("Chapter 1_1.pdf"));
    }

    #[test]
    fn test_write_artifact_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = DocumentArtifact {
            display_title: "Chapter 1".to_string(),
            file_name: "Chapter 1.pdf".to_string(),
            data: b"%PDF-1.5".to_vec(),
            page_count: 1,
        };
        let first = write_artifact(dir.path(), &artifact).unwrap();
        let second = write_artifact(dir.path(), &artifact).unwrap();
        assert_ne!(first, second);
        assert_eq!(fs::read(second).unwrap(), b"%PDF-1.5");
    }

    #[test]
    fn test_read_chapters_json_round_trips_cli_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chapters.json");
        let chapters = vec![SubItem::new("Chapter 1", "https://x/c1")];
        fs::write(&path, serde_json::to_string(&chapters).unwrap()).unwrap();

        assert_eq!(read_chapters_json(&path).unwrap(), chapters);
    }
}
