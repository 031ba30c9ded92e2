//! Small helpers shared by the client and the CLI.

use std::io::Write;
use std::path::{Path, PathBuf};

/// MIME type of spreadsheet exports
pub const SPREADSHEET_MIME: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Initials of a full name: first letter of the first and second word,
/// uppercased. Returns `None` for a blank name.
pub fn extract_name_initials(full_name: &str) -> Option<String> {
    let mut names = full_name.split_whitespace();
    let first = names.next()?.chars().next()?;

    let mut initials: String = first.to_uppercase().collect();
    if let Some(second) = names.next().and_then(|n| n.chars().next()) {
        initials.extend(second.to_uppercase());
    }
    Some(initials)
}

/// Filename from a `content-disposition` header's `filename=` segment
pub fn parse_content_disposition_filename(header: &str) -> Option<String> {
    let re = regex::Regex::new(r#"(?i)(?:^|[;\s])filename="?([^";]+)"?"#).ok()?;
    let name = re.captures(header)?.get(1)?.as_str().trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Save downloaded bytes as `filename` inside `dir`.
///
/// The data is staged in a temporary file in the same directory and moved
/// into place once fully written. An existing file with the same name is
/// replaced.
pub fn download_file(dir: &Path, filename: &str, data: &[u8]) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let target = dir.join(sanitize_filename(filename));

    let mut staged = tempfile::Builder::new()
        .prefix(".openikt-download-")
        .tempfile_in(dir)?;
    staged.write_all(data)?;
    staged.flush()?;
    staged.persist(&target).map_err(|e| e.error)?;

    tracing::info!("Saved {} bytes to {:?}", data.len(), target);
    Ok(target)
}

/// Strip path components and characters that are unsafe in filenames
fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.');

    if cleaned.is_empty() {
        "download".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_initials() {
        assert_eq!(extract_name_initials("Jane Doe").as_deref(), Some("JD"));
        assert_eq!(extract_name_initials("Cher").as_deref(), Some("C"));
        assert_eq!(extract_name_initials("ada lovelace byron").as_deref(), Some("AL"));
        assert_eq!(extract_name_initials("  jane   doe ").as_deref(), Some("JD"));
    }

    #[test]
    fn test_initials_blank_name() {
        assert_eq!(extract_name_initials(""), None);
        assert_eq!(extract_name_initials("   "), None);
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            parse_content_disposition_filename("attachment; filename=Openikt quiltdiff.xlsx")
                .as_deref(),
            Some("Openikt quiltdiff.xlsx")
        );
        assert_eq!(
            parse_content_disposition_filename(r#"attachment; filename="report.xlsx"; size=10"#)
                .as_deref(),
            Some("report.xlsx")
        );
        assert_eq!(parse_content_disposition_filename("attachment"), None);
        assert_eq!(parse_content_disposition_filename("attachment; filename="), None);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("a\\b\\c.xlsx"), "c.xlsx");
        assert_eq!(sanitize_filename("..."), "download");
        assert_eq!(sanitize_filename("what?.xlsx"), "what.xlsx");
    }

    #[test]
    fn test_download_file() {
        let dir = tempdir().unwrap();
        let path = download_file(dir.path(), "Openikt quiltdiff.xlsx", b"PK\x03\x04").unwrap();

        assert_eq!(path, dir.path().join("Openikt quiltdiff.xlsx"));
        assert_eq!(std::fs::read(&path).unwrap(), b"PK\x03\x04");

        // Only the final file remains
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_download_creates_directory_and_overwrites() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("exports");

        download_file(&nested, "a.xlsx", b"one").unwrap();
        let path = download_file(&nested, "a.xlsx", b"two").unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"two");
    }
}
