/// Fixed allow-list of document, image, video and archive extensions.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "pdf", "pptx", "docx", "txt", "doc", // documents
    "jpg", "jpeg", "png", "gif", "bmp", "svg", "webp", // images
    "mp4", "mov", "avi", "mkv", "webm", "flv", // video
    "zip", "rar", "7z", "tar", "gz", // archives
];

pub fn allowed_file(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
        }
        _ => false,
    }
}

/// Reduces an uploaded filename to a safe blob-key component: path
/// separators and anything outside [A-Za-z0-9._-] become underscores, and
/// leading dots are stripped so a name can never traverse upward.
pub fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_start_matches(['.', '_']).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(allowed_file("notes.PDF"));
        assert!(allowed_file("lecture.pptx"));
        assert!(!allowed_file("malware.exe"));
        assert!(!allowed_file("no_extension"));
        assert!(!allowed_file(".pdf"));
    }

    #[test]
    fn sanitizes_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_filename("unit 1 notes.pdf"), "unit_1_notes.pdf");
        assert_eq!(sanitize_filename("dbms-u2.pdf"), "dbms-u2.pdf");
    }
}
