//! Upload file name cleaning
//!
//! Clients send whatever the browser reports: full Windows paths, names with
//! reserved characters, control characters.

/// Fallback when nothing usable is left
pub const FALLBACK_FILE_NAME: &str = "file";

/// Reduce a client-supplied name to a safe single path component
///
/// **Algorithm:**
/// 1. Keep only the part after the last `/` or `\`
/// 2. Drop control characters
/// 3. Replace `: * ? " < > |` with `_`
/// 4. Trim surrounding whitespace and dots
/// 5. Empty result → [`FALLBACK_FILE_NAME`]
pub fn clean_file_name(name: &str) -> String {
    let last_component = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);

    let cleaned: String = last_component
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect();

    let trimmed = cleaned.trim_matches(|c: char| c.is_whitespace() || c == '.');
    if trimmed.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}
