//! Language metadata for changed files.
//!
//! Languages come from `cloc --by-file --csv --quiet .` run inside the
//! repository. cloc being absent, slow or broken is never fatal: the map
//! degrades to empty and every file reports as "Unknown".

use crate::classify::normalize_path;
use crate::git::run_with_timeout;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

pub const UNKNOWN_LANGUAGE: &str = "Unknown";
pub const PROD_CODE: &str = "prod";
pub const TEST_CODE: &str = "test";

/// Languages counted as documentation rather than code.
const DOC_LANGUAGES: [&str; 4] = ["markdown", "text", "restructuredtext", "asciidoc"];

const CLOC_TIMEOUT: Duration = Duration::from_secs(300);

/// Normalized path -> cloc language name for one repository tree.
#[derive(Debug, Clone, Default)]
pub struct LanguageMap {
    files: HashMap<String, String>,
}

impl LanguageMap {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Run cloc in `repo_path` and build the map. Every failure mode logs
    /// a warning and returns an empty map.
    pub fn scan(repo_path: &Path) -> Self {
        let output = match run_with_timeout(
            "cloc",
            &["--by-file", "--csv", "--quiet", "."],
            Some(repo_path),
            CLOC_TIMEOUT,
        ) {
            Ok(output) => output,
            Err(err) => {
                warn!(repo = %repo_path.display(), %err, "cloc unavailable, languages will be Unknown");
                return Self::empty();
            }
        };
        if !output.status_success {
            warn!(repo = %repo_path.display(), "cloc failed, languages will be Unknown");
            return Self::empty();
        }
        Self::parse_csv(&String::from_utf8_lossy(&output.stdout))
    }

    /// Parse cloc's by-file CSV: a header row names the `language` and
    /// `filename` columns, data rows follow. Summary rows are skipped.
    pub fn parse_csv(text: &str) -> Self {
        let mut files = HashMap::new();
        let mut lang_idx = None;
        let mut file_idx = None;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("github.com/AlDanial/cloc") {
                continue;
            }
            let fields: Vec<&str> = line.split(',').collect();

            if lang_idx.is_none() {
                let lowered: Vec<String> =
                    fields.iter().map(|f| f.trim().to_lowercase()).collect();
                if let (Some(li), Some(fi)) = (
                    lowered.iter().position(|f| f == "language"),
                    lowered.iter().position(|f| f == "filename"),
                ) {
                    lang_idx = Some(li);
                    file_idx = Some(fi);
                }
                continue;
            }

            let (li, fi) = (lang_idx.unwrap(), file_idx.unwrap());
            if fields.len() <= li.max(fi) {
                continue;
            }
            let lang = fields[li].trim();
            let fname = fields[fi].trim();
            if lang.is_empty() || fname.is_empty() || lang.eq_ignore_ascii_case("sum") {
                continue;
            }
            files.insert(normalize_path(fname), lang.to_string());
        }

        Self { files }
    }

    /// Language for a normalized path, "Unknown" when unmapped.
    pub fn language_of(&self, normalized_path: &str) -> &str {
        self.files
            .get(normalized_path)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_LANGUAGE)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

pub fn is_doc_language(lang: &str) -> bool {
    let lang = lang.trim().to_lowercase();
    DOC_LANGUAGES.contains(&lang.as_str())
}

/// Path heuristic for test code.
pub fn is_test_file(path: &str) -> bool {
    let p = normalize_path(path).to_lowercase();

    for dir in ["/test/", "/tests/", "/testing/", "/spec/"] {
        if p.contains(dir) {
            return true;
        }
    }

    let filename = p.rsplit('/').next().unwrap_or(&p);

    if filename.ends_with("_test.go") {
        return true;
    }
    if filename.ends_with(".py")
        && (filename.starts_with("test_") || filename.ends_with("_test.py"))
    {
        return true;
    }
    let js_like = [".js", ".jsx", ".ts", ".tsx"]
        .iter()
        .any(|ext| filename.ends_with(ext));
    if js_like {
        if filename.starts_with("test_") {
            return true;
        }
        for marker in [".test.", ".spec."] {
            if filename.contains(marker) {
                return true;
            }
        }
    }

    false
}

/// prod/test bucket name for a path.
pub fn code_type_of(path: &str) -> &'static str {
    if is_test_file(path) {
        TEST_CODE
    } else {
        PROD_CODE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_cloc_by_file_csv() {
        let csv = "\
language,filename,blank,comment,code
Rust,./src/main.rs,3,1,42
Markdown,README.md,2,0,10
SUM,,5,1,52
";
        let map = LanguageMap::parse_csv(csv);
        assert_eq!(map.language_of("src/main.rs"), "Rust");
        assert_eq!(map.language_of("README.md"), "Markdown");
        assert_eq!(map.language_of("missing.c"), UNKNOWN_LANGUAGE);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn csv_without_header_is_empty() {
        let map = LanguageMap::parse_csv("no,header,here\n1,2,3\n");
        assert!(map.is_empty());
    }

    #[test]
    fn doc_languages_are_case_insensitive() {
        assert!(is_doc_language("Markdown"));
        assert!(is_doc_language("  TEXT "));
        assert!(is_doc_language("reStructuredText"));
        assert!(!is_doc_language("Rust"));
        assert!(!is_doc_language(""));
    }

    #[test]
    fn test_file_heuristics() {
        assert!(is_test_file("src/test/java/FooTest.java"));
        assert!(is_test_file("pkg/util_test.go"));
        assert!(is_test_file("app/test_models.py"));
        assert!(is_test_file("app/models_test.py"));
        assert!(is_test_file("web/button.spec.tsx"));
        assert!(is_test_file("web/button.test.js"));
        assert!(is_test_file("app/spec/helpers/a.rb"));

        assert!(!is_test_file("src/main.rs"));
        assert!(!is_test_file("contest/entry.py"));
        assert!(!is_test_file("attested/doc.md"));
        assert_eq!(code_type_of("src/main.rs"), PROD_CODE);
        assert_eq!(code_type_of("crate/tests/it.rs"), TEST_CODE);
    }
}
