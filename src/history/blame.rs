//! Parser for `git blame --line-porcelain` output.
//!
//! The porcelain stream interleaves metadata lines with tab-prefixed content
//! lines. Only `author` and `author-mail` metadata matter here: they set the
//! current attribution, and every following content line is one surviving
//! line owned by that author. Content before any author record, or stray
//! metadata, is skipped; this parser never fails.

/// Ownership of a single surviving line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineOwner<'a> {
    pub author_name: &'a str,
    pub author_email: &'a str,
}

/// Iterator over the surviving lines of one file's porcelain blame output,
/// yielding the owner of each line.
pub struct SurvivingLines<'a> {
    lines: std::str::Lines<'a>,
    author_name: Option<&'a str>,
    author_email: Option<&'a str>,
}

impl<'a> SurvivingLines<'a> {
    pub fn new(porcelain: &'a str) -> Self {
        Self {
            lines: porcelain.lines(),
            author_name: None,
            author_email: None,
        }
    }
}

impl<'a> Iterator for SurvivingLines<'a> {
    type Item = LineOwner<'a>;

    fn next(&mut self) -> Option<LineOwner<'a>> {
        for line in self.lines.by_ref() {
            if let Some(name) = line.strip_prefix("author ") {
                self.author_name = Some(name.trim());
                continue;
            }
            if let Some(mail) = line.strip_prefix("author-mail ") {
                let mail = mail.trim();
                let mail = mail
                    .strip_prefix('<')
                    .and_then(|m| m.strip_suffix('>'))
                    .unwrap_or(mail);
                self.author_email = Some(mail);
                continue;
            }
            if line.starts_with('\t') {
                // content line: attribute to the current author, if any
                if let (Some(name), Some(email)) = (self.author_name, self.author_email) {
                    return Some(LineOwner {
                        author_name: name,
                        author_email: email,
                    });
                }
                continue;
            }
            // other porcelain metadata (committer, summary, sha headers, ...)
        }
        None
    }
}
