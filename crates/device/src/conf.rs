//! Line-preserving editing of the device's INI configuration.
//!
//! Only the entries that are set change; every other line, including
//! comments, blank lines and the case of keys, is written back verbatim.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IniDocument {
    lines: Vec<String>,
}

fn section_name(line: &str) -> Option<&str> {
    line.trim().strip_prefix('[')?.strip_suffix(']').map(str::trim)
}

fn entry_key(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') || trimmed.starts_with('[') {
        return None;
    }
    let end = trimmed.find(['=', ':']).unwrap_or(trimmed.len());
    Some(trimmed[..end].trim_end())
}

impl IniDocument {
    pub fn parse(text: &str) -> Self {
        Self { lines: text.lines().map(str::to_string).collect() }
    }

    /// Line range of the body of `section`, excluding its header.
    fn section(&self, section: &str) -> Option<(usize, usize)> {
        let header = self.lines.iter().position(|line| section_name(line) == Some(section))?;
        let end = self.lines[header + 1..]
            .iter()
            .position(|line| section_name(line).is_some())
            .map_or(self.lines.len(), |offset| header + 1 + offset);
        Some((header + 1, end))
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        let (start, end) = self.section(section)?;
        self.lines[start..end].iter().find(|line| entry_key(line) == Some(key)).map(|line| {
            let trimmed = line.trim_start();
            trimmed.find(['=', ':']).map_or("", |i| trimmed[i + 1..].trim())
        })
    }

    /// Set `key` in `section`, creating either when missing. Keys are matched
    /// case-sensitively.
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        let entry = format!("{key}={value}");
        let Some((start, end)) = self.section(section) else {
            if self.lines.last().is_some_and(|line| !line.trim().is_empty()) {
                self.lines.push(String::new());
            }
            self.lines.push(format!("[{section}]"));
            self.lines.push(entry);
            return;
        };
        if let Some(index) = (start..end).find(|&i| entry_key(&self.lines[i]) == Some(key)) {
            self.lines[index] = entry;
            return;
        }
        // Keep trailing blank lines between this section and the next.
        let insert_at = (start..end).rev().find(|&i| !self.lines[i].trim().is_empty()).map_or(start, |i| i + 1);
        self.lines.insert(insert_at, entry);
    }
}

impl fmt::Display for IniDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONF: &str = "\
[Reading]
; reader preferences
readingFontSize=9
readingLineHeight=1.4

[FeatureSettings]
FullBookPageNumbers=false
ShowDebugInfo=true

[PowerOptions]
AutoOffMinutes=60
";

    #[test]
    fn round_trips_untouched_documents() {
        assert_eq!(IniDocument::parse(CONF).to_string(), CONF);
    }

    #[test]
    fn replaces_existing_entry_in_place() {
        let mut doc = IniDocument::parse(CONF);
        doc.set("FeatureSettings", "FullBookPageNumbers", "true");
        assert_eq!(doc.to_string(), CONF.replace("FullBookPageNumbers=false", "FullBookPageNumbers=true"));
        assert_eq!(doc.get("FeatureSettings", "FullBookPageNumbers"), Some("true"));
    }

    #[test]
    fn appends_to_existing_section() {
        let mut doc = IniDocument::parse(CONF);
        doc.set("Reading", "readingFontFamily", "Georgia");
        let text = doc.to_string();
        assert!(text.contains("readingLineHeight=1.4\nreadingFontFamily=Georgia\n\n[FeatureSettings]"));
        assert!(text.contains("; reader preferences"));
    }

    #[test]
    fn creates_missing_section() {
        let mut doc = IniDocument::parse("[Reading]\nreadingFontSize=9\n");
        assert_eq!(doc.section("FeatureSettings"), None);
        doc.set("FeatureSettings", "FullBookPageNumbers", "false");
        assert_eq!(doc.to_string(), "[Reading]\nreadingFontSize=9\n\n[FeatureSettings]\nFullBookPageNumbers=false\n");
    }

    #[test]
    fn keys_are_case_sensitive() {
        let mut doc = IniDocument::parse("[FeatureSettings]\nfullbookpagenumbers=false\n");
        doc.set("FeatureSettings", "FullBookPageNumbers", "true");
        assert_eq!(doc.get("FeatureSettings", "fullbookpagenumbers"), Some("false"));
        assert_eq!(doc.get("FeatureSettings", "FullBookPageNumbers"), Some("true"));
    }

    #[test]
    fn empty_document() {
        let mut doc = IniDocument::parse("");
        doc.set("FeatureSettings", "FullBookPageNumbers", "true");
        assert_eq!(doc.to_string(), "[FeatureSettings]\nFullBookPageNumbers=true\n");
    }
}
