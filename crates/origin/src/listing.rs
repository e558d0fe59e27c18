//! HTML directory listings.

use std::fs;
use std::io;
use std::path::Path;

/// One listed directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub is_dir: bool,
}

impl ListingEntry {
    /// Name as displayed, directories suffixed with `/`.
    pub fn display_name(&self) -> String {
        if self.is_dir {
            format!("{}/", self.name)
        } else {
            self.name.clone()
        }
    }

    /// Relative link target, percent-encoded.
    pub fn href(&self) -> String {
        let encoded = urlencoding::encode(&self.name);
        if self.is_dir {
            format!("{}/", encoded)
        } else {
            encoded.into_owned()
        }
    }
}

/// Read a directory's entries, sorted case-insensitively by name.
pub fn read_entries(dir: &Path) -> io::Result<Vec<ListingEntry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        // Follows symlinks so a linked directory lists as a directory.
        let is_dir = fs::metadata(entry.path())
            .map(|m| m.is_dir())
            .unwrap_or(false);
        entries.push(ListingEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir,
        });
    }
    entries.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(entries)
}

/// Render the listing page for `url_path` (already decoded, slash-terminated).
pub fn render(url_path: &str, entries: &[ListingEntry]) -> String {
    let title = format!("Directory listing for {}", escape_html_text(url_path));

    let mut html = String::with_capacity(256 + entries.len() * 64);
    html.push_str("<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", title));
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{}</h1>\n<hr>\n<ul>\n", title));
    for entry in entries {
        html.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>\n",
            escape_html_attribute(&entry.href()),
            escape_html_text(&entry.display_name())
        ));
    }
    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    html
}

/// Escape HTML text content.
pub fn escape_html_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape HTML attribute value.
pub fn escape_html_attribute(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_sorted_and_marked() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("wasm")).unwrap();
        fs::write(dir.path().join("style.css"), "").unwrap();
        fs::write(dir.path().join("App.js"), "").unwrap();

        let entries = read_entries(dir.path()).unwrap();
        let names: Vec<String> = entries.iter().map(ListingEntry::display_name).collect();
        assert_eq!(names, vec!["App.js", "style.css", "wasm/"]);
    }

    #[test]
    fn test_render_escapes_names() {
        let entries = vec![
            ListingEntry {
                name: "<script>.js".to_string(),
                is_dir: false,
            },
            ListingEntry {
                name: "my clips".to_string(),
                is_dir: true,
            },
        ];
        let html = render("/media/", &entries);

        assert!(html.contains("<title>Directory listing for /media/</title>"));
        assert!(html.contains("<a href=\"%3Cscript%3E.js\">&lt;script&gt;.js</a>"));
        assert!(html.contains("<a href=\"my%20clips/\">my clips/</a>"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_escape_helpers() {
        assert_eq!(escape_html_text("a & b < c"), "a &amp; b &lt; c");
        assert_eq!(escape_html_attribute("\"x'"), "&quot;x&#39;");
    }
}
