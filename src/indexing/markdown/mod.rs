#[cfg(test)]
mod tests;

use fancy_regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static FRONT_MATTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^---\r?\n[\s\S]*?\r?\n---\r?\n?").expect("valid regex"));

static FRONT_MATTER_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^---\s*\n([\s\S]*?)\n---").expect("valid regex"));

static FRONT_MATTER_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^title:\s*(.+)$").expect("valid regex"));

static FIRST_H1: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#\s+(.+)$").expect("valid regex"));

static SURROUNDING_QUOTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^['"]|['"]$"#).expect("valid regex"));

/// MDX constructs removed before chunking for embeddings
static MDX_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?m)^import\s+.*$").expect("valid regex"),
        Regex::new(r"<[A-Z][A-Za-z]*\b[^>]*/>").expect("valid regex"),
        Regex::new(r"<[A-Z][A-Za-z]*\b[^>]*>[\s\S]*?</[A-Z][A-Za-z]*>").expect("valid regex"),
        Regex::new(r"```[\s\S]*?```").expect("valid regex"),
    ]
});

/// Rewrites that turn a page into plain searchable text, applied in order
static PLAIN_TEXT_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"(?m)^import\s+.+$").expect("valid regex"), ""),
        (Regex::new(r"<[A-Z][^>]*/>").expect("valid regex"), ""),
        (
            Regex::new(r"<[A-Z][^>]*>[\s\S]*?</[A-Z][^>]*>").expect("valid regex"),
            "",
        ),
        (Regex::new(r"<[^>]+>").expect("valid regex"), ""),
        (Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("valid regex"), ""),
        (Regex::new(r"\[([^\]]+)\]\([^)]*\)").expect("valid regex"), "$1"),
        (Regex::new(r"(?m)^#{1,6}\s+").expect("valid regex"), ""),
        (Regex::new(r"(\*{1,3}|_{1,3})([^*_]+)\1").expect("valid regex"), "$2"),
        (Regex::new(r"```[\s\S]*?```").expect("valid regex"), ""),
        (Regex::new(r"`([^`]+)`").expect("valid regex"), "$1"),
        (Regex::new(r"(?m)^>\s+").expect("valid regex"), ""),
        (Regex::new(r"(?m)^[-*_]{3,}\s*$").expect("valid regex"), ""),
        (Regex::new(r"(?m)^\|[-| :]+\|\s*$").expect("valid regex"), ""),
        (Regex::new(r"\|").expect("valid regex"), " "),
        (Regex::new(r"\n{2,}").expect("valid regex"), "\n"),
    ]
});

static LOOSE_FRONT_MATTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^---\s*\n[\s\S]*?\n---\s*\n?").expect("valid regex"));

/// Remove a leading `---` front-matter block
#[inline]
pub fn strip_front_matter(text: &str) -> &str {
    match FRONT_MATTER.find(text) {
        Ok(Some(found)) => text.get(found.end()..).unwrap_or(text),
        _ => text,
    }
}

/// Remove MDX imports, JSX components and fenced code, leaving prose and headings
#[inline]
pub fn strip_mdx(text: &str) -> String {
    MDX_PATTERNS
        .iter()
        .fold(text.to_string(), |acc, regex| {
            regex.replace_all(&acc, "").into_owned()
        })
        .trim()
        .to_string()
}

/// Reduce a markdown/MDX page to the plain text stored in the keyword index
#[inline]
pub fn strip_markdown(content: &str) -> String {
    let without_front_matter = LOOSE_FRONT_MATTER.replace(content, "").into_owned();
    PLAIN_TEXT_PATTERNS
        .iter()
        .fold(without_front_matter, |acc, (regex, replacement)| {
            regex.replace_all(&acc, *replacement).into_owned()
        })
        .trim()
        .to_string()
}

/// Page title: front-matter `title:`, else the first `# ` heading, else the file stem
#[inline]
pub fn extract_title(content: &str, path: &Path) -> String {
    let front_matter_title = FRONT_MATTER_BLOCK
        .captures(content)
        .ok()
        .flatten()
        .and_then(|block| block.get(1))
        .and_then(|block| {
            FRONT_MATTER_TITLE
                .captures(block.as_str())
                .ok()
                .flatten()
                .and_then(|title| title.get(1))
                .map(|title| title.as_str().trim().to_string())
        });
    if let Some(title) = front_matter_title {
        return SURROUNDING_QUOTES.replace_all(&title, "").into_owned();
    }

    let heading = FIRST_H1
        .captures(content)
        .ok()
        .flatten()
        .and_then(|heading| heading.get(1))
        .map(|heading| heading.as_str().trim().to_string());
    if let Some(heading) = heading {
        return heading;
    }

    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
