use super::*;

const PAGE: &str = "---
title: \"Getting Started\"
sidebar_position: 1
---
import Tabs from '@theme/Tabs';

# Welcome

Read the **quick start** and the [install guide](/docs/install).

![diagram](/img/flow.png)

<PipelineResults config={demo} />

<Tabs>
<TabItem value=\"a\">Hidden tab</TabItem>
</Tabs>

```python
print(\"hidden\")
```

> Note: use `docs-companion` for *everything*.

---

| Name | Value |
|------|-------|
| key | secret |
";

#[test]
fn front_matter_is_stripped() {
    assert_eq!(strip_front_matter("---\ntitle: x\n---\nBody"), "Body");
    assert_eq!(strip_front_matter("---\r\ntitle: x\r\n---\r\nBody"), "Body");
    assert_eq!(strip_front_matter("No front matter"), "No front matter");
    assert_eq!(strip_front_matter("Text\n---\na: b\n---\n"), "Text\n---\na: b\n---\n");
}

#[test]
fn strip_mdx_keeps_headings_and_prose() {
    let stripped = strip_mdx(strip_front_matter(PAGE));

    assert!(stripped.starts_with("# Welcome"));
    assert!(stripped.contains("Read the **quick start**"));
    assert!(!stripped.contains("import Tabs"));
    assert!(!stripped.contains("PipelineResults"));
    assert!(!stripped.contains("Hidden tab"));
    assert!(!stripped.contains("print(\"hidden\")"));
}

#[test]
fn strip_markdown_produces_plain_text() {
    let text = strip_markdown(PAGE);

    assert!(text.starts_with("Welcome\n"), "{}", text);
    assert!(text.contains("Read the quick start and the install guide."));
    assert!(text.contains("Note: use docs-companion for everything."));
    assert!(text.contains("Name   Value"));
    assert!(text.contains("key   secret"));

    for removed in [
        "title:",
        "import",
        "diagram",
        "PipelineResults",
        "Hidden tab",
        "hidden",
        "```",
        "**",
        "](",
        "|",
        "\n\n",
        "---",
    ] {
        assert!(!text.contains(removed), "{:?} should be stripped from {:?}", removed, text);
    }
}

#[test]
fn strip_markdown_html_tags() {
    assert_eq!(strip_markdown("Line<br/>break <b>bold</b>"), "Linebreak bold");
}

#[test]
fn strip_markdown_emphasis_variants() {
    assert_eq!(
        strip_markdown("*one* __two__ ***three*** _four_"),
        "one two three four"
    );
}

#[test]
fn title_from_front_matter() {
    assert_eq!(extract_title(PAGE, Path::new("docs/intro.md")), "Getting Started");
    assert_eq!(
        extract_title("---\ntitle: 'Quoted'\n---\n# Heading", Path::new("x.md")),
        "Quoted"
    );
}

#[test]
fn title_from_heading() {
    assert_eq!(
        extract_title("Intro text\n\n# Pipelines  \n\nBody", Path::new("docs/p.md")),
        "Pipelines"
    );
    assert_eq!(
        extract_title("---\nsidebar_position: 2\n---\n# From Heading", Path::new("x.md")),
        "From Heading"
    );
}

#[test]
fn title_from_file_stem() {
    assert_eq!(
        extract_title("## Only a subheading", Path::new("docs/notebooks/04-live-demo.mdx")),
        "04-live-demo"
    );
}
