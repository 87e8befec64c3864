//! Whole-document transformation tests.

use mdoffline_config::{CollapsibleMode, RenderConfig, TocMode};
use mdoffline_renderer::{Pipeline, Rejection, Warning};
use pretty_assertions::assert_eq;

const DOCUMENT: &str = r#"# Release Notes

Prices went from $100 to $50, and $x = 1$ holds.

## Results

| Option | In \| Out | Default |
|--------|:-------:|--------:|
| `--pipe` | a \| b | none |
| `--path` | C:\\tmp\\| off |

```python
def area(r):
    return 3.14 * r ** 2
```

```output
$ mdoffline build notes.md | tee log
```

$$a^2+b^2=c^2$$

## Results

<img src="chart.png" onerror="alert(1)">

<script>alert(1)</script>

Closing words.
"#;

fn transform(markdown: &str, config: &RenderConfig) -> mdoffline_renderer::Transformed {
    Pipeline::new()
        .transform(markdown, config)
        .expect("transform should succeed")
}

#[test]
fn test_full_document() {
    let config = RenderConfig::default();
    let result = transform(DOCUMENT, &config);
    let html = &result.html;

    assert_eq!(result.title.as_deref(), Some("Release Notes"));

    // Exactly one table with three header cells, one holding a literal pipe
    assert_eq!(html.matches("<table>").count(), 1);
    assert_eq!(html.matches("</th>").count(), 3);
    assert!(html.contains("<th class=\"align-center\">In | Out</th>"));
    assert!(html.contains("<td class=\"align-center\">a | b</td>"));
    assert!(html.contains(r#"<td class="align-center">C:\tmp\</td>"#));

    // Output block: no language class, no highlighting
    assert!(html.contains("<pre class=\"output\"><code>$ mdoffline build notes.md | tee log\n</code></pre>"));

    // Python block is highlighted
    assert_eq!(html.matches("<pre class=\"highlight\">").count(), 1);
    assert!(html.contains(r#"<code class="language-python">"#));

    // One inline and one display math node; prices stay text
    assert_eq!(html.matches("math-inline").count(), 1);
    assert_eq!(html.matches("math-display").count(), 1);
    assert!(html.contains("Prices went from $100 to $50"));
    assert!(html.contains(r#"<span class="math math-display">a^2+b^2=c^2</span>"#));

    // Dangerous markup is gone, siblings survive
    assert!(!html.contains("<script"));
    assert!(!html.contains("onerror"));
    assert!(html.contains(r#"<img src="chart.png">"#));
    assert!(html.contains("<p>Closing words.</p>"));

    // No placeholder leaked
    assert!(!html.contains("mdox"));

    assert!(result.manifest.katex);
    assert!(result.manifest.syntax_theme.is_some());
    assert_eq!(result.manifest.toc_mode, TocMode::Top);
}

#[test]
fn test_duplicate_headings_get_unique_ids() {
    let result = transform(DOCUMENT, &RenderConfig::default());
    let ids: Vec<&str> = result.toc.iter().map(|node| node.id.as_str()).collect();
    assert_eq!(ids, vec!["results", "results-2"]);
}

#[test]
fn test_sanitizer_warnings() {
    let result = transform(DOCUMENT, &RenderConfig::default());
    assert!(
        result
            .warnings
            .contains(&Warning::SanitizationRejected(Rejection::Tag(
                "script".to_owned()
            )))
    );
    assert!(result.warnings.contains(&Warning::SanitizationRejected(
        Rejection::Attribute {
            tag: "img".to_owned(),
            attribute: "onerror".to_owned(),
        }
    )));
}

#[test]
fn test_output_fence_ignores_line_numbers() {
    let config = RenderConfig {
        line_numbers: true,
        ..RenderConfig::default()
    };
    let result = transform("```output\nok\n```\n\n```\nplain\n```\n", &config);
    assert!(result.html.contains("<pre class=\"output\"><code>ok\n</code></pre>"));
    assert_eq!(result.html.matches("line-numbers-rows").count(), 1);
    assert!(result.manifest.line_numbers);
}

#[test]
fn test_unclosed_display_math_is_literal() {
    let result = transform("Intro\n\n$$\nx\n\nafter", &RenderConfig::default());
    assert!(result.warnings.contains(&Warning::UnbalancedMath { line: 3 }));
    assert!(result.html.contains("$$"));
    assert!(!result.manifest.katex);
}

#[test]
fn test_ragged_table_rows_warn() {
    let result = transform(
        "| a | b |\n|---|---|\n| 1 |\n| 1 | 2 | 3 |\n",
        &RenderConfig::default(),
    );
    let mismatches = result
        .warnings
        .iter()
        .filter(|w| matches!(w, Warning::TableRowMismatch { .. }))
        .count();
    assert_eq!(mismatches, 2);
    assert!(result.html.contains("<td>1</td><td></td>"));
    assert!(result.html.contains("<td>1</td><td>2 | 3</td>"));
}

#[test]
fn test_sections_and_collapsible() {
    let config = RenderConfig {
        collapsible: CollapsibleMode::H2,
        start_collapsed: true,
        back_to_top: true,
        ..RenderConfig::default()
    };
    let result = transform("## One\n\nBody\n\n## Two\n", &config);
    assert!(result.html.contains(r#"class="collapsible collapsed""#));
    assert_eq!(result.html.matches(r#"class="back-to-top""#).count(), 1);
    assert!(result.manifest.collapsible);
    assert!(result.manifest.back_to_top);
}
