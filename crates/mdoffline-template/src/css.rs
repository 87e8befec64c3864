//! Document stylesheet.
//!
//! Theme presets only set CSS custom properties; every rule below reads
//! colors from them, so the light/dark toggle is a single attribute switch.

use std::fmt::Write;

use mdoffline_config::{RenderConfig, Theme, TocMode};
use mdoffline_renderer::{AssetManifest, escape_css_value};

const DEFAULT_VARS: &str = concat!(
    ":root{--bg:#ffffff;--fg:#111111;--muted:#555555;--link:#0b63ce;--linkv:#6a32c9;",
    "--border:#dddddd;--code:#f6f8fa;--accent:#eef1f5}",
    "html[data-theme=\"dark\"]{--bg:#0f1115;--fg:#e6e6e6;--muted:#a0a0a0;--link:#6aa7ff;",
    "--linkv:#c39bff;--border:#2a2e37;--code:#1a1d24;--accent:#20232b}",
);

const GITHUB_VARS: &str = concat!(
    ":root{--bg:#ffffff;--fg:#24292f;--muted:#57606a;--link:#0969da;--linkv:#8250df;",
    "--border:#d0d7de;--code:#f6f8fa;--accent:#f6f8fa}",
    "html[data-theme=\"dark\"]{--bg:#0d1117;--fg:#c9d1d9;--muted:#8b949e;--link:#58a6ff;",
    "--linkv:#bc8cff;--border:#30363d;--code:#161b22;--accent:#161b22}",
);

const ACADEMIC_VARS: &str = concat!(
    ":root{--bg:#fffff8;--fg:#1a1a1a;--muted:#666666;--link:#2563eb;--linkv:#7c3aed;",
    "--border:#d4d4d4;--code:#f5f5f5;--accent:#fafafa;--font:Georgia,Cambria,'Times New Roman',serif}",
    "html[data-theme=\"dark\"]{--bg:#1a1a1a;--fg:#e5e5e5;--muted:#a3a3a3;--link:#60a5fa;",
    "--linkv:#a78bfa;--border:#404040;--code:#262626;--accent:#262626}",
    "body{line-height:1.7}main{padding:2rem}",
);

const MINIMAL_VARS: &str = concat!(
    ":root{--bg:#ffffff;--fg:#000000;--muted:#666666;--link:#000000;--linkv:#333333;",
    "--border:#e0e0e0;--code:#f8f8f8;--accent:#fafafa}",
    "html[data-theme=\"dark\"]{--bg:#000000;--fg:#ffffff;--muted:#999999;--link:#ffffff;",
    "--linkv:#cccccc;--border:#333333;--code:#111111;--accent:#0a0a0a}",
    "a{text-decoration:none;border-bottom:1px solid var(--link)}",
);

const DARK_VARS: &str = concat!(
    ":root{--bg:#1e1e1e;--fg:#d4d4d4;--muted:#858585;--link:#4fc3f7;--linkv:#ba68c8;",
    "--border:#3e3e3e;--code:#2d2d2d;--accent:#252526}",
    "html{color-scheme:dark}",
);

const BASE: &str = concat!(
    "*{box-sizing:border-box}",
    "body{margin:0;background:var(--bg);color:var(--fg);line-height:1.55;",
    "font-family:var(--font,-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif);",
    "font-size:var(--base-font-size)}",
    "a{color:var(--link);text-decoration:underline}a:visited{color:var(--linkv)}a:hover{opacity:.8}",
    "header.toolbar{position:sticky;top:0;z-index:10;background:var(--bg);border-bottom:1px solid var(--border)}",
    "header .wrap{max-width:1080px;margin:0 auto;padding:.5rem 1rem;display:flex;gap:.75rem;",
    "align-items:center;justify-content:space-between;flex-wrap:wrap}",
    "header .wrap button{border:1px solid var(--border);background:var(--accent);color:var(--fg);",
    "padding:.3rem .6rem;border-radius:.3rem;cursor:pointer}",
    "main{max-width:var(--content-width);margin:0 auto;padding:1rem}",
    "h1,h2,h3,h4,h5,h6{position:relative;line-height:1.25;margin:1.5rem 0 .75rem 0;scroll-margin-top:80px}",
    "h1{font-size:2rem}h2{font-size:1.5rem}h3{font-size:1.25rem}",
    ".heading-anchor{position:absolute;left:-1.5rem;opacity:0;color:var(--muted);text-decoration:none;padding:.25rem}",
    "h1:hover .heading-anchor,h2:hover .heading-anchor,h3:hover .heading-anchor,",
    "h4:hover .heading-anchor,h5:hover .heading-anchor,h6:hover .heading-anchor,.heading-anchor:focus{opacity:1}",
    "p{margin:.75rem 0}",
    "pre{position:relative;background:var(--code);padding:1rem;overflow:auto;border-radius:.4rem;",
    "border:1px solid var(--border);margin:1rem 0}",
    "pre.output{background:var(--bg);border-left:4px solid var(--muted);border-radius:0 .4rem .4rem 0}",
    "pre.output code{color:var(--muted)}",
    "code{background:var(--code);padding:.15rem .3rem;border-radius:.3rem;border:1px solid var(--border);",
    "font-family:ui-monospace,SFMono-Regular,Consolas,monospace}",
    "pre code{background:transparent;padding:0;border:none}",
    ".copy-btn{position:absolute;top:.5rem;right:.5rem;background:var(--accent);border:1px solid var(--border);",
    "color:var(--fg);padding:.25rem .5rem;border-radius:.3rem;cursor:pointer;font-size:.8rem;opacity:.7}",
    ".copy-btn:hover{opacity:1}.copy-btn.copied{background:var(--link);color:#fff;border-color:var(--link)}",
    ".table-wrapper{overflow-x:auto;margin:1rem 0}.table-wrapper table{margin:0}",
    "table{border-collapse:collapse;margin:1rem 0;width:100%}",
    "th,td{border:1px solid var(--border);padding:.5rem;vertical-align:top;text-align:left}",
    "th{background:var(--accent);font-weight:600}",
    ".align-center{text-align:center}.align-right{text-align:right}",
    "blockquote{border-left:4px solid var(--border);margin:1rem 0;padding:.5rem 1rem;color:var(--muted);background:var(--accent)}",
    "blockquote.alert{color:var(--fg)}blockquote.alert-note,blockquote.alert-tip{border-left-color:var(--link)}",
    "blockquote.alert-warning,blockquote.alert-caution{border-left-color:#d97706}",
    "img{max-width:100%;height:auto}",
    "ul,ol{margin:.75rem 0;padding-left:2rem}li{margin:.25rem 0}",
    "hr{border:none;border-top:1px solid var(--border);margin:2rem 0}",
    "hr.labeled{position:relative;text-align:center;margin:3rem 0;border-top:2px solid var(--border)}",
    "hr.labeled::after{content:attr(data-label);position:absolute;top:50%;left:50%;transform:translate(-50%,-50%);",
    "background:var(--bg);padding:0 1rem;color:var(--muted);font-size:.9em;font-weight:600;white-space:nowrap}",
    ".math-display{display:block;text-align:center;margin:1rem 0;overflow-x:auto}",
    "a.skip{position:absolute;left:-10000px;top:auto;width:1px;height:1px;overflow:hidden}",
    "a.skip:focus{position:static;width:auto;height:auto;margin:.5rem;display:inline-block}",
);

const TOC_TOP: &str = "nav#toc{border:1px solid var(--border);background:var(--accent);padding:1rem;border-radius:.5rem;margin:1rem 0 2rem 0}";

const TOC_SIDEBAR: &str = concat!(
    "#toc-sidebar{position:fixed;left:0;top:0;height:100vh;width:320px;max-width:85vw;background:var(--bg);",
    "border-right:1px solid var(--border);transform:translateX(-100%);transition:transform .2s ease;z-index:1000;",
    "overflow:auto}",
    "#toc-sidebar.open{transform:translateX(0)}",
    "#toc-sidebar .toc-header{display:flex;align-items:center;justify-content:space-between;",
    "padding:.75rem 1rem;border-bottom:1px solid var(--border)}",
    "#toc-sidebar ul{padding:1rem 1.25rem 2rem 1.75rem}",
    "#toc-backdrop{position:fixed;inset:0;background:rgba(0,0,0,.25);z-index:900}#toc-backdrop.hidden{display:none}",
);

const BACK_TO_TOP: &str = concat!(
    ".back-to-top{margin:1rem 0 2rem 0}.back-to-top a{display:inline-block;border:1px solid var(--border);",
    "background:var(--accent);color:var(--fg);padding:.25rem .5rem;border-radius:.3rem;text-decoration:none}",
);

const COLLAPSIBLE: &str = concat!(
    ".collapsible{cursor:pointer;user-select:none}",
    ".collapsible::after{content:\" [-]\";font-weight:normal;color:var(--muted)}",
    ".collapsed+.section-body{display:none}.collapsed.collapsible::after{content:\" [+]\"}",
);

const SEARCH: &str = concat!(
    ".search-wrap{display:flex;gap:.5rem;align-items:center}",
    "#searchBox{min-width:220px;padding:.3rem .5rem;border:1px solid var(--border);border-radius:.3rem;",
    "background:var(--bg);color:var(--fg)}",
    "mark.hl{background:#ffe58f;padding:0 .1rem;border-radius:.1rem}",
);

const LINE_NUMBERS: &str = concat!(
    "pre.line-numbers{padding-left:3.5rem}pre.line-numbers code{display:block;position:relative}",
    "pre.line-numbers .line-numbers-rows{position:absolute;pointer-events:none;top:0;left:-3.5rem;width:3rem;",
    "border-right:1px solid var(--border);user-select:none;counter-reset:linenumber}",
    "pre.line-numbers .line-numbers-rows>span{display:block;counter-increment:linenumber;text-align:right;",
    "padding-right:.5rem;color:var(--muted)}",
    "pre.line-numbers .line-numbers-rows>span:before{content:counter(linenumber)}pre code{line-height:1.5}",
);

const PRINT: &str = concat!(
    "@media print{html{color-scheme:light}body{font-size:11pt}",
    "header.toolbar,#toc-sidebar,#toc-backdrop,.copy-btn,.back-to-top,.heading-anchor{display:none!important}",
    "pre,table,blockquote,img{page-break-inside:avoid}h1,h2,h3,h4,h5,h6{page-break-after:avoid}",
    "a[href^=\"http\"]::after{content:\" (\" attr(href) \")\";font-size:.85em;color:var(--muted)}",
    "main{max-width:100%;padding:.5cm}pre{overflow:visible;white-space:pre-wrap}",
    ".collapsible::after{display:none}.section-body{display:block!important}}",
);

fn theme_vars(theme: Theme) -> &'static str {
    match theme {
        Theme::Default => DEFAULT_VARS,
        Theme::Github => GITHUB_VARS,
        Theme::Academic => ACADEMIC_VARS,
        Theme::Minimal => MINIMAL_VARS,
        Theme::Dark => DARK_VARS,
    }
}

/// Build the document stylesheet, including only the rules the document uses.
pub(crate) fn stylesheet(config: &RenderConfig, manifest: &AssetManifest) -> String {
    let mut css = String::with_capacity(8192);
    css.push_str(theme_vars(config.theme));
    let _ = write!(
        css,
        ":root{{--base-font-size:{}%;--content-width:{}}}",
        config.font_size.percent(),
        escape_css_value(config.content_width.css())
    );
    css.push_str(BASE);

    match manifest.toc_mode {
        TocMode::Top => css.push_str(TOC_TOP),
        TocMode::Sidebar => css.push_str(TOC_SIDEBAR),
        TocMode::None => {}
    }
    if manifest.back_to_top {
        css.push_str(BACK_TO_TOP);
    }
    if manifest.collapsible {
        css.push_str(COLLAPSIBLE);
    }
    if manifest.search {
        css.push_str(SEARCH);
    }
    if manifest.line_numbers {
        css.push_str(LINE_NUMBERS);
    }
    css.push_str(PRINT);
    css
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdoffline_config::{ContentWidth, FontSize};

    fn manifest() -> AssetManifest {
        AssetManifest {
            syntax_theme: None,
            katex: false,
            line_numbers: false,
            collapsible: false,
            back_to_top: false,
            search: false,
            toc_mode: TocMode::None,
            embed_source: false,
        }
    }

    #[test]
    fn test_custom_properties() {
        let config = RenderConfig {
            font_size: FontSize::Large,
            content_width: ContentWidth::Full,
            ..RenderConfig::default()
        };
        let css = stylesheet(&config, &manifest());
        assert!(css.contains(":root{--base-font-size:110%;--content-width:95vw}"));
    }

    #[test]
    fn test_feature_rules_follow_manifest() {
        let config = RenderConfig::default();
        let css = stylesheet(&config, &manifest());
        assert!(!css.contains("mark.hl"));
        assert!(!css.contains(".collapsible"));
        assert!(!css.contains("#toc-sidebar{"));
        assert!(!css.contains("nav#toc"));

        let css = stylesheet(
            &config,
            &AssetManifest {
                search: true,
                collapsible: true,
                toc_mode: TocMode::Sidebar,
                ..manifest()
            },
        );
        assert!(css.contains("mark.hl"));
        assert!(css.contains(".collapsed+.section-body{display:none}"));
        assert!(css.contains("#toc-sidebar{"));
    }

    #[test]
    fn test_dark_theme_has_no_light_variant() {
        let config = RenderConfig {
            theme: Theme::Dark,
            ..RenderConfig::default()
        };
        let css = stylesheet(&config, &manifest());
        assert!(css.starts_with(":root{--bg:#1e1e1e"));
        assert!(!css.contains("html[data-theme=\"dark\"]"));
    }
}
