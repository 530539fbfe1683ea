//! JavaScript probes evaluated inside the page.
//!
//! Each function returns a self-contained expression with the selector
//! spliced in as a JSON string literal.

use lapcheck_core::util::js_string;

/// `true` when the element exists, is not hidden by CSS, and has a
/// non-empty box. Mirrors what a user could actually see.
pub fn visibility_probe(selector: &str) -> String {
    format!(
        r#"(() => {{
    const el = document.querySelector({sel});
    if (!el) return false;
    const style = window.getComputedStyle(el);
    if (style.visibility === 'hidden' || style.display === 'none') return false;
    const rect = el.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0;
}})()"#,
        sel = js_string(selector)
    )
}

/// The element's viewport rectangle, or `null` when nothing matches.
pub fn bounding_rect(selector: &str) -> String {
    format!(
        r#"(() => {{
    const el = document.querySelector({sel});
    if (!el) return null;
    const r = el.getBoundingClientRect();
    return {{ x: r.x, y: r.y, width: r.width, height: r.height }};
}})()"#,
        sel = js_string(selector)
    )
}
