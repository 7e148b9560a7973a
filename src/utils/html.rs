use std::collections::HashSet;

use ammonia::Builder;

/// Reduces user-authored text (post bodies, bios) to plain text before it is
/// stored and length-checked.
///
/// Every tag is stripped; <script> and <style> lose their contents too. The
/// text entities ammonia's serializer emits are decoded again, so `1 < 2 & 3`
/// is stored as typed. Clients must escape the text when rendering it.
pub fn plain_text(input: &str) -> String {
    let escaped = Builder::default()
        .tags(HashSet::new())
        .clean(input)
        .to_string();

    unescape_text(&escaped)
}

/// Inverse of the html5ever text-node escaping (`&`, `<`, `>`, U+00A0).
/// `&amp;` goes last so `&amp;lt;` decodes to the literal `&lt;`.
fn unescape_text(escaped: &str) -> String {
    escaped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}
