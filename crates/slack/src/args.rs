/// Splits free-form command text into arguments the way a shell would for
/// simple double-quoted spans.
///
/// Spaces separate arguments unless they sit inside a `"..."` span. Each piece
/// is trimmed and a single pair of enclosing quotes is removed; unbalanced
/// quotes are kept as written. Empty pieces are dropped, so runs of spaces
/// collapse.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut in_quotes = false;
    let mut pieces = Vec::new();
    let mut start = 0usize;

    for (index, ch) in text.char_indices() {
        if ch == '"' {
            in_quotes = !in_quotes;
        }
        if !in_quotes && ch == ' ' {
            pieces.push(&text[start..index]);
            start = index + ch.len_utf8();
        }
    }
    pieces.push(&text[start..]);

    pieces
        .into_iter()
        .map(|piece| strip_matching_quotes(piece.trim()))
        .filter(|piece| !piece.is_empty())
        .map(str::to_owned)
        .collect()
}

fn strip_matching_quotes(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}
