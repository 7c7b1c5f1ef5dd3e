//! Text folding helpers shared by the matcher and the boundary adapter.

/// Fold a Spanish accented letter to its unaccented ASCII form.
///
/// Characters outside the Latin-1 accented set are returned unchanged.
pub fn fold_accents(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        'Á' | 'À' | 'Ä' | 'Â' | 'Ã' => 'A',
        'É' | 'È' | 'Ë' | 'Ê' => 'E',
        'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
        'Ó' | 'Ò' | 'Ö' | 'Ô' | 'Õ' => 'O',
        'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
        'Ñ' => 'N',
        'Ç' => 'C',
        other => other,
    }
}

/// Whether `c` is a combining diacritical mark (U+0300 to U+036F), as left
/// behind by decomposed (NFD) spellings like `"e\u{301}"`.
pub fn is_combining_mark(c: char) -> bool {
    matches!(c, '\u{0300}'..='\u{036F}')
}

/// Fold accents in `text`, for both precomposed and decomposed spellings.
///
/// Precomposed letters go through [`fold_accents`]; combining marks are
/// dropped, so `"energía"` and `"energi\u{301}a"` both fold to `"energia"`.
pub fn fold_text(text: &str) -> String {
    text.chars()
        .filter(|c| !is_combining_mark(*c))
        .map(fold_accents)
        .collect()
}

/// Normalize a label for equality comparison: accents folded, upper-cased,
/// surrounding whitespace trimmed and inner runs collapsed to one space.
///
/// `"  Empresa  Regional de Servicio Público "` and
/// `"EMPRESA REGIONAL DE SERVICIO PUBLICO"` normalize to the same string.
pub fn normalize_label(label: &str) -> String {
    let folded: String = fold_text(label).chars().flat_map(char::to_uppercase).collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}
