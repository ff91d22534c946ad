const IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("children", "child"),
    ("people", "person"),
    ("men", "man"),
    ("women", "woman"),
    ("mice", "mouse"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("geese", "goose"),
    ("oxen", "ox"),
    ("indices", "index"),
    ("matrices", "matrix"),
    ("vertices", "vertex"),
    ("criteria", "criterion"),
    ("phenomena", "phenomenon"),
    ("analyses", "analysis"),
    ("axes", "axis"),
    ("crises", "crisis"),
    ("theses", "thesis"),
    ("leaves", "leaf"),
    ("lives", "life"),
    ("knives", "knife"),
    ("wives", "wife"),
    ("halves", "half"),
    ("shelves", "shelf"),
    ("selves", "self"),
    ("wolves", "wolf"),
    ("heroes", "hero"),
    ("potatoes", "potato"),
    ("tomatoes", "tomato"),
    ("quizzes", "quiz"),
];

/// Words that end in `s` but are not plurals.
const UNINFLECTED: &[&str] = &[
    "news", "series", "species", "analytics", "physics", "mathematics", "status",
    "bus", "gas", "lens", "canvas", "plus", "bonus", "campus", "focus", "virus", "corpus",
    "this", "his", "is", "was", "has", "does", "yes", "us", "its", "always", "sometimes", "perhaps",
    "chaos", "alias", "atlas", "iris", "thesis", "analysis", "basis", "axis", "crisis", "emphasis",
    "diagnosis", "synopsis", "access", "process", "address", "progress", "success", "less",
    "class", "glass", "pass", "boss", "loss", "cross", "express", "press", "wireless", "business",
    "ios", "macos", "sms", "gps", "fitness", "wellness", "darkness", "brightness",
];

/// Singular form of a plural noun, or `None` when `word` is not recognisably plural.
///
/// The leading capital is preserved.
pub fn singular_noun(word: &str) -> Option<String> {
    let lower = word.to_lowercase();
    let singular = singular_lower(&lower)?;
    if singular == lower {
        return None;
    }
    Some(restore_capital(word, &singular))
}

fn singular_lower(lower: &str) -> Option<String> {
    if lower.len() < 3 || !lower.chars().all(|ch| ch.is_alphabetic()) {
        return None;
    }
    if let Some((_, singular)) = IRREGULAR_PLURALS.iter().find(|(plural, _)| *plural == lower) {
        return Some(singular.to_string());
    }
    if UNINFLECTED.contains(&lower) {
        return None;
    }
    if let Some(stem) = lower.strip_suffix("ies") {
        if stem.len() > 1 {
            return Some(format!("{stem}y"));
        }
    }
    for suffix in ["sses", "shes", "ches", "xes", "zzes"] {
        if lower.ends_with(suffix) {
            return Some(lower[..lower.len() - 2].to_string());
        }
    }
    if lower.ends_with("ss") || lower.ends_with("us") || lower.ends_with("is") {
        return None;
    }
    lower.strip_suffix('s').map(str::to_string)
}

fn restore_capital(original: &str, singular: &str) -> String {
    let starts_upper = original.chars().next().is_some_and(char::is_uppercase);
    let all_upper = original.chars().all(char::is_uppercase);
    if all_upper {
        singular.to_uppercase()
    } else if starts_upper {
        crate::utils::capitalize(singular)
    } else {
        singular.to_string()
    }
}
