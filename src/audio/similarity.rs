use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Umbral por defecto, en escala 0–100
pub const DEFAULT_THRESHOLD: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityOptions {
    /// Puntuación mínima aceptada (0–100)
    pub threshold: f64,
    /// Buscar en "título autor" en lugar de solo el título
    pub with_author: bool,
}

impl Default for SimilarityOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            with_author: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarMatch {
    pub index: usize,
    pub score: f64,
}

/// Minúsculas, sin acentos y con los espacios colapsados
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Similitud 0–100 entre dos textos ya normalizados
pub fn ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// Mejor candidato para `query`; los empates se quedan con el primero.
/// `None` si no hay candidatos o el mejor queda por debajo del umbral.
pub fn best_match<I, S>(query: &str, candidates: I, threshold: f64) -> Option<SimilarMatch>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let query = normalize(query);
    let mut best: Option<SimilarMatch> = None;

    for (index, candidate) in candidates.into_iter().enumerate() {
        let score = ratio(&query, &normalize(candidate.as_ref()));
        if best.map_or(true, |b| score > b.score) {
            best = Some(SimilarMatch { index, score });
        }
    }

    best.filter(|b| b.score >= threshold)
}
