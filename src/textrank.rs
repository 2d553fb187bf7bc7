//! Extractive summarization: graph-based sentence ranking (TextRank)
//!
//! Sentences become graph nodes; edge weights are word-overlap similarity
//! normalized by sentence length. Scores converge by power iteration and the
//! best sentences are emitted in document order.

const DAMPING: f64 = 0.85;
const CONVERGENCE_THRESHOLD: f64 = 1e-4;
const MAX_ITERATIONS: usize = 100;

/// Split English prose into sentences on `.`, `!`, `?` followed by
/// whitespace (or end of input). Trailing text without a terminator still
/// counts as a sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = match chars.peek() {
                None => true,
                Some(next) => next.is_whitespace(),
            };
            if at_boundary {
                let trimmed = current.trim();
                if !trimmed.is_empty() {
                    sentences.push(trimmed.to_string());
                }
                current.clear();
            }
        }
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }

    sentences
}

/// Lowercase alphanumeric word tokens of one sentence
fn tokenize(sentence: &str) -> Vec<String> {
    sentence
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// TextRank edge weight: shared-word count normalized by log sentence
/// lengths. Degenerate (empty or single-word) pairs get weight 0.
fn similarity(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let shared = a.iter().filter(|word| b.contains(word)).count() as f64;
    let norm = (a.len() as f64).ln() + (b.len() as f64).ln();
    if norm <= f64::EPSILON {
        return 0.0;
    }

    shared / norm
}

/// Select the `count` highest-ranked sentences of `text`, returned in
/// document order. Returns every sentence when there are `count` or fewer.
pub fn top_sentences(text: &str, count: usize) -> Vec<String> {
    let sentences = split_sentences(text);
    if count == 0 || sentences.is_empty() {
        return Vec::new();
    }
    if sentences.len() <= count {
        return sentences;
    }

    let tokens: Vec<Vec<String>> = sentences.iter().map(|s| tokenize(s)).collect();
    let n = sentences.len();

    let mut weights = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let w = similarity(&tokens[i], &tokens[j]);
            weights[i][j] = w;
            weights[j][i] = w;
        }
    }
    let row_sums: Vec<f64> = weights.iter().map(|row| row.iter().sum()).collect();

    let mut scores = vec![1.0; n];
    for _ in 0..MAX_ITERATIONS {
        let mut next = vec![0.0; n];
        for (i, next_score) in next.iter_mut().enumerate() {
            let mut incoming = 0.0;
            for j in 0..n {
                if j != i && row_sums[j] > 0.0 {
                    incoming += weights[j][i] / row_sums[j] * scores[j];
                }
            }
            *next_score = (1.0 - DAMPING) + DAMPING * incoming;
        }

        let delta: f64 = scores
            .iter()
            .zip(&next)
            .map(|(old, new)| (old - new).abs())
            .fold(0.0, f64::max);
        scores = next;
        if delta < CONVERGENCE_THRESHOLD {
            break;
        }
    }

    let mut ranked: Vec<usize> = (0..n).collect();
    ranked.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(std::cmp::Ordering::Equal));

    let mut selected: Vec<usize> = ranked.into_iter().take(count).collect();
    selected.sort_unstable();
    selected.into_iter().map(|i| sentences[i].clone()).collect()
}
