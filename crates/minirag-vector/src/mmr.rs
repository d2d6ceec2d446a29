//! Maximal marginal relevance selection.

/// Cosine similarity; zero-length vectors are dissimilar to everything.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut na, mut nb) = (0f32, 0f32, 0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

/// Greedily pick up to `k` of `candidates` (in rank order), trading relevance to
/// `query` against redundancy with what is already picked:
/// `lambda * sim(query, c) - (1 - lambda) * max(sim(c, picked))`.
///
/// The first pick is the candidate most similar to the query. Ties go to the
/// earlier-ranked candidate. Returns indices into `candidates` in pick order.
pub fn maximal_marginal_relevance<V: AsRef<[f32]>>(query: &[f32], candidates: &[V], lambda: f32, k: usize) -> Vec<usize> {
    let k = k.min(candidates.len());
    if k == 0 {
        return Vec::new();
    }
    let relevance: Vec<f32> = candidates.iter().map(|c| cosine_similarity(query, c.as_ref())).collect();

    let mut first = 0usize;
    for (i, &r) in relevance.iter().enumerate() {
        if r > relevance[first] {
            first = i;
        }
    }
    let mut selected = vec![first];
    // max similarity of each candidate to the picked set, updated incrementally
    let mut redundancy: Vec<f32> = candidates.iter().map(|c| cosine_similarity(c.as_ref(), candidates[first].as_ref())).collect();

    while selected.len() < k {
        let mut best: Option<(usize, f32)> = None;
        for i in 0..candidates.len() {
            if selected.contains(&i) {
                continue;
            }
            let score = lambda * relevance[i] - (1.0 - lambda) * redundancy[i];
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((i, score));
            }
        }
        let Some((pick, _)) = best else { break };
        selected.push(pick);
        for (i, r) in redundancy.iter_mut().enumerate() {
            let sim = cosine_similarity(candidates[i].as_ref(), candidates[pick].as_ref());
            if sim > *r {
                *r = sim;
            }
        }
    }
    selected
}
