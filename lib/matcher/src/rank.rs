use crate::explain::MatchResult;
use ahash::AHashSet;

/// Keep the best-scoring result per taxon, sort by descending similarity
/// and truncate to `max_results`.
///
/// The sort is stable, so equal similarities keep their emission order and
/// the earliest emission of a taxon wins a tie.
pub fn deduplicate(mut results: Vec<MatchResult>, max_results: usize) -> Vec<MatchResult> {
    results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

    let mut seen: AHashSet<String> = AHashSet::with_capacity(results.len());
    let mut ranked = Vec::with_capacity(max_results.min(results.len()));
    for result in results {
        if ranked.len() >= max_results {
            break;
        }
        if seen.insert(result.name.clone()) {
            ranked.push(result);
        }
    }
    ranked
}
