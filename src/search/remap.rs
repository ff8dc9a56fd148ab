//! Index remapping.
//!
//! An index structure that physically reorders its dataset leaves results in
//! structure order. This module restores original point order along either
//! axis: the reference map rewrites each stored neighbor index, the query
//! map relocates each query's result row. Both maps are old-from-new
//! permutations (`map[new] == old`); a `None` map is the identity and the
//! axis is untouched.

use crate::candidate::INVALID_INDEX;
use crate::search::SearchResults;

/// Remap `results` in place along whichever axes have a map.
///
/// The (index, distance) pairing of every candidate is preserved exactly;
/// sentinel slots pass through untouched.
pub fn remap_results(
    results: &mut SearchResults,
    reference_map: Option<&[usize]>,
    query_map: Option<&[usize]>,
) {
    if let Some(map) = reference_map {
        for row in results.neighbors.iter_mut() {
            for index in row.iter_mut() {
                if *index != INVALID_INDEX {
                    *index = map[*index];
                }
            }
        }
    }

    if let Some(map) = query_map {
        let num_queries = results.neighbors.len();
        let mut neighbors = vec![Vec::new(); num_queries];
        let mut distances = vec![Vec::new(); num_queries];
        for (new_index, &old_index) in map.iter().enumerate() {
            neighbors[old_index] = std::mem::take(&mut results.neighbors[new_index]);
            distances[old_index] = std::mem::take(&mut results.distances[new_index]);
        }
        results.neighbors = neighbors;
        results.distances = distances;
    }
}
