//! Maximum bipartite matching between satellites and stations.
//!
//! Kuhn's augmenting-path algorithm. Satellites are offered in the caller's
//! priority order; the order biases which satellites keep their slots when
//! stations are contended, while the matching itself stays
//! maximum-cardinality on the candidate graph.

/// Computes a maximum matching. `graph[satellite]` lists the candidate
/// station indices; `order` is the priority order satellites augment in.
/// Returns the matched station per satellite.
pub fn maximum_matching(
    stations: usize,
    graph: &[Vec<usize>],
    order: &[usize],
) -> Vec<Option<usize>> {
    let satellites = graph.len();
    let mut station_to_sat: Vec<Option<usize>> = vec![None; stations];
    let mut sat_to_station: Vec<Option<usize>> = vec![None; satellites];
    let mut used = vec![false; satellites];

    // Rounds of augmentation until a whole round changes nothing.
    loop {
        let mut augmented = false;
        used.fill(false);
        for &sat in order {
            if !used[sat]
                && sat_to_station[sat].is_none()
                && augment(sat, graph, &mut used, &mut station_to_sat, &mut sat_to_station)
            {
                augmented = true;
            }
        }
        if !augmented {
            break;
        }
    }
    sat_to_station
}

/// One DFS attempt to extend the matching from `sat`. Returns true when an
/// augmenting chain was found.
fn augment(
    sat: usize,
    graph: &[Vec<usize>],
    used: &mut [bool],
    station_to_sat: &mut [Option<usize>],
    sat_to_station: &mut [Option<usize>],
) -> bool {
    if used[sat] {
        return false;
    }
    used[sat] = true;
    for &station in &graph[sat] {
        let free = match station_to_sat[station] {
            None => true,
            Some(other) => augment(other, graph, used, station_to_sat, sat_to_station),
        };
        if free {
            station_to_sat[station] = Some(sat);
            sat_to_station[sat] = Some(station);
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_order(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn empty_graph_matches_nothing() {
        let graph = vec![Vec::new(), Vec::new()];
        let paired = maximum_matching(1, &graph, &identity_order(2));
        assert_eq!(paired, vec![None, None]);
    }

    #[test]
    fn contended_station_goes_to_the_first_in_order() {
        let graph = vec![vec![0], vec![0]];
        let paired = maximum_matching(1, &graph, &[0, 1]);
        assert_eq!(paired, vec![Some(0), None]);

        let paired = maximum_matching(1, &graph, &[1, 0]);
        assert_eq!(paired, vec![None, Some(0)]);
    }

    #[test]
    fn augmenting_chain_reassigns_an_earlier_satellite() {
        // Satellite 0 can use either station, satellite 1 only station 0.
        // The chain moves satellite 0 over so both end up matched.
        let graph = vec![vec![0, 1], vec![0]];
        let paired = maximum_matching(2, &graph, &[0, 1]);
        assert_eq!(paired, vec![Some(1), Some(0)]);
    }

    #[test]
    fn matching_is_maximum_cardinality() {
        let graph = vec![vec![0], vec![0, 1], vec![1, 2]];
        let paired = maximum_matching(3, &graph, &[2, 1, 0]);
        let matched = paired.iter().filter(|p| p.is_some()).count();
        assert_eq!(matched, 3);
    }

    #[test]
    fn no_station_is_assigned_twice() {
        let graph = vec![vec![0, 1], vec![0, 1], vec![0, 1]];
        let paired = maximum_matching(2, &graph, &identity_order(3));
        let mut seen = Vec::new();
        for station in paired.into_iter().flatten() {
            assert!(!seen.contains(&station));
            seen.push(station);
        }
        assert_eq!(seen.len(), 2);
    }
}
