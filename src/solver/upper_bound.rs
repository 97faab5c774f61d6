//! Analytic ceiling on the downlinkable volume.
//!
//! Not necessarily achievable; the greedy scheduler never consults it. The
//! estimate combines three relaxations: each satellite images as much as its
//! windows and storage turnover allow, stations pool their receive time
//! with no pairing constraints, and the pooled time is handed out to the
//! fastest-draining satellites first.

use crate::interval::Interval;
use crate::solver::types::Constellation;
use crate::time::TimeMillis;

/// Returns the ceiling in milli-bytes.
pub fn estimate(constellation: &Constellation) -> i64 {
    // Max volume each satellite could capture: a window longer than the
    // time to fill from empty degrades to the steady-state duty cycle of
    // alternating fill and drain.
    let mut imageable = Vec::with_capacity(constellation.satellites());
    for (sat, windows) in constellation.imaging_windows.iter().enumerate() {
        let ty = constellation.types[sat];
        let fill_time = ty.capacity_milli() / ty.fill_rate;
        let duty = ty.drain_rate as f64 / (ty.drain_rate + ty.fill_rate) as f64;
        let mut image_time = 0i64;
        for window in windows {
            let duration = window.duration_ms();
            if duration <= fill_time {
                image_time += duration;
            } else {
                image_time += fill_time + ((duration - fill_time) as f64 * duty) as i64;
            }
        }
        imageable.push(image_time * ty.fill_rate);
    }

    // Total receive time available across stations, each counted as the
    // union of its windows over all satellites.
    let mut station_time: f64 = 0.0;
    for per_satellite in &constellation.downlink_windows {
        station_time += union_length_ms(per_satellite) as f64;
    }

    // Hand the pooled time out greedily, fastest drains first.
    let mut order: Vec<usize> = (0..constellation.satellites()).collect();
    order.sort_unstable_by(|&a, &b| {
        constellation.types[b]
            .drain_rate
            .cmp(&constellation.types[a].drain_rate)
            .then(a.cmp(&b))
    });
    let mut total = 0i64;
    for sat in order {
        let drain_rate = constellation.types[sat].drain_rate;
        let needed = imageable[sat] as f64 / drain_rate as f64;
        if needed <= station_time {
            station_time -= needed;
            total += imageable[sat];
        } else {
            total += (station_time * drain_rate as f64) as i64;
            break;
        }
    }
    total
}

/// Length of the union of all listed windows, by event sweep. Starts sort
/// before ends at equal instants so touching windows union continuously.
fn union_length_ms(windows_per_satellite: &[Vec<Interval>]) -> i64 {
    #[derive(PartialEq, Eq, PartialOrd, Ord)]
    enum Edge {
        Open,
        Close,
    }

    let mut edges: Vec<(TimeMillis, Edge)> = Vec::new();
    for windows in windows_per_satellite {
        for window in windows {
            edges.push((window.start, Edge::Open));
            edges.push((window.end, Edge::Close));
        }
    }
    edges.sort_unstable();

    let mut balance = 0u32;
    let mut opened = 0;
    let mut total = 0;
    for (at, edge) in edges {
        match edge {
            Edge::Open => {
                if balance == 0 {
                    opened = at;
                }
                balance += 1;
            }
            Edge::Close => {
                balance -= 1;
                if balance == 0 {
                    total += at - opened;
                }
            }
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::types::SatelliteType;

    fn single_type(fill_rate: i64, drain_rate: i64, capacity: i64) -> SatelliteType {
        SatelliteType {
            fill_rate,
            drain_rate,
            capacity,
        }
    }

    #[test]
    fn union_merges_overlapping_and_touching_windows() {
        let windows = vec![
            vec![Interval::new(0, 1_000), Interval::new(2_000, 3_000)],
            vec![Interval::new(500, 2_000)],
        ];
        assert_eq!(union_length_ms(&windows), 3_000);
    }

    #[test]
    fn union_of_disjoint_windows_adds_up() {
        let windows = vec![vec![Interval::new(0, 1_000)], vec![Interval::new(5_000, 6_000)]];
        assert_eq!(union_length_ms(&windows), 2_000);
    }

    #[test]
    fn short_window_contributes_its_full_duration() {
        // Fill from empty takes 10 s; a 10 s window images the whole time,
        // and the single station can drain all of it.
        let constellation = Constellation {
            satellite_names: vec!["a".into()],
            station_names: vec!["x".into()],
            types: vec![single_type(100, 100, 1_000)],
            imaging_windows: vec![vec![Interval::new(0, 10_000)]],
            downlink_windows: vec![vec![vec![Interval::new(10_000, 20_000)]]],
        };
        assert_eq!(estimate(&constellation), 1_000_000);
    }

    #[test]
    fn long_window_degrades_to_duty_cycle() {
        // 30 s window, fill takes 10 s: the remaining 20 s alternate at the
        // 50% duty cycle, giving 20 s effective imaging.
        let constellation = Constellation {
            satellite_names: vec!["a".into()],
            station_names: vec!["x".into()],
            types: vec![single_type(100, 100, 1_000)],
            imaging_windows: vec![vec![Interval::new(0, 30_000)]],
            downlink_windows: vec![vec![vec![Interval::new(0, 100_000)]]],
        };
        assert_eq!(estimate(&constellation), 2_000_000);
    }

    #[test]
    fn station_time_caps_the_credit() {
        // The satellite could image 10 s worth but the station only
        // listens for 2 s.
        let constellation = Constellation {
            satellite_names: vec!["a".into()],
            station_names: vec!["x".into()],
            types: vec![single_type(100, 100, 1_000)],
            imaging_windows: vec![vec![Interval::new(0, 10_000)]],
            downlink_windows: vec![vec![vec![Interval::new(10_000, 12_000)]]],
        };
        assert_eq!(estimate(&constellation), 200_000);
    }

    #[test]
    fn faster_drains_are_served_first() {
        // One second of pooled station time; the fast satellite eats it all.
        let constellation = Constellation {
            satellite_names: vec!["fast".into(), "slow".into()],
            station_names: vec!["x".into()],
            types: vec![single_type(100, 1_000, 1_000), single_type(100, 10, 1_000)],
            imaging_windows: vec![
                vec![Interval::new(0, 10_000)],
                vec![Interval::new(0, 10_000)],
            ],
            downlink_windows: vec![vec![vec![Interval::new(10_000, 11_000)], Vec::new()]],
        };
        assert_eq!(estimate(&constellation), 1_000_000);
    }

    #[test]
    fn empty_inputs_estimate_zero() {
        assert_eq!(estimate(&Constellation::default()), 0);
    }
}
