use std::{collections::BTreeSet, fmt};

use chrono::{DateTime, Utc};
use database::queries::reservation::GetOnMachines;

#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub id: i64,
    pub machine_id: i64,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub participation_id: Option<i64>,
}

impl Reservation {
    pub fn is_linked(&self) -> bool {
        self.participation_id.is_some()
    }
}

impl From<GetOnMachines> for Reservation {
    fn from(
        GetOnMachines {
            id,
            machine_id,
            start_at,
            end_at,
            participation_id,
        }: GetOnMachines,
    ) -> Self {
        Self {
            id,
            machine_id,
            start_at,
            end_at,
            participation_id,
        }
    }
}

/// Two reservations on the same machine whose intervals intersect.
/// `first` never starts after `second`.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlap {
    pub first: Reservation,
    pub second: Reservation,
}

/// Sorts by `(machine_id, start_at)` and sweeps forward from each reservation
/// until the machine changes or the next start lies past its end.
pub fn find_overlaps(reservations: &mut [Reservation]) -> Vec<Overlap> {
    reservations.sort_by_key(|reservation| {
        (reservation.machine_id, reservation.start_at, reservation.id)
    });

    let mut overlaps = Vec::new();
    for (i, r1) in reservations.iter().enumerate() {
        for r2 in &reservations[i + 1..] {
            if r2.machine_id != r1.machine_id || r2.start_at > r1.end_at {
                break;
            }

            if r1.end_at > r2.start_at {
                overlaps.push(Overlap {
                    first: r1.clone(),
                    second: r2.clone(),
                });
            }
        }
    }

    overlaps
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Only `kept` has a participation.
    Remove { removed: i64, kept: i64 },
    RemoveBoth,
    /// Both sides have a participation.
    Unresolved,
}

pub fn decide(overlap: &Overlap) -> Decision {
    let Overlap { first, second } = overlap;

    match (first.is_linked(), second.is_linked()) {
        (true, false) => Decision::Remove {
            removed: second.id,
            kept: first.id,
        },
        (false, true) => Decision::Remove {
            removed: first.id,
            kept: second.id,
        },
        (false, false) => Decision::RemoveBoth,
        (true, true) => Decision::Unresolved,
    }
}

#[derive(Debug, Default)]
pub struct Plan {
    pub decisions: Vec<(Overlap, Decision)>,
    pub removed: BTreeSet<i64>,
    pub unresolved: BTreeSet<i64>,
}

impl Plan {
    pub fn build(mut reservations: Vec<Reservation>) -> Self {
        reservations.retain(|reservation| {
            let valid = reservation.end_at > reservation.start_at;
            if !valid {
                tracing::warn!(
                    id = reservation.id,
                    start_at = %reservation.start_at,
                    end_at = %reservation.end_at,
                    "Skipping reservation with an empty or inverted interval"
                );
            }

            valid
        });

        let mut plan = Self::default();
        for overlap in find_overlaps(&mut reservations) {
            let decision = decide(&overlap);
            match decision {
                Decision::Remove { removed, .. } => {
                    plan.removed.insert(removed);
                }
                Decision::RemoveBoth => {
                    plan.removed.insert(overlap.first.id);
                    plan.removed.insert(overlap.second.id);
                }
                Decision::Unresolved => {
                    plan.unresolved.insert(overlap.first.id);
                    plan.unresolved.insert(overlap.second.id);
                }
            }
            plan.decisions.push((overlap, decision));
        }

        // Removal only ever receives unlinked ids and unresolved only linked
        // ones, so an id can never be both.
        debug_assert!(plan.removed.is_disjoint(&plan.unresolved));

        plan
    }

    pub fn removed_ids(&self) -> Vec<i64> {
        self.removed.iter().copied().collect()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.decisions.is_empty() {
            writeln!(f, "No overlapping reservations found.")?;
        }

        for (Overlap { first, second }, decision) in &self.decisions {
            writeln!(
                f,
                "Machine {}: reservation {} [{} - {}] overlaps reservation {} [{} - {}]",
                first.machine_id,
                first.id,
                first.start_at,
                first.end_at,
                second.id,
                second.start_at,
                second.end_at,
            )?;
            match decision {
                Decision::Remove { removed, kept } => writeln!(
                    f,
                    "  remove {removed}, keep {kept} (linked to a participation)"
                )?,
                Decision::RemoveBoth => writeln!(
                    f,
                    "  remove both {} and {} (no participation)",
                    first.id, second.id
                )?,
                Decision::Unresolved => writeln!(
                    f,
                    "  unresolved: both {} and {} are linked to a participation",
                    first.id, second.id
                )?,
            }
        }

        writeln!(f, "Reservations to remove: {:?}", self.removed)?;
        writeln!(
            f,
            "Unresolved reservations (manual intervention required): {:?}",
            self.unresolved
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeSet;

    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    use super::*;

    pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, hour, minute, 0).unwrap()
    }

    pub fn reservation(
        id: i64,
        machine_id: i64,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        participation_id: Option<i64>,
    ) -> Reservation {
        Reservation {
            id,
            machine_id,
            start_at,
            end_at,
            participation_id,
        }
    }

    fn pair_ids(overlaps: &[Overlap]) -> BTreeSet<(i64, i64)> {
        overlaps
            .iter()
            .map(|overlap| {
                let (a, b) = (overlap.first.id, overlap.second.id);
                (a.min(b), a.max(b))
            })
            .collect()
    }

    fn exhaustive_pairs(reservations: &[Reservation]) -> BTreeSet<(i64, i64)> {
        let mut pairs = BTreeSet::new();
        for a in reservations {
            for b in reservations {
                if a.id < b.id
                    && a.machine_id == b.machine_id
                    && a.start_at < b.end_at
                    && b.start_at < a.end_at
                {
                    pairs.insert((a.id, b.id));
                }
            }
        }

        pairs
    }

    #[test]
    fn linked_side_is_kept() {
        let plan = Plan::build(vec![
            reservation(1, 1, at(10, 0), at(10, 45), None),
            reservation(2, 1, at(10, 30), at(11, 15), Some(900)),
        ]);

        assert_eq!(plan.decisions.len(), 1);
        assert_eq!(
            plan.decisions[0].1,
            Decision::Remove {
                removed: 1,
                kept: 2
            }
        );
        assert_eq!(plan.removed, BTreeSet::from([1]));
        assert!(plan.unresolved.is_empty());
    }

    #[test]
    fn back_to_back_bookings_do_not_overlap() {
        let plan = Plan::build(vec![
            reservation(3, 1, at(10, 0), at(10, 45), None),
            reservation(4, 1, at(10, 45), at(11, 30), None),
        ]);

        assert!(plan.decisions.is_empty());
        assert!(plan.removed.is_empty());
    }

    #[test]
    fn unlinked_pair_removes_both() {
        let plan = Plan::build(vec![
            reservation(5, 7, at(9, 0), at(10, 0), None),
            reservation(6, 7, at(9, 15), at(9, 45), None),
        ]);

        assert_eq!(plan.decisions[0].1, Decision::RemoveBoth);
        assert_eq!(plan.removed, BTreeSet::from([5, 6]));
    }

    #[test]
    fn linked_pair_is_unresolved() {
        let plan = Plan::build(vec![
            reservation(8, 2, at(12, 0), at(13, 0), Some(80)),
            reservation(9, 2, at(12, 30), at(13, 30), Some(90)),
        ]);

        assert_eq!(plan.decisions[0].1, Decision::Unresolved);
        assert!(plan.removed.is_empty());
        assert_eq!(plan.unresolved, BTreeSet::from([8, 9]));
    }

    #[test]
    fn different_machines_never_overlap() {
        let plan = Plan::build(vec![
            reservation(10, 1, at(8, 0), at(9, 0), None),
            reservation(11, 2, at(8, 0), at(9, 0), None),
        ]);

        assert!(plan.decisions.is_empty());
    }

    #[test]
    fn long_reservation_overlaps_past_a_gap() {
        // 12 covers both 13 and 14 even though 13 ends before 14 starts.
        let mut reservations = vec![
            reservation(14, 1, at(11, 0), at(11, 30), None),
            reservation(12, 1, at(8, 0), at(12, 0), None),
            reservation(13, 1, at(9, 0), at(9, 30), None),
        ];

        assert_eq!(
            pair_ids(&find_overlaps(&mut reservations)),
            BTreeSet::from([(12, 13), (12, 14)])
        );
    }

    #[test]
    fn id_in_several_pairs_is_removed_once() {
        let plan = Plan::build(vec![
            reservation(20, 3, at(8, 0), at(12, 0), None),
            reservation(21, 3, at(9, 0), at(10, 0), Some(1)),
            reservation(22, 3, at(11, 0), at(11, 30), Some(2)),
        ]);

        assert_eq!(plan.decisions.len(), 2);
        assert_eq!(plan.removed, BTreeSet::from([20]));
        assert!(plan.unresolved.is_empty());
    }

    #[test]
    fn removed_and_unresolved_are_disjoint() {
        let plan = Plan::build(vec![
            reservation(30, 4, at(8, 0), at(10, 0), Some(1)),
            reservation(31, 4, at(9, 0), at(11, 0), Some(2)),
            reservation(32, 4, at(9, 30), at(10, 30), None),
        ]);

        assert_eq!(plan.removed, BTreeSet::from([32]));
        assert_eq!(plan.unresolved, BTreeSet::from([30, 31]));
    }

    #[test]
    fn inverted_intervals_are_skipped() {
        let plan = Plan::build(vec![
            reservation(40, 5, at(10, 0), at(9, 0), None),
            reservation(41, 5, at(9, 30), at(9, 30), None),
            reservation(42, 5, at(8, 0), at(11, 0), None),
        ]);

        assert!(plan.decisions.is_empty());
    }

    #[test]
    fn report_lists_pairs_and_sets() {
        let plan = Plan::build(vec![
            reservation(1, 1, at(10, 0), at(10, 45), None),
            reservation(2, 1, at(10, 30), at(11, 15), Some(900)),
        ]);
        let report = plan.to_string();

        assert!(report.contains("Machine 1: reservation 1 [2024-05-06 10:00:00 UTC"));
        assert!(report.contains("remove 1, keep 2"));
        assert!(report.contains("Reservations to remove: {1}"));
        assert!(report.contains("manual intervention required): {}"));
    }

    #[test]
    fn empty_report() {
        let report = Plan::build(Vec::new()).to_string();

        assert!(report.starts_with("No overlapping reservations found."));
    }

    prop_compose! {
        fn arb_reservations()(
            slots in prop::collection::vec((0i64..3, 0i64..200, 1i64..60, any::<bool>()), 0..40)
        ) -> Vec<Reservation> {
            slots
                .into_iter()
                .enumerate()
                .map(|(id, (machine_id, start, length, linked))| {
                    let start_at = at(0, 0) + Duration::minutes(start);
                    reservation(
                        id as i64,
                        machine_id,
                        start_at,
                        start_at + Duration::minutes(length),
                        linked.then_some(id as i64),
                    )
                })
                .collect()
        }
    }

    proptest! {
        #[test]
        fn sweep_matches_exhaustive_check(reservations in arb_reservations()) {
            let expected = exhaustive_pairs(&reservations);
            let mut sorted = reservations.clone();

            prop_assert_eq!(pair_ids(&find_overlaps(&mut sorted)), expected);
        }

        #[test]
        fn linked_reservations_are_never_removed(reservations in arb_reservations()) {
            let plan = Plan::build(reservations.clone());

            for reservation in reservations.iter().filter(|r| r.is_linked()) {
                prop_assert!(!plan.removed.contains(&reservation.id));
            }
            prop_assert!(plan.removed.is_disjoint(&plan.unresolved));
        }
    }
}
