//! Pure bracket construction: seeding, round count and match placement.

use crate::tournament::models::{NewMatch, Participant, ParticipantId, Slot};

/// Everything needed to persist a freshly generated bracket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketPlan {
    /// Number of rounds, `ceil(log2(n))`
    pub rounds: u32,
    /// Seeds handed out to participants that had none
    pub seeds: Vec<(ParticipantId, i32)>,
    /// Every match of every round, ordered by round then match number
    pub matches: Vec<NewMatch>,
}

/// Number of rounds needed for `n` entrants. A lone entrant still gets one round.
pub fn round_count(n: usize) -> u32 {
    if n <= 1 {
        return 1;
    }
    n.next_power_of_two().trailing_zeros()
}

/// Number of first-round slots for a bracket with `rounds` rounds
pub fn slot_count(rounds: u32) -> usize {
    1usize << rounds
}

/// Give each unseeded participant the seed matching its 1-based input position.
pub fn assign_missing_seeds(participants: &mut [Participant]) -> Vec<(ParticipantId, i32)> {
    participants
        .iter_mut()
        .enumerate()
        .filter(|(_, p)| p.seed.is_none())
        .map(|(position, p)| {
            let seed = position as i32 + 1;
            p.seed = Some(seed);
            (p.id, seed)
        })
        .collect()
}

/// Stable ascending sort by seed; ties keep input order.
pub fn order_by_seed(participants: &mut [Participant]) {
    participants.sort_by_key(|p| p.seed.unwrap_or(i32::MAX));
}

/// Lay out a full single-elimination bracket.
///
/// Byes are padded onto the end of the seeded list, so the last first-round
/// matches may have one or both sides empty. Nothing is auto-advanced.
pub fn plan_bracket(participants: &mut [Participant]) -> BracketPlan {
    let seeds = assign_missing_seeds(participants);
    order_by_seed(participants);

    let rounds = round_count(participants.len());
    let mut entrants: Vec<Option<ParticipantId>> =
        participants.iter().map(|p| Some(p.id)).collect();
    entrants.resize(slot_count(rounds), None);

    let mut matches: Vec<NewMatch> = entrants
        .chunks(2)
        .enumerate()
        .map(|(i, pair)| NewMatch {
            round: 1,
            match_number: i as i32 + 1,
            participant1_id: pair[0],
            participant2_id: pair[1],
        })
        .collect();

    let mut previous = matches.len();
    for round in 2..=rounds as i32 {
        let count = previous.div_ceil(2);
        matches.extend((1..=count as i32).map(|match_number| NewMatch {
            round,
            match_number,
            participant1_id: None,
            participant2_id: None,
        }));
        previous = count;
    }

    BracketPlan {
        rounds,
        seeds,
        matches,
    }
}

/// Where the winner of `(round, match_number)` goes next
pub fn next_position(round: i32, match_number: i32) -> (i32, i32, Slot) {
    let slot = if match_number % 2 == 1 {
        Slot::First
    } else {
        Slot::Second
    };
    (round + 1, (match_number + 1) / 2, slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::models::ParticipantStatus;
    use chrono::Utc;

    fn participants(names: &[&str]) -> Vec<Participant> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Participant {
                id: i as i64 + 1,
                tournament_id: 1,
                user_id: None,
                name: name.to_string(),
                seed: None,
                status: ParticipantStatus::Approved,
                created_at: Utc::now(),
            })
            .collect()
    }

    fn round(plan: &BracketPlan, round: i32) -> Vec<&NewMatch> {
        plan.matches.iter().filter(|m| m.round == round).collect()
    }

    #[test]
    fn test_round_count() {
        assert_eq!(round_count(1), 1);
        assert_eq!(round_count(2), 1);
        assert_eq!(round_count(3), 2);
        assert_eq!(round_count(4), 2);
        assert_eq!(round_count(5), 3);
        assert_eq!(round_count(8), 3);
        assert_eq!(round_count(9), 4);
        assert_eq!(round_count(64), 6);
    }

    #[test]
    fn test_five_unseeded_participants() {
        let mut list = participants(&["A", "B", "C", "D", "E"]);
        let plan = plan_bracket(&mut list);

        assert_eq!(plan.rounds, 3);
        assert_eq!(plan.seeds, vec![(1, 1), (2, 2), (3, 3), (4, 4), (5, 5)]);

        let first: Vec<_> = round(&plan, 1)
            .iter()
            .map(|m| (m.participant1_id, m.participant2_id))
            .collect();
        assert_eq!(
            first,
            vec![
                (Some(1), Some(2)),
                (Some(3), Some(4)),
                (Some(5), None),
                (None, None),
            ]
        );

        assert_eq!(round(&plan, 2).len(), 2);
        assert_eq!(round(&plan, 3).len(), 1);
        assert!(
            plan.matches
                .iter()
                .filter(|m| m.round > 1)
                .all(|m| m.participant1_id.is_none() && m.participant2_id.is_none())
        );
    }

    #[test]
    fn test_existing_seeds_drive_order() {
        let mut list = participants(&["A", "B", "C", "D"]);
        list[0].seed = Some(4);
        list[1].seed = Some(3);
        list[2].seed = Some(2);
        list[3].seed = Some(1);

        let plan = plan_bracket(&mut list);
        assert!(plan.seeds.is_empty());

        let first = round(&plan, 1);
        assert_eq!(first[0].participant1_id, Some(4));
        assert_eq!(first[0].participant2_id, Some(3));
        assert_eq!(first[1].participant1_id, Some(2));
        assert_eq!(first[1].participant2_id, Some(1));
    }

    #[test]
    fn test_mixed_seeds_fill_by_position() {
        let mut list = participants(&["A", "B", "C"]);
        list[1].seed = Some(1);

        let plan = plan_bracket(&mut list);
        assert_eq!(plan.seeds, vec![(1, 1), (3, 3)]);
        // A and B share seed 1 and keep input order
        let order: Vec<_> = list.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_two_participants_single_final() {
        let mut list = participants(&["A", "B"]);
        let plan = plan_bracket(&mut list);
        assert_eq!(plan.rounds, 1);
        assert_eq!(plan.matches.len(), 1);
        assert_eq!(plan.matches[0].participant1_id, Some(1));
        assert_eq!(plan.matches[0].participant2_id, Some(2));
    }

    #[test]
    fn test_next_position() {
        assert_eq!(next_position(1, 1), (2, 1, Slot::First));
        assert_eq!(next_position(1, 2), (2, 1, Slot::Second));
        assert_eq!(next_position(1, 3), (2, 2, Slot::First));
        assert_eq!(next_position(2, 4), (3, 2, Slot::Second));
    }
}
