//! Six-week progression plan.
//!
//! The program is split into three two-week phases, each with target goals
//! for the key movements:
//! - Weeks 1-2: master form and endurance
//! - Weeks 3-4: increase reps and intensity
//! - Weeks 5-6: push towards strength improvements
//!
//! Phases are browsed cyclically, so stepping past the last phase wraps to
//! the first.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

/// Number of weeks in one program cycle
pub const PROGRAM_WEEKS: u32 = 6;

/// A target for one movement within a phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ProgressionGoal {
    pub exercise: &'static str,
    pub target: &'static str,
}

/// One two-week block of the program
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressionPhase {
    Weeks1To2,
    Weeks3To4,
    Weeks5To6,
}

const PHASES: [ProgressionPhase; 3] = [
    ProgressionPhase::Weeks1To2,
    ProgressionPhase::Weeks3To4,
    ProgressionPhase::Weeks5To6,
];

impl ProgressionPhase {
    /// Phase at `index`, wrapping modulo 3
    pub fn from_index(index: usize) -> Self {
        PHASES[index % PHASES.len()]
    }

    pub fn index(self) -> usize {
        match self {
            ProgressionPhase::Weeks1To2 => 0,
            ProgressionPhase::Weeks3To4 => 1,
            ProgressionPhase::Weeks5To6 => 2,
        }
    }

    pub fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    pub fn previous(self) -> Self {
        Self::from_index(self.index() + PHASES.len() - 1)
    }

    /// Phase `steps` positions after this one, wrapping
    pub fn advance(self, steps: usize) -> Self {
        Self::from_index(self.index() + steps % PHASES.len())
    }

    /// Phase containing program week `week` (1-based, wraps every 6 weeks)
    pub fn for_week(week: u32) -> Self {
        let zero_based = week.saturating_sub(1) % PROGRAM_WEEKS;
        Self::from_index((zero_based / 2) as usize)
    }

    pub fn title(self) -> &'static str {
        match self {
            ProgressionPhase::Weeks1To2 => "Week 1-2",
            ProgressionPhase::Weeks3To4 => "Week 3-4",
            ProgressionPhase::Weeks5To6 => "Week 5-6",
        }
    }

    pub fn focus(self) -> &'static str {
        match self {
            ProgressionPhase::Weeks1To2 => "Focus on mastering form and endurance.",
            ProgressionPhase::Weeks3To4 => "Increase reps and intensity.",
            ProgressionPhase::Weeks5To6 => "Push towards strength improvements.",
        }
    }

    pub fn goals(self) -> &'static [ProgressionGoal] {
        match self {
            ProgressionPhase::Weeks1To2 => &[
                ProgressionGoal { exercise: "Push-ups", target: "3x10-15" },
                ProgressionGoal { exercise: "Pull-ups", target: "3x3-5" },
                ProgressionGoal { exercise: "Planks", target: "3x20-30 sec" },
            ],
            ProgressionPhase::Weeks3To4 => &[
                ProgressionGoal { exercise: "Push-ups", target: "3x15-20" },
                ProgressionGoal { exercise: "Pull-ups", target: "3x4-6" },
                ProgressionGoal { exercise: "Planks", target: "3x30-45 sec" },
            ],
            ProgressionPhase::Weeks5To6 => &[
                ProgressionGoal { exercise: "Push-ups", target: "3x20+" },
                ProgressionGoal { exercise: "Pull-ups", target: "3x5-7" },
                ProgressionGoal { exercise: "Planks", target: "3x45-60 sec" },
            ],
        }
    }
}

fn start_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

/// Number of Sunday-based calendar weeks from `start` to `end`
///
/// Negative when `end` lies in an earlier week than `start`.
pub fn calendar_weeks_between(end: NaiveDate, start: NaiveDate) -> i64 {
    (start_of_week(end) - start_of_week(start)).num_days() / 7
}

/// Current program week (1..=6) for a user who started on `training_start`
///
/// `phase_offset` shifts the result by the number of phases the user has
/// browsed forward, mirroring the dashboard's week navigation.
pub fn current_week(training_start: NaiveDate, today: NaiveDate, phase_offset: usize) -> u32 {
    let weeks = calendar_weeks_between(today, training_start).rem_euclid(i64::from(PROGRAM_WEEKS));
    let shifted = (weeks as u32 + 1 + (phase_offset % PHASES.len()) as u32) % PROGRAM_WEEKS;
    if shifted == 0 {
        PROGRAM_WEEKS
    } else {
        shifted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    #[test]
    fn test_phase_cycles_forward_and_back() {
        let first = ProgressionPhase::Weeks1To2;
        assert_eq!(first.next(), ProgressionPhase::Weeks3To4);
        assert_eq!(first.next().next().next(), first);
        assert_eq!(first.previous(), ProgressionPhase::Weeks5To6);
        assert_eq!(ProgressionPhase::from_index(4), ProgressionPhase::Weeks3To4);
    }

    #[test]
    fn test_phase_advance_wraps_any_offset() {
        let phase = ProgressionPhase::Weeks3To4;
        assert_eq!(phase.advance(0), phase);
        assert_eq!(phase.advance(2), ProgressionPhase::Weeks1To2);
        assert_eq!(
            phase.advance(usize::MAX),
            ProgressionPhase::from_index(1 + usize::MAX % 3)
        );
    }

    #[test]
    fn test_phase_titles_and_goals() {
        assert_eq!(ProgressionPhase::Weeks3To4.title(), "Week 3-4");
        let goals = ProgressionPhase::Weeks5To6.goals();
        assert_eq!(goals.len(), 3);
        assert_eq!(goals[0].exercise, "Push-ups");
        assert_eq!(goals[0].target, "3x20+");
    }

    #[test]
    fn test_phase_for_week() {
        assert_eq!(ProgressionPhase::for_week(1), ProgressionPhase::Weeks1To2);
        assert_eq!(ProgressionPhase::for_week(2), ProgressionPhase::Weeks1To2);
        assert_eq!(ProgressionPhase::for_week(4), ProgressionPhase::Weeks3To4);
        assert_eq!(ProgressionPhase::for_week(6), ProgressionPhase::Weeks5To6);
        assert_eq!(ProgressionPhase::for_week(7), ProgressionPhase::Weeks1To2);
    }

    #[test]
    fn test_calendar_weeks_use_sunday_boundaries() {
        // 2024-01-07 is a Sunday
        assert_eq!(calendar_weeks_between(day(1, 13), day(1, 7)), 0);
        assert_eq!(calendar_weeks_between(day(1, 14), day(1, 13)), 1);
        assert_eq!(calendar_weeks_between(day(1, 7), day(1, 14)), -1);
    }

    #[test]
    fn test_current_week() {
        let start = day(1, 7);
        assert_eq!(current_week(start, start, 0), 1);
        assert_eq!(current_week(start, day(1, 20), 0), 2);
        assert_eq!(current_week(start, day(1, 20), 1), 3);
        // Five weeks in lands on week 6, six weeks in wraps to week 1
        assert_eq!(current_week(start, day(2, 11), 0), 6);
        assert_eq!(current_week(start, day(2, 18), 0), 1);
    }

    #[test]
    fn test_current_week_before_start_stays_in_range() {
        let week = current_week(day(3, 1), day(1, 1), 2);
        assert!((1..=PROGRAM_WEEKS).contains(&week));
    }
}
