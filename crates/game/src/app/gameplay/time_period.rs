use engine::Vec2;
use tracing::warn;

/// Global simulation phase, ordered from least to most present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum TimePeriod {
    FarPast,
    Past,
    #[default]
    Present,
}

pub(crate) const PERIOD_COUNT: usize = 3;

impl TimePeriod {
    pub(crate) const ALL: [TimePeriod; PERIOD_COUNT] =
        [TimePeriod::FarPast, TimePeriod::Past, TimePeriod::Present];

    pub(crate) const fn index(self) -> usize {
        match self {
            TimePeriod::FarPast => 0,
            TimePeriod::Past => 1,
            TimePeriod::Present => 2,
        }
    }

    /// Slot indices only come from `index()`; anything else is model corruption.
    pub(crate) fn from_index(index: usize) -> TimePeriod {
        match index {
            0 => TimePeriod::FarPast,
            1 => TimePeriod::Past,
            2 => TimePeriod::Present,
            other => panic!("time period slot {other} out of range"),
        }
    }

    pub(crate) fn parse(raw: &str) -> Option<TimePeriod> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "far_past" | "farpast" => Some(TimePeriod::FarPast),
            "past" => Some(TimePeriod::Past),
            "present" => Some(TimePeriod::Present),
            _ => None,
        }
    }

    /// Level-data reading: unknown names fall back to `default` with a warning.
    pub(crate) fn parse_or(raw: Option<&str>, field: &str, default: TimePeriod) -> TimePeriod {
        match raw {
            None => default,
            Some(raw) => TimePeriod::parse(raw).unwrap_or_else(|| {
                warn!(field, raw, ?default, "unknown_time_period");
                default
            }),
        }
    }

    pub(crate) fn as_token(self) -> &'static str {
        match self {
            TimePeriod::FarPast => "far_past",
            TimePeriod::Past => "past",
            TimePeriod::Present => "present",
        }
    }

    /// Periods at least as present as `self`, in order.
    pub(crate) fn this_and_later(self) -> impl Iterator<Item = TimePeriod> {
        TimePeriod::ALL.into_iter().filter(move |period| *period >= self)
    }
}

/// One value per time period. Writes made in period P also land in every
/// later period, never in earlier ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PeriodSlots<T> {
    slots: [T; PERIOD_COUNT],
    initial: [T; PERIOD_COUNT],
}

impl<T: Copy> PeriodSlots<T> {
    pub(crate) fn new(initial: T) -> Self {
        Self::from_slots([initial; PERIOD_COUNT])
    }

    pub(crate) fn from_slots(initial: [T; PERIOD_COUNT]) -> Self {
        Self {
            slots: initial,
            initial,
        }
    }

    pub(crate) fn get(&self, period: TimePeriod) -> T {
        self.slots[period.index()]
    }

    pub(crate) fn set_from(&mut self, period: TimePeriod, value: T) {
        for later in period.this_and_later() {
            self.slots[later.index()] = value;
        }
    }

    pub(crate) fn reset(&mut self) {
        self.slots = self.initial;
    }
}

pub(crate) type PeriodPositions = PeriodSlots<Vec2>;

impl PeriodSlots<Vec2> {
    /// Moves the `period` slot by `delta` and overwrites every later slot
    /// with the result.
    pub(crate) fn move_by(&mut self, period: TimePeriod, delta: Vec2) {
        let moved = self.get(period) + delta;
        self.set_from(period, moved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periods_are_ordered_toward_present() {
        assert!(TimePeriod::FarPast < TimePeriod::Past);
        assert!(TimePeriod::Past < TimePeriod::Present);
        for period in TimePeriod::ALL {
            assert_eq!(TimePeriod::from_index(period.index()), period);
        }
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn corrupt_slot_index_panics() {
        TimePeriod::from_index(3);
    }

    #[test]
    fn parse_accepts_tokens_and_falls_back() {
        assert_eq!(TimePeriod::parse("Far_Past"), Some(TimePeriod::FarPast));
        assert_eq!(TimePeriod::parse("medieval"), None);
        assert_eq!(
            TimePeriod::parse_or(Some("medieval"), "start_period", TimePeriod::Present),
            TimePeriod::Present
        );
        assert_eq!(
            TimePeriod::parse_or(Some("past"), "start_period", TimePeriod::Present),
            TimePeriod::Past
        );
    }

    #[test]
    fn move_by_propagates_forward_only() {
        let start = Vec2::new(10.0, 20.0);
        let delta = Vec2::new(4.0, -2.0);
        for active in TimePeriod::ALL {
            let mut positions = PeriodPositions::new(start);
            positions.move_by(active, delta);
            for period in TimePeriod::ALL {
                let expected = if period >= active { start + delta } else { start };
                assert_eq!(positions.get(period), expected, "active {active:?} slot {period:?}");
            }
        }
    }

    #[test]
    fn earlier_move_overwrites_later_history() {
        let mut positions = PeriodPositions::new(Vec2::ZERO);
        positions.move_by(TimePeriod::Present, Vec2::new(5.0, 0.0));
        positions.move_by(TimePeriod::Past, Vec2::new(1.0, 0.0));

        assert_eq!(positions.get(TimePeriod::FarPast), Vec2::ZERO);
        assert_eq!(positions.get(TimePeriod::Past), Vec2::new(1.0, 0.0));
        assert_eq!(positions.get(TimePeriod::Present), Vec2::new(1.0, 0.0));
    }

    #[test]
    fn reset_restores_declared_start() {
        let mut positions = PeriodPositions::new(Vec2::new(3.0, 3.0));
        positions.move_by(TimePeriod::FarPast, Vec2::new(9.0, 9.0));
        positions.reset();
        assert_eq!(positions, PeriodPositions::new(Vec2::new(3.0, 3.0)));
    }

    #[test]
    fn reset_restores_per_slot_initial_state() {
        let mut broken = PeriodSlots::from_slots([false, true, true]);
        broken.set_from(TimePeriod::FarPast, true);
        broken.reset();
        assert!(!broken.get(TimePeriod::FarPast));
        assert!(broken.get(TimePeriod::Past));
    }

    #[test]
    fn set_from_overwrites_current_and_later() {
        let mut broken = PeriodSlots::new(false);
        broken.set_from(TimePeriod::Past, true);
        assert!(!broken.get(TimePeriod::FarPast));
        assert!(broken.get(TimePeriod::Past));
        assert!(broken.get(TimePeriod::Present));
    }
}
