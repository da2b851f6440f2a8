//! Garden stages.
//!
//! Maps a streak length to one of eleven growth stages. The mapping is pure
//! and total: stage 0 starts at day 0, thresholds strictly increase, and a
//! streak belongs to the highest stage whose threshold it has reached.

use serde::Serialize;

use crate::error::ValidationError;

pub const STAGE_COUNT: usize = 11;

/// One growth tier of the garden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GardenStage {
    /// Inclusive lower bound in streak days.
    pub min_days: u32,
    pub name: &'static str,
    pub description: &'static str,
}

const DEFAULT_STAGES: [GardenStage; STAGE_COUNT] = [
    GardenStage {
        min_days: 0,
        name: "Bare Soil",
        description: "Freshly turned earth, waiting for its first seed.",
    },
    GardenStage {
        min_days: 1,
        name: "Seed",
        description: "A single seed has been planted.",
    },
    GardenStage {
        min_days: 3,
        name: "Sprout",
        description: "A green shoot breaks through the soil.",
    },
    GardenStage {
        min_days: 7,
        name: "Seedling",
        description: "The first true leaves unfold.",
    },
    GardenStage {
        min_days: 14,
        name: "Sapling",
        description: "A thin trunk stands on its own.",
    },
    GardenStage {
        min_days: 30,
        name: "Young Tree",
        description: "Branches reach out and bark thickens.",
    },
    GardenStage {
        min_days: 60,
        name: "Flowering Tree",
        description: "Blossoms cover every branch.",
    },
    GardenStage {
        min_days: 100,
        name: "Fruiting Tree",
        description: "The tree bears its first fruit.",
    },
    GardenStage {
        min_days: 200,
        name: "Grove",
        description: "New trees have taken root around the first.",
    },
    GardenStage {
        min_days: 365,
        name: "Ancient Tree",
        description: "A full year of roots runs deep.",
    },
    GardenStage {
        min_days: 1000,
        name: "World Tree",
        description: "Its canopy shelters the whole garden.",
    },
];

static DEFAULT_TABLE: GardenStages = GardenStages {
    stages: DEFAULT_STAGES,
};

/// Stage index for `streak` in the default table.
pub fn stage_index(streak: u32) -> usize {
    DEFAULT_TABLE.stage_index(streak)
}

/// Stage for `streak` in the default table.
pub fn stage_of(streak: u32) -> &'static GardenStage {
    DEFAULT_TABLE.stage_of(streak)
}

/// Threshold table for the garden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GardenStages {
    stages: [GardenStage; STAGE_COUNT],
}

impl Default for GardenStages {
    fn default() -> Self {
        DEFAULT_TABLE.clone()
    }
}

impl GardenStages {
    /// Default stages with custom thresholds.
    ///
    /// # Errors
    /// Fails unless there are exactly eleven thresholds, the first is 0, and
    /// each is greater than the one before.
    pub fn with_thresholds(thresholds: &[u32]) -> Result<Self, ValidationError> {
        if thresholds.len() != STAGE_COUNT {
            return Err(ValidationError::StageCount {
                expected: STAGE_COUNT,
                actual: thresholds.len(),
            });
        }
        if thresholds[0] != 0 {
            return Err(ValidationError::FirstStageNotZero(thresholds[0]));
        }
        for (index, pair) in thresholds.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(ValidationError::ThresholdNotIncreasing {
                    index: index + 1,
                    value: pair[1],
                    previous: pair[0],
                });
            }
        }

        let mut stages = DEFAULT_STAGES;
        for (stage, &min_days) in stages.iter_mut().zip(thresholds) {
            stage.min_days = min_days;
        }
        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[GardenStage] {
        &self.stages
    }

    pub fn thresholds(&self) -> Vec<u32> {
        self.stages.iter().map(|s| s.min_days).collect()
    }

    pub fn stage_index(&self, streak: u32) -> usize {
        // Stage 0 starts at day 0, so the partition point is at least 1.
        self.stages
            .partition_point(|s| s.min_days <= streak)
            .saturating_sub(1)
    }

    pub fn stage_of(&self, streak: u32) -> &GardenStage {
        &self.stages[self.stage_index(streak)]
    }

    /// Where `streak` sits between its stage and the next one.
    pub fn progress(&self, streak: u32) -> GardenProgress {
        let index = self.stage_index(streak);
        let stage = self.stages[index];
        let next_stage = self.stages.get(index + 1).copied();

        let (days_to_next, fraction) = match next_stage {
            Some(next) => {
                let span = next.min_days - stage.min_days;
                let into = streak - stage.min_days;
                (
                    Some(next.min_days - streak),
                    f64::from(into) / f64::from(span),
                )
            }
            None => (None, 1.0),
        };

        GardenProgress {
            streak,
            stage_index: index,
            stage,
            next_stage,
            days_to_next,
            fraction,
        }
    }
}

/// Progress towards the next garden stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GardenProgress {
    pub streak: u32,
    pub stage_index: usize,
    pub stage: GardenStage,
    pub next_stage: Option<GardenStage>,
    /// `None` once the final stage is reached.
    pub days_to_next: Option<u32>,
    /// 0.0 at the start of the stage, approaching 1.0 near the next.
    pub fraction: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_thresholds() {
        assert_eq!(
            GardenStages::default().thresholds(),
            vec![0, 1, 3, 7, 14, 30, 60, 100, 200, 365, 1000]
        );
    }

    #[test]
    fn stage_boundaries() {
        assert_eq!(stage_index(0), 0);
        assert_eq!(stage_index(1), 1);
        assert_eq!(stage_index(2), 1);
        assert_eq!(stage_index(3), 2);
        assert_eq!(stage_index(6), 2);
        assert_eq!(stage_index(7), 3);
        assert_eq!(stage_index(364), 8);
        assert_eq!(stage_index(365), 9);
        assert_eq!(stage_index(999), 9);
        assert_eq!(stage_index(1000), 10);
        assert_eq!(stage_index(u32::MAX), 10);
        assert_eq!(stage_of(30).name, "Young Tree");
    }

    #[test]
    fn custom_thresholds_are_used() {
        let garden =
            GardenStages::with_thresholds(&[0, 2, 4, 6, 8, 10, 12, 14, 16, 18, 20]).unwrap();
        assert_eq!(garden.stage_index(5), 2);
        assert_eq!(garden.stage_of(20).name, "World Tree");
    }

    #[test]
    fn rejects_bad_threshold_tables() {
        assert!(matches!(
            GardenStages::with_thresholds(&[0, 1, 2]),
            Err(ValidationError::StageCount { actual: 3, .. })
        ));
        assert!(matches!(
            GardenStages::with_thresholds(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]),
            Err(ValidationError::FirstStageNotZero(1))
        ));
        assert!(matches!(
            GardenStages::with_thresholds(&[0, 1, 3, 3, 14, 30, 60, 100, 200, 365, 1000]),
            Err(ValidationError::ThresholdNotIncreasing { index: 3, .. })
        ));
    }

    #[test]
    fn progress_midway() {
        let progress = GardenStages::default().progress(10);
        assert_eq!(progress.stage_index, 3);
        assert_eq!(progress.days_to_next, Some(4));
        assert_eq!(progress.next_stage.map(|s| s.name), Some("Sapling"));
        assert!((progress.fraction - 3.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn progress_at_final_stage() {
        let progress = GardenStages::default().progress(1500);
        assert_eq!(progress.stage_index, 10);
        assert_eq!(progress.days_to_next, None);
        assert_eq!(progress.fraction, 1.0);
    }

    proptest! {
        #[test]
        fn prop_stage_lookup_is_total_and_monotone(d in 0u32..=100_000) {
            let index = stage_index(d);
            prop_assert!(index < STAGE_COUNT);
            prop_assert!(DEFAULT_STAGES[index].min_days <= d);
            if let Some(next) = DEFAULT_STAGES.get(index + 1) {
                prop_assert!(next.min_days > d);
            }
            prop_assert!(stage_index(d + 1) >= index);
        }
    }

    #[test]
    fn exhaustive_range_is_non_decreasing() {
        let mut previous = 0;
        for d in 0..=100_000u32 {
            let index = stage_index(d);
            assert!(index >= previous);
            previous = index;
        }
        assert_eq!(previous, 10);
    }
}
