#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Rotating pitch vocabulary shared by every pulsing node.
//!
//! Four twelve-degree pitch fields take turns being active. Each screen
//! quadrant owns a pitch set that splits the field's degrees into common and
//! rare picks.

use pulse_field_core::Quadrant;
use rand::Rng;

/// MIDI note number of the lowest pitch a node may produce.
pub const BASE_MIDI: i32 = 21;

/// Probability that a pulse draws from the common degrees of its pitch set.
pub const COMMON_PITCH_PROBABILITY: f64 = 0.8;

/// Number of degrees in a pitch field.
pub const FIELD_DEGREES: usize = 12;

/// Semitone offsets of the four pitch fields, in rotation order.
pub const PITCH_FIELDS: [[i32; FIELD_DEGREES]; 4] = [
    [0, 0, 2, 5, 7, 7, 12, 12, 14, 17, 19, 23],
    [2, 4, 4, 5, 9, 14, 14, 16, 19, 21, 22, 24],
    [3, 5, 7, 8, 10, 12, 14, 15, 17, 19, 20, 26],
    [-2, -2, 2, 5, 7, 8, 10, 12, 14, 17, 18, 20],
];

/// Common and rare degree indices available to a screen quadrant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PitchSet {
    common: &'static [usize],
    rare: &'static [usize],
}

impl PitchSet {
    /// Degrees drawn on most pulses.
    #[must_use]
    pub const fn common(&self) -> &'static [usize] {
        self.common
    }

    /// Degrees drawn on the remaining pulses.
    #[must_use]
    pub const fn rare(&self) -> &'static [usize] {
        self.rare
    }
}

/// Pitch sets indexed by [`Quadrant::index`].
pub const PITCH_SETS: [PitchSet; 4] = [
    PitchSet {
        common: &[0, 2, 3],
        rare: &[1],
    },
    PitchSet {
        common: &[3, 5],
        rare: &[4],
    },
    PitchSet {
        common: &[5, 6, 7],
        rare: &[8],
    },
    PitchSet {
        common: &[7, 10],
        rare: &[9, 11],
    },
];

/// Pitch set owned by the provided quadrant.
#[must_use]
pub const fn pitch_set(quadrant: Quadrant) -> &'static PitchSet {
    &PITCH_SETS[quadrant.index()]
}

/// Tracks which pitch field is active.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PitchVocabulary {
    active: usize,
}

impl PitchVocabulary {
    /// Creates a vocabulary starting on the first field.
    #[must_use]
    pub const fn new() -> Self {
        Self { active: 0 }
    }

    /// Index of the active pitch field.
    #[must_use]
    pub const fn active_index(&self) -> usize {
        self.active
    }

    /// Semitone offsets of the active pitch field.
    #[must_use]
    pub const fn active_field(&self) -> &'static [i32; FIELD_DEGREES] {
        &PITCH_FIELDS[self.active]
    }

    /// Advances to the next field round-robin and returns its index.
    pub fn rotate(&mut self) -> usize {
        self.active = (self.active + 1) % PITCH_FIELDS.len();
        self.active
    }

    /// Draws the MIDI pitch for a pulse of a node in the provided quadrant and octave.
    pub fn choose_pitch<R: Rng + ?Sized>(&self, rng: &mut R, quadrant: Quadrant, octave: u8) -> u8 {
        let set = pitch_set(quadrant);
        let degrees = if rng.gen_bool(COMMON_PITCH_PROBABILITY) {
            set.common()
        } else {
            set.rare()
        };
        let degree = degrees[rng.gen_range(0..degrees.len())];
        let offset = self.active_field()[degree];
        let pitch = BASE_MIDI + offset + 12 * i32::from(octave);
        pitch.clamp(0, 127) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const QUADRANTS: [Quadrant; 4] = [
        Quadrant::SouthEast,
        Quadrant::NorthEast,
        Quadrant::SouthWest,
        Quadrant::NorthWest,
    ];

    #[test]
    fn rotation_cycles_through_all_fields() {
        let mut vocabulary = PitchVocabulary::new();
        let visited: Vec<usize> = (0..5).map(|_| vocabulary.rotate()).collect();
        assert_eq!(visited, vec![1, 2, 3, 0, 1]);
    }

    #[test]
    fn chosen_pitches_come_from_quadrant_degrees() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let vocabulary = PitchVocabulary::new();
        for quadrant in QUADRANTS {
            let set = pitch_set(quadrant);
            let allowed: Vec<u8> = set
                .common()
                .iter()
                .chain(set.rare())
                .map(|degree| (BASE_MIDI + PITCH_FIELDS[0][*degree] + 24) as u8)
                .collect();
            for _ in 0..200 {
                let pitch = vocabulary.choose_pitch(&mut rng, quadrant, 2);
                assert!(allowed.contains(&pitch), "{pitch} not in {allowed:?}");
            }
        }
    }

    #[test]
    fn common_degrees_dominate() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let mut vocabulary = PitchVocabulary::new();
        let _ = vocabulary.rotate();
        let _ = vocabulary.rotate();
        let rare_pitch = (BASE_MIDI + PITCH_FIELDS[2][1]) as u8;
        let common_overlap = PITCH_SETS[0]
            .common()
            .iter()
            .any(|degree| (BASE_MIDI + PITCH_FIELDS[2][*degree]) as u8 == rare_pitch);
        assert!(!common_overlap);

        let draws: u32 = 5_000;
        let rare = (0..draws)
            .filter(|_| vocabulary.choose_pitch(&mut rng, Quadrant::SouthEast, 0) == rare_pitch)
            .count();
        let ratio = rare as f64 / f64::from(draws);
        assert!((0.15..0.25).contains(&ratio), "rare ratio {ratio}");
    }

    #[test]
    fn quadrant_sets_match_table() {
        assert_eq!(pitch_set(Quadrant::NorthWest).rare(), &[9_usize, 11][..]);
        assert_eq!(pitch_set(Quadrant::SouthEast).common(), &[0_usize, 2, 3][..]);
    }
}
