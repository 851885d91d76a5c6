//! # Musical Tuning Module
//!
//! Maps frequencies onto 12-tone equal temperament referenced to
//! A4 = 440 Hz, using MIDI note numbers as the common currency.
//!
//! ## Features
//! - Frequency to note name, octave and cent deviation
//! - MIDI note number to frequency and back

use std::fmt;

use serde::Serialize;

/// Reference pitch of A4 in Hz.
pub const A4_FREQUENCY: f64 = 440.0;

/// MIDI note number of A4.
pub const A4_MIDI: i32 = 69;

/// Frequencies below this are not given a note name.
pub const MIN_MUSICAL_FREQUENCY: f32 = 20.0;

/// Pitch-class names in semitone order starting at C.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// The equal-tempered note nearest to a measured frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NoteReading {
    /// Pitch class, one of [`NOTE_NAMES`].
    pub name: &'static str,
    /// Scientific pitch notation octave (C4 = middle C).
    pub octave: i32,
    /// Signed deviation from the note in cents, within (-50, +50].
    pub cents: i32,
    /// MIDI note number of the note.
    pub midi: i32,
}

impl NoteReading {
    /// Builds the reading for a MIDI note with the given deviation.
    pub fn from_midi(midi: i32, cents: i32) -> Self {
        Self {
            name: NOTE_NAMES[midi.rem_euclid(12) as usize],
            octave: midi.div_euclid(12) - 1,
            cents,
            midi,
        }
    }
}

impl fmt::Display for NoteReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.octave)
    }
}

/// Outcome of mapping a frequency onto a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteMapping {
    Note(NoteReading),
    /// The frequency is below [`MIN_MUSICAL_FREQUENCY`] (or not finite).
    NotApplicable,
}

impl NoteMapping {
    pub fn reading(&self) -> Option<&NoteReading> {
        match self {
            NoteMapping::Note(reading) => Some(reading),
            NoteMapping::NotApplicable => None,
        }
    }
}

/// Fractional MIDI note number of `freq`: `69 + 12 log2(freq / 440)`.
pub fn fractional_midi(freq: f64) -> f64 {
    f64::from(A4_MIDI) + 12.0 * (freq / A4_FREQUENCY).log2()
}

/// Equal-tempered frequency of a MIDI note number.
pub fn midi_to_frequency(midi: i32) -> f64 {
    A4_FREQUENCY * 2.0_f64.powf(f64::from(midi - A4_MIDI) / 12.0)
}

/// Calculates the deviation from a target frequency in cents.
///
/// Positive values are sharp, negative values flat; 100 cents make a
/// semitone and 1200 an octave.
pub fn calculate_cents_deviation(freq: f64, target_freq: f64) -> f64 {
    1200.0 * (freq / target_freq).log2()
}

/// Maps a frequency to the nearest equal-tempered note.
///
/// Frequencies under 20 Hz return [`NoteMapping::NotApplicable`]. A
/// deviation that rounds to exactly -50 cents is reported as +50 cents on
/// the note below, keeping cents in (-50, +50].
pub fn map_frequency(freq: f32) -> NoteMapping {
    if !freq.is_finite() || freq < MIN_MUSICAL_FREQUENCY {
        return NoteMapping::NotApplicable;
    }
    let freq = f64::from(freq);

    let mut midi = fractional_midi(freq).round() as i32;
    let mut cents = calculate_cents_deviation(freq, midi_to_frequency(midi)).round() as i32;
    if cents <= -50 {
        midi -= 1;
        cents += 100;
    }

    NoteMapping::Note(NoteReading::from_midi(midi, cents))
}
