//! Human-readable rendering of detection results

use pitch_core::{Detection, NoteMapping};

pub const SILENCE_MESSAGE: &str = "Silence detected (amplitude too low)";

/// One-line summary of a detection, as printed after each recording.
pub fn format_detection(detection: &Detection) -> String {
    match detection {
        Detection::Silence => SILENCE_MESSAGE.to_string(),
        Detection::Pitched { frequency_hz, note } => {
            format!("Detected frequency: {frequency_hz:.2} Hz - Note: {}", format_note(note))
        }
    }
}

/// `A4 (+0 cents)`, or `N/A` outside the musical range.
pub fn format_note(note: &NoteMapping) -> String {
    match note {
        NoteMapping::Note(reading) => format!("{reading} ({:+} cents)", reading.cents),
        NoteMapping::NotApplicable => "N/A".to_string(),
    }
}
