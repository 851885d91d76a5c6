//! Integration tests for the detection pipeline

use pitch_core::{
    AutocorrelationEstimator, Detection, DetectionConfig, FrequencyEstimator, HpsEstimator,
    Method, NoteMapping, PitchError, detect, detect_with,
};

const SAMPLE_RATE: u32 = 44_100;
const FRAME: usize = 8192;

/// Common device rates.
const RATES: [u32; 2] = [44_100, 48_000];

/// Sum of sinusoids given as (frequency, amplitude) pairs.
fn tone_at(partials: &[(f64, f64)], len: usize, sample_rate: u32) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let t = i as f64 / f64::from(sample_rate);
            partials
                .iter()
                .map(|&(freq, amp)| amp * (2.0 * std::f64::consts::PI * freq * t).sin())
                .sum::<f64>() as f32
        })
        .collect()
}

fn tone(partials: &[(f64, f64)], len: usize) -> Vec<f32> {
    tone_at(partials, len, SAMPLE_RATE)
}

fn sine(freq: f64) -> Vec<f32> {
    tone(&[(freq, 0.5)], FRAME)
}

/// Tone whose fundamental is 20 dB below its second harmonic.
fn weak_fundamental(freq: f64, sample_rate: u32) -> Vec<f32> {
    tone_at(
        &[(freq, 0.05), (2.0 * freq, 0.5), (3.0 * freq, 0.4), (4.0 * freq, 0.3)],
        FRAME,
        sample_rate,
    )
}

/// Periods of `freq` that fit in a buffer of `len` samples.
fn cycles(freq: f64, len: usize, sample_rate: u32) -> f64 {
    freq * len as f64 / f64::from(sample_rate)
}

fn frequency_of(detection: &Detection) -> f32 {
    detection
        .frequency()
        .unwrap_or_else(|| panic!("expected a pitched detection, got {detection:?}"))
}

fn assert_close(actual: f32, expected: f64, context: &str) {
    let error = (f64::from(actual) - expected).abs() / expected;
    assert!(
        error <= 0.01,
        "{context}: expected {expected} Hz, got {actual} Hz ({:.3}% off)",
        error * 100.0
    );
}

#[test]
fn every_method_tracks_pure_sines_within_one_percent() {
    for method in Method::ALL {
        for freq in [110.0, 440.0, 880.0] {
            let detection = detect(&sine(freq), SAMPLE_RATE, method, 5, 0.01)
                .unwrap_or_else(|e| panic!("{method} at {freq} Hz failed: {e}"));
            assert_close(frequency_of(&detection), freq, &format!("{method}"));
        }
    }
}

#[test]
fn every_method_tracks_pure_sines_at_48_khz() {
    for method in Method::ALL {
        for freq in [110.0, 440.0, 880.0] {
            let signal = tone_at(&[(freq, 0.5)], FRAME, 48_000);
            let detection = detect(&signal, 48_000, method, 5, 0.01)
                .unwrap_or_else(|e| panic!("{method} at {freq} Hz failed: {e}"));
            assert_close(frequency_of(&detection), freq, &format!("{method} at 48 kHz"));
        }
    }
}

#[test]
fn spectral_methods_track_short_buffers() {
    // Down to four periods per buffer.
    for sample_rate in RATES {
        for len in [1024, 2048, 4096] {
            for freq in [55.0, 82.41, 110.0, 146.83, 220.0] {
                if cycles(freq, len, sample_rate) < 4.0 {
                    continue;
                }
                let signal = tone_at(&[(freq, 0.5)], len, sample_rate);
                for method in [Method::Fft, Method::Hps] {
                    let detection = detect(&signal, sample_rate, method, 5, 0.01)
                        .unwrap_or_else(|e| panic!("{method} at {freq} Hz failed: {e}"));
                    let context = format!("{method}, {len} samples at {sample_rate} Hz");
                    assert_close(frequency_of(&detection), freq, &context);
                }
            }
        }
    }
}

#[test]
fn autocorrelation_tracks_short_buffers_with_ten_periods() {
    for sample_rate in RATES {
        for len in [2048, 4096] {
            for freq in [110.0, 146.83, 220.0] {
                if cycles(freq, len, sample_rate) < 10.0 {
                    continue;
                }
                let signal = tone_at(&[(freq, 0.5)], len, sample_rate);
                let detection = detect(&signal, sample_rate, Method::Autocorrelation, 5, 0.01)
                    .unwrap_or_else(|e| panic!("autocorr at {freq} Hz failed: {e}"));
                let context = format!("autocorr, {len} samples at {sample_rate} Hz");
                assert_close(frequency_of(&detection), freq, &context);
            }
        }
    }
}

#[test]
fn autocorrelation_reports_the_period_not_a_multiple() {
    // Non-integer periods whose double lands closer to a whole lag.
    let cases = [
        (48_000, 880.0),
        (48_000, 1760.0),
        (44_100, 1318.5),
        (22_050, 659.26),
        (16_000, 440.0),
    ];
    for (sample_rate, freq) in cases {
        let signal = tone_at(&[(freq, 0.5)], FRAME, sample_rate);
        let estimate = AutocorrelationEstimator::default()
            .estimate(&signal, sample_rate)
            .unwrap_or_else(|e| panic!("autocorr at {freq} Hz failed: {e}"));
        assert_close(estimate, freq, &format!("autocorr at {sample_rate} Hz"));
    }
}

#[test]
fn detected_sines_are_named_correctly() {
    let cases = [(110.0, "A", 2), (261.63, "C", 4), (440.0, "A", 4), (880.0, "A", 5)];
    for method in Method::ALL {
        for (freq, name, octave) in cases {
            let detection = detect(&sine(freq), SAMPLE_RATE, method, 5, 0.01)
                .unwrap_or_else(|e| panic!("{method} at {freq} Hz failed: {e}"));
            let note = detection
                .note()
                .unwrap_or_else(|| panic!("{method} at {freq} Hz had no note"));
            assert_eq!((note.name, note.octave), (name, octave), "{method} at {freq} Hz");
            assert!(note.cents.abs() <= 10, "{method} at {freq} Hz: {} cents", note.cents);
        }
    }
}

#[test]
fn hps_recovers_a_weak_fundamental_that_fft_misses() {
    for sample_rate in RATES {
        for freq in [110.0, 196.0, 220.0] {
            let signal = weak_fundamental(freq, sample_rate);

            let hps = detect(&signal, sample_rate, Method::Hps, 5, 0.01).expect("hps detection");
            assert_close(frequency_of(&hps), freq, "hps");

            // The plain spectral peak sits on the loudest partial, an octave up.
            let fft = detect(&signal, sample_rate, Method::Fft, 5, 0.01).expect("fft detection");
            assert_close(frequency_of(&fft), 2.0 * freq, "fft");
        }
    }
}

#[test]
fn silence_short_circuits_every_method() {
    let zeros = vec![0.0f32; FRAME];
    let whisper = tone(&[(440.0, 0.004)], FRAME);
    for method in Method::ALL {
        assert_eq!(detect(&zeros, SAMPLE_RATE, method, 5, 0.01), Ok(Detection::Silence));
        assert_eq!(detect(&whisper, SAMPLE_RATE, method, 5, 0.01), Ok(Detection::Silence));
    }
}

#[test]
fn invalid_input_is_rejected_by_every_method() {
    for method in Method::ALL {
        assert_eq!(
            detect(&[], SAMPLE_RATE, method, 5, 0.01),
            Err(PitchError::EmptyBuffer)
        );
        assert_eq!(
            detect(&sine(440.0), 0, method, 5, 0.01),
            Err(PitchError::InvalidSampleRate(0))
        );
    }
}

#[test]
fn invalid_input_wins_over_silence() {
    // An all-zero buffer would be silent, but the sample rate is checked first.
    let zeros = vec![0.0f32; 128];
    let result = detect(&zeros, 0, Method::Hps, 5, 0.01);
    assert!(result.is_err_and(|e| e.is_invalid_input()));
}

#[test]
fn unsupported_method_names_fail_to_parse() {
    let parsed = "cepstrum".parse::<Method>();
    assert_eq!(parsed, Err(PitchError::UnsupportedMethod("cepstrum".to_string())));
}

#[test]
fn dc_input_maps_to_not_applicable() {
    let dc = vec![0.5f32; 1024];
    let detection = detect(&dc, SAMPLE_RATE, Method::Fft, 5, 0.01).expect("fft detection");
    assert_eq!(
        detection,
        Detection::Pitched {
            frequency_hz: 0.0,
            note: NoteMapping::NotApplicable
        }
    );
}

#[test]
fn config_drives_the_estimator() {
    let config = DetectionConfig {
        method: Method::Hps,
        harmonics: 3,
        ..DetectionConfig::default()
    };
    let detection = detect_with(&sine(440.0), SAMPLE_RATE, &config).expect("hps detection");
    assert_close(frequency_of(&detection), 440.0, "hps with 3 harmonics");

    let estimator = HpsEstimator::new(3, config.hps_floor).expect("valid estimator");
    let direct = estimator.estimate(&sine(440.0), SAMPLE_RATE).expect("direct estimate");
    assert_eq!(detection.frequency(), Some(direct));
}

#[test]
fn concurrent_calls_do_not_interfere() {
    let inputs: Vec<(f64, Vec<f32>)> = [110.0, 220.0, 440.0, 880.0]
        .into_iter()
        .map(|freq| (freq, sine(freq)))
        .collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = inputs
            .iter()
            .flat_map(|(freq, signal)| {
                Method::ALL.into_iter().map(move |method| {
                    scope.spawn(move || {
                        (*freq, method, detect(signal, SAMPLE_RATE, method, 5, 0.01))
                    })
                })
            })
            .collect();

        for handle in handles {
            let (freq, method, result) = handle.join().expect("detection thread panicked");
            let detection = result.unwrap_or_else(|e| panic!("{method} at {freq} Hz: {e}"));
            assert_close(frequency_of(&detection), freq, &format!("{method} (threaded)"));
        }
    });
}

#[test]
fn detections_serialize_for_the_front_end() {
    let silence = serde_json::to_value(Detection::Silence).expect("serialize silence");
    assert_eq!(silence, serde_json::json!({ "kind": "silence" }));

    let detection = detect(&sine(440.0), SAMPLE_RATE, Method::Fft, 5, 0.01).expect("fft");
    let value = serde_json::to_value(detection).expect("serialize detection");
    assert_eq!(value["kind"], "pitched");
    assert_eq!(value["note"]["note"]["name"], "A");
    assert_eq!(value["note"]["note"]["octave"], 4);
}
