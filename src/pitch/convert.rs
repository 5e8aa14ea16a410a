// Pitch conversions
// Hz <-> MIDI note number, and scientific pitch names (C2, F#4, Bb-1) to Hz

use super::PitchError;

/// Reference tuning: A4 = 440 Hz = MIDI 69
pub const A4_HZ: f64 = 440.0;
pub const A4_MIDI: f64 = 69.0;

/// Convert a frequency to a fractional MIDI note number
pub fn hz_to_midi(frequency_hz: f64) -> f64 {
    12.0 * (frequency_hz / A4_HZ).log2() + A4_MIDI
}

/// Convert a (possibly fractional) MIDI note number to Hz
pub fn midi_to_hz(midi: f64) -> f64 {
    A4_HZ * 2.0f64.powf((midi - A4_MIDI) / 12.0)
}

/// Round a frequency to the nearest MIDI note, clamped to the valid 0-127 range
pub fn quantize_midi(frequency_hz: f64) -> u8 {
    let midi = hz_to_midi(frequency_hz).round();
    if midi.is_nan() {
        return 0;
    }
    midi.clamp(0.0, 127.0) as u8
}

/// Parse a note name such as `C2`, `F#4`, `Bb3` or `C-1` into a MIDI number
pub fn note_to_midi(name: &str) -> Result<i32, PitchError> {
    let invalid = || PitchError::InvalidNoteName(name.to_string());
    let trimmed = name.trim();
    let mut chars = trimmed.chars();

    let letter = chars.next().ok_or_else(invalid)?;
    let pitch_class = match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return Err(invalid()),
    };

    let rest = chars.as_str();
    let accidental_len = rest
        .chars()
        .take_while(|c| matches!(c, '#' | 'b' | '♯' | '♭'))
        .map(char::len_utf8)
        .sum::<usize>();
    let (accidentals, octave) = rest.split_at(accidental_len);

    let offset: i32 = accidentals
        .chars()
        .map(|c| if c == '#' || c == '♯' { 1 } else { -1 })
        .sum();

    let octave: i32 = octave.parse().map_err(|_| invalid())?;

    Ok((octave + 1) * 12 + pitch_class + offset)
}

/// Frequency of a named note in Hz
pub fn note_to_hz(name: &str) -> Result<f64, PitchError> {
    note_to_midi(name).map(|midi| midi_to_hz(midi as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hz_to_midi_reference() {
        assert!((hz_to_midi(440.0) - 69.0).abs() < 1e-9);
        assert!((hz_to_midi(220.0) - 57.0).abs() < 1e-9);
        assert!((hz_to_midi(261.6256) - 60.0).abs() < 1e-3);
    }

    #[test]
    fn test_midi_to_hz_inverse() {
        for midi in [24.0, 57.0, 69.0, 96.0] {
            assert!((hz_to_midi(midi_to_hz(midi)) - midi).abs() < 1e-9);
        }
    }

    #[test]
    fn test_quantize_midi_rounds_and_clamps() {
        assert_eq!(quantize_midi(220.0), 57);
        // A quarter tone above A3 still rounds down
        assert_eq!(quantize_midi(midi_to_hz(57.4)), 57);
        assert_eq!(quantize_midi(midi_to_hz(57.6)), 58);
        assert_eq!(quantize_midi(1.0), 0);
        assert_eq!(quantize_midi(50_000.0), 127);
        assert_eq!(quantize_midi(f64::NAN), 0);
    }

    #[test]
    fn test_note_names() {
        assert_eq!(note_to_midi("C2").unwrap(), 36);
        assert_eq!(note_to_midi("C7").unwrap(), 96);
        assert_eq!(note_to_midi("A4").unwrap(), 69);
        assert_eq!(note_to_midi("F#4").unwrap(), 66);
        assert_eq!(note_to_midi("Bb3").unwrap(), 58);
        assert_eq!(note_to_midi("C-1").unwrap(), 0);
        assert_eq!(note_to_midi("c4").unwrap(), 60);
    }

    #[test]
    fn test_note_to_hz_range_bounds() {
        assert!((note_to_hz("C2").unwrap() - 65.406).abs() < 0.01);
        assert!((note_to_hz("C7").unwrap() - 2093.005).abs() < 0.01);
    }

    #[test]
    fn test_invalid_note_names() {
        assert!(note_to_midi("").is_err());
        assert!(note_to_midi("H2").is_err());
        assert!(note_to_midi("C").is_err());
        assert!(note_to_midi("C#x").is_err());
    }
}
