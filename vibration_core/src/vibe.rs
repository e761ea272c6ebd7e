//! The "target vibration" the user is asked to design, and its prompt text.

use rand::Rng;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetVibration {
    Tick,
    Wobble,
    Ascending,
    Descending,
    Agitated,
    Happy,
    Sad,
    Relaxed,
}

impl TargetVibration {
    pub const ALL: [TargetVibration; 8] = [
        TargetVibration::Tick,
        TargetVibration::Wobble,
        TargetVibration::Ascending,
        TargetVibration::Descending,
        TargetVibration::Agitated,
        TargetVibration::Happy,
        TargetVibration::Sad,
        TargetVibration::Relaxed,
    ];

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        TargetVibration::ALL[rng.gen_range(0..TargetVibration::ALL.len())]
    }

    pub fn name(&self) -> &'static str {
        match self {
            TargetVibration::Tick       => "tick",
            TargetVibration::Wobble     => "wobble",
            TargetVibration::Ascending  => "ascending",
            TargetVibration::Descending => "descending",
            TargetVibration::Agitated   => "agitated",
            TargetVibration::Happy      => "happy",
            TargetVibration::Sad        => "sad",
            TargetVibration::Relaxed    => "relaxed",
        }
    }

    /// Agent fill colour, packed ARGB at 40% opacity.
    pub fn colour(&self) -> u32 {
        let (r, g, b) = match self {
            TargetVibration::Happy
            | TargetVibration::Agitated
            | TargetVibration::Ascending => (255, 100, 100),
            TargetVibration::Sad        => (255, 255, 100),
            TargetVibration::Wobble     => (100, 255, 255),
            TargetVibration::Descending
            | TargetVibration::Tick     => (100, 100, 255),
            TargetVibration::Relaxed    => (100, 255, 100),
        };
        argb(102, r, g, b)
    }

    /// "What does a/an … vibration feel like?", choosing the article from the
    /// word's first letter.
    pub fn prompt(&self) -> String {
        let first = self.name().get(..1).unwrap_or("");
        question(is_vowel(first), self.name())
    }

    /// Envelope-screen variant: the article test is handed the whole word,
    /// which is never a single vowel, so it always reads "a".
    pub fn envelope_prompt(&self) -> String {
        question(is_vowel(self.name()), self.name())
    }
}

/// True only for a single upper- or lower-case vowel.
pub fn is_vowel(s: &str) -> bool {
    matches!(s, "a" | "A" | "e" | "E" | "i" | "I" | "o" | "O" | "u" | "U")
}

fn question(vowel: bool, word: &str) -> String {
    format!("What does {} {} vibration feel like?", if vowel { "an" } else { "a" }, word)
}

pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn article_follows_first_letter() {
        assert_eq!(TargetVibration::Agitated.prompt(), "What does an agitated vibration feel like?");
        assert_eq!(TargetVibration::Tick.prompt(), "What does a tick vibration feel like?");
    }

    #[test]
    fn envelope_prompt_always_uses_a() {
        assert_eq!(
            TargetVibration::Ascending.envelope_prompt(),
            "What does a ascending vibration feel like?"
        );
    }

    #[test]
    fn vowel_needs_single_character() {
        assert!(is_vowel("E"));
        assert!(!is_vowel("ea"));
        assert!(!is_vowel(""));
        assert!(!is_vowel("t"));
    }

    #[test]
    fn colours_are_translucent() {
        for v in TargetVibration::ALL {
            assert_eq!(v.colour() >> 24, 102);
        }
        assert_eq!(TargetVibration::Relaxed.colour() & 0x00FF_FFFF, 0x0064_FF64);
    }

    #[test]
    fn random_draws_from_all() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            seen.insert(TargetVibration::random(&mut rng).name());
        }
        assert_eq!(seen.len(), 8);
    }
}
