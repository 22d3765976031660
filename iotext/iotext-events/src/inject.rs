// Copyright (c) Microsoft. All rights reserved.

/// A class of decode failure that can be simulated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InjectedError {
    Encoding,
    InterfaceName,
    Payload,
}

/// Decides whether the decoder should pretend a given failure happened.
///
/// Used to exercise the issue reporting path of a monitoring session without a misbehaving device.
pub trait ErrorInjectionPolicy {
    fn should_inject(&mut self, error: InjectedError) -> bool;
}

/// The production policy.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverInject;

impl ErrorInjectionPolicy for NeverInject {
    fn should_inject(&mut self, _error: InjectedError) -> bool {
        false
    }
}

/// Injects each class of error with its own probability, drawing from a seeded generator
/// so that a demo run is reproducible.
#[derive(Debug)]
pub struct SeededInjection {
    rng: rand::rngs::StdRng,
    probability: f64,
    overrides: std::collections::HashMap<InjectedError, f64>,
}

fn check_probability(probability: f64) {
    assert!(
        (0.0..=1.0).contains(&probability),
        "injection probability must be within 0.0..=1.0"
    );
}

impl SeededInjection {
    /// `probability` applies to every class without an override.
    ///
    /// # Panics
    ///
    /// Panics if `probability` is not within `0.0..=1.0`.
    #[must_use]
    pub fn new(seed: u64, probability: f64) -> Self {
        use rand::SeedableRng;

        check_probability(probability);

        SeededInjection {
            rng: rand::rngs::StdRng::seed_from_u64(seed),
            probability,
            overrides: Default::default(),
        }
    }

    /// # Panics
    ///
    /// Panics if `probability` is not within `0.0..=1.0`.
    #[must_use]
    pub fn with_probability(mut self, error: InjectedError, probability: f64) -> Self {
        check_probability(probability);
        self.overrides.insert(error, probability);

        self
    }

    fn probability(&self, error: InjectedError) -> f64 {
        self.overrides
            .get(&error)
            .copied()
            .unwrap_or(self.probability)
    }
}

impl ErrorInjectionPolicy for SeededInjection {
    fn should_inject(&mut self, error: InjectedError) -> bool {
        use rand::Rng;

        let probability = self.probability(error);
        self.rng.gen_bool(probability)
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorInjectionPolicy, InjectedError, NeverInject, SeededInjection};

    #[test]
    fn never() {
        let mut policy = NeverInject;
        assert!(!policy.should_inject(InjectedError::Encoding));
        assert!(!policy.should_inject(InjectedError::Payload));
    }

    #[test]
    fn seeded_is_reproducible() {
        let draw = |seed| {
            let mut policy = SeededInjection::new(seed, 0.5);
            (0..32)
                .map(|_| policy.should_inject(InjectedError::Payload))
                .collect::<Vec<_>>()
        };

        assert_eq!(draw(0), draw(0));
        assert!(draw(0).contains(&true));
        assert!(draw(0).contains(&false));
    }

    #[test]
    fn seeded_extremes() {
        let mut always = SeededInjection::new(1, 1.0);
        let mut never = SeededInjection::new(1, 0.0);

        for _ in 0..16 {
            assert!(always.should_inject(InjectedError::InterfaceName));
            assert!(!never.should_inject(InjectedError::InterfaceName));
        }
    }

    #[test]
    fn per_class_probabilities() {
        let mut policy = SeededInjection::new(7, 0.0)
            .with_probability(InjectedError::Payload, 1.0)
            .with_probability(InjectedError::Encoding, 0.0);

        for _ in 0..16 {
            assert!(policy.should_inject(InjectedError::Payload));
            assert!(!policy.should_inject(InjectedError::Encoding));
            assert!(!policy.should_inject(InjectedError::InterfaceName));
        }
    }

    #[test]
    #[should_panic(expected = "injection probability")]
    fn out_of_range_override() {
        let _ = SeededInjection::new(7, 0.5).with_probability(InjectedError::Payload, 1.5);
    }
}
