// https://www.johndcook.com/blog/standard_deviation/
/// Running mean and variance over a stream of values, in one pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stats {
    mean: f64,
    m2: f64,
    n: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: impl Into<f64>) {
        let value = value.into();
        self.n += 1;
        let before = value - self.mean;
        self.mean += before / self.n as f64;
        let after = value - self.mean;
        self.m2 += before * after;
    }

    pub fn count(&self) -> u64 {
        self.n
    }

    /// Zero if nothing was added
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// The population variance, i.e., divided by `n` and not `n - 1`.
    pub fn variance(&self) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        // NOTE: rounding can make this ever so slightly negative
        (self.m2 / self.n as f64).max(0.0)
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

impl<A: Into<f64>> Extend<A> for Stats {
    fn extend<T: IntoIterator<Item = A>>(&mut self, iter: T) {
        iter.into_iter().for_each(|a| self.add(a))
    }
}

impl<A: Into<f64>> FromIterator<A> for Stats {
    fn from_iter<T: IntoIterator<Item = A>>(iter: T) -> Self {
        let mut stats = Stats::new();
        stats.extend(iter);
        stats
    }
}

/// Clamps into `[0, 1]`.
pub fn unit(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}
