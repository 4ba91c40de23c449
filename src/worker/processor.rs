/// Synthetic CPU-bound workload used to make tasks take measurable time.
#[derive(Debug, Clone, Copy)]
pub struct HeavyProcessor {
    work_unit: u64,
}

impl HeavyProcessor {
    pub fn new(work_unit: u64) -> Self {
        Self { work_unit }
    }

    pub fn seed() -> f64 {
        let data = 0.0001232 + 39089238.3434;
        1.0 + (1.0 + (1.0 + (1.0 + data)))
    }

    /// Adds `1..=work_unit` onto a fixed seed, `iterations` times over.
    pub fn process_double_values(&self, iterations: u32) -> f64 {
        let mut acc = Self::seed();
        for _ in 0..iterations {
            for i in 1..=self.work_unit {
                acc += i as f64;
            }
        }
        acc
    }
}
