//! `hang` (supplement 1): a filter kind with no production purpose beyond
//! exercising the engine's async suspension path — it parks the running
//! query for a configured delay and then passes.

use std::time::Duration;

use crate::params::{ParamError, Params};
use policy_config_types::Outcome;

pub struct HangFilter {
    delay: Duration,
}

impl HangFilter {
    pub fn construct(params: &Params) -> Result<HangFilter, ParamError> {
        let delay_ms: u64 = params.parse_required("delay_ms")?;
        Ok(HangFilter {
            delay: Duration::from_millis(delay_ms),
        })
    }

    pub fn possible_outcomes() -> &'static [Outcome] {
        &[Outcome::Pass]
    }

    pub async fn run(&self) -> Outcome {
        smol::Timer::after(self.delay).await;
        Outcome::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_delay_is_an_error() {
        let raw = vec![];
        assert!(HangFilter::construct(&Params::new(&raw)).is_err());
    }

    #[test]
    fn run_eventually_passes() {
        let raw = vec![("delay_ms".to_string(), "1".to_string())];
        let filter = HangFilter::construct(&Params::new(&raw)).unwrap();
        let outcome = smol::block_on(filter.run());
        assert_eq!(outcome, Outcome::Pass);
    }
}
