//! Recognized configuration options (§6.4). No CLI front-end is built
//! around this struct — that is explicitly out of scope (§1) — but the
//! rest of the crate, and its tests, read tunables from here instead of
//! scattering magic numbers, per SPEC_FULL.md §10.3.

use crate::error::{PainlessError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalStrategyKind {
    HordeSat,
    HordeSatAlt,
    Simple,
    Strengthening,
}

impl LocalStrategyKind {
    fn from_option(n: u8) -> Result<Self> {
        match n {
            1 => Ok(LocalStrategyKind::HordeSat),
            2 => Ok(LocalStrategyKind::HordeSatAlt),
            3 => Ok(LocalStrategyKind::Simple),
            4 | 5 => Ok(LocalStrategyKind::Strengthening),
            _ => Err(PainlessError::InvalidConfig("shr-strat must be in 1..=5")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalStrategyKind {
    AllGather,
    Tree,
    Ring,
}

impl GlobalStrategyKind {
    fn from_option(n: u8) -> Result<Self> {
        match n {
            1 => Ok(GlobalStrategyKind::AllGather),
            2 => Ok(GlobalStrategyKind::Tree),
            3 => Ok(GlobalStrategyKind::Ring),
            _ => Err(PainlessError::InvalidConfig("gshr-strat must be in 1..=3")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// `c`: number of solver threads.
    pub num_solvers: u32,
    /// `t`: timeout in seconds, -1 = none.
    pub timeout_secs: i64,
    /// `shr-strat`: local strategy selector.
    pub local_strategy: LocalStrategyKind,
    /// `shr-sleep`: sharer sleep in microseconds.
    pub sharer_sleep_micros: u64,
    /// `shr-lit`: per-round literal budget per producer.
    pub shr_lit: usize,
    /// `shr-initial-lbd`: initial producer lbd limit.
    pub shr_initial_lbd: u32,
    /// `shr-horde-init-round`: rounds before adaptive production kicks in.
    pub shr_horde_init_round: u32,
    /// `gshr-strat`: global strategy selector.
    pub global_strategy: GlobalStrategyKind,
    /// `gshr-lit`: global per-round literal budget.
    pub gshr_lit: usize,
    /// `dup`: enable Bloom-based duplicate detection and lbd promotion.
    pub dup: bool,
    /// `max-cls-size`: maximum clause size admitted to a limited database.
    pub max_cls_size: usize,
    /// `one-sharer`: run all strategies on a single sharer thread.
    pub one_sharer: bool,
    /// Admission cap for an unbounded-style local database.
    pub admission_cap: u64,
    /// Admission cap for the bounded global gateway database.
    pub gateway_admission_cap: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            num_solvers: 1,
            timeout_secs: -1,
            local_strategy: LocalStrategyKind::HordeSat,
            sharer_sleep_micros: 500_000,
            shr_lit: 1500,
            shr_initial_lbd: 2,
            shr_horde_init_round: 1,
            global_strategy: GlobalStrategyKind::AllGather,
            gshr_lit: 1500,
            dup: false,
            max_cls_size: crate::database::DEFAULT_MAX_SIZE,
            one_sharer: false,
            admission_cap: crate::database::DEFAULT_ADMISSION_CAP,
            gateway_admission_cap: crate::database::GATEWAY_ADMISSION_CAP,
        }
    }
}

impl Config {
    pub fn with_local_strategy(shr_strat: u8) -> Result<Self> {
        let mut cfg = Self::default();
        cfg.local_strategy = LocalStrategyKind::from_option(shr_strat)?;
        Ok(cfg)
    }

    pub fn with_global_strategy(mut self, gshr_strat: u8) -> Result<Self> {
        self.global_strategy = GlobalStrategyKind::from_option(gshr_strat)?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_solvers == 0 {
            return Err(PainlessError::InvalidConfig("c must be >= 1"));
        }
        if self.shr_lit == 0 {
            return Err(PainlessError::InvalidConfig("shr-lit must be >= 1"));
        }
        if self.max_cls_size == 0 {
            return Err(PainlessError::InvalidConfig("max-cls-size must be >= 1"));
        }
        Ok(())
    }

    /// Per-round global buffer capacity, `gshr-lit * number-of-CPUs`
    /// (§4.8's default `1500 * number-of-CPUs`), given an explicit CPU
    /// count so the crate does not reach into platform APIs itself.
    pub fn global_buffer_capacity(&self, num_cpus: usize) -> usize {
        self.gshr_lit * num_cpus.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.sharer_sleep_micros, 500_000);
        assert_eq!(cfg.shr_lit, 1500);
        assert_eq!(cfg.shr_initial_lbd, 2);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_strategy_selector() {
        assert!(Config::with_local_strategy(0).is_err());
        assert!(Config::with_local_strategy(6).is_err());
        assert!(Config::default().with_global_strategy(4).is_err());
    }
}
