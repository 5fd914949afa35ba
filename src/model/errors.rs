use thiserror::Error;

/// Failure of a single profile request. Never aborts the run and never
/// stands in for a percentile value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfileError {
    #[error("{entity}: not found in the aggregated population")]
    MissingEntity { entity: String },
    #[error("{entity}: not a member of peer pool [{pool}]")]
    NotInPool { entity: String, pool: String },
    #[error("{entity}: peer pool [{pool}] is empty")]
    EmptyPool { entity: String, pool: String },
    #[error("{entity}: peer pool [{pool}] has {size} members, fewer than the required {min}")]
    PoolTooSmall {
        entity: String,
        pool: String,
        size: usize,
        min: usize,
    },
    #[error("{entity}: zero total exposure, rates are undefined")]
    EmptyExposure { entity: String },
    #[error("{entity}: statistic {stat} has no rate value")]
    UnknownStatistic { entity: String, stat: String },
}

impl ProfileError {
    pub fn entity(&self) -> &str {
        match self {
            ProfileError::MissingEntity { entity }
            | ProfileError::NotInPool { entity, .. }
            | ProfileError::EmptyPool { entity, .. }
            | ProfileError::PoolTooSmall { entity, .. }
            | ProfileError::EmptyExposure { entity }
            | ProfileError::UnknownStatistic { entity, .. } => entity,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProfileError::MissingEntity { .. } => "missing_entity",
            ProfileError::NotInPool { .. } => "not_in_pool",
            ProfileError::EmptyPool { .. } => "empty_pool",
            ProfileError::PoolTooSmall { .. } => "pool_too_small",
            ProfileError::EmptyExposure { .. } => "empty_exposure",
            ProfileError::UnknownStatistic { .. } => "unknown_statistic",
        }
    }
}
