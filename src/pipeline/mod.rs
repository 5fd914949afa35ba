pub mod stage1_aggregate;
pub mod stage2_rates;
pub mod stage3_pool;
pub mod stage4_percentile;
pub mod stage5_rolling;
pub mod stage6_profile;
pub mod stage7_report;
