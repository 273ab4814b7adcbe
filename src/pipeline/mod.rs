pub mod stage1_input;
pub mod stage2_normalize;
pub mod stage3_regulon;
pub mod stage4_activity;
pub mod stage5_clusters;
pub mod stage6_report;
