pub mod sensitivity;

pub use sensitivity::{
    evaluate_sensitivity, run_sensitivity, PerformanceMetric, SensitivityInput,
    SensitivityOutput, SweepParameter,
};
