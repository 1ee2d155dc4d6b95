use crate::domain::entities::{feature_type::FeatureType, plan::Plan};

/// Read-only plan lookup, injected so it can be swapped per environment.
pub trait PlanCatalog: Send + Sync {
    /// `plan_type` matching is case-insensitive.
    fn get_plan(&self, plan_type: &str, feature_type: FeatureType) -> Option<Plan>;

    fn list_plans(&self, feature_type: Option<FeatureType>) -> Vec<Plan>;
}
