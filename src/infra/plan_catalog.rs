use std::path::Path;

use anyhow::Context;

use crate::{
    application::ports::plan_catalog::PlanCatalog,
    domain::entities::{
        feature_type::FeatureType,
        plan::{MAX_DURATION_DAYS, Plan},
    },
};

const DEFAULT_CURRENCY: &str = "UGX";

/// In-memory plan table loaded once at startup.
#[derive(Debug, Clone)]
pub struct StaticPlanCatalog {
    plans: Vec<Plan>,
}

impl StaticPlanCatalog {
    pub fn new(plans: Vec<Plan>) -> Self {
        Self { plans }
    }

    pub fn builtin() -> Self {
        let plan = |feature_type, plan_type: &str, name: &str, price, duration_days| Plan {
            plan_type: plan_type.to_string(),
            feature_type,
            name: name.to_string(),
            price,
            currency: DEFAULT_CURRENCY.to_string(),
            duration_days,
        };

        Self::new(vec![
            plan(FeatureType::Survey, "DAILY", "Survey Daily", 500, 1),
            plan(FeatureType::Survey, "WEEKLY", "Survey Weekly", 2_000, 7),
            plan(FeatureType::Survey, "MONTHLY", "Survey Monthly", 5_000, 30),
            plan(FeatureType::Survey, "YEARLY", "Survey Yearly", 50_000, 365),
            plan(FeatureType::Video, "WEEKLY", "Video Weekly", 3_000, 7),
            plan(FeatureType::Video, "MONTHLY", "Video Monthly", 10_000, 30),
        ])
    }

    /// Loads a JSON array of plans, rejecting duplicates and non-positive
    /// prices or durations.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read plan catalog {}", path.display()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("invalid plan catalog {}", path.display()))
    }

    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        let plans: Vec<Plan> = serde_json::from_str(raw)?;

        for (i, plan) in plans.iter().enumerate() {
            if plan.price <= 0 || plan.duration_days <= 0 {
                anyhow::bail!(
                    "plan {} {} must have a positive price and duration",
                    plan.feature_type,
                    plan.plan_type
                );
            }
            if plan.duration_days > MAX_DURATION_DAYS {
                anyhow::bail!(
                    "plan {} {} lasts longer than {MAX_DURATION_DAYS} days",
                    plan.feature_type,
                    plan.plan_type
                );
            }
            let duplicate = plans[..i].iter().any(|p| {
                p.feature_type == plan.feature_type && p.plan_type.eq_ignore_ascii_case(&plan.plan_type)
            });
            if duplicate {
                anyhow::bail!("duplicate plan {} {}", plan.feature_type, plan.plan_type);
            }
        }

        Ok(Self::new(plans))
    }
}

impl PlanCatalog for StaticPlanCatalog {
    fn get_plan(&self, plan_type: &str, feature_type: FeatureType) -> Option<Plan> {
        let plan_type = plan_type.trim();
        self.plans
            .iter()
            .find(|p| p.feature_type == feature_type && p.plan_type.eq_ignore_ascii_case(plan_type))
            .cloned()
    }

    fn list_plans(&self, feature_type: Option<FeatureType>) -> Vec<Plan> {
        self.plans
            .iter()
            .filter(|p| feature_type.is_none_or(|f| p.feature_type == f))
            .cloned()
            .collect()
    }
}
