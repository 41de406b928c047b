//! Margin status classification and rule-based dashboard insights.

use rust_decimal::Decimal;

use crate::models::analytics::{Insight, InsightTier, MarginStatus};

use super::work_hours::round2;

/// Classifies a margin percentage into the three-tier semaphore.
///
/// `None` means the site has no usable contract value.
pub fn classify_margin(margin_percent: Option<Decimal>) -> MarginStatus {
    match margin_percent {
        None => MarginStatus::Unknown,
        Some(p) if p < Decimal::from(10) => MarginStatus::Low,
        Some(p) if p < Decimal::from(20) => MarginStatus::Medium,
        Some(_) => MarginStatus::High,
    }
}

/// Lower bound of an insight tier, in tenths of a percent.
#[derive(Debug, Clone, Copy)]
enum Bound {
    Above(i64),
    AtLeast(i64),
    Any,
}

impl Bound {
    fn matches(self, value: Decimal) -> bool {
        match self {
            Bound::Above(tenths) => value > Decimal::new(tenths, 1),
            Bound::AtLeast(tenths) => value >= Decimal::new(tenths, 1),
            Bound::Any => true,
        }
    }
}

/// Threshold table, checked top to bottom. The first matching row wins.
const INSIGHT_RULES: [(Bound, InsightTier, &str); 4] = [
    (
        Bound::Above(25),
        InsightTier::Excellent,
        "Margine eccellente: {margin}% sul valore dei contratti. Manodopera al {labor}% e materiali al {materials}% dei costi.",
    ),
    (
        Bound::AtLeast(15),
        InsightTier::Healthy,
        "Margine in salute: {margin}% sul valore dei contratti. Manodopera al {labor}% e materiali al {materials}% dei costi.",
    ),
    (
        Bound::AtLeast(5),
        InsightTier::Stable,
        "Margine stabile: {margin}% sul valore dei contratti. Tenere sotto controllo manodopera ({labor}%) e materiali ({materials}%).",
    ),
    (
        Bound::Any,
        InsightTier::Critical,
        "Margine critico: {margin}% sul valore dei contratti. Rivedere i costi di manodopera ({labor}%) e materiali ({materials}%).",
    ),
];

fn percent_text(value: Decimal) -> String {
    let mut value = round2(value);
    value.rescale(2);
    value.to_string()
}

fn render(template: &str, margin: Decimal, labor: Decimal, materials: Decimal) -> String {
    template
        .replace("{margin}", &percent_text(margin))
        .replace("{labor}", &percent_text(labor))
        .replace("{materials}", &percent_text(materials))
}

/// Picks the insight for a company-wide margin growth percentage.
pub fn classify_insight(
    margin_growth_percent: Decimal,
    labor_incidence_percent: Decimal,
    materials_incidence_percent: Decimal,
) -> Insight {
    let (_, tier, template) = INSIGHT_RULES
        .iter()
        .copied()
        .find(|(bound, _, _)| bound.matches(margin_growth_percent))
        .unwrap_or(INSIGHT_RULES[INSIGHT_RULES.len() - 1]);

    Insight {
        tier,
        message: render(
            template,
            margin_growth_percent,
            labor_incidence_percent,
            materials_incidence_percent,
        ),
    }
}
