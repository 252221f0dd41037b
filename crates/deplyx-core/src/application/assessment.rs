//! Change assessment pipeline
//!
//! Wires the impact analyzer and the risk engine together for one change:
//! resolve its targets, analyze impact, fold in incident history, score, and
//! publish the result back onto the change record.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::application::impact_analysis::{ImpactAnalysisService, ImpactRequest};
use crate::application::risk_engine::{ChangeRiskInput, RiskEngine};
use crate::domain::change::{ChangeId, ChangeStatus};
use crate::domain::impact::ImpactResult;
use crate::domain::repository::ChangeRepository;
use crate::domain::risk::RiskAssessment;
use crate::CoreError;

/// Combined result of assessing one change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeAssessment {
    /// The assessed change
    pub change_id: ChangeId,

    /// Impact analysis result
    pub impact: ImpactResult,

    /// Risk scoring result
    pub risk: RiskAssessment,
}

/// Runs the impact-then-risk pipeline for a change and updates its record
pub struct ChangeAssessmentService {
    impact: Arc<ImpactAnalysisService>,
    risk: RiskEngine,
    changes: Arc<dyn ChangeRepository>,
}

impl ChangeAssessmentService {
    /// Create the assessment service
    pub fn new(
        impact: Arc<ImpactAnalysisService>,
        risk: RiskEngine,
        changes: Arc<dyn ChangeRepository>,
    ) -> Self {
        Self {
            impact,
            risk,
            changes,
        }
    }

    /// Assess a change: impact analysis, incident history, risk scoring.
    ///
    /// Writes `risk_score` and `risk_level` onto the change and bumps a
    /// Pending change to Analyzing.
    pub async fn assess(&self, change_id: &ChangeId) -> Result<ChangeAssessment, CoreError> {
        let mut change = self
            .changes
            .find_by_id(change_id)
            .await?
            .ok_or_else(|| CoreError::ChangeNotFound(change_id.to_string()))?;

        let target_ids = change.target_components.clone();
        let impact = self
            .impact
            .analyze_impact(ImpactRequest {
                target_ids: target_ids.clone(),
                action: change.action,
                depth: None,
                change_type: Some(change.change_type.to_string()),
                environment: Some(change.environment.to_string()),
                title: change.title.clone(),
            })
            .await?;

        let incident_history_count = self
            .changes
            .incident_history_count(&target_ids, Some(change_id))
            .await?;

        let input = ChangeRiskInput::from_change(&change, incident_history_count);
        let risk = self.risk.evaluate_change(&input, Some(&impact));

        change.risk_score = Some(risk.risk_score);
        change.risk_level = Some(risk.risk_level);
        if change.status == ChangeStatus::Pending {
            change.set_status(ChangeStatus::Analyzing);
        } else {
            change.touch();
        }
        self.changes.save(&change).await?;

        info!(
            "Assessed change {change_id}: score={} level={} llm_powered={}",
            risk.risk_score, risk.risk_level, impact.llm_powered
        );
        Ok(ChangeAssessment {
            change_id: change_id.clone(),
            impact,
            risk,
        })
    }
}
