//! `plan` command: ask a planner for issues and materialize the approved set.

use crate::app::App;
use crate::error::Result;
use crate::plan::{MaterializeReport, Planner, ProposedIssueSet, gather_context};
use serde::Serialize;
use tracing::{info, warn};

/// Result of `storymap plan`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PlanOutcome {
    /// The planner failed or returned nothing.
    Unavailable {
        /// Why no plan was produced
        reason: String,
    },
    /// The planner found nothing new to create.
    NothingNew,
    /// The user rejected the plan.
    Declined {
        /// The rejected plan
        plan: ProposedIssueSet,
    },
    /// The plan was written into the workspace.
    Materialized {
        /// The applied plan
        plan: ProposedIssueSet,
        /// What changed locally
        report: MaterializeReport,
    },
}

/// Plan `description` with `planner` and materialize it once `approve`
/// accepts it.
///
/// Tracker URL and project id never reach the planner; they are masked in
/// the request and restored in the returned plan. Planner failures are not
/// errors: they yield [`PlanOutcome::Unavailable`].
///
/// # Errors
///
/// Returns an error if the map cannot be read or the plan cannot be
/// materialized.
pub async fn plan<F>(
    app: &App,
    planner: &dyn Planner,
    description: &str,
    approve: F,
) -> Result<PlanOutcome>
where
    F: FnOnce(&ProposedIssueSet) -> bool,
{
    let sanitizer = app.sanitizer();
    let request = gather_context(app.workspace(), description).await?;
    let request = sanitizer.anonymize_request(&request);

    let mut plan = match planner.propose_issues(&request).await {
        Ok(Some(plan)) => plan,
        Ok(None) => {
            return Ok(PlanOutcome::Unavailable {
                reason: "the planner returned no plan".to_string(),
            });
        }
        Err(e) => {
            warn!(error = %e, "Planner failed, no plan available");
            return Ok(PlanOutcome::Unavailable {
                reason: e.to_string(),
            });
        }
    };
    if plan.is_empty() {
        info!("Planner proposed no new issues");
        return Ok(PlanOutcome::NothingNew);
    }
    sanitizer.restore(&mut plan);

    if !approve(&plan) {
        return Ok(PlanOutcome::Declined { plan });
    }
    let report = app.materializer().apply(&plan).await?;
    info!(
        nodes = report.nodes_added,
        links = report.links_added,
        "Plan materialized"
    );
    Ok(PlanOutcome::Materialized { plan, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorymapConfig;
    use crate::domain::NodeId;
    use crate::plan::{FilePlanner, PlanRequest, PlannerError};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const PROPOSAL: &str = "\
proposed_issues:
  - id: NEW_1
    title: Login
    labels: [Type::Epic, Backbone::Auth, Epic::Login]
  - id: NEW_2
    title: Sign in
    description: See [PROJECT_URL]/-/wikis/auth
    labels: [Type::Story, Backbone::Auth, Epic::Login]
";

    fn app(dir: &TempDir) -> App {
        let mut config = StorymapConfig::default();
        config.gitlab.url = "https://git.example.com".to_string();
        config.gitlab.project_id = "1234".to_string();
        App::new(dir.path(), config)
    }

    fn proposal(dir: &TempDir, content: &str) -> FilePlanner {
        let path = dir.path().join("proposal.yaml");
        std::fs::write(&path, content).unwrap();
        FilePlanner::new(path)
    }

    struct RecordingPlanner {
        seen: Mutex<Option<PlanRequest>>,
    }

    #[async_trait]
    impl Planner for RecordingPlanner {
        async fn propose_issues(
            &self,
            request: &PlanRequest,
        ) -> std::result::Result<Option<ProposedIssueSet>, PlannerError> {
            *self.seen.lock().unwrap() = Some(request.clone());
            Err(PlannerError::Parse("model unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn approved_plan_is_materialized_with_restored_url() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        let planner = proposal(&dir, PROPOSAL);

        let outcome = plan(&app, &planner, "Add login", |p| p.proposed_issues.len() == 2)
            .await
            .unwrap();

        let PlanOutcome::Materialized { plan, report } = outcome else {
            panic!("expected a materialized plan, got {outcome:?}");
        };
        assert_eq!(report.nodes_added, 2);
        assert_eq!(
            plan.proposed_issues[1].description,
            "See https://git.example.com/-/wikis/auth"
        );
        let map = app.workspace().load_map().await.unwrap().value;
        assert!(map.node(&NodeId::from("NEW_2")).is_some());
    }

    #[tokio::test]
    async fn declined_plan_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        let planner = proposal(&dir, PROPOSAL);

        let outcome = plan(&app, &planner, "Add login", |_| false).await.unwrap();

        assert!(matches!(outcome, PlanOutcome::Declined { .. }));
        assert!(!app.workspace().map_exists().await);
    }

    #[tokio::test]
    async fn empty_plan_means_nothing_new() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        let planner = proposal(&dir, "proposed_issues: []\n");

        let outcome = plan(&app, &planner, "Add login", |_| unreachable!())
            .await
            .unwrap();

        assert_eq!(outcome, PlanOutcome::NothingNew);
    }

    #[tokio::test]
    async fn planner_failure_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::write(
            dir.path().join("docs/setup.md"),
            "# Mirror of https://git.example.com\n",
        )
        .unwrap();
        let planner = RecordingPlanner {
            seen: Mutex::new(None),
        };

        let outcome = plan(&app, &planner, "Use project 1234", |_| true)
            .await
            .unwrap();

        assert!(matches!(outcome, PlanOutcome::Unavailable { .. }));
        let seen = planner.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.description, "Use project [PROJECT_ID]");
        assert!(seen.context.contains("Mirror of [PROJECT_URL]"));
    }
}
