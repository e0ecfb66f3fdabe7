//! Demo dataset.
//!
//! [`reset_and_seed`] wipes every table and loads five users and fourteen experiments spread
//! across the Marketing, Sales, Procurement, Operations and IT departments. It is destructive
//! and only runs when asked for, either through the `seed` subcommand or `seed_on_startup`.

use crate::db::{
    handlers::{Experiments, Repository, Users},
    models::{
        experiments::{ExperimentCreateDBRequest, ExperimentState, ExperimentType, Significance},
        users::UserCreateDBRequest,
    },
};
use crate::types::UserId;
use sqlx::SqlitePool;
use tracing::{info, warn};

use ExperimentState::{Completed, Running, Stopped};
use ExperimentType::{FixedHorizon, GroupSequential};
use Significance::{High, Low, Medium};

struct SeedUser {
    name: &'static str,
    email: &'static str,
    department: &'static str,
    profile_picture: &'static str,
}

const USERS: [SeedUser; 5] = [
    SeedUser {
        name: "John Doe",
        email: "john@example.com",
        department: "Marketing",
        profile_picture: "/static/avatar1.png",
    },
    SeedUser {
        name: "Maya Patel",
        email: "maya@example.com",
        department: "Sales",
        profile_picture: "/static/avatar2.png",
    },
    SeedUser {
        name: "Robert Chen",
        email: "robert@example.com",
        department: "Procurement",
        profile_picture: "/static/avatar3.png",
    },
    SeedUser {
        name: "Sarah Kim",
        email: "sarah@example.com",
        department: "Operations",
        profile_picture: "/static/avatar4.png",
    },
    SeedUser {
        name: "David Wilson",
        email: "david@example.com",
        department: "IT",
        profile_picture: "/static/avatar5.png",
    },
];

struct SeedExperiment {
    name: &'static str,
    experiment_type: ExperimentType,
    state: ExperimentState,
    department: &'static str,
    stage: &'static str,
    /// value, positive bound, negative bound
    impact: (f64, f64, f64),
    confidence: f64,
    progress: f64,
    /// count, target, sample size reached
    participants: (i64, i64, bool),
    /// weeks, days
    duration: (i64, i64),
    significance: Significance,
    analysis_type: &'static str,
    /// 1-based positions in [`USERS`]
    owners: &'static [usize],
}

const EXPERIMENTS: [SeedExperiment; 14] = [
    SeedExperiment {
        name: "Campaign Smart Targeting ML",
        experiment_type: FixedHorizon,
        state: Running,
        department: "Marketing",
        stage: "Phase 2",
        impact: (12.4, 15.7, -1.2),
        confidence: 98.3,
        progress: 82.0,
        participants: (38, 45, false),
        duration: (6, 3),
        significance: High,
        analysis_type: "A/B Test",
        owners: &[1, 5],
    },
    SeedExperiment {
        name: "Personalized Email Subject Lines",
        experiment_type: GroupSequential,
        state: Running,
        department: "Marketing",
        stage: "Phase 1",
        impact: (8.2, 10.5, -1.8),
        confidence: 92.1,
        progress: 45.0,
        participants: (22, 40, false),
        duration: (4, 2),
        significance: Medium,
        analysis_type: "Multivariate",
        owners: &[1],
    },
    SeedExperiment {
        name: "Adobe vs Salesforce Marketing Cloud",
        experiment_type: FixedHorizon,
        state: Running,
        department: "Marketing",
        stage: "Pilot",
        impact: (5.3, 7.1, -1.5),
        confidence: 88.4,
        progress: 75.0,
        participants: (26, 30, false),
        duration: (8, 0),
        significance: Medium,
        analysis_type: "Vendor Comparison",
        owners: &[1, 5],
    },
    SeedExperiment {
        name: "Lead Scoring Algorithm Update",
        experiment_type: GroupSequential,
        state: Running,
        department: "Sales",
        stage: "Scale",
        impact: (18.7, 22.3, -1.1),
        confidence: 99.7,
        progress: 100.0,
        participants: (42, 40, true),
        duration: (12, 0),
        significance: High,
        analysis_type: "A/B Test",
        owners: &[2],
    },
    SeedExperiment {
        name: "HubSpot vs Salesforce CRM Integration",
        experiment_type: FixedHorizon,
        state: Stopped,
        department: "Sales",
        stage: "Pre-launch",
        impact: (-2.3, 1.8, -5.6),
        confidence: 87.2,
        progress: 65.0,
        participants: (18, 30, false),
        duration: (4, 5),
        significance: Low,
        analysis_type: "Vendor Comparison",
        owners: &[2, 5],
    },
    SeedExperiment {
        name: "Sales Conversation Intelligence",
        experiment_type: FixedHorizon,
        state: Running,
        department: "Sales",
        stage: "Discovery",
        impact: (4.5, 6.8, -1.2),
        confidence: 58.4,
        progress: 28.0,
        participants: (12, 35, false),
        duration: (7, 0),
        significance: Medium,
        analysis_type: "Feature Flag",
        owners: &[2, 1],
    },
    SeedExperiment {
        name: "Spend Analytics Dashboard",
        experiment_type: FixedHorizon,
        state: Running,
        department: "Procurement",
        stage: "Pilot",
        impact: (9.6, 11.2, -0.7),
        confidence: 98.9,
        progress: 94.0,
        participants: (45, 45, true),
        duration: (10, 4),
        significance: High,
        analysis_type: "A/B Test",
        owners: &[3],
    },
    SeedExperiment {
        name: "Coupa vs SAP Ariba for PO Processing",
        experiment_type: GroupSequential,
        state: Running,
        department: "Procurement",
        stage: "Phase 3",
        impact: (7.8, 9.5, -1.4),
        confidence: 95.6,
        progress: 77.0,
        participants: (28, 30, false),
        duration: (9, 1),
        significance: Medium,
        analysis_type: "Vendor Comparison",
        owners: &[3, 5],
    },
    SeedExperiment {
        name: "Supplier Risk Assessment Model",
        experiment_type: FixedHorizon,
        state: Completed,
        department: "Procurement",
        stage: "Scale",
        impact: (21.4, 24.8, -0.8),
        confidence: 99.9,
        progress: 100.0,
        participants: (30, 30, true),
        duration: (16, 3),
        significance: High,
        analysis_type: "Custom",
        owners: &[3, 4],
    },
    SeedExperiment {
        name: "Real-time Inventory Prediction",
        experiment_type: GroupSequential,
        state: Running,
        department: "Operations",
        stage: "Phase 2",
        impact: (8.9, 10.5, -1.8),
        confidence: 97.3,
        progress: 72.0,
        participants: (31, 40, false),
        duration: (11, 0),
        significance: High,
        analysis_type: "Multivariate",
        owners: &[4],
    },
    SeedExperiment {
        name: "Blue Yonder vs Manhattan Warehouse AI",
        experiment_type: FixedHorizon,
        state: Running,
        department: "Operations",
        stage: "Discovery",
        impact: (3.2, 5.4, -2.1),
        confidence: 67.7,
        progress: 32.0,
        participants: (16, 40, false),
        duration: (5, 2),
        significance: Medium,
        analysis_type: "Vendor Comparison",
        owners: &[4, 5],
    },
    SeedExperiment {
        name: "Delivery Route Optimization",
        experiment_type: FixedHorizon,
        state: Completed,
        department: "Operations",
        stage: "Scale",
        impact: (15.3, 17.8, -1.2),
        confidence: 99.8,
        progress: 100.0,
        participants: (35, 35, true),
        duration: (14, 2),
        significance: High,
        analysis_type: "A/B Test",
        owners: &[4, 3],
    },
    SeedExperiment {
        name: "Internal vs Cloud ML Models",
        experiment_type: FixedHorizon,
        state: Running,
        department: "IT",
        stage: "Phase 1",
        impact: (6.8, 8.9, -1.6),
        confidence: 91.2,
        progress: 58.0,
        participants: (24, 40, false),
        duration: (13, 0),
        significance: Medium,
        analysis_type: "Vendor Comparison",
        owners: &[5, 1],
    },
    SeedExperiment {
        name: "Azure ML vs AWS Sagemaker",
        experiment_type: GroupSequential,
        state: Running,
        department: "IT",
        stage: "Pre-launch",
        impact: (2.4, 4.7, -2.4),
        confidence: 73.5,
        progress: 40.0,
        participants: (18, 36, false),
        duration: (8, 3),
        significance: Low,
        analysis_type: "Vendor Comparison",
        owners: &[5],
    },
];

impl SeedExperiment {
    fn to_request(&self, user_ids: &[UserId]) -> ExperimentCreateDBRequest {
        let owner_ids = self
            .owners
            .iter()
            .filter_map(|position| user_ids.get(position - 1).copied())
            .collect::<Vec<_>>();

        ExperimentCreateDBRequest::builder()
            .name(self.name)
            .experiment_type(self.experiment_type)
            .state(self.state)
            .department(self.department)
            .stage(self.stage)
            .impact_value(self.impact.0)
            .impact_positive_bound(self.impact.1)
            .impact_negative_bound(self.impact.2)
            .confidence(self.confidence)
            .progress(self.progress)
            .participants_count(self.participants.0)
            .participants_target(self.participants.1)
            .sample_size_reached(self.participants.2)
            .duration_weeks(self.duration.0)
            .duration_days(self.duration.1)
            .significance(self.significance)
            .analysis_type(self.analysis_type)
            .owner_ids(owner_ids)
            .build()
    }
}

/// Wipe all experiments, owner links and users, then load the demo dataset.
///
/// Runs in a single transaction, so a failure part-way leaves the previous contents intact.
/// Autoincrement counters are reset, so the demo users always get ids 1 to 5.
pub async fn reset_and_seed(pool: &SqlitePool) -> anyhow::Result<()> {
    warn!("Resetting database: all experiments and users will be replaced with demo data");

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM experiment_owners").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM experiments").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM users").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM sqlite_sequence WHERE name IN ('users', 'experiments')")
        .execute(&mut *tx)
        .await?;

    let mut user_ids = Vec::with_capacity(USERS.len());
    {
        let mut users = Users::new(&mut tx);
        for user in &USERS {
            let request = UserCreateDBRequest::builder()
                .name(user.name)
                .email(user.email)
                .department(user.department)
                .profile_picture(user.profile_picture)
                .build();
            user_ids.push(users.create(&request).await?.id);
        }
    }

    {
        let mut experiments = Experiments::new(&mut tx);
        for experiment in &EXPERIMENTS {
            experiments.create(&experiment.to_request(&user_ids)).await?;
        }
    }

    tx.commit().await?;

    info!(users = USERS.len(), experiments = EXPERIMENTS.len(), "Seeded demo data");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::experiments::ExperimentFilter;

    #[sqlx::test]
    #[test_log::test]
    async fn test_seed_loads_users_and_experiments(pool: SqlitePool) {
        reset_and_seed(&pool).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let users = Users::new(&mut conn).list(&()).await.unwrap();
        assert_eq!(users.len(), 5);
        assert_eq!(users.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
        assert_eq!(users[0].email, "john@example.com");
        assert_eq!(users[4].profile_picture, "/static/avatar5.png");

        let experiments = Experiments::new(&mut conn).list(&ExperimentFilter::new()).await.unwrap();
        assert_eq!(experiments.len(), 14);
        assert!(experiments.iter().all(|e| e.boundaries_crossed.is_empty()));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_seed_owner_order_is_preserved(pool: SqlitePool) {
        reset_and_seed(&pool).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let all = Experiments::new(&mut conn).list(&ExperimentFilter::new()).await.unwrap();
        let delivery = all.iter().find(|e| e.name == "Delivery Route Optimization").unwrap();
        let owners = delivery.owners.iter().map(|o| o.name.as_str()).collect::<Vec<_>>();
        assert_eq!(owners, vec!["Sarah Kim", "Robert Chen"]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_seed_filters(pool: SqlitePool) {
        reset_and_seed(&pool).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Experiments::new(&mut conn);

        let filter = ExperimentFilter::new().with_department("Sales").with_significance("High");
        let found = repo.list(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Lead Scoring Algorithm Update");

        let found = repo.list(&ExperimentFilter::new().with_search("CRM")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "HubSpot vs Salesforce CRM Integration");

        let found = repo.list(&ExperimentFilter::new().with_owner("5")).await.unwrap();
        assert_eq!(found.len(), 7);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_seed_twice_replaces_data(pool: SqlitePool) {
        reset_and_seed(&pool).await.unwrap();
        reset_and_seed(&pool).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let users = Users::new(&mut conn).list(&()).await.unwrap();
        assert_eq!(users.len(), 5);
        assert_eq!(users[0].id, 1);

        let experiments = Experiments::new(&mut conn).list(&ExperimentFilter::new()).await.unwrap();
        assert_eq!(experiments.len(), 14);
    }
}
