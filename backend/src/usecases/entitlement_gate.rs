use legacykeeper::domain::{
    entities::subscribers::SubscriberEntity,
    repositories::{
        access::AccessRepository, content_usage::ContentUsageRepository,
        plan_catalog::PlanCatalogRepository, storage::StorageLister,
        subscribers::SubscriberRepository,
    },
    value_objects::{
        entitlements::{EntitlementGate, GateOutcome, merge_entitlements},
        enums::{content_kinds::ContentKind, plan_aliases::PlanAlias},
    },
};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::usecases::usage::UsageAggregator;

/// Evaluates the effective capability set for a user by merging, in
/// increasing priority: static plan defaults, the plan derived from the
/// subscriber row, and the live `current_access` override. Every failure
/// falls back toward the static defaults so the result is always total —
/// a broken RPC can narrow access to free-tier, never widen it and never
/// leave a capability undecided.
pub struct EntitlementGateUseCase<Sub, Cat, Acc, C, St>
where
    Sub: SubscriberRepository + Send + Sync + 'static,
    Cat: PlanCatalogRepository + Send + Sync + 'static,
    Acc: AccessRepository + Send + Sync + 'static,
    C: ContentUsageRepository + Send + Sync + 'static,
    St: StorageLister + Send + Sync + 'static,
{
    subscriber_repo: Arc<Sub>,
    plan_catalog: Arc<Cat>,
    access_repo: Arc<Acc>,
    usage_aggregator: Arc<UsageAggregator<C, St>>,
}

impl<Sub, Cat, Acc, C, St> EntitlementGateUseCase<Sub, Cat, Acc, C, St>
where
    Sub: SubscriberRepository + Send + Sync + 'static,
    Cat: PlanCatalogRepository + Send + Sync + 'static,
    Acc: AccessRepository + Send + Sync + 'static,
    C: ContentUsageRepository + Send + Sync + 'static,
    St: StorageLister + Send + Sync + 'static,
{
    pub fn new(
        subscriber_repo: Arc<Sub>,
        plan_catalog: Arc<Cat>,
        access_repo: Arc<Acc>,
        usage_aggregator: Arc<UsageAggregator<C, St>>,
    ) -> Self {
        Self {
            subscriber_repo,
            plan_catalog,
            access_repo,
            usage_aggregator,
        }
    }

    pub async fn evaluate(&self, user_id: Uuid) -> EntitlementGate {
        let subscriber = match self.subscriber_repo.find_by_user_id(user_id).await {
            Ok(subscriber) => subscriber,
            Err(err) => {
                warn!(
                    %user_id,
                    db_error = ?err,
                    "entitlement_gate: subscriber lookup failed, treating as free"
                );
                None
            }
        };

        let plan = self.derive_plan_alias(subscriber.as_ref()).await;

        let access = match self.access_repo.current_access(user_id).await {
            Ok(row) => row,
            Err(err) => {
                warn!(
                    %user_id,
                    db_error = ?err,
                    "entitlement_gate: current_access failed, falling back to plan defaults"
                );
                None
            }
        };

        debug!(
            %user_id,
            plan = %plan,
            has_override = access.is_some(),
            "entitlement_gate: merged entitlements"
        );

        let entitlements = merge_entitlements(plan, access.as_ref());
        let usage = self.usage_aggregator.collect(user_id).await;

        EntitlementGate {
            entitlements,
            usage: Some(usage),
        }
    }

    /// Server-side creation guard, consulted before persisting gated content.
    /// Wisdom resources are gated by the mentor role; everything else by the
    /// month-to-date quota.
    pub async fn can_create(&self, user_id: Uuid, kind: ContentKind) -> GateOutcome {
        let gate = self.evaluate(user_id).await;
        match kind {
            ContentKind::Wisdom => gate.require_mentor_role(),
            _ => gate.require_capacity(kind),
        }
    }

    /// Plan identity is derived, never trusted from the human tier string
    /// when a plan id is present: the catalog's mentorship value decides.
    async fn derive_plan_alias(&self, subscriber: Option<&SubscriberEntity>) -> PlanAlias {
        let Some(subscriber) = subscriber else {
            return PlanAlias::Free;
        };

        let Some(plan_id) = subscriber.plan_id.as_deref() else {
            return PlanAlias::from_tier_name(subscriber.subscription_tier.as_deref());
        };

        match self.plan_catalog.find_mentorship_value(plan_id).await {
            Ok(Some(level)) => PlanAlias::from_mentorship(level),
            Ok(None) => PlanAlias::Free,
            Err(err) => {
                warn!(
                    plan_id,
                    db_error = ?err,
                    "entitlement_gate: plan_limits lookup failed, treating as free"
                );
                PlanAlias::Free
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use legacykeeper::domain::{
        repositories::{
            access::MockAccessRepository, content_usage::MockContentUsageRepository,
            plan_catalog::MockPlanCatalogRepository, storage::MockStorageLister,
            subscribers::MockSubscriberRepository,
        },
        value_objects::{
            entitlements::{AccessRow, GateReason},
            enums::mentorship_levels::MentorshipLevel,
        },
    };
    use mockall::predicate::eq;

    type TestUseCase = EntitlementGateUseCase<
        MockSubscriberRepository,
        MockPlanCatalogRepository,
        MockAccessRepository,
        MockContentUsageRepository,
        MockStorageLister,
    >;

    fn subscriber_with(plan_id: Option<&str>, tier: Option<&str>) -> SubscriberEntity {
        let now = Utc::now();
        SubscriberEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            email: Some("user@example.com".to_string()),
            stripe_customer_id: Some("cus_1".to_string()),
            stripe_subscription_id: Some("sub_1".to_string()),
            stripe_price_id: Some("price_123".to_string()),
            stripe_product_id: Some("prod_1".to_string()),
            plan_id: plan_id.map(str::to_string),
            billing_interval: Some("month".to_string()),
            status: Some("active".to_string()),
            current_period_start: Some(now),
            current_period_end: None,
            cancel_at: None,
            cancel_at_period_end: None,
            subscribed: true,
            subscription_tier: tier.map(str::to_string),
            subscription_end: None,
            last_event_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    struct Fixture {
        subscriber_repo: MockSubscriberRepository,
        plan_catalog: MockPlanCatalogRepository,
        access_repo: MockAccessRepository,
        content_repo: MockContentUsageRepository,
        storage: MockStorageLister,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                subscriber_repo: MockSubscriberRepository::new(),
                plan_catalog: MockPlanCatalogRepository::new(),
                access_repo: MockAccessRepository::new(),
                content_repo: MockContentUsageRepository::new(),
                storage: MockStorageLister::new(),
            }
        }

        fn with_usage(mut self, legacy: i64) -> Self {
            self.content_repo
                .expect_count_created_since()
                .returning(move |kind, _, _| {
                    let count = match kind {
                        ContentKind::Legacy => legacy,
                        _ => 0,
                    };
                    Box::pin(async move { Ok(count) })
                });
            self.storage
                .expect_list_page()
                .returning(|_, _, _| Box::pin(async { Ok(vec![]) }));
            self
        }

        fn build(self) -> TestUseCase {
            let usage_aggregator = Arc::new(UsageAggregator::new(
                Arc::new(self.content_repo),
                Arc::new(self.storage),
            ));
            EntitlementGateUseCase::new(
                Arc::new(self.subscriber_repo),
                Arc::new(self.plan_catalog),
                Arc::new(self.access_repo),
                usage_aggregator,
            )
        }
    }

    #[tokio::test]
    async fn no_subscriber_row_resolves_to_free_defaults() {
        let mut fixture = Fixture::new().with_usage(0);
        fixture
            .subscriber_repo
            .expect_find_by_user_id()
            .returning(|_| Box::pin(async { Ok(None) }));
        fixture
            .access_repo
            .expect_current_access()
            .returning(|_| Box::pin(async { Ok(None) }));

        let gate = fixture.build().evaluate(Uuid::new_v4()).await;

        assert_eq!(gate.entitlements.plan, PlanAlias::Free);
        assert_eq!(
            gate.require_mentorship_access(),
            GateOutcome::deny(GateReason::Forbidden)
        );
    }

    #[tokio::test]
    async fn plan_alias_comes_from_the_catalog_not_the_tier_string() {
        let mut fixture = Fixture::new().with_usage(0);
        // Tier string claims free, but the plan id maps to mentorship=both.
        fixture
            .subscriber_repo
            .expect_find_by_user_id()
            .returning(|_| {
                Box::pin(async {
                    Ok(Some(subscriber_with(
                        Some("master"),
                        Some("Free – Legacy Keeper"),
                    )))
                })
            });
        fixture
            .plan_catalog
            .expect_find_mentorship_value()
            .with(eq("master"))
            .returning(|_| Box::pin(async { Ok(Some(MentorshipLevel::MentorMentee)) }));
        fixture
            .access_repo
            .expect_current_access()
            .returning(|_| Box::pin(async { Ok(None) }));

        let gate = fixture.build().evaluate(Uuid::new_v4()).await;

        assert_eq!(gate.entitlements.plan, PlanAlias::Master);
        assert_eq!(gate.require_mentor_role(), GateOutcome::allow());
    }

    #[tokio::test]
    async fn tier_string_is_the_fallback_when_plan_id_is_absent() {
        let mut fixture = Fixture::new().with_usage(0);
        fixture
            .subscriber_repo
            .expect_find_by_user_id()
            .returning(|_| {
                Box::pin(async {
                    Ok(Some(subscriber_with(None, Some("Builder – Legacy Builder"))))
                })
            });
        fixture
            .access_repo
            .expect_current_access()
            .returning(|_| Box::pin(async { Ok(None) }));

        let gate = fixture.build().evaluate(Uuid::new_v4()).await;

        assert_eq!(gate.entitlements.plan, PlanAlias::Builder);
        assert_eq!(gate.require_mentorship_access(), GateOutcome::allow());
    }

    #[tokio::test]
    async fn failed_access_rpc_falls_back_to_plan_defaults() {
        let mut fixture = Fixture::new().with_usage(0);
        fixture
            .subscriber_repo
            .expect_find_by_user_id()
            .returning(|_| Box::pin(async { Ok(None) }));
        fixture
            .access_repo
            .expect_current_access()
            .returning(|_| Box::pin(async { Err(anyhow::anyhow!("rpc unavailable")) }));

        let gate = fixture.build().evaluate(Uuid::new_v4()).await;

        // Total result despite the failure, resolved from static free limits.
        assert_eq!(gate.entitlements.plan, PlanAlias::Free);
        assert!(!gate.entitlements.can_view_mentorship);
    }

    #[tokio::test]
    async fn override_row_grants_mentor_role_over_static_defaults() {
        let mut fixture = Fixture::new().with_usage(0);
        fixture
            .subscriber_repo
            .expect_find_by_user_id()
            .returning(|_| Box::pin(async { Ok(None) }));
        fixture.access_repo.expect_current_access().returning(|_| {
            Box::pin(async {
                Ok(Some(AccessRow {
                    can_post_wisdom: Some(true),
                    can_view_mentorship: Some(true),
                    ..AccessRow::default()
                }))
            })
        });

        let usecase = fixture.build();
        let outcome = usecase
            .can_create(Uuid::new_v4(), ContentKind::Wisdom)
            .await;

        assert_eq!(outcome, GateOutcome::allow());
    }

    #[tokio::test]
    async fn can_create_denies_quota_once_the_monthly_cap_is_used() {
        let mut fixture = Fixture::new().with_usage(5);
        fixture
            .subscriber_repo
            .expect_find_by_user_id()
            .returning(|_| Box::pin(async { Ok(None) }));
        fixture
            .access_repo
            .expect_current_access()
            .returning(|_| Box::pin(async { Ok(None) }));

        let outcome = fixture
            .build()
            .can_create(Uuid::new_v4(), ContentKind::Legacy)
            .await;

        assert_eq!(outcome, GateOutcome::deny(GateReason::Quota));
    }
}
