use serde::{Serialize, Serializer};

use super::enums::{
    content_kinds::ContentKind, mentorship_levels::MentorshipLevel, plan_aliases::PlanAlias,
};
use super::usage::UsageSnapshot;

/// A per-month creation cap. Serialized as the raw number, or the string
/// `"unlimited"` for the sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cap {
    Limited(i64),
    Unlimited,
}

impl Cap {
    pub fn allows(&self, used: i64) -> bool {
        match self {
            Cap::Unlimited => true,
            Cap::Limited(cap) => used < *cap,
        }
    }
}

impl Serialize for Cap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cap::Limited(value) => serializer.serialize_i64(*value),
            Cap::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

/// Static limits attached to a plan alias. These are the layer-1 defaults the
/// gate starts from before any live override is applied.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PlanGateLimits {
    pub legacy_per_month: Cap,
    pub idea_per_month: Cap,
    pub timeless_per_month: Cap,
    pub storage_bytes: i64,
    pub mentorship: MentorshipLevel,
    pub show_progress_tracker: bool,
    pub allow_featured_ideas: bool,
}

impl PlanGateLimits {
    pub fn for_plan(plan: PlanAlias) -> Self {
        match plan {
            PlanAlias::Free => Self {
                legacy_per_month: Cap::Limited(5),
                idea_per_month: Cap::Limited(5),
                timeless_per_month: Cap::Limited(5),
                storage_bytes: 500 * 1024 * 1024,
                mentorship: MentorshipLevel::None,
                show_progress_tracker: false,
                allow_featured_ideas: false,
            },
            PlanAlias::Builder => Self {
                legacy_per_month: Cap::Limited(100),
                idea_per_month: Cap::Unlimited,
                timeless_per_month: Cap::Limited(10),
                storage_bytes: 5 * 1024 * 1024 * 1024,
                mentorship: MentorshipLevel::Mentee,
                show_progress_tracker: true,
                allow_featured_ideas: false,
            },
            PlanAlias::Master => Self {
                legacy_per_month: Cap::Unlimited,
                idea_per_month: Cap::Unlimited,
                timeless_per_month: Cap::Unlimited,
                storage_bytes: 100 * 1024 * 1024 * 1024,
                mentorship: MentorshipLevel::MentorMentee,
                show_progress_tracker: true,
                allow_featured_ideas: true,
            },
        }
    }
}

/// Live capability row from the `current_access` RPC. Every field is optional:
/// an absent row or field means "unknown, fall back to the plan default".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessRow {
    pub mentorship: Option<MentorshipLevel>,
    pub can_view_mentorship: Option<bool>,
    pub can_post_wisdom: Option<bool>,
    pub can_see_progress_tracker: Option<bool>,
}

/// The total, merged capability set. Every field has a definite value even
/// when the live RPC failed or returned nothing.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct EffectiveEntitlements {
    pub plan: PlanAlias,
    pub limits: PlanGateLimits,
    pub can_view_mentorship: bool,
    pub can_post_wisdom: bool,
}

/// Merges the static plan defaults with the live override row. Override
/// values win whenever present; the mentorship level is merged first so the
/// boolean fallbacks observe the overridden level.
pub fn merge_entitlements(plan: PlanAlias, live: Option<&AccessRow>) -> EffectiveEntitlements {
    let mut limits = PlanGateLimits::for_plan(plan);

    if let Some(row) = live {
        if let Some(mentorship) = row.mentorship {
            limits.mentorship = mentorship;
        }
        if let Some(show) = row.can_see_progress_tracker {
            limits.show_progress_tracker = show;
        }
    }

    let can_view_mentorship = live
        .and_then(|row| row.can_view_mentorship)
        .unwrap_or(limits.mentorship != MentorshipLevel::None);
    let can_post_wisdom = live
        .and_then(|row| row.can_post_wisdom)
        .unwrap_or(limits.mentorship == MentorshipLevel::MentorMentee);

    EffectiveEntitlements {
        plan,
        limits,
        can_view_mentorship,
        can_post_wisdom,
    }
}

/// Why a gate check denied the caller. `Loading` is not a true denial: the
/// caller should defer the action and retry once usage is known.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GateReason {
    Loading,
    Quota,
    Storage,
    Forbidden,
}

/// Total outcome of a capability check: `{ ok, reason }`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct GateOutcome {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<GateReason>,
}

impl GateOutcome {
    pub fn allow() -> Self {
        Self {
            ok: true,
            reason: None,
        }
    }

    pub fn deny(reason: GateReason) -> Self {
        Self {
            ok: false,
            reason: Some(reason),
        }
    }
}

/// Evaluated gate for one user: merged entitlements plus the usage snapshot,
/// if it has loaded. All checks are total and never panic.
#[derive(Debug, Clone)]
pub struct EntitlementGate {
    pub entitlements: EffectiveEntitlements,
    pub usage: Option<UsageSnapshot>,
}

impl EntitlementGate {
    /// Month-to-date creation check for one content kind. Wisdom capacity is
    /// unlimited at every tier; the mentor role gates it instead.
    pub fn require_capacity(&self, kind: ContentKind) -> GateOutcome {
        let Some(usage) = self.usage.as_ref() else {
            return GateOutcome::deny(GateReason::Loading);
        };

        let limits = &self.entitlements.limits;
        let cap = match kind {
            ContentKind::Legacy => limits.legacy_per_month,
            ContentKind::Idea => limits.idea_per_month,
            ContentKind::Timeless => limits.timeless_per_month,
            ContentKind::Wisdom => Cap::Unlimited,
        };

        if cap.allows(usage.count_for(kind)) {
            GateOutcome::allow()
        } else {
            GateOutcome::deny(GateReason::Quota)
        }
    }

    /// Passes iff the remaining storage allowance covers `bytes_needed`,
    /// boundary inclusive.
    pub fn require_storage(&self, bytes_needed: i64) -> GateOutcome {
        let Some(usage) = self.usage.as_ref() else {
            return GateOutcome::deny(GateReason::Loading);
        };

        let remaining = self.entitlements.limits.storage_bytes - usage.storage_bytes;
        if remaining >= bytes_needed {
            GateOutcome::allow()
        } else {
            GateOutcome::deny(GateReason::Storage)
        }
    }

    pub fn require_mentorship_access(&self) -> GateOutcome {
        if self.entitlements.can_view_mentorship {
            GateOutcome::allow()
        } else {
            GateOutcome::deny(GateReason::Forbidden)
        }
    }

    pub fn require_mentor_role(&self) -> GateOutcome {
        if self.entitlements.can_post_wisdom {
            GateOutcome::allow()
        } else {
            GateOutcome::deny(GateReason::Forbidden)
        }
    }

    pub fn can_see_progress_tracker(&self) -> bool {
        self.entitlements.limits.show_progress_tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_gate(plan: PlanAlias, live: Option<&AccessRow>, usage: UsageSnapshot) -> EntitlementGate {
        EntitlementGate {
            entitlements: merge_entitlements(plan, live),
            usage: Some(usage),
        }
    }

    fn usage_with(legacy: i64, storage_bytes: i64) -> UsageSnapshot {
        UsageSnapshot {
            legacy_count_month: legacy,
            storage_bytes,
            ..UsageSnapshot::default()
        }
    }

    #[test]
    fn capacity_passes_under_cap_and_fails_at_cap() {
        let gate = loaded_gate(PlanAlias::Free, None, usage_with(4, 0));
        assert_eq!(gate.require_capacity(ContentKind::Legacy), GateOutcome::allow());

        let gate = loaded_gate(PlanAlias::Free, None, usage_with(5, 0));
        assert_eq!(
            gate.require_capacity(ContentKind::Legacy),
            GateOutcome::deny(GateReason::Quota)
        );
    }

    #[test]
    fn unlimited_cap_always_passes() {
        let gate = loaded_gate(PlanAlias::Master, None, usage_with(1_000_000, 0));
        assert_eq!(gate.require_capacity(ContentKind::Legacy), GateOutcome::allow());
    }

    #[test]
    fn same_usage_passes_after_upgrade_to_builder() {
        let gate = loaded_gate(PlanAlias::Free, None, usage_with(5, 0));
        assert_eq!(
            gate.require_capacity(ContentKind::Legacy),
            GateOutcome::deny(GateReason::Quota)
        );

        let gate = loaded_gate(PlanAlias::Builder, None, usage_with(5, 0));
        assert_eq!(gate.require_capacity(ContentKind::Legacy), GateOutcome::allow());
    }

    #[test]
    fn capacity_reports_loading_while_usage_is_unknown() {
        let gate = EntitlementGate {
            entitlements: merge_entitlements(PlanAlias::Master, None),
            usage: None,
        };
        assert_eq!(
            gate.require_capacity(ContentKind::Idea),
            GateOutcome::deny(GateReason::Loading)
        );
        assert_eq!(
            gate.require_storage(1),
            GateOutcome::deny(GateReason::Loading)
        );
    }

    #[test]
    fn storage_boundary_is_inclusive() {
        let cap = PlanGateLimits::for_plan(PlanAlias::Free).storage_bytes;
        let gate = loaded_gate(PlanAlias::Free, None, usage_with(0, cap - 10));
        assert_eq!(gate.require_storage(10), GateOutcome::allow());
        assert_eq!(
            gate.require_storage(11),
            GateOutcome::deny(GateReason::Storage)
        );
    }

    #[test]
    fn free_plan_without_override_is_forbidden_mentorship() {
        let gate = loaded_gate(PlanAlias::Free, None, UsageSnapshot::default());
        assert_eq!(
            gate.require_mentorship_access(),
            GateOutcome::deny(GateReason::Forbidden)
        );
        assert_eq!(
            gate.require_mentor_role(),
            GateOutcome::deny(GateReason::Forbidden)
        );
    }

    #[test]
    fn live_flags_override_static_defaults_independently() {
        // can_post_wisdom=true grants the mentor role even though the static
        // level is mentee.
        let row = AccessRow {
            can_post_wisdom: Some(true),
            ..AccessRow::default()
        };
        let gate = loaded_gate(PlanAlias::Builder, Some(&row), UsageSnapshot::default());
        assert_eq!(gate.require_mentor_role(), GateOutcome::allow());

        // can_view_mentorship=false revokes access the static level grants.
        let row = AccessRow {
            can_view_mentorship: Some(false),
            ..AccessRow::default()
        };
        let gate = loaded_gate(PlanAlias::Builder, Some(&row), UsageSnapshot::default());
        assert_eq!(
            gate.require_mentorship_access(),
            GateOutcome::deny(GateReason::Forbidden)
        );

        // A mentorship override feeds the boolean fallbacks.
        let row = AccessRow {
            mentorship: Some(MentorshipLevel::MentorMentee),
            ..AccessRow::default()
        };
        let merged = merge_entitlements(PlanAlias::Free, Some(&row));
        assert!(merged.can_view_mentorship);
        assert!(merged.can_post_wisdom);

        // Progress tracker override, both directions.
        let row = AccessRow {
            can_see_progress_tracker: Some(true),
            ..AccessRow::default()
        };
        let merged = merge_entitlements(PlanAlias::Free, Some(&row));
        assert!(merged.limits.show_progress_tracker);
    }

    #[test]
    fn merge_is_total_without_any_inputs() {
        let merged = merge_entitlements(PlanAlias::Free, None);
        assert_eq!(merged.plan, PlanAlias::Free);
        assert_eq!(merged.limits, PlanGateLimits::for_plan(PlanAlias::Free));
        assert!(!merged.can_view_mentorship);
        assert!(!merged.can_post_wisdom);
    }

    #[test]
    fn wisdom_capacity_is_unlimited_regardless_of_usage() {
        let mut usage = UsageSnapshot::default();
        usage.wisdom_count_month = 10_000;
        let gate = loaded_gate(PlanAlias::Free, None, usage);
        assert_eq!(gate.require_capacity(ContentKind::Wisdom), GateOutcome::allow());
    }
}
