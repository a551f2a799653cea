//! Right checking
//!
//! A check runs in four steps:
//!
//! 1. hard rules, which may allow or refuse outright
//! 2. the permission cache, unless provenance was requested
//! 3. the grants on the target itself, then on its ancestors
//! 4. recording the decision in the permission cache
//!
//! Grants found on group ancestors are pooled and evaluated together once the
//! walk leaves the groups, so that cross-domain rules can drop a group's
//! positive grants while keeping its negative ones.

use crate::acl::AclStore;
use crate::cache::{CachedPermission, MemoryPermissionCache, PermissionCache};
use crate::cross_domain::{check_cross_domain_admin_right, cross_domain_ok};
use crate::decision::{Decision, Evaluation, ViaGrant};
use crate::directory::Directory;
use crate::errors::{WardenError, WardenResult};
use crate::grant::Grant;
use crate::grant_set::GrantSet;
use crate::hard_rules::HardRules;
use crate::hierarchy::{ancestors_of, Ancestor};
use crate::resolver::{specificity_tiers, GranteeResolver, Tier};
use std::sync::Arc;
use warden_core::config::GrantPolicyConfig;
use warden_core::{
    CheckerConfig, Entry, Principal, PseudoDomain, Right, RightCatalog, TargetType,
};

/// One right check
#[derive(Debug, Clone, Copy)]
pub struct CheckRequest<'r> {
    /// Who is asking
    pub principal: &'r Principal,
    /// Entry the right is checked on
    pub target: &'r Arc<Entry>,
    /// Preset right being checked
    pub right: &'r Arc<Right>,
    /// Principal acts through its admin privileges
    pub as_admin: bool,
    /// The right must be grantable, not only executable
    pub delegate: bool,
    /// Report the deciding grant
    pub want_via: bool,
}

impl<'r> CheckRequest<'r> {
    /// Execute check; admin rights are checked as admin
    pub fn new(principal: &'r Principal, target: &'r Arc<Entry>, right: &'r Arc<Right>) -> Self {
        Self {
            principal,
            target,
            right,
            as_admin: !right.is_user_right(),
            delegate: false,
            want_via: false,
        }
    }

    /// Override whether the principal acts as admin
    pub fn as_admin(mut self, as_admin: bool) -> Self {
        self.as_admin = as_admin;
        self
    }

    /// Require a delegable grant
    pub fn delegate(mut self, delegate: bool) -> Self {
        self.delegate = delegate;
        self
    }

    /// Report the deciding grant; bypasses the permission cache
    pub fn with_via(mut self) -> Self {
        self.want_via = true;
        self
    }
}

/// Grants pooled from every group ancestor, denied first
#[derive(Debug, Default)]
struct GroupGrants {
    denied: Vec<Grant>,
    allowed_delegable: Vec<Grant>,
    allowed_not_delegable: Vec<Grant>,
}

impl GroupGrants {
    fn collect(&mut self, acl: &GrantSet, skip_positive: bool, direct: bool) {
        let inherited = |g: &&Grant| direct || !g.disinherit_sub_groups();
        self.denied
            .extend(acl.denied().iter().filter(inherited).cloned());
        if skip_positive {
            return;
        }
        self.allowed_delegable
            .extend(acl.allowed_delegable().iter().filter(inherited).cloned());
        self.allowed_not_delegable
            .extend(acl.allowed_not_delegable().iter().filter(inherited).cloned());
    }

    fn all(&self) -> Vec<&Grant> {
        self.denied
            .iter()
            .chain(&self.allowed_delegable)
            .chain(&self.allowed_not_delegable)
            .collect()
    }
}

/// Per-check state of the grant walk
struct PresetCheck<'c> {
    acls: AclStore<'c>,
    resolver: GranteeResolver<'c>,
    target: &'c Arc<Entry>,
    right: &'c Right,
    delegate: bool,
    want_via: bool,
    tiers: Vec<Tier>,
    seen: bool,
}

impl<'c> PresetCheck<'c> {
    fn run(mut self) -> WardenResult<Evaluation> {
        let admin_right = !self.right.is_user_right();
        let principal = self.resolver.principal();

        let mut grantee_domain = None;
        if admin_right {
            let Some(entry) = principal.entry().filter(|_| principal.is_valid_admin_grantee())
            else {
                return Ok(Evaluation::bare(Decision::NoDecision));
            };
            let domain = self.acls.directory().domain_of(entry)?.ok_or_else(|| {
                WardenError::failure(format!("cannot find domain for {}", entry.name))
            })?;
            if self.right.is_cross_domain_admin() {
                return check_cross_domain_admin_right(&self.acls, &domain, self.target, self.delegate)
                    .map(Evaluation::bare);
            }
            grantee_domain = Some(domain);
        }

        if let Some(acl) = self.acls.grant_set(self.target)? {
            let grants: Vec<&Grant> = acl.all().collect();
            if let Some(found) = self.check_grants(&grants, false)? {
                return Ok(found);
            }
        }

        let target_domain = self.target_domain()?;
        let expand_groups = admin_right || self.right.target_type() != Some(TargetType::Account);

        let directory = self.acls.directory();
        let mut ancestors = ancestors_of(directory, Arc::clone(self.target), expand_groups);
        // The target itself was checked above.
        ancestors.next();

        let mut pooled: Option<GroupGrants> = None;
        for ancestor in ancestors {
            let ancestor = ancestor?;
            if let Ancestor::Group { entry, direct } = &ancestor {
                let Some(acl) = self.acls.grant_set(entry)? else {
                    continue;
                };
                let skip_positive = grantee_domain.as_ref().is_some_and(|grantee_domain| {
                    !cross_domain_ok(&self.acls, grantee_domain, target_domain.as_deref(), entry)
                });
                pooled
                    .get_or_insert_with(GroupGrants::default)
                    .collect(&acl, skip_positive, *direct);
                continue;
            }

            if let Some(groups) = pooled.take() {
                if let Some(found) = self.check_grants(&groups.all(), false)? {
                    return Ok(found);
                }
            }

            let Some(acl) = self.acls.grant_set(ancestor.entry())? else {
                continue;
            };
            let sub_domain = self.target.target_type() == TargetType::Domain
                && matches!(ancestor, Ancestor::Domain(_));
            let grants: Vec<&Grant> = acl.all().collect();
            if let Some(found) = self.check_grants(&grants, sub_domain)? {
                return Ok(found);
            }
        }

        let decision = if self.seen {
            Decision::Deny
        } else {
            Decision::NoDecision
        };
        Ok(Evaluation::bare(decision))
    }

    /// Domain of a domained target; lookup errors propagate
    fn target_domain(&self) -> WardenResult<Option<Arc<Entry>>> {
        if !self.target.target_type().is_domained() {
            return Ok(None);
        }
        if let Some(PseudoDomain::Synthetic(domain)) = &self.target.pseudo {
            return Ok(Some(Arc::clone(domain)));
        }
        self.acls.directory().domain_of(self.target)
    }

    fn check_grants(
        &mut self,
        grants: &[&Grant],
        sub_domain: bool,
    ) -> WardenResult<Option<Evaluation>> {
        for tier in self.tiers.clone() {
            for grant in grants {
                if !self.matches_preset_right(grant, tier, sub_domain) {
                    continue;
                }
                self.seen = true;
                if self.resolver.matches_in_tier(grant, tier)? {
                    return Ok(Some(self.found(grant)));
                }
            }
        }
        Ok(None)
    }

    fn matches_preset_right(&self, grant: &Grant, tier: Tier, sub_domain: bool) -> bool {
        if !grant.grantee_type().has_flags(tier.flags) {
            return false;
        }
        if !self
            .right
            .is_applicable_on(self.target.target_type(), self.delegate)
        {
            return false;
        }
        if self.delegate && grant.can_execute_only() {
            return false;
        }
        // Negative grants apply regardless of the sub-domain modifier.
        if !grant.is_deny() && grant.sub_domain() != sub_domain {
            return false;
        }
        grant.right().satisfies(self.right)
    }

    fn found(&self, grant: &Grant) -> Evaluation {
        let decision = if grant.is_deny() {
            Decision::Deny
        } else {
            Decision::Allow
        };
        tracing::debug!(
            right = %self.right.name(),
            grantee = %self.resolver.principal().display_name(),
            %decision,
            grant = %grant,
            on = ?grant.origin().map(|o| o.target_name.as_str()),
            "right decided by grant"
        );
        Evaluation {
            decision,
            via: self.want_via.then(|| ViaGrant::from(grant)),
        }
    }
}

/// Answers right checks against a directory
pub struct RightChecker {
    directory: Arc<dyn Directory>,
    catalog: Arc<RightCatalog>,
    permission_cache: Option<Arc<dyn PermissionCache>>,
    hard_rules: HardRules,
    grant_policy: GrantPolicyConfig,
}

impl RightChecker {
    /// Checker without a permission cache and with no forbidden attributes
    pub fn new(directory: Arc<dyn Directory>, catalog: Arc<RightCatalog>) -> Self {
        Self {
            directory,
            catalog,
            permission_cache: None,
            hard_rules: HardRules::default(),
            grant_policy: GrantPolicyConfig::default(),
        }
    }

    /// Checker configured from `config`
    pub fn from_config(
        directory: Arc<dyn Directory>,
        catalog: Arc<RightCatalog>,
        config: &CheckerConfig,
    ) -> Self {
        let mut checker = Self::new(directory, catalog)
            .with_hard_rules(HardRules::from_config(&config.hard_rules))
            .with_grant_policy(&config.grants);
        if config.permission_cache.enabled {
            checker = checker.with_permission_cache(Arc::new(MemoryPermissionCache::from_config(
                &config.permission_cache,
            )));
        }
        checker
    }

    /// Use `cache` for decisions
    pub fn with_permission_cache(mut self, cache: Arc<dyn PermissionCache>) -> Self {
        self.permission_cache = Some(cache);
        self
    }

    /// Replace the hard rules
    pub fn with_hard_rules(mut self, hard_rules: HardRules) -> Self {
        self.hard_rules = hard_rules;
        self
    }

    /// Share lifetime limits for grants that expire
    pub fn with_grant_policy(mut self, policy: &GrantPolicyConfig) -> Self {
        self.grant_policy = policy.clone();
        self
    }

    /// Right catalog
    pub fn catalog(&self) -> &RightCatalog {
        &self.catalog
    }

    /// Hard rules
    pub fn hard_rules(&self) -> &HardRules {
        &self.hard_rules
    }

    /// Grant storage that invalidates this checker's permission cache
    pub fn acl_store(&self) -> AclStore<'_> {
        let store =
            AclStore::new(&*self.directory, &self.catalog).with_grant_policy(&self.grant_policy);
        match &self.permission_cache {
            Some(cache) => store.with_permission_cache(&**cache),
            None => store,
        }
    }

    /// Add grants to `target`; see [`AclStore::grant`]
    pub fn grant(&self, target: &Entry, grants: &[Grant]) -> WardenResult<Vec<Grant>> {
        self.acl_store().grant(target, grants)
    }

    /// Add expiring user-right grants; see [`AclStore::grant_expiring`]
    pub fn grant_expiring(
        &self,
        target: &Entry,
        grants: &[Grant],
        expiry: Option<&str>,
    ) -> WardenResult<(Vec<Grant>, i64)> {
        self.acl_store().grant_expiring(target, grants, expiry)
    }

    /// Remove grants from `target`; see [`AclStore::revoke`]
    pub fn revoke(&self, target: &Entry, grants: &[Grant]) -> WardenResult<Vec<Grant>> {
        self.acl_store().revoke(target, grants)
    }

    /// Full evaluation of one request
    pub fn evaluate(&self, request: &CheckRequest<'_>) -> WardenResult<Evaluation> {
        let CheckRequest {
            principal,
            target,
            right,
            as_admin,
            delegate,
            want_via,
        } = *request;

        if let Some(decision) = self.hard_rules.check(principal, target, right, as_admin)? {
            tracing::debug!(
                right = %right.name(),
                grantee = %principal.display_name(),
                target = %target.name,
                %decision,
                "right decided by hard rule"
            );
            return Ok(Evaluation::bare(decision));
        }

        if !right.is_preset() {
            return Err(WardenError::invalid_request(format!(
                "{} is not a preset right",
                right.name()
            )));
        }

        let cache = self.permission_cache.as_deref().filter(|_| !want_via);
        if let Some(cache) = cache {
            if let CachedPermission::Cached(decision) = cache.get(principal, target, right, delegate)
            {
                return Ok(Evaluation::bare(decision));
            }
        }

        let acls = self.acl_store();
        let check = PresetCheck {
            acls,
            resolver: GranteeResolver::new(&*self.directory, principal, !right.is_user_right()),
            target,
            right,
            delegate,
            want_via,
            tiers: specificity_tiers(right.is_user_right()),
            seen: false,
        };
        let evaluation = check.run()?;

        if let Some(cache) = cache {
            cache.put(principal, target, right, delegate, evaluation.decision);
        }
        Ok(evaluation)
    }

    /// Three-valued check of `right` on `target`
    ///
    /// The request runs as an admin check only for admin rights, so the
    /// global-admin bypass does not apply to user rights here: a global admin
    /// without a matching grant gets [`Decision::NoDecision`] for a user right.
    /// Use [`RightChecker::can_do`] with `as_admin` set, or
    /// [`RightChecker::evaluate`] with [`CheckRequest::as_admin`], when the
    /// caller acts in an admin capacity.
    pub fn check(
        &self,
        principal: &Principal,
        target: &Arc<Entry>,
        right: &Arc<Right>,
        delegate: bool,
    ) -> WardenResult<Decision> {
        let request = CheckRequest::new(principal, target, right).delegate(delegate);
        Ok(self.evaluate(&request)?.decision)
    }

    /// Check reporting the deciding grant
    pub fn check_with_via(
        &self,
        principal: &Principal,
        target: &Arc<Entry>,
        right: &Arc<Right>,
        delegate: bool,
    ) -> WardenResult<Evaluation> {
        let request = CheckRequest::new(principal, target, right)
            .delegate(delegate)
            .with_via();
        self.evaluate(&request)
    }

    /// Boolean answer for callers that act on the result
    ///
    /// [`Decision::NoDecision`] falls back to the right's configured default,
    /// then to `fallback`. A hard-rule refusal is `false`.
    pub fn can_do(
        &self,
        principal: &Principal,
        target: &Arc<Entry>,
        right: &Arc<Right>,
        as_admin: bool,
        fallback: bool,
    ) -> WardenResult<bool> {
        let request = CheckRequest::new(principal, target, right).as_admin(as_admin);
        match self.evaluate(&request) {
            Ok(evaluation) => Ok(evaluation
                .decision
                .resolve_with(right.default_decision(), fallback)),
            Err(e) if e.is_permission_denied() => {
                tracing::info!(
                    right = %right.name(),
                    grantee = %principal.display_name(),
                    target = %target.name,
                    reason = ?e.denial_reason(),
                    "right refused by hard rule"
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
