//! Pure diff between the desired and observed instance sets of one
//! agent. Keyed by service id; an observed instance whose registration
//! matches exactly is left untouched, which bounds write amplification
//! at steady state.

use pkg_types::instance::ServiceInstance;
use std::collections::HashMap;

/// Corrective operations for one agent.
#[derive(Debug, Default)]
pub struct CatalogOps {
    /// Instances to (re-)register: missing from the agent or present
    /// with a differing registration.
    pub register: Vec<ServiceInstance>,
    /// Observed instances with no desired counterpart; deregistered in
    /// the namespace they were found in.
    pub deregister: Vec<ServiceInstance>,
}

impl CatalogOps {
    pub fn is_empty(&self) -> bool {
        self.register.is_empty() && self.deregister.is_empty()
    }
}

/// Compute the minimal operations turning `observed` into `desired`.
pub fn diff_instances(desired: &[ServiceInstance], observed: &[ServiceInstance]) -> CatalogOps {
    let observed_by_id: HashMap<&str, &ServiceInstance> =
        observed.iter().map(|i| (i.id.as_str(), i)).collect();
    let desired_ids: HashMap<&str, ()> = desired.iter().map(|i| (i.id.as_str(), ())).collect();

    let mut ops = CatalogOps::default();

    for instance in desired {
        match observed_by_id.get(instance.id.as_str()) {
            Some(existing) if existing.same_registration(instance) => {}
            _ => ops.register.push(instance.clone()),
        }
    }
    for instance in observed {
        if !desired_ids.contains_key(instance.id.as_str()) {
            ops.deregister.push(instance.clone());
        }
    }

    // Deterministic order for logging and tests.
    ops.register.sort_by(|a, b| a.id.cmp(&b.id));
    ops.deregister.sort_by(|a, b| a.id.cmp(&b.id));
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkg_types::instance::InstancePair;
    use pkg_types::owner::OwnerKey;

    fn instances(specs: &[(&str, &str)]) -> Vec<ServiceInstance> {
        // (pod, address) pairs for service "web" in namespace "default"
        let owner = OwnerKey::new("web", "default");
        specs
            .iter()
            .flat_map(|(pod, addr)| {
                let pair = InstancePair::new("web", pod, &owner, "default", addr, 80, vec![]);
                [pair.primary, pair.proxy]
            })
            .collect()
    }

    /// Applying the computed ops to the observed set must yield exactly
    /// the desired set, keyed by service id.
    fn apply(observed: &[ServiceInstance], ops: &CatalogOps) -> Vec<ServiceInstance> {
        let mut state: HashMap<String, ServiceInstance> = observed
            .iter()
            .map(|i| (i.id.clone(), i.clone()))
            .collect();
        for d in &ops.deregister {
            state.remove(&d.id);
        }
        for r in &ops.register {
            state.insert(r.id.clone(), r.clone());
        }
        let mut result: Vec<ServiceInstance> = state.into_values().collect();
        result.sort_by(|a, b| a.id.cmp(&b.id));
        result
    }

    #[test]
    fn fresh_registration() {
        let desired = instances(&[("pod1", "1.2.3.4"), ("pod2", "2.2.3.4")]);
        let ops = diff_instances(&desired, &[]);
        assert_eq!(ops.register.len(), 4); // 2 primaries + 2 proxies
        assert!(ops.deregister.is_empty());
    }

    #[test]
    fn unchanged_instances_are_untouched() {
        let desired = instances(&[("pod1", "1.2.3.4")]);
        let observed = desired.clone();
        assert!(diff_instances(&desired, &observed).is_empty());
    }

    #[test]
    fn address_change_reregisters_both() {
        let desired = instances(&[("pod1", "4.4.4.4")]);
        let observed = instances(&[("pod1", "1.2.3.4")]);
        let ops = diff_instances(&desired, &observed);
        assert_eq!(ops.register.len(), 2);
        assert!(ops.deregister.is_empty());
    }

    #[test]
    fn stale_instances_are_deregistered() {
        let desired = instances(&[("pod1", "1.2.3.4")]);
        let observed = instances(&[("pod1", "1.2.3.4"), ("pod2", "2.2.3.4")]);
        let ops = diff_instances(&desired, &observed);
        assert!(ops.register.is_empty());
        let ids: Vec<&str> = ops.deregister.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["pod2-web", "pod2-web-sidecar-proxy"]);
    }

    #[test]
    fn tag_order_matters() {
        let mut desired = instances(&[("pod1", "1.2.3.4")]);
        let observed = desired.clone();
        for i in &mut desired {
            i.tags = vec!["b".to_string(), "a".to_string()];
        }
        let ops = diff_instances(&desired, &observed);
        assert_eq!(ops.register.len(), 2);
    }

    #[test]
    fn converges_to_desired() {
        let desired = instances(&[("pod1", "4.4.4.4"), ("pod3", "3.3.3.3")]);
        let observed = instances(&[("pod1", "1.2.3.4"), ("pod2", "2.2.3.4")]);
        let ops = diff_instances(&desired, &observed);

        let mut expected = desired.clone();
        expected.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(apply(&observed, &ops), expected);

        // Second pass over the converged state is empty.
        let converged = apply(&observed, &ops);
        assert!(diff_instances(&desired, &converged).is_empty());
    }

    #[test]
    fn empty_desired_clears_everything() {
        let observed = instances(&[("pod1", "1.2.3.4"), ("pod2", "2.2.3.4")]);
        let ops = diff_instances(&[], &observed);
        assert!(ops.register.is_empty());
        assert_eq!(ops.deregister.len(), 4);
    }
}
